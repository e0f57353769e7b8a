//! Shared primitive types used across the entire engine.

use serde::{Deserialize, Serialize};

/// A stable, unique milestone key, e.g. "CALCULATION_10".
pub type MilestoneId = String;

/// Subscription level of the current account.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    #[default]
    Free,
    Starter,
    Professional,
    Business,
}

impl Tier {
    /// Every tier except Free is a paid tier.
    pub fn is_paid(&self) -> bool {
        !matches!(self, Self::Free)
    }
}

impl std::str::FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free"         => Ok(Self::Free),
            "starter"      => Ok(Self::Starter),
            "professional" => Ok(Self::Professional),
            "business"     => Ok(Self::Business),
            other          => Err(format!("unknown tier '{other}'")),
        }
    }
}

/// How a milestone surfaces once reached.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PresentationType {
    Modal,
    Banner,
    /// Recorded for out-of-band follow-up; never rendered client-side.
    Silent,
}

/// The subscription facts the engine needs at evaluation time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct AccountContext {
    pub tier:         Tier,
    pub trial_active: bool,
}
