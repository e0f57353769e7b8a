//! Milestone Registry: the static catalog of upsell milestones.
//!
//! Pure data. Catalog order is priority order: the evaluator scans
//! definitions front to back and the first eligible one wins.
//! Payloads are opaque to the engine and only handed to the UI.

use crate::{
    error::{MilestoneError, MilestoneResult},
    stats::{Counter, Flag, Stats},
    types::{MilestoneId, PresentationType, Tier},
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A single predicate over the stats snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Condition {
    /// Edge match: true only while the counter equals `value` exactly.
    CounterEquals { counter: Counter, value: u32 },
    CounterAtLeast { counter: Counter, value: u32 },
    FlagSet { flag: Flag },
}

impl Condition {
    pub fn holds(&self, stats: &Stats) -> bool {
        match self {
            Self::CounterEquals { counter, value }  => stats.counter(*counter) == *value,
            Self::CounterAtLeast { counter, value } => stats.counter(*counter) >= *value,
            Self::FlagSet { flag }                  => stats.flag(*flag),
        }
    }
}

/// All conditions must hold. `tiers: None` means any tier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Trigger {
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub tiers: Option<Vec<Tier>>,
}

impl Trigger {
    pub fn applies_to(&self, tier: Tier) -> bool {
        self.tiers.as_ref().map_or(true, |tiers| tiers.contains(&tier))
    }

    /// An empty condition list never matches.
    pub fn matches(&self, stats: &Stats) -> bool {
        !self.conditions.is_empty() && self.conditions.iter().all(|c| c.holds(stats))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PromptPayload {
    pub icon:          String,
    pub title:         String,
    pub message:       String,
    #[serde(default)]
    pub benefits:      Vec<String>,
    pub primary_cta:   String,
    #[serde(default)]
    pub secondary_cta: Option<String>,
    pub target_tier:   Tier,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MilestoneDefinition {
    pub id:           MilestoneId,
    pub presentation: PresentationType,
    pub trigger:      Trigger,
    pub payload:      PromptPayload,
}

#[derive(Debug, Clone, Deserialize)]
struct MilestoneCatalogFile {
    milestones: Vec<MilestoneDefinition>,
}

#[derive(Debug, Clone)]
pub struct MilestoneRegistry {
    definitions: Vec<MilestoneDefinition>,
}

impl MilestoneRegistry {
    /// Build a registry, rejecting duplicate ids.
    pub fn new(definitions: Vec<MilestoneDefinition>) -> MilestoneResult<Self> {
        let mut seen = HashSet::new();
        for def in &definitions {
            if !seen.insert(def.id.as_str()) {
                return Err(MilestoneError::DuplicateMilestone { id: def.id.clone() });
            }
        }
        Ok(Self { definitions })
    }

    /// Parse a `{ "milestones": [...] }` catalog.
    pub fn from_json(json: &str) -> MilestoneResult<Self> {
        let file: MilestoneCatalogFile = serde_json::from_str(json)?;
        Self::new(file.milestones)
    }

    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        Ok(Self::from_json(&content)?)
    }

    pub fn definitions(&self) -> &[MilestoneDefinition] {
        &self.definitions
    }

    pub fn get(&self, id: &str) -> Option<&MilestoneDefinition> {
        self.definitions.iter().find(|d| d.id == id)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// The shipped catalog.
    pub fn standard() -> Self {
        use Counter::*;
        use PresentationType::*;

        let free = || Some(vec![Tier::Free]);
        let defs = vec![
            def(
                "FIRST_DOWNLOAD", Banner,
                vec![Condition::FlagSet { flag: Flag::FirstDownloadShown }], free(),
                payload("download", "Your first report is ready",
                    "Upgrade to remove the watermark from exported reports.",
                    &["Watermark-free PDFs", "Custom letterhead"],
                    "See plans", None, Tier::Starter),
            ),
            def(
                "PDF_EXPORT_ATTEMPT", Modal,
                vec![Condition::FlagSet { flag: Flag::PdfExportAttempted }], free(),
                payload("file-pdf", "PDF export is a Starter feature",
                    "Export polished, client-ready tax summaries in one click.",
                    &["Unlimited PDF exports", "Branded reports", "Saved history"],
                    "Upgrade to Starter", Some("Maybe later"), Tier::Starter),
            ),
            def(
                "CALCULATION_10", Modal,
                vec![Condition::CounterEquals { counter: Calculations, value: 10 }], free(),
                payload("trophy", "10 calculations done!",
                    "You're getting real value out of the calculator. Unlock the full toolkit.",
                    &["Save unlimited calculations", "Compare scenarios", "No ads"],
                    "Upgrade now", Some("Not now"), Tier::Starter),
            ),
            def(
                "CALC_REVISIONS_3", Banner,
                vec![Condition::CounterEquals { counter: CalcRevisions, value: 3 }], free(),
                payload("layers", "Comparing scenarios?",
                    "Save each version and compare them side by side.",
                    &["Scenario comparison"],
                    "Try scenarios", None, Tier::Starter),
            ),
            def(
                "MULTI_CALCULATOR_3", Banner,
                vec![Condition::CounterEquals { counter: DistinctCalculatorTypes, value: 3 }], free(),
                payload("grid", "You use several calculators",
                    "Bundle every calculator into one dashboard.",
                    &["Unified dashboard", "Shared client profiles"],
                    "Explore Professional", None, Tier::Professional),
            ),
            def(
                "SAVED_CALCULATIONS_5", Modal,
                vec![Condition::CounterEquals { counter: SavedCalculations, value: 5 }], free(),
                payload("bookmark", "Your saved calculations are piling up",
                    "Free accounts keep a limited history. Keep everything forever.",
                    &["Unlimited history", "Folders and tags", "Export all"],
                    "Keep everything", Some("Not now"), Tier::Starter),
            ),
            def(
                "FIRST_BULK_RUN", Banner,
                vec![Condition::CounterEquals { counter: BulkRuns, value: 1 }], free(),
                payload("stack", "Bulk runs save hours",
                    "Professional lifts the row limit on bulk calculations.",
                    &["Unlimited rows", "Scheduled runs"],
                    "See Professional", None, Tier::Professional),
            ),
            def(
                "ANALYTICS_CLICK", Modal,
                vec![Condition::FlagSet { flag: Flag::AnalyticsClicked }], free(),
                payload("chart", "Analytics are available on Professional",
                    "Track liabilities and trends across all of your calculations.",
                    &["Trend dashboards", "Year-over-year comparison", "CSV export"],
                    "Unlock analytics", Some("Maybe later"), Tier::Professional),
            ),
            def(
                "CALCULATION_25", Modal,
                vec![Condition::CounterEquals { counter: Calculations, value: 25 }], free(),
                payload("star", "25 calculations and counting",
                    "Power users save the most with Professional.",
                    &["Everything in Starter", "Bulk runs", "Priority support"],
                    "Go Professional", Some("Not now"), Tier::Professional),
            ),
            def(
                "EMPLOYEE_LIMIT_HIT", Banner,
                vec![Condition::FlagSet { flag: Flag::EmployeeLimitHit }],
                Some(vec![Tier::Starter]),
                payload("users", "Employee limit reached",
                    "Starter covers a small team. Add more employees on Business.",
                    &["Unlimited employees", "Team roles"],
                    "Upgrade to Business", None, Tier::Business),
            ),
            def(
                "POWER_USER_50", Silent,
                vec![Condition::CounterAtLeast { counter: Calculations, value: 50 }], None,
                payload("mail", "Power user", "Candidate for a personal outreach email.",
                    &[], "Contact sales", None, Tier::Business),
            ),
        ];

        Self { definitions: defs }
    }
}

fn def(
    id:           &str,
    presentation: PresentationType,
    conditions:   Vec<Condition>,
    tiers:        Option<Vec<Tier>>,
    payload:      PromptPayload,
) -> MilestoneDefinition {
    MilestoneDefinition {
        id: id.to_string(),
        presentation,
        trigger: Trigger { conditions, tiers },
        payload,
    }
}

fn payload(
    icon:          &str,
    title:         &str,
    message:       &str,
    benefits:      &[&str],
    primary_cta:   &str,
    secondary_cta: Option<&str>,
    target_tier:   Tier,
) -> PromptPayload {
    PromptPayload {
        icon:          icon.to_string(),
        title:         title.to_string(),
        message:       message.to_string(),
        benefits:      benefits.iter().map(|b| b.to_string()).collect(),
        primary_cta:   primary_cta.to_string(),
        secondary_cta: secondary_cta.map(str::to_string),
        target_tier,
    }
}
