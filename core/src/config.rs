use serde::{Deserialize, Serialize};

/// Longest accepted dismissal cooldown, ten years.
pub const MAX_DISMISSAL_COOLDOWN_DAYS: i64 = 3650;

/// Modal frequency-capping policy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FrequencyPolicy {
    pub max_modals_per_day:      u32,
    pub max_modals_per_session:  u32,
    /// Dismissals (not CTA clicks) that start the cooldown.
    pub dismissal_threshold:     u32,
    pub dismissal_cooldown_days: i64,
}

impl Default for FrequencyPolicy {
    fn default() -> Self {
        Self {
            max_modals_per_day:      1,
            max_modals_per_session:  1,
            dismissal_threshold:     3,
            dismissal_cooldown_days: 14,
        }
    }
}

impl FrequencyPolicy {
    /// Reject values the gate cannot evaluate.
    pub fn validate(&self) -> anyhow::Result<()> {
        if !(0..=MAX_DISMISSAL_COOLDOWN_DAYS).contains(&self.dismissal_cooldown_days) {
            anyhow::bail!(
                "dismissal_cooldown_days must be within 0..={MAX_DISMISSAL_COOLDOWN_DAYS}, got {}",
                self.dismissal_cooldown_days
            );
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EngineConfig {
    pub frequency: FrequencyPolicy,
}

impl EngineConfig {
    /// Load from a JSON file. Missing fields fall back to the defaults.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        Self::from_json(&content).map_err(|e| anyhow::anyhow!("Invalid config {path}: {e}"))
    }

    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.frequency.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let config = EngineConfig::from_json(r#"{ "frequency": { "max_modals_per_day": 2 } }"#)
            .expect("parse config");
        assert_eq!(config.frequency.max_modals_per_day, 2);
        assert_eq!(config.frequency.max_modals_per_session, 1);
        assert_eq!(config.frequency.dismissal_threshold, 3);
        assert_eq!(config.frequency.dismissal_cooldown_days, 14);
    }

    #[test]
    fn out_of_range_cooldown_is_rejected() {
        for days in ["200000000000", "-1", "3651"] {
            let json = format!(r#"{{ "frequency": {{ "dismissal_cooldown_days": {days} }} }}"#);
            assert!(
                EngineConfig::from_json(&json).is_err(),
                "Cooldown of {days} days must be rejected"
            );
        }
        let config = EngineConfig::from_json(r#"{ "frequency": { "dismissal_cooldown_days": 0 } }"#)
            .expect("zero-day cooldown is valid");
        assert_eq!(config.frequency.dismissal_cooldown_days, 0);
    }

    #[test]
    fn unrepresentable_cooldown_keeps_the_gate_closed() {
        use crate::{
            frequency::{FrequencyGate, FrequencyState, SuppressionReason},
            types::AccountContext,
        };
        use chrono::{TimeZone, Utc};

        let policy = FrequencyPolicy {
            dismissal_cooldown_days: 200_000_000_000,
            ..FrequencyPolicy::default()
        };
        let mut gate = FrequencyGate::new(policy, FrequencyState::default(), None);
        let now = Utc.with_ymd_and_hms(2026, 1, 5, 10, 0, 0).unwrap();
        for _ in 0..3 {
            gate.record_dismissal(now);
        }
        assert_eq!(
            gate.check_modal(AccountContext::default(), now),
            Err(SuppressionReason::DismissalCooldown)
        );
    }

    #[test]
    fn empty_object_is_default_policy() {
        let config = EngineConfig::from_json("{}").expect("parse config");
        assert_eq!(config, EngineConfig::default());
    }
}
