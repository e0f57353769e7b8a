//! Trigger Evaluator: picks at most one milestone per evaluation pass.
//!
//! RULES:
//!   - Definitions are scanned in registry order; the first eligible wins.
//!   - Ids already in `shown_milestone_ids` are never looked at again.
//!   - A matching modal refused by the gate is NOT consumed. It stays
//!     eligible and the scan continues with later definitions.
//!   - Banners and silent milestones are never gated.
//!
//! The evaluator does not commit anything. Marking shown, counting the
//! modal and activating the prompt happen in the engine.

use crate::{
    frequency::{FrequencyGate, SuppressionReason},
    registry::{MilestoneDefinition, MilestoneRegistry},
    stats::Stats,
    types::{AccountContext, MilestoneId, PresentationType},
};
use chrono::{DateTime, Utc};

#[derive(Debug, Default)]
pub struct EvaluationOutcome<'a> {
    pub winner:     Option<&'a MilestoneDefinition>,
    /// Modals that matched but were refused by the gate, in scan order.
    pub suppressed: Vec<(MilestoneId, SuppressionReason)>,
}

pub struct TriggerEvaluator {
    registry: MilestoneRegistry,
}

impl TriggerEvaluator {
    pub fn new(registry: MilestoneRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &MilestoneRegistry {
        &self.registry
    }

    pub fn evaluate(
        &self,
        stats:   &Stats,
        gate:    &mut FrequencyGate,
        account: AccountContext,
        now:     DateTime<Utc>,
    ) -> EvaluationOutcome<'_> {
        let mut outcome = EvaluationOutcome::default();

        for def in self.registry.definitions() {
            if gate.has_shown(&def.id)
                || !def.trigger.applies_to(account.tier)
                || !def.trigger.matches(stats)
            {
                continue;
            }

            if def.presentation == PresentationType::Modal {
                if let Err(reason) = gate.check_modal(account, now) {
                    log::debug!("milestone {} matched but suppressed: {reason:?}", def.id);
                    outcome.suppressed.push((def.id.clone(), reason));
                    continue;
                }
            }

            outcome.winner = Some(def);
            break;
        }

        outcome
    }
}
