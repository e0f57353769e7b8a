//! Frequency Gate: decides whether a modal may interrupt the user.
//!
//! DECISION ORDER (fixed, all must pass):
//!   1. No active trial.
//!   2. Account is on the free tier.
//!   3. Not inside the dismissal cooldown. An expired cooldown resets
//!      the dismissal count and evaluation continues.
//!   4. Daily and per-session modal caps not reached.
//!
//! Banners and silent milestones never consult the gate.

use crate::{
    config::FrequencyPolicy,
    types::{AccountContext, MilestoneId},
};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::collections::HashSet;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrequencyState {
    pub modals_shown_today:        u32,
    pub modals_shown_this_session: u32,
    pub dismissal_count:           u32,
    pub last_dismissal_at:         Option<DateTime<Utc>>,
    /// Once an id is here it is never evaluated again.
    pub shown_milestone_ids:       HashSet<MilestoneId>,
}

/// Why the gate refused a modal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuppressionReason {
    TrialActive,
    PaidTier,
    DismissalCooldown,
    DailyCap,
    SessionCap,
}

#[derive(Debug, Clone)]
pub struct FrequencyGate {
    policy:          FrequencyPolicy,
    state:           FrequencyState,
    last_reset_date: Option<NaiveDate>,
}

impl FrequencyGate {
    pub fn new(
        policy:          FrequencyPolicy,
        state:           FrequencyState,
        last_reset_date: Option<NaiveDate>,
    ) -> Self {
        Self { policy, state, last_reset_date }
    }

    pub fn state(&self) -> &FrequencyState {
        &self.state
    }

    pub fn policy(&self) -> &FrequencyPolicy {
        &self.policy
    }

    pub fn last_reset_date(&self) -> Option<NaiveDate> {
        self.last_reset_date
    }

    /// A new engine session starts with a clean per-session count.
    pub fn start_session(&mut self) {
        self.state.modals_shown_this_session = 0;
    }

    /// Reset the daily counter when the calendar date has moved on.
    /// Returns true if a reset happened.
    pub fn roll_over_day(&mut self, today: NaiveDate) -> bool {
        if self.last_reset_date == Some(today) {
            return false;
        }
        self.state.modals_shown_today = 0;
        self.last_reset_date = Some(today);
        true
    }

    pub fn can_show_modal(&mut self, account: AccountContext, now: DateTime<Utc>) -> bool {
        self.check_modal(account, now).is_ok()
    }

    /// Same as `can_show_modal`, reporting which rule refused.
    pub fn check_modal(
        &mut self,
        account: AccountContext,
        now:     DateTime<Utc>,
    ) -> Result<(), SuppressionReason> {
        if account.trial_active {
            return Err(SuppressionReason::TrialActive);
        }
        if account.tier.is_paid() {
            return Err(SuppressionReason::PaidTier);
        }

        if self.state.dismissal_count >= self.policy.dismissal_threshold {
            // An unrepresentable cooldown never elapses.
            let cooling = match Duration::try_days(self.policy.dismissal_cooldown_days) {
                Some(cooldown) => self
                    .state
                    .last_dismissal_at
                    .is_some_and(|last| now - last < cooldown),
                None => true,
            };
            if cooling {
                return Err(SuppressionReason::DismissalCooldown);
            }
            log::info!(
                "dismissal cooldown elapsed after {} dismissals; re-enabling modals",
                self.state.dismissal_count
            );
            self.state.dismissal_count = 0;
        }

        if self.state.modals_shown_today >= self.policy.max_modals_per_day {
            return Err(SuppressionReason::DailyCap);
        }
        if self.state.modals_shown_this_session >= self.policy.max_modals_per_session {
            return Err(SuppressionReason::SessionCap);
        }
        Ok(())
    }

    pub fn record_modal_shown(&mut self) {
        self.state.modals_shown_today += 1;
        self.state.modals_shown_this_session += 1;
    }

    pub fn record_dismissal(&mut self, now: DateTime<Utc>) {
        self.state.dismissal_count += 1;
        self.state.last_dismissal_at = Some(now);
    }

    pub fn has_shown(&self, id: &str) -> bool {
        self.state.shown_milestone_ids.contains(id)
    }

    pub fn mark_shown(&mut self, id: &str) {
        self.state.shown_milestone_ids.insert(id.to_string());
    }
}
