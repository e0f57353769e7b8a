//! Persistence Adapter: engine state to/from durable key-value storage.
//!
//! STORAGE KEYS:
//!   milestone_stats            Stats, calculator types as a sorted array
//!   frequency_state            FrequencyState, shown ids as a sorted array
//!   frequency_last_reset_date  ISO date of the last daily rollover
//!
//! RULES:
//!   - Sets are converted to sorted arrays here and back on load.
//!     Domain types are never serialized directly.
//!   - Loading never fails. Missing or corrupted entries fall back to
//!     fresh state with a warning.
//!   - Saving never fails. Write errors are logged and swallowed; the
//!     in-memory state stays authoritative for the rest of the session.

use crate::{
    frequency::FrequencyState,
    stats::Stats,
    store::StateStorage,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashSet;

pub const STATS_KEY: &str = "milestone_stats";
pub const FREQUENCY_KEY: &str = "frequency_state";
pub const LAST_RESET_DATE_KEY: &str = "frequency_last_reset_date";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
struct PersistedStats {
    calculation_count:               u32,
    bulk_run_count:                  u32,
    saved_calculation_count:         u32,
    same_calculation_revision_count: u32,
    calculator_types_used:           Vec<String>,
    first_download_shown:            bool,
    pdf_export_attempted:            bool,
    analytics_clicked:               bool,
    employee_limit_hit:              bool,
}

impl From<&Stats> for PersistedStats {
    fn from(s: &Stats) -> Self {
        Self {
            calculation_count:               s.calculation_count,
            bulk_run_count:                  s.bulk_run_count,
            saved_calculation_count:         s.saved_calculation_count,
            same_calculation_revision_count: s.same_calculation_revision_count,
            calculator_types_used:           sorted(&s.calculator_types_used),
            first_download_shown:            s.first_download_shown,
            pdf_export_attempted:            s.pdf_export_attempted,
            analytics_clicked:               s.analytics_clicked,
            employee_limit_hit:              s.employee_limit_hit,
        }
    }
}

impl From<PersistedStats> for Stats {
    fn from(p: PersistedStats) -> Self {
        Self {
            calculation_count:               p.calculation_count,
            bulk_run_count:                  p.bulk_run_count,
            saved_calculation_count:         p.saved_calculation_count,
            same_calculation_revision_count: p.same_calculation_revision_count,
            calculator_types_used:           p.calculator_types_used.into_iter().collect(),
            first_download_shown:            p.first_download_shown,
            pdf_export_attempted:            p.pdf_export_attempted,
            analytics_clicked:               p.analytics_clicked,
            employee_limit_hit:              p.employee_limit_hit,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
struct PersistedFrequencyState {
    modals_shown_today:        u32,
    modals_shown_this_session: u32,
    dismissal_count:           u32,
    last_dismissal_at:         Option<DateTime<Utc>>,
    shown_milestone_ids:       Vec<String>,
}

impl From<&FrequencyState> for PersistedFrequencyState {
    fn from(f: &FrequencyState) -> Self {
        Self {
            modals_shown_today:        f.modals_shown_today,
            modals_shown_this_session: f.modals_shown_this_session,
            dismissal_count:           f.dismissal_count,
            last_dismissal_at:         f.last_dismissal_at,
            shown_milestone_ids:       sorted(&f.shown_milestone_ids),
        }
    }
}

impl From<PersistedFrequencyState> for FrequencyState {
    fn from(p: PersistedFrequencyState) -> Self {
        Self {
            modals_shown_today:        p.modals_shown_today,
            modals_shown_this_session: p.modals_shown_this_session,
            dismissal_count:           p.dismissal_count,
            last_dismissal_at:         p.last_dismissal_at,
            shown_milestone_ids:       p.shown_milestone_ids.into_iter().collect(),
        }
    }
}

fn sorted(set: &HashSet<String>) -> Vec<String> {
    let mut items: Vec<String> = set.iter().cloned().collect();
    items.sort();
    items
}

pub struct PersistenceAdapter {
    storage: Box<dyn StateStorage>,
}

impl PersistenceAdapter {
    pub fn new(storage: Box<dyn StateStorage>) -> Self {
        Self { storage }
    }

    pub fn load_stats(&self) -> Stats {
        self.load_json::<PersistedStats>(STATS_KEY)
            .map(Stats::from)
            .unwrap_or_default()
    }

    pub fn load_frequency_state(&self) -> FrequencyState {
        self.load_json::<PersistedFrequencyState>(FREQUENCY_KEY)
            .map(FrequencyState::from)
            .unwrap_or_default()
    }

    pub fn load_last_reset_date(&self) -> Option<NaiveDate> {
        let raw = self.load_raw(LAST_RESET_DATE_KEY)?;
        match NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d") {
            Ok(date) => Some(date),
            Err(e) => {
                log::warn!("ignoring corrupted {LAST_RESET_DATE_KEY} entry {raw:?}: {e}");
                None
            }
        }
    }

    /// Returns whether the write reached storage.
    pub fn save_stats(&mut self, stats: &Stats) -> bool {
        self.save_json(STATS_KEY, &PersistedStats::from(stats))
    }

    pub fn save_frequency_state(&mut self, state: &FrequencyState) -> bool {
        self.save_json(FREQUENCY_KEY, &PersistedFrequencyState::from(state))
    }

    pub fn save_last_reset_date(&mut self, date: NaiveDate) -> bool {
        self.save_raw(LAST_RESET_DATE_KEY, &date.format("%Y-%m-%d").to_string())
    }

    fn load_raw(&self, key: &str) -> Option<String> {
        match self.storage.get(key) {
            Ok(value) => value,
            Err(e) => {
                log::warn!("failed to read {key} from storage: {e}");
                None
            }
        }
    }

    fn load_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.load_raw(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!("ignoring corrupted {key} entry: {e}");
                None
            }
        }
    }

    fn save_raw(&mut self, key: &str, value: &str) -> bool {
        match self.storage.set(key, value) {
            Ok(()) => {
                log::debug!("flushed {key}");
                true
            }
            Err(e) => {
                log::warn!("failed to persist {key}: {e}");
                false
            }
        }
    }

    fn save_json<T: Serialize>(&mut self, key: &str, value: &T) -> bool {
        match serde_json::to_string(value) {
            Ok(json) => self.save_raw(key, &json),
            Err(e) => {
                log::warn!("failed to serialize {key}: {e}");
                false
            }
        }
    }
}
