//! Stats Store: behavioural counters reported by the calculator UI.
//!
//! RULE: Only tracking calls mutate stats. Each mutator returns the
//! updated snapshot; persistence and evaluation scheduling are the
//! engine's job, not the store's.
//!
//! No validation happens here. An unknown calculator type is recorded
//! as-is; the UI collaborator owns input validation.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A numeric fact a trigger condition can compare against.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Counter {
    Calculations,
    BulkRuns,
    SavedCalculations,
    CalcRevisions,
    DistinctCalculatorTypes,
}

/// A one-shot boolean fact.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Flag {
    FirstDownloadShown,
    PdfExportAttempted,
    AnalyticsClicked,
    EmployeeLimitHit,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stats {
    pub calculation_count:               u32,
    pub bulk_run_count:                  u32,
    pub saved_calculation_count:         u32,
    pub same_calculation_revision_count: u32,
    pub calculator_types_used:           HashSet<String>,
    pub first_download_shown:            bool,
    pub pdf_export_attempted:            bool,
    pub analytics_clicked:               bool,
    pub employee_limit_hit:              bool,
}

impl Stats {
    pub fn counter(&self, counter: Counter) -> u32 {
        match counter {
            Counter::Calculations            => self.calculation_count,
            Counter::BulkRuns                => self.bulk_run_count,
            Counter::SavedCalculations       => self.saved_calculation_count,
            Counter::CalcRevisions           => self.same_calculation_revision_count,
            Counter::DistinctCalculatorTypes => self.calculator_types_used.len() as u32,
        }
    }

    pub fn flag(&self, flag: Flag) -> bool {
        match flag {
            Flag::FirstDownloadShown => self.first_download_shown,
            Flag::PdfExportAttempted => self.pdf_export_attempted,
            Flag::AnalyticsClicked   => self.analytics_clicked,
            Flag::EmployeeLimitHit   => self.employee_limit_hit,
        }
    }

    fn flag_mut(&mut self, flag: Flag) -> &mut bool {
        match flag {
            Flag::FirstDownloadShown => &mut self.first_download_shown,
            Flag::PdfExportAttempted => &mut self.pdf_export_attempted,
            Flag::AnalyticsClicked   => &mut self.analytics_clicked,
            Flag::EmployeeLimitHit   => &mut self.employee_limit_hit,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StatsStore {
    stats: Stats,
}

impl StatsStore {
    pub fn new(stats: Stats) -> Self {
        Self { stats }
    }

    pub fn snapshot(&self) -> &Stats {
        &self.stats
    }

    pub fn record_calculation(&mut self, calculator_type: &str) -> Stats {
        self.stats.calculation_count = self.stats.calculation_count.saturating_add(1);
        self.stats.calculator_types_used.insert(calculator_type.to_string());
        self.stats.clone()
    }

    pub fn record_bulk_run(&mut self) -> Stats {
        self.stats.bulk_run_count = self.stats.bulk_run_count.saturating_add(1);
        self.stats.clone()
    }

    pub fn record_save(&mut self) -> Stats {
        self.stats.saved_calculation_count = self.stats.saved_calculation_count.saturating_add(1);
        self.stats.clone()
    }

    pub fn record_revision(&mut self) -> Stats {
        self.stats.same_calculation_revision_count =
            self.stats.same_calculation_revision_count.saturating_add(1);
        self.stats.clone()
    }

    /// The user started a new, unrelated calculation.
    pub fn reset_revision_counter(&mut self) -> Stats {
        self.stats.same_calculation_revision_count = 0;
        self.stats.clone()
    }

    /// Set a one-shot flag. Returns the updated snapshot and the flag's
    /// prior value; when the prior value is `true` nothing changed.
    pub fn mark_flag(&mut self, flag: Flag) -> (Stats, bool) {
        let slot = self.stats.flag_mut(flag);
        let was_set = *slot;
        *slot = true;
        (self.stats.clone(), was_set)
    }
}
