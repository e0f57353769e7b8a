//! The milestone engine: the only object collaborators talk to.
//!
//! FLOW (per tracking call):
//!   1. Stats store mutates and returns the new snapshot.
//!   2. Stats are flushed to storage (best effort).
//!   3. An evaluation pass is scheduled, not run.
//!
//! FLOW (per `tick()`, called by the host on its next scheduler turn):
//!   1. Daily rollover check.
//!   2. One evaluation pass over the latest stats, however many tracking
//!      calls arrived since the last tick.
//!   3. Winner committed: marked shown, modal counted, prompt activated.
//!   4. Frequency state flushed.
//!
//! RULES:
//!   - One engine per session, passed by reference. No globals.
//!   - Collaborators read snapshots; they never mutate engine state
//!     except through the tracking and close operations below.
//!   - Nothing here returns an error to the UI. Storage trouble degrades
//!     to "no prompt" and a log line.

use crate::{
    clock::Clock,
    config::EngineConfig,
    evaluator::TriggerEvaluator,
    event::MilestoneEvent,
    frequency::{FrequencyGate, FrequencyState},
    persistence::PersistenceAdapter,
    presentation::{PresentationController, Prompt},
    registry::MilestoneRegistry,
    stats::{Flag, Stats, StatsStore},
    store::StateStorage,
    types::{AccountContext, PresentationType},
};
use uuid::Uuid;

pub struct MilestoneEngine {
    session_id:         Uuid,
    clock:              Box<dyn Clock>,
    account:            AccountContext,
    stats:              StatsStore,
    gate:               FrequencyGate,
    evaluator:          TriggerEvaluator,
    presentation:       PresentationController,
    persistence:        PersistenceAdapter,
    evaluation_pending: bool,
    pending_events:     Vec<MilestoneEvent>,
}

impl MilestoneEngine {
    /// Load persisted state and start a new session.
    pub fn new(
        storage:  Box<dyn StateStorage>,
        clock:    Box<dyn Clock>,
        config:   EngineConfig,
        registry: MilestoneRegistry,
    ) -> Self {
        let persistence = PersistenceAdapter::new(storage);
        let stats = persistence.load_stats();
        let frequency = persistence.load_frequency_state();
        let last_reset_date = persistence.load_last_reset_date();

        let mut gate = FrequencyGate::new(config.frequency, frequency, last_reset_date);
        gate.start_session();

        let mut engine = Self {
            session_id: Uuid::new_v4(),
            clock,
            account: AccountContext::default(),
            stats: StatsStore::new(stats),
            gate,
            evaluator: TriggerEvaluator::new(registry),
            presentation: PresentationController::new(),
            persistence,
            evaluation_pending: false,
            pending_events: Vec::new(),
        };

        let mut events = Vec::new();
        engine.roll_over_day(&mut events);
        engine.pending_events = events;
        engine.persistence.save_frequency_state(engine.gate.state());

        log::info!(
            "session={} milestone engine started: {} definitions, {} already shown",
            engine.session_id,
            engine.evaluator.registry().len(),
            engine.gate.state().shown_milestone_ids.len(),
        );
        engine
    }

    /// Engine with the default policy and the shipped catalog.
    pub fn build(storage: Box<dyn StateStorage>, clock: Box<dyn Clock>) -> Self {
        Self::new(storage, clock, EngineConfig::default(), MilestoneRegistry::standard())
    }

    // ── Account context ────────────────────────────────────────

    pub fn set_account(&mut self, account: AccountContext) {
        self.account = account;
    }

    pub fn account(&self) -> AccountContext {
        self.account
    }

    // ── Inbound tracking ───────────────────────────────────────

    pub fn track_calculation(&mut self, calculator_type: &str) -> Stats {
        let stats = self.stats.record_calculation(calculator_type);
        self.stats_changed(&stats);
        stats
    }

    pub fn track_bulk_run(&mut self) -> Stats {
        let stats = self.stats.record_bulk_run();
        self.stats_changed(&stats);
        stats
    }

    pub fn track_saved_calculation(&mut self) -> Stats {
        let stats = self.stats.record_save();
        self.stats_changed(&stats);
        stats
    }

    pub fn track_calc_revision(&mut self) -> Stats {
        let stats = self.stats.record_revision();
        self.stats_changed(&stats);
        stats
    }

    pub fn reset_revision_counter(&mut self) -> Stats {
        let stats = self.stats.reset_revision_counter();
        self.stats_changed(&stats);
        stats
    }

    pub fn track_pdf_export_attempt(&mut self) -> Stats {
        self.track_flag(Flag::PdfExportAttempted)
    }

    pub fn track_analytics_click(&mut self) -> Stats {
        self.track_flag(Flag::AnalyticsClicked)
    }

    pub fn track_employee_limit_hit(&mut self) -> Stats {
        self.track_flag(Flag::EmployeeLimitHit)
    }

    pub fn track_first_download(&mut self) -> Stats {
        self.track_flag(Flag::FirstDownloadShown)
    }

    fn track_flag(&mut self, flag: Flag) -> Stats {
        let (stats, was_set) = self.stats.mark_flag(flag);
        if !was_set {
            self.stats_changed(&stats);
        }
        stats
    }

    fn stats_changed(&mut self, stats: &Stats) {
        self.persistence.save_stats(stats);
        self.evaluation_pending = true;
    }

    // ── Scheduler ──────────────────────────────────────────────

    pub fn has_pending_evaluation(&self) -> bool {
        self.evaluation_pending
    }

    /// Run the deferred evaluation pass, if one is scheduled.
    /// Returns every event produced since the previous tick.
    pub fn tick(&mut self) -> Vec<MilestoneEvent> {
        let mut events = std::mem::take(&mut self.pending_events);
        if !self.evaluation_pending {
            return events;
        }
        self.evaluation_pending = false;

        self.roll_over_day(&mut events);
        self.evaluate(&mut events);
        self.persistence.save_frequency_state(self.gate.state());
        events
    }

    fn roll_over_day(&mut self, events: &mut Vec<MilestoneEvent>) {
        let today = self.clock.today();
        if self.gate.roll_over_day(today) {
            log::info!("session={} daily modal counter reset for {today}", self.session_id);
            self.persistence.save_last_reset_date(today);
            events.push(MilestoneEvent::DailyCountersReset { date: today });
        }
    }

    fn evaluate(&mut self, events: &mut Vec<MilestoneEvent>) {
        let now = self.clock.now();
        let outcome = self.evaluator.evaluate(
            self.stats.snapshot(),
            &mut self.gate,
            self.account,
            now,
        );

        for (milestone_id, reason) in outcome.suppressed {
            events.push(MilestoneEvent::ModalSuppressed { milestone_id, reason });
        }

        let Some(def) = outcome.winner else {
            log::debug!("session={} evaluation pass: no milestone", self.session_id);
            return;
        };

        self.gate.mark_shown(&def.id);
        let milestone_id = def.id.clone();
        let presentation = def.presentation;

        if presentation == PresentationType::Silent {
            log::info!("session={} silent milestone reached: {milestone_id}", self.session_id);
            events.push(MilestoneEvent::SilentMilestoneReached { milestone_id });
            return;
        }

        if self.presentation.activate(def) {
            if presentation == PresentationType::Modal {
                self.gate.record_modal_shown();
            }
            log::info!(
                "session={} activated {presentation:?} prompt {milestone_id}",
                self.session_id
            );
            events.push(MilestoneEvent::PromptActivated { milestone_id, presentation });
        } else {
            log::debug!(
                "session={} dropped {presentation:?} prompt {milestone_id}: slot occupied",
                self.session_id
            );
            events.push(MilestoneEvent::PromptDropped { milestone_id, presentation });
        }
    }

    // ── Outbound: prompt slots ─────────────────────────────────

    pub fn active_modal(&self) -> Option<&Prompt> {
        self.presentation.active_modal()
    }

    pub fn active_banner(&self) -> Option<&Prompt> {
        self.presentation.active_banner()
    }

    /// Close the modal. `was_dismissed` is true for an explicit
    /// dismissal and false when the user followed a call to action.
    /// No-op when no modal is showing.
    pub fn close_milestone_modal(&mut self, was_dismissed: bool) -> Option<MilestoneEvent> {
        let prompt = self.presentation.close_modal()?;
        if was_dismissed {
            self.gate.record_dismissal(self.clock.now());
            self.persistence.save_frequency_state(self.gate.state());
            log::info!(
                "session={} modal {} dismissed ({} dismissals)",
                self.session_id,
                prompt.milestone_id,
                self.gate.state().dismissal_count,
            );
        }
        Some(MilestoneEvent::ModalClosed {
            milestone_id: prompt.milestone_id,
            dismissed:    was_dismissed,
        })
    }

    pub fn close_milestone_banner(&mut self) -> Option<MilestoneEvent> {
        let prompt = self.presentation.close_banner()?;
        Some(MilestoneEvent::BannerClosed { milestone_id: prompt.milestone_id })
    }

    // ── Read-only views ────────────────────────────────────────

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn stats(&self) -> &Stats {
        self.stats.snapshot()
    }

    pub fn frequency_state(&self) -> &FrequencyState {
        self.gate.state()
    }

    pub fn registry(&self) -> &MilestoneRegistry {
        self.evaluator.registry()
    }

    /// Ask the gate directly, e.g. before a host-driven modal.
    pub fn can_show_modal(&mut self) -> bool {
        let now = self.clock.now();
        let allowed = self.gate.can_show_modal(self.account, now);
        // The query may have cleared an expired cooldown.
        self.persistence.save_frequency_state(self.gate.state());
        allowed
    }
}
