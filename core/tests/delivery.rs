//! Milestone delivery tests.
//!
//! Tests cover: exact-threshold firing, at-most-once delivery across
//! restarts, coalesced evaluation, registry priority, slot handling,
//! tier scoping and silent milestones.

use chrono::{TimeZone, Utc};
use milestone_core::{
    clock::ManualClock,
    engine::MilestoneEngine,
    event::MilestoneEvent,
    store::MemoryStorage,
    types::{AccountContext, PresentationType, Tier},
};

fn clock() -> ManualClock {
    ManualClock::new(Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap())
}

fn open(storage: &MemoryStorage, clock: &ManualClock) -> MilestoneEngine {
    let _ = env_logger::builder().is_test(true).try_init();
    MilestoneEngine::build(Box::new(storage.clone()), Box::new(clock.clone()))
}

fn activated(events: &[MilestoneEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            MilestoneEvent::PromptActivated { milestone_id, .. } => Some(milestone_id.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn tenth_calculation_fires_calculation_10_exactly_once() {
    let storage = MemoryStorage::new();
    let clock = clock();
    let mut engine = open(&storage, &clock);

    for i in 1..=9 {
        engine.track_calculation("income_tax");
        let events = engine.tick();
        assert!(activated(&events).is_empty(), "Calculation {i} must not activate a prompt");
        assert!(engine.active_modal().is_none());
    }

    engine.track_calculation("income_tax");
    let events = engine.tick();
    assert_eq!(activated(&events), vec!["CALCULATION_10".to_string()]);
    let modal = engine.active_modal().expect("CALCULATION_10 modal active");
    assert_eq!(modal.milestone_id, "CALCULATION_10");
    assert_eq!(modal.presentation, PresentationType::Modal);

    engine.close_milestone_modal(false);
    engine.track_calculation("income_tax");
    let events = engine.tick();
    assert!(activated(&events).is_empty(), "Eleventh calculation must not re-fire");
    assert!(engine.active_modal().is_none());
}

#[test]
fn shown_milestone_is_not_redelivered_after_restart() {
    let storage = MemoryStorage::new();
    let clock = clock();
    {
        let mut engine = open(&storage, &clock);
        for _ in 0..10 {
            engine.track_calculation("vat");
        }
        engine.tick();
        assert!(engine.active_modal().is_some());
    }

    // Next day, counters still sit on the threshold.
    clock.advance_days(1);
    let mut engine = open(&storage, &clock);
    assert_eq!(engine.stats().calculation_count, 10);
    assert!(engine.frequency_state().shown_milestone_ids.contains("CALCULATION_10"));

    engine.track_saved_calculation();
    let events = engine.tick();
    assert!(activated(&events).is_empty(), "Got {events:?}");
}

#[test]
fn rapid_tracking_calls_coalesce_into_one_pass() {
    let storage = MemoryStorage::new();
    let clock = clock();
    let mut engine = open(&storage, &clock);

    for _ in 0..10 {
        engine.track_calculation("payroll");
    }
    assert!(engine.has_pending_evaluation());
    assert!(engine.active_modal().is_none(), "Evaluation must wait for the tick");

    let events = engine.tick();
    assert_eq!(activated(&events), vec!["CALCULATION_10".to_string()]);
    assert!(!engine.has_pending_evaluation());

    let events = engine.tick();
    assert!(events.is_empty(), "Idle tick must not evaluate: {events:?}");
}

#[test]
fn earlier_registry_entry_wins_when_several_match() {
    let storage = MemoryStorage::new();
    let clock = clock();
    let mut engine = open(&storage, &clock);

    for _ in 0..10 {
        engine.track_calculation("income_tax");
    }
    engine.track_pdf_export_attempt();
    let events = engine.tick();

    assert_eq!(activated(&events), vec!["PDF_EXPORT_ATTEMPT".to_string()]);
    let shown = &engine.frequency_state().shown_milestone_ids;
    assert!(shown.contains("PDF_EXPORT_ATTEMPT"));
    assert!(!shown.contains("CALCULATION_10"), "Loser of the pass must stay eligible");
}

#[test]
fn modal_and_banner_can_be_active_together() {
    let storage = MemoryStorage::new();
    let clock = clock();
    let mut engine = open(&storage, &clock);

    engine.track_pdf_export_attempt();
    engine.tick();
    engine.track_first_download();
    engine.tick();

    assert_eq!(engine.active_modal().map(|p| p.milestone_id.as_str()), Some("PDF_EXPORT_ATTEMPT"));
    assert_eq!(engine.active_banner().map(|p| p.milestone_id.as_str()), Some("FIRST_DOWNLOAD"));

    let closed = engine.close_milestone_banner();
    assert_eq!(
        closed,
        Some(MilestoneEvent::BannerClosed { milestone_id: "FIRST_DOWNLOAD".into() })
    );
    assert!(engine.active_banner().is_none());
    assert!(engine.active_modal().is_some(), "Closing the banner leaves the modal alone");
    assert_eq!(engine.frequency_state().dismissal_count, 0, "Banners carry no dismissal penalty");
}

#[test]
fn banner_into_occupied_slot_is_dropped_and_consumed() {
    let storage = MemoryStorage::new();
    let clock = clock();
    let mut engine = open(&storage, &clock);

    engine.track_first_download();
    engine.tick();
    for _ in 0..3 {
        engine.track_calc_revision();
    }
    let events = engine.tick();

    assert!(events.contains(&MilestoneEvent::PromptDropped {
        milestone_id: "CALC_REVISIONS_3".into(),
        presentation: PresentationType::Banner,
    }));
    assert_eq!(engine.active_banner().map(|p| p.milestone_id.as_str()), Some("FIRST_DOWNLOAD"));
    assert!(engine.frequency_state().shown_milestone_ids.contains("CALC_REVISIONS_3"));
}

#[test]
fn repeated_flag_tracking_is_a_no_op() {
    let storage = MemoryStorage::new();
    let clock = clock();
    let mut engine = open(&storage, &clock);

    let stats = engine.track_first_download();
    assert!(stats.first_download_shown);
    engine.tick();
    engine.close_milestone_banner();

    engine.track_first_download();
    assert!(!engine.has_pending_evaluation(), "Already-set flag must not schedule a pass");
}

#[test]
fn tier_scope_limits_eligibility() {
    let storage = MemoryStorage::new();
    let clock = clock();
    let mut engine = open(&storage, &clock);

    engine.track_employee_limit_hit();
    let events = engine.tick();
    assert!(activated(&events).is_empty(), "EMPLOYEE_LIMIT_HIT is Starter-only");
    assert!(!engine.frequency_state().shown_milestone_ids.contains("EMPLOYEE_LIMIT_HIT"));

    engine.set_account(AccountContext { tier: Tier::Starter, trial_active: false });
    engine.track_calculation("payroll");
    let events = engine.tick();
    assert_eq!(activated(&events), vec!["EMPLOYEE_LIMIT_HIT".to_string()]);
    assert_eq!(
        engine.active_banner().map(|p| p.payload.target_tier),
        Some(Tier::Business)
    );
}

#[test]
fn silent_milestone_is_recorded_but_never_rendered() {
    let storage = MemoryStorage::new();
    let clock = clock();
    let mut engine = open(&storage, &clock);
    engine.set_account(AccountContext { tier: Tier::Business, trial_active: false });

    for _ in 0..50 {
        engine.track_calculation("income_tax");
    }
    let events = engine.tick();

    assert!(events.contains(&MilestoneEvent::SilentMilestoneReached {
        milestone_id: "POWER_USER_50".into(),
    }));
    assert!(engine.active_modal().is_none());
    assert!(engine.active_banner().is_none());
    assert_eq!(engine.frequency_state().modals_shown_today, 0);

    engine.track_calculation("income_tax");
    let events = engine.tick();
    assert!(events.is_empty(), "Silent milestone must be delivered once: {events:?}");
}

#[test]
fn unknown_calculator_types_are_recorded_as_is() {
    let storage = MemoryStorage::new();
    let clock = clock();
    let mut engine = open(&storage, &clock);

    engine.track_calculation("income_tax");
    engine.track_calculation("");
    let stats = engine.track_calculation("not-a-real-calculator");

    assert_eq!(stats.calculation_count, 3);
    assert_eq!(stats.calculator_types_used.len(), 3);
    assert!(stats.calculator_types_used.contains(""));
}

#[test]
fn three_distinct_calculators_fire_banner() {
    let storage = MemoryStorage::new();
    let clock = clock();
    let mut engine = open(&storage, &clock);

    for calc in ["income_tax", "income_tax", "vat"] {
        engine.track_calculation(calc);
    }
    assert!(activated(&engine.tick()).is_empty());

    engine.track_calculation("payroll");
    let events = engine.tick();
    assert_eq!(activated(&events), vec!["MULTI_CALCULATOR_3".to_string()]);
}
