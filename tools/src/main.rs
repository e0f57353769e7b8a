//! milestone-runner: headless host for the milestone engine.
//!
//! Reads one JSON command per line on stdin, runs it, lets the engine
//! take its deferred evaluation turn, and writes the resulting state as
//! one JSON line on stdout.
//!
//! Usage:
//!   milestone-runner --db state.db --tier free
//!   milestone-runner --tier starter --trial --config policy.json --catalog milestones.json

use anyhow::Result;
use milestone_core::{
    clock::SystemClock,
    config::EngineConfig,
    engine::MilestoneEngine,
    event::MilestoneEvent,
    presentation::Prompt,
    registry::MilestoneRegistry,
    store::{SqliteStorage, StateStorage},
    types::{AccountContext, Tier},
};
use std::env;
use std::io::{self, BufRead, Write};

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    TrackCalculation { calculator_type: String },
    TrackBulkRun,
    TrackSavedCalculation,
    TrackPdfExportAttempt,
    TrackAnalyticsClick,
    TrackEmployeeLimitHit,
    TrackCalcRevision,
    TrackFirstDownload,
    ResetRevisionCounter,
    SetAccount { tier: Tier, #[serde(default)] trial_active: bool },
    CloseModal { dismissed: bool },
    CloseBanner,
    GetState,
    Quit,
}

#[derive(serde::Serialize)]
struct UiState<'a> {
    session_id:        String,
    account:           AccountContext,
    calculation_count: u32,
    calculator_types:  usize,
    dismissal_count:   u32,
    shown_milestones:  usize,
    active_modal:      Option<&'a Prompt>,
    active_banner:     Option<&'a Prompt>,
    events:            Vec<MilestoneEvent>,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let db = string_arg(&args, "--db").unwrap_or(":memory:");
    let tier = tier_arg(&args)?;
    let trial_active = args.iter().any(|a| a == "--trial");

    let config = match string_arg(&args, "--config") {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    let registry = match string_arg(&args, "--catalog") {
        Some(path) => MilestoneRegistry::load(path)?,
        None => MilestoneRegistry::standard(),
    };

    let storage: Box<dyn StateStorage> = if db == ":memory:" {
        Box::new(SqliteStorage::in_memory()?)
    } else {
        Box::new(SqliteStorage::open(db)?)
    };

    log::info!(
        "milestone-runner starting at {} (db={db}, tier={tier:?}, trial={trial_active})",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
    );

    let mut engine = MilestoneEngine::new(storage, Box::new(SystemClock), config, registry);
    engine.set_account(AccountContext { tier, trial_active });

    run_ipc_loop(&mut engine)
}

fn run_ipc_loop(engine: &mut MilestoneEngine) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }
        if buffer.trim().is_empty() {
            continue;
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                let err_json = serde_json::json!({ "error": e.to_string() });
                writeln!(stdout, "{}", err_json)?;
                stdout.flush()?;
                continue;
            }
        };

        if matches!(cmd, IpcCommand::Quit) {
            break;
        }

        let mut events = handle_command(engine, cmd);
        // The engine's deferred evaluation runs on the turn after the command.
        events.extend(engine.tick());

        let state = build_ui_state(engine, events);
        writeln!(stdout, "{}", serde_json::to_string(&state)?)?;
        stdout.flush()?;
    }
    Ok(())
}

fn handle_command(engine: &mut MilestoneEngine, cmd: IpcCommand) -> Vec<MilestoneEvent> {
    match cmd {
        IpcCommand::TrackCalculation { calculator_type } => {
            engine.track_calculation(&calculator_type);
        }
        IpcCommand::TrackBulkRun          => { engine.track_bulk_run(); }
        IpcCommand::TrackSavedCalculation => { engine.track_saved_calculation(); }
        IpcCommand::TrackPdfExportAttempt => { engine.track_pdf_export_attempt(); }
        IpcCommand::TrackAnalyticsClick   => { engine.track_analytics_click(); }
        IpcCommand::TrackEmployeeLimitHit => { engine.track_employee_limit_hit(); }
        IpcCommand::TrackCalcRevision     => { engine.track_calc_revision(); }
        IpcCommand::TrackFirstDownload    => { engine.track_first_download(); }
        IpcCommand::ResetRevisionCounter  => { engine.reset_revision_counter(); }
        IpcCommand::SetAccount { tier, trial_active } => {
            engine.set_account(AccountContext { tier, trial_active });
        }
        IpcCommand::CloseModal { dismissed } => {
            return engine.close_milestone_modal(dismissed).into_iter().collect();
        }
        IpcCommand::CloseBanner => {
            return engine.close_milestone_banner().into_iter().collect();
        }
        IpcCommand::GetState | IpcCommand::Quit => {}
    }
    Vec::new()
}

fn build_ui_state(engine: &MilestoneEngine, events: Vec<MilestoneEvent>) -> UiState<'_> {
    let stats = engine.stats();
    let frequency = engine.frequency_state();
    UiState {
        session_id:        engine.session_id().to_string(),
        account:           engine.account(),
        calculation_count: stats.calculation_count,
        calculator_types:  stats.calculator_types_used.len(),
        dismissal_count:   frequency.dismissal_count,
        shown_milestones:  frequency.shown_milestone_ids.len(),
        active_modal:      engine.active_modal(),
        active_banner:     engine.active_banner(),
        events,
    }
}

fn string_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

/// `--tier` value, Free when absent. An unknown tier is an error.
fn tier_arg(args: &[String]) -> Result<Tier> {
    match string_arg(args, "--tier") {
        Some(raw) => raw.parse().map_err(|e: String| anyhow::anyhow!("--tier: {e}")),
        None => Ok(Tier::Free),
    }
}
