pub mod safety_monitor;
pub mod session;

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::export::{CsvExporter, SessionExporter};
use crate::simulation::CommandHandle;

pub use safety_monitor::{ThresholdMonitor, Thresholds, Warning, WarningFlags, WarningKind};
pub use session::{
    Advance, EngineSnapshot, PendingExport, SessionConfig, SessionController, SessionPhase,
    StopOutcome, StopReason, StopRecord, StopStep, TickOutcome,
};

/// Shared handles for the engine task and the HTTP layer.
#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub session: Arc<Mutex<SessionController>>,
    pub commands: CommandHandle,
}

impl AppState {
    /// Engine exporting finished sessions to `cfg.export.dir`.
    pub fn new(cfg: Config) -> Self {
        let exporter = CsvExporter::new(cfg.export.dir.clone());
        info!(dir = %exporter.dir().display(), "session logs export as CSV");
        Self::with_exporter(cfg, Box::new(exporter))
    }

    pub fn with_exporter(cfg: Config, exporter: Box<dyn SessionExporter>) -> Self {
        let commands = CommandHandle::default();
        let controller = SessionController::new(
            cfg.session.clone(),
            cfg.battery.clone(),
            cfg.thresholds.clone(),
            commands.clone(),
            exporter,
        )
        .with_estimator_config(cfg.estimator.clone());

        Self {
            cfg: Arc::new(cfg),
            session: Arc::new(Mutex::new(controller)),
            commands,
        }
    }
}

/// Spawn the engine loop: one tick every `session.tick_interval_ms`.
pub fn spawn_engine_task(state: AppState) -> JoinHandle<()> {
    let period = state.cfg.session.tick_interval();
    tokio::spawn(run_engine(state.session, period))
}

async fn run_engine(session: Arc<Mutex<SessionController>>, period: Duration) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!(tick_ms = period.as_millis() as u64, "engine loop started");

    loop {
        interval.tick().await;
        let advance = session.lock().await.advance(Instant::now());
        if let Advance::Ended { reason, step } = advance {
            let outcome = finish_stop(&session, step).await;
            match &outcome {
                StopOutcome::ExportFailed { reason: err } => {
                    warn!(%reason, error = %err, "session ended, export failed")
                }
                _ => info!(%reason, ?outcome, "session ended by engine"),
            }
        }
    }
}

/// Stop the session. The log is written on the blocking pool with the
/// session lock released.
pub async fn stop_and_export(
    session: &Mutex<SessionController>,
    reason: StopReason,
) -> StopOutcome {
    let step = session.lock().await.begin_stop(reason, Instant::now());
    finish_stop(session, step).await
}

async fn finish_stop(session: &Mutex<SessionController>, step: StopStep) -> StopOutcome {
    let pending = match step {
        StopStep::Done(outcome) => return outcome,
        StopStep::Export(pending) => pending,
    };

    let fallback = pending.record(StopOutcome::ExportFailed {
        reason: "export task did not complete".to_string(),
    });
    let record = match tokio::task::spawn_blocking(move || pending.run()).await {
        Ok(record) => record,
        Err(e) => {
            error!(session_id = %fallback.session_id, error = %e, "export task failed");
            fallback
        }
    };

    let outcome = record.outcome.clone();
    session.lock().await.complete_stop(record);
    outcome
}

/// Stop a running session on process shutdown so its log is exported.
pub async fn shutdown(state: &AppState) -> StopOutcome {
    let outcome = stop_and_export(&state.session, StopReason::Shutdown).await;
    if outcome != StopOutcome::AlreadyIdle {
        info!(?outcome, "session stopped on shutdown");
    }
    outcome
}
