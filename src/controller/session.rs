//! # Session Controller
//!
//! Owns every piece of mutable simulation state for one run and drives the
//! `Idle -> Running -> Idle` lifecycle.
//!
//! Each [`SessionController::tick`] reads the command vector once, advances
//! the integrator by the elapsed wall time, lets the sampler decide whether a
//! telemetry sample is due, and enforces the two automatic cutoffs:
//! - maximum session duration (countdown from start)
//! - low charge (`soc <= 0.1`)
//!
//! Stopping is idempotent and always hands the accumulated log to the
//! configured [`SessionExporter`]; an empty log skips the export. The stop is
//! split in two so async callers can write the file after releasing their
//! lock: [`SessionController::begin_stop`] freezes the session and returns a
//! [`PendingExport`], whose blocking [`PendingExport::run`] result goes back
//! through [`SessionController::complete_stop`].

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use validator::Validate;

use super::safety_monitor::{ThresholdMonitor, Thresholds, WarningFlags};
use crate::error::{ExportError, SimError};
use crate::export::SessionExporter;
use crate::simulation::{
    BatteryParams, CommandHandle, CommandVector, DerivedState, EstimatorConfig, Integrator,
    NoiseSource, NoisyEstimator, SessionLog, SimulationState, SocEstimator, StepReport,
    TelemetryHistory, TelemetrySample, TelemetrySampler,
};

/// Session timing and environment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SessionConfig {
    /// Ambient temperature, constant for the session (°C)
    #[validate(range(min = -40.0, max = 60.0))]
    pub ambient_temp_c: f64,

    /// Session stops automatically after this long (s)
    #[validate(range(min = 1))]
    pub max_duration_s: u64,

    /// Engine tick interval (ms), roughly one display frame
    #[validate(range(min = 1, max = 1000))]
    pub tick_interval_ms: u64,

    /// Telemetry sampling period (ms)
    #[validate(range(min = 1))]
    pub sample_period_ms: u64,

    /// Length of each live-chart buffer
    #[validate(range(min = 1, max = 10000))]
    pub history_len: usize,

    /// Terminal voltage noise half-width (V)
    #[validate(range(min = 0.0))]
    pub voltage_noise_v: f64,

    /// Seed for all noise sources; `None` seeds from entropy
    pub random_seed: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ambient_temp_c: 25.0,
            max_duration_s: 600,
            tick_interval_ms: 16,
            sample_period_ms: 100,
            history_len: 50,
            voltage_noise_v: 0.05,
            random_seed: None,
        }
    }
}

impl SessionConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub fn sample_period(&self) -> Duration {
        Duration::from_millis(self.sample_period_ms)
    }

    pub fn max_duration(&self) -> Duration {
        Duration::from_secs(self.max_duration_s)
    }

    fn estimator_seed(&self) -> Option<u64> {
        self.random_seed.map(|seed| seed.wrapping_add(1))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SessionPhase {
    Idle,
    Running,
}

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StopReason {
    /// Explicit external request
    Requested,
    /// Maximum session duration reached
    DurationElapsed,
    /// SOC fell to the cutoff
    LowCharge,
    /// Process shutting down
    Shutdown,
}

/// Result of a stop request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StopOutcome {
    /// Nothing was running
    AlreadyIdle,
    /// Session ended before any sample was taken; export skipped
    NoData,
    /// Log written by the exporter
    Exported { path: PathBuf, samples: usize },
    /// Exporter failed; the log is still held in memory
    ExportFailed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopRecord {
    pub session_id: Uuid,
    pub reason: StopReason,
    pub outcome: StopOutcome,
    pub elapsed_s: f64,
}

/// Result of one engine tick
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// No session running
    Idle,
    /// Physics advanced; `sampled` is set when a telemetry sample was taken
    Advanced { report: StepReport, sampled: bool },
    /// The tick ended the session
    Stopped { reason: StopReason, outcome: StopOutcome },
}

/// Result of one engine step before any export has run
#[derive(Debug)]
pub enum Advance {
    Idle,
    Running { report: StepReport, sampled: bool },
    Ended { reason: StopReason, step: StopStep },
}

/// First half of a stop
#[derive(Debug)]
pub enum StopStep {
    /// Nothing to export; final outcome
    Done(StopOutcome),
    /// Log still has to be written
    Export(PendingExport),
}

/// Frozen log of a stopped session, waiting for the exporter.
pub struct PendingExport {
    session_id: Uuid,
    reason: StopReason,
    elapsed_s: f64,
    log: SessionLog,
    exporter: Arc<Mutex<Box<dyn SessionExporter>>>,
}

impl fmt::Debug for PendingExport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingExport")
            .field("session_id", &self.session_id)
            .field("reason", &self.reason)
            .field("samples", &self.log.len())
            .finish_non_exhaustive()
    }
}

impl PendingExport {
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn record(&self, outcome: StopOutcome) -> StopRecord {
        StopRecord {
            session_id: self.session_id,
            reason: self.reason,
            outcome,
            elapsed_s: self.elapsed_s,
        }
    }

    /// Write the log. Blocks on file I/O.
    pub fn run(self) -> StopRecord {
        let result = self.exporter.lock().export(&self.log);
        let outcome = match result {
            Ok(path) => StopOutcome::Exported {
                path,
                samples: self.log.len(),
            },
            Err(ExportError::EmptyLog) => StopOutcome::NoData,
            Err(e) => {
                error!(session_id = %self.session_id, error = %e, "session export failed");
                StopOutcome::ExportFailed {
                    reason: e.to_string(),
                }
            }
        };
        self.record(outcome)
    }
}

/// Wall-clock countdown to the maximum session duration, independent of the
/// physics step.
#[derive(Debug, Clone, Copy)]
struct Countdown {
    deadline: Instant,
}

impl Countdown {
    fn new(start: Instant, duration: Duration) -> Self {
        Self {
            deadline: start + duration,
        }
    }

    fn remaining(&self, now: Instant) -> Duration {
        self.deadline.saturating_duration_since(now)
    }

    fn expired(&self, now: Instant) -> bool {
        now >= self.deadline
    }
}

#[derive(Debug, Clone, Copy)]
struct RunClock {
    started_at: Instant,
    last_tick_at: Instant,
    countdown: Countdown,
}

/// Read-only view of the engine for UIs and the HTTP layer.
#[derive(Debug, Clone, Serialize)]
pub struct EngineSnapshot {
    pub phase: SessionPhase,
    pub session_id: Option<Uuid>,
    pub elapsed_s: f64,
    pub remaining_s: f64,
    pub state: SimulationState,
    pub derived: DerivedState,
    pub command: CommandVector,
    pub warnings: WarningFlags,
    pub samples: usize,
    pub latest: Option<TelemetrySample>,
    pub last_stop: Option<StopRecord>,
}

pub struct SessionController {
    config: SessionConfig,
    integrator: Integrator,
    commands: CommandHandle,
    monitor: ThresholdMonitor,
    estimator: Box<dyn SocEstimator>,
    exporter: Arc<Mutex<Box<dyn SessionExporter>>>,
    sampler: TelemetrySampler,
    noise: NoiseSource,
    state: SimulationState,
    log: SessionLog,
    history: TelemetryHistory,
    phase: SessionPhase,
    session_id: Option<Uuid>,
    clock: Option<RunClock>,
    frozen_elapsed: Duration,
    last_stop: Option<StopRecord>,
}

impl SessionController {
    /// Create an idle controller using the synthetic estimator with default
    /// noise amplitudes.
    pub fn new(
        config: SessionConfig,
        params: BatteryParams,
        thresholds: Thresholds,
        commands: CommandHandle,
        exporter: Box<dyn SessionExporter>,
    ) -> Self {
        let integrator = Integrator::new(params.clone(), config.ambient_temp_c)
            .with_voltage_noise(config.voltage_noise_v);
        let estimator = Box::new(NoisyEstimator::new(
            EstimatorConfig::default(),
            config.estimator_seed(),
        ));

        Self {
            integrator,
            commands,
            monitor: ThresholdMonitor::new(thresholds),
            estimator,
            exporter: Arc::new(Mutex::new(exporter)),
            sampler: TelemetrySampler::new(config.sample_period()),
            noise: NoiseSource::from_seed(config.random_seed),
            state: SimulationState::initial(&params, config.ambient_temp_c),
            log: SessionLog::new(),
            history: TelemetryHistory::new(config.history_len),
            phase: SessionPhase::Idle,
            session_id: None,
            clock: None,
            frozen_elapsed: Duration::ZERO,
            last_stop: None,
            config,
        }
    }

    /// Replace the model-trajectory estimator.
    pub fn with_estimator(mut self, estimator: Box<dyn SocEstimator>) -> Self {
        self.estimator = estimator;
        self
    }

    /// Synthetic estimator with the given noise amplitudes, seeded from the
    /// session seed.
    pub fn with_estimator_config(self, config: EstimatorConfig) -> Self {
        let seed = self.config.estimator_seed();
        self.with_estimator(Box::new(NoisyEstimator::new(config, seed)))
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn params(&self) -> &BatteryParams {
        self.integrator.params()
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase == SessionPhase::Running
    }

    pub fn session_id(&self) -> Option<Uuid> {
        self.session_id
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn log(&self) -> &SessionLog {
        &self.log
    }

    pub fn history(&self) -> &TelemetryHistory {
        &self.history
    }

    pub fn warnings(&self) -> WarningFlags {
        self.monitor.flags()
    }

    pub fn commands(&self) -> &CommandHandle {
        &self.commands
    }

    pub fn last_stop(&self) -> Option<&StopRecord> {
        self.last_stop.as_ref()
    }

    /// Wall time since start; frozen once the session stops.
    pub fn elapsed(&self, now: Instant) -> Duration {
        match &self.clock {
            Some(clock) => now.saturating_duration_since(clock.started_at),
            None => self.frozen_elapsed,
        }
    }

    /// Time left before the duration cutoff; zero when idle.
    pub fn remaining(&self, now: Instant) -> Duration {
        self.clock
            .map(|clock| clock.countdown.remaining(now))
            .unwrap_or(Duration::ZERO)
    }

    /// Reset to initial conditions and start running.
    pub fn start(&mut self, now: Instant) -> Result<Uuid, SimError> {
        if let (SessionPhase::Running, Some(id)) = (self.phase, self.session_id) {
            return Err(SimError::SessionActive(id));
        }

        let params = self.integrator.params().clone();
        self.state = SimulationState::initial(&params, self.integrator.ambient_c());
        self.log.clear();
        self.history.clear();
        self.monitor.reset();
        self.sampler.reset();
        self.noise = NoiseSource::from_seed(self.config.random_seed);
        self.estimator.reset();

        let id = Uuid::new_v4();
        self.session_id = Some(id);
        self.clock = Some(RunClock {
            started_at: now,
            last_tick_at: now,
            countdown: Countdown::new(now, self.config.max_duration()),
        });
        self.frozen_elapsed = Duration::ZERO;
        self.last_stop = None;
        self.phase = SessionPhase::Running;

        info!(
            session_id = %id,
            ambient_c = self.integrator.ambient_c(),
            soc = self.state.soc,
            max_duration_s = self.config.max_duration_s,
            sample_period_ms = self.sampler.period().as_millis() as u64,
            "session started"
        );
        Ok(id)
    }

    /// Stop the session and export its log. Safe to call at any time; a
    /// second call returns [`StopOutcome::AlreadyIdle`].
    pub fn stop(&mut self, reason: StopReason, now: Instant) -> StopOutcome {
        let step = self.begin_stop(reason, now);
        self.finish(step)
    }

    /// Freeze the session and zero the pedals. The log is copied into a
    /// [`PendingExport`] unless it is empty.
    pub fn begin_stop(&mut self, reason: StopReason, now: Instant) -> StopStep {
        let (SessionPhase::Running, Some(session_id)) = (self.phase, self.session_id) else {
            debug!(%reason, "stop requested while idle");
            return StopStep::Done(StopOutcome::AlreadyIdle);
        };

        self.commands.update(|cmd| {
            cmd.throttle = 0.0;
            cmd.is_braking = false;
        });
        self.frozen_elapsed = self.elapsed(now);
        self.clock = None;
        self.phase = SessionPhase::Idle;

        info!(
            session_id = %session_id,
            %reason,
            samples = self.log.len(),
            soc = self.state.soc,
            soh = self.state.soh,
            elapsed_s = self.frozen_elapsed.as_secs_f64(),
            "session stopped"
        );

        let pending = PendingExport {
            session_id,
            reason,
            elapsed_s: self.frozen_elapsed.as_secs_f64(),
            log: SessionLog::new(),
            exporter: Arc::clone(&self.exporter),
        };

        if self.log.is_empty() {
            warn!(session_id = %session_id, "no telemetry recorded, export skipped");
            self.last_stop = Some(pending.record(StopOutcome::NoData));
            return StopStep::Done(StopOutcome::NoData);
        }

        StopStep::Export(PendingExport {
            log: self.log.clone(),
            ..pending
        })
    }

    /// Store the result of a [`PendingExport`]. Ignored when another session
    /// has started since.
    pub fn complete_stop(&mut self, record: StopRecord) {
        if self.phase == SessionPhase::Idle && self.session_id == Some(record.session_id) {
            self.last_stop = Some(record);
        }
    }

    fn finish(&mut self, step: StopStep) -> StopOutcome {
        match step {
            StopStep::Done(outcome) => outcome,
            StopStep::Export(pending) => {
                let record = pending.run();
                let outcome = record.outcome.clone();
                self.complete_stop(record);
                outcome
            }
        }
    }

    /// Advance the running session to `now`, exporting inline if it ends.
    pub fn tick(&mut self, now: Instant) -> TickOutcome {
        match self.advance(now) {
            Advance::Idle => TickOutcome::Idle,
            Advance::Running { report, sampled } => TickOutcome::Advanced { report, sampled },
            Advance::Ended { reason, step } => TickOutcome::Stopped {
                reason,
                outcome: self.finish(step),
            },
        }
    }

    /// Advance the running session to `now`. An automatic stop is returned
    /// as a [`StopStep`] for the caller to finish.
    pub fn advance(&mut self, now: Instant) -> Advance {
        let Some(clock) = self.clock.as_mut() else {
            return Advance::Idle;
        };
        if self.phase != SessionPhase::Running {
            return Advance::Idle;
        }

        if clock.countdown.expired(now) {
            let reason = StopReason::DurationElapsed;
            let step = self.begin_stop(reason, now);
            return Advance::Ended { reason, step };
        }

        let dt_wall = now.saturating_duration_since(clock.last_tick_at);
        clock.last_tick_at = now;
        let elapsed = now.saturating_duration_since(clock.started_at);

        let cmd = self.commands.snapshot();
        let report = self
            .integrator
            .step(&mut self.state, &cmd, dt_wall, &mut self.noise);

        let sampled = self.sampler.poll(elapsed);
        if sampled {
            self.record_sample(elapsed);
        }

        if report.cutoff {
            let reason = StopReason::LowCharge;
            let step = self.begin_stop(reason, now);
            return Advance::Ended { reason, step };
        }

        Advance::Running { report, sampled }
    }

    fn record_sample(&mut self, elapsed: Duration) {
        let model = self.estimator.estimate(&self.state);
        let sample = TelemetrySample::new(elapsed, &self.state, model);
        self.log.push(sample);
        self.history.record(&sample);
        let flags = self.monitor.evaluate(&self.state, &self.commands);

        debug!(
            time_s = sample.time_s,
            current_a = sample.current_a,
            voltage_v = sample.voltage_v,
            soc = sample.soc_actual,
            temperature_c = sample.temperature_c,
            warnings = flags.any(),
            "telemetry sample"
        );
    }

    pub fn snapshot(&self, now: Instant) -> EngineSnapshot {
        EngineSnapshot {
            phase: self.phase,
            session_id: self.session_id,
            elapsed_s: self.elapsed(now).as_secs_f64(),
            remaining_s: self.remaining(now).as_secs_f64(),
            state: self.state,
            derived: self.state.derived(self.integrator.params()),
            command: self.commands.snapshot(),
            warnings: self.monitor.flags(),
            samples: self.log.len(),
            latest: self.log.last().copied(),
            last_stop: self.last_stop.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Default)]
    struct RecordingExporter {
        exports: Arc<Mutex<Vec<Vec<TelemetrySample>>>>,
    }

    impl SessionExporter for RecordingExporter {
        fn export(&mut self, log: &SessionLog) -> Result<PathBuf, ExportError> {
            let mut exports = self.exports.lock();
            exports.push(log.samples().to_vec());
            Ok(PathBuf::from(format!("memory://{}", exports.len())))
        }
    }

    struct FailingExporter;

    impl SessionExporter for FailingExporter {
        fn export(&mut self, _log: &SessionLog) -> Result<PathBuf, ExportError> {
            Err(ExportError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only",
            )))
        }
    }

    fn seeded_config() -> SessionConfig {
        SessionConfig {
            random_seed: Some(1234),
            ..Default::default()
        }
    }

    fn controller(config: SessionConfig) -> (SessionController, CommandHandle, RecordingExporter) {
        let commands = CommandHandle::default();
        let exporter = RecordingExporter::default();
        let ctl = SessionController::new(
            config,
            BatteryParams::default(),
            Thresholds::default(),
            commands.clone(),
            Box::new(exporter.clone()),
        );
        (ctl, commands, exporter)
    }

    fn run_ticks(ctl: &mut SessionController, t0: Instant, from: u64, to: u64, step_ms: u64) -> Instant {
        let mut now = t0;
        for i in from..=to {
            now = t0 + Duration::from_millis(i * step_ms);
            ctl.tick(now);
        }
        now
    }

    #[test]
    fn test_start_resets_to_initial_conditions() {
        let (mut ctl, commands, _) = controller(seeded_config());
        let t0 = Instant::now();
        ctl.start(t0).unwrap();
        commands.update(|c| c.throttle = 100.0);
        run_ticks(&mut ctl, t0, 1, 100, 16);
        assert!(ctl.state().soc < 80.0);
        ctl.stop(StopReason::Requested, t0 + Duration::from_secs(2));

        let t1 = t0 + Duration::from_secs(3);
        ctl.start(t1).unwrap();
        assert_eq!(ctl.state().soc, 80.0);
        assert_eq!(ctl.state().soh, 100.0);
        assert_eq!(ctl.state().temperature_c, 25.0);
        assert_eq!(ctl.state().speed_kmh, 0.0);
        assert!(ctl.log().is_empty());
        assert!(ctl.history().current.is_empty());
        assert!(!ctl.warnings().any());
    }

    #[test]
    fn test_start_while_running_is_rejected() {
        let (mut ctl, _, _) = controller(seeded_config());
        let t0 = Instant::now();
        let id = ctl.start(t0).unwrap();
        assert!(matches!(ctl.start(t0), Err(SimError::SessionActive(active)) if active == id));
    }

    #[test]
    fn test_immediate_stop_yields_no_data() {
        let (mut ctl, _, exporter) = controller(seeded_config());
        let t0 = Instant::now();
        ctl.start(t0).unwrap();
        ctl.tick(t0 + Duration::from_millis(16));
        let outcome = ctl.stop(StopReason::Requested, t0 + Duration::from_millis(20));
        assert_eq!(outcome, StopOutcome::NoData);
        assert!(exporter.exports.lock().is_empty());
    }

    #[test]
    fn test_stop_is_idempotent_and_zeroes_pedals() {
        let (mut ctl, commands, exporter) = controller(seeded_config());
        let t0 = Instant::now();
        ctl.start(t0).unwrap();
        commands.update(|c| {
            c.throttle = 40.0;
            c.is_braking = true;
            c.grade = 3.0;
        });
        run_ticks(&mut ctl, t0, 1, 20, 16);

        let first = ctl.stop(StopReason::Requested, t0 + Duration::from_millis(400));
        assert!(matches!(first, StopOutcome::Exported { samples: 2, .. }));
        let second = ctl.stop(StopReason::Requested, t0 + Duration::from_millis(500));
        assert_eq!(second, StopOutcome::AlreadyIdle);

        let cmd = commands.snapshot();
        assert_eq!(cmd.throttle, 0.0);
        assert!(!cmd.is_braking);
        assert_eq!(cmd.grade, 3.0);
        assert_eq!(exporter.exports.lock().len(), 1);
        assert_eq!(ctl.phase(), SessionPhase::Idle);
        assert_eq!(ctl.tick(t0 + Duration::from_secs(1)), TickOutcome::Idle);
    }

    #[test]
    fn test_log_frozen_after_stop() {
        let (mut ctl, _, _) = controller(seeded_config());
        let t0 = Instant::now();
        ctl.start(t0).unwrap();
        run_ticks(&mut ctl, t0, 1, 50, 16);
        ctl.stop(StopReason::Requested, t0 + Duration::from_secs(1));
        let len = ctl.log().len();
        let state = *ctl.state();
        run_ticks(&mut ctl, t0, 51, 100, 16);
        assert_eq!(ctl.log().len(), len);
        assert_eq!(*ctl.state(), state);
    }

    #[test]
    fn test_duration_countdown_stops_session() {
        let (mut ctl, _, exporter) = controller(SessionConfig {
            max_duration_s: 1,
            ..seeded_config()
        });
        let t0 = Instant::now();
        ctl.start(t0).unwrap();
        run_ticks(&mut ctl, t0, 1, 62, 16);
        assert!(ctl.is_running());

        let outcome = ctl.tick(t0 + Duration::from_millis(1_000));
        assert!(matches!(
            outcome,
            TickOutcome::Stopped {
                reason: StopReason::DurationElapsed,
                outcome: StopOutcome::Exported { .. }
            }
        ));
        assert_eq!(exporter.exports.lock().len(), 1);
        assert_eq!(ctl.last_stop().unwrap().reason, StopReason::DurationElapsed);
    }

    #[test]
    fn test_low_charge_cutoff_stops_session() {
        let (mut ctl, commands, exporter) = controller(SessionConfig {
            max_duration_s: 100_000,
            ..seeded_config()
        });
        commands.update(|c| {
            c.throttle = 100.0;
            c.time_warp = 1000;
        });
        let t0 = Instant::now();
        ctl.start(t0).unwrap();

        let mut stopped = None;
        for i in 1..=20_000u64 {
            if let TickOutcome::Stopped { reason, .. } = ctl.tick(t0 + Duration::from_millis(i * 16)) {
                stopped = Some(reason);
                break;
            }
        }
        assert_eq!(stopped, Some(StopReason::LowCharge));
        assert!(ctl.state().soc <= 0.1);
        assert_eq!(exporter.exports.lock().len(), 1);
    }

    #[test]
    fn test_samples_are_time_ordered_and_bounded_history() {
        let (mut ctl, commands, _) = controller(seeded_config());
        commands.update(|c| c.throttle = 30.0);
        let t0 = Instant::now();
        ctl.start(t0).unwrap();
        let now = run_ticks(&mut ctl, t0, 1, 600, 16);

        let samples = ctl.log().samples();
        assert!(samples.len() > 50);
        assert!(samples.windows(2).all(|w| w[0].time_s < w[1].time_s));
        assert!(samples.windows(2).all(|w| w[1].time_s - w[0].time_s >= 0.1 - 1e-9));
        assert_eq!(ctl.history().soc.len(), 50);
        assert_eq!(
            ctl.history().current.latest().copied(),
            samples.last().map(|s| s.current_a)
        );
        let history: Vec<f64> = ctl.history().soc.to_vec();
        assert_eq!(history.len(), 50);
        assert_eq!(history[49], samples[samples.len() - 1].soc_actual);
        assert_eq!(history[0], samples[samples.len() - 50].soc_actual);
        assert_eq!(
            ctl.snapshot(now).latest,
            samples.last().copied()
        );
    }

    #[test]
    fn test_seeded_runs_are_identical() {
        let run = || {
            let (mut ctl, commands, _) = controller(seeded_config());
            let t0 = Instant::now();
            ctl.start(t0).unwrap();
            for i in 1..=300u64 {
                if i == 100 {
                    commands.update(|c| c.throttle = 60.0);
                }
                if i == 200 {
                    commands.update(|c| {
                        c.throttle = 0.0;
                        c.is_braking = true;
                    });
                }
                ctl.tick(t0 + Duration::from_millis(i * 16));
            }
            ctl.log().samples().to_vec()
        };

        let a = run();
        let b = run();
        assert!(!a.is_empty());
        assert_eq!(a, b);
    }

    #[test]
    fn test_over_temp_engages_auto_cooling() {
        let (mut ctl, commands, _) = controller(SessionConfig {
            ambient_temp_c: 44.0,
            ..seeded_config()
        });
        commands.update(|c| {
            c.throttle = 100.0;
            c.time_warp = 20;
        });
        let t0 = Instant::now();
        ctl.start(t0).unwrap();
        run_ticks(&mut ctl, t0, 1, 300, 16);

        assert!(ctl.state().temperature_c >= 44.0);
        assert!(commands.snapshot().cooling_rate > 0.0);
        assert_eq!(commands.snapshot().cooling_rate % 5.0, 0.0);
    }

    #[test]
    fn test_export_failure_degrades_gracefully() {
        let commands = CommandHandle::default();
        let mut ctl = SessionController::new(
            seeded_config(),
            BatteryParams::default(),
            Thresholds::default(),
            commands,
            Box::new(FailingExporter),
        );
        let t0 = Instant::now();
        ctl.start(t0).unwrap();
        run_ticks(&mut ctl, t0, 1, 20, 16);
        let outcome = ctl.stop(StopReason::Requested, t0 + Duration::from_secs(1));
        assert!(matches!(outcome, StopOutcome::ExportFailed { .. }));
        assert!(!ctl.log().is_empty());
        assert_eq!(ctl.phase(), SessionPhase::Idle);
    }

    #[test]
    fn test_automatic_stop_defers_export() {
        let (mut ctl, _, exporter) = controller(SessionConfig {
            max_duration_s: 1,
            ..seeded_config()
        });
        let t0 = Instant::now();
        ctl.start(t0).unwrap();
        run_ticks(&mut ctl, t0, 1, 30, 16);

        let Advance::Ended { reason, step } = ctl.advance(t0 + Duration::from_secs(2)) else {
            panic!("session should have ended");
        };
        assert_eq!(reason, StopReason::DurationElapsed);
        assert_eq!(ctl.phase(), SessionPhase::Idle);
        assert!(exporter.exports.lock().is_empty());

        let StopStep::Export(pending) = step else {
            panic!("samples were recorded, export expected");
        };
        assert_eq!(Some(pending.session_id()), ctl.session_id());
        let record = pending.run();
        assert!(matches!(record.outcome, StopOutcome::Exported { .. }));
        assert_eq!(exporter.exports.lock().len(), 1);
        assert!(ctl.last_stop().is_none());

        ctl.complete_stop(record.clone());
        assert_eq!(ctl.last_stop(), Some(&record));
    }

    #[test]
    fn test_stale_export_result_is_ignored_after_restart() {
        let (mut ctl, _, _) = controller(seeded_config());
        let t0 = Instant::now();
        ctl.start(t0).unwrap();
        run_ticks(&mut ctl, t0, 1, 20, 16);
        let StopStep::Export(pending) = ctl.begin_stop(StopReason::Requested, t0 + Duration::from_secs(1))
        else {
            panic!("export expected");
        };

        ctl.start(t0 + Duration::from_secs(2)).unwrap();
        ctl.complete_stop(pending.run());
        assert!(ctl.last_stop().is_none());
        assert!(ctl.is_running());
    }

    #[test]
    fn test_snapshot_reports_countdown() {
        let (mut ctl, _, _) = controller(seeded_config());
        let t0 = Instant::now();
        ctl.start(t0).unwrap();
        let snap = ctl.snapshot(t0 + Duration::from_secs(10));
        assert_eq!(snap.phase, SessionPhase::Running);
        assert!((snap.remaining_s - 590.0).abs() < 1e-9);
        assert!((snap.elapsed_s - 10.0).abs() < 1e-9);
        assert_eq!(snap.derived.depth_of_discharge, 0.0);
        assert!(snap.latest.is_none());
        assert_eq!(SessionPhase::Running.to_string(), "running");
    }
}
