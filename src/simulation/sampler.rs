//! # Telemetry Sampler
//!
//! Snapshots the simulation at a fixed wall-clock period, independent of the
//! physics tick rate. Samples go to two separate containers with different
//! contracts:
//!
//! - [`SessionLog`]: unbounded, append-only, exported when the session stops
//! - [`RollingHistory`]: fixed-capacity, drop-oldest, for live charts only

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

use super::estimator::ModelEstimate;
use super::SimulationState;

/// Default sampling period
pub const DEFAULT_SAMPLE_PERIOD: Duration = Duration::from_millis(100);
/// Default length of each live-chart buffer
pub const DEFAULT_HISTORY_LEN: usize = 50;

/// One timestamped snapshot of all observables.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    /// Wall-clock seconds since session start
    pub time_s: f64,
    pub voltage_v: f64,
    pub current_a: f64,
    pub temperature_c: f64,
    pub speed_kmh: f64,
    pub soc_actual: f64,
    pub soc_model: f64,
    pub soc_error: f64,
    pub soh_actual: f64,
    pub soh_model: f64,
    pub soh_error: f64,
}

impl TelemetrySample {
    pub fn new(time: Duration, state: &SimulationState, model: ModelEstimate) -> Self {
        Self {
            time_s: time.as_secs_f64(),
            voltage_v: state.voltage_v,
            current_a: state.current_a,
            temperature_c: state.temperature_c,
            speed_kmh: state.speed_kmh,
            soc_actual: state.soc,
            soc_model: model.soc,
            soc_error: (state.soc - model.soc).abs(),
            soh_actual: state.soh,
            soh_model: model.soh,
            soh_error: (state.soh - model.soh).abs(),
        }
    }
}

/// Append-only record of one session's samples, in increasing time order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionLog {
    samples: Vec<TelemetrySample>,
}

impl SessionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sample: TelemetrySample) {
        debug_assert!(self
            .samples
            .last()
            .map_or(true, |last| last.time_s <= sample.time_s));
        self.samples.push(sample);
    }

    pub fn samples(&self) -> &[TelemetrySample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn last(&self) -> Option<&TelemetrySample> {
        self.samples.last()
    }

    pub(crate) fn clear(&mut self) {
        self.samples.clear();
    }
}

/// Fixed-capacity buffer that drops its oldest entry when full.
#[derive(Debug, Clone, PartialEq)]
pub struct RollingHistory<T> {
    capacity: usize,
    values: VecDeque<T>,
}

impl<T: Clone> RollingHistory<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            values: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, value: T) {
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn latest(&self) -> Option<&T> {
        self.values.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.values.iter()
    }

    /// Oldest-first copy of the buffer.
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}

/// The three live-chart series.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryHistory {
    pub current: RollingHistory<f64>,
    pub soc: RollingHistory<f64>,
    pub soh: RollingHistory<f64>,
}

impl TelemetryHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            current: RollingHistory::new(capacity),
            soc: RollingHistory::new(capacity),
            soh: RollingHistory::new(capacity),
        }
    }

    pub fn record(&mut self, sample: &TelemetrySample) {
        self.current.push(sample.current_a);
        self.soc.push(sample.soc_actual);
        self.soh.push(sample.soh_actual);
    }

    pub fn clear(&mut self) {
        self.current.clear();
        self.soc.clear();
        self.soh.clear();
    }
}

impl Default for TelemetryHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LEN)
    }
}

/// Decides when a sample is due. Keeps its own "last sampled at" mark,
/// measured from session start.
#[derive(Debug, Clone)]
pub struct TelemetrySampler {
    period: Duration,
    last_sampled_at: Duration,
}

impl TelemetrySampler {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            last_sampled_at: Duration::ZERO,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Returns true, and moves the mark to `elapsed`, when at least one
    /// period has passed since the previous sample.
    pub fn poll(&mut self, elapsed: Duration) -> bool {
        if elapsed.saturating_sub(self.last_sampled_at) >= self.period {
            self.last_sampled_at = elapsed;
            true
        } else {
            false
        }
    }

    pub fn reset(&mut self) {
        self.last_sampled_at = Duration::ZERO;
    }
}

impl Default for TelemetrySampler {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_PERIOD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::BatteryParams;

    #[test]
    fn test_rolling_history_drops_oldest() {
        let mut h = RollingHistory::new(3);
        for v in 1..=5 {
            h.push(v);
        }
        assert_eq!(h.to_vec(), vec![3, 4, 5]);
        assert_eq!(h.latest(), Some(&5));
        assert_eq!(h.len(), h.capacity());
    }

    #[test]
    fn test_history_is_bounded_while_log_grows() {
        let state = SimulationState::initial(&BatteryParams::default(), 25.0);
        let model = ModelEstimate { soc: 80.0, soh: 100.0 };
        let mut history = TelemetryHistory::new(DEFAULT_HISTORY_LEN);
        let mut log = SessionLog::new();

        for i in 0..120u64 {
            let sample = TelemetrySample::new(Duration::from_millis(i * 100), &state, model);
            log.push(sample);
            history.record(&sample);
        }

        assert_eq!(log.len(), 120);
        assert_eq!(history.current.len(), 50);
        assert_eq!(history.soc.len(), 50);
        assert_eq!(history.soh.len(), 50);
    }

    #[test]
    fn test_sample_errors_are_absolute() {
        let state = SimulationState::initial(&BatteryParams::default(), 25.0);
        let sample = TelemetrySample::new(
            Duration::from_millis(250),
            &state,
            ModelEstimate { soc: 81.5, soh: 99.7 },
        );
        assert!((sample.time_s - 0.25).abs() < 1e-12);
        assert!((sample.soc_error - 1.5).abs() < 1e-12);
        assert!((sample.soh_error - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_sampler_fires_once_per_period() {
        let mut sampler = TelemetrySampler::default();
        let fired: Vec<u64> = (0..=40u64)
            .map(|i| i * 16)
            .filter(|&ms| sampler.poll(Duration::from_millis(ms)))
            .collect();
        // 16 ms ticks: the mark moves to the tick that fired
        assert_eq!(fired, vec![112, 224, 336, 448, 560]);
    }

    #[test]
    fn test_sampler_does_not_fire_before_first_period() {
        let mut sampler = TelemetrySampler::default();
        assert!(!sampler.poll(Duration::ZERO));
        assert!(!sampler.poll(Duration::from_millis(99)));
        assert!(sampler.poll(Duration::from_millis(100)));
    }
}
