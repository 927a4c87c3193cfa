//! # State Estimator Seam
//!
//! Produces the "model" SOC/SOH trajectory that is compared against ground
//! truth in every telemetry sample. The bundled [`NoisyEstimator`] only
//! perturbs the true values; a real estimator plugs in through
//! [`SocEstimator`] without touching the dynamics or the session controller.

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::noise::NoiseSource;
use super::SimulationState;

/// Model-side SOC/SOH estimate (%).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelEstimate {
    pub soc: f64,
    pub soh: f64,
}

pub trait SocEstimator: Send {
    /// Estimate SOC and SOH for the given true state.
    fn estimate(&mut self, state: &SimulationState) -> ModelEstimate;

    /// Called at session start, before the first estimate.
    fn reset(&mut self) {}
}

/// Noise amplitudes for the synthetic estimator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct EstimatorConfig {
    /// SOC noise half-width (percentage points)
    #[validate(range(min = 0.0, max = 50.0))]
    pub soc_noise_pct: f64,

    /// SOH noise half-width (percentage points)
    #[validate(range(min = 0.0, max = 50.0))]
    pub soh_noise_pct: f64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            soc_noise_pct: 1.5,
            soh_noise_pct: 0.3,
        }
    }
}

/// Ground truth plus independent bounded noise on each channel.
#[derive(Debug, Clone)]
pub struct NoisyEstimator {
    config: EstimatorConfig,
    seed: Option<u64>,
    noise: NoiseSource,
}

impl NoisyEstimator {
    pub fn new(config: EstimatorConfig, seed: Option<u64>) -> Self {
        Self {
            config,
            seed,
            noise: NoiseSource::from_seed(seed),
        }
    }
}

impl SocEstimator for NoisyEstimator {
    fn estimate(&mut self, state: &SimulationState) -> ModelEstimate {
        let soc = state.soc + self.noise.symmetric(self.config.soc_noise_pct);
        let soh = state.soh + self.noise.symmetric(self.config.soh_noise_pct);
        ModelEstimate {
            soc: soc.clamp(0.0, 100.0),
            soh: soh.clamp(0.0, 100.0),
        }
    }

    fn reset(&mut self) {
        self.noise = NoiseSource::from_seed(self.seed);
    }
}
