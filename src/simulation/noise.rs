//! # Unit Converters and Noise Utilities
//!
//! Small deterministic helpers shared by the dynamics model, plus a seedable
//! bounded noise generator. Every random draw in the engine goes through a
//! [`NoiseSource`], so a fixed seed reproduces a session sample-for-sample.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Ohmic voltage drop (V) for a current through a resistance: `I * R`.
pub fn current_to_voltage_drop(current_a: f64, resistance_ohm: f64) -> f64 {
    current_a * resistance_ohm
}

/// Resistive heating rate `I² * R * scale`.
///
/// The scale folds the pack's thermal capacity into a single coefficient,
/// so the result is a temperature rate (°C/s) rather than watts.
pub fn joule_heat_rate(current_a: f64, resistance_ohm: f64, scale: f64) -> f64 {
    current_a.powi(2) * resistance_ohm * scale
}

/// Seedable source of bounded, zero-mean noise.
#[derive(Debug, Clone)]
pub struct NoiseSource {
    rng: StdRng,
}

impl NoiseSource {
    /// Create a noise source. `None` seeds from OS entropy.
    pub fn from_seed(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng }
    }

    /// Uniform draw in `[-amplitude, amplitude]`. Zero when the amplitude is
    /// zero, negative or not finite.
    pub fn symmetric(&mut self, amplitude: f64) -> f64 {
        if !amplitude.is_finite() || amplitude <= 0.0 {
            return 0.0;
        }
        self.rng.gen_range(-amplitude..=amplitude)
    }
}
