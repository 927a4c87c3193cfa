//! # Simulation Clock & Integrator
//!
//! Explicit single-step forward integration. Each call scales the elapsed
//! wall-clock time by the command's time warp and advances every state
//! variable from one snapshot of the previous state.

use std::time::Duration;
use tracing::trace;

use super::dynamics::{self, BatteryParams};
use super::noise::NoiseSource;
use super::{CommandVector, SimulationState};

/// SOC at or below which the session is cut off (%)
pub const LOW_CHARGE_CUTOFF_SOC: f64 = 0.1;

/// Default terminal-voltage noise amplitude (V)
pub const DEFAULT_VOLTAGE_NOISE_V: f64 = 0.05;

/// Outcome of one integration step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepReport {
    /// Simulated seconds covered by the step
    pub dt_physics_s: f64,
    /// Current demanded before the lag (A)
    pub demanded_current_a: f64,
    /// SOC has reached the low-charge cutoff
    pub cutoff: bool,
}

/// Advances [`SimulationState`] with the dynamics model.
#[derive(Debug, Clone)]
pub struct Integrator {
    params: BatteryParams,
    ambient_c: f64,
    voltage_noise_v: f64,
}

impl Integrator {
    pub fn new(params: BatteryParams, ambient_c: f64) -> Self {
        Self {
            params,
            ambient_c,
            voltage_noise_v: DEFAULT_VOLTAGE_NOISE_V,
        }
    }

    pub fn with_voltage_noise(mut self, amplitude_v: f64) -> Self {
        self.voltage_noise_v = amplitude_v;
        self
    }

    pub fn params(&self) -> &BatteryParams {
        &self.params
    }

    pub fn ambient_c(&self) -> f64 {
        self.ambient_c
    }

    /// Advance `state` by `dt_wall` of wall-clock time.
    ///
    /// A zero, negative or non-finite step leaves the state untouched.
    /// `cmd` is clamped first, so out-of-range or NaN inputs cannot poison the
    /// state.
    pub fn step(
        &self,
        state: &mut SimulationState,
        cmd: &CommandVector,
        dt_wall: Duration,
        noise: &mut NoiseSource,
    ) -> StepReport {
        let cmd = &cmd.clamped();
        let dt_wall_s = dt_wall.as_secs_f64();
        let dt_s = dt_wall_s * f64::from(cmd.time_warp.max(1));
        let prev = *state;

        if !dt_s.is_finite() || dt_s <= 0.0 {
            return StepReport {
                dt_physics_s: 0.0,
                demanded_current_a: prev.current_a,
                cutoff: prev.soc <= LOW_CHARGE_CUTOFF_SOC,
            };
        }

        let demanded = dynamics::demanded_current(&prev, cmd, &self.params);
        let current = dynamics::lag_current(prev.current_a, demanded);

        let voltage_noise = noise.symmetric(self.voltage_noise_v);
        let voltage = dynamics::terminal_voltage(prev.soc, current, &self.params, voltage_noise);

        let temperature = prev.temperature_c
            + dynamics::temperature_delta(
                prev.temperature_c,
                current,
                self.ambient_c,
                cmd.cooling_rate,
                &self.params,
                dt_s,
            );
        let soh_loss = dynamics::soh_loss(prev.soc, prev.temperature_c, current, dt_s);
        let charge = dynamics::charge_step(current, dt_s, &self.params);
        let speed = dynamics::speed_step(prev.speed_kmh, cmd, &self.params, dt_s);

        *state = SimulationState {
            current_a: current,
            voltage_v: voltage,
            speed_kmh: speed.max(0.0),
            soc: (prev.soc + charge.soc_delta).clamp(0.0, 100.0),
            soh: (prev.soh - soh_loss.total()).clamp(0.0, 100.0),
            temperature_c: temperature.max(self.ambient_c),
            charged_ah: prev.charged_ah + charge.charged_ah(),
            discharged_ah: prev.discharged_ah + charge.discharged_ah(),
            sim_time_s: prev.sim_time_s + dt_s,
        };

        trace!(
            dt_s,
            demanded_a = demanded,
            current_a = state.current_a,
            soc = state.soc,
            temperature_c = state.temperature_c,
            "integrator step"
        );

        StepReport {
            dt_physics_s: dt_s,
            demanded_current_a: demanded,
            cutoff: state.soc <= LOW_CHARGE_CUTOFF_SOC,
        }
    }
}
