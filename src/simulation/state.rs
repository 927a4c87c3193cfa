use serde::{Deserialize, Serialize};

use super::dynamics::{open_circuit_voltage, BatteryParams};

/// Full mutable state of one simulated session.
///
/// Only [`Integrator::step`](super::Integrator::step) writes it; after every
/// step `soc` and `soh` are within `[0, 100]`, `temperature_c` is at or above
/// ambient, `speed_kmh` is non-negative and both Ah counters are non-decreasing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationState {
    /// Pack current (A), positive = charging
    pub current_a: f64,
    /// Terminal voltage at the last step (V)
    pub voltage_v: f64,
    /// Vehicle speed (km/h)
    pub speed_kmh: f64,
    /// State of charge (%)
    pub soc: f64,
    /// State of health (%)
    pub soh: f64,
    /// Pack temperature (°C)
    pub temperature_c: f64,
    /// Cumulative charge into the pack (Ah)
    pub charged_ah: f64,
    /// Cumulative charge out of the pack (Ah)
    pub discharged_ah: f64,
    /// Simulated time since session start, time warp included (s)
    pub sim_time_s: f64,
}

impl SimulationState {
    /// Fixed initial conditions for a new session.
    pub fn initial(params: &BatteryParams, ambient_c: f64) -> Self {
        Self {
            current_a: 0.0,
            voltage_v: open_circuit_voltage(params.reference_soc, params),
            speed_kmh: 0.0,
            soc: params.reference_soc,
            soh: 100.0,
            temperature_c: ambient_c,
            charged_ah: 0.0,
            discharged_ah: 0.0,
            sim_time_s: 0.0,
        }
    }

    pub fn derived(&self, params: &BatteryParams) -> DerivedState {
        DerivedState {
            voltage_v: self.voltage_v,
            depth_of_discharge: (self.soc - params.reference_soc).abs(),
            cycle_life: (self.charged_ah + self.discharged_ah) / 2.0 / params.capacity_ah,
        }
    }
}

/// Observables recomputed from [`SimulationState`]; never fed back.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DerivedState {
    pub voltage_v: f64,
    /// `|soc - reference_soc|` (%)
    pub depth_of_discharge: f64,
    /// Equivalent full cycles
    pub cycle_life: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_conditions() {
        let params = BatteryParams::default();
        let state = SimulationState::initial(&params, 18.0);
        assert_eq!(state.soc, 80.0);
        assert_eq!(state.soh, 100.0);
        assert_eq!(state.temperature_c, 18.0);
        assert_eq!(state.current_a, 0.0);
        assert_eq!(state.charged_ah + state.discharged_ah, 0.0);
    }

    #[test]
    fn test_derived_quantities() {
        let params = BatteryParams::default();
        let state = SimulationState {
            soc: 65.0,
            charged_ah: 13.5,
            discharged_ah: 40.5,
            ..SimulationState::initial(&params, 25.0)
        };
        let derived = state.derived(&params);
        assert_eq!(derived.depth_of_discharge, 15.0);
        assert!((derived.cycle_life - 1.0).abs() < 1e-12);
    }
}
