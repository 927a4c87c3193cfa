//! # Battery Dynamics Model
//!
//! Stateless functions that compute the instantaneous electrical, thermal,
//! aging and motion quantities for one physics step.
//!
//! ## Model
//!
//! - Current: idle drain, throttle draw, speed-weighted regen and a grade
//!   penalty give a demanded current; the applied current follows it through a
//!   first-order lag (weight 0.1 per tick).
//! - Voltage: linear SOC-OCV curve, `V = V_nom * (0.9 + 0.2 * soc/100) - I * R`.
//! - Temperature: `dT = (I² R k_heat - (T - T_amb) * (0.05 + 0.3 * cooling)) * dt`
//! - Health: calendar (SOC outside 20-80%), thermal (above 40°C) and
//!   throughput (`|I|`) penalties, each linear and scaled by `dt`.
//!
//! Sign convention: positive current charges the pack. The voltage term
//! subtracts `I * R` literally, so under this model discharge raises the
//! terminal voltage above OCV.
//!
//! The two lags (0.1 for current, 0.08·dt for speed) are numerical smoothers
//! and must keep these exact coefficients to reproduce reference trajectories.

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::noise::{current_to_voltage_drop, joule_heat_rate};
use super::{CommandVector, SimulationState};

/// Current drawn with no driver input (A)
pub const IDLE_DRAIN_A: f64 = -1.0;
/// Regen strength at 100% regen level, relative to max charge current
pub const REGEN_GAIN: f64 = 1.2;
/// Blend weight of the current lag per tick
pub const CURRENT_LAG: f64 = 0.1;
/// Heat coefficient applied to `I² R` (°C/s per W)
pub const HEAT_SCALE: f64 = 0.0005;
/// Passive cooling coefficient (1/s)
pub const PASSIVE_COOLING: f64 = 0.05;
/// Additional cooling coefficient at 100% active cooling (1/s)
pub const ACTIVE_COOLING: f64 = 0.3;
/// SOH loss per %·s outside the 20-80% SOC band
pub const CALENDAR_AGING: f64 = 1e-5;
/// SOH loss per °C·s above [`THERMAL_AGING_ONSET_C`]
pub const THERMAL_AGING: f64 = 2e-5;
/// Temperature above which thermal aging accrues (°C)
pub const THERMAL_AGING_ONSET_C: f64 = 40.0;
/// SOH loss per A·s of throughput
pub const THROUGHPUT_AGING: f64 = 5e-6;
/// Speed decay rate while braking (1/s)
pub const BRAKE_DECAY: f64 = 0.2;
/// Speed decay rate while coasting (1/s)
pub const COAST_DECAY: f64 = 0.05;
/// Speed approach rate toward target (1/s)
pub const SPEED_LAG: f64 = 0.08;
/// Speed lost per degree of grade per second (km/h)
pub const GRADE_SPEED_LOSS: f64 = 0.1;

/// Electrical and vehicle parameters of the simulated pack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct BatteryParams {
    /// Rated capacity (Ah)
    #[validate(range(min = 0.1))]
    pub capacity_ah: f64,

    /// Nominal pack voltage (V) - 96 cells in series at 3.7 V
    #[validate(range(min = 1.0))]
    pub nominal_voltage_v: f64,

    /// Lumped internal resistance (Ohm)
    #[validate(range(min = 0.0))]
    pub internal_resistance_ohm: f64,

    /// Current at full throttle (A)
    #[validate(range(min = 0.0))]
    pub max_discharge_current_a: f64,

    /// Regen current at full regen and speed (A)
    #[validate(range(min = 0.0))]
    pub max_charge_current_a: f64,

    /// Vehicle speed at full throttle (km/h)
    #[validate(range(min = 0.0))]
    pub max_speed_kmh: f64,

    /// SOC at session start and DOD reference (%)
    #[validate(range(min = 0.0, max = 100.0))]
    pub reference_soc: f64,
}

impl Default for BatteryParams {
    fn default() -> Self {
        Self {
            capacity_ah: 27.0,
            nominal_voltage_v: 355.2,
            internal_resistance_ohm: 0.1,
            max_discharge_current_a: 300.0,
            max_charge_current_a: 150.0,
            max_speed_kmh: 160.0,
            reference_soc: 80.0,
        }
    }
}

/// Current demanded by the driver inputs before the lag is applied (A).
pub fn demanded_current(
    state: &SimulationState,
    cmd: &CommandVector,
    params: &BatteryParams,
) -> f64 {
    let mut demand = IDLE_DRAIN_A;

    if cmd.throttle > 0.0 && !cmd.is_braking {
        demand -= (cmd.throttle / 100.0) * params.max_discharge_current_a;
    }

    if cmd.is_braking {
        let speed_factor = (state.speed_kmh / 100.0).min(1.0);
        let regen_factor = (cmd.regen_level / 100.0) * REGEN_GAIN;
        demand += speed_factor * regen_factor * params.max_charge_current_a;
    }

    demand - cmd.grade * 10.0 * 0.1
}

/// One step of the first-order current lag.
pub fn lag_current(previous_a: f64, demanded_a: f64) -> f64 {
    previous_a + (demanded_a - previous_a) * CURRENT_LAG
}

/// Linear SOC-OCV approximation (V).
pub fn open_circuit_voltage(soc: f64, params: &BatteryParams) -> f64 {
    params.nominal_voltage_v * (0.9 + (soc / 100.0) * 0.2)
}

/// Terminal voltage with the measurement noise supplied by the caller (V).
pub fn terminal_voltage(soc: f64, current_a: f64, params: &BatteryParams, noise_v: f64) -> f64 {
    open_circuit_voltage(soc, params)
        - current_to_voltage_drop(current_a, params.internal_resistance_ohm)
        + noise_v
}

/// Temperature change over `dt_s` (°C). Callers clamp the result at ambient.
pub fn temperature_delta(
    temperature_c: f64,
    current_a: f64,
    ambient_c: f64,
    cooling_rate: f64,
    params: &BatteryParams,
    dt_s: f64,
) -> f64 {
    let heat_gen = joule_heat_rate(current_a, params.internal_resistance_ohm, HEAT_SCALE);
    let cooling = (temperature_c - ambient_c)
        * (PASSIVE_COOLING + (cooling_rate / 100.0) * ACTIVE_COOLING);
    (heat_gen - cooling) * dt_s
}

/// Breakdown of health loss over one step (percentage points, all ≥ 0).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SohLoss {
    pub calendar: f64,
    pub thermal: f64,
    pub throughput: f64,
}

impl SohLoss {
    pub fn total(&self) -> f64 {
        self.calendar + self.thermal + self.throughput
    }
}

/// Health loss accrued over `dt_s`.
pub fn soh_loss(soc: f64, temperature_c: f64, current_a: f64, dt_s: f64) -> SohLoss {
    let dt_s = dt_s.max(0.0);

    let band_excess = if soc > 80.0 {
        soc - 80.0
    } else if soc < 20.0 {
        20.0 - soc
    } else {
        0.0
    };
    let heat_excess = (temperature_c - THERMAL_AGING_ONSET_C).max(0.0);

    SohLoss {
        calendar: band_excess * CALENDAR_AGING * dt_s,
        thermal: heat_excess * THERMAL_AGING * dt_s,
        throughput: current_a.abs() * THROUGHPUT_AGING * dt_s,
    }
}

/// Charge moved during one step.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ChargeStep {
    /// Signed charge (Ah), positive = into the pack
    pub amp_hours: f64,
    /// SOC change (percentage points)
    pub soc_delta: f64,
}

impl ChargeStep {
    pub fn charged_ah(&self) -> f64 {
        if self.amp_hours > 0.0 {
            self.amp_hours
        } else {
            0.0
        }
    }

    pub fn discharged_ah(&self) -> f64 {
        if self.amp_hours > 0.0 {
            0.0
        } else {
            self.amp_hours.abs()
        }
    }
}

/// Coulomb counting for one step.
pub fn charge_step(current_a: f64, dt_s: f64, params: &BatteryParams) -> ChargeStep {
    let amp_hours = current_a * (dt_s / 3600.0);
    ChargeStep {
        amp_hours,
        soc_delta: amp_hours / params.capacity_ah * 100.0,
    }
}

/// Vehicle speed after `dt_s` (km/h, ≥ 0).
pub fn speed_step(speed_kmh: f64, cmd: &CommandVector, params: &BatteryParams, dt_s: f64) -> f64 {
    let target = if cmd.throttle > 0.0 && !cmd.is_braking {
        (cmd.throttle / 100.0) * params.max_speed_kmh
    } else if cmd.is_braking {
        speed_kmh * (1.0 - BRAKE_DECAY * dt_s).max(0.0)
    } else {
        speed_kmh * (1.0 - COAST_DECAY * dt_s).max(0.0)
    };

    let blend = (SPEED_LAG * dt_s).min(1.0);
    let speed = speed_kmh + (target - speed_kmh) * blend - cmd.grade * GRADE_SPEED_LOSS * dt_s;

    speed.max(0.0)
}
