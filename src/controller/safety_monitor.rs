//! # Threshold Monitor
//!
//! Evaluates the pack against fixed safety thresholds at every telemetry
//! sample and raises three independent warning flags:
//! - Over-current (|I| above limit)
//! - Over-voltage (terminal voltage above limit)
//! - Over-temperature (pack temperature above limit)
//!
//! Over-temperature also drives a closed-loop thermal protection policy:
//! while the flag is set, every sample raises the commanded cooling effort by
//! a fixed step until cooling saturates at 100%.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use validator::Validate;

use crate::simulation::{CommandHandle, SimulationState};

/// Cooling raised per sample while over temperature (%)
pub const AUTO_COOLING_STEP: f64 = 5.0;

/// Warning thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Thresholds {
    /// Absolute current limit (A)
    #[validate(range(min = 0.0))]
    pub over_current_a: f64,

    /// Terminal voltage limit (V)
    #[validate(range(min = 0.0))]
    pub over_voltage_v: f64,

    /// Pack temperature limit (°C)
    pub over_temp_c: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            over_current_a: 200.0,
            over_voltage_v: 400.0,
            over_temp_c: 45.0,
        }
    }
}

/// Warning type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WarningKind {
    OverCurrent,
    OverVoltage,
    OverTemperature,
}

impl std::fmt::Display for WarningKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OverCurrent => write!(f, "Over-Current"),
            Self::OverVoltage => write!(f, "Over-Voltage"),
            Self::OverTemperature => write!(f, "Over-Temperature"),
        }
    }
}

/// Threshold crossing found by [`Thresholds::check`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Warning {
    pub kind: WarningKind,
    pub value: f64,
    pub limit: f64,
    pub message: String,
}

/// UI-facing warning flags; recomputed every sample, never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarningFlags {
    pub over_current: bool,
    pub over_voltage: bool,
    pub over_temp: bool,
}

impl WarningFlags {
    pub fn is_set(&self, kind: WarningKind) -> bool {
        match kind {
            WarningKind::OverCurrent => self.over_current,
            WarningKind::OverVoltage => self.over_voltage,
            WarningKind::OverTemperature => self.over_temp,
        }
    }

    pub fn any(&self) -> bool {
        self.over_current || self.over_voltage || self.over_temp
    }

    fn from_warnings(warnings: &[Warning]) -> Self {
        let has = |kind| warnings.iter().any(|w| w.kind == kind);
        Self {
            over_current: has(WarningKind::OverCurrent),
            over_voltage: has(WarningKind::OverVoltage),
            over_temp: has(WarningKind::OverTemperature),
        }
    }
}

impl Thresholds {
    /// All thresholds currently exceeded by `state`.
    pub fn check(&self, state: &SimulationState) -> Vec<Warning> {
        let mut warnings = Vec::new();

        let current = state.current_a.abs();
        if current > self.over_current_a {
            warnings.push(Warning {
                kind: WarningKind::OverCurrent,
                value: current,
                limit: self.over_current_a,
                message: format!(
                    "Pack current {:.1}A exceeds limit {:.1}A",
                    current, self.over_current_a
                ),
            });
        }

        if state.voltage_v > self.over_voltage_v {
            warnings.push(Warning {
                kind: WarningKind::OverVoltage,
                value: state.voltage_v,
                limit: self.over_voltage_v,
                message: format!(
                    "Terminal voltage {:.1}V exceeds limit {:.1}V",
                    state.voltage_v, self.over_voltage_v
                ),
            });
        }

        if state.temperature_c > self.over_temp_c {
            warnings.push(Warning {
                kind: WarningKind::OverTemperature,
                value: state.temperature_c,
                limit: self.over_temp_c,
                message: format!(
                    "Pack temperature {:.1}°C exceeds limit {:.1}°C",
                    state.temperature_c, self.over_temp_c
                ),
            });
        }

        warnings
    }
}

/// Holds the current flags and applies the thermal protection policy.
#[derive(Debug, Clone)]
pub struct ThresholdMonitor {
    thresholds: Thresholds,
    flags: WarningFlags,
    total_warnings: u64,
}

impl ThresholdMonitor {
    pub fn new(thresholds: Thresholds) -> Self {
        Self {
            thresholds,
            flags: WarningFlags::default(),
            total_warnings: 0,
        }
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn flags(&self) -> WarningFlags {
        self.flags
    }

    /// Number of flag raises since the last reset
    pub fn total_warnings(&self) -> u64 {
        self.total_warnings
    }

    /// Recompute the flags for one sample. When over temperature, raises the
    /// commanded cooling by [`AUTO_COOLING_STEP`].
    pub fn evaluate(&mut self, state: &SimulationState, commands: &CommandHandle) -> WarningFlags {
        let warnings = self.thresholds.check(state);
        let flags = WarningFlags::from_warnings(&warnings);

        for warning in &warnings {
            if !self.flags.is_set(warning.kind) {
                self.total_warnings += 1;
                warn!(
                    kind = %warning.kind,
                    value = warning.value,
                    limit = warning.limit,
                    "{}",
                    warning.message
                );
            }
        }
        for kind in [
            WarningKind::OverCurrent,
            WarningKind::OverVoltage,
            WarningKind::OverTemperature,
        ] {
            if self.flags.is_set(kind) && !flags.is_set(kind) {
                info!(kind = %kind, "warning cleared");
            }
        }

        if flags.over_temp {
            let before = commands.snapshot().cooling_rate;
            if before < 100.0 {
                let after = commands.raise_cooling(AUTO_COOLING_STEP);
                info!(
                    temperature_c = state.temperature_c,
                    cooling_before = before,
                    cooling_after = after,
                    "thermal protection raised cooling"
                );
            }
        }

        self.flags = flags;
        flags
    }

    pub fn reset(&mut self) {
        self.flags = WarningFlags::default();
        self.total_warnings = 0;
    }
}
