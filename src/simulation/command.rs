//! # Command Vector
//!
//! Driver and environment inputs written by an external actor (the UI) at any
//! time. The engine reads one consistent copy per tick through
//! [`CommandHandle::snapshot`], so a multi-field update can never be observed
//! half-applied inside a dynamics evaluation.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Driver/environment inputs. Percentages are 0-100, grade is in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandVector {
    /// Accelerator pedal position (%)
    pub throttle: f64,
    /// Brake pedal pressed
    pub is_braking: bool,
    /// Regenerative braking strength (%)
    pub regen_level: f64,
    /// Road grade (degrees, positive = uphill)
    pub grade: f64,
    /// Active cooling effort (%)
    pub cooling_rate: f64,
    /// Physics time multiplier
    pub time_warp: u32,
}

impl Default for CommandVector {
    fn default() -> Self {
        Self {
            throttle: 0.0,
            is_braking: false,
            regen_level: 50.0,
            grade: 0.0,
            cooling_rate: 0.0,
            time_warp: 1,
        }
    }
}

fn clamp_or(value: f64, min: f64, max: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        fallback
    }
}

impl CommandVector {
    /// Copy with every field forced into its documented range.
    /// Non-finite values fall back to the idle default for that field.
    pub fn clamped(self) -> Self {
        let idle = Self::default();
        Self {
            throttle: clamp_or(self.throttle, 0.0, 100.0, idle.throttle),
            is_braking: self.is_braking,
            regen_level: clamp_or(self.regen_level, 0.0, 100.0, idle.regen_level),
            grade: clamp_or(self.grade, -10.0, 10.0, idle.grade),
            cooling_rate: clamp_or(self.cooling_rate, 0.0, 100.0, idle.cooling_rate),
            time_warp: self.time_warp.max(1),
        }
    }

    /// Apply a partial update. Fields left as `None` keep their value.
    pub fn apply(&mut self, update: &CommandUpdate) {
        if let Some(v) = update.throttle {
            self.throttle = v;
        }
        if let Some(v) = update.is_braking {
            self.is_braking = v;
        }
        if let Some(v) = update.regen_level {
            self.regen_level = v;
        }
        if let Some(v) = update.grade {
            self.grade = v;
        }
        if let Some(v) = update.cooling_rate {
            self.cooling_rate = v;
        }
        if let Some(v) = update.time_warp {
            self.time_warp = v;
        }
    }
}

/// Partial command update as sent by a UI control.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandUpdate {
    pub throttle: Option<f64>,
    pub is_braking: Option<bool>,
    pub regen_level: Option<f64>,
    pub grade: Option<f64>,
    pub cooling_rate: Option<f64>,
    pub time_warp: Option<u32>,
}

/// Shared, clamping cell holding the live command vector.
#[derive(Debug, Clone, Default)]
pub struct CommandHandle {
    inner: Arc<RwLock<CommandVector>>,
}

impl CommandHandle {
    pub fn new(initial: CommandVector) -> Self {
        Self {
            inner: Arc::new(RwLock::new(initial.clamped())),
        }
    }

    /// One consistent copy of all fields.
    pub fn snapshot(&self) -> CommandVector {
        *self.inner.read()
    }

    /// Mutate under the write lock; the result is re-clamped before release.
    pub fn update<F>(&self, f: F) -> CommandVector
    where
        F: FnOnce(&mut CommandVector),
    {
        let mut guard = self.inner.write();
        f(&mut guard);
        *guard = guard.clamped();
        *guard
    }

    pub fn apply(&self, update: &CommandUpdate) -> CommandVector {
        self.update(|cmd| cmd.apply(update))
    }

    pub fn replace(&self, command: CommandVector) -> CommandVector {
        self.update(|cmd| *cmd = command)
    }

    /// Raise cooling effort by `step`, saturating at 100%.
    /// Returns the new cooling rate.
    pub fn raise_cooling(&self, step: f64) -> f64 {
        self.update(|cmd| {
            if cmd.cooling_rate < 100.0 {
                cmd.cooling_rate = (cmd.cooling_rate + step).min(100.0);
            }
        })
        .cooling_rate
    }
}
