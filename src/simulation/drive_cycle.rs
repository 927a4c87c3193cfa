//! # Drive Cycle Coulomb Counting
//!
//! Offline SOC integration over a recorded current trace. Useful for
//! replaying an exported session or a standard drive cycle without running
//! the real-time engine.
//!
//! `ΔSOC% = I(k-1) * Δt / (capacity_Ah * 3600) * 100`
//!
//! Integration stops at the first step that empties the pack; the time of
//! that step is reported as the discharge time.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::SimError;

/// SOC trajectory of a drive cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriveCycleResult {
    /// SOC at each sample (%), truncated at depletion
    pub soc: Vec<f64>,
    /// Time the pack emptied, or the last timestamp when it never did (s)
    pub discharge_time_s: Option<f64>,
    /// The pack reached 0% before the end of the trace
    pub depleted: bool,
}

/// Integrate SOC over `currents` (A, positive raises SOC).
///
/// `times` are sample timestamps in seconds; when absent or of a different
/// length than `currents`, samples are assumed one second apart.
pub fn integrate_soc(
    currents: &[f64],
    times: Option<&[f64]>,
    start_soc: f64,
    capacity_ah: f64,
) -> Result<DriveCycleResult, SimError> {
    if !start_soc.is_finite() || !(0.0..=100.0).contains(&start_soc) {
        return Err(SimError::InvalidInput(format!(
            "start SOC must be within 0-100%, got {start_soc}"
        )));
    }
    if !capacity_ah.is_finite() || capacity_ah <= 0.0 {
        return Err(SimError::InvalidInput(format!(
            "capacity must be positive, got {capacity_ah} Ah"
        )));
    }

    let n = currents.len();
    if n == 0 {
        return Ok(DriveCycleResult {
            soc: Vec::new(),
            discharge_time_s: None,
            depleted: false,
        });
    }

    let fallback: Vec<f64>;
    let times = match times {
        Some(t) if t.len() == n => t,
        other => {
            if other.is_some() {
                warn!(
                    currents = n,
                    "time vector length mismatch, assuming 1 s per sample"
                );
            }
            fallback = (0..n).map(|i| i as f64).collect();
            fallback.as_slice()
        }
    };

    let mut soc = Vec::with_capacity(n);
    soc.push(start_soc);

    for i in 1..n {
        let dt = times[i] - times[i - 1];
        let delta = currents[i - 1] * dt / (capacity_ah * 3600.0) * 100.0;
        let next = soc[i - 1] + delta;

        if next <= 0.0 {
            soc.push(0.0);
            debug!(time_s = times[i], "pack depleted during drive cycle");
            return Ok(DriveCycleResult {
                soc,
                discharge_time_s: Some(times[i]),
                depleted: true,
            });
        }

        soc.push(next.clamp(0.0, 100.0));
    }

    Ok(DriveCycleResult {
        soc,
        discharge_time_s: Some(times[n - 1]),
        depleted: false,
    })
}
