//! Batch drive-cycle integration

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use super::error::ApiError;
use crate::controller::AppState;
use crate::simulation::integrate_soc;

const DEFAULT_START_SOC: f64 = 100.0;

#[derive(Debug, Deserialize, Validate)]
pub struct DriveCycleRequest {
    /// Pack current per sample (A)
    #[validate(length(max = 1_000_000))]
    pub current: Vec<f64>,
    /// Sample timestamps (s); 1 s spacing when absent
    #[serde(default)]
    pub time: Option<Vec<f64>>,
    /// Starting SOC (%), defaults to full
    #[serde(default)]
    #[validate(range(min = 0.0, max = 100.0))]
    pub start_soc: Option<f64>,
    /// Overrides the configured pack capacity (Ah)
    #[serde(default)]
    #[validate(range(exclusive_min = 0.0))]
    pub capacity_ah: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct DriveCycleResponse {
    pub soc: Vec<f64>,
    pub discharge_time: Option<f64>,
    pub depleted: bool,
    pub total_points: usize,
}

/// POST /drive-cycle
pub async fn simulate_drive_cycle(
    State(st): State<AppState>,
    Json(req): Json<DriveCycleRequest>,
) -> Result<Json<DriveCycleResponse>, ApiError> {
    req.validate()?;

    let start_soc = req.start_soc.unwrap_or(DEFAULT_START_SOC);
    let capacity_ah = req.capacity_ah.unwrap_or(st.cfg.battery.capacity_ah);

    let result = integrate_soc(&req.current, req.time.as_deref(), start_soc, capacity_ah)?;

    info!(
        points = req.current.len(),
        returned = result.soc.len(),
        discharge_time_s = ?result.discharge_time_s,
        depleted = result.depleted,
        "drive cycle integrated"
    );

    Ok(Json(DriveCycleResponse {
        total_points: result.soc.len(),
        soc: result.soc,
        discharge_time: result.discharge_time_s,
        depleted: result.depleted,
    }))
}
