//! Live telemetry endpoints

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Serialize;

use super::error::ApiError;
use crate::controller::{AppState, WarningFlags};
use crate::export::{export_file_name, render_csv};

/// The three live-chart series, oldest first.
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub capacity: usize,
    pub current: Vec<f64>,
    pub soc: Vec<f64>,
    pub soh: Vec<f64>,
    pub warnings: WarningFlags,
}

/// GET /telemetry/history
pub async fn get_history(State(st): State<AppState>) -> Json<HistoryResponse> {
    let session = st.session.lock().await;
    let history = session.history();
    Json(HistoryResponse {
        capacity: history.current.capacity(),
        current: history.current.to_vec(),
        soc: history.soc.to_vec(),
        soh: history.soh.to_vec(),
        warnings: session.warnings(),
    })
}

/// GET /telemetry/log.csv - current session log, 204 when nothing was sampled.
pub async fn get_log_csv(State(st): State<AppState>) -> Result<Response, ApiError> {
    let samples = st.session.lock().await.log().samples().to_vec();
    if samples.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    let body = render_csv(&samples)?;
    let disposition = format!("attachment; filename=\"{}\"", export_file_name(Utc::now()));
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}
