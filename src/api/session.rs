//! Session lifecycle and command endpoints

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Instant;
use tracing::info;
use uuid::Uuid;

use super::error::ApiError;
use crate::controller::{stop_and_export, AppState, EngineSnapshot, StopOutcome, StopReason};
use crate::simulation::{CommandUpdate, CommandVector};

#[derive(Debug, Serialize)]
pub struct StartResponse {
    pub session_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub max_duration_s: u64,
}

/// POST /session/start
pub async fn start_session(State(st): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let mut session = st.session.lock().await;
    let session_id = session.start(Instant::now())?;
    Ok((
        StatusCode::CREATED,
        Json(StartResponse {
            session_id,
            started_at: Utc::now(),
            max_duration_s: session.config().max_duration_s,
        }),
    ))
}

/// POST /session/stop
pub async fn stop_session(State(st): State<AppState>) -> Json<StopOutcome> {
    Json(stop_and_export(&st.session, StopReason::Requested).await)
}

/// GET /session
pub async fn get_session(State(st): State<AppState>) -> Json<EngineSnapshot> {
    Json(st.session.lock().await.snapshot(Instant::now()))
}

/// PUT /command - partial update; out-of-range values are clamped.
pub async fn put_command(
    State(st): State<AppState>,
    Json(update): Json<CommandUpdate>,
) -> Json<CommandVector> {
    let command = st.commands.apply(&update);
    info!(
        throttle = command.throttle,
        braking = command.is_braking,
        regen = command.regen_level,
        grade = command.grade,
        cooling = command.cooling_rate,
        time_warp = command.time_warp,
        "command updated"
    );
    Json(command)
}

/// POST /command/reset - back to idle defaults (no pedals, regen 50, no cooling, 1x).
pub async fn reset_command(State(st): State<AppState>) -> Json<CommandVector> {
    let command = st.commands.replace(CommandVector::default());
    info!("command reset to defaults");
    Json(command)
}
