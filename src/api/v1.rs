use axum::{
    routing::{get, post, put},
    Router,
};

use super::{drive_cycle, health, session, telemetry};
use crate::controller::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/session", get(session::get_session))
        .route("/session/start", post(session::start_session))
        .route("/session/stop", post(session::stop_session))
        .route("/command", put(session::put_command))
        .route("/command/reset", post(session::reset_command))
        .route("/telemetry/history", get(telemetry::get_history))
        .route("/telemetry/log.csv", get(telemetry::get_log_csv))
        .route("/drive-cycle", post(drive_cycle::simulate_drive_cycle))
        .route("/health", get(health::health_check))
        .with_state(state)
}
