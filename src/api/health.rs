use axum::{extract::State, Json};
use serde::Serialize;

use crate::controller::{AppState, SessionPhase};

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    timestamp: chrono::DateTime<chrono::Utc>,
    engine: EngineHealth,
}

#[derive(Debug, Serialize)]
pub struct EngineHealth {
    phase: SessionPhase,
    tick_interval_ms: u64,
}

/// GET /health
pub async fn health_check(State(st): State<AppState>) -> Json<HealthResponse> {
    let phase = st.session.lock().await.phase();
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now(),
        engine: EngineHealth {
            phase,
            tick_interval_ms: st.cfg.session.tick_interval_ms,
        },
    })
}
