//! Health check endpoint

use crate::AppState;
use axum::extract::State;
use axum::Json;
use serde::Serialize;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub module: String,
    pub version: String,
    pub online_users: usize,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        module: "drp-rt".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        online_users: state.rooms.online_count(),
    })
}
