//! POST /cron/cache-cleanup - sweep trigger for external schedulers

use crate::error::ApiError;
use crate::AppState;
use axum::{extract::State, Json};
use serde::Serialize;
use tracing::info;

#[derive(Debug, Serialize)]
pub struct CleanupResponse {
    pub deleted: u64,
    pub message: String,
}

pub async fn cache_cleanup(
    State(state): State<AppState>,
) -> Result<Json<CleanupResponse>, ApiError> {
    info!("Running scheduled cache cleanup");

    let deleted = state
        .cache
        .purge_expired()
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to cleanup cache: {}", e)))?;

    info!("Cache cleanup completed, {} entries purged", deleted);
    Ok(Json(CleanupResponse {
        deleted,
        message: "Cache cleanup completed successfully".to_string(),
    }))
}
