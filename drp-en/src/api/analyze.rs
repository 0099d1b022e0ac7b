//! POST /analyze and POST /verify-image - direct analyzer boundary

use crate::error::ApiError;
use crate::services::analyzer::{ContentAnalysis, ImageVerdict};
use crate::AppState;
use axum::{extract::State, Json};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub text: String,
}

pub async fn analyze(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<ContentAnalysis>, ApiError> {
    let analysis = state.analyzer.analyze_content(&request.text).await?;
    Ok(Json(analysis))
}

#[derive(Debug, Deserialize)]
pub struct VerifyImageRequest {
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub context: String,
}

pub async fn verify_image(
    State(state): State<AppState>,
    Json(request): Json<VerifyImageRequest>,
) -> Result<Json<ImageVerdict>, ApiError> {
    let verdict = state
        .analyzer
        .verify_image(&request.image_url, &request.context)
        .await?;
    Ok(Json(verdict))
}
