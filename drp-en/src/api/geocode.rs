//! POST /geocode - extract a location from free text, then geocode it

use crate::error::ApiError;
use crate::AppState;
use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct GeocodeRequest {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Serialize)]
pub struct GeocodeResponse {
    pub original_text: String,
    pub extracted_location: String,
    pub coordinates: Coordinates,
    pub formatted_address: String,
    pub geocoding_provider: String,
    pub timestamp: DateTime<Utc>,
}

pub async fn geocode(
    State(state): State<AppState>,
    Json(request): Json<GeocodeRequest>,
) -> Result<Json<GeocodeResponse>, ApiError> {
    if request.text.trim().is_empty() {
        return Err(ApiError::BadRequest("text parameter is required".to_string()));
    }

    let extracted = state.analyzer.extract_location(&request.text).await?;
    let geocoded = state.locations.resolve(&extracted.location).await?;

    info!(
        location = %extracted.location,
        lat = geocoded.lat,
        lng = geocoded.lng,
        "Geocoding completed"
    );

    Ok(Json(GeocodeResponse {
        original_text: request.text,
        extracted_location: extracted.location,
        coordinates: Coordinates {
            lat: geocoded.lat,
            lng: geocoded.lng,
        },
        formatted_address: geocoded.formatted_address,
        geocoding_provider: geocoded.provider.to_string(),
        timestamp: Utc::now(),
    }))
}
