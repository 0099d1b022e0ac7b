//! POST /emit - ingestion boundary for the API layer
//!
//! Accepts `{event, room, data}` and multicasts to the room's current
//! members. A room with zero members is a success no-op. When a relay token
//! is configured, callers must present it as a bearer token.

use crate::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use drp_common::events::RealtimeEvent;
use serde_json::json;
use tracing::{info, warn};

pub async fn emit_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<RealtimeEvent>, JsonRejection>,
) -> Response {
    if let Some(expected) = &state.token {
        if !bearer_matches(&headers, expected) {
            warn!("Rejected emit with missing or invalid token");
            return failure(StatusCode::UNAUTHORIZED, "invalid relay token");
        }
    }

    let event = match body {
        Ok(Json(event)) => event,
        Err(rejection) => {
            warn!("Rejected malformed emit request: {}", rejection);
            return failure(StatusCode::BAD_REQUEST, &rejection.to_string());
        }
    };

    if event.event.trim().is_empty() || event.room.trim().is_empty() {
        return failure(StatusCode::BAD_REQUEST, "event and room are required");
    }

    let delivered = state.rooms.emit(&event.event, &event.room, &event.data);
    info!(event = %event.event, room = %event.room, delivered, "Ingested event");

    (
        StatusCode::OK,
        Json(json!({ "success": true, "delivered": delivered })),
    )
        .into_response()
}

fn failure(status: StatusCode, error: &str) -> Response {
    (status, Json(json!({ "success": false, "error": error }))).into_response()
}

fn bearer_matches(headers: &HeaderMap, expected: &str) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token == expected)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_header_must_match() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Bearer sekrit".parse().unwrap());
        assert!(bearer_matches(&headers, "sekrit"));
        assert!(!bearer_matches(&headers, "other"));
        assert!(!bearer_matches(&HeaderMap::new(), "sekrit"));
    }
}
