//! GET /disasters/:id/social-media - keyword-filtered social signal

use crate::error::ApiError;
use crate::services::social_media::SocialSignal;
use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::Json;
use drp_common::events;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct SocialMediaQuery {
    /// Comma-separated keyword list; defaults apply when omitted
    pub keywords: Option<String>,
}

pub async fn social_media(
    State(state): State<AppState>,
    Path(disaster_id): Path<String>,
    Query(query): Query<SocialMediaQuery>,
) -> Result<Json<SocialSignal>, ApiError> {
    let keywords = split_list(query.keywords.as_deref());
    let signal = state.social.resolve(&disaster_id, &keywords).await?;

    // Announce the refresh to live subscribers; never on the critical path
    if let Ok(data) = serde_json::to_value(&signal) {
        state
            .relay
            .emit(
                events::SOCIAL_MEDIA_UPDATED,
                &events::disaster_room(&disaster_id),
                data,
            )
            .await;
    }

    Ok(Json(signal))
}

/// Split a comma-separated query value into trimmed, non-empty items
pub(crate) fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|value| {
        value
            .split(',')
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect()
    })
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_list_handles_blanks() {
        assert_eq!(split_list(Some("flood, emergency,,")), vec!["flood", "emergency"]);
        assert!(split_list(None).is_empty());
        assert!(split_list(Some("")).is_empty());
    }
}
