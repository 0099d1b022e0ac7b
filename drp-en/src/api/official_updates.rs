//! GET /disasters/:id/official-updates - agency bulletins

use crate::api::social_media::split_list;
use crate::error::ApiError;
use crate::services::official_updates::OfficialBulletins;
use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::Json;
use drp_common::events;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct OfficialUpdatesQuery {
    /// Comma-separated source list; defaults apply when omitted
    pub sources: Option<String>,
}

pub async fn official_updates(
    State(state): State<AppState>,
    Path(disaster_id): Path<String>,
    Query(query): Query<OfficialUpdatesQuery>,
) -> Result<Json<OfficialBulletins>, ApiError> {
    let sources = split_list(query.sources.as_deref());
    let bulletins = state.official.resolve(&disaster_id, &sources).await?;

    // Announce the refresh to live subscribers; never on the critical path
    if let Ok(data) = serde_json::to_value(&bulletins) {
        state
            .relay
            .emit(
                events::OFFICIAL_UPDATES_UPDATED,
                &events::disaster_room(&disaster_id),
                data,
            )
            .await;
    }

    Ok(Json(bulletins))
}
