//! Realtime event types shared between the enrichment service and the relay
//!
//! Events are scoped by room rather than by typed variants: the relay
//! multicasts an opaque payload under an event name to whichever connections
//! have joined the room, so the wire envelope is a generic triple.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Event emitted when a disaster record changes
pub const DISASTER_UPDATED: &str = "disaster_updated";
/// Event emitted after a social-signal refresh for a disaster
pub const SOCIAL_MEDIA_UPDATED: &str = "social_media_updated";
/// Event emitted after an official-bulletin refresh for a disaster
pub const OFFICIAL_UPDATES_UPDATED: &str = "official_updates_updated";
/// Event emitted when resources attached to a disaster change
pub const RESOURCES_UPDATED: &str = "resources_updated";
/// Pushed to every connection when the online count changes
pub const ONLINE_USERS: &str = "online_users";

/// Wire envelope accepted by the relay's `POST /emit` ingestion endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeEvent {
    /// Event name delivered to room members
    pub event: String,
    /// Target room; members not joined receive nothing
    pub room: String,
    /// Opaque payload, producer-defined
    #[serde(default)]
    pub data: Value,
}

/// Room name for events scoped to one disaster
pub fn disaster_room(disaster_id: &str) -> String {
    format!("disaster_{}", disaster_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disaster_room_matches_client_protocol() {
        assert_eq!(disaster_room("42"), "disaster_42");
    }
}
