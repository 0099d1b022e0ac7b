//! Fire-and-forget client for the realtime relay ingestion endpoint
//!
//! Realtime notification is an enhancement, never a dependency of the record
//! mutation it announces: an unreachable or disabled relay is logged and
//! swallowed, with no retry and no queueing. Delivery is at-most-once,
//! possibly zero.

use crate::events::RealtimeEvent;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

const EMIT_TIMEOUT: Duration = Duration::from_secs(5);
const USER_AGENT: &str = concat!("DisasterResponsePlatform/", env!("CARGO_PKG_VERSION"));

/// Client for pushing events to the relay's `POST /emit` boundary
#[derive(Clone)]
pub struct RelayClient {
    http_client: reqwest::Client,
    /// Relay base URL; `None` means realtime features are disabled
    base_url: Option<String>,
    /// Optional bearer token required by a hardened relay
    token: Option<String>,
}

impl RelayClient {
    pub fn new(base_url: Option<String>, token: Option<String>) -> Self {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(EMIT_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            http_client,
            base_url: base_url.map(|u| u.trim_end_matches('/').to_string()),
            token,
        }
    }

    /// Relay client with realtime emission disabled (every emit is a no-op)
    pub fn disabled() -> Self {
        Self::new(None, None)
    }

    pub fn is_enabled(&self) -> bool {
        self.base_url.is_some()
    }

    /// Push an event toward room members currently connected to the relay.
    ///
    /// Never fails from the caller's perspective: any transport or relay
    /// error is logged and dropped.
    pub async fn emit(&self, event: &str, room: &str, data: Value) {
        let Some(base_url) = &self.base_url else {
            debug!(event = %event, room = %room, "Realtime disabled, dropping event");
            return;
        };

        let body = RealtimeEvent {
            event: event.to_string(),
            room: room.to_string(),
            data,
        };

        let mut request = self.http_client.post(format!("{}/emit", base_url)).json(&body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        match request.send().await {
            Ok(response) if response.status().is_success() => {
                debug!(event = %event, room = %room, "Emitted realtime event");
            }
            Ok(response) => {
                warn!(
                    event = %event,
                    room = %room,
                    status = %response.status(),
                    "Relay rejected event (dropped)"
                );
            }
            Err(e) => {
                warn!(event = %event, room = %room, "Relay unreachable (dropped): {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn disabled_client_swallows_emits() {
        let client = RelayClient::disabled();
        assert!(!client.is_enabled());
        // Must complete without error despite no relay being configured
        client.emit("resources_updated", "disaster_42", json!({"id": 42})).await;
    }

    #[tokio::test]
    async fn unreachable_relay_is_not_an_error() {
        // Nothing listens on this port; emit must still return normally
        let client = RelayClient::new(Some("http://127.0.0.1:1".to_string()), None);
        assert!(client.is_enabled());
        client.emit("disaster_updated", "disaster_1", json!({})).await;
    }
}
