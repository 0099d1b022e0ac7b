//! Enrichment resolvers
//!
//! Each resolver follows the same cache-aside shape: derive a deterministic
//! cache key from the semantic inputs, return a cache hit immediately (the
//! fast path makes no external call), otherwise walk an ordered fallback
//! chain whose terminal offline strategy cannot fail, write the result back
//! with the resolver's TTL, and return it tagged with the producing provider.
//!
//! Upstream failures are absorbed by the chain; only malformed caller input
//! surfaces as an error.

pub mod analyzer;
pub mod geocoding;
pub mod official_updates;
pub mod social_media;

use serde::{Deserialize, Serialize};

/// Identity of the strategy that produced a resolution result.
///
/// Stored inside every cached payload so callers and tests can distinguish
/// genuine external answers from offline fallbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    /// Google Maps Geocoding API
    Google,
    /// OpenStreetMap Nominatim
    Osm,
    /// Gemini LLM analysis
    Gemini,
    /// Live social media API
    Twitter,
    /// FEMA bulletin fetch
    Fema,
    /// Deterministic offline fallback
    Mock,
}

impl Provider {
    /// Offline results are cached under the shorter fallback TTL instead of
    /// the resolver's genuine-result TTL
    pub fn is_fallback(self) -> bool {
        matches!(self, Provider::Mock)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Provider::Google => "google",
            Provider::Osm => "osm",
            Provider::Gemini => "gemini",
            Provider::Twitter => "twitter",
            Provider::Fema => "fema",
            Provider::Mock => "mock",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User agent presented to every external provider
pub(crate) const USER_AGENT: &str =
    concat!("DisasterResponsePlatform/", env!("CARGO_PKG_VERSION"));

/// Bounded timeout for external provider calls
pub(crate) const PROVIDER_TIMEOUT_SECS: u64 = 10;

/// Shared reqwest client construction for provider strategies
pub(crate) fn provider_http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(std::time::Duration::from_secs(PROVIDER_TIMEOUT_SECS))
        .build()
        .unwrap_or_default()
}
