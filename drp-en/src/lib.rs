//! drp-en library - Enrichment service
//!
//! Mediates every slow, rate-limited, sometimes-unconfigured external lookup
//! the record store depends on: geocoding, LLM analysis, social signal, and
//! official bulletins, all behind the shared TTL cache. Lookups never block
//! or crash the record store when they fail; mutating refreshes announce
//! themselves to the realtime relay on a fire-and-forget basis.

use axum::Router;
use drp_common::config::Settings;
use drp_common::{CacheStore, RelayClient};
use sqlx::SqlitePool;

pub mod api;
pub mod error;
pub mod services;
pub mod sweeper;

use crate::services::analyzer::ContentAnalyzer;
use crate::services::geocoding::LocationResolver;
use crate::services::official_updates::OfficialBulletinAggregator;
use crate::services::social_media::SocialSignalAggregator;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub cache: CacheStore,
    pub locations: LocationResolver,
    pub analyzer: ContentAnalyzer,
    pub social: SocialSignalAggregator,
    pub official: OfficialBulletinAggregator,
    pub relay: RelayClient,
}

impl AppState {
    /// Wire the resolvers over one shared cache store. The cache is injected
    /// here rather than reached through a global so tests can substitute an
    /// in-memory database.
    pub fn new(pool: SqlitePool, settings: &Settings) -> Self {
        let cache = CacheStore::new(pool);
        let analyzer = ContentAnalyzer::new(
            cache.clone(),
            settings.gemini_api_key.clone(),
            settings.fallback_ttl,
        );

        Self {
            locations: LocationResolver::new(
                cache.clone(),
                settings.google_maps_api_key.clone(),
                settings.nominatim_url.clone(),
                settings.fallback_ttl,
            ),
            social: SocialSignalAggregator::new(
                cache.clone(),
                analyzer.clone(),
                settings.twitter_api_key.clone(),
                settings.fallback_ttl,
            ),
            official: OfficialBulletinAggregator::new(
                cache.clone(),
                analyzer.clone(),
                settings.fema_disasters_url.clone(),
                settings.fallback_ttl,
            ),
            relay: RelayClient::new(settings.relay_url.clone(), settings.relay_token.clone()),
            analyzer,
            cache,
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};
    use tower_http::cors::CorsLayer;
    use tower_http::trace::TraceLayer;

    Router::new()
        .route("/health", get(api::health_check))
        .route("/geocode", post(api::geocode))
        .route("/analyze", post(api::analyze))
        .route("/verify-image", post(api::verify_image))
        .route("/disasters/:id/social-media", get(api::social_media))
        .route("/disasters/:id/official-updates", get(api::official_updates))
        .route("/cron/cache-cleanup", post(api::cache_cleanup))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
