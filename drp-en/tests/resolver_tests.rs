//! Integration tests for the enrichment resolvers
//!
//! Every test runs fully offline: providers are unconfigured and keyless
//! endpoints point at an unroutable address, so each resolution exercises
//! the fallback chain down to its deterministic offline strategy.

use drp_common::config::Settings;
use drp_common::db::init_schema;
use drp_en::services::analyzer::Urgency;
use drp_en::services::Provider;
use drp_en::AppState;
use sqlx::sqlite::SqlitePoolOptions;

/// Test helper: state over an in-memory database with no providers configured
async fn setup_state() -> AppState {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Should open in-memory database");
    init_schema(&pool).await.expect("Should apply cache schema");
    AppState::new(pool, &Settings::offline())
}

fn is_invalid_input(err: &drp_common::Error) -> bool {
    matches!(err, drp_common::Error::InvalidInput(_))
}

// =============================================================================
// LocationResolver
// =============================================================================

#[tokio::test]
async fn geocoder_without_providers_returns_offline_result() {
    let state = setup_state().await;

    let result = state.locations.resolve("Manhattan, NYC").await.unwrap();
    assert_eq!(result.provider, Provider::Mock);
    assert_eq!((result.lat, result.lng), (40.7831, -73.9712));
}

#[tokio::test]
async fn geocoder_unknown_location_defaults_without_failing() {
    let state = setup_state().await;

    let result = state.locations.resolve("Atlantis").await.unwrap();
    assert_eq!(result.provider, Provider::Mock);
    assert_eq!(result.formatted_address, "Atlantis");
    // Default coordinates, clearly a placeholder rather than an error
    assert_eq!((result.lat, result.lng), (40.7128, -74.0060));
}

#[tokio::test]
async fn geocoder_rejects_empty_input() {
    let state = setup_state().await;
    let err = state.locations.resolve("   ").await.unwrap_err();
    assert!(is_invalid_input(&err));
}

#[tokio::test]
async fn geocoder_fast_path_serves_cache_without_resolving() {
    let state = setup_state().await;
    state.locations.resolve("Chicago, IL").await.unwrap();

    // Plant a sentinel in the cached payload; a second resolve must return
    // it verbatim, proving the fast path made no fresh resolution
    let sentinel = r#"{"lat":1.0,"lng":2.0,"formatted_address":"sentinel","provider":"mock"}"#;
    sqlx::query("UPDATE cache SET value = ? WHERE key LIKE 'geocode_%'")
        .bind(sentinel)
        .execute(state.cache.pool())
        .await
        .unwrap();

    let result = state.locations.resolve("Chicago, IL").await.unwrap();
    assert_eq!((result.lat, result.lng), (1.0, 2.0));
    assert_eq!(result.formatted_address, "sentinel");
}

#[tokio::test]
async fn offline_results_are_cached_under_fallback_ttl() {
    let state = setup_state().await;
    state.locations.resolve("Houston, TX").await.unwrap();

    let expires_at: String =
        sqlx::query_scalar("SELECT expires_at FROM cache WHERE key LIKE 'geocode_%'")
            .fetch_one(state.cache.pool())
            .await
            .unwrap();
    let expires_at = chrono::DateTime::parse_from_rfc3339(&expires_at).unwrap();

    // Offline TTL is 10 minutes by default, far below the 24h genuine TTL
    let remaining = expires_at.with_timezone(&chrono::Utc) - chrono::Utc::now();
    assert!(remaining <= chrono::Duration::minutes(11));
    assert!(remaining > chrono::Duration::minutes(5));
}

// =============================================================================
// SocialSignalAggregator
// =============================================================================

#[tokio::test]
async fn social_signal_without_key_returns_keyword_filtered_mocks() {
    let state = setup_state().await;

    let signal = state
        .social
        .resolve("42", &["flood".to_string()])
        .await
        .unwrap();

    assert_eq!(signal.provider, Provider::Mock);
    assert!(signal.total >= 1);
    for post in &signal.posts {
        let haystack = format!("{} {}", post.content, post.location).to_lowercase();
        assert!(haystack.contains("flood"), "post {} does not mention flood", post.id);
    }
}

#[tokio::test]
async fn social_signal_unmatched_keyword_is_empty_success() {
    let state = setup_state().await;

    let signal = state
        .social
        .resolve("42", &["volcano".to_string()])
        .await
        .unwrap();

    assert_eq!(signal.total, 0);
    assert!(signal.posts.is_empty());
}

#[tokio::test]
async fn social_mock_posts_keep_their_preclassified_urgency() {
    let state = setup_state().await;

    let signal = state
        .social
        .resolve("42", &["urgent".to_string()])
        .await
        .unwrap();

    let critical = signal
        .posts
        .iter()
        .find(|p| p.id == "post_4")
        .expect("URGENT mock post should match");
    assert_eq!(critical.urgency, Some(Urgency::Critical));
    // The enrichment step skipped it, so no analyzer summary was attached
    assert!(critical.summary.is_none());
}

#[tokio::test]
async fn social_signal_rejects_empty_disaster_id() {
    let state = setup_state().await;
    let err = state.social.resolve("", &[]).await.unwrap_err();
    assert!(is_invalid_input(&err));
}

// =============================================================================
// OfficialBulletinAggregator
// =============================================================================

#[tokio::test]
async fn bulletins_without_reachable_fema_fall_back_to_mocks() {
    let state = setup_state().await;

    let bulletins = state
        .official
        .resolve("7", &["fema".to_string()])
        .await
        .unwrap();

    assert_eq!(bulletins.provider, Provider::Mock);
    assert_eq!(bulletins.total, 1);
    assert_eq!(bulletins.updates[0].source, "FEMA");
}

#[tokio::test]
async fn bulletins_are_enriched_with_analysis() {
    let state = setup_state().await;

    let bulletins = state
        .official
        .resolve("7", &["nyc".to_string()])
        .await
        .unwrap();

    assert_eq!(bulletins.total, 1);
    let bulletin = &bulletins.updates[0];
    // Mock bulletins carry no prior urgency, so the analyzer classified them
    assert!(bulletin.urgency.is_some());
    assert!(bulletin.summary.is_some());
}

#[tokio::test]
async fn bulletins_default_sources_cover_all_mock_agencies() {
    let state = setup_state().await;

    let bulletins = state.official.resolve("7", &[]).await.unwrap();
    assert_eq!(bulletins.total, 3);
    assert_eq!(bulletins.sources, vec!["fema", "redcross", "nyc"]);
}

// =============================================================================
// ContentAnalyzer
// =============================================================================

#[tokio::test]
async fn analyzer_without_key_classifies_by_keywords() {
    let state = setup_state().await;

    let critical = state
        .analyzer
        .analyze_content("URGENT: residents trapped on the roof")
        .await
        .unwrap();
    assert_eq!(critical.urgency, Urgency::Critical);
    assert_eq!(critical.provider, Provider::Mock);

    let medium = state
        .analyzer
        .analyze_content("road closures reported around midtown")
        .await
        .unwrap();
    assert_eq!(medium.urgency, Urgency::Medium);
}

#[tokio::test]
async fn analyzer_rejects_empty_text() {
    let state = setup_state().await;
    let err = state.analyzer.analyze_content("  ").await.unwrap_err();
    assert!(is_invalid_input(&err));
}

#[tokio::test]
async fn location_extraction_without_key_uses_heuristics() {
    let state = setup_state().await;

    let extracted = state
        .analyzer
        .extract_location("Severe flooding reported across Manhattan")
        .await
        .unwrap();
    assert_eq!(extracted.location, "Manhattan, NYC");
    assert_eq!(extracted.provider, Provider::Mock);
}

#[tokio::test]
async fn image_verification_without_key_returns_placeholder_verdict() {
    let state = setup_state().await;

    let verdict = state
        .analyzer
        .verify_image("https://example.com/report.jpg", "flood report")
        .await
        .unwrap();

    assert!(verdict.authentic);
    assert_eq!(verdict.confidence, 0.5);
    assert_eq!(verdict.provider, Provider::Mock);
}

#[tokio::test]
async fn image_verification_rejects_empty_url() {
    let state = setup_state().await;
    let err = state.analyzer.verify_image("", "").await.unwrap_err();
    assert!(is_invalid_input(&err));
}
