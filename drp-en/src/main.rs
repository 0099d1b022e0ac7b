//! drp-en - Enrichment service for the disaster response platform
//!
//! Hosts the cache-aside resolvers (geocoding, content analysis, image
//! verification, social signal, official bulletins) and the periodic cache
//! sweeper behind an HTTP API consumed by the record store.

use anyhow::Result;
use drp_common::config::{resolve_data_dir, Settings};
use drp_common::db::init_database;
use drp_en::sweeper::{spawn_sweeper, DEFAULT_SWEEP_INTERVAL};
use drp_en::{build_router, AppState};
use std::time::Duration;
use tracing::info;

const DEFAULT_PORT: u16 = 5741;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Log build identification immediately after tracing init
    info!(
        "Starting DRP Enrichment (drp-en) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let cli_data_dir = std::env::args().nth(1);
    let data_dir = resolve_data_dir(cli_data_dir.as_deref());
    let db_path = data_dir.join("drp.db");
    info!("Database path: {}", db_path.display());

    let pool = init_database(&db_path).await?;
    let settings = Settings::resolve();

    let state = AppState::new(pool, &settings);

    // Sweeper runs decoupled from request handling for the process lifetime
    let sweep_interval = std::env::var("DRP_SWEEP_INTERVAL_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_SWEEP_INTERVAL);
    spawn_sweeper(state.cache.clone(), sweep_interval);

    let app = build_router(state);

    let port = std::env::var("DRP_EN_PORT")
        .ok()
        .and_then(|v| v.parse::<u16>().ok())
        .unwrap_or(DEFAULT_PORT);
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
    info!("drp-en listening on http://127.0.0.1:{}", port);
    info!("Health check: http://127.0.0.1:{}/health", port);

    axum::serve(listener, app).await?;

    Ok(())
}
