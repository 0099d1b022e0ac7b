//! drp-rt - Realtime relay for the disaster response platform

use anyhow::Result;
use drp_rt::{build_router, AppState};
use tracing::info;

const DEFAULT_PORT: u16 = 5742;

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
        "Starting DRP Realtime Relay (drp-rt) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let token = std::env::var("DRP_RELAY_TOKEN")
        .ok()
        .filter(|t| !t.trim().is_empty());
    if token.is_some() {
        info!("Ingestion endpoint protected by relay token");
    } else {
        info!("Ingestion endpoint open (set DRP_RELAY_TOKEN to protect /emit)");
    }

    let state = AppState::new(token);
    let app = build_router(state);

    let port = std::env::var("DRP_RT_PORT")
        .ok()
        .and_then(|v| v.parse::<u16>().ok())
        .unwrap_or(DEFAULT_PORT);
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
    info!("drp-rt listening on http://127.0.0.1:{}", port);
    info!("WebSocket endpoint: ws://127.0.0.1:{}/ws", port);

    axum::serve(listener, app).await?;

    Ok(())
}
