//! drp-rt library - Realtime relay
//!
//! A standalone process holding room-subscription state: clients connect
//! over WebSocket and join disaster-scoped rooms; the API layer pushes
//! events through `POST /emit`, which multicasts to current room members.
//! Delivery is best-effort and at-most-once; membership is purely in-memory
//! and rebuilt on restart.

use axum::Router;

pub mod emit;
pub mod health;
pub mod rooms;
pub mod ws;

pub use rooms::Rooms;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub rooms: Rooms,
    /// Optional bearer token required on the ingestion boundary; `None`
    /// leaves `/emit` open
    pub token: Option<String>,
}

impl AppState {
    pub fn new(token: Option<String>) -> Self {
        Self {
            rooms: Rooms::new(),
            token,
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};
    use tower_http::cors::CorsLayer;
    use tower_http::trace::TraceLayer;

    Router::new()
        .route("/health", get(health::health_check))
        .route("/ws", get(ws::ws_handler))
        .route("/emit", post(emit::emit_event))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
