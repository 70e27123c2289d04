use axum::{routing::get, Router};

use crate::server::AppState;
use crate::websocket::ws_handler;

use super::health::{health, stats};
use super::history::recent_messages;
use super::metrics::prometheus_metrics;

pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health & Stats
        .route("/health", get(health))
        .route("/stats", get(stats))
        .route("/metrics", get(prometheus_metrics))
        // Chat endpoints
        .nest(
            "/api",
            Router::new()
                .route("/ws", get(ws_handler))
                .route("/messages", get(recent_messages)),
        )
}
