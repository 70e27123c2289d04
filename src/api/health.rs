//! Health check and statistics endpoints.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::error::Result;
use crate::hub::HubStats;
use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub store: StoreHealthResponse,
    pub hub: HubHealthResponse,
}

#[derive(Debug, Serialize)]
pub struct StoreHealthResponse {
    pub backend: String,
    pub message_lifetime_seconds: i64,
}

#[derive(Debug, Serialize)]
pub struct HubHealthResponse {
    pub running: bool,
    pub sessions: usize,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let hub_stats = state.hub.stats().await.ok();
    let running = hub_stats.is_some();

    Json(HealthResponse {
        status: if running { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        store: StoreHealthResponse {
            backend: state.chat.store_backend().to_string(),
            message_lifetime_seconds: state.chat.message_lifetime().num_seconds(),
        },
        hub: HubHealthResponse {
            running,
            sessions: hub_stats.map_or(0, |s| s.sessions),
        },
    })
}

/// GET /stats - hub registry snapshot
pub async fn stats(State(state): State<AppState>) -> Result<Json<HubStats>> {
    Ok(Json(state.hub.stats().await?))
}
