//! Message history endpoint.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::chat::ChatMessage;
use crate::error::Result;
use crate::server::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

/// GET /api/messages - unexpired messages, newest first
#[tracing::instrument(name = "api.history", skip(state))]
pub async fn recent_messages(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<ChatMessage>>> {
    let limit = page_limit(query.limit, state.settings.chat.history_page_size);
    let messages = state.chat.recent_messages(limit).await?;
    Ok(Json(messages))
}

/// The requested limit can narrow the page but never widen it
fn page_limit(requested: Option<usize>, page_size: usize) -> usize {
    requested.map_or(page_size, |n| n.min(page_size))
}
