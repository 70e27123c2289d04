use std::fmt::Display;
use std::time::Instant;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{Sink, SinkExt, Stream, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::chat::ChatService;
use crate::error::{AppError, Result};
use crate::hub::{ClientSession, Frame, HubHandle, SessionId};
use crate::metrics::{MessageMetrics, SessionMetrics};
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub username: Option<String>,
}

/// WebSocket upgrade handler
#[tracing::instrument(
    name = "ws.upgrade",
    skip(ws, state, query),
    fields(username = query.username.as_deref().unwrap_or_default())
)]
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
) -> Result<Response> {
    let username = match query.username {
        Some(name) if !name.is_empty() => name,
        _ => {
            return Err(AppError::Validation(
                "username parameter is required".to_string(),
            ))
        }
    };

    tracing::info!(username = %username, "WebSocket upgrade requested");

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, username)))
}

/// Handle an established WebSocket connection
#[tracing::instrument(
    name = "ws.connection",
    skip(socket, state),
    fields(otel.kind = "server")
)]
async fn handle_socket(socket: WebSocket, state: AppState, username: String) {
    let connection_start = Instant::now();
    let ws_config = &state.settings.websocket;

    let (session, rx) = match ClientSession::new(username.clone(), ws_config.outbound_queue_size) {
        Ok(pair) => pair,
        Err(e) => {
            tracing::warn!(username = %username, error = %e, "Session rejected");
            return;
        }
    };
    let session_id = session.id;

    if let Err(e) = state.hub.register(session).await {
        tracing::warn!(session_id = %session_id, error = %e, "Hub unavailable, closing connection");
        return;
    }
    SessionMetrics::record_opened();

    tracing::info!(
        session_id = %session_id,
        username = %username,
        "WebSocket connection established"
    );

    let (ws_sender, ws_receiver) = socket.split();

    let mut write_task = tokio::spawn(write_pump(ws_sender, rx, state.hub.clone(), session_id));
    let mut read_task = tokio::spawn(read_pump(
        ws_receiver,
        state.chat.clone(),
        state.hub.clone(),
        session_id,
        username.clone(),
    ));

    tokio::select! {
        _ = &mut write_task => {
            tracing::debug!(session_id = %session_id, "Write pump completed");
            read_task.abort();
        }
        _ = &mut read_task => {
            tracing::debug!(session_id = %session_id, "Read pump completed");
            // Let the write pump flush what is queued and send the close frame
            if tokio::time::timeout(ws_config.write_drain_timeout(), &mut write_task)
                .await
                .is_err()
            {
                tracing::debug!(session_id = %session_id, "Write pump drain timed out");
                write_task.abort();
            }
        }
    }

    // Either pump may already have done this; unregister is idempotent
    let _ = state.hub.unregister(session_id).await;

    let duration = connection_start.elapsed().as_secs_f64();
    SessionMetrics::record_closed(duration);

    tracing::info!(
        session_id = %session_id,
        username = %username,
        duration_secs = duration,
        "WebSocket connection closed"
    );
}

/// Drain the outbound queue to the socket, one text frame per message.
///
/// Ends with a close frame when the hub closes the queue, or unregisters the
/// session on a write failure.
async fn write_pump<S>(
    mut sender: S,
    mut rx: mpsc::Receiver<Frame>,
    hub: HubHandle,
    session_id: SessionId,
) where
    S: Sink<Message> + Unpin,
    S::Error: Display,
{
    while let Some(frame) = rx.recv().await {
        if let Err(e) = sender.send(Message::Text(frame)).await {
            tracing::debug!(session_id = %session_id, error = %e, "WebSocket send failed");
            let _ = hub.unregister(session_id).await;
            return;
        }
    }

    tracing::debug!(session_id = %session_id, "Outbound queue closed");
    let _ = sender.send(Message::Close(None)).await;
}

/// Read inbound frames, persist each text frame, then broadcast it.
///
/// A frame whose persistence fails is dropped and the session stays open.
async fn read_pump<R, E>(
    mut receiver: R,
    chat: std::sync::Arc<ChatService>,
    hub: HubHandle,
    session_id: SessionId,
    username: String,
) where
    R: Stream<Item = std::result::Result<Message, E>> + Unpin,
    E: Display,
{
    while let Some(result) = receiver.next().await {
        let text = match result {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => {
                tracing::debug!(session_id = %session_id, "Received close frame");
                break;
            }
            Ok(Message::Binary(data)) => {
                tracing::debug!(session_id = %session_id, len = data.len(), "Ignoring binary frame");
                continue;
            }
            // Answered by axum
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => continue,
            Err(e) => {
                tracing::debug!(session_id = %session_id, error = %e, "WebSocket receive error");
                break;
            }
        };

        MessageMetrics::record_received();

        let message = match chat.process_message(&username, text.as_str()).await {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(
                    session_id = %session_id,
                    username = %username,
                    error = %e,
                    "Failed to persist message, dropping frame"
                );
                continue;
            }
        };

        if let Err(e) = hub.broadcast(message).await {
            tracing::warn!(session_id = %session_id, error = %e, "Broadcast failed");
            break;
        }
    }

    let _ = hub.unregister(session_id).await;
}
