use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;

use crate::metrics::MessageMetrics;
use crate::store::{MessageStore, StoreError};

use super::model::{ChatMessage, NewChatMessage};

/// Errors surfaced by the chat service
#[derive(Debug, Error)]
pub enum ChatError {
    /// Saving an inbound message failed; the message must not be broadcast
    #[error("Failed to persist message: {0}")]
    Persistence(#[source] StoreError),

    /// Reading history or deleting expired messages failed
    #[error("Message query failed: {0}")]
    Query(#[source] StoreError),

    #[error("Invalid message lifetime: {0:?}")]
    InvalidLifetime(Duration),
}

/// Turns raw chat input into persisted, expiring messages and answers history queries.
///
/// Holds no per-message state; every call goes straight to the store, so a
/// single instance is shared by every session and the sweeper.
pub struct ChatService {
    store: Arc<dyn MessageStore>,
    lifetime: chrono::Duration,
}

impl ChatService {
    /// Create a chat service. `lifetime` must be non-zero so that every
    /// message expires strictly after it was created.
    pub fn new(store: Arc<dyn MessageStore>, lifetime: Duration) -> Result<Self, ChatError> {
        // Whole microseconds, matching the precision timestamps are stored with
        let micros = i64::try_from(lifetime.as_micros())
            .map_err(|_| ChatError::InvalidLifetime(lifetime))?;
        if micros == 0 {
            return Err(ChatError::InvalidLifetime(lifetime));
        }

        Ok(Self {
            store,
            lifetime: chrono::Duration::microseconds(micros),
        })
    }

    pub fn message_lifetime(&self) -> chrono::Duration {
        self.lifetime
    }

    pub fn store_backend(&self) -> &'static str {
        self.store.backend_name()
    }

    /// Persist a message from `username`. Only a message returned from here
    /// may be broadcast.
    pub async fn process_message(&self, username: &str, text: &str) -> Result<ChatMessage, ChatError> {
        let message = NewChatMessage::new(username, text, Utc::now(), self.lifetime);

        match self.store.save(message.clone()).await {
            Ok(id) => {
                MessageMetrics::record_persisted();
                tracing::debug!(message_id = %id, username = %username, "Message persisted");
                Ok(message.into_persisted(id))
            }
            Err(e) => {
                MessageMetrics::record_dropped();
                Err(ChatError::Persistence(e))
            }
        }
    }

    /// Up to `limit` unexpired messages, newest first
    pub async fn recent_messages(&self, limit: usize) -> Result<Vec<ChatMessage>, ChatError> {
        self.store
            .find_recent(limit, Utc::now())
            .await
            .map_err(ChatError::Query)
    }

    /// Delete every message that has expired by now. Returns the number removed.
    pub async fn cleanup_expired_messages(&self) -> Result<u64, ChatError> {
        self.store
            .delete_expired(Utc::now())
            .await
            .map_err(ChatError::Query)
    }
}
