//! Backend trait for chat message storage.
//!
//! The chat service only relies on this contract; the storage engine behind it
//! is free to be in-memory, PostgreSQL, or anything else that honors it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::chat::{ChatMessage, MessageId, NewChatMessage};

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// PostgreSQL operation failed
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// Backend is misconfigured or cannot be reached
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Stored data could not be interpreted
    #[error("Invalid stored data: {0}")]
    InvalidData(String),
}

/// Storage contract for chat messages.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` and safe for concurrent
/// `save`, `find_recent` and `delete_expired` calls from many tasks.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Short backend identifier for health reporting
    fn backend_name(&self) -> &'static str;

    /// Durably persist a message and return the identity assigned to it.
    ///
    /// Returning `Ok` means the message is stored; callers rely on that
    /// before making the message visible to anyone.
    async fn save(&self, message: NewChatMessage) -> Result<MessageId, StoreError>;

    /// Messages with `expires_at > now`, newest `created_at` first, at most `limit`.
    async fn find_recent(
        &self,
        limit: usize,
        now: DateTime<Utc>,
    ) -> Result<Vec<ChatMessage>, StoreError>;

    /// Remove every message with `expires_at <= now` and return how many were removed.
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError>;
}
