//! In-memory message store.
//!
//! Messages are kept in an ordered map and are lost on service restart.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::chat::{ChatMessage, MessageId, NewChatMessage};

use super::backend::{MessageStore, StoreError};

/// Ordering key: creation time, then insertion sequence for equal timestamps
type MessageKey = (DateTime<Utc>, u64);

#[derive(Default)]
struct Inner {
    messages: BTreeMap<MessageKey, ChatMessage>,
    next_seq: u64,
}

/// In-memory message store.
///
/// Newest-first queries walk the map in reverse, so `find_recent` is
/// proportional to the page size plus the number of expired entries skipped.
#[derive(Default)]
pub struct MemoryMessageStore {
    inner: RwLock<Inner>,
}

impl MemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of messages currently held, expired or not
    pub async fn len(&self) -> usize {
        self.inner.read().await.messages.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl MessageStore for MemoryMessageStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn save(&self, message: NewChatMessage) -> Result<MessageId, StoreError> {
        let id = MessageId::new(Uuid::new_v4());
        let mut inner = self.inner.write().await;

        let seq = inner.next_seq;
        inner.next_seq += 1;
        let key = (message.created_at, seq);
        inner.messages.insert(key, message.into_persisted(id));

        tracing::trace!(message_id = %id, stored = inner.messages.len(), "Message stored in memory");

        Ok(id)
    }

    async fn find_recent(
        &self,
        limit: usize,
        now: DateTime<Utc>,
    ) -> Result<Vec<ChatMessage>, StoreError> {
        let inner = self.inner.read().await;

        let messages = inner
            .messages
            .values()
            .rev()
            .filter(|msg| !msg.is_expired_at(now))
            .take(limit)
            .cloned()
            .collect();

        Ok(messages)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut inner = self.inner.write().await;

        let before = inner.messages.len();
        inner.messages.retain(|_, msg| !msg.is_expired_at(now));
        let removed = (before - inner.messages.len()) as u64;

        if removed > 0 {
            tracing::debug!(
                removed = removed,
                remaining = inner.messages.len(),
                "Deleted expired messages from memory"
            );
        }

        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn message_at(text: &str, created_at: DateTime<Utc>, lifetime_secs: i64) -> NewChatMessage {
        NewChatMessage::new("alice", text, created_at, Duration::seconds(lifetime_secs))
    }

    #[tokio::test]
    async fn test_save_assigns_distinct_ids() {
        let store = MemoryMessageStore::new();
        let now = Utc::now();

        let a = store.save(message_at("a", now, 60)).await.unwrap();
        let b = store.save(message_at("b", now, 60)).await.unwrap();

        assert_ne!(a, b);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_find_recent_newest_first_and_capped() {
        let store = MemoryMessageStore::new();
        let t = Utc::now();

        store.save(message_at("first", t, 60)).await.unwrap();
        store.save(message_at("second", t + Duration::seconds(1), 60)).await.unwrap();
        store.save(message_at("third", t + Duration::seconds(2), 60)).await.unwrap();

        let recent = store.find_recent(2, t + Duration::seconds(3)).await.unwrap();
        let texts: Vec<_> = recent.iter().map(|m| m.message.as_str()).collect();

        assert_eq!(texts, vec!["third", "second"]);
    }

    #[tokio::test]
    async fn test_find_recent_equal_timestamps_latest_insert_first() {
        let store = MemoryMessageStore::new();
        let t = Utc::now();

        store.save(message_at("one", t, 60)).await.unwrap();
        store.save(message_at("two", t, 60)).await.unwrap();

        let recent = store.find_recent(10, t).await.unwrap();
        let texts: Vec<_> = recent.iter().map(|m| m.message.as_str()).collect();

        assert_eq!(texts, vec!["two", "one"]);
    }

    #[tokio::test]
    async fn test_find_recent_skips_expired() {
        let store = MemoryMessageStore::new();
        let t = Utc::now();

        store.save(message_at("short", t, 1)).await.unwrap();
        store.save(message_at("long", t, 60)).await.unwrap();

        let recent = store.find_recent(10, t + Duration::seconds(1)).await.unwrap();

        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].message, "long");
    }

    #[tokio::test]
    async fn test_delete_expired_exact_boundary() {
        let store = MemoryMessageStore::new();
        let t = Utc::now();

        store.save(message_at("expires-at-t+1", t, 1)).await.unwrap();
        store.save(message_at("expires-at-t+2", t, 2)).await.unwrap();
        store.save(message_at("expires-at-t+3", t, 3)).await.unwrap();

        let removed = store.delete_expired(t + Duration::seconds(2)).await.unwrap();
        assert_eq!(removed, 2);

        let remaining = store.find_recent(10, t).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].message, "expires-at-t+3");
    }

    #[tokio::test]
    async fn test_delete_expired_is_idempotent() {
        let store = MemoryMessageStore::new();
        let t = Utc::now();

        store.save(message_at("gone", t, 1)).await.unwrap();

        let later = t + Duration::seconds(5);
        assert_eq!(store.delete_expired(later).await.unwrap(), 1);
        assert_eq!(store.delete_expired(later).await.unwrap(), 0);
        assert!(store.is_empty().await);
    }
}
