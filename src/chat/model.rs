//! Chat message types.

use std::fmt;

use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Store-assigned message identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(Uuid);

impl MessageId {
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl From<Uuid> for MessageId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A message that has not been persisted yet.
///
/// It carries no identity; only [`NewChatMessage::into_persisted`] with an id
/// handed out by a store turns it into a [`ChatMessage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewChatMessage {
    pub username: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl NewChatMessage {
    /// Build a message created at `now` that expires after `lifetime`.
    ///
    /// Timestamps are truncated to microseconds, the precision of PostgreSQL
    /// `TIMESTAMPTZ`, so `expires_at - created_at == lifetime` holds after a
    /// storage round-trip.
    pub fn new(
        username: impl Into<String>,
        message: impl Into<String>,
        now: DateTime<Utc>,
        lifetime: Duration,
    ) -> Self {
        let created_at = now.trunc_subsecs(6);
        Self {
            username: username.into(),
            message: message.into(),
            created_at,
            expires_at: created_at + lifetime,
        }
    }

    pub fn into_persisted(self, id: MessageId) -> ChatMessage {
        ChatMessage {
            id,
            username: self.username,
            message: self.message,
            created_at: self.created_at,
            expires_at: self.expires_at,
        }
    }
}

/// A persisted chat message, as broadcast to sessions and returned by history queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub username: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry_is_created_plus_lifetime() {
        let now = Utc::now();
        let msg = NewChatMessage::new("alice", "hi", now, Duration::seconds(60));

        assert_eq!(msg.expires_at - msg.created_at, Duration::seconds(60));
        assert!(msg.expires_at > msg.created_at);
        assert_eq!(msg.created_at.timestamp_subsec_nanos() % 1_000, 0);
    }

    #[test]
    fn test_wire_shape() {
        let id = MessageId::new(Uuid::new_v4());
        let msg = NewChatMessage::new("alice", "hi", Utc::now(), Duration::seconds(60))
            .into_persisted(id);

        let value = serde_json::to_value(&msg).unwrap();
        let object = value.as_object().unwrap();

        assert_eq!(object.len(), 5);
        assert_eq!(object["id"], serde_json::json!(id.as_uuid().to_string()));
        assert_eq!(object["username"], "alice");
        assert_eq!(object["message"], "hi");
        assert!(object["created_at"].is_string());
        assert!(object["expires_at"].is_string());
    }

    #[test]
    fn test_is_expired_at_boundary() {
        let now = Utc::now();
        let msg = NewChatMessage::new("bob", "bye", now, Duration::seconds(1))
            .into_persisted(MessageId::new(Uuid::new_v4()));

        assert!(!msg.is_expired_at(msg.created_at));
        assert!(msg.is_expired_at(msg.expires_at));
    }
}
