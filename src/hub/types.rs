//! Session handle and hub event types

use std::fmt;

use axum::extract::ws::Utf8Bytes;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::chat::ChatMessage;

use super::stats::HubStats;

/// A serialized outbound frame. Cloning shares the underlying buffer, so one
/// serialization is fanned out to every session without copying.
pub type Frame = Utf8Bytes;

/// Identity of one live connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HubError {
    /// The hub loop has stopped; no further events are accepted
    #[error("Hub is not running")]
    Closed,

    #[error("Username must not be empty")]
    EmptyUsername,

    /// A queue was asked for with no room for a single item
    #[error("Queue capacity must be greater than zero, got {0}")]
    InvalidCapacity(usize),
}

/// The hub's side of a session: identity plus the only sender of its outbound queue.
///
/// The hub owns this value while the session is registered. Dropping it closes
/// the outbound queue, which is how the write pump learns to stop.
#[derive(Debug)]
pub struct ClientSession {
    pub id: SessionId,
    pub username: String,
    pub connected_at: DateTime<Utc>,
    queue: mpsc::Sender<Frame>,
}

impl ClientSession {
    /// Create a session for `username` with an outbound queue of `capacity` frames.
    ///
    /// Returns the session (to be handed to the hub) and the receiving end of
    /// its queue (to be drained by the write pump).
    pub fn new(
        username: impl Into<String>,
        capacity: usize,
    ) -> Result<(Self, mpsc::Receiver<Frame>), HubError> {
        let username = username.into();
        if username.is_empty() {
            return Err(HubError::EmptyUsername);
        }
        if capacity == 0 {
            return Err(HubError::InvalidCapacity(capacity));
        }

        let (queue, rx) = mpsc::channel(capacity);
        let session = Self {
            id: SessionId::new(),
            username,
            connected_at: Utc::now(),
            queue,
        };

        Ok((session, rx))
    }

    /// Non-blocking enqueue of a frame
    pub(super) fn try_send(&self, frame: Frame) -> Result<(), mpsc::error::TrySendError<Frame>> {
        self.queue.try_send(frame)
    }
}

/// Events processed by the hub loop, one at a time
#[derive(Debug)]
pub enum HubEvent {
    Register(ClientSession),
    Unregister(SessionId),
    Broadcast(ChatMessage),
    Stats(oneshot::Sender<HubStats>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_username_rejected() {
        let result = ClientSession::new("", 4);
        assert!(matches!(result, Err(HubError::EmptyUsername)));
    }

    #[tokio::test]
    async fn test_dropping_session_closes_queue() {
        let (session, mut rx) = ClientSession::new("alice", 4).unwrap();
        session.try_send(Frame::from("hello")).unwrap();
        drop(session);

        assert_eq!(rx.recv().await.unwrap().as_str(), "hello");
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let result = ClientSession::new("alice", 0);
        assert!(matches!(result, Err(HubError::InvalidCapacity(0))));
    }

    #[test]
    fn test_session_ids_unique() {
        assert_ne!(SessionId::new(), SessionId::new());
    }
}
