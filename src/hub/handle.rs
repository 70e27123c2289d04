use tokio::sync::{mpsc, oneshot};

use crate::chat::ChatMessage;

use super::stats::HubStats;
use super::types::{ClientSession, HubError, HubEvent, SessionId};

/// Cloneable client side of the hub.
///
/// Every call is a message to the hub loop. Calls wait only for mailbox
/// space, not for the event to be processed, except [`HubHandle::stats`]
/// which waits for the reply.
#[derive(Clone)]
pub struct HubHandle {
    events: mpsc::Sender<HubEvent>,
}

impl HubHandle {
    pub(super) fn new(events: mpsc::Sender<HubEvent>) -> Self {
        Self { events }
    }

    pub async fn register(&self, session: ClientSession) -> Result<(), HubError> {
        self.send(HubEvent::Register(session)).await
    }

    /// Remove a session and close its outbound queue. Safe to call more than once.
    pub async fn unregister(&self, id: SessionId) -> Result<(), HubError> {
        self.send(HubEvent::Unregister(id)).await
    }

    /// Fan a persisted message out to every registered session
    pub async fn broadcast(&self, message: ChatMessage) -> Result<(), HubError> {
        self.send(HubEvent::Broadcast(message)).await
    }

    pub async fn stats(&self) -> Result<HubStats, HubError> {
        let (reply, rx) = oneshot::channel();
        self.send(HubEvent::Stats(reply)).await?;
        rx.await.map_err(|_| HubError::Closed)
    }

    /// Whether the hub loop is still accepting events
    pub fn is_running(&self) -> bool {
        !self.events.is_closed()
    }

    async fn send(&self, event: HubEvent) -> Result<(), HubError> {
        self.events.send(event).await.map_err(|_| HubError::Closed)
    }
}
