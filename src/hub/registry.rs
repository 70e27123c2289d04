use std::collections::{HashMap, HashSet};

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{broadcast, mpsc};

use crate::chat::ChatMessage;
use crate::config::WebSocketConfig;
use crate::metrics::{MessageMetrics, SessionMetrics};

use super::handle::HubHandle;
use super::stats::HubStats;
use super::types::{ClientSession, Frame, HubError, HubEvent, SessionId};

/// The connection hub: sole owner of the session registry.
///
/// Every registration, deregistration and broadcast is an event on one
/// mailbox, handled to completion before the next is taken. Nothing else
/// ever touches `sessions`, so no lock is involved.
///
/// The loop never awaits on a session: frames are pushed with `try_send`
/// and a session whose queue is full is evicted on the spot.
pub struct Hub {
    sessions: HashMap<SessionId, ClientSession>,
    events: mpsc::Receiver<HubEvent>,
    shutdown: broadcast::Receiver<()>,
    broadcasts: u64,
    frames_delivered: u64,
    evictions: u64,
}

impl Hub {
    /// Create the hub and the handle used to talk to it.
    ///
    /// The hub does nothing until [`Hub::run`] is spawned.
    pub fn new(
        config: &WebSocketConfig,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(Self, HubHandle), HubError> {
        if config.hub_queue_size == 0 {
            return Err(HubError::InvalidCapacity(config.hub_queue_size));
        }
        let (tx, events) = mpsc::channel(config.hub_queue_size);

        let hub = Self {
            sessions: HashMap::new(),
            events,
            shutdown,
            broadcasts: 0,
            frames_delivered: 0,
            evictions: 0,
        };

        Ok((hub, HubHandle::new(tx)))
    }

    /// Run the event loop until shutdown is signalled or every handle is dropped.
    ///
    /// A dropped shutdown sender is not a shutdown signal; the hub keeps
    /// serving until its handles are gone.
    ///
    /// On exit every remaining session is dropped, closing its outbound queue.
    pub async fn run(mut self) {
        tracing::info!("Hub started");
        let mut watch_shutdown = true;

        loop {
            tokio::select! {
                signal = self.shutdown.recv(), if watch_shutdown => {
                    match signal {
                        Ok(()) => {
                            tracing::info!("Hub received shutdown signal");
                            break;
                        }
                        // Missed signals still mean one was sent
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::info!(skipped = skipped, "Hub received shutdown signal (lagged)");
                            break;
                        }
                        Err(RecvError::Closed) => {
                            tracing::debug!("Shutdown sender dropped, hub keeps running");
                            watch_shutdown = false;
                        }
                    }
                }
                event = self.events.recv() => {
                    match event {
                        Some(event) => self.handle_event(event),
                        None => {
                            tracing::info!("All hub handles dropped");
                            break;
                        }
                    }
                }
            }
        }

        let remaining = self.sessions.len();
        self.sessions.clear();
        SessionMetrics::set_active(0);

        tracing::info!(closed_sessions = remaining, "Hub stopped");
    }

    fn handle_event(&mut self, event: HubEvent) {
        match event {
            HubEvent::Register(session) => self.register(session),
            HubEvent::Unregister(id) => self.unregister(id),
            HubEvent::Broadcast(message) => self.broadcast(&message),
            HubEvent::Stats(reply) => {
                let _ = reply.send(self.stats());
            }
        }
    }

    fn register(&mut self, session: ClientSession) {
        let id = session.id;
        if self.sessions.contains_key(&id) {
            tracing::debug!(session_id = %id, "Session already registered");
            return;
        }

        tracing::info!(session_id = %id, username = %session.username, "Session registered");
        self.sessions.insert(id, session);
        SessionMetrics::set_active(self.sessions.len());
    }

    /// Remove a session and close its queue. Unknown ids are ignored, so
    /// both pumps may unregister the same session.
    fn unregister(&mut self, id: SessionId) {
        if let Some(session) = self.sessions.remove(&id) {
            tracing::info!(session_id = %id, username = %session.username, "Session unregistered");
            SessionMetrics::set_active(self.sessions.len());
        }
    }

    fn broadcast(&mut self, message: &ChatMessage) {
        let frame: Frame = match serde_json::to_string(message) {
            Ok(json) => json.into(),
            Err(e) => {
                tracing::error!(message_id = %message.id, error = %e, "Failed to serialize message");
                return;
            }
        };

        let mut delivered = 0u64;
        let mut evicted = Vec::new();

        for (id, session) in &self.sessions {
            match session.try_send(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(
                        session_id = %id,
                        username = %session.username,
                        "Outbound queue full, evicting slow session"
                    );
                    evicted.push(*id);
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::debug!(session_id = %id, "Outbound queue closed, removing session");
                    evicted.push(*id);
                }
            }
        }

        for id in &evicted {
            self.sessions.remove(id);
            SessionMetrics::record_evicted();
        }
        if !evicted.is_empty() {
            SessionMetrics::set_active(self.sessions.len());
        }

        self.broadcasts += 1;
        self.frames_delivered += delivered;
        self.evictions += evicted.len() as u64;
        MessageMetrics::record_broadcast(delivered);

        tracing::debug!(
            message_id = %message.id,
            delivered = delivered,
            evicted = evicted.len(),
            "Broadcast completed"
        );
    }

    fn stats(&self) -> HubStats {
        let unique_users: HashSet<&str> =
            self.sessions.values().map(|s| s.username.as_str()).collect();

        HubStats {
            sessions: self.sessions.len(),
            unique_users: unique_users.len(),
            broadcasts: self.broadcasts,
            frames_delivered: self.frames_delivered,
            evictions: self.evictions,
        }
    }
}
