//! Cross-component integration tests
//!
//! These tests wire the hub, the chat service, a message store and the
//! expiry sweeper together the way the server does, without opening sockets.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, mpsc};
use tokio::time::timeout;
use tokio_test::{assert_err, assert_ok};

use ara_chat_service::chat::{ChatError, ChatMessage, ChatService, MessageId, NewChatMessage};
use ara_chat_service::config::WebSocketConfig;
use ara_chat_service::hub::{ClientSession, Frame, Hub, HubHandle};
use ara_chat_service::store::{MemoryMessageStore, MessageStore, StoreError};
use ara_chat_service::tasks::ExpirySweeper;

struct TestEnvironment {
    hub: HubHandle,
    chat: Arc<ChatService>,
    store: Arc<MemoryMessageStore>,
    shutdown: broadcast::Sender<()>,
}

fn create_test_environment(lifetime: Duration) -> TestEnvironment {
    let store = Arc::new(MemoryMessageStore::new());
    let chat = Arc::new(ChatService::new(store.clone(), lifetime).unwrap());

    let (shutdown, shutdown_rx) = broadcast::channel(1);
    let (hub, handle) = Hub::new(&WebSocketConfig::default(), shutdown_rx).unwrap();
    tokio::spawn(hub.run());

    TestEnvironment {
        hub: handle,
        chat,
        store,
        shutdown,
    }
}

fn connect(username: &str, capacity: usize) -> (ClientSession, mpsc::Receiver<Frame>) {
    ClientSession::new(username, capacity).unwrap()
}

/// What a read pump does with one inbound text frame
async fn send_text(env: &TestEnvironment, username: &str, text: &str) -> Result<ChatMessage, ChatError> {
    let message = env.chat.process_message(username, text).await?;
    env.hub.broadcast(message.clone()).await.unwrap();
    Ok(message)
}

async fn recv_message(rx: &mut mpsc::Receiver<Frame>) -> ChatMessage {
    let frame = timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("frame should arrive")
        .expect("queue should be open");
    serde_json::from_str(frame.as_str()).unwrap()
}

/// Round trip through the hub mailbox so earlier events are processed
async fn settle(hub: &HubHandle) {
    hub.stats().await.unwrap();
}

mod fan_out_tests {
    use super::*;

    #[tokio::test]
    async fn test_alice_and_bob_then_bob_leaves() {
        let env = create_test_environment(Duration::from_secs(60));

        let (alice, mut alice_rx) = connect("alice", 8);
        let (bob, mut bob_rx) = connect("bob", 8);
        let bob_id = bob.id;
        env.hub.register(alice).await.unwrap();
        env.hub.register(bob).await.unwrap();

        let hi = send_text(&env, "alice", "hi").await.unwrap();

        assert_eq!(recv_message(&mut alice_rx).await, hi);
        assert_eq!(recv_message(&mut bob_rx).await, hi);

        env.hub.unregister(bob_id).await.unwrap();
        let bye = send_text(&env, "alice", "bye").await.unwrap();

        assert_eq!(recv_message(&mut alice_rx).await, bye);
        assert!(bob_rx.recv().await.is_none());

        let history = env.chat.recent_messages(50).await.unwrap();
        let texts: Vec<&str> = history.iter().map(|m| m.message.as_str()).collect();
        assert_eq!(texts, vec!["bye", "hi"]);
    }

    #[tokio::test]
    async fn test_frames_arrive_in_broadcast_order_without_duplicates() {
        let env = create_test_environment(Duration::from_secs(60));
        let (carol, mut carol_rx) = connect("carol", 32);
        env.hub.register(carol).await.unwrap();

        let mut sent = Vec::new();
        for i in 0..10 {
            sent.push(send_text(&env, "dave", &format!("msg {i}")).await.unwrap());
        }

        for expected in &sent {
            assert_eq!(&recv_message(&mut carol_rx).await, expected);
        }
        settle(&env.hub).await;
        assert!(carol_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_session_registered_late_sees_only_later_messages() {
        let env = create_test_environment(Duration::from_secs(60));

        send_text(&env, "alice", "before").await.unwrap();

        let (late, mut late_rx) = connect("late", 8);
        env.hub.register(late).await.unwrap();
        let after = send_text(&env, "alice", "after").await.unwrap();

        assert_eq!(recv_message(&mut late_rx).await, after);
        settle(&env.hub).await;
        assert!(late_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_slow_session_evicted_others_unaffected() {
        let env = create_test_environment(Duration::from_secs(60));

        let (slow, mut slow_rx) = connect("slow", 2);
        let (fast, mut fast_rx) = connect("fast", 16);
        env.hub.register(slow).await.unwrap();
        env.hub.register(fast).await.unwrap();

        let mut sent = Vec::new();
        for i in 0..5 {
            sent.push(send_text(&env, "fast", &format!("burst {i}")).await.unwrap());
        }

        let stats = env.hub.stats().await.unwrap();
        assert_eq!(stats.sessions, 1);
        assert_eq!(stats.evictions, 1);

        // The evicted session keeps its buffered frames and nothing after
        assert_eq!(recv_message(&mut slow_rx).await, sent[0]);
        assert_eq!(recv_message(&mut slow_rx).await, sent[1]);
        assert!(slow_rx.recv().await.is_none());

        for expected in &sent {
            assert_eq!(&recv_message(&mut fast_rx).await, expected);
        }
    }

    #[tokio::test]
    async fn test_hub_shutdown_closes_every_queue() {
        let env = create_test_environment(Duration::from_secs(60));
        let (a, mut a_rx) = connect("a", 4);
        let (b, mut b_rx) = connect("b", 4);
        env.hub.register(a).await.unwrap();
        env.hub.register(b).await.unwrap();
        settle(&env.hub).await;

        env.shutdown.send(()).unwrap();

        assert!(a_rx.recv().await.is_none());
        assert!(b_rx.recv().await.is_none());
        assert_err!(env.hub.broadcast(sample_message()).await);
    }

    fn sample_message() -> ChatMessage {
        NewChatMessage::new("x", "y", Utc::now(), chrono::Duration::seconds(60))
            .into_persisted(MessageId::new(uuid::Uuid::new_v4()))
    }
}

mod persistence_failure_tests {
    use super::*;

    /// Store whose writes always fail
    struct FailingStore;

    #[async_trait]
    impl MessageStore for FailingStore {
        fn backend_name(&self) -> &'static str {
            "failing"
        }

        async fn save(&self, _message: NewChatMessage) -> Result<MessageId, StoreError> {
            Err(StoreError::Unavailable("disk full".to_string()))
        }

        async fn find_recent(
            &self,
            _limit: usize,
            _now: DateTime<Utc>,
        ) -> Result<Vec<ChatMessage>, StoreError> {
            Err(StoreError::Unavailable("disk full".to_string()))
        }

        async fn delete_expired(&self, _now: DateTime<Utc>) -> Result<u64, StoreError> {
            Err(StoreError::Unavailable("disk full".to_string()))
        }
    }

    #[tokio::test]
    async fn test_failed_save_surfaces_as_persistence_error() {
        let chat = ChatService::new(Arc::new(FailingStore), Duration::from_secs(60)).unwrap();

        let result = chat.process_message("alice", "lost").await;
        assert!(matches!(result, Err(ChatError::Persistence(_))));
    }

    #[tokio::test]
    async fn test_query_failures_surface_as_query_errors() {
        let chat = ChatService::new(Arc::new(FailingStore), Duration::from_secs(60)).unwrap();

        assert!(matches!(chat.recent_messages(10).await, Err(ChatError::Query(_))));
        assert!(matches!(
            chat.cleanup_expired_messages().await,
            Err(ChatError::Query(_))
        ));
    }
}

mod expiry_tests {
    use super::*;
    use chrono::SubsecRound;

    #[tokio::test]
    async fn test_sweeper_empties_history_after_lifetime() {
        let env = create_test_environment(Duration::from_secs(1));
        let sweeper =
            ExpirySweeper::new(env.chat.clone(), Duration::from_secs(1), env.shutdown.subscribe())
                .unwrap();
        let sweeper_task = tokio::spawn(sweeper.run());

        let message = assert_ok!(env.chat.process_message("alice", "fleeting").await);
        assert_eq!(message.expires_at - message.created_at, chrono::Duration::seconds(1));
        assert_eq!(env.chat.recent_messages(50).await.unwrap().len(), 1);

        tokio::time::sleep(Duration::from_millis(2500)).await;

        assert!(env.chat.recent_messages(50).await.unwrap().is_empty());
        assert!(env.store.is_empty().await);

        env.shutdown.send(()).unwrap();
        assert_ok!(timeout(Duration::from_secs(1), sweeper_task).await);
    }

    #[tokio::test]
    async fn test_delete_expired_is_exact_and_idempotent() {
        let store = MemoryMessageStore::new();
        let now = Utc::now();
        let lifetime = chrono::Duration::seconds(10);

        // Expires exactly at `now`, before it, and after it
        store
            .save(NewChatMessage::new("a", "at", now - lifetime, lifetime))
            .await
            .unwrap();
        store
            .save(NewChatMessage::new("a", "before", now - lifetime * 2, lifetime))
            .await
            .unwrap();
        store
            .save(NewChatMessage::new("a", "after", now, lifetime))
            .await
            .unwrap();

        let boundary = (now - lifetime).trunc_subsecs(6) + lifetime;
        assert_eq!(store.delete_expired(boundary).await.unwrap(), 2);
        assert_eq!(store.delete_expired(boundary).await.unwrap(), 0);

        let left = store.find_recent(10, boundary).await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].message, "after");
    }
}
