//! Chat message persistence.
//!
//! This module provides:
//! - `MessageStore`: the storage contract the chat service depends on
//! - `MemoryMessageStore`: in-process implementation (default, tests)
//! - `PostgresMessageStore`: durable implementation on sqlx
//! - `create_message_store`: backend selection from settings

mod backend;
mod factory;
mod memory_backend;
mod postgres_backend;

pub use backend::{MessageStore, StoreError};
pub use factory::create_message_store;
pub use memory_backend::MemoryMessageStore;
pub use postgres_backend::PostgresMessageStore;
