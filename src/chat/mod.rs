//! Chat message lifecycle: creation, history and expiry.

mod model;
mod service;

pub use model::{ChatMessage, MessageId, NewChatMessage};
pub use service::{ChatError, ChatService};
