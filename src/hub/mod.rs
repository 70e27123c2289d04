//! Connection hub for WebSocket sessions
//!
//! This module provides:
//! - The hub event loop, sole owner of the session registry
//! - A cloneable handle for register / unregister / broadcast / stats
//! - Session and outbound frame types

mod handle;
mod registry;
mod stats;
mod types;

pub use handle::HubHandle;
pub use registry::Hub;
pub use stats::HubStats;
pub use types::{ClientSession, Frame, HubError, HubEvent, SessionId};
