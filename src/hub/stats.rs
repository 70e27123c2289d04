//! Hub statistics

use serde::Serialize;

/// Snapshot of the hub registry and its counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HubStats {
    /// Sessions currently registered
    pub sessions: usize,
    /// Distinct usernames among registered sessions
    pub unique_users: usize,
    /// Messages broadcast since start
    pub broadcasts: u64,
    /// Frames enqueued to session queues since start
    pub frames_delivered: u64,
    /// Sessions removed during broadcast because their queue was full or closed
    pub evictions: u64,
}
