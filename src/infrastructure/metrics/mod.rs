//! Prometheus metrics for the chat service.
//!
//! - Session metrics (opened, closed, evicted, active, duration)
//! - Message metrics (received, persisted, dropped, broadcast, delivered)
//! - Sweeper metrics (runs by result, messages expired)

mod helpers;

pub use helpers::{encode_metrics, MessageMetrics, SessionMetrics, SweepMetrics};

use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "ara_chat";

lazy_static! {
    // ============================================================================
    // Session Metrics
    // ============================================================================

    /// Sessions currently registered with the hub
    pub static ref SESSIONS_ACTIVE: IntGauge = register_int_gauge!(
        format!("{}_sessions_active", METRIC_PREFIX),
        "Number of sessions currently registered with the hub"
    ).unwrap();

    pub static ref SESSIONS_OPENED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_sessions_opened_total", METRIC_PREFIX),
        "Total WebSocket sessions opened"
    ).unwrap();

    pub static ref SESSIONS_CLOSED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_sessions_closed_total", METRIC_PREFIX),
        "Total WebSocket sessions closed"
    ).unwrap();

    /// Sessions removed because their outbound queue was full or closed
    pub static ref SESSIONS_EVICTED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_sessions_evicted_total", METRIC_PREFIX),
        "Total sessions evicted during broadcast"
    ).unwrap();

    pub static ref SESSION_DURATION: Histogram = register_histogram!(
        format!("{}_session_duration_seconds", METRIC_PREFIX),
        "WebSocket session duration in seconds",
        vec![1.0, 10.0, 60.0, 300.0, 1800.0, 3600.0, 14400.0]
    ).unwrap();

    // ============================================================================
    // Message Metrics
    // ============================================================================

    pub static ref MESSAGES_RECEIVED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_messages_received_total", METRIC_PREFIX),
        "Total inbound chat frames received"
    ).unwrap();

    pub static ref MESSAGES_PERSISTED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_messages_persisted_total", METRIC_PREFIX),
        "Total chat messages persisted"
    ).unwrap();

    /// Inbound messages dropped because persistence failed
    pub static ref MESSAGES_DROPPED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_messages_dropped_total", METRIC_PREFIX),
        "Total inbound messages dropped after a persistence failure"
    ).unwrap();

    pub static ref BROADCASTS_TOTAL: IntCounter = register_int_counter!(
        format!("{}_broadcasts_total", METRIC_PREFIX),
        "Total messages broadcast by the hub"
    ).unwrap();

    pub static ref FRAMES_DELIVERED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_frames_delivered_total", METRIC_PREFIX),
        "Total frames enqueued to session outbound queues"
    ).unwrap();

    // ============================================================================
    // Sweeper Metrics
    // ============================================================================

    pub static ref SWEEPS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_sweeps_total", METRIC_PREFIX),
        "Total expiry sweeps by result",
        &["result"]
    ).unwrap();

    pub static ref MESSAGES_EXPIRED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_messages_expired_total", METRIC_PREFIX),
        "Total expired messages deleted by the sweeper"
    ).unwrap();
}
