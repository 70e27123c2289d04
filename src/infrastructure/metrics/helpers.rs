//! Metrics helper structs for convenient metric recording

use prometheus::{Encoder, TextEncoder};

use super::{
    BROADCASTS_TOTAL, FRAMES_DELIVERED_TOTAL, MESSAGES_DROPPED_TOTAL, MESSAGES_EXPIRED_TOTAL,
    MESSAGES_PERSISTED_TOTAL, MESSAGES_RECEIVED_TOTAL, SESSIONS_ACTIVE, SESSIONS_CLOSED_TOTAL,
    SESSIONS_EVICTED_TOTAL, SESSIONS_OPENED_TOTAL, SESSION_DURATION, SWEEPS_TOTAL,
};

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

/// Helper struct for recording session lifecycle metrics
pub struct SessionMetrics;

impl SessionMetrics {
    pub fn record_opened() {
        SESSIONS_OPENED_TOTAL.inc();
    }

    pub fn record_closed(duration_secs: f64) {
        SESSIONS_CLOSED_TOTAL.inc();
        SESSION_DURATION.observe(duration_secs);
    }

    pub fn record_evicted() {
        SESSIONS_EVICTED_TOTAL.inc();
    }

    /// Set the number of sessions in the hub registry
    pub fn set_active(count: usize) {
        SESSIONS_ACTIVE.set(count as i64);
    }
}

/// Helper struct for recording message flow metrics
pub struct MessageMetrics;

impl MessageMetrics {
    pub fn record_received() {
        MESSAGES_RECEIVED_TOTAL.inc();
    }

    pub fn record_persisted() {
        MESSAGES_PERSISTED_TOTAL.inc();
    }

    pub fn record_dropped() {
        MESSAGES_DROPPED_TOTAL.inc();
    }

    pub fn record_broadcast(delivered: u64) {
        BROADCASTS_TOTAL.inc();
        FRAMES_DELIVERED_TOTAL.inc_by(delivered);
    }
}

/// Helper struct for recording expiry sweeper metrics
pub struct SweepMetrics;

impl SweepMetrics {
    pub fn record_success(expired: u64) {
        SWEEPS_TOTAL.with_label_values(&["success"]).inc();
        MESSAGES_EXPIRED_TOTAL.inc_by(expired);
    }

    pub fn record_failure() {
        SWEEPS_TOTAL.with_label_values(&["failure"]).inc();
    }
}
