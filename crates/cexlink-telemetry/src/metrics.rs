//! Prometheus metrics for the cexlink connector.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()`. A failure means duplicate metric
//! names, which is a startup configuration error. These panics only occur
//! during static initialization, never at runtime.

use crate::error::{TelemetryError, TelemetryResult};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_gauge, register_gauge_vec, register_int_gauge, CounterVec,
    Encoder, Gauge, GaugeVec, IntGauge, TextEncoder,
};

/// Session states exported on `cexlink_stream_state`.
const STREAM_STATES: [&str; 5] = ["disconnected", "connecting", "open", "closed", "errored"];

/// Stream connection state (1 = open, 0 = not open).
pub static STREAM_CONNECTED: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!(
        "cexlink_stream_connected",
        "Streaming connection state (1=open)"
    )
    .unwrap()
});

/// Stream session state machine.
/// Labels: state (disconnected/connecting/open/closed/errored)
pub static STREAM_STATE: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "cexlink_stream_state",
        "Streaming session current state (1=active, 0=inactive)",
        &["state"]
    )
    .unwrap()
});

/// Total reconnection attempts.
pub static STREAM_RECONNECT_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "cexlink_stream_reconnect_total",
        "Total streaming reconnection attempts",
        &["reason"]
    )
    .unwrap()
});

/// Inbound stream messages by kind.
/// Labels: kind (bookTicker/aggTrade/control/invalid)
pub static STREAM_MESSAGES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "cexlink_stream_messages_total",
        "Total inbound streaming messages by kind",
        &["kind"]
    )
    .unwrap()
});

/// Tracked instrument/channel pairs.
pub static ACTIVE_SUBSCRIPTIONS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "cexlink_active_subscriptions",
        "Number of tracked instrument/channel subscriptions"
    )
    .unwrap()
});

/// REST requests by endpoint and outcome.
/// Labels: endpoint, outcome (ok/api_error/network_error/decode_error)
pub static REST_REQUESTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "cexlink_rest_requests_total",
        "Total REST requests by endpoint and outcome",
        &["endpoint", "outcome"]
    )
    .unwrap()
});

/// Metrics facade for easy access.
pub struct Metrics;

impl Metrics {
    /// Record stream opened.
    pub fn stream_connected() {
        STREAM_CONNECTED.set(1.0);
    }

    /// Record stream dropped.
    pub fn stream_disconnected() {
        STREAM_CONNECTED.set(0.0);
    }

    /// Set the active session state. All other states are reset to 0.
    pub fn stream_state_set(state: &str) {
        for s in STREAM_STATES {
            STREAM_STATE.with_label_values(&[s]).set(0.0);
        }
        STREAM_STATE.with_label_values(&[state]).set(1.0);
    }

    pub fn stream_reconnect(reason: &str) {
        STREAM_RECONNECT_TOTAL.with_label_values(&[reason]).inc();
    }

    pub fn stream_message(kind: &str) {
        STREAM_MESSAGES_TOTAL.with_label_values(&[kind]).inc();
    }

    pub fn subscriptions_set(count: usize) {
        ACTIVE_SUBSCRIPTIONS.set(i64::try_from(count).unwrap_or(i64::MAX));
    }

    pub fn rest_request(endpoint: &str, outcome: &str) {
        REST_REQUESTS_TOTAL
            .with_label_values(&[endpoint, outcome])
            .inc();
    }

    /// Render all registered metrics in the Prometheus text format.
    pub fn render() -> TelemetryResult<String> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&prometheus::gather(), &mut buffer)
            .map_err(|e| TelemetryError::Metrics(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| TelemetryError::Metrics(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_gauge_is_exclusive() {
        Metrics::stream_state_set("connecting");
        Metrics::stream_state_set("open");

        assert_eq!(STREAM_STATE.with_label_values(&["open"]).get(), 1.0);
        assert_eq!(STREAM_STATE.with_label_values(&["connecting"]).get(), 0.0);
    }

    #[test]
    fn test_render_contains_recorded_metrics() {
        Metrics::rest_request("/api/v3/order", "ok");
        Metrics::subscriptions_set(3);

        let text = Metrics::render().unwrap();
        assert!(text.contains("cexlink_rest_requests_total"));
        assert!(text.contains("cexlink_active_subscriptions"));
    }
}
