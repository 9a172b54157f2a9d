//! Metrics for the send pipeline and the push channel
//!
//! Recorded through the `metrics` facade; nothing is exported unless the
//! embedding application installs a recorder.
//!
//! # Metrics
//!
//! - `inbox_sends_total`: Counter of sends started, by kind (`text`, `media`)
//! - `inbox_send_duration_seconds`: Histogram of time from send to outcome
//! - `inbox_send_outcomes_total`: Counter of send outcomes (`sent`, `failed`, `timeout`, `cancelled`)
//! - `inbox_sends_in_flight`: Gauge of sends awaiting the backend
//! - `inbox_push_events_total`: Counter of applied push events, by event name
//! - `inbox_push_events_dropped_total`: Counter of dropped push frames, by reason
//! - `inbox_push_reconnects_total`: Counter of push channel reconnects, by transport
//!
//! # Examples
//!
//! ```
//! use wa_inbox::metrics::SendMetrics;
//!
//! let metrics = SendMetrics::new("text");
//! metrics.record_outcome("sent");
//! ```

use ::metrics::{decrement_gauge, histogram, increment_counter, increment_gauge};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Metrics for a single send, from the optimistic append to the outcome
///
/// Records exactly once; later calls are ignored, and dropping an unrecorded
/// tracker still releases the in-flight gauge.
#[derive(Debug)]
pub struct SendMetrics {
    kind: &'static str,
    start: Instant,
    recorded: AtomicBool,
}

impl SendMetrics {
    pub fn new(kind: &'static str) -> Self {
        increment_counter!("inbox_sends_total", "kind" => kind);
        increment_gauge!("inbox_sends_in_flight", 1.0, "kind" => kind);

        Self {
            kind,
            start: Instant::now(),
            recorded: AtomicBool::new(false),
        }
    }

    /// Record how the send ended.
    pub fn record_outcome(&self, outcome: &str) {
        if self.recorded.swap(true, Ordering::SeqCst) {
            return;
        }

        histogram!(
            "inbox_send_duration_seconds",
            self.start.elapsed().as_secs_f64(),
            "kind" => self.kind,
            "outcome" => outcome.to_string()
        );
        increment_counter!(
            "inbox_send_outcomes_total",
            "kind" => self.kind,
            "outcome" => outcome.to_string()
        );
        decrement_gauge!("inbox_sends_in_flight", 1.0, "kind" => self.kind);
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn is_recorded(&self) -> bool {
        self.recorded.load(Ordering::SeqCst)
    }
}

impl Drop for SendMetrics {
    fn drop(&mut self) {
        if !self.is_recorded() {
            decrement_gauge!("inbox_sends_in_flight", 1.0, "kind" => self.kind);
        }
    }
}

/// Count a push event that was applied to the store.
pub fn record_push_event(event: &'static str) {
    increment_counter!("inbox_push_events_total", "event" => event);
}

/// Count a push frame that was dropped before reaching the store.
pub fn record_dropped_event(reason: &'static str) {
    increment_counter!("inbox_push_events_dropped_total", "reason" => reason);
}

/// Count a push channel reconnect.
pub fn record_reconnect(transport: &'static str) {
    increment_counter!("inbox_push_reconnects_total", "transport" => transport);
}
