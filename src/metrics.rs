//! Metric helpers for `sreeify`.
//!
//! This module defines metric names and simple helper functions
//! wrapping the [`metrics`](https://docs.rs/metrics) crate. Without the
//! `metrics` feature every helper compiles to a no-op.

use std::time::Duration;

/// Name of the gauge tracking requests awaiting a response.
pub const REQUESTS_IN_FLIGHT: &str = "sreeify_requests_in_flight";
/// Name of the counter tracking payload chunks sent and received.
pub const CHUNKS_TOTAL: &str = "sreeify_chunks_total";
/// Name of the counter tracking error occurrences.
pub const ERRORS_TOTAL: &str = "sreeify_errors_total";
/// Name of the histogram of keepalive round trips, in seconds.
pub const PING_RTT_SECONDS: &str = "sreeify_ping_rtt_seconds";

/// Direction of a payload chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Chunks read from the transform service.
    Inbound,
    /// Chunks written to the transform service.
    Outbound,
}

impl Direction {
    /// Label value used for the `direction` label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Inbound => "inbound",
            Direction::Outbound => "outbound",
        }
    }
}

/// Increment the in-flight requests gauge.
pub fn inc_in_flight() {
    #[cfg(feature = "metrics")]
    metrics::gauge!(REQUESTS_IN_FLIGHT).increment(1.0);
}

/// Decrement the in-flight requests gauge.
pub fn dec_in_flight() {
    #[cfg(feature = "metrics")]
    metrics::gauge!(REQUESTS_IN_FLIGHT).decrement(1.0);
}

/// Record a payload chunk for the given direction.
pub fn inc_chunks(direction: Direction) {
    #[cfg(feature = "metrics")]
    metrics::counter!(CHUNKS_TOTAL, "direction" => direction.as_str()).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = direction;
}

/// Record an error occurrence.
pub fn inc_errors() {
    #[cfg(feature = "metrics")]
    metrics::counter!(ERRORS_TOTAL).increment(1);
}

/// Record a keepalive round trip.
pub fn record_ping_rtt(rtt: Duration) {
    #[cfg(feature = "metrics")]
    metrics::histogram!(PING_RTT_SECONDS).record(rtt.as_secs_f64());
    #[cfg(not(feature = "metrics"))]
    let _ = rtt;
}
