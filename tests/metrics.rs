#![cfg(feature = "metrics")]
//! Tests for `sreeify` metrics helpers.
//!
//! These tests verify that counters, gauges and histograms update as
//! expected using `metrics_util::debugging::DebuggingRecorder`.
use std::time::Duration;

use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};
use rstest::rstest;
use sreeify::metrics::{self as sreeify_metrics, Direction};

/// Creates a debugging recorder and snapshotter for metrics testing.
fn debugging_recorder_setup() -> (Snapshotter, DebuggingRecorder) {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    (snapshotter, recorder)
}

#[rstest]
#[case(Direction::Inbound)]
#[case(Direction::Outbound)]
fn chunk_metric_is_labelled_by_direction(#[case] direction: Direction) {
    let (snapshotter, recorder) = debugging_recorder_setup();
    metrics::with_local_recorder(&recorder, || {
        sreeify_metrics::inc_chunks(direction);
    });

    let metrics = snapshotter.snapshot().into_vec();
    let found = metrics.iter().any(|(k, _, _, v)| {
        k.key().name() == sreeify_metrics::CHUNKS_TOTAL
            && k.key()
                .labels()
                .any(|l| l.key() == "direction" && l.value() == direction.as_str())
            && matches!(v, DebugValue::Counter(c) if *c > 0)
    });
    assert!(found, "{direction:?} chunk metric not recorded");
}

#[test]
fn error_metric_increments() {
    let (snapshotter, recorder) = debugging_recorder_setup();
    metrics::with_local_recorder(&recorder, || {
        sreeify_metrics::inc_errors();
        sreeify_metrics::inc_errors();
    });

    let metrics = snapshotter.snapshot().into_vec();
    let found = metrics.iter().any(|(k, _, _, v)| {
        k.key().name() == sreeify_metrics::ERRORS_TOTAL
            && matches!(v, DebugValue::Counter(c) if *c == 2)
    });
    assert!(found, "error metric not recorded");
}

#[test]
fn in_flight_gauge_tracks_requests() {
    let (snapshotter, recorder) = debugging_recorder_setup();
    metrics::with_local_recorder(&recorder, || {
        sreeify_metrics::inc_in_flight();
        sreeify_metrics::inc_in_flight();
        sreeify_metrics::dec_in_flight();
    });

    let metrics = snapshotter.snapshot().into_vec();
    let found = metrics.iter().any(|(k, _, _, v)| {
        k.key().name() == sreeify_metrics::REQUESTS_IN_FLIGHT
            && matches!(v, DebugValue::Gauge(g) if (g.into_inner() - 1.0).abs() < f64::EPSILON)
    });
    assert!(found, "in-flight gauge not recorded");
}

#[test]
fn ping_round_trip_is_recorded_in_seconds() {
    let (snapshotter, recorder) = debugging_recorder_setup();
    metrics::with_local_recorder(&recorder, || {
        sreeify_metrics::record_ping_rtt(Duration::from_millis(250));
    });

    let metrics = snapshotter.snapshot().into_vec();
    let found = metrics.iter().any(|(k, _, _, v)| {
        k.key().name() == sreeify_metrics::PING_RTT_SECONDS
            && matches!(v, DebugValue::Histogram(samples)
                if samples.iter().any(|s| (s.into_inner() - 0.25).abs() < 1e-9))
    });
    assert!(found, "ping histogram not recorded");
}
