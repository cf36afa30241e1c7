//! Keepalive pings and round-trip tracking.

use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use tokio::{
    sync::mpsc::{self, error::TrySendError},
    time::{Instant, MissedTickBehavior, interval_at},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    frame::{Ping, Sreequest},
    metrics,
};

const NO_SAMPLE: u64 = u64::MAX;

/// Latest keepalive round trip observed on any connection of a client.
#[derive(Debug)]
pub struct LatencyTracker {
    last_micros: AtomicU64,
}

impl Default for LatencyTracker {
    fn default() -> Self {
        Self {
            last_micros: AtomicU64::new(NO_SAMPLE),
        }
    }
}

impl LatencyTracker {
    /// Create a tracker with no sample.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Store `rtt` as the latest sample.
    pub fn record(&self, rtt: Duration) {
        let micros = u64::try_from(rtt.as_micros()).unwrap_or(NO_SAMPLE - 1);
        self.last_micros.store(micros.min(NO_SAMPLE - 1), Ordering::Relaxed);
        info!(rtt_us = micros, "keepalive round trip");
        metrics::record_ping_rtt(rtt);
    }

    /// Latest recorded round trip, if any echo has arrived.
    #[must_use]
    pub fn last_round_trip(&self) -> Option<Duration> {
        match self.last_micros.load(Ordering::Relaxed) {
            NO_SAMPLE => None,
            micros => Some(Duration::from_micros(micros)),
        }
    }
}

/// Enqueue a timestamped ping every `period` until `shutdown` fires.
///
/// The first ping goes out one full period after the task starts. Pings
/// never wait for queue space: a full queue drops the ping with a warning.
pub(crate) async fn run_keepalive(
    outbound: mpsc::Sender<Sreequest>,
    period: Duration,
    shutdown: CancellationToken,
) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            biased;
            () = shutdown.cancelled() => break,
            _ = ticker.tick() => {}
        }
        let ping = Ping::now();
        match outbound.try_send(Sreequest::Ping(ping)) {
            Ok(()) => debug!(time = ping.time, "keepalive ping queued"),
            Err(TrySendError::Full(_)) => warn!("outbound queue full; keepalive ping dropped"),
            Err(TrySendError::Closed(_)) => {
                warn!("writer gone; stopping keepalive");
                break;
            }
        }
    }
}
