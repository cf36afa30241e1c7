//! Single reader of a connection: demultiplexes inbound frames.

use std::{sync::Arc, time::SystemTime};

use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::LatencyTracker;
use crate::{
    correlation::{Ingested, PendingRequests},
    frame::Sreesponse,
    message::Message,
    metrics::{self, Direction},
};

/// Read frames until EOF, a read error, or `shutdown`.
///
/// However the loop ends, the connection token is cancelled and every
/// request still pending on `pending` is failed.
pub(crate) async fn run_receiver<S, B, E>(
    mut frames: S,
    pending: Arc<PendingRequests>,
    latency: Arc<LatencyTracker>,
    shutdown: CancellationToken,
) where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
{
    loop {
        let next = tokio::select! {
            biased;
            () = shutdown.cancelled() => break,
            next = frames.next() => next,
        };
        match next {
            Some(Ok(frame)) => dispatch(frame.as_ref(), &pending, &latency),
            Some(Err(error)) => {
                warn!(%error, "read from transform service failed");
                metrics::inc_errors();
                break;
            }
            None => {
                debug!("transform service closed the connection");
                break;
            }
        }
    }
    shutdown.cancel();
    let failed = pending.close();
    if failed > 0 {
        warn!(failed, "failing requests pending on the closed connection");
    }
}

/// Route one inbound frame to the keepalive tracker or the pending table.
pub(crate) fn dispatch(frame: &[u8], pending: &PendingRequests, latency: &LatencyTracker) {
    let response = match Sreesponse::from_bytes(frame) {
        Ok((response, _)) => response,
        Err(error) => {
            warn!(%error, len = frame.len(), "skipping undecodable frame");
            metrics::inc_errors();
            return;
        }
    };
    match response {
        Sreesponse::Ping(echo) => latency.record(echo.round_trip_at(SystemTime::now())),
        Sreesponse::Payload(chunk) => {
            metrics::inc_chunks(Direction::Inbound);
            let (part, total_parts) = (chunk.part, chunk.total_parts);
            match pending.ingest(chunk) {
                Ingested::Buffered => {
                    debug!(part, total_parts, "chunk buffered");
                }
                Ingested::Delivered { id, len } => {
                    debug!(request_id = %id, len, "response reassembled");
                }
                Ingested::Abandoned { id } => {
                    debug!(request_id = %id, "response completed after caller left");
                }
                Ingested::Unknown { id } => {
                    debug!(request_id = %id, part, "dropping chunk for unknown request");
                }
                Ingested::Rejected(error) => {
                    warn!(%error, "rejecting malformed chunk");
                    metrics::inc_errors();
                }
            }
        }
    }
}
