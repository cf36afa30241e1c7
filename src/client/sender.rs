//! Per-request chunk sender.

use std::num::NonZeroUsize;

use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, warn};

use crate::{
    fragment::{RequestId, split},
    frame::{Payload, Sreequest},
    metrics::{self, Direction},
};

/// Spawn a task writing `payload` as tagged chunks onto `outbound`.
pub(crate) fn spawn_sender(
    outbound: mpsc::Sender<Sreequest>,
    id: RequestId,
    payload: Vec<u8>,
    chunk_size: NonZeroUsize,
) -> JoinHandle<usize> {
    tokio::spawn(async move { send_chunks(&outbound, &id, &payload, chunk_size).await })
}

/// Enqueue every chunk of `payload` in part order.
///
/// Stops at the first chunk the writer can no longer accept; the rest of
/// the request is abandoned and never re-sent. Returns how many chunks were
/// queued.
pub(crate) async fn send_chunks(
    outbound: &mpsc::Sender<Sreequest>,
    id: &RequestId,
    payload: &[u8],
    chunk_size: NonZeroUsize,
) -> usize {
    let chunks = split(payload, chunk_size);
    let count = chunks.len();
    let Ok(total_parts) = i32::try_from(count) else {
        warn!(request_id = %id, parts = count, "too many chunks; request abandoned");
        return 0;
    };
    for (part, data) in (0..total_parts).zip(chunks) {
        let frame = Sreequest::Payload(Payload::new(id.as_str(), part, total_parts, data.to_vec()));
        if outbound.send(frame).await.is_err() {
            warn!(
                request_id = %id,
                part,
                total_parts,
                "connection writer gone; abandoning remaining chunks"
            );
            metrics::inc_errors();
            return usize::try_from(part).unwrap_or_default();
        }
        debug!(request_id = %id, part, total_parts, len = data.len(), "chunk queued");
        metrics::inc_chunks(Direction::Outbound);
    }
    count
}
