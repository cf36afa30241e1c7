//! One live connection and the tasks that drive it.

use std::{sync::Arc, time::Duration};

use bytes::Bytes;
use futures::{Sink, SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{debug, warn};

use super::{
    LatencyTracker,
    keepalive::run_keepalive,
    receiver::run_receiver,
};
use crate::{
    config::ClientConfig,
    correlation::PendingRequests,
    frame::Sreequest,
    message::Message,
    metrics,
    transport::FramedTransport,
};

/// Frames waiting for the writer before senders are made to wait.
pub(crate) const OUTBOUND_QUEUE_CAPACITY: usize = 64;

/// A connection shared by every request issued while it stays up.
///
/// Owns the writer, receiver and keepalive tasks. Dropping the last handle
/// cancels them.
#[derive(Debug)]
pub(crate) struct Connection {
    outbound: mpsc::Sender<Sreequest>,
    pending: Arc<PendingRequests>,
    shutdown: CancellationToken,
    tasks: TaskTracker,
}

impl Connection {
    /// Split `framed` and start the tasks that serve it.
    pub(crate) fn spawn(
        framed: FramedTransport,
        config: &ClientConfig,
        latency: Arc<LatencyTracker>,
    ) -> Self {
        let (sink, stream) = framed.split();
        let (outbound, queue) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
        let pending = Arc::new(PendingRequests::new(config.max_parts));
        let shutdown = CancellationToken::new();
        let tasks = TaskTracker::new();

        tasks.spawn(run_writer(sink, queue, shutdown.clone()));
        tasks.spawn(run_receiver(
            stream,
            Arc::clone(&pending),
            latency,
            shutdown.clone(),
        ));
        if let Some(period) = config.ping_interval {
            tasks.spawn(run_keepalive(outbound.clone(), period, shutdown.clone()));
        }
        tasks.close();

        Self {
            outbound,
            pending,
            shutdown,
            tasks,
        }
    }

    /// Queue feeding the writer task.
    pub(crate) fn outbound(&self) -> mpsc::Sender<Sreequest> { self.outbound.clone() }

    /// Requests in flight on this connection.
    pub(crate) fn pending(&self) -> &Arc<PendingRequests> { &self.pending }

    /// Whether the connection has stopped serving requests.
    pub(crate) fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled() || self.pending.is_closed()
    }

    /// Stop every task and wait for them, bounded by `grace`.
    pub(crate) async fn shutdown(&self, grace: Duration) {
        self.shutdown.cancel();
        if tokio::time::timeout(grace, self.tasks.wait()).await.is_err() {
            warn!(?grace, "connection tasks did not stop in time");
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) { self.shutdown.cancel(); }
}

/// Drain `queue` into `sink` in FIFO order.
///
/// A failed write tears the connection down so callers fail fast instead of
/// waiting for a response that can no longer be requested.
pub(crate) async fn run_writer<S>(
    mut sink: S,
    mut queue: mpsc::Receiver<Sreequest>,
    shutdown: CancellationToken,
) where
    S: Sink<Bytes> + Unpin,
    S::Error: std::fmt::Display,
{
    loop {
        let frame = tokio::select! {
            biased;
            () = shutdown.cancelled() => break,
            frame = queue.recv() => match frame {
                Some(frame) => frame,
                None => break,
            },
        };
        let bytes = match frame.to_bytes() {
            Ok(bytes) => Bytes::from(bytes),
            Err(error) => {
                warn!(%error, "failed to encode outbound frame");
                metrics::inc_errors();
                continue;
            }
        };
        if let Err(error) = sink.send(bytes).await {
            warn!(%error, "write to transform service failed; closing connection");
            metrics::inc_errors();
            shutdown.cancel();
            break;
        }
    }
    if let Err(error) = sink.close().await {
        debug!(%error, "closing connection sink failed");
    }
}
