//! Transform client facade.

use std::{fmt, sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::{sync::Mutex, task::JoinHandle, time::timeout};
use tracing::{info, warn};

use super::{
    LatencyTracker,
    Transform,
    TransformClientBuilder,
    TransformError,
    connection::Connection,
    sender::spawn_sender,
};
use crate::{
    config::ClientConfig,
    correlation::PendingRequests,
    fragment::{RequestId, chunk_count},
    metrics,
    transport::Connector,
};

/// Time allowed for connection tasks to stop during [`TransformClient::close`].
const CLOSE_GRACE: Duration = Duration::from_secs(5);

/// Client for the remote transform service.
///
/// Every call to [`transform`](Self::transform) is multiplexed over one
/// shared connection. Responses are reassembled from chunks that may
/// arrive in any order and are matched to their caller by request id. If
/// the connection has gone away, the next call dials a replacement; calls
/// that were waiting on the old connection fail with
/// [`TransformError::ConnectionClosed`] and are never re-sent.
///
/// # Examples
///
/// ```no_run
/// use sreeify::client::TransformClient;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), sreeify::client::TransformError> {
/// let client = TransformClient::builder("127.0.0.1:9000")
///     .insecure(true)
///     .connect()
///     .await?;
/// let page = client.transform(b"<p>hello</p>".to_vec()).await?;
/// # let _ = page;
/// # Ok(())
/// # }
/// ```
pub struct TransformClient {
    config: ClientConfig,
    connector: Connector,
    latency: Arc<LatencyTracker>,
    connection: Mutex<Arc<Connection>>,
}

impl fmt::Debug for TransformClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl TransformClient {
    /// Start building a client for `server` (`host:port`).
    #[must_use]
    pub fn builder(server: impl Into<String>) -> TransformClientBuilder {
        TransformClientBuilder::new(server)
    }

    pub(crate) async fn connect_with(
        config: ClientConfig,
        connector: Connector,
    ) -> Result<Self, TransformError> {
        let framed = connector.connect().await?;
        let latency = Arc::new(LatencyTracker::new());
        let connection = Connection::spawn(framed, &config, Arc::clone(&latency));
        Ok(Self {
            config,
            connector,
            latency,
            connection: Mutex::new(Arc::new(connection)),
        })
    }

    /// Send `payload` through the transform service and return the result.
    ///
    /// Dropping the returned future abandons the request: its pending
    /// entry is removed and its sender task aborted.
    ///
    /// # Errors
    ///
    /// - [`TransformError::PayloadTooLarge`] if the payload needs more
    ///   chunks than the protocol allows.
    /// - [`TransformError::Connect`] if a replacement connection could not
    ///   be established.
    /// - [`TransformError::ConnectionClosed`] if the connection ended first.
    /// - [`TransformError::Timeout`] if the request deadline expired.
    pub async fn transform(&self, payload: Vec<u8>) -> Result<Vec<u8>, TransformError> {
        let chunk_size = self.config.chunk_size;
        let parts = chunk_count(payload.len(), chunk_size);
        if parts > self.config.max_parts.get() || i32::try_from(parts).is_err() {
            return Err(TransformError::PayloadTooLarge {
                len: payload.len(),
                chunk_size,
            });
        }

        let connection = self.live_connection().await?;
        let (id, delivery) = connection
            .pending()
            .register()
            .map_err(|_| TransformError::ConnectionClosed)?;
        let sender = spawn_sender(connection.outbound(), id.clone(), payload, chunk_size);
        let _guard = RequestGuard::new(Arc::clone(connection.pending()), id.clone(), sender);

        let delivered = match self.config.request_timeout {
            Some(after) => match timeout(after, delivery).await {
                Ok(delivered) => delivered,
                Err(_) => {
                    warn!(request_id = %id, ?after, "transform request timed out");
                    metrics::inc_errors();
                    return Err(TransformError::Timeout { id, after });
                }
            },
            None => delivery.await,
        };
        delivered.map_err(|_| TransformError::ConnectionClosed)
    }

    /// Latest keepalive round trip, if an echo has been received.
    #[must_use]
    pub fn last_round_trip(&self) -> Option<Duration> { self.latency.last_round_trip() }

    /// Requests waiting for a response on the current connection.
    pub async fn in_flight(&self) -> usize { self.connection.lock().await.pending().in_flight() }

    /// Configuration the client was built with.
    #[must_use]
    pub fn config(&self) -> &ClientConfig { &self.config }

    /// Shut the current connection down, failing any pending requests.
    ///
    /// A later [`transform`](Self::transform) dials a fresh connection.
    pub async fn close(&self) {
        let connection = Arc::clone(&*self.connection.lock().await);
        connection.shutdown(CLOSE_GRACE).await;
    }

    async fn live_connection(&self) -> Result<Arc<Connection>, TransformError> {
        let mut current = self.connection.lock().await;
        if current.is_closed() {
            info!(target_addr = self.connector.target(), "connection closed; redialling");
            let framed = self.connector.connect().await?;
            *current = Arc::new(Connection::spawn(
                framed,
                &self.config,
                Arc::clone(&self.latency),
            ));
        }
        Ok(Arc::clone(&current))
    }
}

#[async_trait]
impl Transform for TransformClient {
    async fn transform(&self, payload: Vec<u8>) -> Result<Vec<u8>, TransformError> {
        TransformClient::transform(self, payload).await
    }
}

/// Releases a request's resources however its call ends.
struct RequestGuard {
    pending: Arc<PendingRequests>,
    id: RequestId,
    sender: JoinHandle<usize>,
}

impl RequestGuard {
    fn new(pending: Arc<PendingRequests>, id: RequestId, sender: JoinHandle<usize>) -> Self {
        metrics::inc_in_flight();
        Self {
            pending,
            id,
            sender,
        }
    }
}

impl Drop for RequestGuard {
    fn drop(&mut self) {
        self.pending.cancel(&self.id);
        self.sender.abort();
        metrics::dec_in_flight();
    }
}
