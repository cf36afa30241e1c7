//! Error types for transform client operations.

use std::{num::NonZeroUsize, time::Duration};

use crate::{config::ConfigError, fragment::RequestId, transport::ConnectError};

/// Errors emitted by [`crate::client::TransformClient`].
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    /// Establishing the connection failed.
    #[error("connect error: {0}")]
    Connect(#[from] ConnectError),
    /// The client configuration is unusable.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    /// The connection ended before the response was complete.
    #[error("connection to the transform service closed")]
    ConnectionClosed,
    /// No complete response arrived before the deadline.
    #[error("request {id} timed out after {after:?}")]
    Timeout { id: RequestId, after: Duration },
    /// The payload would need more chunks than the protocol allows.
    #[error("payload of {len} bytes needs too many chunks of {chunk_size} bytes")]
    PayloadTooLarge { len: usize, chunk_size: NonZeroUsize },
}
