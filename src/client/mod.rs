//! Client engine for the chunked transform protocol.
//!
//! A [`TransformClient`] keeps one connection to the service. Each call to
//! [`TransformClient::transform`] registers a fresh request id, streams the
//! payload as tagged chunks on a background sender task and waits for the
//! receiver task to reassemble the matching response. A keepalive task
//! shares the write path and records ping round trips.

use async_trait::async_trait;

mod builder;
mod connection;
mod error;
mod keepalive;
mod receiver;
mod runtime;
mod sender;

pub use builder::TransformClientBuilder;
pub use error::TransformError;
pub use keepalive::LatencyTracker;
pub use runtime::TransformClient;

/// Something that rewrites a payload, such as a page body, into a new one.
///
/// Consumers such as an HTTP proxy depend on this trait rather than on
/// [`TransformClient`] directly so they can be exercised with a stub.
#[async_trait]
pub trait Transform: Send + Sync {
    /// Transform `payload` and return the result.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError`] when the payload could not be transformed.
    async fn transform(&self, payload: Vec<u8>) -> Result<Vec<u8>, TransformError>;
}
