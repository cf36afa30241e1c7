//! Errors raised while establishing the transform connection.

use std::io;

use thiserror::Error;

/// Errors emitted by [`Connector`](crate::transport::Connector).
#[derive(Debug, Error)]
pub enum ConnectError {
    /// The target is not of the form `host:port`.
    #[error("invalid target {target:?}; expected host:port")]
    InvalidTarget { target: String },
    /// The host cannot be used as a TLS server name.
    #[error("invalid TLS server name {host:?}")]
    InvalidServerName { host: String },
    /// No usable trust roots were found in the system store.
    #[error("no usable trust roots in the system certificate store")]
    NoTrustRoots,
    /// Reading the system certificate store failed.
    #[error("failed to load system trust roots: {0}")]
    TrustRoots(#[source] io::Error),
    /// Every dial attempt failed.
    #[error("failed to connect to {target} after {attempts} attempts: {source}")]
    Exhausted {
        target: String,
        attempts: u32,
        #[source]
        source: io::Error,
    },
}
