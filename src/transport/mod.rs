//! Transport connector for the transform service.
//!
//! Dials a `host:port` target over plain TCP or TLS, retrying establishment
//! with jittered exponential back-off, and wraps the resulting stream in a
//! length-delimited codec whose frame limit caps every message.

mod backoff;
mod connector;
mod error;
mod stream;
mod tls;

pub use backoff::BackoffConfig;
pub use connector::{Connector, DEFAULT_MAX_FRAME_LENGTH, FramedTransport, SecurityMode};
pub use error::ConnectError;
pub use stream::TransportStream;
pub use tls::{server_name, split_target, system_client_config};
