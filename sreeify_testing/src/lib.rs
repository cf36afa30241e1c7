//! Test utilities for `sreeify`.
//!
//! [`TransformServer`] runs an in-process transform service on a loopback
//! port so client behaviour can be exercised end to end, optionally behind
//! TLS with a [`TestIdentity`]. The [`logger`] fixture captures log output
//! for assertions.
//!
//! ```rust,no_run
//! use sreeify_testing::{ServerOptions, TransformServer};
//!
//! # async fn example() -> std::io::Result<()> {
//! let server = TransformServer::start(ServerOptions::uppercase()).await?;
//! let target = server.target();
//! # let _ = target;
//! # Ok(())
//! # }
//! ```

pub mod logging;
pub mod server;
pub mod tls;

pub use logging::{LoggerHandle, logger};
pub use server::{
    ReplyOrder,
    SERVER_MAX_FRAME_LENGTH,
    ServerMode,
    ServerOptions,
    TransformFn,
    TransformServer,
};
pub use tls::{TEST_HOST, TestIdentity};
