#![doc(html_root_url = "https://docs.rs/sreeify/latest")]
//! Public API for the `sreeify` library.
//!
//! This crate implements the client side of a chunked, multiplexed
//! transform protocol: payloads are split into bounded chunks tagged with a
//! correlation id, many requests share one connection, and responses are
//! reassembled from chunks that may arrive in any order.

pub mod client;
pub mod config;
pub mod correlation;
pub mod fragment;
pub mod frame;
pub mod message;
pub mod metrics;
pub mod transport;

pub use client::{Transform, TransformClient, TransformClientBuilder, TransformError};
pub use config::{ClientConfig, ConfigError};
pub use correlation::PendingRequests;
pub use fragment::{Reassembler, ReassemblyError, RequestId};
pub use frame::{Payload, Ping, Sreequest, Sreesponse};
pub use transport::{ConnectError, Connector, SecurityMode};
