//! Chunking and reassembly of transform payloads.
//!
//! Outbound payloads are cut into bounded chunks by [`split`]; inbound chunks
//! are stitched back together by [`Reassembler`], which tolerates any arrival
//! order. Both halves are transport-agnostic so the loopback test server can
//! reuse them.

pub mod chunker;
pub mod error;
pub mod id;
pub mod reassembler;

pub use chunker::{DEFAULT_CHUNK_SIZE, chunk_count, split};
pub use error::ReassemblyError;
pub use id::RequestId;
pub use reassembler::{DEFAULT_MAX_PARTS, ReassembledPayload, Reassembler};
