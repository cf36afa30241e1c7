//! Errors raised while validating inbound chunks.
//!
//! Every variant describes a chunk that can never contribute to a complete
//! payload. The reassembler rejects it without disturbing other requests.

use std::num::NonZeroUsize;

use thiserror::Error;

use super::RequestId;

/// Errors produced by [`Reassembler`](crate::fragment::Reassembler).
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ReassemblyError {
    /// The chunk announced zero or a negative number of parts.
    #[error("chunk for {id} announces invalid total_parts {total_parts}")]
    InvalidTotalParts { id: RequestId, total_parts: i32 },
    /// The chunk announced more parts than the configured ceiling.
    #[error("chunk for {id} announces {total_parts} parts, limit is {limit}")]
    TooManyParts {
        id: RequestId,
        total_parts: i32,
        limit: NonZeroUsize,
    },
    /// The chunk index lies outside `[0, total_parts)`.
    #[error("chunk for {id} has part {part} outside 0..{total_parts}")]
    PartOutOfRange {
        id: RequestId,
        part: i32,
        total_parts: i32,
    },
    /// The chunk disagrees with earlier chunks about the part count.
    #[error("chunk for {id} announces {found} parts, earlier chunks announced {expected}")]
    TotalPartsMismatch {
        id: RequestId,
        expected: usize,
        found: i32,
    },
}
