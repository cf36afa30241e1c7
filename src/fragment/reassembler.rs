//! Inbound helper that stitches chunks back into complete payloads.
//!
//! [`Reassembler`] keeps one slot array per [`RequestId`], sized by the
//! `total_parts` announced on the first chunk seen for that id. Chunks may
//! arrive in any order. A slot counts as filled once a chunk lands in it,
//! even when that chunk is empty, so zero-length parts complete normally.

use std::{collections::HashMap, num::NonZeroUsize};

use super::{ReassemblyError, RequestId};
use crate::frame::Payload;

/// Default ceiling on the part count a single chunk may announce.
pub const DEFAULT_MAX_PARTS: NonZeroUsize = match NonZeroUsize::new(4096) {
    Some(limit) => limit,
    None => panic!("default part limit must be non-zero"),
};

#[derive(Debug)]
struct PartialPayload {
    slots: Vec<Option<Vec<u8>>>,
    filled: usize,
}

impl PartialPayload {
    fn new(total_parts: usize) -> Self {
        Self {
            slots: vec![None; total_parts],
            filled: 0,
        }
    }

    fn total_parts(&self) -> usize { self.slots.len() }

    /// Store `data` at `part`. The first copy of a part wins.
    fn fill(&mut self, part: usize, data: Vec<u8>) {
        let Some(slot) = self.slots.get_mut(part) else {
            return;
        };
        if slot.is_none() {
            *slot = Some(data);
            self.filled += 1;
        }
    }

    fn is_complete(&self) -> bool { self.filled == self.slots.len() }

    fn flatten(self) -> Vec<u8> {
        let len = self.slots.iter().flatten().map(Vec::len).sum();
        let mut buffer = Vec::with_capacity(len);
        for part in self.slots.into_iter().flatten() {
            buffer.extend_from_slice(&part);
        }
        buffer
    }
}

/// Container for a fully re-assembled payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReassembledPayload {
    id: RequestId,
    data: Vec<u8>,
}

impl ReassembledPayload {
    /// Construct a new [`ReassembledPayload`].
    #[must_use]
    pub fn new(id: RequestId, data: Vec<u8>) -> Self { Self { id, data } }

    /// Identifier shared by the chunks that formed this payload.
    #[must_use]
    pub fn id(&self) -> &RequestId { &self.id }

    /// Borrow the re-assembled bytes.
    #[must_use]
    pub fn data(&self) -> &[u8] { self.data.as_slice() }

    /// Consume the payload, returning the owned bytes.
    #[must_use]
    pub fn into_data(self) -> Vec<u8> { self.data }
}

/// Stateful, order-independent chunk re-assembler.
///
/// Partial state never expires here; callers that track request lifetimes
/// remove abandoned ids with [`Reassembler::discard`].
#[derive(Debug)]
pub struct Reassembler {
    max_parts: NonZeroUsize,
    buffers: HashMap<RequestId, PartialPayload>,
}

impl Default for Reassembler {
    fn default() -> Self { Self::new(DEFAULT_MAX_PARTS) }
}

impl Reassembler {
    /// Create a re-assembler that refuses chunks announcing more than
    /// `max_parts` parts.
    #[must_use]
    pub fn new(max_parts: NonZeroUsize) -> Self {
        Self {
            max_parts,
            buffers: HashMap::new(),
        }
    }

    /// Feed one chunk.
    ///
    /// Returns `Ok(Some(_))` when the chunk fills the last empty slot for its
    /// id, and `Ok(None)` while slots remain empty or when the chunk repeats
    /// an already filled slot. Completion tears down the id's state, so a
    /// later chunk for the same id starts a fresh buffer.
    ///
    /// # Errors
    ///
    /// Returns [`ReassemblyError`] when the chunk's counters are invalid or
    /// contradict earlier chunks. Existing state for the id is left intact.
    ///
    /// # Examples
    ///
    /// ```
    /// use sreeify::{fragment::Reassembler, frame::Payload};
    ///
    /// let mut reassembler = Reassembler::default();
    /// assert!(
    ///     reassembler
    ///         .ingest(Payload::new("a", 1, 2, b"world".to_vec()))
    ///         .expect("valid chunk")
    ///         .is_none()
    /// );
    /// let done = reassembler
    ///     .ingest(Payload::new("a", 0, 2, b"hello ".to_vec()))
    ///     .expect("valid chunk")
    ///     .expect("all parts present");
    /// assert_eq!(done.data(), b"hello world");
    /// ```
    pub fn ingest(
        &mut self,
        chunk: Payload,
    ) -> Result<Option<ReassembledPayload>, ReassemblyError> {
        let Payload {
            id,
            part,
            total_parts,
            data,
        } = chunk;
        let id = RequestId::from(id);
        let (part, total) = self.validate(&id, part, total_parts)?;

        let partial = self
            .buffers
            .entry(id.clone())
            .or_insert_with(|| PartialPayload::new(total));
        if partial.total_parts() != total {
            return Err(ReassemblyError::TotalPartsMismatch {
                expected: partial.total_parts(),
                id,
                found: total_parts,
            });
        }

        partial.fill(part, data);
        if !partial.is_complete() {
            return Ok(None);
        }
        Ok(self
            .buffers
            .remove(&id)
            .map(|partial| ReassembledPayload::new(id, partial.flatten())))
    }

    /// Drop any partial state for `id`, returning whether some existed.
    pub fn discard(&mut self, id: &RequestId) -> bool { self.buffers.remove(id).is_some() }

    /// Drop all partial state.
    pub fn clear(&mut self) { self.buffers.clear(); }

    /// Number of ids with partial state.
    #[must_use]
    pub fn buffered_len(&self) -> usize { self.buffers.len() }

    fn validate(
        &self,
        id: &RequestId,
        part: i32,
        total_parts: i32,
    ) -> Result<(usize, usize), ReassemblyError> {
        let total = match usize::try_from(total_parts) {
            Ok(total) if total > 0 => total,
            _ => {
                return Err(ReassemblyError::InvalidTotalParts {
                    id: id.clone(),
                    total_parts,
                });
            }
        };
        if total > self.max_parts.get() {
            return Err(ReassemblyError::TooManyParts {
                id: id.clone(),
                total_parts,
                limit: self.max_parts,
            });
        }
        match usize::try_from(part) {
            Ok(part) if part < total => Ok((part, total)),
            _ => Err(ReassemblyError::PartOutOfRange {
                id: id.clone(),
                part,
                total_parts,
            }),
        }
    }
}
