//! Correlation table and reassembly state for one connection.
//!
//! [`PendingRequests`] owns both the id → delivery-slot mapping and the
//! partial chunk buffers behind a single mutex. The receiver feeds inbound
//! chunks through [`PendingRequests::ingest`]; callers register before
//! sending and wait on the returned [`Delivery`]. Nothing else touches the
//! maps, and the lock is never held across an `.await`.

use std::{
    collections::{HashMap, hash_map::Entry},
    num::NonZeroUsize,
    sync::{Mutex, MutexGuard, PoisonError},
};

use tokio::sync::oneshot;

use crate::{
    fragment::{Reassembler, ReassemblyError, RequestId},
    frame::Payload,
};

/// Receiving half of a request's single-use delivery slot.
///
/// Resolves with the reassembled bytes, or with an error once the slot is
/// dropped because the request was cancelled or the connection closed.
pub type Delivery = oneshot::Receiver<Vec<u8>>;

/// Returned by [`PendingRequests::register`] after the table was closed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("connection closed; no new requests accepted")]
pub struct TableClosed;

/// Outcome of feeding one inbound chunk to [`PendingRequests::ingest`].
#[derive(Debug, PartialEq, Eq)]
pub enum Ingested {
    /// The chunk was stored; more are required.
    Buffered,
    /// The chunk completed the request and the bytes were handed over.
    Delivered { id: RequestId, len: usize },
    /// The request completed but its caller had already gone away.
    Abandoned { id: RequestId },
    /// No request with this id is waiting; the chunk was dropped.
    Unknown { id: RequestId },
    /// The chunk failed validation and was dropped.
    Rejected(ReassemblyError),
}

#[derive(Debug)]
struct Inner {
    slots: HashMap<RequestId, oneshot::Sender<Vec<u8>>>,
    reassembler: Reassembler,
    closed: bool,
}

/// Synchronised store of in-flight requests for one connection.
#[derive(Debug)]
pub struct PendingRequests {
    inner: Mutex<Inner>,
}

impl Default for PendingRequests {
    fn default() -> Self { Self::new(crate::fragment::DEFAULT_MAX_PARTS) }
}

impl PendingRequests {
    /// Create an empty table whose reassembler refuses more than
    /// `max_parts` parts per request.
    #[must_use]
    pub fn new(max_parts: NonZeroUsize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                slots: HashMap::new(),
                reassembler: Reassembler::new(max_parts),
                closed: false,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Allocate a fresh id and its delivery slot.
    ///
    /// The id is guaranteed not to collide with any request still in
    /// flight on this table.
    ///
    /// # Errors
    ///
    /// Returns [`TableClosed`] once [`PendingRequests::close`] has run.
    pub fn register(&self) -> Result<(RequestId, Delivery), TableClosed> {
        let mut inner = self.lock();
        if inner.closed {
            return Err(TableClosed);
        }
        let (tx, rx) = oneshot::channel();
        loop {
            if let Entry::Vacant(vacant) = inner.slots.entry(RequestId::generate()) {
                let id = vacant.key().clone();
                vacant.insert(tx);
                return Ok((id, rx));
            }
        }
    }

    /// Route one inbound chunk.
    ///
    /// Chunks for ids without a registered slot are dropped, so a chunk that
    /// arrives after its request completed or was cancelled can never
    /// trigger a second completion.
    pub fn ingest(&self, chunk: Payload) -> Ingested {
        let mut inner = self.lock();
        let id = RequestId::from(chunk.id.as_str());
        if !inner.slots.contains_key(&id) {
            inner.reassembler.discard(&id);
            return Ingested::Unknown { id };
        }
        let done = match inner.reassembler.ingest(chunk) {
            Ok(Some(done)) => done,
            Ok(None) => return Ingested::Buffered,
            Err(err) => return Ingested::Rejected(err),
        };
        let Some(slot) = inner.slots.remove(&id) else {
            return Ingested::Unknown { id };
        };
        let data = done.into_data();
        let len = data.len();
        match slot.send(data) {
            Ok(()) => Ingested::Delivered { id, len },
            Err(_) => Ingested::Abandoned { id },
        }
    }

    /// Forget `id` and any chunks buffered for it.
    ///
    /// Returns whether the request was still waiting.
    pub fn cancel(&self, id: &RequestId) -> bool {
        let mut inner = self.lock();
        inner.reassembler.discard(id);
        inner.slots.remove(id).is_some()
    }

    /// Refuse new registrations and fail every waiting request.
    ///
    /// Dropping the delivery senders wakes each caller with an error.
    /// Returns the number of requests that were failed.
    pub fn close(&self) -> usize {
        let mut inner = self.lock();
        inner.closed = true;
        inner.reassembler.clear();
        let failed = inner.slots.len();
        inner.slots.clear();
        failed
    }

    /// Whether [`PendingRequests::close`] has run.
    #[must_use]
    pub fn is_closed(&self) -> bool { self.lock().closed }

    /// Number of requests waiting for a response.
    #[must_use]
    pub fn in_flight(&self) -> usize { self.lock().slots.len() }

    /// Number of requests with some, but not all, response chunks buffered.
    #[must_use]
    pub fn partially_received(&self) -> usize { self.lock().reassembler.buffered_len() }
}
