//! Outbound helper that splits payloads into bounded chunks.

use std::num::NonZeroUsize;

/// Default upper bound on the bytes carried by one chunk (1 MiB).
pub const DEFAULT_CHUNK_SIZE: NonZeroUsize = match NonZeroUsize::new(1024 * 1024) {
    Some(size) => size,
    None => panic!("default chunk size must be non-zero"),
};

/// Split `payload` into chunks of at most `max_chunk_size` bytes.
///
/// Chunks borrow from `payload` and concatenate back to it exactly. An empty
/// payload yields a single empty chunk so every request announces at least
/// one part.
///
/// # Examples
///
/// ```
/// use std::num::NonZeroUsize;
///
/// use sreeify::fragment::split;
///
/// let size = NonZeroUsize::new(3).expect("non-zero");
/// let chunks = split(b"abcdefgh", size);
/// assert_eq!(chunks, [&b"abc"[..], &b"def"[..], &b"gh"[..]]);
/// assert_eq!(split(b"", size), [&b""[..]]);
/// ```
#[must_use]
pub fn split(payload: &[u8], max_chunk_size: NonZeroUsize) -> Vec<&[u8]> {
    if payload.is_empty() {
        return vec![payload];
    }
    payload.chunks(max_chunk_size.get()).collect()
}

/// Number of chunks [`split`] produces for a payload of `len` bytes.
#[must_use]
pub fn chunk_count(len: usize, max_chunk_size: NonZeroUsize) -> usize {
    len.div_ceil(max_chunk_size.get()).max(1)
}
