//! Tests for outbound chunking.

use std::num::NonZeroUsize;

use proptest::prelude::*;
use rstest::rstest;

use crate::fragment::{DEFAULT_CHUNK_SIZE, chunk_count, split};

fn size(value: usize) -> NonZeroUsize { NonZeroUsize::new(value).expect("non-zero") }

#[test]
fn split_cuts_payload_into_bounded_chunks() {
    let payload: Vec<u8> = (0..8).collect();
    let chunks = split(&payload, size(3));

    assert_eq!(chunks.len(), 3);
    assert_eq!(chunks[0], &[0, 1, 2]);
    assert_eq!(chunks[1], &[3, 4, 5]);
    assert_eq!(chunks[2], &[6, 7]);
}

#[test]
fn split_yields_one_empty_chunk_for_empty_payload() {
    let chunks = split(&[], DEFAULT_CHUNK_SIZE);
    assert_eq!(chunks.len(), 1);
    assert!(chunks[0].is_empty());
}

#[test]
fn split_keeps_exact_multiple_without_trailing_chunk() {
    let payload = vec![9_u8; 12];
    let chunks = split(&payload, size(4));
    assert_eq!(chunks.len(), 3);
    assert!(chunks.iter().all(|chunk| chunk.len() == 4));
}

#[test]
fn default_chunk_size_is_one_mebibyte() {
    assert_eq!(DEFAULT_CHUNK_SIZE.get(), 1024 * 1024);
}

#[rstest]
#[case(0, 1, 1)]
#[case(1, 1, 1)]
#[case(5, 2, 3)]
#[case(6, 2, 3)]
#[case(2_621_440, 1_048_576, 3)]
fn chunk_count_matches_split(#[case] len: usize, #[case] max: usize, #[case] expected: usize) {
    let payload = vec![0_u8; len];
    assert_eq!(chunk_count(len, size(max)), expected);
    assert_eq!(split(&payload, size(max)).len(), expected);
}

proptest! {
    #[test]
    fn split_then_concat_reproduces_payload(
        payload in proptest::collection::vec(any::<u8>(), 0..2048),
        max in 1_usize..300,
    ) {
        let chunks = split(&payload, size(max));
        prop_assert_eq!(chunks.concat(), payload.clone());
        prop_assert!(chunks.iter().all(|chunk| chunk.len() <= max));
        prop_assert_eq!(chunks.len(), chunk_count(payload.len(), size(max)));
        if !payload.is_empty() {
            prop_assert_eq!(chunks.len(), payload.len().div_ceil(max));
        }
    }
}
