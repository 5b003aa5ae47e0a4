#![allow(unused)]

use brotli_block::{BlockPosition, Quality, WindowBits};
use proptest::prelude::*;

pub type Data = easy_hex::Hex<Vec<u8>>;

pub const MAX_DATA_LENGTH: usize = 1000;
pub const MAX_CHUNKS: usize = 8;

pub fn arb_data() -> impl Strategy<Value = Data> {
    prop::collection::vec(any::<u8>(), 0..=MAX_DATA_LENGTH).prop_map(easy_hex::Hex)
}

/// Data that compresses well, so blocks contain back-references.
pub fn arb_repetitive_data() -> impl Strategy<Value = Data> {
    (
        prop::collection::vec(any::<u8>(), 1..=16),
        0..=MAX_DATA_LENGTH,
    )
        .prop_map(|(pattern, len)| {
            easy_hex::Hex(pattern.iter().copied().cycle().take(len).collect())
        })
}

pub fn arb_data_with_pos() -> impl Strategy<Value = (Data, usize)> {
    arb_data().prop_flat_map(|data| {
        let len = data.len();
        (Just(data), 0..=len)
    })
}

/// One or more chunks of data, one per block.
pub fn arb_chunks() -> impl Strategy<Value = Vec<Data>> {
    prop::collection::vec(prop_oneof![arb_data(), arb_repetitive_data()], 1..=MAX_CHUNKS)
}

pub fn arb_window_bits() -> impl Strategy<Value = WindowBits> {
    (WindowBits::MIN..=WindowBits::MAX).prop_map(|window_bits| WindowBits::new(window_bits).unwrap())
}

/// A pair of window sizes `(compress, decompress)` where the decompression
/// window is at least as large as the compression window.
pub fn arb_window_bits_at_least() -> impl Strategy<Value = (WindowBits, WindowBits)> {
    arb_window_bits().prop_flat_map(|compress| {
        let decompress = (compress.get()..=WindowBits::MAX)
            .prop_map(|window_bits| WindowBits::new(window_bits).unwrap());
        (Just(compress), decompress)
    })
}

pub fn arb_quality() -> impl Strategy<Value = Quality> {
    (Quality::MIN..=Quality::MAX).prop_map(|quality| Quality::new(quality).unwrap())
}

pub fn arb_position() -> impl Strategy<Value = BlockPosition> {
    prop::sample::select(BlockPosition::ALL.to_vec())
}

/// The positions of `count` blocks that make up one stream.
pub fn positions(count: usize) -> Vec<BlockPosition> {
    (0..count)
        .map(|index| BlockPosition::for_index(index, count))
        .collect()
}

/// Deterministic bytes drawn from the first `alphabet` byte values.
pub fn pseudo_random_bytes(len: usize, alphabet: u32, seed: u64) -> Vec<u8> {
    assert!((1..=256).contains(&alphabet));

    let mut state = seed.wrapping_mul(0x9e37_79b9_7f4a_7c15) | 1;
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;

            let symbol = (state >> 32) % u64::from(alphabet);
            u8::try_from(symbol).unwrap()
        })
        .collect()
}

pub fn concat(chunks: &[Data]) -> Data {
    easy_hex::Hex(chunks.iter().flat_map(|chunk| chunk.iter()).copied().collect())
}

/// Install a `tracing` subscriber for the current test, controlled by
/// `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
