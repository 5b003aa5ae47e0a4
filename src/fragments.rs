//! Synthetic fragments spliced around headerless blocks.
//!
//! A `Middle` or `Last` block has no stream header, so a decoder can't
//! make sense of it on its own. Feeding the decoder [`start_fragment`] first
//! establishes the window size, just like the header of a `First` block
//! would have. Likewise, a `First` or `Middle` block has no terminator, so
//! feeding the decoder [`END_FRAGMENT`] afterwards lets it recognize the
//! end of the stream.
//!
//! In general, for bare segments compressed with the same window bits `w`,
//! `start_fragment(w) ++ segment_0 ++ ... ++ segment_n ++ END_FRAGMENT` is a
//! complete Brotli stream.

use std::sync::OnceLock;

use crate::{options::CompressionOptions, writer::BlockWriter, WindowBits};

/// A final, empty meta-block (`ISLAST` and `ISLASTEMPTY` both set), padded
/// to a byte boundary.
pub const END_FRAGMENT: &[u8] = &[0x03];

const NUM_WINDOW_SIZES: usize = (WindowBits::MAX - WindowBits::MIN + 1) as usize;

static START_FRAGMENTS: [OnceLock<Box<[u8]>>; NUM_WINDOW_SIZES] =
    [const { OnceLock::new() }; NUM_WINDOW_SIZES];

/// Get the start fragment for `window_bits`: a Brotli stream header with no
/// payload and no terminator, padded to a byte boundary.
///
/// Each fragment is computed the first time it's requested by compressing
/// zero bytes, then cached for the lifetime of the process. Concurrent
/// first calls for the same window size compute it only once.
pub fn start_fragment(window_bits: WindowBits) -> &'static [u8] {
    START_FRAGMENTS[window_bits.index()].get_or_init(|| compute_start_fragment(window_bits))
}

fn compute_start_fragment(window_bits: WindowBits) -> Box<[u8]> {
    let mut fragment = vec![];

    let result = BlockWriter::builder(&mut fragment)
        .with_options(CompressionOptions::start_fragment(window_bits))
        .build()
        .and_then(|mut writer| writer.finish());
    if let Err(error) = result {
        panic!(
            "failed to compress start fragment for window bits {}: {error}",
            window_bits.get()
        );
    }

    tracing::debug!(
        window_bits = window_bits.get(),
        len = fragment.len(),
        "computed brotli start fragment"
    );

    fragment.into_boxed_slice()
}

#[cfg(test)]
mod tests {
    use super::{start_fragment, END_FRAGMENT};
    use crate::WindowBits;

    #[test]
    fn test_start_fragment_is_stable() {
        for window_bits in WindowBits::all() {
            let first = start_fragment(window_bits);
            let second = start_fragment(window_bits);

            assert!(!first.is_empty());
            assert_eq!(first, second);
            assert!(
                std::ptr::eq(first, second),
                "start fragment should only be computed once"
            );
        }
    }

    #[test]
    fn test_start_fragments_differ_by_window() {
        let small = start_fragment(WindowBits::new(10).unwrap());
        let large = start_fragment(WindowBits::new(24).unwrap());
        assert_ne!(small, large);
    }

    #[test]
    fn test_concurrent_first_use() {
        let window_bits = WindowBits::new(13).unwrap();

        let fragments: Vec<Vec<u8>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(move || start_fragment(window_bits).to_vec()))
                .collect();

            handles
                .into_iter()
                .map(|handle| handle.join().unwrap())
                .collect()
        });

        for fragment in &fragments {
            assert_eq!(fragment, &fragments[0]);
        }
        assert_eq!(&fragments[0][..], start_fragment(window_bits));
    }

    #[test]
    fn test_end_fragment() {
        assert_eq!(END_FRAGMENT, [0x03]);
    }
}
