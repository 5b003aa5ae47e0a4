use brotli_block::{BlockPosition, WindowBits};

mod test_utils;

#[test]
fn test_block_round_trip_matrix() {
    test_utils::init_tracing();

    for size in [0, 100, 10_000, 100_000] {
        for alphabet in [1, 128, 256] {
            let data = test_utils::pseudo_random_bytes(size, alphabet, 42);

            for window_bits in [10, 22, 24] {
                let window_bits = WindowBits::new(window_bits).unwrap();

                for position in BlockPosition::ALL {
                    let compressed =
                        brotli_block::compress_block(&data, position, window_bits).unwrap();
                    let decompressed =
                        brotli_block::decompress_block_from(&compressed[..], position, window_bits)
                            .unwrap();

                    assert!(
                        decompressed == data,
                        "mismatch with size={size} alphabet={alphabet} position={position} window_bits={}",
                        window_bits.get(),
                    );
                }
            }
        }
    }
}

#[test]
fn test_block_single_symbol_first_block_with_small_window() {
    let window_bits = WindowBits::new(10).unwrap();
    let data = test_utils::pseudo_random_bytes(100_000, 1, 7);

    let compressed =
        brotli_block::compress_block(&data, BlockPosition::First, window_bits).unwrap();
    let decompressed =
        brotli_block::decompress_block(&compressed, BlockPosition::First, window_bits).unwrap();
    assert!(decompressed == data, "first block should round-trip");

    // Completing the stream with an empty last block gives a standard stream
    let last = brotli_block::compress_block(&[], BlockPosition::Last, window_bits).unwrap();
    let stream = [compressed, last].concat();
    let mut decoded = vec![];
    brotli::BrotliDecompress(&mut &stream[..], &mut decoded).unwrap();
    assert!(decoded == data, "completed stream should round-trip");
}
