//! Compress a large byte sequence as independent Brotli *blocks* that can
//! be concatenated back into one valid Brotli stream.
//!
//! Each block is compressed for a [`BlockPosition`]: `First`, `Middle`,
//! `Last`, or `Single`. Blocks for `First`, `Middle`..., `Last` can be
//! produced independently (e.g. one per chunk of a content-addressed blob),
//! then concatenated byte-for-byte to get a standard Brotli stream of the
//! whole blob. Each block can also be decompressed on its own, given its
//! position and the window bits it was compressed with.
//!
//! ```
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use brotli_block::{BlockPosition, WindowBits};
//!
//! let window_bits = WindowBits::new(24)?;
//! let chunks: [&[u8]; 3] = [b"hello ", b"brotli ", b"blocks"];
//!
//! let mut blob = vec![];
//! for (index, chunk) in chunks.iter().enumerate() {
//!     let position = BlockPosition::for_index(index, chunks.len());
//!     let block = brotli_block::compress_block(chunk, position, window_bits)?;
//!
//!     // Every block decodes on its own...
//!     let decoded = brotli_block::decompress_block(&block, position, window_bits)?;
//!     assert_eq!(decoded, *chunk);
//!
//!     blob.extend_from_slice(&block);
//! }
//!
//! // ...and the concatenation is a plain Brotli stream
//! let decoded = brotli_block::decompress_block(&blob, BlockPosition::Single, window_bits)?;
//! assert_eq!(decoded, b"hello brotli blocks");
//! # Ok(())
//! # }
//! ```
//!
//! For streaming I/O, see [`BlockWriter`] and [`BlockReader`] (blocking),
//! or [`AsyncBlockWriter`] and [`AsyncBlockReader`] (`tokio` or `futures`,
//! with the corresponding crate features).

#[macro_use]
mod macros;

pub mod async_reader;
pub mod async_writer;
mod block;
mod buffer;
mod decoder;
mod encoder;
pub mod error;
pub mod fragments;
#[cfg_attr(not(any(feature = "tokio", feature = "futures")), allow(dead_code))]
mod guard;
pub mod options;
mod position;
pub mod reader;
pub mod writer;

pub use async_reader::AsyncBlockReader;
pub use async_writer::AsyncBlockWriter;
pub use block::{compress, compress_block, decompress_block, decompress_block_from};
pub use buffer::{BufferPool, PooledBuffer, BLOCK_BUFFER_SIZE};
pub use error::BlockStreamError;
pub use options::{CompressionOptions, OptionsError, Quality, WindowBits};
pub use position::{BlockPosition, ParseBlockPositionError};
pub use reader::BlockReader;
pub use writer::BlockWriter;

#[derive(Debug, Clone, Copy)]
enum BlockOutcome<T> {
    Complete(T),
    HasMore { remaining_bytes: usize },
}
