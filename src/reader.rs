use std::io::BufRead as _;

use crate::{buffer::Buffer, decoder::BlockDecoder, BlockPosition, WindowBits};

/// A reader that decompresses a block from an underlying reader.
///
/// The underlying reader `R` should implement [`std::io::BufRead`]
/// (required for the [`std::io::Read`] and [`std::io::BufRead`] impls).
///
/// For async support, see [`crate::AsyncBlockReader`].
///
/// ## Construction
///
/// Create a builder using either [`BlockReader::builder`] (recommended) or
/// [`BlockReader::builder_buffered`] (to use a custom buffer).
/// See [`BlockReaderBuilder`] for build options. Call
/// [`BlockReaderBuilder::build`] to build the [`BlockReader`] instance.
///
/// ```
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// # let compressed_block: &[u8] = &[];
/// use brotli_block::{BlockPosition, BlockReader, WindowBits};
///
/// let reader = BlockReader::builder(compressed_block)
///     .with_position(BlockPosition::Middle)
///     .with_window_bits(WindowBits::new(24)?)
///     .build();
/// # Ok(())
/// # }
/// ```
///
/// ## Positions
///
/// A block that isn't [`BlockPosition::Single`] is missing its stream
/// header, its terminator, or both. The reader supplies the missing pieces
/// itself, so each block can be decompressed on its own. Since `Middle`
/// and `Last` blocks don't record their window size, the reader must be
/// built with the same [`WindowBits`] the block was compressed with.
///
/// ## Buffering
///
/// The decompressed output is always buffered internally. Since the
/// reader must also implement [`std::io::BufRead`], the compressed input
/// must also be buffered.
///
/// [`BlockReader::builder`] will wrap any reader implementing
/// [`std::io::Read`] with a recommended buffer size for the input stream.
/// For more control over how the input gets buffered, you can instead use
/// [`BlockReader::builder_buffered`].
///
/// Reading stops once the end of the Brotli stream is reached. Any data
/// left in the underlying reader after that point is never read.
pub struct BlockReader<R> {
    reader: R,
    decoder: BlockDecoder,
    buffer: crate::buffer::FixedBuffer<Vec<u8>>,
    reached_eof: bool,
}

impl<R> BlockReader<std::io::BufReader<R>> {
    /// Create a new block reader that decompresses a block from the
    /// underlying reader. The provided reader will be wrapped with an
    /// appropriately-sized buffer.
    pub fn builder(reader: R) -> BlockReaderBuilder<std::io::BufReader<R>>
    where
        R: std::io::Read,
    {
        BlockReaderBuilder::new(reader)
    }

    /// Create a new block reader that decompresses a block from the
    /// underlying reader. The underlying reader must implement
    /// [`std::io::BufRead`], and its buffer will be used directly. When in
    /// doubt, use [`BlockReader::builder`].
    pub fn builder_buffered(reader: R) -> BlockReaderBuilder<R> {
        BlockReaderBuilder::with_buffered(reader)
    }
}

impl<R> BlockReader<R> {
    pub fn get_ref(&self) -> &R {
        &self.reader
    }

    /// Unwrap this reader, returning the underlying reader. Any buffered
    /// decompressed data is lost.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R> std::io::Read for BlockReader<R>
where
    R: std::io::BufRead,
{
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        let filled = self.fill_buf()?;
        let consumable = filled.len().min(buf.len());
        buf[..consumable].copy_from_slice(&filled[..consumable]);
        self.consume(consumable);
        Ok(consumable)
    }
}

impl<R> std::io::BufRead for BlockReader<R>
where
    R: std::io::BufRead,
{
    fn fill_buf(&mut self) -> std::io::Result<&[u8]> {
        loop {
            if !self.buffer.uncommitted().is_empty() || self.decoder.is_finished() {
                break;
            }

            if self.reached_eof {
                self.decoder.decode_eof(&mut self.buffer)?;
                continue;
            }

            let decodable = self.reader.fill_buf()?;
            if decodable.is_empty() {
                self.reached_eof = true;
                continue;
            }

            let consumed = self.decoder.decode(decodable, &mut self.buffer)?;
            self.reader.consume(consumed);
        }

        Ok(self.buffer.uncommitted())
    }

    fn consume(&mut self, amt: usize) {
        self.buffer.commit(amt);
    }
}

/// A builder that builds a [`BlockReader`] from the provided reader.
pub struct BlockReaderBuilder<R> {
    reader: R,
    position: BlockPosition,
    window_bits: WindowBits,
}

impl<R> BlockReaderBuilder<std::io::BufReader<R>> {
    fn new(reader: R) -> Self
    where
        R: std::io::Read,
    {
        let reader = std::io::BufReader::with_capacity(crate::buffer::BLOCK_BUFFER_SIZE, reader);
        BlockReaderBuilder::with_buffered(reader)
    }
}

impl<R> BlockReaderBuilder<R> {
    fn with_buffered(reader: R) -> Self {
        BlockReaderBuilder {
            reader,
            position: BlockPosition::Single,
            window_bits: WindowBits::DEFAULT,
        }
    }

    /// Set the position of the block within its concatenation. Defaults
    /// to [`BlockPosition::Single`].
    pub fn with_position(mut self, position: BlockPosition) -> Self {
        self.position = position;
        self
    }

    /// Set the window size the block was compressed with. Only used for
    /// `Middle` and `Last` blocks; a mismatch is not detected and produces
    /// garbage output or a [`Corrupt`](crate::BlockStreamError::Corrupt)
    /// error.
    pub fn with_window_bits(mut self, window_bits: WindowBits) -> Self {
        self.window_bits = window_bits;
        self
    }

    /// Build the reader.
    pub fn build(self) -> BlockReader<R> {
        let decoder = BlockDecoder::new(self.position, self.window_bits);
        let buffer = crate::buffer::FixedBuffer::new(vec![0; crate::buffer::BLOCK_BUFFER_SIZE]);

        BlockReader {
            reader: self.reader,
            decoder,
            buffer,
            reached_eof: false,
        }
    }
}
