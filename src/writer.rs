use crate::{
    buffer::Buffer as _, encoder::BlockEncoder, BlockOutcome, BlockPosition, CompressionOptions,
    Quality, WindowBits,
};

/// A writer that compresses a block of data to an underlying writer.
///
/// The compressed output is framed for the block's [`BlockPosition`]:
/// blocks for `First`, `Middle`..., `Last` can be written independently and
/// concatenated afterwards into one valid Brotli stream. For async support,
/// see [`crate::AsyncBlockWriter`].
///
/// ## Construction
///
/// Create a builder using [`BlockWriter::builder`]. See
/// [`BlockWriterBuilder`] for build options. Call
/// [`BlockWriterBuilder::build`] to build the [`BlockWriter`] instance.
///
/// ```
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use std::io::Write as _;
/// use brotli_block::{BlockPosition, BlockWriter, WindowBits};
///
/// let mut compressed = vec![];
/// let mut writer = BlockWriter::builder(&mut compressed)
///     .with_position(BlockPosition::First)
///     .with_window_bits(WindowBits::new(24)?)
///     .build()?;
/// writer.write_all(b"the first chunk of a larger blob")?;
/// writer.finish()?;
/// # Ok(())
/// # }
/// ```
///
/// ## Finishing
///
/// Call [`BlockWriter::finish`] once all data has been written. This flushes
/// the encoder and writes the terminator if the block's position needs one.
/// If the writer is dropped without calling `finish`, it will finish
/// the block on a best-effort basis, but any error will be lost.
///
/// To keep using the underlying writer afterwards, pass a mutable
/// reference to it (`&mut W` also implements [`std::io::Write`]).
pub struct BlockWriter<W>
where
    W: std::io::Write,
{
    writer: W,
    encoder: BlockEncoder,
    buffer: crate::buffer::FixedBuffer<Vec<u8>>,
}

impl<W> BlockWriter<W>
where
    W: std::io::Write,
{
    pub fn builder(writer: W) -> BlockWriterBuilder<W> {
        BlockWriterBuilder::new(writer)
    }

    /// Get a reference to the underlying writer.
    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    /// Get a mutable reference to the underlying writer. Writing to it
    /// directly will corrupt the block.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    /// Finish the block: flush all buffered data, write the terminator if
    /// the block's position needs one, then flush the underlying writer.
    /// After this, any further writes will fail.
    ///
    /// Calling `finish` again once it has succeeded does nothing.
    pub fn finish(&mut self) -> std::io::Result<()> {
        loop {
            self.flush_uncommitted()?;

            let outcome = self.encoder.finish(&mut self.buffer)?;

            match outcome {
                BlockOutcome::HasMore { .. } => {}
                BlockOutcome::Complete(_) => {
                    break;
                }
            }
        }

        self.flush_uncommitted()?;
        self.writer.flush()
    }

    fn flush_uncommitted(&mut self) -> std::io::Result<()> {
        loop {
            let uncommitted = self.buffer.uncommitted();
            if uncommitted.is_empty() {
                return Ok(());
            }

            let committed = self.writer.write(uncommitted)?;
            self.buffer.commit(committed);

            if committed == 0 {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::WriteZero,
                    "failed to write buffered data",
                ));
            }
        }
    }
}

impl<W> std::io::Write for BlockWriter<W>
where
    W: std::io::Write,
{
    fn write(&mut self, data: &[u8]) -> Result<usize, std::io::Error> {
        loop {
            self.flush_uncommitted()?;

            let outcome = self.encoder.encode(data, &mut self.buffer)?;

            match outcome {
                BlockOutcome::HasMore { .. } => {}
                BlockOutcome::Complete(consumed) => {
                    return Ok(consumed);
                }
            }
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        loop {
            self.flush_uncommitted()?;

            let outcome = self.encoder.flush(&mut self.buffer)?;

            match outcome {
                BlockOutcome::HasMore { .. } => {}
                BlockOutcome::Complete(_) => {
                    break;
                }
            }
        }

        self.flush_uncommitted()?;
        self.writer.flush()
    }
}

impl<W> Drop for BlockWriter<W>
where
    W: std::io::Write,
{
    fn drop(&mut self) {
        if self.encoder.is_finished() {
            return;
        }

        if let Err(error) = self.finish() {
            tracing::warn!(%error, "failed to finish brotli block on drop");
        }
    }
}

/// A builder that builds a [`BlockWriter`] from the provided writer.
pub struct BlockWriterBuilder<W> {
    writer: W,
    position: BlockPosition,
    options: CompressionOptions,
}

impl<W> BlockWriterBuilder<W> {
    fn new(writer: W) -> Self {
        Self {
            writer,
            position: BlockPosition::Single,
            options: CompressionOptions::default(),
        }
    }

    /// Set the position of the block within its concatenation. Defaults
    /// to [`BlockPosition::Single`].
    pub fn with_position(mut self, position: BlockPosition) -> Self {
        self.position = position;
        self
    }

    /// Replace all compression options. For positions other than
    /// [`BlockPosition::Single`], only the quality and window bits are used.
    pub fn with_options(mut self, options: CompressionOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the compression quality. Blocks other than
    /// [`BlockPosition::Single`] are compressed with a quality of at least 2.
    pub fn with_quality(mut self, quality: Quality) -> Self {
        self.options = self.options.with_quality_level(quality);
        self
    }

    /// Set the window size. For `Middle` and `Last` blocks, the same value
    /// must be used again to decompress the block.
    pub fn with_window_bits(mut self, window_bits: WindowBits) -> Self {
        self.options = self.options.with_window(window_bits);
        self
    }

    /// Build the writer.
    pub fn build(self) -> std::io::Result<BlockWriter<W>>
    where
        W: std::io::Write,
    {
        let encoder = BlockEncoder::new(self.position, self.options)?;
        let buffer = crate::buffer::FixedBuffer::new(vec![0; crate::buffer::BLOCK_BUFFER_SIZE]);

        Ok(BlockWriter {
            writer: self.writer,
            encoder,
            buffer,
        })
    }
}
