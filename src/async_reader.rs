use crate::{
    buffer::{BufferPool, FixedBuffer, PooledBuffer},
    decoder::BlockDecoder,
    BlockPosition, WindowBits,
};

pin_project_lite::pin_project! {
    /// A reader that decompresses a block from an underlying async reader.
    /// Works as either a `tokio` or `futures` reader if their respective
    /// features are enabled.
    ///
    /// The underlying reader `R` should implement the following traits:
    ///
    /// - `tokio`: [`tokio::io::AsyncBufRead`] (required for [`tokio::io::AsyncRead`] and [`tokio::io::AsyncBufRead`] impls)
    /// - `futures`: [`futures::AsyncBufRead`] (required for [`futures::AsyncRead`] and [`futures::AsyncBufRead`] impls)
    ///
    /// For sync I/O support, see [`crate::BlockReader`].
    ///
    /// ## Construction
    ///
    /// Create a builder using [`AsyncBlockReader::builder_tokio`] (recommended
    /// for `tokio`) or [`AsyncBlockReader::builder_futures`] (recommended for
    /// `futures`); or use [`AsyncBlockReader::builder_buffered`] to use a
    /// custom buffer for either. See [`AsyncBlockReaderBuilder`] for build
    /// options. Call [`AsyncBlockReaderBuilder::build`] to build the
    /// [`AsyncBlockReader`] instance.
    ///
    /// ```
    /// # #[cfg(feature = "tokio")]
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// # let compressed_block: &[u8] = &[];
    /// // Tokio example
    /// let reader = brotli_block::AsyncBlockReader::builder_tokio(compressed_block)
    ///     .with_position(brotli_block::BlockPosition::Middle)
    ///     .with_window_bits(brotli_block::WindowBits::new(24)?)
    ///     .build();
    /// # Ok(())
    /// # }
    /// # #[cfg(not(feature = "tokio"))]
    /// # fn main() { }
    /// ```
    ///
    /// ```
    /// # #[cfg(feature = "futures")]
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// # let compressed_block: &[u8] = &[];
    /// // futures example
    /// let reader = brotli_block::AsyncBlockReader::builder_futures(compressed_block)
    ///     .build();
    /// # Ok(())
    /// # }
    /// # #[cfg(not(feature = "futures"))]
    /// # fn main() { }
    /// ```
    ///
    /// ## Buffering
    ///
    /// The decompressed output is buffered in a working buffer rented from
    /// [`BufferPool::shared`], which is returned when the reader is dropped.
    /// Since the reader must also implement [`tokio::io::AsyncBufRead`] /
    /// [`futures::AsyncBufRead`], the compressed input must also be buffered.
    ///
    /// If a read is cancelled partway through, the reader should be
    /// discarded rather than reused.
    pub struct AsyncBlockReader<R> {
        #[pin]
        reader: R,
        decoder: BlockDecoder,
        buffer: FixedBuffer<PooledBuffer>,
        reached_eof: bool,
    }
}

impl<R> AsyncBlockReader<R> {
    /// Create a new block reader that decompresses a block from the
    /// underlying Tokio reader. The provided reader will be wrapped with
    /// an appropriately-sized buffer.
    #[cfg(feature = "tokio")]
    pub fn builder_tokio(reader: R) -> AsyncBlockReaderBuilder<tokio::io::BufReader<R>>
    where
        R: tokio::io::AsyncRead,
    {
        AsyncBlockReaderBuilder::new_tokio(reader)
    }

    /// Create a new block reader that decompresses a block from the
    /// underlying `futures` reader. The provided reader will be wrapped
    /// with an appropriately-sized buffer.
    #[cfg(feature = "futures")]
    pub fn builder_futures(reader: R) -> AsyncBlockReaderBuilder<futures::io::BufReader<R>>
    where
        R: futures::AsyncRead,
    {
        AsyncBlockReaderBuilder::new_futures(reader)
    }

    /// Create a new block reader that decompresses a block from the
    /// underlying reader. The underlying reader must implement either
    /// [`tokio::io::AsyncBufRead`] or [`futures::AsyncBufRead`], and its
    /// buffer will be used directly.
    pub fn builder_buffered(reader: R) -> AsyncBlockReaderBuilder<R> {
        AsyncBlockReaderBuilder::with_buffered(reader)
    }

    pub fn get_ref(&self) -> &R {
        &self.reader
    }

    /// Unwrap this reader, returning the underlying reader. Any buffered
    /// decompressed data is lost.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

#[cfg(feature = "tokio")]
impl<R> tokio::io::AsyncBufRead for AsyncBlockReader<R>
where
    R: tokio::io::AsyncBufRead,
{
    fn poll_fill_buf(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::io::Result<&[u8]>> {
        use crate::buffer::Buffer as _;

        loop {
            let mut this = self.as_mut().project();

            if !this.buffer.uncommitted().is_empty() || this.decoder.is_finished() {
                break;
            }

            if *this.reached_eof {
                this.decoder.decode_eof(this.buffer)?;
                continue;
            }

            let decodable = ready!(this.reader.as_mut().poll_fill_buf(cx))?;
            if decodable.is_empty() {
                *this.reached_eof = true;
                continue;
            }

            let consumed = this.decoder.decode(decodable, this.buffer)?;
            this.reader.consume(consumed);
        }

        std::task::Poll::Ready(Ok(self.project().buffer.uncommitted()))
    }

    fn consume(self: std::pin::Pin<&mut Self>, amt: usize) {
        use crate::buffer::Buffer as _;

        self.project().buffer.commit(amt);
    }
}

#[cfg(feature = "tokio")]
impl<R> tokio::io::AsyncRead for AsyncBlockReader<R>
where
    R: tokio::io::AsyncBufRead,
{
    fn poll_read(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
        buf: &mut tokio::io::ReadBuf<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        use tokio::io::AsyncBufRead as _;

        if buf.remaining() == 0 {
            return std::task::Poll::Ready(Ok(()));
        }

        let filled = ready!(self.as_mut().poll_fill_buf(cx))?;
        let consumable = filled.len().min(buf.remaining());
        buf.put_slice(&filled[..consumable]);
        self.consume(consumable);
        std::task::Poll::Ready(Ok(()))
    }
}

#[cfg(feature = "futures")]
impl<R> futures::AsyncBufRead for AsyncBlockReader<R>
where
    R: futures::AsyncBufRead,
{
    fn poll_fill_buf(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::io::Result<&[u8]>> {
        use crate::buffer::Buffer as _;

        loop {
            let mut this = self.as_mut().project();

            if !this.buffer.uncommitted().is_empty() || this.decoder.is_finished() {
                break;
            }

            if *this.reached_eof {
                this.decoder.decode_eof(this.buffer)?;
                continue;
            }

            let decodable = ready!(this.reader.as_mut().poll_fill_buf(cx))?;
            if decodable.is_empty() {
                *this.reached_eof = true;
                continue;
            }

            let consumed = this.decoder.decode(decodable, this.buffer)?;
            this.reader.consume(consumed);
        }

        std::task::Poll::Ready(Ok(self.project().buffer.uncommitted()))
    }

    fn consume(self: std::pin::Pin<&mut Self>, amt: usize) {
        use crate::buffer::Buffer as _;

        self.project().buffer.commit(amt);
    }
}

#[cfg(feature = "futures")]
impl<R> futures::AsyncRead for AsyncBlockReader<R>
where
    R: futures::AsyncBufRead,
{
    fn poll_read(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
        buf: &mut [u8],
    ) -> std::task::Poll<std::io::Result<usize>> {
        use futures::AsyncBufRead as _;

        if buf.is_empty() {
            return std::task::Poll::Ready(Ok(0));
        }

        let filled = ready!(self.as_mut().poll_fill_buf(cx))?;
        let consumable = filled.len().min(buf.len());
        buf[..consumable].copy_from_slice(&filled[..consumable]);
        self.consume(consumable);
        std::task::Poll::Ready(Ok(consumable))
    }
}

/// A builder that builds an [`AsyncBlockReader`] from the provided reader.
pub struct AsyncBlockReaderBuilder<R> {
    reader: R,
    position: BlockPosition,
    window_bits: WindowBits,
}

#[cfg(feature = "tokio")]
impl<R> AsyncBlockReaderBuilder<tokio::io::BufReader<R>> {
    fn new_tokio(reader: R) -> Self
    where
        R: tokio::io::AsyncRead,
    {
        let reader = tokio::io::BufReader::with_capacity(crate::buffer::BLOCK_BUFFER_SIZE, reader);
        AsyncBlockReaderBuilder::with_buffered(reader)
    }
}

#[cfg(feature = "futures")]
impl<R> AsyncBlockReaderBuilder<futures::io::BufReader<R>> {
    fn new_futures(reader: R) -> Self
    where
        R: futures::AsyncRead,
    {
        let reader =
            futures::io::BufReader::with_capacity(crate::buffer::BLOCK_BUFFER_SIZE, reader);
        AsyncBlockReaderBuilder::with_buffered(reader)
    }
}

impl<R> AsyncBlockReaderBuilder<R> {
    fn with_buffered(reader: R) -> Self {
        AsyncBlockReaderBuilder {
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
    /// `Middle` and `Last` blocks.
    pub fn with_window_bits(mut self, window_bits: WindowBits) -> Self {
        self.window_bits = window_bits;
        self
    }

    /// Build the reader, renting its working buffer from the shared pool.
    pub fn build(self) -> AsyncBlockReader<R> {
        let decoder = BlockDecoder::new(self.position, self.window_bits);
        let buffer = FixedBuffer::new(BufferPool::shared().rent());

        AsyncBlockReader {
            reader: self.reader,
            decoder,
            buffer,
            reached_eof: false,
        }
    }
}
