use std::task::Poll;

use crate::{
    buffer::{BufferPool, FixedBuffer, PooledBuffer},
    encoder::BlockEncoder,
    guard::{Operation, OperationGuard},
    BlockOutcome, BlockPosition, CompressionOptions, Quality, WindowBits,
};

pin_project_lite::pin_project! {
    /// A writer that compresses a block of data to an underlying async
    /// writer. Works as either a `tokio` or `futures` writer if their
    /// respective features are enabled.
    ///
    /// For sync I/O support, see [`crate::BlockWriter`].
    ///
    /// ## Construction
    ///
    /// Create a builder using [`AsyncBlockWriter::builder`]. See
    /// [`AsyncBlockWriterBuilder`] for build options. Call
    /// [`AsyncBlockWriterBuilder::build`] to build the
    /// [`AsyncBlockWriter`] instance.
    ///
    /// ```
    /// # #[cfg(feature = "tokio")]
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// use tokio::io::AsyncWriteExt as _;
    /// use brotli_block::{AsyncBlockWriter, BlockPosition};
    ///
    /// let mut compressed = vec![];
    /// let mut writer = AsyncBlockWriter::builder(&mut compressed)
    ///     .with_position(BlockPosition::Last)
    ///     .build()?;
    /// writer.write_all(b"the end of a larger blob").await?;
    /// writer.shutdown().await?;
    /// # Ok(())
    /// # }
    /// # #[cfg(not(feature = "tokio"))]
    /// # fn main() { }
    /// ```
    ///
    /// ## Finishing
    ///
    /// Shutting down the writer (`poll_shutdown` for `tokio`, `poll_close`
    /// for `futures`) flushes the encoder, writes the terminator if the
    /// block's position needs one, then shuts down the underlying writer.
    /// The block is incomplete until shutdown finishes successfully: unlike
    /// [`crate::BlockWriter`], dropping an async writer can't finish the
    /// block. Writing after shutdown fails with
    /// [`BlockStreamError::Closed`](crate::BlockStreamError::Closed).
    ///
    /// ## Concurrent operations
    ///
    /// Only one operation may be in progress at a time. If a write, flush,
    /// or shutdown returns [`Poll::Pending`], polling a different operation
    /// before the first one completes fails with
    /// [`BlockStreamError::OperationInProgress`](crate::BlockStreamError::OperationInProgress).
    /// If an operation is cancelled partway through, the writer should be
    /// discarded rather than reused.
    ///
    /// The working buffer is rented from [`BufferPool::shared`] and
    /// returned to it when the writer is dropped.
    pub struct AsyncBlockWriter<W> {
        #[pin]
        writer: W,
        encoder: BlockEncoder,
        buffer: FixedBuffer<PooledBuffer>,
        guard: OperationGuard,
    }
}

impl<W> AsyncBlockWriter<W> {
    pub fn builder(writer: W) -> AsyncBlockWriterBuilder<W> {
        AsyncBlockWriterBuilder::new(writer)
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

    /// Unwrap this writer, returning the underlying writer. Call this after
    /// shutting down, otherwise any buffered data is lost and the block
    /// will be incomplete.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[cfg_attr(not(any(feature = "tokio", feature = "futures")), allow(dead_code))]
impl<W> AsyncBlockWriter<W> {
    fn poll_guarded<T>(
        mut self: std::pin::Pin<&mut Self>,
        operation: Operation,
        poll_operation: impl FnOnce(std::pin::Pin<&mut Self>) -> Poll<std::io::Result<T>>,
    ) -> Poll<std::io::Result<T>> {
        if let Err(error) = self.as_mut().project().guard.begin(operation) {
            return Poll::Ready(Err(error));
        }

        let poll = poll_operation(self.as_mut());
        self.project().guard.track(operation, poll)
    }

    fn poll_encode(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
        data: &[u8],
        mut flush_uncommitted: impl FnMut(
            std::pin::Pin<&mut Self>,
            &mut std::task::Context<'_>,
        ) -> Poll<std::io::Result<()>>,
    ) -> Poll<std::io::Result<usize>> {
        loop {
            ready!(flush_uncommitted(self.as_mut(), cx))?;

            let this = self.as_mut().project();

            let outcome = this.encoder.encode(data, this.buffer)?;

            match outcome {
                BlockOutcome::HasMore { .. } => {}
                BlockOutcome::Complete(consumed) => {
                    return Poll::Ready(Ok(consumed));
                }
            }
        }
    }

    fn poll_flush_encoder(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
        mut flush_uncommitted: impl FnMut(
            std::pin::Pin<&mut Self>,
            &mut std::task::Context<'_>,
        ) -> Poll<std::io::Result<()>>,
    ) -> Poll<std::io::Result<()>> {
        loop {
            ready!(flush_uncommitted(self.as_mut(), cx))?;

            let this = self.as_mut().project();

            let outcome = this.encoder.flush(this.buffer)?;

            match outcome {
                BlockOutcome::HasMore { .. } => {}
                BlockOutcome::Complete(_) => {
                    break;
                }
            }
        }

        flush_uncommitted(self, cx)
    }

    fn poll_finish_encoder(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
        mut flush_uncommitted: impl FnMut(
            std::pin::Pin<&mut Self>,
            &mut std::task::Context<'_>,
        ) -> Poll<std::io::Result<()>>,
    ) -> Poll<std::io::Result<()>> {
        loop {
            ready!(flush_uncommitted(self.as_mut(), cx))?;

            let this = self.as_mut().project();

            let outcome = this.encoder.finish(this.buffer)?;

            match outcome {
                BlockOutcome::HasMore { .. } => {}
                BlockOutcome::Complete(_) => {
                    break;
                }
            }
        }

        flush_uncommitted(self, cx)
    }

    #[cfg(feature = "tokio")]
    fn flush_uncommitted_tokio(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> Poll<Result<(), std::io::Error>>
    where
        W: tokio::io::AsyncWrite,
    {
        use crate::buffer::Buffer as _;

        let mut this = self.project();

        loop {
            let uncommitted = this.buffer.uncommitted();
            if uncommitted.is_empty() {
                return Poll::Ready(Ok(()));
            }

            let committed = ready!(this.writer.as_mut().poll_write(cx, uncommitted))?;
            this.buffer.commit(committed);

            if committed == 0 {
                return Poll::Ready(Err(std::io::Error::new(
                    std::io::ErrorKind::WriteZero,
                    "failed to write buffered data",
                )));
            }
        }
    }

    #[cfg(feature = "futures")]
    fn flush_uncommitted_futures(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> Poll<Result<(), std::io::Error>>
    where
        W: futures::AsyncWrite,
    {
        use crate::buffer::Buffer as _;

        let mut this = self.project();

        loop {
            let uncommitted = this.buffer.uncommitted();
            if uncommitted.is_empty() {
                return Poll::Ready(Ok(()));
            }

            let committed = ready!(this.writer.as_mut().poll_write(cx, uncommitted))?;
            this.buffer.commit(committed);

            if committed == 0 {
                return Poll::Ready(Err(std::io::Error::new(
                    std::io::ErrorKind::WriteZero,
                    "failed to write buffered data",
                )));
            }
        }
    }
}

#[cfg(feature = "tokio")]
impl<W> tokio::io::AsyncWrite for AsyncBlockWriter<W>
where
    W: tokio::io::AsyncWrite,
{
    fn poll_write(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
        data: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        self.poll_guarded(Operation::Write, |this| {
            this.poll_encode(cx, data, Self::flush_uncommitted_tokio)
        })
    }

    fn poll_flush(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> Poll<std::io::Result<()>> {
        self.poll_guarded(Operation::Flush, |mut this| {
            ready!(this
                .as_mut()
                .poll_flush_encoder(cx, Self::flush_uncommitted_tokio))?;

            this.project().writer.poll_flush(cx)
        })
    }

    fn poll_shutdown(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> Poll<std::io::Result<()>> {
        self.poll_guarded(Operation::Shutdown, |mut this| {
            ready!(this
                .as_mut()
                .poll_finish_encoder(cx, Self::flush_uncommitted_tokio))?;

            this.project().writer.poll_shutdown(cx)
        })
    }
}

#[cfg(feature = "futures")]
impl<W> futures::AsyncWrite for AsyncBlockWriter<W>
where
    W: futures::AsyncWrite,
{
    fn poll_write(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
        data: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        self.poll_guarded(Operation::Write, |this| {
            this.poll_encode(cx, data, Self::flush_uncommitted_futures)
        })
    }

    fn poll_flush(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> Poll<std::io::Result<()>> {
        self.poll_guarded(Operation::Flush, |mut this| {
            ready!(this
                .as_mut()
                .poll_flush_encoder(cx, Self::flush_uncommitted_futures))?;

            this.project().writer.poll_flush(cx)
        })
    }

    fn poll_close(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> Poll<std::io::Result<()>> {
        self.poll_guarded(Operation::Shutdown, |mut this| {
            ready!(this
                .as_mut()
                .poll_finish_encoder(cx, Self::flush_uncommitted_futures))?;

            this.project().writer.poll_close(cx)
        })
    }
}

/// A builder that builds an [`AsyncBlockWriter`] from the provided writer.
pub struct AsyncBlockWriterBuilder<W> {
    writer: W,
    position: BlockPosition,
    options: CompressionOptions,
}

impl<W> AsyncBlockWriterBuilder<W> {
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

    /// Build the writer, renting its working buffer from the shared pool.
    pub fn build(self) -> std::io::Result<AsyncBlockWriter<W>> {
        let encoder = BlockEncoder::new(self.position, self.options)?;
        let buffer = FixedBuffer::new(BufferPool::shared().rent());

        Ok(AsyncBlockWriter {
            writer: self.writer,
            encoder,
            buffer,
            guard: OperationGuard::default(),
        })
    }
}
