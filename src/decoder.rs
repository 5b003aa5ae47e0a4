use brotli::{writer::StandardAlloc, BrotliResult, BrotliState};

use crate::{buffer::Buffer, fragments, BlockPosition, BlockStreamError, WindowBits};

/// The decompressing half of a block stream. Feeds compressed data through
/// a Brotli decoder into a [`Buffer`], injecting the synthetic start and
/// end fragments that the block's position leaves out.
pub struct BlockDecoder {
    decoder: Box<BrotliState<StandardAlloc, StandardAlloc, StandardAlloc>>,
    position: BlockPosition,
    window_bits: WindowBits,
    input: BlockDecoderInput,
    finished: bool,
}

impl BlockDecoder {
    /// Create a decoder for a block at `position`. `window_bits` must match
    /// the value the block was compressed with; it's only used to prime
    /// `Middle` and `Last` blocks, since other positions carry their own
    /// header.
    pub fn new(position: BlockPosition, window_bits: WindowBits) -> Self {
        let input = if position.needs_start_fragment() {
            BlockDecoderInput::StartFragment { consumed: 0 }
        } else {
            BlockDecoderInput::Source
        };

        Self {
            decoder: Box::new(BrotliState::new(
                StandardAlloc::default(),
                StandardAlloc::default(),
                StandardAlloc::default(),
            )),
            position,
            window_bits,
            input,
            finished: false,
        }
    }

    /// Returns true once the Brotli decoder has seen the end of the stream.
    /// No more data will be written to the buffer after this.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Decode data read from the underlying source. Returns the number of
    /// bytes consumed from `data`, which may be 0 (e.g. while the start
    /// fragment is still being fed to the decoder, or if the buffer is full).
    pub fn decode(&mut self, data: &[u8], buffer: &mut impl Buffer) -> std::io::Result<usize> {
        match self.input {
            BlockDecoderInput::StartFragment { consumed } => {
                self.decode_start_fragment(consumed, buffer)?;
                Ok(0)
            }
            BlockDecoderInput::Source => {
                let (consumed, _) = self.run(data, buffer)?;
                Ok(consumed)
            }
            BlockDecoderInput::EndFragment { .. } | BlockDecoderInput::Draining => Ok(0),
        }
    }

    /// Make progress after the underlying source has been exhausted: feed
    /// any remaining synthetic fragments and drain the decoder. Each call
    /// either writes to the buffer, advances the decoder, or fails.
    ///
    /// Fails with [`BlockStreamError::Truncated`] if the decoder can't reach
    /// the end of the stream.
    pub fn decode_eof(&mut self, buffer: &mut impl Buffer) -> std::io::Result<()> {
        match self.input {
            BlockDecoderInput::StartFragment { consumed } => {
                self.decode_start_fragment(consumed, buffer)?;
            }
            BlockDecoderInput::Source => {
                self.input = if self.position.needs_end_fragment() {
                    BlockDecoderInput::EndFragment { consumed: 0 }
                } else {
                    BlockDecoderInput::Draining
                };
            }
            BlockDecoderInput::EndFragment { consumed } => {
                let (decoded, _) = self.run(&fragments::END_FRAGMENT[consumed..], buffer)?;
                let consumed = consumed + decoded;

                self.input = if consumed == fragments::END_FRAGMENT.len() {
                    tracing::trace!(position = %self.position, "fed end fragment to decoder");
                    BlockDecoderInput::Draining
                } else {
                    BlockDecoderInput::EndFragment { consumed }
                };
            }
            BlockDecoderInput::Draining => {
                let (_, written) = self.run(&[], buffer)?;
                if !self.finished && written == 0 {
                    tracing::debug!(
                        position = %self.position,
                        window_bits = self.window_bits.get(),
                        "brotli block ended before the end of the stream"
                    );
                    return Err(BlockStreamError::Truncated.into());
                }
            }
        }

        Ok(())
    }

    fn decode_start_fragment(
        &mut self,
        consumed: usize,
        buffer: &mut impl Buffer,
    ) -> std::io::Result<()> {
        let start_fragment = fragments::start_fragment(self.window_bits);
        let (decoded, _) = self.run(&start_fragment[consumed..], buffer)?;
        let consumed = consumed + decoded;

        self.input = if consumed == start_fragment.len() {
            tracing::trace!(
                position = %self.position,
                window_bits = self.window_bits.get(),
                "fed start fragment to decoder"
            );
            BlockDecoderInput::Source
        } else {
            BlockDecoderInput::StartFragment { consumed }
        };

        Ok(())
    }

    /// Run one step of the Brotli decoder, writing its output into
    /// `buffer`. Returns the number of bytes consumed from `input` and the
    /// number of bytes written to `buffer`.
    fn run(&mut self, input: &[u8], buffer: &mut impl Buffer) -> std::io::Result<(usize, usize)> {
        let mut available_in = input.len();
        let mut input_offset = 0;
        let output = buffer.writable();
        let mut available_out = output.len();
        let mut output_offset = 0;
        let mut total_out = 0;

        let result = brotli::BrotliDecompressStream(
            &mut available_in,
            &mut input_offset,
            input,
            &mut available_out,
            &mut output_offset,
            output,
            &mut total_out,
            &mut self.decoder,
        );
        buffer.written(output_offset);

        match result {
            BrotliResult::ResultSuccess => {
                self.finished = true;
            }
            BrotliResult::NeedsMoreInput | BrotliResult::NeedsMoreOutput => {}
            BrotliResult::ResultFailure => {
                tracing::debug!(
                    position = %self.position,
                    window_bits = self.window_bits.get(),
                    "failed to decode brotli block"
                );
                return Err(BlockStreamError::Corrupt.into());
            }
        }

        Ok((input_offset, output_offset))
    }
}

/// Where the decoder is currently taking its input from.
#[derive(Debug, Clone, Copy)]
enum BlockDecoderInput {
    StartFragment { consumed: usize },
    Source,
    EndFragment { consumed: usize },
    Draining,
}
