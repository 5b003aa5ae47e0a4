use brotli::enc::{
    encode::{BrotliEncoderOperation, BrotliEncoderParameter, BrotliEncoderStateStruct},
    interface, StandardAlloc,
};

use crate::{
    buffer::Buffer, fragments, options::CompressionOptions, BlockOutcome, BlockPosition,
    BlockStreamError,
};

const MIN_BARE_QUALITY: u32 = 2;

/// The compressing half of a block stream. Feeds data through a Brotli
/// encoder into a [`Buffer`], and surrounds the encoder's output with the
/// start and end fragments required by the block's position.
pub struct BlockEncoder {
    encoder: BrotliEncoderStateStruct<StandardAlloc>,
    position: BlockPosition,
    start_fragment: &'static [u8],
    end_fragment: &'static [u8],
    state: BlockEncoderState,
    consumed_bytes: u64,
    produced_bytes: u64,
}

impl BlockEncoder {
    /// Create an encoder for a block at `position`.
    ///
    /// `Single` blocks use `options` as-is. Every other position is encoded
    /// as a bare segment using the quality and window bits from `options`,
    /// with the start fragment written first for `First` blocks and the end
    /// fragment written last for `Last` blocks.
    pub fn new(position: BlockPosition, options: CompressionOptions) -> std::io::Result<Self> {
        let (options, start_fragment, end_fragment) = match position {
            BlockPosition::Single => (options, &[][..], &[][..]),
            BlockPosition::First | BlockPosition::Middle | BlockPosition::Last => {
                let start_fragment = if position.has_start_fragment() {
                    fragments::start_fragment(options.window_bits())
                } else {
                    &[]
                };
                let end_fragment = if position.has_end_fragment() {
                    fragments::END_FRAGMENT
                } else {
                    &[]
                };

                (options.to_bare_segment(), start_fragment, end_fragment)
            }
        };

        // The one-pass and two-pass qualities widen the window to at least
        // 18 bits, which a segment without a header can't signal
        let quality = if options.bare() {
            options.quality().get().max(MIN_BARE_QUALITY)
        } else {
            options.quality().get()
        };

        let mut encoder = BrotliEncoderStateStruct::new(StandardAlloc::default());
        let params = [
            (BrotliEncoderParameter::BROTLI_PARAM_QUALITY, quality),
            (BrotliEncoderParameter::BROTLI_PARAM_LGWIN, options.window_bits().get()),
            (BrotliEncoderParameter::BROTLI_PARAM_CATABLE, options.catable().into()),
            (BrotliEncoderParameter::BROTLI_PARAM_APPENDABLE, options.appendable().into()),
            (BrotliEncoderParameter::BROTLI_PARAM_BYTE_ALIGN, options.byte_align().into()),
            (BrotliEncoderParameter::BROTLI_PARAM_BARE_STREAM, options.bare().into()),
            (BrotliEncoderParameter::BROTLI_PARAM_MAGIC_NUMBER, options.magic_number().into()),
        ];
        for (param, value) in params {
            if !encoder.set_parameter(param, value) {
                return Err(BlockStreamError::EncoderFailed.into());
            }
        }

        let state = if start_fragment.is_empty() {
            BlockEncoderState::Encoding
        } else {
            BlockEncoderState::WritingStartFragment { copied: 0 }
        };

        Ok(Self {
            encoder,
            position,
            start_fragment,
            end_fragment,
            state,
            consumed_bytes: 0,
            produced_bytes: 0,
        })
    }

    /// Returns true once the final block data (including any end fragment)
    /// has been written to the buffer.
    pub fn is_finished(&self) -> bool {
        matches!(self.state, BlockEncoderState::Finished)
    }

    fn write_start_fragment(&mut self, buffer: &mut impl Buffer) -> BlockOutcome<()> {
        if let BlockEncoderState::WritingStartFragment { mut copied } = self.state {
            let outcome = crate::buffer::copy_fragment(self.start_fragment, &mut copied, buffer);
            self.state = match outcome {
                BlockOutcome::Complete(()) => {
                    self.produced_bytes += u64::try_from(self.start_fragment.len())
                        .expect("fragment length fits in u64");
                    tracing::trace!(
                        position = %self.position,
                        len = self.start_fragment.len(),
                        "wrote start fragment"
                    );
                    BlockEncoderState::Encoding
                }
                BlockOutcome::HasMore { .. } => BlockEncoderState::WritingStartFragment { copied },
            };

            outcome
        } else {
            BlockOutcome::Complete(())
        }
    }

    pub fn encode(
        &mut self,
        data: &[u8],
        buffer: &mut impl Buffer,
    ) -> std::io::Result<BlockOutcome<usize>> {
        match self.state {
            BlockEncoderState::WritingStartFragment { .. } | BlockEncoderState::Encoding => {}
            BlockEncoderState::Finishing
            | BlockEncoderState::WritingEndFragment { .. }
            | BlockEncoderState::Finished => {
                return Err(BlockStreamError::Closed.into());
            }
        }

        complete_ok!(self.write_start_fragment(buffer));

        let (consumed, produced) =
            self.run(BrotliEncoderOperation::BROTLI_OPERATION_PROCESS, data, buffer)?;

        // The encoder stops consuming input when the buffer fills up with
        // pending output, so report that there's more to do once the buffer
        // has been drained
        if consumed == 0 && produced > 0 && !data.is_empty() {
            return Ok(BlockOutcome::HasMore {
                remaining_bytes: data.len(),
            });
        }

        Ok(BlockOutcome::Complete(consumed))
    }

    pub fn flush(&mut self, buffer: &mut impl Buffer) -> std::io::Result<BlockOutcome<()>> {
        match self.state {
            BlockEncoderState::WritingStartFragment { .. } | BlockEncoderState::Encoding => {}
            BlockEncoderState::Finishing
            | BlockEncoderState::WritingEndFragment { .. }
            | BlockEncoderState::Finished => {
                return Err(BlockStreamError::Closed.into());
            }
        }

        complete_ok!(self.write_start_fragment(buffer));

        self.run(BrotliEncoderOperation::BROTLI_OPERATION_FLUSH, &[], buffer)?;

        if self.encoder.has_more_output() {
            Ok(BlockOutcome::HasMore { remaining_bytes: 1 })
        } else {
            Ok(BlockOutcome::Complete(()))
        }
    }

    /// Write the final block data: the encoder's remaining output, followed
    /// by the end fragment if the block's position requires one. Once this
    /// returns [`Complete`](BlockOutcome::Complete), the block is done and
    /// calling it again is a no-op.
    pub fn finish(&mut self, buffer: &mut impl Buffer) -> std::io::Result<BlockOutcome<()>> {
        loop {
            match self.state {
                BlockEncoderState::WritingStartFragment { .. } => {
                    complete_ok!(self.write_start_fragment(buffer));
                }
                BlockEncoderState::Encoding => {
                    self.state = BlockEncoderState::Finishing;
                }
                BlockEncoderState::Finishing => {
                    self.run(BrotliEncoderOperation::BROTLI_OPERATION_FINISH, &[], buffer)?;

                    if !self.encoder.is_finished() {
                        return Ok(BlockOutcome::HasMore { remaining_bytes: 1 });
                    }

                    if self.end_fragment.is_empty() {
                        self.finished();
                    } else {
                        self.state = BlockEncoderState::WritingEndFragment { copied: 0 };
                    }
                }
                BlockEncoderState::WritingEndFragment { mut copied } => {
                    let outcome =
                        crate::buffer::copy_fragment(self.end_fragment, &mut copied, buffer);
                    self.state = BlockEncoderState::WritingEndFragment { copied };
                    complete_ok!(outcome);

                    self.produced_bytes += u64::try_from(self.end_fragment.len())
                        .expect("fragment length fits in u64");
                    self.finished();
                }
                BlockEncoderState::Finished => {
                    return Ok(BlockOutcome::Complete(()));
                }
            }
        }
    }

    fn finished(&mut self) {
        self.state = BlockEncoderState::Finished;

        tracing::debug!(
            position = %self.position,
            consumed_bytes = self.consumed_bytes,
            produced_bytes = self.produced_bytes,
            "finished compressing block"
        );
    }

    /// Run one step of the Brotli encoder, writing its output into
    /// `buffer`. Returns the number of bytes consumed from `input` and the
    /// number of bytes written to `buffer`.
    fn run(
        &mut self,
        op: BrotliEncoderOperation,
        input: &[u8],
        buffer: &mut impl Buffer,
    ) -> std::io::Result<(usize, usize)> {
        let mut nop_callback =
            |_data: &mut interface::PredictionModeContextMap<interface::InputReferenceMut>,
             _cmds: &mut [interface::StaticCommand],
             _mb: interface::InputPair,
             _alloc: &mut StandardAlloc| ();

        let mut available_in = input.len();
        let mut input_offset = 0;
        let output = buffer.writable();
        let mut available_out = output.len();
        let mut output_offset = 0;
        let mut total_out = None;

        let succeeded = self.encoder.compress_stream(
            op,
            &mut available_in,
            input,
            &mut input_offset,
            &mut available_out,
            output,
            &mut output_offset,
            &mut total_out,
            &mut nop_callback,
        );
        buffer.written(output_offset);

        if !succeeded {
            tracing::debug!(position = %self.position, "brotli encoder failed");
            return Err(BlockStreamError::EncoderFailed.into());
        }

        self.consumed_bytes += u64::try_from(input_offset).expect("input size fits in u64");
        self.produced_bytes += u64::try_from(output_offset).expect("output size fits in u64");

        Ok((input_offset, output_offset))
    }
}

enum BlockEncoderState {
    WritingStartFragment { copied: usize },
    Encoding,
    Finishing,
    WritingEndFragment { copied: usize },
    Finished,
}

#[cfg(test)]
mod tests {
    use super::BlockEncoder;
    use crate::{
        buffer::{Buffer as _, FixedBuffer},
        fragments, BlockOutcome, BlockPosition, BlockStreamError, CompressionOptions, WindowBits,
    };

    fn encode_all(encoder: &mut BlockEncoder, data: &[u8], buffer_size: usize) -> Vec<u8> {
        let mut buffer = FixedBuffer::new(vec![0; buffer_size]);
        let mut output = vec![];
        let mut remaining = data;

        while !remaining.is_empty() {
            let outcome = encoder.encode(remaining, &mut buffer).unwrap();
            if let BlockOutcome::Complete(consumed) = outcome {
                remaining = &remaining[consumed..];
            }
            output.extend_from_slice(buffer.uncommitted());
            buffer.clear();
        }

        loop {
            let outcome = encoder.finish(&mut buffer).unwrap();
            output.extend_from_slice(buffer.uncommitted());
            buffer.clear();

            if let BlockOutcome::Complete(()) = outcome {
                break;
            }
        }

        output
    }

    #[test]
    fn test_first_block_starts_with_start_fragment() {
        let window_bits = WindowBits::new(18).unwrap();
        let options = CompressionOptions::new().with_window_bits(18).unwrap();
        let mut encoder = BlockEncoder::new(BlockPosition::First, options).unwrap();

        let output = encode_all(&mut encoder, b"some block data", 3);
        assert!(output.starts_with(fragments::start_fragment(window_bits)));
        assert!(encoder.is_finished());
    }

    #[test]
    fn test_last_block_ends_with_end_fragment() {
        let mut encoder =
            BlockEncoder::new(BlockPosition::Last, CompressionOptions::default()).unwrap();

        let output = encode_all(&mut encoder, b"the last block", 7);
        assert!(output.ends_with(fragments::END_FRAGMENT));
    }

    #[test]
    fn test_encode_after_finish_is_rejected() {
        let mut encoder =
            BlockEncoder::new(BlockPosition::Single, CompressionOptions::default()).unwrap();
        encode_all(&mut encoder, b"done", 64);

        let mut buffer = FixedBuffer::new(vec![0; 64]);
        let error = encoder.encode(b"more", &mut buffer).unwrap_err();
        assert_eq!(BlockStreamError::from_io(&error), Some(BlockStreamError::Closed));

        // Finishing again is a no-op
        assert!(matches!(
            encoder.finish(&mut buffer).unwrap(),
            BlockOutcome::Complete(())
        ));
        assert!(buffer.uncommitted().is_empty());
    }
}
