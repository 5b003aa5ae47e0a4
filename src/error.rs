/// Errors raised by block streams, on top of errors from the underlying
/// reader or writer. These are always surfaced as a [`std::io::Error`];
/// use [`BlockStreamError::from_io`] to recover the original value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BlockStreamError {
    /// The stream already wrote its final block and can't be used again.
    #[error("block stream is closed")]
    Closed,

    /// Another operation started on this stream and hasn't completed yet.
    #[error("another operation is already in progress on this block stream")]
    OperationInProgress,

    /// The encoder rejected a parameter or failed while compressing.
    #[error("brotli encoder failed")]
    EncoderFailed,

    /// The compressed data is malformed. This is also the usual (but not
    /// guaranteed) symptom of decoding a block with a different position or
    /// window size than it was compressed with.
    #[error("brotli block is corrupt")]
    Corrupt,

    /// The compressed data ended before the Brotli stream was complete.
    #[error("brotli block ended before the end of the stream")]
    Truncated,
}

impl BlockStreamError {
    /// Get the [`BlockStreamError`] an I/O error was created from, if any.
    pub fn from_io(error: &std::io::Error) -> Option<Self> {
        error.get_ref()?.downcast_ref::<Self>().copied()
    }

    fn kind(self) -> std::io::ErrorKind {
        match self {
            Self::Closed | Self::OperationInProgress => std::io::ErrorKind::InvalidInput,
            Self::EncoderFailed => std::io::ErrorKind::Other,
            Self::Corrupt => std::io::ErrorKind::InvalidData,
            Self::Truncated => std::io::ErrorKind::UnexpectedEof,
        }
    }
}

impl From<BlockStreamError> for std::io::Error {
    fn from(error: BlockStreamError) -> Self {
        std::io::Error::new(error.kind(), error)
    }
}

#[cfg(test)]
mod tests {
    use super::BlockStreamError;

    #[test]
    fn test_io_error_round_trip() {
        let error: std::io::Error = BlockStreamError::Truncated.into();
        assert_eq!(error.kind(), std::io::ErrorKind::UnexpectedEof);
        assert_eq!(
            BlockStreamError::from_io(&error),
            Some(BlockStreamError::Truncated)
        );

        let other = std::io::Error::other("unrelated");
        assert_eq!(BlockStreamError::from_io(&other), None);
    }
}
