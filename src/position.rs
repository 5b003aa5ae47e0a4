/// Where a compressed block sits within a logical concatenation of blocks
/// that together represent one original byte sequence.
///
/// The same position must be passed when decompressing a block as was used
/// when compressing it. A mismatch is not detected and will produce garbage
/// or an error.
///
/// Each position determines the framing of the compressed bytes:
///
/// | Position | Start fragment (window header) | End fragment (terminator) |
/// |----------|--------------------------------|---------------------------|
/// | `First`  | yes                            | no                        |
/// | `Middle` | no                             | no                        |
/// | `Last`   | no                             | yes                       |
/// | `Single` | yes                            | yes                       |
///
/// Concatenating a `First` block, any number of `Middle` blocks, and a
/// `Last` block (all compressed with the same window bits) yields a stream
/// that decodes the same way as a `Single` block.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BlockPosition {
    First,
    Middle,
    Last,
    #[default]
    Single,
}

impl BlockPosition {
    pub const ALL: [BlockPosition; 4] = [Self::First, Self::Middle, Self::Last, Self::Single];

    /// Pick the position of the block at `index` out of `count` blocks.
    ///
    /// ## Panics
    ///
    /// Panics if `index >= count`.
    pub fn for_index(index: usize, count: usize) -> Self {
        assert!(index < count, "block index out of range");

        match (index, count) {
            (_, 1) => Self::Single,
            (0, _) => Self::First,
            (index, count) if index + 1 == count => Self::Last,
            _ => Self::Middle,
        }
    }

    /// Returns true if blocks at this position carry their own stream
    /// header, which establishes the window size.
    pub fn has_start_fragment(self) -> bool {
        matches!(self, Self::First | Self::Single)
    }

    /// Returns true if blocks at this position carry their own terminator.
    pub fn has_end_fragment(self) -> bool {
        matches!(self, Self::Last | Self::Single)
    }

    /// Returns true if a synthetic start fragment must be fed to the
    /// decoder before the block's own bytes.
    pub fn needs_start_fragment(self) -> bool {
        !self.has_start_fragment()
    }

    /// Returns true if a synthetic end fragment must be fed to the decoder
    /// after the block's own bytes.
    pub fn needs_end_fragment(self) -> bool {
        !self.has_end_fragment()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::First => "First",
            Self::Middle => "Middle",
            Self::Last => "Last",
            Self::Single => "Single",
        }
    }
}

impl std::fmt::Display for BlockPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown block position: {0:?}")]
pub struct ParseBlockPositionError(String);

impl std::str::FromStr for BlockPosition {
    type Err = ParseBlockPositionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|position| position.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseBlockPositionError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::BlockPosition;

    #[test]
    fn test_framing_matrix() {
        let matrix = BlockPosition::ALL.map(|position| {
            (
                position,
                position.has_start_fragment(),
                position.has_end_fragment(),
            )
        });

        assert_eq!(
            matrix,
            [
                (BlockPosition::First, true, false),
                (BlockPosition::Middle, false, false),
                (BlockPosition::Last, false, true),
                (BlockPosition::Single, true, true),
            ]
        );
    }

    #[test]
    fn test_decoder_needs() {
        assert!(!BlockPosition::First.needs_start_fragment());
        assert!(BlockPosition::First.needs_end_fragment());
        assert!(BlockPosition::Middle.needs_start_fragment());
        assert!(BlockPosition::Middle.needs_end_fragment());
        assert!(BlockPosition::Last.needs_start_fragment());
        assert!(!BlockPosition::Last.needs_end_fragment());
        assert!(!BlockPosition::Single.needs_start_fragment());
        assert!(!BlockPosition::Single.needs_end_fragment());
    }

    #[test]
    fn test_for_index() {
        assert_eq!(BlockPosition::for_index(0, 1), BlockPosition::Single);
        assert_eq!(BlockPosition::for_index(0, 2), BlockPosition::First);
        assert_eq!(BlockPosition::for_index(1, 2), BlockPosition::Last);

        let positions: Vec<_> = (0..4).map(|i| BlockPosition::for_index(i, 4)).collect();
        assert_eq!(
            positions,
            [
                BlockPosition::First,
                BlockPosition::Middle,
                BlockPosition::Middle,
                BlockPosition::Last,
            ]
        );
    }

    #[test]
    fn test_parse_display() {
        for position in BlockPosition::ALL {
            let parsed: BlockPosition = position.to_string().parse().unwrap();
            assert_eq!(parsed, position);
        }

        assert_eq!("middle".parse::<BlockPosition>().unwrap(), BlockPosition::Middle);
        assert!("Centre".parse::<BlockPosition>().is_err());
    }
}
