/// An error from assigning an out-of-range compression option. Options are
/// validated when they are set, never clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum OptionsError {
    #[error("brotli quality must be between {min} and {max}, got {0}", min = Quality::MIN, max = Quality::MAX)]
    QualityOutOfRange(u32),
    #[error("brotli window bits must be between {min} and {max}, got {0}", min = WindowBits::MIN, max = WindowBits::MAX)]
    WindowBitsOutOfRange(u32),
}

impl From<OptionsError> for std::io::Error {
    fn from(error: OptionsError) -> Self {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, error)
    }
}

/// Brotli compression quality, from 0 (fastest) to 11 (smallest). Quality
/// only affects compression effort, never correctness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Quality(u32);

impl Quality {
    pub const MIN: u32 = 0;
    pub const MAX: u32 = 11;
    pub const DEFAULT: Quality = Quality(4);

    pub fn new(quality: u32) -> Result<Self, OptionsError> {
        if (Self::MIN..=Self::MAX).contains(&quality) {
            Ok(Self(quality))
        } else {
            Err(OptionsError::QualityOutOfRange(quality))
        }
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<u32> for Quality {
    type Error = OptionsError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// The base-2 logarithm of the Brotli sliding window size, from 10 to 24.
///
/// A headerless block (see [`BlockPosition`](crate::BlockPosition)) does
/// not record its window size, so the same value used to compress it must
/// be supplied again when decompressing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowBits(u32);

impl WindowBits {
    pub const MIN: u32 = 10;
    pub const MAX: u32 = 24;
    pub const DEFAULT: WindowBits = WindowBits(22);

    pub fn new(window_bits: u32) -> Result<Self, OptionsError> {
        if (Self::MIN..=Self::MAX).contains(&window_bits) {
            Ok(Self(window_bits))
        } else {
            Err(OptionsError::WindowBitsOutOfRange(window_bits))
        }
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// Iterate over every supported window size, smallest first.
    pub fn all() -> impl Iterator<Item = WindowBits> {
        (Self::MIN..=Self::MAX).map(WindowBits)
    }

    /// Index of this window size within [`WindowBits::all`].
    pub(crate) fn index(self) -> usize {
        let offset = self.0 - Self::MIN;
        offset.try_into().expect("window bits offset fits in usize")
    }
}

impl Default for WindowBits {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<u32> for WindowBits {
    type Error = OptionsError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Options passed to the Brotli encoder.
///
/// Block streams pick the framing flags themselves based on the requested
/// [`BlockPosition`](crate::BlockPosition), so most callers only need to
/// set the quality and window bits. The remaining flags are exposed for
/// producing raw segments directly, e.g. with [`crate::compress`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionOptions {
    quality: Quality,
    window_bits: WindowBits,
    byte_align: bool,
    bare: bool,
    catable: bool,
    appendable: bool,
    magic_number: bool,
}

impl Default for CompressionOptions {
    fn default() -> Self {
        Self {
            quality: Quality::DEFAULT,
            window_bits: WindowBits::DEFAULT,
            byte_align: false,
            bare: false,
            catable: false,
            appendable: false,
            magic_number: false,
        }
    }
}

impl CompressionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options for a bare segment: no header, no terminator, aligned to a
    /// byte boundary so it can be spliced between other segments. This is
    /// how `Middle` blocks are encoded.
    ///
    /// A bare segment decodes as a `Middle` block, or as a `Single` block
    /// once wrapped with [`start_fragment`](crate::fragments::start_fragment)
    /// and [`END_FRAGMENT`](crate::fragments::END_FRAGMENT).
    pub fn bare_segment(window_bits: WindowBits) -> Self {
        Self {
            quality: Quality::DEFAULT,
            window_bits,
            byte_align: true,
            bare: true,
            catable: true,
            appendable: true,
            magic_number: false,
        }
    }

    /// The bare segment equivalent of these options, keeping the quality
    /// and window bits.
    pub(crate) fn to_bare_segment(self) -> Self {
        Self {
            quality: self.quality,
            ..Self::bare_segment(self.window_bits)
        }
    }

    /// Options for the synthetic start fragment: the stream header for
    /// `window_bits`, with no payload and no terminator.
    pub(crate) fn start_fragment(window_bits: WindowBits) -> Self {
        Self {
            quality: Quality::DEFAULT,
            window_bits,
            byte_align: true,
            bare: true,
            catable: false,
            appendable: true,
            magic_number: false,
        }
    }

    pub fn quality(&self) -> Quality {
        self.quality
    }

    pub fn window_bits(&self) -> WindowBits {
        self.window_bits
    }

    pub fn byte_align(&self) -> bool {
        self.byte_align
    }

    pub fn bare(&self) -> bool {
        self.bare
    }

    pub fn catable(&self) -> bool {
        self.catable
    }

    pub fn appendable(&self) -> bool {
        self.appendable
    }

    /// Whether the magic number will be written. Always false for bare
    /// output.
    pub fn magic_number(&self) -> bool {
        self.magic_number && !self.bare
    }

    pub fn set_quality(&mut self, quality: u32) -> Result<(), OptionsError> {
        self.quality = Quality::new(quality)?;
        Ok(())
    }

    pub fn set_window_bits(&mut self, window_bits: u32) -> Result<(), OptionsError> {
        self.window_bits = WindowBits::new(window_bits)?;
        Ok(())
    }

    pub fn with_quality(mut self, quality: u32) -> Result<Self, OptionsError> {
        self.set_quality(quality)?;
        Ok(self)
    }

    pub fn with_window_bits(mut self, window_bits: u32) -> Result<Self, OptionsError> {
        self.set_window_bits(window_bits)?;
        Ok(self)
    }

    pub(crate) fn with_quality_level(mut self, quality: Quality) -> Self {
        self.quality = quality;
        self
    }

    pub(crate) fn with_window(mut self, window_bits: WindowBits) -> Self {
        self.window_bits = window_bits;
        self
    }

    /// Pad each meta-block to a byte boundary.
    pub fn with_byte_align(mut self, byte_align: bool) -> Self {
        self.byte_align = byte_align;
        self
    }

    /// Omit the magic number and the terminator.
    pub fn with_bare(mut self, bare: bool) -> Self {
        self.bare = bare;
        self
    }

    /// Make the output safe to follow other catable output.
    pub fn with_catable(mut self, catable: bool) -> Self {
        self.catable = catable;
        self
    }

    /// Make the output safe to be followed by other catable output.
    pub fn with_appendable(mut self, appendable: bool) -> Self {
        self.appendable = appendable;
        self
    }

    pub fn with_magic_number(mut self, magic_number: bool) -> Self {
        self.magic_number = magic_number;
        self
    }
}
