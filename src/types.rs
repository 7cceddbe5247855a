//! Common types shared by both decoders.

use core::fmt;

/// Result type used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;

/// Categorical decode status codes.
///
/// Parser-level errors (`NotThisFormat`, `Format`, `Unsupported`,
/// `UndefinedTable`) abort the whole decode; entropy-level errors
/// (`Decode`, `BadRestart`) abort the current image. Nothing is retried
/// internally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// The byte source ran out of data where the stream required more.
    Input,
    /// Signature mismatch: the stream is not this format at all.
    NotThisFormat,
    /// Malformed marker, segment or block structure.
    Format,
    /// Valid but unsupported mode (progressive/arithmetic JPEG,
    /// non-8-bit precision, interlaced GIF, unknown chroma layout).
    Unsupported,
    /// A scan referenced a Huffman or quantization table that was
    /// never defined.
    UndefinedTable,
    /// A restart marker was missing or carried the wrong sequence
    /// number.
    BadRestart,
    /// Invalid entropy-coded data (bad Huffman code, run/size escape
    /// past the block end, color index past the palette).
    Decode,
    /// Image exceeds the decoder's dimension bounds or a fixed table
    /// overflowed.
    Memory,
    /// Invalid argument from the caller.
    Parameter,
    /// The pixel sink asked to stop.
    Interrupted,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Error::Input => "unexpected end of input",
            Error::NotThisFormat => "signature mismatch",
            Error::Format => "malformed data",
            Error::Unsupported => "unsupported mode",
            Error::UndefinedTable => "undefined Huffman/quantization table",
            Error::BadRestart => "bad restart marker",
            Error::Decode => "corrupt entropy-coded data",
            Error::Memory => "image too large",
            Error::Parameter => "invalid parameter",
            Error::Interrupted => "interrupted by output",
        };
        f.write_str(s)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Rectangular pixel region, inclusive coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rectangle {
    pub left: u16,
    pub right: u16,
    pub top: u16,
    pub bottom: u16,
}

impl Rectangle {
    pub fn new(left: u16, right: u16, top: u16, bottom: u16) -> Self {
        Self { left, right, top, bottom }
    }

    pub fn width(&self) -> u16 {
        self.right - self.left + 1
    }

    pub fn height(&self) -> u16 {
        self.bottom - self.top + 1
    }
}
