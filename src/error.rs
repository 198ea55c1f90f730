use thiserror::Error;

/// Fatal errors raised while loading a PretextMap file.
///
/// Any of these aborts the whole load: no partial header or contig list is
/// ever handed back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    /// The first four bytes are not the PretextMap magic
    #[error("Invalid PretextMap magic bytes: expected \"pstm\", got {0:02X?}")]
    BadMagic(Vec<u8>),

    /// The inflated header length differs from the declared size.
    ///
    /// Inflation stops one byte past `declared`, so for an oversized header
    /// `actual` is `declared + 1`, a lower bound on the real length.
    #[error("Header size mismatch: declared {declared} bytes, inflated {actual}")]
    HeaderSizeMismatch { declared: u32, actual: usize },

    /// The buffer ended in the middle of a field
    #[error("Truncated input while reading {field} at offset {offset}: need {needed} bytes, {available} available")]
    Truncated {
        field: &'static str,
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// The header blob is not a valid raw deflate stream
    #[error("Failed to inflate header: {0}")]
    HeaderInflate(String),

    /// Texture parameters that cannot describe a valid pyramid
    #[error("Invalid texture parameters: {reason}")]
    InvalidTextureParameters { reason: String },
}

/// Errors isolated to a single tile.
///
/// These never abort a file load or a decode batch. The affected tile (or
/// level) is replaced by zero-filled intensities and the failure is logged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TileError {
    /// The tile blob could not be inflated
    #[error("Failed to inflate tile {index}: {message}")]
    Inflate { index: usize, message: String },

    /// The inflated stream ran out before a mip level was complete
    #[error("Tile {index} level {level}: need {needed} bytes, {available} available")]
    ShortLevel {
        index: usize,
        level: u32,
        needed: usize,
        available: usize,
    },

    /// Decoding did not finish within the configured timeout
    #[error("Decoding tile {index} timed out")]
    Timeout { index: usize },

    /// The blocking decode task panicked or was aborted
    #[error("Decode task for tile {index} failed: {message}")]
    Join { index: usize, message: String },
}
