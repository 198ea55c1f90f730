//! Format sniffing for PretextMap files.
//!
//! A PretextMap file starts with the four ASCII bytes `pstm`. Extension
//! records appended after the tile table start with `psgh`. Checking the
//! magic is cheap and lets a caller reject a file before committing to a
//! full parse.

/// Magic bytes at the start of every PretextMap file.
pub const PRETEXT_MAGIC: [u8; 4] = *b"pstm";

/// Magic bytes at the start of every extension (graph track) record.
pub const EXTENSION_MAGIC: [u8; 4] = *b"psgh";

/// Check whether `bytes` starts with the PretextMap magic.
///
/// Only the first four bytes are inspected; shorter inputs are rejected.
pub fn is_pretext_header(bytes: &[u8]) -> bool {
    bytes.len() >= PRETEXT_MAGIC.len() && bytes[..PRETEXT_MAGIC.len()] == PRETEXT_MAGIC
}

/// Check whether `bytes` starts with the extension record magic.
pub fn is_extension_header(bytes: &[u8]) -> bool {
    bytes.len() >= EXTENSION_MAGIC.len() && bytes[..EXTENSION_MAGIC.len()] == EXTENSION_MAGIC
}
