//! Raw deflate (no zlib or gzip wrapper) decompression.
//!
//! Header, tile and extension blobs in a PretextMap file are all raw deflate
//! streams. Callers usually know the expected output size, which is used both
//! to pre-size the buffer and to cap how much a corrupt stream can expand.

use std::io::Read;

use flate2::read::DeflateDecoder;

/// Largest up-front allocation; a declared size past this grows on demand.
const MAX_PREALLOC: usize = 1 << 24;

/// Inflate a raw deflate stream.
///
/// At most `limit + 1` bytes are produced so that an oversized stream can be
/// detected by comparing the output length with `limit`, without inflating
/// the whole thing.
pub fn inflate_raw(compressed: &[u8], limit: usize) -> std::io::Result<Vec<u8>> {
    let mut out = Vec::with_capacity(limit.min(MAX_PREALLOC));
    let decoder = DeflateDecoder::new(compressed);
    decoder.take(limit as u64 + 1).read_to_end(&mut out)?;
    Ok(out)
}
