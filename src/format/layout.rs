//! Whole-file layout: tile record table and extension records.
//!
//! # Layout After The Header
//!
//! ```text
//! numberOfTextureBlocks × { u32 compressed size, raw deflate tile blob }
//! zero or more extensions:
//!     "psgh", u32 compressed size, raw deflate {64-byte name, numberOfPixels1D × i32 LE}
//! ```
//!
//! The header is the only fatal part of a load. A tile table that ends early
//! leaves the missing tiles empty (they decode to zeros), and a malformed
//! extension is skipped.

use bytes::Bytes;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::FormatError;
use crate::io::{inflate_raw, ByteCursor};

use super::detect::{is_extension_header, EXTENSION_MAGIC};
use super::header::{parse_header, Contig, Header, NAME_BYTES};
use super::index::tile_linear_index;

/// Every tile record starts with a u32 size.
const TILE_SIZE_FIELD_BYTES: usize = 4;

// =============================================================================
// Extension Tracks
// =============================================================================

/// A per-pixel signal track stored as an extension record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtensionTrack {
    pub name: String,

    /// One value per map pixel along an axis
    pub values: Vec<i32>,
}

/// Decode the inflated payload of an extension record.
fn parse_extension_payload(payload: &[u8], pixels: u32) -> Result<ExtensionTrack, FormatError> {
    let mut cursor = ByteCursor::new(payload);
    let name = cursor.read_fixed_str(NAME_BYTES, "extension name")?;
    let mut values = Vec::with_capacity(pixels as usize);
    for _ in 0..pixels {
        values.push(cursor.read_i32("extension value")?);
    }
    Ok(ExtensionTrack { name, values })
}

// =============================================================================
// PretextFile
// =============================================================================

/// A loaded PretextMap file: header, contigs, raw tile records and extensions.
///
/// Tile records are zero-copy slices of the original buffer.
#[derive(Debug, Clone)]
pub struct PretextFile {
    header: Header,
    contigs: Vec<Contig>,
    tiles: Vec<Bytes>,
    extensions: Vec<ExtensionTrack>,
}

impl PretextFile {
    /// Parse a whole file buffer.
    ///
    /// Header failures are fatal, as is a file too short to hold even the size
    /// fields of every declared tile record. A tile table that ends early
    /// otherwise only leaves the missing tiles blank.
    pub fn parse(bytes: Bytes) -> Result<Self, FormatError> {
        let (header, contigs) = parse_header(&bytes)?;

        let available = bytes.len().saturating_sub(header.data_offset);
        let needed = header
            .number_of_texture_blocks
            .saturating_mul(TILE_SIZE_FIELD_BYTES);
        if needed > available {
            return Err(FormatError::Truncated {
                field: "tile table",
                offset: header.data_offset,
                needed,
                available,
            });
        }

        let mut cursor = ByteCursor::at(&bytes, header.data_offset);
        let mut tiles = Vec::new();
        for index in 0..header.number_of_texture_blocks {
            let record = cursor
                .read_u32("tile record size")
                .and_then(|size| cursor.take(size as usize, "tile record"));
            match record {
                Ok(slice) => tiles.push(bytes.slice_ref(slice)),
                Err(e) => {
                    warn!(
                        index,
                        expected = header.number_of_texture_blocks,
                        error = %e,
                        "Tile table ends early; remaining tiles will be blank"
                    );
                    break;
                }
            }
        }
        let complete = tiles.len() == header.number_of_texture_blocks;

        let extensions = if complete {
            Self::parse_extensions(&bytes, cursor, header.number_of_pixels_1d)
        } else {
            Vec::new()
        };

        info!(
            contigs = contigs.len(),
            tiles = header.number_of_texture_blocks,
            extensions = extensions.len(),
            "Loaded PretextMap file"
        );

        Ok(Self {
            header,
            contigs,
            tiles,
            extensions,
        })
    }

    fn parse_extensions(bytes: &[u8], mut cursor: ByteCursor<'_>, pixels: u32) -> Vec<ExtensionTrack> {
        let mut extensions = Vec::new();
        let payload_size = NAME_BYTES + 4 * pixels as usize;

        loop {
            let rest = &bytes[cursor.position().min(bytes.len())..];
            if !is_extension_header(rest) {
                if !rest.is_empty() {
                    debug!(trailing = rest.len(), "Ignoring trailing bytes after tile table");
                }
                break;
            }

            let start = cursor.position();
            let blob = cursor
                .take(EXTENSION_MAGIC.len(), "extension magic")
                .and_then(|_| cursor.read_u32("extension size"))
                .and_then(|size| cursor.take(size as usize, "extension record"));
            let blob = match blob {
                Ok(blob) => blob,
                Err(e) => {
                    warn!(offset = start, error = %e, "Truncated extension record");
                    break;
                }
            };

            let track = inflate_raw(blob, payload_size)
                .map_err(|e| e.to_string())
                .and_then(|payload| {
                    if payload.len() != payload_size {
                        return Err(format!(
                            "payload is {} bytes, expected {}",
                            payload.len(),
                            payload_size
                        ));
                    }
                    parse_extension_payload(&payload, pixels).map_err(|e| e.to_string())
                });
            match track {
                Ok(track) => {
                    debug!(name = %track.name, "Loaded extension track");
                    extensions.push(track);
                }
                Err(message) => warn!(offset = start, %message, "Skipping malformed extension"),
            }
        }

        extensions
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn contigs(&self) -> &[Contig] {
        &self.contigs
    }

    pub fn extensions(&self) -> &[ExtensionTrack] {
        &self.extensions
    }

    /// Raw (still compressed) record for a linear tile index.
    ///
    /// Missing or out-of-range records are returned as empty slices.
    pub fn tile_bytes(&self, linear_index: usize) -> Bytes {
        self.tiles.get(linear_index).cloned().unwrap_or_default()
    }

    /// Raw record for tile `(col, row)`; mirrored coordinates share a record.
    pub fn tile_bytes_at(&self, col: u32, row: u32) -> Bytes {
        let n = self.header.number_of_textures_1d;
        if col >= n || row >= n {
            return Bytes::new();
        }
        self.tile_bytes(tile_linear_index(col, row, n))
    }

    /// Tile records present in the file, in linear order.
    ///
    /// Shorter than `number_of_texture_blocks` when the table ends early.
    pub fn tile_records(&self) -> &[Bytes] {
        &self.tiles
    }
}
