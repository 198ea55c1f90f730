//! PretextMap file header parsing.
//!
//! # File Header Structure
//!
//! ```text
//! Bytes 0-3:  Magic "pstm"
//! Bytes 4-7:  Compressed header size (u32 LE)
//! Bytes 8-11: Uncompressed header size (u32 LE)
//! Bytes 12-:  Raw deflate header blob
//! ```
//!
//! # Inflated Header
//!
//! ```text
//! u64       Total genome length (two u32 LE halves, low first)
//! u32       Contig count
//! repeated  f32 fractional length + 64-byte NUL-terminated name
//! u8        textureRes     (texture side = 1 << textureRes)
//! u8        nTextRes       (textures per side = 1 << nTextRes)
//! u8        mipMapLevels
//! ```

use serde::Serialize;
use tracing::debug;

use crate::error::FormatError;
use crate::io::{inflate_raw, ByteCursor};

use super::detect::{is_pretext_header, PRETEXT_MAGIC};
use super::index::{bytes_per_texture, texture_block_count};

/// Size of the fixed name buffer of a contig (and of an extension record).
pub const NAME_BYTES: usize = 64;

/// Size of the fixed preamble: magic + two u32 sizes.
pub const PREAMBLE_BYTES: usize = 12;

/// Largest supported total of `textureRes + nTextRes` (pixels per side must fit a u32).
const MAX_PIXEL_SHIFT: u32 = 31;

/// Smallest `textureRes` whose finest level holds a whole 4x4 block.
pub const MIN_TEXTURE_RES: u8 = 2;

/// Largest supported `textureRes`; a decoded 16384² level is already 1 GiB of f32.
pub const MAX_TEXTURE_RES: u8 = 14;

// =============================================================================
// Header
// =============================================================================

/// Parsed and derived PretextMap header fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Header {
    /// Total genome length in base pairs
    pub genome_length: u64,

    /// Number of contigs in the map
    pub contig_count: u32,

    /// log2 of the texture side length
    pub texture_res: u8,

    /// log2 of the number of textures per side
    pub n_text_res: u8,

    /// Number of stored mip levels per tile
    pub mip_map_levels: u8,

    /// Pixels along one side of a tile at mip level 0
    pub texture_resolution: u32,

    /// Tiles along one side of the map
    pub number_of_textures_1d: u32,

    /// Pixels along one side of the whole map
    pub number_of_pixels_1d: u32,

    /// Stored tiles (upper triangle, diagonal included)
    pub number_of_texture_blocks: usize,

    /// Inflated size of one tile record across all mip levels
    pub bytes_per_texture: usize,

    /// File offset of the first tile record
    pub data_offset: usize,
}

impl Header {
    fn from_parameters(
        genome_length: u64,
        contig_count: u32,
        texture_res: u8,
        n_text_res: u8,
        mip_map_levels: u8,
        data_offset: usize,
    ) -> Result<Self, FormatError> {
        if !(MIN_TEXTURE_RES..=MAX_TEXTURE_RES).contains(&texture_res) {
            return Err(FormatError::InvalidTextureParameters {
                reason: format!(
                    "textureRes ({}) must be between {} and {}",
                    texture_res, MIN_TEXTURE_RES, MAX_TEXTURE_RES
                ),
            });
        }
        let pixel_shift = u32::from(texture_res) + u32::from(n_text_res);
        if pixel_shift > MAX_PIXEL_SHIFT {
            return Err(FormatError::InvalidTextureParameters {
                reason: format!(
                    "textureRes ({}) + nTextRes ({}) exceeds {}",
                    texture_res, n_text_res, MAX_PIXEL_SHIFT
                ),
            });
        }
        if mip_map_levels == 0 || mip_map_levels > texture_res + 1 {
            return Err(FormatError::InvalidTextureParameters {
                reason: format!(
                    "mipMapLevels ({}) must be between 1 and textureRes + 1 ({})",
                    mip_map_levels,
                    u32::from(texture_res) + 1
                ),
            });
        }

        let texture_resolution = 1u32 << texture_res;
        let number_of_textures_1d = 1u32 << n_text_res;

        Ok(Self {
            genome_length,
            contig_count,
            texture_res,
            n_text_res,
            mip_map_levels,
            texture_resolution,
            number_of_textures_1d,
            number_of_pixels_1d: texture_resolution * number_of_textures_1d,
            number_of_texture_blocks: texture_block_count(number_of_textures_1d),
            bytes_per_texture: bytes_per_texture(texture_resolution, u32::from(mip_map_levels)),
            data_offset,
        })
    }

    /// Number of mip levels as a u32, for resolution arithmetic.
    pub fn mip_levels(&self) -> u32 {
        u32::from(self.mip_map_levels)
    }
}

// =============================================================================
// Contig
// =============================================================================

/// A contig with its stored fraction and derived spans.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Contig {
    pub name: String,

    /// Fraction of the total genome length, as stored
    pub fractional_length: f32,

    /// Length in base pairs
    pub length: u64,

    /// First pixel covered by the contig
    pub pixel_start: u32,

    /// One past the last pixel covered by the contig
    pub pixel_end: u32,
}

impl Contig {
    /// Pixels covered along one axis of the map.
    pub fn pixel_len(&self) -> u32 {
        self.pixel_end - self.pixel_start
    }
}

/// Assign `pixel_start`/`pixel_end` from the running sum of fractional lengths.
///
/// The last contig always ends exactly at `number_of_pixels_1d`, so rounding
/// in the running sum can never leave a gap at the edge of the map.
pub fn assign_pixel_spans(contigs: &mut [Contig], number_of_pixels_1d: u32) {
    let total = f64::from(number_of_pixels_1d);
    let mut cumulative = 0f64;
    let mut start = 0u32;
    let last = contigs.len().saturating_sub(1);

    for (i, contig) in contigs.iter_mut().enumerate() {
        cumulative += f64::from(contig.fractional_length);
        let end = if i == last {
            number_of_pixels_1d
        } else {
            ((cumulative * total).floor().max(0.0) as u64)
                .clamp(u64::from(start), u64::from(number_of_pixels_1d)) as u32
        };

        contig.pixel_start = start;
        contig.pixel_end = end;
        start = end;
    }
}

// =============================================================================
// Parsing
// =============================================================================

/// Parse the file header and contig list from the start of a PretextMap file.
///
/// `bytes` may be the whole file; only the preamble and header blob are read.
/// Every failure is fatal and no partial result is returned.
pub fn parse_header(bytes: &[u8]) -> Result<(Header, Vec<Contig>), FormatError> {
    if !is_pretext_header(bytes) {
        let got = bytes.iter().take(PRETEXT_MAGIC.len()).copied().collect();
        return Err(FormatError::BadMagic(got));
    }

    let mut cursor = ByteCursor::at(bytes, PRETEXT_MAGIC.len());
    let compressed_size = cursor.read_u32("compressed header size")?;
    let uncompressed_size = cursor.read_u32("uncompressed header size")?;
    let blob = cursor.take(compressed_size as usize, "compressed header")?;
    let data_offset = cursor.position();

    let inflated = inflate_raw(blob, uncompressed_size as usize)
        .map_err(|e| FormatError::HeaderInflate(e.to_string()))?;
    if inflated.len() != uncompressed_size as usize {
        return Err(FormatError::HeaderSizeMismatch {
            declared: uncompressed_size,
            actual: inflated.len(),
        });
    }

    let mut cursor = ByteCursor::new(&inflated);
    let genome_length = cursor.read_u64_halves("genome length")?;
    let contig_count = cursor.read_u32("contig count")?;

    // Each contig needs 68 bytes; reject impossible counts before allocating
    let contig_bytes = 4 + NAME_BYTES;
    let needed = (contig_count as usize).saturating_mul(contig_bytes);
    if needed > cursor.remaining() {
        return Err(FormatError::Truncated {
            field: "contig table",
            offset: cursor.position(),
            needed,
            available: cursor.remaining(),
        });
    }

    let mut contigs = Vec::with_capacity(contig_count as usize);
    for _ in 0..contig_count {
        let fractional_length = cursor.read_f32("contig fractional length")?;
        let name = cursor.read_fixed_str(NAME_BYTES, "contig name")?;
        let length = (f64::from(fractional_length) * genome_length as f64).round() as u64;
        contigs.push(Contig {
            name,
            fractional_length,
            length,
            pixel_start: 0,
            pixel_end: 0,
        });
    }

    let texture_res = cursor.read_u8("textureRes")?;
    let n_text_res = cursor.read_u8("nTextRes")?;
    let mip_map_levels = cursor.read_u8("mipMapLevels")?;

    let header = Header::from_parameters(
        genome_length,
        contig_count,
        texture_res,
        n_text_res,
        mip_map_levels,
        data_offset,
    )?;
    assign_pixel_spans(&mut contigs, header.number_of_pixels_1d);

    debug!(
        genome_length,
        contig_count,
        texture_resolution = header.texture_resolution,
        textures_1d = header.number_of_textures_1d,
        mip_levels = header.mip_map_levels,
        "Parsed PretextMap header"
    );

    Ok((header, contigs))
}
