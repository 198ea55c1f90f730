//! Whole-tile decoding: inflate a tile record and decode every mip level.
//!
//! Failures here are isolated to the tile. A record that fails to inflate,
//! or a level that runs past the end of the inflated stream, is replaced by
//! zero intensities of the right size so the rest of the tile (and every
//! other tile) still decodes.

use tracing::warn;

use crate::error::TileError;
use crate::format::{decode_level, level_byte_size, level_resolution, Header};
use crate::io::inflate_raw;

// =============================================================================
// DecodedTile
// =============================================================================

/// Decoded intensities of one tile, one row-major image per mip level.
///
/// Level 0 is the finest (`texture_resolution²` samples); each following
/// level halves the side length. Samples are normalized to `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedTile {
    texture_resolution: u32,
    levels: Vec<Vec<f32>>,
}

impl DecodedTile {
    /// A blank tile with `mip_levels` levels.
    pub fn zeroed(texture_resolution: u32, mip_levels: u32) -> Self {
        let levels = (0..mip_levels)
            .map(|level| zero_level(level_resolution(texture_resolution, level)))
            .collect();
        Self {
            texture_resolution,
            levels,
        }
    }

    pub fn mip_count(&self) -> usize {
        self.levels.len()
    }

    /// Side length of mip `level`.
    pub fn resolution(&self, level: usize) -> u32 {
        level_resolution(self.texture_resolution, level as u32)
    }

    /// Samples of mip `level`, or `None` past the coarsest level.
    pub fn level(&self, level: usize) -> Option<&[f32]> {
        self.levels.get(level).map(Vec::as_slice)
    }

    pub fn levels(&self) -> &[Vec<f32>] {
        &self.levels
    }

    /// Mip level to draw for a viewport level (viewport level 0 is the coarsest).
    pub fn mip_for_view_level(&self, view_level: u32) -> usize {
        let last = self.levels.len().saturating_sub(1);
        last.saturating_sub(view_level as usize)
    }

    /// Heap bytes held by the intensity arrays.
    pub fn byte_size(&self) -> usize {
        self.levels
            .iter()
            .map(|level| level.len() * std::mem::size_of::<f32>())
            .sum()
    }

    /// Whether every sample of every level is zero.
    pub fn is_blank(&self) -> bool {
        self.levels.iter().flatten().all(|&v| v == 0.0)
    }

    /// The same tile with `x` and `y` swapped, for tiles below the diagonal.
    pub fn transposed(&self) -> Self {
        let levels = self
            .levels
            .iter()
            .enumerate()
            .map(|(i, samples)| {
                let res = self.resolution(i) as usize;
                let mut out = vec![0f32; samples.len()];
                for y in 0..res {
                    for x in 0..res {
                        out[x * res + y] = samples[y * res + x];
                    }
                }
                out
            })
            .collect();
        Self {
            texture_resolution: self.texture_resolution,
            levels,
        }
    }
}

fn zero_level(resolution: u32) -> Vec<f32> {
    let res = resolution as usize;
    vec![0f32; res * res]
}

// =============================================================================
// Tile Decoding
// =============================================================================

/// Result of decoding one tile record.
///
/// `tile` is always complete; `issues` lists the isolated failures that were
/// papered over with zeros.
#[derive(Debug, Clone)]
pub struct DecodeOutcome {
    pub tile: DecodedTile,
    pub issues: Vec<TileError>,
}

impl DecodeOutcome {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Decode the raw (compressed) record of tile `index`.
pub fn decode_tile(raw: &[u8], index: usize, header: &Header) -> DecodeOutcome {
    let texture_resolution = header.texture_resolution;
    let mip_levels = header.mip_levels();

    let inflated = match inflate_raw(raw, header.bytes_per_texture) {
        Ok(mut bytes) => {
            bytes.truncate(header.bytes_per_texture);
            bytes
        }
        Err(e) => {
            let issue = TileError::Inflate {
                index,
                message: e.to_string(),
            };
            warn!(error = %issue, "Substituting blank tile");
            return DecodeOutcome {
                tile: DecodedTile::zeroed(texture_resolution, mip_levels),
                issues: vec![issue],
            };
        }
    };

    let mut issues = Vec::new();
    let mut levels = Vec::with_capacity(mip_levels as usize);
    let mut offset = 0usize;

    for level in 0..mip_levels {
        let res = level_resolution(texture_resolution, level);
        let needed = level_byte_size(res);

        match decode_level(&inflated, offset, res) {
            Some(samples) => levels.push(samples),
            None => {
                let issue = TileError::ShortLevel {
                    index,
                    level,
                    needed,
                    available: inflated.len().saturating_sub(offset),
                };
                warn!(error = %issue, "Substituting blank mip level");
                issues.push(issue);
                levels.push(zero_level(res));
            }
        }
        offset += needed;
    }

    DecodeOutcome {
        tile: DecodedTile {
            texture_resolution,
            levels,
        },
        issues,
    }
}
