//! Single-channel BC4-style block decoding.
//!
//! # Block Structure (8 bytes → 4×4 samples)
//!
//! ```text
//! Byte 0:    a0 (reference value)
//! Byte 1:    a1 (reference value)
//! Bytes 2-4: 3-bit indices for samples 0-7  (24-bit little-endian group)
//! Bytes 5-7: 3-bit indices for samples 8-15 (24-bit little-endian group)
//! ```
//!
//! The palette has two modes. When `a0 > a1` all eight entries form a ramp
//! from `a0` (index 0) down to `a1` (index 7) in sevenths. Otherwise index 0
//! and 1 hold the references, indices 2 to 5 interpolate in fifths and the
//! last two are fixed at 0 and 255.
//!
//! # Level Layout
//!
//! Blocks of a mip level are stored column-major: all blocks of block-column
//! 0 top to bottom, then block-column 1, and so on. Inside a block, sample
//! `dx * 4 + dy` belongs at image position `(bx * 4 + dx, by * 4 + dy)`.
//! Output images are row-major (`y * res + x`).

use crate::io::read_u24_le;

use super::index::{level_byte_size, BLOCK_BYTES, BLOCK_DIM};

/// Samples per decoded block.
pub const BLOCK_SAMPLES: usize = 16;

/// Integer division rounding half up; all operands are small and non-negative.
#[inline]
fn div_round(numerator: u32, denominator: u32) -> u8 {
    ((numerator + denominator / 2) / denominator) as u8
}

/// Build the 8-entry palette for reference values `a0`, `a1`.
pub fn block_palette(a0: u8, a1: u8) -> [u8; 8] {
    let (a0w, a1w) = (u32::from(a0), u32::from(a1));
    let mut palette = [0u8; 8];

    if a0 > a1 {
        for k in 0..8u32 {
            palette[k as usize] = div_round((7 - k) * a0w + k * a1w, 7);
        }
    } else {
        palette[0] = a0;
        palette[1] = a1;
        for k in 2..6u32 {
            palette[k as usize] = div_round((6 - k) * a0w + (k - 1) * a1w, 5);
        }
        palette[6] = 0;
        palette[7] = 255;
    }

    palette
}

/// Decode the 8-byte block starting at `offset` into 16 intensity samples.
///
/// # Panics
/// Panics if `bytes` has fewer than `offset + 8` bytes.
pub fn decode_block(bytes: &[u8], offset: usize) -> [u8; BLOCK_SAMPLES] {
    let block = &bytes[offset..offset + BLOCK_BYTES];
    let palette = block_palette(block[0], block[1]);

    let mut samples = [0u8; BLOCK_SAMPLES];
    for (group, chunk) in block[2..].chunks_exact(3).enumerate() {
        let bits = read_u24_le(chunk);
        for i in 0..8 {
            let index = ((bits >> (3 * i)) & 0b111) as usize;
            samples[group * 8 + i] = palette[index];
        }
    }
    samples
}

/// Decode one mip level of side `resolution` from `buffer[offset..]`.
///
/// Returns normalized intensities in `[0, 1]`, row-major. Returns `None` when
/// the buffer does not hold `resolution² / 2` bytes past `offset`, or when the
/// level is smaller than a single block.
pub fn decode_level(buffer: &[u8], offset: usize, resolution: u32) -> Option<Vec<f32>> {
    if resolution < BLOCK_DIM {
        return None;
    }
    let needed = level_byte_size(resolution);
    if buffer.len() < offset.checked_add(needed)? {
        return None;
    }

    let res = resolution as usize;
    let dim = BLOCK_DIM as usize;
    let blocks_per_side = res / dim;
    let mut image = vec![0f32; res * res];
    let mut block_offset = offset;

    for bx in 0..blocks_per_side {
        for by in 0..blocks_per_side {
            let samples = decode_block(buffer, block_offset);
            block_offset += BLOCK_BYTES;

            for dx in 0..dim {
                for dy in 0..dim {
                    let x = bx * dim + dx;
                    let y = by * dim + dy;
                    image[y * res + x] = f32::from(samples[dx * dim + dy]) / 255.0;
                }
            }
        }
    }

    Some(image)
}
