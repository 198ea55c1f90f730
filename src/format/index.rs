//! Tile addressing and pyramid size arithmetic.
//!
//! The contact map is symmetric, so only tiles on or above the diagonal are
//! stored. Tiles are enumerated row-major over the upper triangle:
//!
//! ```text
//!        y=0  y=1  y=2  y=3
//! x=0     0    1    2    3
//! x=1          4    5    6
//! x=2               7    8
//! x=3                    9
//! ```
//!
//! A tile below the diagonal is the mirror of `(y, x)` and shares its index.

/// Pixels along one side of a BC4 block.
pub const BLOCK_DIM: u32 = 4;

/// Encoded size of one BC4 block in bytes.
pub const BLOCK_BYTES: usize = 8;

/// Linear storage index of tile `(x, y)` in an `n × n` grid.
pub fn tile_linear_index(x: u32, y: u32, n: u32) -> usize {
    let (x, y) = if x > y { (y, x) } else { (x, y) };
    let (x, y, n) = (x as usize, y as usize, n as usize);
    ((2 * n - x - 1) * x) / 2 + y
}

/// Inverse of [`tile_linear_index`], returning the canonical `(x, y)` with `x <= y`.
///
/// Returns `None` if `index` is past the last stored tile.
pub fn tile_coords_for_index(index: usize, n: u32) -> Option<(u32, u32)> {
    let n_usize = n as usize;
    let mut row_start = 0usize;
    for x in 0..n_usize {
        let row_len = n_usize - x;
        if index < row_start + row_len {
            let y = x + (index - row_start);
            return Some((x as u32, y as u32));
        }
        row_start += row_len;
    }
    None
}

/// Number of stored tiles for an `n × n` grid, diagonal included.
pub fn texture_block_count(n: u32) -> usize {
    let n = n as usize;
    n * (n + 1) / 2
}

/// Side length of mip `level`; level 0 is the full texture resolution.
#[inline]
pub fn level_resolution(texture_resolution: u32, level: u32) -> u32 {
    texture_resolution.checked_shr(level).unwrap_or(0)
}

/// Encoded bytes of one mip level at half a byte per pixel.
#[inline]
pub fn level_byte_size(resolution: u32) -> usize {
    let res = resolution as usize;
    res * res / 2
}

/// Inflated size of a whole tile record: every mip level, finest first.
pub fn bytes_per_texture(texture_resolution: u32, mip_levels: u32) -> usize {
    (0..mip_levels)
        .map(|level| level_byte_size(level_resolution(texture_resolution, level)))
        .sum()
}
