//! Viewport geometry: which mip level and which tiles a camera needs.
//!
//! Map space is normalized so the whole contact map spans `[0, 1]` on both
//! axes. A camera looks at `(x, y)` with a zoom factor; at zoom 1 the shorter
//! canvas side shows the full map.

use super::cache::TileKey;

/// Camera position in normalized map space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub x: f64,
    pub y: f64,
    pub zoom: f64,
}

impl Camera {
    pub fn new(x: f64, y: f64, zoom: f64) -> Self {
        Self { x, y, zoom }
    }
}

impl Default for Camera {
    /// Centered on the map at zoom 1.
    fn default() -> Self {
        Self::new(0.5, 0.5, 1.0)
    }
}

/// Visible region of the map. Not clamped to `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibleRect {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl VisibleRect {
    /// Half-open overlap test against `[min_x, max_x) × [min_y, max_y)`.
    pub fn overlaps(&self, min_x: f64, max_x: f64, min_y: f64, max_y: f64) -> bool {
        min_x < self.max_x && max_x > self.min_x && min_y < self.max_y && max_y > self.min_y
    }
}

/// Viewport level for a zoom factor.
///
/// Level 0 is the coarsest and is used up to zoom 1; each doubling of the zoom
/// adds one level, clamped to `num_mip_maps - 1`.
pub fn select_mip_level(zoom: f64, num_mip_maps: u32) -> u32 {
    let max_level = i64::from(num_mip_maps.saturating_sub(1));
    let level = zoom.max(1.0).log2().floor() as i64;
    level.clamp(0, max_level) as u32
}

/// Region of the map visible through a `canvas_w × canvas_h` canvas.
pub fn get_visible_rect(camera: &Camera, canvas_w: f64, canvas_h: f64) -> VisibleRect {
    let aspect = canvas_w / canvas_h;
    let (half_w, half_h) = if aspect > 1.0 {
        (0.5 * aspect / camera.zoom, 0.5 / camera.zoom)
    } else {
        (0.5 / camera.zoom, 0.5 * (1.0 / aspect) / camera.zoom)
    };

    VisibleRect {
        min_x: camera.x - half_w,
        max_x: camera.x + half_w,
        min_y: camera.y - half_h,
        max_y: camera.y + half_h,
    }
}

/// Whether tile `(col, row)` of a `tiles_per_dim` grid overlaps the view.
pub fn tile_intersects(
    col: u32,
    row: u32,
    tiles_per_dim: u32,
    camera: &Camera,
    canvas_w: f64,
    canvas_h: f64,
) -> bool {
    let rect = get_visible_rect(camera, canvas_w, canvas_h);
    let size = 1.0 / f64::from(tiles_per_dim);
    let x0 = f64::from(col) * size;
    let y0 = f64::from(row) * size;
    rect.overlaps(x0, x0 + size, y0, y0 + size)
}

/// Map a rect bound onto a tile index, clamped to the grid.
fn bound_to_tile(bound: f64, tiles_per_dim: u32) -> u32 {
    let max = i64::from(tiles_per_dim) - 1;
    let index = (bound * f64::from(tiles_per_dim)).floor() as i64;
    index.clamp(0, max) as u32
}

/// Every tile key the camera needs, at the level chosen for its zoom.
///
/// The tile range comes straight from the rect bounds, so it can include a
/// few edge tiles that only touch the view.
pub fn visible_tile_keys(
    camera: &Camera,
    canvas_w: f64,
    canvas_h: f64,
    tiles_per_dim: u32,
    num_mip_maps: u32,
) -> Vec<TileKey> {
    if tiles_per_dim == 0 {
        return Vec::new();
    }

    let level = select_mip_level(camera.zoom, num_mip_maps);
    let rect = get_visible_rect(camera, canvas_w, canvas_h);

    let col_start = bound_to_tile(rect.min_x, tiles_per_dim);
    let col_end = bound_to_tile(rect.max_x, tiles_per_dim);
    let row_start = bound_to_tile(rect.min_y, tiles_per_dim);
    let row_end = bound_to_tile(rect.max_y, tiles_per_dim);

    let cols = (col_end - col_start) as usize + 1;
    let rows = (row_end - row_start) as usize + 1;
    let mut keys = Vec::with_capacity(cols.saturating_mul(rows));
    for col in col_start..=col_end {
        for row in row_start..=row_end {
            keys.push(TileKey::new(level, col, row));
        }
    }
    keys
}
