//! PretextMap file format decoding.
//!
//! - [`detect`]: magic-byte sniffing
//! - [`header`]: header blob parsing and contig pixel spans
//! - [`index`]: upper-triangular tile addressing and pyramid sizes
//! - [`bc4`]: BC4-style block and mip level decoding
//! - [`layout`]: tile record table and extension records of a whole file

pub mod bc4;
pub mod detect;
pub mod header;
pub mod index;
pub mod layout;

pub use bc4::{block_palette, decode_block, decode_level, BLOCK_SAMPLES};
pub use detect::{is_extension_header, is_pretext_header, EXTENSION_MAGIC, PRETEXT_MAGIC};
pub use header::{assign_pixel_spans, parse_header, Contig, Header, NAME_BYTES};
pub use index::{
    bytes_per_texture, level_byte_size, level_resolution, texture_block_count,
    tile_coords_for_index, tile_linear_index, BLOCK_BYTES, BLOCK_DIM,
};
pub use layout::{ExtensionTrack, PretextFile};
