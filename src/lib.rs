//! # Pretext Streamer
//!
//! Decoder and viewport tile-streaming cache for PretextMap files.
//!
//! A PretextMap file stores a genome-wide Hi-C contact map as a pyramid of
//! tiled textures. Each tile is raw-deflate compressed and holds every mip
//! level in a single-channel BC4-style block format. Because the map is
//! symmetric only the upper triangle of tiles is stored.
//!
//! ## Features
//!
//! - **Header decoding**: magic check, inflated header, contig pixel spans
//! - **Block codec**: 4 bits per pixel BC4 blocks into normalized intensities
//! - **Viewport streaming**: mip selection and visible tiles for a camera
//! - **Bounded cache**: LRU store with pending/loaded/error lifecycle
//! - **Async decoding**: cancellable batches delivering tiles progressively
//!
//! ## Architecture
//!
//! - [`io`] - Bounds-checked byte reading and raw deflate
//! - [`mod@format`] - Header, tile addressing, block codec, file layout
//! - [`tile`] - Viewport math, tile cache, decode scheduler, streamer
//! - [`config`] - CLI and streamer options
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use bytes::Bytes;
//! use pretext_streamer::{Camera, PretextFile, StreamerOptions, TileStreamer};
//!
//! #[tokio::main]
//! async fn main() {
//!     let bytes = std::fs::read("map.pretext").unwrap();
//!     let file = PretextFile::parse(Bytes::from(bytes)).unwrap();
//!
//!     let mut streamer = TileStreamer::new(Arc::new(file), &StreamerOptions::default());
//!     streamer.update_viewport(&Camera::new(0.5, 0.5, 2.0), 1280.0, 800.0);
//!     let summary = streamer.wait_for_batch().await;
//!     println!("{:?}", summary);
//! }
//! ```

pub mod config;
pub mod error;
pub mod format;
pub mod io;
pub mod tile;

// Re-export commonly used types
pub use config::{Cli, Command, DecodeConfig, InfoConfig, StreamConfig, StreamerOptions};
pub use error::{FormatError, TileError};
pub use format::{
    decode_block, decode_level, is_pretext_header, level_resolution, parse_header,
    tile_linear_index, Contig, ExtensionTrack, Header, PretextFile,
};
pub use tile::{
    decode_tile, get_visible_rect, select_mip_level, tile_intersects, visible_tile_keys,
    BatchHandle, BatchSummary, CacheEntry, Camera, DecodeEvent, DecodedTile, TileDecodeScheduler,
    TileKey, TileState, TileStreamCache, TileStreamer, VisibleRect, DEFAULT_MAX_TILES,
};
