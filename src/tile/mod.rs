//! Tile streaming layer.
//!
//! This module decides which tiles a viewport needs, decodes them off the
//! calling task and keeps the results in a bounded LRU cache.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │        Viewer (camera, rendering)       │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │              TileStreamer               │
//! │  ┌────────────────┐  ┌───────────────┐  │
//! │  │TileStreamCache │  │ TileDecode-   │  │
//! │  │ (LRU, pending/ │  │ Scheduler     │  │
//! │  │  loaded/error) │  │ (async batch) │  │
//! │  └────────────────┘  └───────────────┘  │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │        PretextFile (format layer)       │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`viewport`]: mip level selection, visible rect, intersecting tile keys
//! - [`TileStreamCache`]: LRU store keyed by [`TileKey`]
//! - [`decode_tile`]: inflate + BC4 decode of one tile record into a [`DecodedTile`]
//! - [`TileDecodeScheduler`]: cancellable asynchronous decode batches
//! - [`TileStreamer`]: the whole pipeline behind one owner

mod cache;
mod decode;
mod scheduler;
mod service;
pub mod viewport;

pub use cache::{CacheEntry, TileKey, TileState, TileStreamCache, DEFAULT_MAX_TILES};
pub use decode::{decode_tile, DecodeOutcome, DecodedTile};
pub use scheduler::{
    BatchHandle, BatchSummary, CancelToken, DecodeEvent, TileDecodeScheduler, TileResult,
};
pub use service::{TileStreamer, ViewportUpdate};
pub use viewport::{
    get_visible_rect, select_mip_level, tile_intersects, visible_tile_keys, Camera, VisibleRect,
};
