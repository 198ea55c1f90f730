//! Configuration for the `pretext-streamer` command-line tool.
//!
//! This module provides:
//! - Command-line arguments via clap
//! - Environment variables with `PRETEXT_` prefix for the streaming options
//! - Sensible defaults for all optional settings
//!
//! # Environment Variables
//!
//! - `PRETEXT_MAX_TILES` - Max decoded tiles held by the cache (default: 256)
//! - `PRETEXT_DECODE_TIMEOUT_MS` - Per-tile decode timeout, 0 disables (default: 0)

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::tile::DEFAULT_MAX_TILES;

// =============================================================================
// Default Values
// =============================================================================

/// Default canvas width in pixels for `stream`.
pub const DEFAULT_CANVAS_WIDTH: f64 = 1024.0;

/// Default canvas height in pixels for `stream`.
pub const DEFAULT_CANVAS_HEIGHT: f64 = 1024.0;

/// Largest accepted tile cache capacity.
pub const MAX_TILE_CAPACITY: usize = 1 << 20;

// =============================================================================
// CLI Arguments
// =============================================================================

/// Inspect PretextMap contact map files and exercise the tile streamer.
#[derive(Parser, Debug, Clone)]
#[command(name = "pretext-streamer")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print the header, contigs and extension tracks of a file.
    Info(InfoConfig),

    /// Decode one tile and print per-level statistics.
    Decode(DecodeConfig),

    /// Run one viewport update through the tile streamer.
    Stream(StreamConfig),
}

#[derive(Args, Debug, Clone)]
pub struct InfoConfig {
    /// PretextMap file to read.
    pub file: PathBuf,

    /// Print JSON instead of text.
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct DecodeConfig {
    /// PretextMap file to read.
    pub file: PathBuf,

    /// Tile column.
    #[arg(long)]
    pub col: u32,

    /// Tile row.
    #[arg(long)]
    pub row: u32,

    /// Write the finest mip level as an 8-bit grayscale PNG.
    #[arg(long)]
    pub png: Option<PathBuf>,
}

impl DecodeConfig {
    /// Validate tile coordinates against the number of tiles per side.
    pub fn validate(&self, tiles_per_dim: u32) -> Result<(), String> {
        if self.col >= tiles_per_dim || self.row >= tiles_per_dim {
            return Err(format!(
                "tile ({}, {}) is outside the {}x{} tile grid",
                self.col, self.row, tiles_per_dim, tiles_per_dim
            ));
        }
        Ok(())
    }
}

#[derive(Args, Debug, Clone)]
pub struct StreamConfig {
    /// PretextMap file to read.
    pub file: PathBuf,

    /// Camera x in normalized map space.
    #[arg(long, default_value_t = 0.5, allow_negative_numbers = true)]
    pub x: f64,

    /// Camera y in normalized map space.
    #[arg(long, default_value_t = 0.5, allow_negative_numbers = true)]
    pub y: f64,

    /// Camera zoom (1 shows the whole map).
    #[arg(long, default_value_t = 1.0)]
    pub zoom: f64,

    /// Canvas width in pixels.
    #[arg(long, default_value_t = DEFAULT_CANVAS_WIDTH)]
    pub width: f64,

    /// Canvas height in pixels.
    #[arg(long, default_value_t = DEFAULT_CANVAS_HEIGHT)]
    pub height: f64,

    #[command(flatten)]
    pub streamer: StreamerOptions,
}

impl StreamConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.zoom.is_finite() && self.zoom > 0.0) {
            return Err("zoom must be a positive number".to_string());
        }
        if !(self.width > 0.0 && self.height > 0.0) {
            return Err("canvas width and height must be positive".to_string());
        }
        if !(self.x.is_finite() && self.y.is_finite()) {
            return Err("camera position must be finite".to_string());
        }
        self.streamer.validate()
    }
}

// =============================================================================
// Streamer Options
// =============================================================================

/// Tunables of a [`TileStreamer`](crate::tile::TileStreamer).
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct StreamerOptions {
    /// Maximum number of decoded tiles to keep in the cache.
    #[arg(long, default_value_t = DEFAULT_MAX_TILES, env = "PRETEXT_MAX_TILES")]
    pub max_tiles: usize,

    /// Per-tile decode timeout in milliseconds (0 disables the timeout).
    #[arg(long, default_value_t = 0, env = "PRETEXT_DECODE_TIMEOUT_MS")]
    pub decode_timeout_ms: u64,
}

impl StreamerOptions {
    /// Validate the options and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_tiles == 0 {
            return Err("max_tiles must be greater than 0".to_string());
        }
        if self.max_tiles > MAX_TILE_CAPACITY {
            return Err(format!("max_tiles must be at most {}", MAX_TILE_CAPACITY));
        }
        Ok(())
    }

    pub fn decode_timeout(&self) -> Option<Duration> {
        (self.decode_timeout_ms > 0).then(|| Duration::from_millis(self.decode_timeout_ms))
    }
}

impl Default for StreamerOptions {
    fn default() -> Self {
        Self {
            max_tiles: DEFAULT_MAX_TILES,
            decode_timeout_ms: 0,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
