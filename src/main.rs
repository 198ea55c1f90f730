//! Pretext Streamer - inspect PretextMap files and exercise the tile streamer.

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use bytes::Bytes;
use clap::Parser;
use image::GrayImage;
use serde::Serialize;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pretext_streamer::{
    config::{Cli, Command, DecodeConfig, InfoConfig, StreamConfig},
    decode_tile,
    format::{tile_linear_index, Contig, Header, PretextFile},
    tile::{Camera, TileState, TileStreamer},
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Info(config) => run_info(config).await,
        Command::Decode(config) => run_decode(config).await,
        Command::Stream(config) => run_stream(config).await,
    }
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "pretext_streamer=debug"
    } else {
        "pretext_streamer=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Read and parse a file, logging a single load failure message on error.
async fn load_file(path: &Path) -> Option<PretextFile> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            error!("Could not load file {}: {}", path.display(), e);
            return None;
        }
    };

    match PretextFile::parse(Bytes::from(bytes)) {
        Ok(file) => Some(file),
        Err(e) => {
            error!("Could not load file {}: {}", path.display(), e);
            None
        }
    }
}

// =============================================================================
// Info Command
// =============================================================================

#[derive(Serialize)]
struct ExtensionSummary<'a> {
    name: &'a str,
    min: Option<i32>,
    max: Option<i32>,
}

#[derive(Serialize)]
struct InfoReport<'a> {
    header: &'a Header,
    contigs: &'a [Contig],
    extensions: Vec<ExtensionSummary<'a>>,
}

async fn run_info(config: InfoConfig) -> ExitCode {
    let Some(file) = load_file(&config.file).await else {
        return ExitCode::FAILURE;
    };

    let report = InfoReport {
        header: file.header(),
        contigs: file.contigs(),
        extensions: file
            .extensions()
            .iter()
            .map(|track| ExtensionSummary {
                name: &track.name,
                min: track.values.iter().copied().min(),
                max: track.values.iter().copied().max(),
            })
            .collect(),
    };

    if config.json {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                error!("Failed to serialize report: {}", e);
                return ExitCode::FAILURE;
            }
        }
        return ExitCode::SUCCESS;
    }

    let header = report.header;
    println!("Genome length:     {} bp", header.genome_length);
    println!("Contigs:           {}", header.contig_count);
    println!(
        "Textures:          {}x{} of {}x{} px, {} mip levels",
        header.number_of_textures_1d,
        header.number_of_textures_1d,
        header.texture_resolution,
        header.texture_resolution,
        header.mip_map_levels
    );
    println!("Map size:          {} px", header.number_of_pixels_1d);
    println!("Stored tiles:      {}", header.number_of_texture_blocks);
    println!("Bytes per texture: {}", header.bytes_per_texture);
    println!();
    for contig in report.contigs {
        println!(
            "  {:<32} {:>12} bp  px {:>8}..{:<8}",
            contig.name, contig.length, contig.pixel_start, contig.pixel_end
        );
    }
    if !report.extensions.is_empty() {
        println!();
        for ext in &report.extensions {
            println!(
                "  extension {:<24} min {:?} max {:?}",
                ext.name, ext.min, ext.max
            );
        }
    }

    ExitCode::SUCCESS
}

// =============================================================================
// Decode Command
// =============================================================================

async fn run_decode(config: DecodeConfig) -> ExitCode {
    let Some(file) = load_file(&config.file).await else {
        return ExitCode::FAILURE;
    };
    let header = file.header();

    if let Err(e) = config.validate(header.number_of_textures_1d) {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let index = tile_linear_index(config.col, config.row, header.number_of_textures_1d);
    let outcome = decode_tile(&file.tile_bytes(index), index, header);
    for issue in &outcome.issues {
        warn!("{}", issue);
    }

    // Records are stored once for the upper triangle
    let tile = if config.col > config.row {
        outcome.tile.transposed()
    } else {
        outcome.tile
    };

    println!("Tile ({}, {}) -> record {}", config.col, config.row, index);
    for (level, samples) in tile.levels().iter().enumerate() {
        let res = tile.resolution(level);
        let (min, max, sum) = samples.iter().fold(
            (f32::INFINITY, f32::NEG_INFINITY, 0f64),
            |(min, max, sum), &v| (min.min(v), max.max(v), sum + f64::from(v)),
        );
        let mean = if samples.is_empty() {
            0.0
        } else {
            sum / samples.len() as f64
        };
        println!(
            "  level {}: {}x{}  min {:.4}  max {:.4}  mean {:.4}",
            level, res, res, min, max, mean
        );
    }

    if let Some(path) = config.png {
        let res = tile.resolution(0);
        let pixels = tile
            .level(0)
            .unwrap_or_default()
            .iter()
            .map(|&v| (v * 255.0).round().clamp(0.0, 255.0) as u8)
            .collect();
        let Some(image) = GrayImage::from_raw(res, res, pixels) else {
            error!("Decoded level does not match {}x{}", res, res);
            return ExitCode::FAILURE;
        };
        if let Err(e) = image.save(&path) {
            error!("Failed to write {}: {}", path.display(), e);
            return ExitCode::FAILURE;
        }
        info!("Wrote {}", path.display());
    }

    ExitCode::SUCCESS
}

// =============================================================================
// Stream Command
// =============================================================================

async fn run_stream(config: StreamConfig) -> ExitCode {
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let Some(file) = load_file(&config.file).await else {
        return ExitCode::FAILURE;
    };

    let mut streamer = TileStreamer::new(Arc::new(file), &config.streamer);
    let camera = Camera::new(config.x, config.y, config.zoom);
    let update = streamer.update_viewport(&camera, config.width, config.height);

    info!(
        "Level {}: {} visible tiles, {} dispatched",
        update.level,
        update.visible.len(),
        update.dispatched.len()
    );

    if let Some(summary) = streamer.wait_for_batch().await {
        info!(
            "Batch {}: {} delivered, {} failed",
            summary.batch, summary.delivered, summary.failed
        );
    }

    let cache = streamer.cache();
    println!("Visible tiles: {}", update.visible.len());
    println!(
        "Cache: {} / {} entries ({} loaded, {} error, {} pending), {} bytes decoded",
        cache.len(),
        cache.capacity(),
        cache.count_in_state(TileState::Loaded),
        cache.count_in_state(TileState::Error),
        cache.count_in_state(TileState::Pending),
        cache.payload_bytes()
    );

    streamer.dispose();
    ExitCode::SUCCESS
}
