//! Test utilities for integration tests.
//!
//! This module provides a builder that writes PretextMap files with
//! arbitrary contigs, tiles and extension tracks.

use std::io::Write;

use bytes::Bytes;
use flate2::write::DeflateEncoder;
use flate2::Compression;

use pretext_streamer::PretextFile;

/// Raw-deflate compress a buffer.
pub fn deflate(data: &[u8]) -> Vec<u8> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// An 8-byte block whose sixteen samples all equal `value`.
pub fn uniform_block(value: u8) -> [u8; 8] {
    [value, value, 0, 0, 0, 0, 0, 0]
}

/// Builder for in-memory PretextMap files.
pub struct PretextFileBuilder {
    genome_length: u64,
    contigs: Vec<(f32, String)>,
    texture_res: u8,
    n_text_res: u8,
    mip_map_levels: u8,
    tiles: Vec<Vec<u8>>,
    extensions: Vec<(String, Vec<i32>)>,
}

impl PretextFileBuilder {
    pub fn new(texture_res: u8, n_text_res: u8, mip_map_levels: u8) -> Self {
        Self {
            genome_length: 1_000_000,
            contigs: vec![(1.0, "chr1".to_string())],
            texture_res,
            n_text_res,
            mip_map_levels,
            tiles: Vec::new(),
            extensions: Vec::new(),
        }
    }

    pub fn genome_length(mut self, length: u64) -> Self {
        self.genome_length = length;
        self
    }

    pub fn contigs(mut self, contigs: &[(f32, &str)]) -> Self {
        self.contigs = contigs
            .iter()
            .map(|(fraction, name)| (*fraction, name.to_string()))
            .collect();
        self
    }

    /// Append an uncompressed tile record; it is deflated on build.
    pub fn tile(mut self, data: Vec<u8>) -> Self {
        self.tiles.push(data);
        self
    }

    /// Append `count` tiles with every block set to `value`.
    pub fn uniform_tiles(mut self, count: usize, value: u8) -> Self {
        let blocks = self.tile_bytes() / 8;
        for _ in 0..count {
            self.tiles.push(uniform_block(value).repeat(blocks));
        }
        self
    }

    pub fn extension(mut self, name: &str, values: Vec<i32>) -> Self {
        self.extensions.push((name.to_string(), values));
        self
    }

    /// Uncompressed size of one whole tile (every mip level).
    pub fn tile_bytes(&self) -> usize {
        (0..self.mip_map_levels as u32)
            .map(|level| {
                let res = 1usize << (self.texture_res as u32 - level);
                res * res / 2
            })
            .sum()
    }

    /// Encode the inflated header body.
    pub fn header_body(&self) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(&(self.genome_length as u32).to_le_bytes());
        body.extend_from_slice(&((self.genome_length >> 32) as u32).to_le_bytes());
        body.extend_from_slice(&(self.contigs.len() as u32).to_le_bytes());
        for (fraction, name) in &self.contigs {
            body.extend_from_slice(&fraction.to_le_bytes());
            let mut raw = [0u8; 64];
            raw[..name.len()].copy_from_slice(name.as_bytes());
            body.extend_from_slice(&raw);
        }
        body.extend_from_slice(&[self.texture_res, self.n_text_res, self.mip_map_levels]);
        body
    }

    pub fn build(&self) -> Vec<u8> {
        let body = self.header_body();
        let compressed = deflate(&body);

        let mut file = b"pstm".to_vec();
        file.extend_from_slice(&(compressed.len() as u32).to_le_bytes());
        file.extend_from_slice(&(body.len() as u32).to_le_bytes());
        file.extend_from_slice(&compressed);

        for tile in &self.tiles {
            let blob = deflate(tile);
            file.extend_from_slice(&(blob.len() as u32).to_le_bytes());
            file.extend_from_slice(&blob);
        }

        for (name, values) in &self.extensions {
            let mut payload = [0u8; 64].to_vec();
            payload[..name.len()].copy_from_slice(name.as_bytes());
            for value in values {
                payload.extend_from_slice(&value.to_le_bytes());
            }
            let blob = deflate(&payload);
            file.extend_from_slice(b"psgh");
            file.extend_from_slice(&(blob.len() as u32).to_le_bytes());
            file.extend_from_slice(&blob);
        }

        file
    }

    pub fn parse(&self) -> PretextFile {
        PretextFile::parse(Bytes::from(self.build())).unwrap()
    }
}
