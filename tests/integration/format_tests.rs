//! File format integration tests.
//!
//! Tests verify:
//! - Whole files decode into header, contigs, tiles and extension tracks
//! - Fatal header errors are reported and nothing else is parsed
//! - A damaged tile record never affects its neighbours

use bytes::Bytes;

use pretext_streamer::{decode_tile, parse_header, tile_linear_index, FormatError, PretextFile};

use super::test_utils::{deflate, uniform_block, PretextFileBuilder};

// =============================================================================
// Whole Files
// =============================================================================

#[test]
fn test_minimal_file_decodes_three_blank_tiles() {
    let builder = PretextFileBuilder::new(2, 1, 1)
        .tile(vec![0; 8])
        .tile(vec![0; 8])
        .tile(vec![0; 8]);
    let file = builder.parse();

    let header = file.header();
    assert_eq!(header.texture_resolution, 4);
    assert_eq!(header.number_of_textures_1d, 2);
    assert_eq!(header.number_of_pixels_1d, 8);
    assert_eq!(header.number_of_texture_blocks, 3);
    assert_eq!(header.bytes_per_texture, 8);
    assert_eq!(file.tile_records().len(), 3);

    for index in 0..3 {
        let outcome = decode_tile(&file.tile_bytes(index), index, header);
        assert!(outcome.is_clean());
        assert_eq!(outcome.tile.mip_count(), 1);
        let level = outcome.tile.level(0).unwrap();
        assert_eq!(level.len(), 16);
        assert!(level.iter().all(|&v| v == 0.0));
    }
}

#[test]
fn test_multi_level_tile_decodes_every_level() {
    // 8x8 base level (4 blocks) then a 4x4 level (1 block)
    let mut data = uniform_block(255).repeat(4);
    data.extend_from_slice(&uniform_block(51));
    let file = PretextFileBuilder::new(3, 0, 2).tile(data).parse();

    let outcome = decode_tile(&file.tile_bytes(0), 0, file.header());
    assert!(outcome.is_clean());
    assert_eq!(outcome.tile.resolution(0), 8);
    assert_eq!(outcome.tile.resolution(1), 4);
    assert!(outcome.tile.level(0).unwrap().iter().all(|&v| v == 1.0));
    assert!(outcome
        .tile
        .level(1)
        .unwrap()
        .iter()
        .all(|&v| (v - 0.2).abs() < 1e-6));
}

#[test]
fn test_contig_spans_cover_the_map() {
    let file = PretextFileBuilder::new(4, 2, 1)
        .genome_length(10_000_000_000)
        .contigs(&[(0.3, "scaffold_1"), (0.3, "scaffold_2"), (0.4, "scaffold_3")])
        .uniform_tiles(10, 0)
        .parse();

    let header = file.header();
    assert_eq!(header.genome_length, 10_000_000_000);
    assert_eq!(header.number_of_pixels_1d, 64);

    let contigs = file.contigs();
    assert_eq!(contigs.len(), 3);
    assert_eq!(contigs[0].name, "scaffold_1");
    assert_eq!(contigs[0].pixel_start, 0);
    for pair in contigs.windows(2) {
        assert_eq!(pair[0].pixel_end, pair[1].pixel_start);
        assert!(pair[0].pixel_start <= pair[0].pixel_end);
    }
    assert_eq!(contigs[2].pixel_end, 64);
    // Stored fractions are f32, so lengths are only close to the exact split
    assert!(contigs[0].length.abs_diff(3_000_000_000) < 1_000);
}

#[test]
fn test_extension_tracks() {
    let coverage: Vec<i32> = (0..8).map(|i| i * 10 - 5).collect();
    let file = PretextFileBuilder::new(2, 1, 1)
        .uniform_tiles(3, 0)
        .extension("coverage", coverage.clone())
        .extension("gaps", vec![0; 8])
        .parse();

    let extensions = file.extensions();
    assert_eq!(extensions.len(), 2);
    assert_eq!(extensions[0].name, "coverage");
    assert_eq!(extensions[0].values, coverage);
    assert_eq!(extensions[1].name, "gaps");
}

#[test]
fn test_malformed_extension_is_skipped() {
    let mut bytes = PretextFileBuilder::new(2, 1, 1)
        .uniform_tiles(3, 0)
        .extension("coverage", vec![1; 8])
        .build();

    // Second extension declares a payload that is not valid deflate
    bytes.extend_from_slice(b"psgh");
    bytes.extend_from_slice(&4u32.to_le_bytes());
    bytes.extend_from_slice(&[0xFF; 4]);

    let file = PretextFile::parse(Bytes::from(bytes)).unwrap();
    assert_eq!(file.extensions().len(), 1);
    assert_eq!(file.extensions()[0].name, "coverage");
}

// =============================================================================
// Fatal Errors
// =============================================================================

#[test]
fn test_bad_magic() {
    let mut bytes = PretextFileBuilder::new(2, 1, 1).uniform_tiles(3, 0).build();
    bytes[..4].copy_from_slice(b"PSTM");

    match PretextFile::parse(Bytes::from(bytes)) {
        Err(FormatError::BadMagic(got)) => assert_eq!(got, b"PSTM".to_vec()),
        other => panic!("expected BadMagic, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_header_size_mismatch() {
    let builder = PretextFileBuilder::new(2, 1, 1);
    let body = builder.header_body();
    let compressed = deflate(&body);

    let mut bytes = b"pstm".to_vec();
    bytes.extend_from_slice(&(compressed.len() as u32).to_le_bytes());
    bytes.extend_from_slice(&(body.len() as u32 + 10).to_le_bytes());
    bytes.extend_from_slice(&compressed);

    assert_eq!(
        parse_header(&bytes).unwrap_err(),
        FormatError::HeaderSizeMismatch {
            declared: body.len() as u32 + 10,
            actual: body.len(),
        }
    );
}

#[test]
fn test_truncated_header_blob() {
    let bytes = PretextFileBuilder::new(2, 1, 1).build();
    let cut = &bytes[..16];
    assert!(matches!(
        parse_header(cut),
        Err(FormatError::Truncated { .. })
    ));
}

#[test]
fn test_huge_declared_grid_is_rejected() {
    // 2^24 textures per side, but nothing after the header
    let bytes = PretextFileBuilder::new(2, 24, 1).build();
    assert!(bytes.len() < 200);

    match PretextFile::parse(Bytes::from(bytes)) {
        Err(FormatError::Truncated { field, needed, .. }) => {
            assert_eq!(field, "tile table");
            assert!(needed > 1 << 40);
        }
        other => panic!("expected Truncated, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_tiny_texture_is_rejected() {
    let bytes = PretextFileBuilder::new(1, 1, 1).build();
    assert!(matches!(
        parse_header(&bytes),
        Err(FormatError::InvalidTextureParameters { .. })
    ));
}

// =============================================================================
// Isolated Tile Failures
// =============================================================================

#[test]
fn test_truncated_tile_does_not_block_others() {
    // Tile 1 inflates to 4 bytes, half of the 8 the single 4x4 level needs
    let file = PretextFileBuilder::new(2, 1, 1)
        .tile(uniform_block(255).to_vec())
        .tile(vec![255, 255, 0, 0])
        .tile(uniform_block(255).to_vec())
        .parse();
    let header = file.header();

    let broken = decode_tile(&file.tile_bytes(1), 1, header);
    assert!(!broken.is_clean());
    assert!(broken.tile.is_blank());

    for index in [0, 2] {
        let outcome = decode_tile(&file.tile_bytes(index), index, header);
        assert!(outcome.is_clean());
        assert!(outcome.tile.level(0).unwrap().iter().all(|&v| v == 1.0));
    }
}

#[test]
fn test_missing_tile_records_are_blank() {
    // Only two of the three records are present
    let file = PretextFileBuilder::new(2, 1, 1)
        .uniform_tiles(2, 255)
        .parse();
    assert_eq!(file.tile_records().len(), 2);
    assert!(file.tile_bytes(2).is_empty());

    let index = tile_linear_index(1, 1, 2);
    assert_eq!(index, 2);
    let outcome = decode_tile(&file.tile_bytes(index), index, file.header());
    assert!(!outcome.is_clean());
    assert!(outcome.tile.is_blank());
}
