//! Streaming integration tests.
//!
//! Tests verify:
//! - A viewport update decodes its visible tiles into the cache
//! - Tiles arrive progressively through the event channel
//! - Tiles below the diagonal are served from their stored counterpart
//! - Damaged records load as blank tiles without stopping the batch

use std::sync::Arc;

use pretext_streamer::tile::ViewportUpdate;
use pretext_streamer::{
    Camera, DecodeEvent, PretextFile, StreamerOptions, TileDecodeScheduler, TileKey, TileState,
    TileStreamer,
};

use super::test_utils::{uniform_block, PretextFileBuilder};

/// 8x8 textures, 4 per side, two mip levels; stored tile `i` is filled with `10 * i`.
fn graded_file() -> Arc<PretextFile> {
    let mut builder = PretextFileBuilder::new(3, 2, 2);
    let blocks = builder.tile_bytes() / 8;
    for i in 0..10u8 {
        builder = builder.tile(uniform_block(10 * i).repeat(blocks));
    }
    Arc::new(builder.parse())
}

fn options(max_tiles: usize) -> StreamerOptions {
    StreamerOptions {
        max_tiles,
        ..StreamerOptions::default()
    }
}

#[tokio::test]
async fn test_stream_full_view() {
    let mut streamer = TileStreamer::new(graded_file(), &options(64));
    let update = streamer.update_viewport(&Camera::default(), 1024.0, 1024.0);

    assert_eq!(update.level, 0);
    assert_eq!(update.visible.len(), 16);
    assert_eq!(update.dispatched, update.visible);

    let summary = streamer.wait_for_batch().await.unwrap();
    assert_eq!(summary.requested, 16);
    assert_eq!(summary.delivered, 16);
    assert_eq!(summary.failed, 0);
    assert!(!summary.cancelled);

    let cache = streamer.cache();
    assert_eq!(cache.count_in_state(TileState::Loaded), 16);
    assert_eq!(cache.count_in_state(TileState::Pending), 0);
}

#[tokio::test]
async fn test_mirrored_tiles_match_stored_tiles() {
    let mut streamer = TileStreamer::new(graded_file(), &options(64));
    streamer.update_viewport(&Camera::default(), 1024.0, 1024.0);
    streamer.wait_for_batch().await.unwrap();

    for col in 0..4 {
        for row in 0..col {
            let lower = streamer
                .get_tile(&TileKey::new(0, col, row))
                .and_then(|e| e.data.clone())
                .unwrap();
            let upper = streamer
                .get_tile(&TileKey::new(0, row, col))
                .and_then(|e| e.data.clone())
                .unwrap();
            assert_eq!(*lower, upper.transposed());
        }
    }

    // Stored tile 5 is (1, 2): 10 * 5 = 50
    let tile = streamer
        .get_tile(&TileKey::new(0, 2, 1))
        .and_then(|e| e.data.clone())
        .unwrap();
    let mip = tile.mip_for_view_level(0);
    assert_eq!(mip, 1);
    let expected = 50.0 / 255.0;
    assert!(tile.level(mip).unwrap().iter().all(|&v| v == expected));
}

#[tokio::test]
async fn test_tiles_arrive_progressively() {
    let mut streamer = TileStreamer::new(graded_file(), &options(64));
    let update: ViewportUpdate = streamer.update_viewport(&Camera::default(), 1024.0, 1024.0);
    let batch = update.batch.unwrap();

    let mut tiles = 0;
    loop {
        match streamer.next_ready().await.unwrap() {
            DecodeEvent::Tile { batch: id, key, result } => {
                assert_eq!(id, batch);
                assert!(result.is_ok());
                tiles += 1;
                // Applied as soon as it arrives
                assert_eq!(
                    streamer.cache().peek(&key).map(|e| e.state),
                    Some(TileState::Loaded)
                );
            }
            DecodeEvent::BatchFinished(summary) => {
                assert_eq!(summary.batch, batch);
                break;
            }
        }
    }
    assert_eq!(tiles, 16);
}

#[tokio::test]
async fn test_panning_only_decodes_new_tiles() {
    let mut streamer = TileStreamer::new(graded_file(), &options(64));

    // Zoom 2 on the top-left corner: tiles (0..=2, 0..=2) at level 1
    let first = streamer.update_viewport(&Camera::new(0.25, 0.25, 2.0), 100.0, 100.0);
    assert_eq!(first.level, 1);
    assert_eq!(first.visible.len(), 9);
    streamer.wait_for_batch().await.unwrap();

    // Pan right by one tile: only the new column is dispatched
    let second = streamer.update_viewport(&Camera::new(0.5, 0.25, 2.0), 100.0, 100.0);
    assert_eq!(second.visible.len(), 9);
    assert_eq!(second.dispatched.len(), 3);
    assert!(second.dispatched.iter().all(|k| k.col == 3));
    streamer.wait_for_batch().await.unwrap();
    assert_eq!(streamer.cache().len(), 12);
}

#[tokio::test]
async fn test_small_cache_keeps_latest_view() {
    let mut streamer = TileStreamer::new(graded_file(), &options(9));

    streamer.update_viewport(&Camera::new(0.25, 0.25, 2.0), 100.0, 100.0);
    streamer.wait_for_batch().await.unwrap();
    let update = streamer.update_viewport(&Camera::new(0.75, 0.75, 2.0), 100.0, 100.0);
    streamer.wait_for_batch().await.unwrap();

    let cache = streamer.cache();
    assert_eq!(cache.len(), 9);
    for key in &update.visible {
        assert_eq!(cache.peek(key).map(|e| e.state), Some(TileState::Loaded));
    }
}

#[tokio::test]
async fn test_damaged_record_loads_blank() {
    // Tile 1 (0, 1) is cut short; the rest are uniform 255
    let builder = PretextFileBuilder::new(2, 1, 1);
    let file = builder
        .tile(uniform_block(255).to_vec())
        .tile(vec![255, 255])
        .tile(uniform_block(255).to_vec())
        .parse();
    let mut streamer = TileStreamer::new(Arc::new(file), &options(16));

    streamer.update_viewport(&Camera::default(), 256.0, 256.0);
    let summary = streamer.wait_for_batch().await.unwrap();
    assert_eq!(summary.delivered, 4);
    assert_eq!(summary.failed, 0);

    let damaged = streamer
        .get_tile(&TileKey::new(0, 0, 1))
        .and_then(|e| e.data.clone())
        .unwrap();
    assert!(damaged.is_blank());

    let intact = streamer
        .get_tile(&TileKey::new(0, 1, 1))
        .and_then(|e| e.data.clone())
        .unwrap();
    assert!(intact.level(0).unwrap().iter().all(|&v| v == 1.0));
}

#[tokio::test]
async fn test_scheduler_callbacks_without_streamer() {
    let file = graded_file();
    let mut scheduler = TileDecodeScheduler::new(Arc::clone(&file));
    let (done_tx, done_rx) = tokio::sync::oneshot::channel();

    let keys = vec![TileKey::new(1, 3, 3), TileKey::new(1, 3, 0)];
    let handle = scheduler.dispatch(
        keys,
        |key, result| assert!(result.is_ok(), "tile {} failed", key),
        move |summary| {
            let _ = done_tx.send(summary);
        },
    );

    let summary = done_rx.await.unwrap();
    assert_eq!(summary.delivered, 2);
    assert_eq!(handle.wait().await, summary);
}

#[tokio::test]
async fn test_decode_timeout_marks_error() {
    // One 2048x2048 texture; decoding it takes well over a millisecond
    let file = PretextFileBuilder::new(11, 0, 1).uniform_tiles(1, 0).parse();
    let options = StreamerOptions {
        max_tiles: 4,
        decode_timeout_ms: 1,
    };
    let mut streamer = TileStreamer::new(Arc::new(file), &options);

    let update = streamer.update_viewport(&Camera::default(), 256.0, 256.0);
    assert_eq!(update.visible, vec![TileKey::new(0, 0, 0)]);

    let summary = streamer.wait_for_batch().await.unwrap();
    assert_eq!(summary.failed, 1);

    let entry = streamer.get_tile(&TileKey::new(0, 0, 0)).unwrap();
    assert_eq!(entry.state, TileState::Error);
    assert!(entry.data.is_none());

    // Errors are resolved, so the same view dispatches nothing
    let again = streamer.update_viewport(&Camera::default(), 256.0, 256.0);
    assert!(again.dispatched.is_empty());
}
