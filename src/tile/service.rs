//! Tile streamer: the viewport-to-cache pipeline.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         TileStreamer                            │
//! │  update_viewport()                       drain_ready()          │
//! │  1. Visible keys + touch                 5. Apply events        │
//! │  2. Diff against cache                      (load / error)      │
//! │  3. Mark pending                                 ▲              │
//! │  4. Dispatch batch ──────────┐                   │              │
//! │           │                  ▼                   │              │
//! │    ┌────────────────┐  ┌─────────────────────┐   │              │
//! │    │TileStreamCache │  │ TileDecodeScheduler │── mpsc channel   │
//! │    └────────────────┘  └─────────────────────┘                  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The streamer is the single owner of the cache. Decode results produced on
//! other tasks only reach the cache through the channel, when the owner
//! drains it.

use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::debug;

use crate::config::StreamerOptions;
use crate::format::PretextFile;

use super::cache::{CacheEntry, TileKey, TileStreamCache};
use super::scheduler::{BatchHandle, BatchSummary, DecodeEvent, TileDecodeScheduler};
use super::viewport::{select_mip_level, Camera};

/// What a viewport update decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewportUpdate {
    /// Viewport level for the camera zoom
    pub level: u32,

    /// Every key intersecting the view
    pub visible: Vec<TileKey>,

    /// Keys sent for decoding (visible but not yet resolved)
    pub dispatched: Vec<TileKey>,

    /// Identifier of the dispatched batch, if one was started
    pub batch: Option<u64>,
}

/// Streams the tiles of one file into a bounded cache as the viewport moves.
///
/// # Example
///
/// ```ignore
/// use pretext_streamer::tile::{Camera, TileStreamer};
///
/// let mut streamer = TileStreamer::new(Arc::new(file), &StreamerOptions::default());
/// streamer.update_viewport(&Camera::new(0.5, 0.5, 2.0), 1280.0, 800.0);
/// streamer.wait_for_batch().await;
/// ```
pub struct TileStreamer {
    file: Arc<PretextFile>,
    cache: TileStreamCache,
    scheduler: TileDecodeScheduler,
    events_tx: UnboundedSender<DecodeEvent>,
    events_rx: UnboundedReceiver<DecodeEvent>,
    current: Option<BatchHandle>,
}

impl TileStreamer {
    pub fn new(file: Arc<PretextFile>, options: &StreamerOptions) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            cache: TileStreamCache::with_capacity(options.max_tiles),
            scheduler: TileDecodeScheduler::new(Arc::clone(&file))
                .with_timeout(options.decode_timeout()),
            file,
            events_tx,
            events_rx,
            current: None,
        }
    }

    pub fn file(&self) -> &Arc<PretextFile> {
        &self.file
    }

    pub fn cache(&self) -> &TileStreamCache {
        &self.cache
    }

    /// Look up a tile, marking it as recently used.
    pub fn get_tile(&mut self, key: &TileKey) -> Option<&CacheEntry> {
        self.cache.get_tile(key)
    }

    /// Recompute the visible tiles and dispatch a decode batch for the unresolved ones.
    ///
    /// The previous batch is cancelled whenever a new one starts. Keys it left
    /// pending are still unresolved, so they are included again if visible.
    pub fn update_viewport(&mut self, camera: &Camera, canvas_w: f64, canvas_h: f64) -> ViewportUpdate {
        let header = self.file.header();
        let tiles_per_dim = header.number_of_textures_1d;
        let mip_levels = header.mip_levels();
        let level = select_mip_level(camera.zoom, mip_levels);

        // Apply whatever has already arrived so the diff is current
        self.drain_ready();

        let visible =
            self.cache
                .update_visible_tiles(camera, canvas_w, canvas_h, tiles_per_dim, mip_levels);
        let dispatched = self.cache.unresolved_keys(&visible);

        let batch = if dispatched.is_empty() {
            None
        } else {
            for key in &dispatched {
                self.cache.mark_pending(*key);
            }
            let handle = self.scheduler.dispatch_to(dispatched.clone(), self.events_tx.clone());
            let id = handle.id();
            self.current = Some(handle);
            Some(id)
        };

        debug!(
            level,
            visible = visible.len(),
            dispatched = dispatched.len(),
            "Viewport updated"
        );

        ViewportUpdate {
            level,
            visible,
            dispatched,
            batch,
        }
    }

    fn apply(&mut self, event: &DecodeEvent) {
        if let DecodeEvent::Tile { key, result, .. } = event {
            match result {
                Ok(tile) => self.cache.load_tile(*key, Arc::clone(tile)),
                Err(_) => self.cache.mark_error(*key),
            }
        }
    }

    /// Apply every decode event that has already arrived. Returns the number of tiles applied.
    pub fn drain_ready(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            if matches!(event, DecodeEvent::Tile { .. }) {
                applied += 1;
            }
            self.apply(&event);
        }
        applied
    }

    /// Wait for the next decode event and apply it.
    pub async fn next_ready(&mut self) -> Option<DecodeEvent> {
        let event = self.events_rx.recv().await?;
        self.apply(&event);
        Some(event)
    }

    /// Apply events until the most recent batch reports completion.
    ///
    /// Returns `None` if no batch has been dispatched.
    pub async fn wait_for_batch(&mut self) -> Option<BatchSummary> {
        let id = self.current.as_ref()?.id();
        while let Some(event) = self.next_ready().await {
            if let DecodeEvent::BatchFinished(summary) = event {
                if summary.batch == id {
                    self.current = None;
                    return Some(summary);
                }
            }
        }
        None
    }

    /// Cancel the running batch and clear the cache.
    ///
    /// Results still in flight are discarded. The streamer stays usable.
    pub fn dispose(&mut self) {
        self.scheduler.cancel_current();
        self.current = None;

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        self.events_tx = events_tx;
        self.events_rx = events_rx;

        self.cache.dispose();
    }
}
