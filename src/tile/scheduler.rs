//! Asynchronous, cancellable tile decode batches.
//!
//! A batch decodes a list of tile keys one after another on a tokio task.
//! Each tile is inflated and decoded on the blocking pool, and its result is
//! handed to the per-tile callback as soon as it is ready, so detail appears
//! progressively. The task checks its cancellation token before each tile and
//! yields back to the runtime after each one.
//!
//! Only one batch is active per scheduler: dispatching a new batch cancels the
//! previous one. Tiles already delivered stay delivered.
//!
//! All dispatch methods must be called from within a tokio runtime.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::TileError;
use crate::format::{tile_linear_index, PretextFile};

use super::cache::TileKey;
use super::decode::{decode_tile, DecodedTile};

/// Outcome of one tile in a batch.
///
/// Corrupt records still decode to a blank tile (`Ok`); `Err` means no tile
/// could be produced at all.
pub type TileResult = Result<Arc<DecodedTile>, TileError>;

// =============================================================================
// Cancellation
// =============================================================================

/// Cooperative cancellation flag shared between a batch and its handle.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// =============================================================================
// Batch Types
// =============================================================================

/// Counts reported when a batch stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchSummary {
    /// Batch identifier, increasing per scheduler
    pub batch: u64,
    pub requested: usize,
    pub delivered: usize,
    pub failed: usize,

    /// Whether the batch stopped before reaching its last tile
    pub cancelled: bool,
}

/// Messages produced by a batch dispatched onto a channel.
#[derive(Debug, Clone)]
pub enum DecodeEvent {
    Tile {
        batch: u64,
        key: TileKey,
        result: TileResult,
    },
    BatchFinished(BatchSummary),
}

/// Handle to a running batch.
#[derive(Debug)]
pub struct BatchHandle {
    id: u64,
    token: CancelToken,
    task: JoinHandle<BatchSummary>,
}

impl BatchHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Stop dispatching the remaining tiles of this batch.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the batch task to stop and return its summary.
    pub async fn wait(self) -> BatchSummary {
        let id = self.id;
        self.task.await.unwrap_or_else(|e| {
            warn!(batch = id, error = %e, "Decode batch task failed");
            BatchSummary {
                batch: id,
                cancelled: true,
                ..BatchSummary::default()
            }
        })
    }
}

// =============================================================================
// Scheduler
// =============================================================================

/// Dispatches decode batches for the tiles of one file.
pub struct TileDecodeScheduler {
    file: Arc<PretextFile>,
    timeout: Option<Duration>,
    next_batch: u64,
    current: Option<CancelToken>,
}

impl TileDecodeScheduler {
    pub fn new(file: Arc<PretextFile>) -> Self {
        Self {
            file,
            timeout: None,
            next_batch: 0,
            current: None,
        }
    }

    /// Give up on a tile whose decode takes longer than `timeout`.
    ///
    /// A timed out tile is reported as [`TileError::Timeout`].
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn file(&self) -> &Arc<PretextFile> {
        &self.file
    }

    /// Cancel the active batch, if any.
    pub fn cancel_current(&mut self) {
        if let Some(token) = self.current.take() {
            token.cancel();
        }
    }

    /// Start decoding `keys`, calling `on_tile` per tile and `on_complete` once at the end.
    ///
    /// Any batch started earlier by this scheduler is cancelled first.
    pub fn dispatch<F, G>(&mut self, keys: Vec<TileKey>, mut on_tile: F, on_complete: G) -> BatchHandle
    where
        F: FnMut(TileKey, TileResult) + Send + 'static,
        G: FnOnce(BatchSummary) + Send + 'static,
    {
        self.cancel_current();

        let id = self.next_batch;
        self.next_batch += 1;
        let token = CancelToken::new();
        self.current = Some(token.clone());

        let file = Arc::clone(&self.file);
        let timeout = self.timeout;
        let batch_token = token.clone();

        debug!(batch = id, tiles = keys.len(), "Dispatching decode batch");

        let task = tokio::spawn(async move {
            let mut summary = BatchSummary {
                batch: id,
                requested: keys.len(),
                ..BatchSummary::default()
            };

            for key in keys {
                if batch_token.is_cancelled() {
                    summary.cancelled = true;
                    break;
                }

                let result = decode_key(&file, key, timeout).await;
                match &result {
                    Ok(_) => summary.delivered += 1,
                    Err(e) => {
                        warn!(key = %key, error = %e, "Tile decode failed");
                        summary.failed += 1;
                    }
                }
                on_tile(key, result);

                tokio::task::yield_now().await;
            }

            debug!(
                batch = id,
                delivered = summary.delivered,
                failed = summary.failed,
                cancelled = summary.cancelled,
                "Decode batch finished"
            );
            on_complete(summary);
            summary
        });

        BatchHandle { id, token, task }
    }

    /// Start decoding `keys`, sending every result and the summary to `events`.
    ///
    /// A closed receiver is not an error; the remaining results are dropped.
    pub fn dispatch_to(&mut self, keys: Vec<TileKey>, events: UnboundedSender<DecodeEvent>) -> BatchHandle {
        let batch = self.next_batch;
        let tile_events = events.clone();
        self.dispatch(
            keys,
            move |key, result| {
                let _ = tile_events.send(DecodeEvent::Tile { batch, key, result });
            },
            move |summary| {
                let _ = events.send(DecodeEvent::BatchFinished(summary));
            },
        )
    }
}

impl Drop for TileDecodeScheduler {
    fn drop(&mut self) {
        self.cancel_current();
    }
}

/// Inflate and decode the stored tile behind `key` on the blocking pool.
///
/// Keys below the diagonal read the record stored for `(row, col)` and are
/// transposed, so the tile is always in the orientation of `key`.
async fn decode_key(file: &Arc<PretextFile>, key: TileKey, timeout: Option<Duration>) -> TileResult {
    let n = file.header().number_of_textures_1d;
    let (index, raw) = if key.col < n && key.row < n {
        let index = tile_linear_index(key.col, key.row, n);
        (index, file.tile_bytes(index))
    } else {
        (file.header().number_of_texture_blocks, Bytes::new())
    };
    let job_file = Arc::clone(file);

    let mirrored = key.is_mirrored();
    let job = tokio::task::spawn_blocking(move || {
        let tile = decode_tile(&raw, index, job_file.header()).tile;
        if mirrored {
            tile.transposed()
        } else {
            tile
        }
    });

    let joined = match timeout {
        Some(limit) => match tokio::time::timeout(limit, job).await {
            Ok(joined) => joined,
            Err(_) => return Err(TileError::Timeout { index }),
        },
        None => job.await,
    };

    joined.map(Arc::new).map_err(|e| TileError::Join {
        index,
        message: e.to_string(),
    })
}
