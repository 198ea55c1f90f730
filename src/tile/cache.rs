//! Bounded LRU store of decoded tiles.
//!
//! # Cache Key
//!
//! Tiles are keyed by viewport level and tile coordinates. The same stored
//! texture can therefore be cached once per level it was requested at.
//!
//! # Lifecycle
//!
//! ```text
//! (absent) ──mark_pending──▶ Pending ──load_tile──▶ Loaded
//!                               └─────mark_error──▶ Error
//! ```
//!
//! Every access stamps the entry with a fresh recency tick. When an insertion
//! would exceed `max_tiles`, exactly one entry (the one with the oldest tick)
//! is evicted.
//!
//! The store is owned by a single consumer and takes `&mut self`; decode
//! results produced elsewhere are handed back through a channel (see
//! [`TileStreamer`](super::TileStreamer)).

use std::fmt;
use std::sync::Arc;

use lru::LruCache;
use tracing::debug;

use super::decode::DecodedTile;
use super::viewport::{visible_tile_keys, Camera};

/// Default maximum number of cached tiles.
pub const DEFAULT_MAX_TILES: usize = 256;

// =============================================================================
// Cache Key
// =============================================================================

/// Identifies a tile at a viewport level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileKey {
    /// Viewport level (0 = coarsest)
    pub level: u32,

    /// Tile column
    pub col: u32,

    /// Tile row
    pub row: u32,
}

impl TileKey {
    pub fn new(level: u32, col: u32, row: u32) -> Self {
        Self { level, col, row }
    }

    /// Whether this tile lies below the diagonal and mirrors a stored tile.
    pub fn is_mirrored(&self) -> bool {
        self.col > self.row
    }

    /// The stored tile this key reads from (`col <= row`).
    pub fn canonical(&self) -> Self {
        if self.is_mirrored() {
            Self::new(self.level, self.row, self.col)
        } else {
            *self
        }
    }
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.level, self.col, self.row)
    }
}

// =============================================================================
// Cache Entry
// =============================================================================

/// Lifecycle state of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileState {
    Pending,
    Loaded,
    Error,
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: TileKey,
    pub state: TileState,

    /// Decoded intensities, present only when `Loaded`
    pub data: Option<Arc<DecodedTile>>,

    /// Recency tick of the last access
    pub last_used: u64,
}

// =============================================================================
// Tile Stream Cache
// =============================================================================

/// Viewport-driven LRU cache of decoded tiles.
///
/// Payloads are stored in the orientation of their own key: a tile cached
/// under `(level, col, row)` with `col > row` is the transpose of the record
/// stored for `(row, col)`.
///
/// # Example
///
/// ```
/// use pretext_streamer::tile::{TileKey, TileState, TileStreamCache};
///
/// let mut cache = TileStreamCache::with_capacity(8);
/// let key = TileKey::new(0, 1, 2);
///
/// assert!(cache.mark_pending(key));
/// assert_eq!(cache.get_tile(&key).map(|e| e.state), Some(TileState::Pending));
/// ```
pub struct TileStreamCache {
    entries: LruCache<TileKey, CacheEntry>,
    max_tiles: usize,
    clock: u64,
    visible: Vec<TileKey>,
}

impl TileStreamCache {
    /// Create a cache holding up to [`DEFAULT_MAX_TILES`] tiles.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_TILES)
    }

    /// Create a cache holding up to `max_tiles` tiles (at least one).
    pub fn with_capacity(max_tiles: usize) -> Self {
        Self {
            entries: LruCache::unbounded(),
            max_tiles: max_tiles.max(1),
            clock: 0,
            visible: Vec::new(),
        }
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    /// Make room for one new entry by evicting the least recently used one.
    fn evict_for_insert(&mut self) {
        if self.entries.len() >= self.max_tiles {
            if let Some((key, entry)) = self.entries.pop_lru() {
                debug!(key = %key, last_used = entry.last_used, "Evicted tile");
            }
        }
    }

    fn upsert(&mut self, key: TileKey, state: TileState, data: Option<Arc<DecodedTile>>) {
        let now = self.tick();
        if let Some(entry) = self.entries.get_mut(&key) {
            entry.state = state;
            entry.data = data;
            entry.last_used = now;
            return;
        }

        self.evict_for_insert();
        self.entries.put(
            key,
            CacheEntry {
                key,
                state,
                data,
                last_used: now,
            },
        );
    }

    /// Store a decoded tile, replacing any existing entry for `key`.
    pub fn load_tile(&mut self, key: TileKey, data: impl Into<Arc<DecodedTile>>) {
        self.upsert(key, TileState::Loaded, Some(data.into()));
    }

    /// Record that decoding `key` failed.
    pub fn mark_error(&mut self, key: TileKey) {
        self.upsert(key, TileState::Error, None);
    }

    /// Insert a pending placeholder if `key` has no entry yet.
    ///
    /// Returns `true` if a placeholder was inserted. Existing entries are left
    /// untouched whatever their state.
    pub fn mark_pending(&mut self, key: TileKey) -> bool {
        if self.entries.contains(&key) {
            return false;
        }
        self.upsert(key, TileState::Pending, None);
        true
    }

    /// Look up a tile, marking it as recently used.
    pub fn get_tile(&mut self, key: &TileKey) -> Option<&CacheEntry> {
        let now = self.tick();
        let entry = self.entries.get_mut(key)?;
        entry.last_used = now;
        Some(entry)
    }

    /// Look up a tile without touching its recency.
    pub fn peek(&self, key: &TileKey) -> Option<&CacheEntry> {
        self.entries.peek(key)
    }

    pub fn contains(&self, key: &TileKey) -> bool {
        self.entries.contains(key)
    }

    /// Keys from `keys` that still need a decode: absent or pending.
    pub fn unresolved_keys(&self, keys: &[TileKey]) -> Vec<TileKey> {
        keys.iter()
            .filter(|key| {
                self.entries
                    .peek(key)
                    .map_or(true, |entry| entry.state == TileState::Pending)
            })
            .copied()
            .collect()
    }

    /// Recompute the visible key set and touch every visible tile already cached.
    ///
    /// The returned set is also kept for [`visible_keys`](Self::visible_keys).
    pub fn update_visible_tiles(
        &mut self,
        camera: &Camera,
        canvas_w: f64,
        canvas_h: f64,
        tiles_per_dim: u32,
        num_mip_maps: u32,
    ) -> Vec<TileKey> {
        let keys = visible_tile_keys(camera, canvas_w, canvas_h, tiles_per_dim, num_mip_maps);
        for key in &keys {
            if self.entries.contains(key) {
                self.get_tile(key);
            }
        }
        self.visible = keys.clone();
        keys
    }

    /// Keys computed by the last [`update_visible_tiles`](Self::update_visible_tiles).
    pub fn visible_keys(&self) -> &[TileKey] {
        &self.visible
    }

    /// Drop every entry and the visible key list. Capacity is kept.
    pub fn dispose(&mut self) {
        self.entries.clear();
        self.visible.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.max_tiles
    }

    /// Number of entries in `state`.
    pub fn count_in_state(&self, state: TileState) -> usize {
        self.entries.iter().filter(|(_, e)| e.state == state).count()
    }

    /// Bytes held by decoded intensities across all loaded tiles.
    pub fn payload_bytes(&self) -> usize {
        self.entries
            .iter()
            .filter_map(|(_, e)| e.data.as_ref())
            .map(|tile| tile.byte_size())
            .sum()
    }
}

impl Default for TileStreamCache {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================
