//! Near-cache of loaded chunks with spatial queries.

use std::sync::Arc;

use glam::IVec3;
use hashbrown::HashMap;
use parking_lot::RwLock;
use strata_core::{ChunkPos, Region3};

use crate::chunk::{Chunk, ChunkData, ChunkState};
use crate::error::Result;

/// Owns every chunk currently loaded.
///
/// Chunks are handed out as `Arc<Chunk>` for the duration of one processing
/// step. The map lock is never held while a chunk lock is being acquired.
pub struct ChunkCache {
    chunks: RwLock<HashMap<ChunkPos, Arc<Chunk>>>,
    /// Chunk count above which eviction kicks in.
    max_chunks: usize,
}

impl ChunkCache {
    /// Create a new cache with the given capacity.
    pub fn new(max_chunks: usize) -> Self {
        Self {
            chunks: RwLock::new(HashMap::with_capacity(max_chunks)),
            max_chunks,
        }
    }

    /// Check if a chunk exists at the given position.
    pub fn contains(&self, pos: ChunkPos) -> bool {
        self.chunks.read().contains_key(&pos)
    }

    /// Get the number of loaded chunks.
    pub fn len(&self) -> usize {
        self.chunks.read().len()
    }

    /// Check if no chunks are loaded.
    pub fn is_empty(&self) -> bool {
        self.chunks.read().is_empty()
    }

    /// Get the maximum chunk capacity.
    pub const fn capacity(&self) -> usize {
        self.max_chunks
    }

    /// Borrow the chunk at `pos`.
    pub fn get(&self, pos: ChunkPos) -> Option<Arc<Chunk>> {
        self.chunks.read().get(&pos).cloned()
    }

    /// Install a chunk unless one is already present. Returns whether the
    /// chunk was inserted; the first writer wins.
    pub fn insert_if_absent(&self, chunk: Arc<Chunk>) -> bool {
        let mut chunks = self.chunks.write();
        match chunks.entry(chunk.pos()) {
            hashbrown::hash_map::Entry::Occupied(_) => false,
            hashbrown::hash_map::Entry::Vacant(slot) => {
                slot.insert(chunk);
                true
            }
        }
    }

    /// Remove a chunk at the given position.
    pub fn remove(&self, pos: ChunkPos) -> Option<Arc<Chunk>> {
        self.chunks.write().remove(&pos)
    }

    /// Get all loaded chunk positions.
    pub fn positions(&self) -> Vec<ChunkPos> {
        self.chunks.read().keys().copied().collect()
    }

    /// Get chunks within a box of half-size `extents` around `center`.
    pub fn chunks_in_radius(&self, center: ChunkPos, extents: IVec3) -> Vec<ChunkPos> {
        let region = Region3::around(center, extents);
        let chunks = self.chunks.read();
        chunks
            .keys()
            .filter(|pos| region.contains(**pos))
            .copied()
            .collect()
    }

    /// Get chunks in a specific state.
    pub fn chunks_in_state(&self, state: ChunkState) -> Vec<ChunkPos> {
        self.snapshot()
            .into_iter()
            .filter(|chunk| chunk.state() == state)
            .map(|chunk| chunk.pos())
            .collect()
    }

    /// Evict chunks while over capacity.
    ///
    /// Only positions accepted by `can_evict` are considered, and chunks
    /// whose lock is currently held elsewhere are skipped. Each evicted chunk
    /// is handed to `on_evict` while still locked; a failing `on_evict`
    /// keeps the chunk loaded. Returns the positions of evicted chunks.
    pub fn evict_if_needed<F, S>(&self, can_evict: F, mut on_evict: S) -> Vec<ChunkPos>
    where
        F: Fn(ChunkPos) -> bool,
        S: FnMut(ChunkPos, &ChunkData) -> Result<()>,
    {
        let mut evicted = Vec::new();
        let mut excess = self.len().saturating_sub(self.max_chunks);
        if excess == 0 {
            return evicted;
        }

        let mut candidates: Vec<Arc<Chunk>> = self
            .snapshot()
            .into_iter()
            .filter(|chunk| can_evict(chunk.pos()))
            .collect();
        // Deterministic order keeps eviction reproducible.
        candidates.sort_by_key(|chunk| chunk.pos());

        for chunk in candidates {
            if excess == 0 {
                break;
            }
            let Some(guard) = chunk.try_lock() else {
                continue;
            };
            if let Err(err) = on_evict(chunk.pos(), &guard) {
                tracing::warn!(pos = ?chunk.pos(), error = %err, "Failed to store evicted chunk");
                continue;
            }
            self.chunks.write().remove(&chunk.pos());
            drop(guard);
            evicted.push(chunk.pos());
            excess -= 1;
        }

        evicted
    }

    fn snapshot(&self) -> Vec<Arc<Chunk>> {
        self.chunks.read().values().cloned().collect()
    }
}

impl Default for ChunkCache {
    fn default() -> Self {
        Self::new(4096)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WorldError;

    fn chunk(x: i32, y: i32, z: i32) -> Arc<Chunk> {
        Arc::new(Chunk::new(ChunkPos::new(x, y, z)))
    }

    #[test]
    fn insert_and_retrieve() {
        let cache = ChunkCache::new(100);
        let pos = ChunkPos::new(1, 2, 3);

        assert!(cache.insert_if_absent(chunk(1, 2, 3)));

        assert!(cache.contains(pos));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(pos).map(|c| c.pos()), Some(pos));
    }

    #[test]
    fn first_writer_wins() {
        let cache = ChunkCache::new(100);
        let first = chunk(0, 0, 0);
        first.lock().set_state(ChunkState::Complete);

        assert!(cache.insert_if_absent(Arc::clone(&first)));
        assert!(!cache.insert_if_absent(chunk(0, 0, 0)));

        let stored = cache.get(ChunkPos::new(0, 0, 0)).unwrap();
        assert!(Arc::ptr_eq(&stored, &first));
        assert_eq!(stored.state(), ChunkState::Complete);
    }

    #[test]
    fn remove_chunk() {
        let cache = ChunkCache::new(100);
        let pos = ChunkPos::new(1, 2, 3);
        cache.insert_if_absent(chunk(1, 2, 3));

        let removed = cache.remove(pos);

        assert!(removed.is_some());
        assert!(!cache.contains(pos));
        assert!(cache.is_empty());
    }

    #[test]
    fn chunks_in_radius() {
        let cache = ChunkCache::new(1000);
        for x in -5..=5 {
            for z in -5..=5 {
                cache.insert_if_absent(chunk(x, 0, z));
            }
        }

        let nearby = cache.chunks_in_radius(ChunkPos::new(0, 0, 0), IVec3::new(2, 0, 2));

        // 5x5 columns from -2 to 2
        assert_eq!(nearby.len(), 25);
    }

    #[test]
    fn chunks_in_state() {
        let cache = ChunkCache::new(100);
        cache.insert_if_absent(chunk(0, 0, 0));
        let ready = chunk(1, 0, 0);
        ready.lock().set_state(ChunkState::Complete);
        cache.insert_if_absent(ready);

        assert_eq!(
            cache.chunks_in_state(ChunkState::Complete),
            vec![ChunkPos::new(1, 0, 0)]
        );
    }

    #[test]
    fn eviction_respects_filter_and_stores() {
        let cache = ChunkCache::new(2);
        for x in 0..4 {
            cache.insert_if_absent(chunk(x, 0, 0));
        }

        let mut stored = Vec::new();
        let evicted = cache.evict_if_needed(
            |pos| pos.x != 0,
            |pos, _| {
                stored.push(pos);
                Ok(())
            },
        );

        assert_eq!(evicted, vec![ChunkPos::new(1, 0, 0), ChunkPos::new(2, 0, 0)]);
        assert_eq!(stored, evicted);
        assert!(cache.contains(ChunkPos::new(0, 0, 0)));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn eviction_skips_locked_chunks() {
        let cache = ChunkCache::new(1);
        let held = chunk(0, 0, 0);
        cache.insert_if_absent(Arc::clone(&held));
        cache.insert_if_absent(chunk(1, 0, 0));

        let guard = held.lock();
        let evicted = cache.evict_if_needed(|_| true, |_, _| Ok(()));
        drop(guard);

        assert_eq!(evicted, vec![ChunkPos::new(1, 0, 0)]);
        assert!(cache.contains(ChunkPos::new(0, 0, 0)));
    }

    #[test]
    fn failed_store_keeps_chunk() {
        let cache = ChunkCache::new(0);
        cache.insert_if_absent(chunk(0, 0, 0));

        let evicted = cache.evict_if_needed(
            |_| true,
            |_, _| Err(WorldError::Store("disk full".into())),
        );

        assert!(evicted.is_empty());
        assert_eq!(cache.len(), 1);
    }
}
