//! Far storage for chunks that left the near-cache.

use hashbrown::HashMap;
use parking_lot::RwLock;
use strata_core::ChunkPos;

use crate::chunk::{Chunk, ChunkData};
use crate::error::Result;

/// Persistent or remote storage consulted before generating a chunk.
///
/// Stored chunks keep the state they were saved in.
pub trait ChunkStore: Send + Sync {
    /// Load the chunk at `pos`, if stored.
    fn get(&self, pos: ChunkPos) -> Result<Option<Chunk>>;

    fn contains(&self, pos: ChunkPos) -> bool;

    /// Save a copy of a chunk's data.
    fn put(&self, pos: ChunkPos, data: ChunkData) -> Result<()>;

    /// Bring back whatever lived in the chunk besides voxels.
    fn restore_entities(&self, _pos: ChunkPos) -> Result<()> {
        Ok(())
    }

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Keeps evicted chunks in memory.
#[derive(Default)]
pub struct MemoryChunkStore {
    chunks: RwLock<HashMap<ChunkPos, ChunkData>>,
}

impl MemoryChunkStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ChunkStore for MemoryChunkStore {
    fn get(&self, pos: ChunkPos) -> Result<Option<Chunk>> {
        Ok(self
            .chunks
            .read()
            .get(&pos)
            .map(|data| Chunk::from_data(pos, data.clone())))
    }

    fn contains(&self, pos: ChunkPos) -> bool {
        self.chunks.read().contains_key(&pos)
    }

    fn put(&self, pos: ChunkPos, data: ChunkData) -> Result<()> {
        self.chunks.write().insert(pos, data);
        Ok(())
    }

    fn len(&self) -> usize {
        self.chunks.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::ChunkState;
    use strata_core::{BlockId, LocalPos};

    #[test]
    fn stored_chunks_keep_state_and_blocks() {
        let store = MemoryChunkStore::new();
        let pos = ChunkPos::new(3, -1, 2);
        let mut data = ChunkData::new();
        data.set_block(LocalPos::new(1, 2, 3), BlockId::GLASS);
        data.set_state(ChunkState::Complete);

        store.put(pos, data).unwrap();
        assert!(store.contains(pos));
        assert_eq!(store.len(), 1);

        let chunk = store.get(pos).unwrap().unwrap();
        assert_eq!(chunk.pos(), pos);
        assert_eq!(chunk.state(), ChunkState::Complete);
        assert_eq!(chunk.lock().block(LocalPos::new(1, 2, 3)), BlockId::GLASS);
    }

    #[test]
    fn missing_chunk_is_none() {
        let store = MemoryChunkStore::new();
        assert!(store.get(ChunkPos::new(0, 0, 0)).unwrap().is_none());
        assert!(store.is_empty());
    }
}
