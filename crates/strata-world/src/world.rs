//! The world facade: block access, edits and listener fan-out over the
//! pipeline's near-cache.
//!
//! Reads and writes only see chunks that are `Complete`. An edit locks the
//! same box of chunks the pipeline uses for light propagation, so light
//! around the edited block is brought up to date before the locks are
//! released. Listeners hear about the edit afterwards.

use std::sync::Arc;

use crossbeam::channel::Receiver;
use glam::IVec3;
use parking_lot::{Mutex, RwLock};
use strata_core::{BlockId, ChunkPos, LocalPos, WorldPos};
use strata_propagation::BlockChange;
use tracing::{debug, trace};

use crate::cache::ChunkCache;
use crate::chunk::{Chunk, ChunkData, ChunkState};
use crate::error::Result;
use crate::event::{BlockChangedEvent, WorldListener};
use crate::generation::ChunkGenerator;
use crate::lighting::update_light;
use crate::liquid::LiquidState;
use crate::pipeline::{ChunkPipeline, PipelineConfig, PipelineEvent, PipelineUpdate, RegionId};
use crate::store::ChunkStore;
use crate::view::ChunkRegion;

/// A streamed voxel world.
pub struct World {
    cache: Arc<ChunkCache>,
    pipeline: Mutex<ChunkPipeline>,
    listeners: RwLock<Vec<Arc<dyn WorldListener>>>,
    view_extents: IVec3,
}

impl World {
    /// Create a world and start its pipeline.
    pub fn new(
        config: PipelineConfig,
        generator: Arc<dyn ChunkGenerator>,
        store: Arc<dyn ChunkStore>,
    ) -> Result<Self> {
        let cache = Arc::new(ChunkCache::new(config.cache_capacity));
        let view_extents = config.view_extents;
        let pipeline = ChunkPipeline::new(config, Arc::clone(&cache), generator, store)?;
        Ok(Self {
            cache,
            pipeline: Mutex::new(pipeline),
            listeners: RwLock::new(Vec::new()),
            view_extents,
        })
    }

    pub fn cache(&self) -> &Arc<ChunkCache> {
        &self.cache
    }

    /// The loaded chunk at `pos`, whatever its state.
    pub fn chunk(&self, pos: ChunkPos) -> Option<Arc<Chunk>> {
        self.cache.get(pos)
    }

    /// Whether the chunk holding `pos` is loaded and complete.
    pub fn is_block_active(&self, pos: WorldPos) -> bool {
        self.cache
            .get(pos.chunk_pos())
            .is_some_and(|chunk| chunk.state() == ChunkState::Complete)
    }

    fn read<T>(&self, pos: WorldPos, read: impl FnOnce(&ChunkData, LocalPos) -> T) -> Option<T> {
        let (chunk_pos, local) = pos.split();
        let chunk = self.cache.get(chunk_pos)?;
        let data = chunk.lock();
        (data.state() == ChunkState::Complete).then(|| read(&data, local))
    }

    pub fn block(&self, pos: WorldPos) -> Option<BlockId> {
        self.read(pos, |data, local| data.block(local))
    }

    pub fn light(&self, pos: WorldPos) -> Option<u8> {
        self.read(pos, |data, local| data.light(local))
    }

    pub fn sunlight(&self, pos: WorldPos) -> Option<u8> {
        self.read(pos, |data, local| data.sunlight(local))
    }

    /// The brighter of block light and sunlight at `pos`.
    pub fn combined_light(&self, pos: WorldPos) -> Option<u8> {
        self.read(pos, |data, local| data.light(local).max(data.sunlight(local)))
    }

    pub fn liquid(&self, pos: WorldPos) -> Option<LiquidState> {
        self.read(pos, |data, local| data.liquid(local))
    }

    /// Replace the block at `pos` and relight around it.
    ///
    /// Returns false if the chunk or any chunk around it is not available, or
    /// if the block is already `block`.
    pub fn set_block(&self, pos: WorldPos, block: BlockId) -> bool {
        let chunk_pos = pos.chunk_pos();
        let Ok(region) = ChunkRegion::collect(&self.cache, chunk_pos, self.view_extents) else {
            return false;
        };

        let event = {
            let mut view = region.lock();
            if view.chunk_state(chunk_pos) != Some(ChunkState::Complete) {
                return false;
            }
            let Some(old_block) = view.block(pos) else {
                return false;
            };
            if old_block == block {
                return false;
            }
            view.set_block(pos, block);
            let change = BlockChange::new(pos, old_block, block);
            update_light(&mut view, [change]);
            BlockChangedEvent::from(change)
        };

        trace!(?pos, old = ?event.old_block, new = ?block, "Block changed");
        self.notify_block_changes(&[event]);
        true
    }

    /// Set the liquid state at `pos` if it currently equals `expected`.
    pub fn set_liquid(&self, pos: WorldPos, state: LiquidState, expected: LiquidState) -> bool {
        let (chunk_pos, local) = pos.split();
        let Some(chunk) = self.cache.get(chunk_pos) else {
            return false;
        };
        let mut data = chunk.lock();
        if data.state() != ChunkState::Complete || data.liquid(local) != expected {
            return false;
        }
        data.set_liquid(local, state);
        true
    }

    pub fn add_listener(&self, listener: Arc<dyn WorldListener>) {
        self.listeners.write().push(listener);
    }

    pub(crate) fn notify_block_changes(&self, events: &[BlockChangedEvent]) {
        let listeners = self.listeners.read().clone();
        for listener in &listeners {
            for event in events {
                listener.on_block_changed(event);
            }
        }
    }

    fn notify_chunk_ready(&self, pos: ChunkPos) {
        let listeners = self.listeners.read().clone();
        for listener in &listeners {
            listener.on_chunk_ready(pos);
        }
    }

    /// Keep chunks within `radius` of `center` complete.
    pub fn add_region(&self, center: ChunkPos, radius: IVec3) -> RegionId {
        self.pipeline.lock().add_region(center, radius)
    }

    pub fn move_region(&self, id: RegionId, center: ChunkPos) -> bool {
        self.pipeline.lock().move_region(id, center)
    }

    pub fn remove_region(&self, id: RegionId) -> bool {
        self.pipeline.lock().remove_region(id)
    }

    /// Ask for the chunk at `pos` to be completed.
    pub fn request(&self, pos: ChunkPos) {
        self.pipeline.lock().request(pos);
    }

    pub fn subscribe(&self) -> Receiver<PipelineEvent> {
        self.pipeline.lock().subscribe()
    }

    /// Whether the pipeline has nothing left to do.
    pub fn is_idle(&self) -> bool {
        self.pipeline.lock().is_idle()
    }

    /// Advance the pipeline and tell listeners about chunks that became ready.
    pub fn update(&self) -> PipelineUpdate {
        let update = self.pipeline.lock().update();
        for &pos in &update.ready {
            self.notify_chunk_ready(pos);
        }
        update
    }

    /// Stop the pipeline and drop every listener. Safe to call repeatedly.
    pub fn dispose(&self) {
        self.pipeline.lock().dispose();
        let dropped = std::mem::take(&mut *self.listeners.write());
        if !dropped.is_empty() {
            debug!(listeners = dropped.len(), "World listeners released");
        }
    }
}
