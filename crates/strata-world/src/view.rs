//! Locked views over a box of neighboring chunks.
//!
//! A [`ChunkRegion`] borrows the chunks of a box from the near-cache without
//! locking them. [`ChunkRegion::lock`] then acquires every chunk lock in
//! ascending [`ChunkPos`] order and hands back a [`WorldView`], which
//! addresses voxels by world coordinates. Dropping the view releases the
//! locks, including during unwinding. Because every multi-chunk lock follows
//! the same global order, overlapping views cannot deadlock.

use std::sync::Arc;

use glam::IVec3;
use strata_core::{BlockId, ChunkPos, LocalPos, Region3, WorldPos};
use strata_propagation::PropagatorWorldView;

use crate::cache::ChunkCache;
use crate::chunk::{Chunk, ChunkData, ChunkGuard, ChunkState};
use crate::error::{Result, WorldError};
use crate::liquid::LiquidState;

/// Chunks of a box around a centre chunk, borrowed from the near-cache.
pub struct ChunkRegion {
    center: ChunkPos,
    bounds: Region3,
    /// Indexed by [`Region3::index_of`], which follows ascending `ChunkPos`.
    chunks: Vec<Option<Arc<Chunk>>>,
}

impl ChunkRegion {
    /// Borrow every chunk within `extents` of `center`.
    ///
    /// Fails with [`WorldError::MissingNeighbor`] if any of them is not loaded.
    pub fn collect(cache: &ChunkCache, center: ChunkPos, extents: IVec3) -> Result<Self> {
        let region = Self::collect_available(cache, center, extents);
        if let Some(missing) = region.missing().next() {
            return Err(if missing == center {
                WorldError::MissingChunk(center)
            } else {
                WorldError::MissingNeighbor {
                    pos: center,
                    neighbor: missing,
                }
            });
        }
        Ok(region)
    }

    /// Borrow whichever chunks within `extents` of `center` are loaded.
    pub fn collect_available(cache: &ChunkCache, center: ChunkPos, extents: IVec3) -> Self {
        let bounds = Region3::around(center, extents);
        let chunks = bounds.iter().map(|pos| cache.get(pos)).collect();
        Self {
            center,
            bounds,
            chunks,
        }
    }

    pub const fn center(&self) -> ChunkPos {
        self.center
    }

    pub const fn bounds(&self) -> Region3 {
        self.bounds
    }

    /// Positions in the box with no loaded chunk.
    pub fn missing(&self) -> impl Iterator<Item = ChunkPos> + '_ {
        self.bounds
            .iter()
            .zip(&self.chunks)
            .filter(|(_, chunk)| chunk.is_none())
            .map(|(pos, _)| pos)
    }

    /// Lock every borrowed chunk in ascending position order.
    pub fn lock(&self) -> WorldView<'_> {
        let guards = self
            .chunks
            .iter()
            .map(|chunk| chunk.as_deref().map(Chunk::lock))
            .collect();
        WorldView {
            bounds: self.bounds,
            guards,
        }
    }
}

/// Exclusive access to the chunks of a [`ChunkRegion`], in world coordinates.
///
/// Voxels of chunks that were not loaded when the region was collected are
/// unavailable: reads return `None` and writes are dropped.
pub struct WorldView<'a> {
    bounds: Region3,
    guards: Vec<Option<ChunkGuard<'a>>>,
}

impl<'a> WorldView<'a> {
    pub const fn bounds(&self) -> Region3 {
        self.bounds
    }

    /// Whether the chunk at `pos` is part of this view and loaded.
    pub fn contains(&self, pos: ChunkPos) -> bool {
        self.data(pos).is_some()
    }

    /// Data of the chunk at `pos`.
    pub fn data(&self, pos: ChunkPos) -> Option<&ChunkData> {
        let index = self.bounds.index_of(pos)?;
        self.guards[index].as_deref()
    }

    /// Mutable data of the chunk at `pos`.
    pub fn data_mut(&mut self, pos: ChunkPos) -> Option<&mut ChunkData> {
        let index = self.bounds.index_of(pos)?;
        self.guards[index].as_deref_mut()
    }

    pub fn chunk_state(&self, pos: ChunkPos) -> Option<ChunkState> {
        self.data(pos).map(ChunkData::state)
    }

    /// Advance the chunk at `pos` from `expected` to `next`.
    ///
    /// # Panics
    ///
    /// Panics if the chunk is not in the view or the transition is invalid.
    pub fn advance_state(&mut self, pos: ChunkPos, expected: ChunkState, next: ChunkState) {
        let data = self
            .data_mut(pos)
            .unwrap_or_else(|| panic!("chunk {pos:?} is not part of this view"));
        data.advance_state(expected, next);
    }

    fn locate(&self, pos: WorldPos) -> Option<(&ChunkData, LocalPos)> {
        let (chunk, local) = pos.split();
        self.data(chunk).map(|data| (data, local))
    }

    fn locate_mut(&mut self, pos: WorldPos) -> Option<(&mut ChunkData, LocalPos)> {
        let (chunk, local) = pos.split();
        self.data_mut(chunk).map(|data| (data, local))
    }

    pub fn block(&self, pos: WorldPos) -> Option<BlockId> {
        self.locate(pos).map(|(data, local)| data.block(local))
    }

    /// Write a block. Returns false if `pos` is unavailable.
    pub fn set_block(&mut self, pos: WorldPos, block: BlockId) -> bool {
        self.locate_mut(pos)
            .map(|(data, local)| data.set_block(local, block))
            .is_some()
    }

    pub fn light(&self, pos: WorldPos) -> Option<u8> {
        self.locate(pos).map(|(data, local)| data.light(local))
    }

    pub fn set_light(&mut self, pos: WorldPos, value: u8) -> bool {
        self.locate_mut(pos)
            .map(|(data, local)| data.set_light(local, value))
            .is_some()
    }

    pub fn sunlight(&self, pos: WorldPos) -> Option<u8> {
        self.locate(pos).map(|(data, local)| data.sunlight(local))
    }

    pub fn set_sunlight(&mut self, pos: WorldPos, value: u8) -> bool {
        self.locate_mut(pos)
            .map(|(data, local)| data.set_sunlight(local, value))
            .is_some()
    }

    /// The sunlight field of this view, for propagators.
    pub fn sunlight_view(&mut self) -> SunlightView<'_, 'a> {
        SunlightView { view: self }
    }

    pub fn liquid(&self, pos: WorldPos) -> Option<LiquidState> {
        self.locate(pos).map(|(data, local)| data.liquid(local))
    }

    pub fn set_liquid(&mut self, pos: WorldPos, state: LiquidState) -> bool {
        self.locate_mut(pos)
            .map(|(data, local)| data.set_liquid(local, state))
            .is_some()
    }
}

impl PropagatorWorldView for WorldView<'_> {
    fn value_at(&self, pos: WorldPos) -> Option<u8> {
        self.light(pos)
    }

    fn set_value_at(&mut self, pos: WorldPos, value: u8) {
        self.set_light(pos, value);
    }

    fn block_at(&self, pos: WorldPos) -> Option<BlockId> {
        self.block(pos)
    }
}

/// A [`WorldView`] seen through its sunlight field.
pub struct SunlightView<'v, 'a> {
    view: &'v mut WorldView<'a>,
}

impl PropagatorWorldView for SunlightView<'_, '_> {
    fn value_at(&self, pos: WorldPos) -> Option<u8> {
        self.view.sunlight(pos)
    }

    fn set_value_at(&mut self, pos: WorldPos, value: u8) {
        self.view.set_sunlight(pos, value);
    }

    fn block_at(&self, pos: WorldPos) -> Option<BlockId> {
        self.view.block(pos)
    }
}
