//! The processing steps run by each pipeline phase.

use std::sync::Arc;

use glam::IVec3;
use strata_core::ChunkPos;
use tracing::debug;

use super::phase::ChunkProcessor;
use crate::cache::ChunkCache;
use crate::chunk::ChunkState;
use crate::error::{Result, WorldError};
use crate::generation::ChunkGenerator;
use crate::lighting::{generate_internal_lighting, propagate_out_of_chunk};
use crate::store::ChunkStore;
use crate::view::ChunkRegion;

/// Loads a chunk from the store, or generates it, and installs it in the
/// near-cache.
pub struct CreateOrFetch {
    pub(crate) cache: Arc<ChunkCache>,
    pub(crate) generator: Arc<dyn ChunkGenerator>,
    pub(crate) store: Arc<dyn ChunkStore>,
}

impl ChunkProcessor for CreateOrFetch {
    fn process(&self, pos: ChunkPos) -> Result<()> {
        if self.cache.contains(pos) {
            return Ok(());
        }

        let chunk = if let Some(chunk) = self.store.get(pos)? {
            self.store.restore_entities(pos)?;
            chunk
        } else {
            let mut chunk = self.generator.generate_chunk(pos)?;
            if chunk.pos() != pos {
                return Err(WorldError::Generation {
                    pos,
                    reason: format!("generator returned chunk at {:?}", chunk.pos()),
                });
            }
            chunk.data_mut().advance_state(
                ChunkState::Unready,
                ChunkState::AdjacencyGenerationPending,
            );
            chunk
        };

        if !self.cache.insert_if_absent(Arc::new(chunk)) {
            debug!(?pos, "Chunk already loaded, discarding duplicate");
        }
        Ok(())
    }
}

/// Runs the generator's neighbor-aware pass.
pub struct SecondPass {
    pub(crate) cache: Arc<ChunkCache>,
    pub(crate) generator: Arc<dyn ChunkGenerator>,
    pub(crate) extents: IVec3,
}

impl ChunkProcessor for SecondPass {
    fn process(&self, pos: ChunkPos) -> Result<()> {
        let extents = if self.generator.has_second_pass() {
            self.extents
        } else {
            IVec3::ZERO
        };
        let region = ChunkRegion::collect(&self.cache, pos, extents)?;
        let mut view = region.lock();
        assert_eq!(
            view.chunk_state(pos),
            Some(ChunkState::AdjacencyGenerationPending),
            "second pass on {pos:?}"
        );

        if self.generator.has_second_pass() {
            self.generator.second_pass(pos, &mut view)?;
        }
        view.advance_state(
            pos,
            ChunkState::AdjacencyGenerationPending,
            ChunkState::InternalLightGenerationPending,
        );
        Ok(())
    }
}

/// Lights a chunk from its own emitters and the sky.
pub struct InternalLighting {
    pub(crate) cache: Arc<ChunkCache>,
    pub(crate) sky_level: i64,
}

impl ChunkProcessor for InternalLighting {
    fn process(&self, pos: ChunkPos) -> Result<()> {
        let chunk = self.cache.get(pos).ok_or(WorldError::MissingChunk(pos))?;
        let mut data = chunk.lock();
        assert_eq!(
            data.state(),
            ChunkState::InternalLightGenerationPending,
            "internal lighting on {pos:?}"
        );

        generate_internal_lighting(pos, &mut data, self.sky_level);
        data.advance_state(
            ChunkState::InternalLightGenerationPending,
            ChunkState::LightPropagationPending,
        );
        Ok(())
    }
}

/// Spreads light across a chunk's faces into and out of its neighbors.
pub struct LightPropagation {
    pub(crate) cache: Arc<ChunkCache>,
    pub(crate) extents: IVec3,
}

impl ChunkProcessor for LightPropagation {
    fn process(&self, pos: ChunkPos) -> Result<()> {
        let region = ChunkRegion::collect(&self.cache, pos, self.extents)?;
        let mut view = region.lock();
        assert_eq!(
            view.chunk_state(pos),
            Some(ChunkState::LightPropagationPending),
            "light propagation on {pos:?}"
        );

        propagate_out_of_chunk(&mut view, pos);
        view.advance_state(
            pos,
            ChunkState::LightPropagationPending,
            ChunkState::FullLightConnectivityPending,
        );
        Ok(())
    }
}
