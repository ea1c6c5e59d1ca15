//! Block light and sunlight over chunk data.
//!
//! Sunlight enters a chunk from above. Chunks whose top layer reaches the sky
//! level start with full sunlight in every column open to the top of the
//! chunk; chunks below it receive sunlight only from their neighbors.

use strata_core::constants::{CHUNK_SIZE, MAX_LIGHT};
use strata_core::{BlockId, ChunkPos, LocalPos, Side, WorldPos};
use strata_propagation::{
    BatchPropagator, BlockChange, LightRules, PropagationRules, PropagatorWorldView,
    SunlightRules,
};

use crate::chunk::{ChunkData, LightChannel};
use crate::view::WorldView;

/// One light channel of a single locked chunk, seen in world coordinates.
struct SingleChunkView<'a> {
    pos: ChunkPos,
    data: &'a mut ChunkData,
    channel: LightChannel,
}

impl SingleChunkView<'_> {
    fn local(&self, pos: WorldPos) -> Option<LocalPos> {
        let (chunk, local) = pos.split();
        (chunk == self.pos).then_some(local)
    }
}

impl PropagatorWorldView for SingleChunkView<'_> {
    fn value_at(&self, pos: WorldPos) -> Option<u8> {
        self.local(pos)
            .map(|local| self.data.light_value(self.channel, local))
    }

    fn set_value_at(&mut self, pos: WorldPos, value: u8) {
        if let Some(local) = self.local(pos) {
            self.data.set_light_value(self.channel, local, value);
        }
    }

    fn block_at(&self, pos: WorldPos) -> Option<BlockId> {
        self.local(pos).map(|local| self.data.block(local))
    }
}

/// Whether the top layer of the chunk at `pos` is at or above `sky_level`.
pub fn is_sky_chunk(pos: ChunkPos, sky_level: i64) -> bool {
    let top = LocalPos::new(0, CHUNK_SIZE as u8 - 1, 0);
    WorldPos::from_chunk_local(pos, top).y >= sky_level
}

/// Light a chunk from its own emitters and, if it reaches `sky_level`, from
/// the sky, ignoring its neighbors.
///
/// Existing light values are discarded.
pub fn generate_internal_lighting(pos: ChunkPos, data: &mut ChunkData, sky_level: i64) {
    data.clear_light();

    let mut propagator = BatchPropagator::new(LightRules);
    let emitters: Vec<(LocalPos, u8)> = data
        .blocks()
        .filter(|(_, block)| block.luminance() > 0)
        .map(|(local, block)| (local, block.luminance()))
        .collect();
    for &(local, luminance) in &emitters {
        data.set_light(local, luminance);
        propagator.propagate_from(WorldPos::from_chunk_local(pos, local), luminance);
    }
    let mut view = SingleChunkView {
        pos,
        data: &mut *data,
        channel: LightChannel::Block,
    };
    propagator.flush(&mut view);

    let mut sky_cells = 0usize;
    if is_sky_chunk(pos, sky_level) {
        let mut propagator = BatchPropagator::new(SunlightRules);
        let size = CHUNK_SIZE as u8;
        for x in 0..size {
            for z in 0..size {
                for y in (0..size).rev() {
                    let local = LocalPos::new(x, y, z);
                    if !data.block(local).is_translucent() {
                        break;
                    }
                    data.set_sunlight(local, MAX_LIGHT);
                    propagator.propagate_from(WorldPos::from_chunk_local(pos, local), MAX_LIGHT);
                    sky_cells += 1;
                }
            }
        }
        let mut view = SingleChunkView {
            pos,
            data,
            channel: LightChannel::Sun,
        };
        propagator.flush(&mut view);
    }

    tracing::trace!(?pos, emitters = emitters.len(), sky_cells, "generated internal lighting");
}

/// Seed every boundary voxel of the chunk and the voxels facing it across
/// each face, then flood.
fn exchange_faces<R, V>(rules: R, view: &mut V, chunk_pos: ChunkPos)
where
    R: PropagationRules,
    V: PropagatorWorldView + ?Sized,
{
    let mut propagator = BatchPropagator::new(rules);
    for local in LocalPos::iter_all() {
        let faces: Vec<Side> = Side::ALL
            .into_iter()
            .filter(|&side| local.is_on_face(side))
            .collect();
        if faces.is_empty() {
            continue;
        }

        let pos = WorldPos::from_chunk_local(chunk_pos, local);
        if let Some(value) = view.value_at(pos) {
            propagator.propagate_from(pos, value);
        }
        for side in faces {
            let outside = pos.adjacent(side);
            if let Some(value) = view.value_at(outside) {
                propagator.propagate_from(outside, value);
            }
        }
    }
    propagator.flush(view);
}

/// Exchange block light and sunlight across every face of the chunk at
/// `chunk_pos`.
///
/// Light on the chunk's boundary spreads out into the neighbors, and light on
/// the neighbors' facing voxels spreads in. The view must contain the chunk's
/// face neighbors.
pub fn propagate_out_of_chunk(view: &mut WorldView<'_>, chunk_pos: ChunkPos) {
    exchange_faces(LightRules, view, chunk_pos);
    exchange_faces(SunlightRules, &mut view.sunlight_view(), chunk_pos);
}

/// Bring both light channels up to date after `changes`, whose blocks are
/// already written.
pub fn update_light<I>(view: &mut WorldView<'_>, changes: I)
where
    I: IntoIterator<Item = BlockChange>,
{
    let changes: Vec<BlockChange> = changes.into_iter().collect();
    BatchPropagator::new(LightRules).process(view, changes.iter().copied());
    BatchPropagator::new(SunlightRules).process(&mut view.sunlight_view(), changes);
}
