//! Chunk data structure for voxel world storage.

use parking_lot::{Mutex, MutexGuard};
use strata_core::constants::CHUNK_SIZE_CUBED;
use strata_core::{BlockId, ChunkPos, LocalPos};

use crate::liquid::LiquidState;

/// State of a chunk in the processing pipeline.
///
/// States are totally ordered; a chunk only ever moves to the immediate
/// successor of its current state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ChunkState {
    /// Freshly generated, not yet installed in the near-cache.
    #[default]
    Unready,
    /// Waiting for neighbor-aware generation.
    AdjacencyGenerationPending,
    /// Waiting for light from the chunk's own emitters.
    InternalLightGenerationPending,
    /// Waiting for light to be spread across the chunk's faces.
    LightPropagationPending,
    /// Lit, waiting for its neighbors to be lit too.
    FullLightConnectivityPending,
    /// Ready for use.
    Complete,
}

impl ChunkState {
    /// The state that follows this one.
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Unready => Some(Self::AdjacencyGenerationPending),
            Self::AdjacencyGenerationPending => Some(Self::InternalLightGenerationPending),
            Self::InternalLightGenerationPending => Some(Self::LightPropagationPending),
            Self::LightPropagationPending => Some(Self::FullLightConnectivityPending),
            Self::FullLightConnectivityPending => Some(Self::Complete),
            Self::Complete => None,
        }
    }
}

/// One of the two light fields a chunk stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LightChannel {
    /// Light from luminous blocks.
    Block,
    /// Light from the sky.
    Sun,
}

/// Voxel contents of a chunk, reachable only through the chunk's lock.
#[derive(Clone)]
pub struct ChunkData {
    blocks: Vec<BlockId>,
    light: Vec<u8>,
    sunlight: Vec<u8>,
    liquid: Vec<LiquidState>,
    state: ChunkState,
}

impl ChunkData {
    /// All air, no light, no liquid.
    pub fn new() -> Self {
        Self::filled(BlockId::AIR)
    }

    /// Every voxel holding `block`.
    pub fn filled(block: BlockId) -> Self {
        Self {
            blocks: vec![block; CHUNK_SIZE_CUBED],
            light: vec![0; CHUNK_SIZE_CUBED],
            sunlight: vec![0; CHUNK_SIZE_CUBED],
            liquid: vec![LiquidState::NONE; CHUNK_SIZE_CUBED],
            state: ChunkState::Unready,
        }
    }

    #[inline]
    pub fn block(&self, pos: LocalPos) -> BlockId {
        self.blocks[pos.to_index()]
    }

    #[inline]
    pub fn set_block(&mut self, pos: LocalPos, block: BlockId) {
        self.blocks[pos.to_index()] = block;
    }

    #[inline]
    pub fn light(&self, pos: LocalPos) -> u8 {
        self.light[pos.to_index()]
    }

    #[inline]
    pub fn set_light(&mut self, pos: LocalPos, value: u8) {
        self.light[pos.to_index()] = value;
    }

    #[inline]
    pub fn sunlight(&self, pos: LocalPos) -> u8 {
        self.sunlight[pos.to_index()]
    }

    #[inline]
    pub fn set_sunlight(&mut self, pos: LocalPos, value: u8) {
        self.sunlight[pos.to_index()] = value;
    }

    /// Value of `channel` at `pos`.
    #[inline]
    pub fn light_value(&self, channel: LightChannel, pos: LocalPos) -> u8 {
        match channel {
            LightChannel::Block => self.light(pos),
            LightChannel::Sun => self.sunlight(pos),
        }
    }

    #[inline]
    pub fn set_light_value(&mut self, channel: LightChannel, pos: LocalPos, value: u8) {
        match channel {
            LightChannel::Block => self.set_light(pos, value),
            LightChannel::Sun => self.set_sunlight(pos, value),
        }
    }

    /// Reset block light and sunlight to zero.
    pub fn clear_light(&mut self) {
        self.light.fill(0);
        self.sunlight.fill(0);
    }

    #[inline]
    pub fn liquid(&self, pos: LocalPos) -> LiquidState {
        self.liquid[pos.to_index()]
    }

    #[inline]
    pub fn set_liquid(&mut self, pos: LocalPos, state: LiquidState) {
        self.liquid[pos.to_index()] = state;
    }

    #[inline]
    pub const fn state(&self) -> ChunkState {
        self.state
    }

    /// Overwrite the state without transition checks. Used when installing
    /// stored data.
    pub fn set_state(&mut self, state: ChunkState) {
        self.state = state;
    }

    /// Move from `expected` to its immediate successor `next`.
    ///
    /// # Panics
    ///
    /// Panics if the chunk is not in `expected`, or `next` does not directly
    /// follow it. Either means a phase ran on a chunk it should not have.
    pub fn advance_state(&mut self, expected: ChunkState, next: ChunkState) {
        assert_eq!(
            self.state, expected,
            "chunk state transition to {next:?} expected {expected:?}"
        );
        assert_eq!(
            expected.next(),
            Some(next),
            "{next:?} does not directly follow {expected:?}"
        );
        self.state = next;
    }

    /// Iterate over every block in index order.
    pub fn blocks(&self) -> impl Iterator<Item = (LocalPos, BlockId)> + '_ {
        self.blocks
            .iter()
            .enumerate()
            .map(|(i, &block)| (LocalPos::from_index(i), block))
    }

    /// Check if this chunk is all air.
    pub fn is_empty(&self) -> bool {
        self.blocks.iter().all(|b| b.is_air())
    }

    /// Copy of the data, for handing to a store.
    pub fn snapshot(&self) -> Self {
        self.clone()
    }
}

impl Default for ChunkData {
    fn default() -> Self {
        Self::new()
    }
}

/// Guard giving exclusive access to a chunk's data.
pub type ChunkGuard<'a> = MutexGuard<'a, ChunkData>;

/// A single chunk of voxel data (16x16x16 voxels) at a fixed grid position.
pub struct Chunk {
    pos: ChunkPos,
    data: Mutex<ChunkData>,
}

impl Chunk {
    /// Create a new empty chunk at the given position.
    pub fn new(pos: ChunkPos) -> Self {
        Self::from_data(pos, ChunkData::new())
    }

    /// Wrap existing data.
    pub fn from_data(pos: ChunkPos, data: ChunkData) -> Self {
        Self {
            pos,
            data: Mutex::new(data),
        }
    }

    #[inline]
    pub const fn pos(&self) -> ChunkPos {
        self.pos
    }

    /// Lock the chunk for the duration of an operation.
    pub fn lock(&self) -> ChunkGuard<'_> {
        self.data.lock()
    }

    /// Lock the chunk if nobody else holds it.
    pub fn try_lock(&self) -> Option<ChunkGuard<'_>> {
        self.data.try_lock()
    }

    /// Direct access while the chunk is not shared yet.
    pub fn data_mut(&mut self) -> &mut ChunkData {
        self.data.get_mut()
    }

    /// Current state, read under the lock.
    pub fn state(&self) -> ChunkState {
        self.data.lock().state()
    }
}

impl std::fmt::Debug for Chunk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chunk")
            .field("pos", &self.pos)
            .field("data", &"<ChunkData>")
            .finish()
    }
}
