use strata_core::{BlockId, WorldPos};

/// A single voxel edit, consumed once by a propagator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BlockChange {
    pub position: WorldPos,
    pub from: BlockId,
    pub to: BlockId,
}

impl BlockChange {
    #[inline]
    pub const fn new(position: WorldPos, from: BlockId, to: BlockId) -> Self {
        Self { position, from, to }
    }
}
