//! Notifications published by the world.

use strata_core::{BlockId, ChunkPos, WorldPos};
use strata_propagation::BlockChange;

/// A block was replaced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockChangedEvent {
    pub position: WorldPos,
    pub old_block: BlockId,
    pub new_block: BlockId,
}

impl From<BlockChange> for BlockChangedEvent {
    fn from(change: BlockChange) -> Self {
        Self {
            position: change.position,
            old_block: change.from,
            new_block: change.to,
        }
    }
}

/// Receives world notifications.
///
/// Callbacks run on whichever thread caused the event, after every chunk
/// lock has been released.
pub trait WorldListener: Send + Sync {
    fn on_block_changed(&self, _event: &BlockChangedEvent) {}

    fn on_chunk_ready(&self, _pos: ChunkPos) {}
}
