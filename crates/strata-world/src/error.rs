//! Error types for chunk processing.

use strata_core::ChunkPos;
use thiserror::Error;

/// Recoverable failures of a chunk processing step.
///
/// A step that returns one of these is logged and left uncompleted, so the
/// pipeline can queue the chunk again on a later pass.
#[derive(Error, Debug)]
pub enum WorldError {
    /// The chunk is not in the near-cache.
    #[error("chunk {0:?} is not loaded")]
    MissingChunk(ChunkPos),

    /// A chunk the step needs to see around `pos` is not in the near-cache.
    #[error("neighbor {neighbor:?} of chunk {pos:?} is not loaded")]
    MissingNeighbor { pos: ChunkPos, neighbor: ChunkPos },

    /// The chunk generator failed.
    #[error("generation failed for chunk {pos:?}: {reason}")]
    Generation { pos: ChunkPos, reason: String },

    /// The chunk store failed.
    #[error("chunk store error: {0}")]
    Store(String),

    /// A worker thread could not be started.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),

    /// The pipeline is being disposed.
    #[error("pipeline is shutting down")]
    ShuttingDown,
}

/// Result type alias using [`WorldError`].
pub type Result<T> = std::result::Result<T, WorldError>;
