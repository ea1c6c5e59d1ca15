//! Core types for the Strata voxel world.
//!
//! This crate provides the foundational types shared by the propagation
//! engine and the chunk pipeline:
//! - Coordinate systems (world, chunk, local) and chunk-space regions
//! - Block faces ([`Side`])
//! - Block identifiers and their static properties

pub mod coords;
pub mod region;
pub mod side;
pub mod types;

pub use coords::{ChunkPos, LocalPos, WorldPos};
pub use region::Region3;
pub use side::Side;
pub use types::{BlockId, BlockProperties};

/// Engine-wide constants
pub mod constants {
    /// Size of a chunk in voxels per axis
    pub const CHUNK_SIZE: usize = 16;
    /// Total voxels in a chunk (16^3)
    pub const CHUNK_SIZE_CUBED: usize = CHUNK_SIZE * CHUNK_SIZE * CHUNK_SIZE;
    /// Bits needed to represent position within a chunk (4 bits for 0-15)
    pub const CHUNK_BITS: u32 = 4;
    /// Brightest light level. Kept below `CHUNK_SIZE` so light pushed across
    /// one chunk face dies out before reaching the opposite face.
    pub const MAX_LIGHT: u8 = 15;
    /// Depth of a liquid source block.
    pub const MAX_LIQUID_DEPTH: u8 = 7;
}
