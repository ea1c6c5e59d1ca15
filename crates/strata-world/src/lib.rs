//! Chunk streaming, lighting and liquid simulation for the Strata voxel world.
//!
//! Chunks are produced by a [`ChunkPipeline`] that walks each chunk through
//! its [`ChunkState`] lifecycle on per-phase worker pools. The [`World`]
//! facade reads and edits complete chunks, keeps block light and sunlight
//! consistent and tells [`WorldListener`]s about changes. A
//! [`LiquidSimulator`] listens to the world and spreads liquids on its own
//! thread.

pub mod cache;
pub mod chunk;
pub mod error;
pub mod event;
pub mod generation;
pub mod lighting;
pub mod liquid;
pub mod pipeline;
pub mod store;
pub mod view;
pub mod world;

pub use cache::ChunkCache;
pub use chunk::{Chunk, ChunkData, ChunkGuard, ChunkState, LightChannel};
pub use error::{Result, WorldError};
pub use event::{BlockChangedEvent, WorldListener};
pub use generation::{ChunkGenerator, FlatGenerator, TerrainConfig, TerrainGenerator};
pub use lighting::{
    generate_internal_lighting, is_sky_chunk, propagate_out_of_chunk, update_light,
};
pub use liquid::{
    calc_state_for, LiquidConfig, LiquidKind, LiquidRelaxation, LiquidSimulator, LiquidState,
    LiquidTask, LiquidWorker,
};
pub use pipeline::{
    ChunkPipeline, PhaseKind, PipelineConfig, PipelineEvent, PipelineUpdate, RegionId,
};
pub use store::{ChunkStore, MemoryChunkStore};
pub use view::{ChunkRegion, SunlightView, WorldView};
pub use world::World;

/// World seed for procedural generation.
pub type WorldSeed = u64;
