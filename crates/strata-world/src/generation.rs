//! Procedural terrain generation.

use noise::{Fbm, MultiFractal, NoiseFn, Perlin};
use strata_core::constants::CHUNK_SIZE;
use strata_core::{BlockId, ChunkPos, LocalPos, WorldPos};

use crate::chunk::{Chunk, ChunkData};
use crate::error::Result;
use crate::liquid::{LiquidKind, LiquidState};
use crate::view::WorldView;
use crate::WorldSeed;

/// Produces chunk contents.
///
/// Generation must be deterministic for a given seed: the same position
/// always yields the same chunk, whichever thread asks.
pub trait ChunkGenerator: Send + Sync {
    /// Build the chunk at `pos` from nothing but its position.
    fn generate_chunk(&self, pos: ChunkPos) -> Result<Chunk>;

    /// Whether [`second_pass`](Self::second_pass) does anything.
    fn has_second_pass(&self) -> bool {
        false
    }

    /// Add features that need to see or write into neighboring chunks.
    ///
    /// `view` holds the chunk at `pos` and all of its neighbors.
    fn second_pass(&self, _pos: ChunkPos, _view: &mut WorldView<'_>) -> Result<()> {
        Ok(())
    }
}

/// Terrain generator configuration.
#[derive(Debug, Clone)]
pub struct TerrainConfig {
    /// Seed for noise generation.
    pub seed: WorldSeed,
    /// Cells at or below this Y that the terrain leaves open fill with water.
    pub sea_level: i32,
    /// Lowest possible surface height.
    pub base_height: i32,
    /// Horizontal scale of terrain features.
    pub terrain_scale: f64,
    /// Maximum terrain height variation.
    pub terrain_height: f64,
    /// Number of noise octaves for detail.
    pub octaves: usize,
    /// Frequency multiplier between octaves.
    pub lacunarity: f64,
    /// Amplitude multiplier between octaves.
    pub persistence: f64,
    /// Depth of dirt layer below surface.
    pub dirt_depth: u32,
    /// Chance in `[0, 1]` that a grass column grows a tree.
    pub tree_density: f64,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            sea_level: 0,
            base_height: -8,
            terrain_scale: 64.0,
            terrain_height: 24.0,
            octaves: 4,
            lacunarity: 2.0,
            persistence: 0.5,
            dirt_depth: 4,
            tree_density: 0.01,
        }
    }
}

const TRUNK_HEIGHT: i64 = 4;
const CANOPY_RADIUS: i64 = 2;

/// Procedural terrain generator using fractal noise.
pub struct TerrainGenerator {
    config: TerrainConfig,
    height_noise: Fbm<Perlin>,
}

impl TerrainGenerator {
    /// Create a new terrain generator with the given configuration.
    pub fn new(config: TerrainConfig) -> Self {
        let height_noise = Fbm::<Perlin>::new(config.seed as u32)
            .set_octaves(config.octaves)
            .set_lacunarity(config.lacunarity)
            .set_persistence(config.persistence);

        Self {
            config,
            height_noise,
        }
    }

    /// Create a terrain generator with default configuration.
    pub fn with_seed(seed: WorldSeed) -> Self {
        Self::new(TerrainConfig {
            seed,
            ..Default::default()
        })
    }

    /// Get the terrain configuration.
    pub const fn config(&self) -> &TerrainConfig {
        &self.config
    }

    /// Get terrain height at world XZ coordinates.
    ///
    /// Returns the Y coordinate of the surface at this position.
    pub fn height_at(&self, world_x: i64, world_z: i64) -> i32 {
        let nx = world_x as f64 / self.config.terrain_scale;
        let nz = world_z as f64 / self.config.terrain_scale;

        // Noise returns [-1, 1], map to [0, terrain_height] above the base
        let noise_value = self.height_noise.get([nx, nz]);
        ((noise_value + 1.0) * 0.5 * self.config.terrain_height) as i32 + self.config.base_height
    }

    /// Determine block type at a given world Y relative to surface height.
    fn block_at_depth(&self, world_y: i32, surface_height: i32) -> BlockId {
        let underwater = surface_height < self.config.sea_level;
        if world_y > surface_height {
            if world_y <= self.config.sea_level {
                BlockId::WATER
            } else {
                BlockId::AIR
            }
        } else if world_y == surface_height {
            if underwater {
                BlockId::SAND
            } else {
                BlockId::GRASS
            }
        } else if world_y > surface_height - self.config.dirt_depth as i32 {
            BlockId::DIRT
        } else {
            BlockId::STONE
        }
    }

    /// Whether the column at `(x, z)` grows a tree on its surface.
    fn has_tree(&self, world_x: i64, world_z: i64) -> bool {
        let surface = self.height_at(world_x, world_z);
        if surface < self.config.sea_level {
            return false;
        }
        let roll = column_hash(self.config.seed, world_x, world_z) as f64 / u64::MAX as f64;
        roll < self.config.tree_density
    }

    /// Trunks replace air and leaves, leaves replace only air, so
    /// overlapping trees come out the same whichever grows first.
    fn grow_tree(view: &mut WorldView<'_>, base: WorldPos) {
        for dy in 1..=TRUNK_HEIGHT {
            let pos = base.offset(0, dy, 0);
            if matches!(view.block(pos), Some(BlockId::AIR | BlockId::LEAVES)) {
                view.set_block(pos, BlockId::LOG);
            }
        }
        for dy in (TRUNK_HEIGHT - 1)..=(TRUNK_HEIGHT + 1) {
            for dx in -CANOPY_RADIUS..=CANOPY_RADIUS {
                for dz in -CANOPY_RADIUS..=CANOPY_RADIUS {
                    let pos = base.offset(dx, dy, dz);
                    if view.block(pos) == Some(BlockId::AIR) {
                        view.set_block(pos, BlockId::LEAVES);
                    }
                }
            }
        }
    }
}

impl ChunkGenerator for TerrainGenerator {
    fn generate_chunk(&self, pos: ChunkPos) -> Result<Chunk> {
        let mut data = ChunkData::new();
        let world_base = pos.to_world_pos();

        for lz in 0..CHUNK_SIZE {
            for lx in 0..CHUNK_SIZE {
                let world_x = world_base.x + lx as i64;
                let world_z = world_base.z + lz as i64;
                let surface_height = self.height_at(world_x, world_z);

                for ly in 0..CHUNK_SIZE {
                    let world_y = world_base.y + ly as i64;
                    let block = self.block_at_depth(world_y as i32, surface_height);
                    let local = LocalPos::new(lx as u8, ly as u8, lz as u8);

                    if block != BlockId::AIR {
                        data.set_block(local, block);
                    }
                    if block.is_liquid() {
                        data.set_liquid(local, LiquidState::source(LiquidKind::from_block(block)));
                    }
                }
            }
        }

        Ok(Chunk::from_data(pos, data))
    }

    fn has_second_pass(&self) -> bool {
        self.config.tree_density > 0.0
    }

    fn second_pass(&self, pos: ChunkPos, view: &mut WorldView<'_>) -> Result<()> {
        let world_base = pos.to_world_pos();
        let top = world_base.y + CHUNK_SIZE as i64;
        let mut trees = 0usize;

        for lz in 0..CHUNK_SIZE as i64 {
            for lx in 0..CHUNK_SIZE as i64 {
                let world_x = world_base.x + lx;
                let world_z = world_base.z + lz;
                // The chunk holding the first trunk block owns the tree.
                let root = i64::from(self.height_at(world_x, world_z)) + 1;
                if root < world_base.y || root >= top || !self.has_tree(world_x, world_z) {
                    continue;
                }
                Self::grow_tree(view, WorldPos::new(world_x, root - 1, world_z));
                trees += 1;
            }
        }

        tracing::trace!(?pos, trees, "second pass");
        Ok(())
    }
}

/// Flat ground with grass on top, for tests and tools.
#[derive(Debug, Clone, Copy)]
pub struct FlatGenerator {
    /// Y of the grass layer.
    pub surface: i64,
}

impl FlatGenerator {
    pub const fn new(surface: i64) -> Self {
        Self { surface }
    }
}

impl ChunkGenerator for FlatGenerator {
    fn generate_chunk(&self, pos: ChunkPos) -> Result<Chunk> {
        let mut data = ChunkData::new();
        for local in LocalPos::iter_all() {
            let y = WorldPos::from_chunk_local(pos, local).y;
            if y < self.surface {
                data.set_block(local, BlockId::STONE);
            } else if y == self.surface {
                data.set_block(local, BlockId::GRASS);
            }
        }
        Ok(Chunk::from_data(pos, data))
    }
}

/// `SplitMix64` over the seed and column, stable across runs and platforms.
fn column_hash(seed: WorldSeed, x: i64, z: i64) -> u64 {
    let mut h = seed
        ^ (x as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ (z as u64).wrapping_mul(0xC2B2_AE3D_27D4_EB4F);
    h = (h ^ (h >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    h = (h ^ (h >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    h ^ (h >> 31)
}
