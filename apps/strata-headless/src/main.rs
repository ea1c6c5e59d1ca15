//! Strata headless driver
//!
//! Streams a procedurally generated world around a focus point, places a
//! torch, pours water and reports what happened. Useful for watching the
//! chunk pipeline and the liquid simulator without a renderer.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p strata-headless -- [--seed <N>] [--radius <N>] [--pour-steps <N>]
//! ```
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: Set log level (e.g., info, debug, trace)

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::bail;
use glam::IVec3;
use strata_core::{BlockId, ChunkPos, Region3, Side, WorldPos};
use strata_world::{
    ChunkGenerator, ChunkState, LiquidConfig, LiquidSimulator, MemoryChunkStore, PipelineConfig,
    PipelineEvent, TerrainGenerator, World,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const STREAM_TIMEOUT: Duration = Duration::from_secs(120);
const UPDATE_INTERVAL: Duration = Duration::from_millis(5);

/// Command line parameters.
#[derive(Debug, Clone, Copy)]
struct HeadlessParams {
    seed: u64,
    /// Horizontal region radius in chunks.
    radius: i32,
    /// Liquid steps to wait for after pouring.
    pour_steps: u32,
}

impl Default for HeadlessParams {
    fn default() -> Self {
        Self {
            seed: 42,
            radius: 2,
            pour_steps: 20,
        }
    }
}

impl HeadlessParams {
    fn from_args() -> Self {
        let mut params = Self::default();
        let args: Vec<String> = std::env::args().collect();

        let mut i = 1;
        while i < args.len() {
            let value = args.get(i + 1);
            match args[i].as_str() {
                "--seed" => {
                    if let Some(v) = value.and_then(|v| v.parse().ok()) {
                        params.seed = v;
                        i += 1;
                    }
                }
                "--radius" => {
                    if let Some(v) = value.and_then(|v| v.parse().ok()) {
                        params.radius = v;
                        i += 1;
                    }
                }
                "--pour-steps" => {
                    if let Some(v) = value.and_then(|v| v.parse().ok()) {
                        params.pour_steps = v;
                        i += 1;
                    }
                }
                other => warn!(arg = other, "Ignoring unknown argument"),
            }
            i += 1;
        }

        params
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let params = HeadlessParams::from_args();
    info!(?params, "Starting headless world");

    let generator = Arc::new(TerrainGenerator::with_seed(params.seed));
    let surface = i64::from(generator.height_at(0, 0));
    let generator: Arc<dyn ChunkGenerator> = generator;

    let config = PipelineConfig::default().with_cache_capacity(2048);
    let world = Arc::new(World::new(
        config,
        generator,
        Arc::new(MemoryChunkStore::new()),
    )?);
    let events = world.subscribe();

    // Stream the area around the spawn column.
    let focus = WorldPos::new(0, surface, 0).chunk_pos();
    let radius = IVec3::new(params.radius, 1, params.radius);
    let region = world.add_region(focus, radius);
    let started = Instant::now();
    let ready = stream_until_complete(&world, focus, radius)?;
    let phases = events
        .try_iter()
        .filter(|event| matches!(event, PipelineEvent::PhaseCompleted { .. }))
        .count();
    info!(
        ready,
        phases,
        loaded = world.cache().len(),
        elapsed = ?started.elapsed(),
        "Region streamed"
    );

    // Light.
    let torch = WorldPos::new(0, surface + 1, 0);
    if world.set_block(torch, BlockId::TORCH) {
        let nearby = torch.offset(3, 0, 0);
        info!(
            ?torch,
            light = ?world.light(torch),
            sunlight = ?world.sunlight(torch),
            ?nearby,
            nearby_light = ?world.light(nearby),
            "Torch placed"
        );
    } else {
        warn!(?torch, "Could not place torch");
    }

    // Liquid.
    let mut simulator = LiquidSimulator::start(
        Arc::clone(&world),
        LiquidConfig::default().with_propagation_delay(Duration::from_millis(20)),
    )?;
    let spring = WorldPos::new(6, surface + 1, 6);
    if world.set_block(spring, BlockId::WATER) {
        for _ in 0..params.pour_steps {
            world.update();
            thread::sleep(Duration::from_millis(20));
        }
        let wet = Side::HORIZONTAL
            .iter()
            .filter(|side| world.liquid(spring.adjacent(**side)).is_some_and(|s| !s.is_empty()))
            .count();
        info!(?spring, state = ?world.liquid(spring), wet_neighbors = wet, "Water poured");
    } else {
        warn!(?spring, "Could not pour water");
    }
    simulator.dispose();

    // Walk away so the old area unloads.
    let moved = focus.offset(IVec3::new(params.radius * 8 + 8, 0, 0));
    world.move_region(region, moved);
    stream_until_complete(&world, moved, radius)?;
    let unloaded = events
        .try_iter()
        .filter(|event| matches!(event, PipelineEvent::ChunkUnloaded(_)))
        .count();
    info!(?moved, unloaded, loaded = world.cache().len(), "Region moved");

    world.dispose();
    info!("Done");
    Ok(())
}

/// Drive the pipeline until every chunk of the box is complete. Returns the
/// number of chunks that became ready meanwhile.
fn stream_until_complete(world: &World, center: ChunkPos, radius: IVec3) -> anyhow::Result<usize> {
    let deadline = Instant::now() + STREAM_TIMEOUT;
    let area = Region3::around(center, radius);
    let mut ready = 0;
    loop {
        ready += world.update().ready.len();
        let complete = area.iter().all(|pos| {
            world
                .chunk(pos)
                .is_some_and(|chunk| chunk.state() == ChunkState::Complete)
        });
        if complete {
            return Ok(ready);
        }
        if Instant::now() > deadline {
            bail!("timed out streaming {center:?}");
        }
        thread::sleep(UPDATE_INTERVAL);
    }
}
