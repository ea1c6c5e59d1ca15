//! Chunk pipeline: moves chunks through their lifecycle with one worker pool
//! per phase.
//!
//! The coordinator side ([`ChunkPipeline::update`]) runs on the caller's
//! thread. It drains completed work, reviews the neighborhoods of chunks that
//! advanced, queues whatever became eligible, finalizes chunks whose
//! neighbors are lit, and unloads chunks nobody needs once the near-cache is
//! over capacity.

pub mod phase;
pub mod phases;

use std::sync::Arc;
use std::time::Duration;

use crossbeam::channel::{self, Receiver, Sender};
use glam::IVec3;
use hashbrown::{HashMap, HashSet};
use parking_lot::RwLock;
use strata_core::{ChunkPos, Region3};
use tracing::{debug, info};

use crate::cache::ChunkCache;
use crate::chunk::ChunkState;
use crate::error::Result;
use crate::generation::ChunkGenerator;
use crate::store::ChunkStore;

pub use phase::{ChunkPhase, ChunkProcessor, PhaseConfig, Relevance};
pub use phases::{CreateOrFetch, InternalLighting, LightPropagation, SecondPass};

/// How far, in view extents, a chunk's dependencies reach: finalizing needs
/// lit neighbors, lighting needs internally lit neighbors, which need
/// second-passed neighbors, which need loaded neighbors.
const DEPENDENCY_DEPTH: i32 = 4;

/// Configuration for the chunk pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Worker threads for loading or generating chunks.
    pub creation_threads: usize,
    /// Worker threads for the generator's second pass.
    pub second_pass_threads: usize,
    /// Worker threads for internal lighting.
    pub internal_lighting_threads: usize,
    /// Worker threads for cross-chunk light propagation.
    pub light_propagation_threads: usize,
    /// Half-size of the neighborhood a chunk step can see.
    pub view_extents: IVec3,
    /// How long an idle worker waits before checking for shutdown.
    pub poll_interval: Duration,
    /// How long `dispose` waits for each phase's workers.
    pub join_timeout: Duration,
    /// Chunk count above which unneeded chunks are unloaded.
    pub cache_capacity: usize,
    /// Extra chunks kept around every region before unloading.
    pub unload_margin: i32,
    /// World Y from which chunks start out under open sky.
    pub sky_level: i64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            creation_threads: 2,
            second_pass_threads: 1,
            internal_lighting_threads: 2,
            light_propagation_threads: 2,
            view_extents: IVec3::ONE,
            poll_interval: Duration::from_millis(50),
            join_timeout: Duration::from_secs(1),
            cache_capacity: 4096,
            unload_margin: 2,
            sky_level: 24,
        }
    }
}

impl PipelineConfig {
    /// Use `threads` workers for every phase.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.creation_threads = threads;
        self.second_pass_threads = threads;
        self.internal_lighting_threads = threads;
        self.light_propagation_threads = threads;
        self
    }

    pub fn with_view_extents(mut self, extents: IVec3) -> Self {
        self.view_extents = extents;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_join_timeout(mut self, timeout: Duration) -> Self {
        self.join_timeout = timeout;
        self
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    pub fn with_unload_margin(mut self, margin: i32) -> Self {
        self.unload_margin = margin;
        self
    }

    pub fn with_sky_level(mut self, sky_level: i64) -> Self {
        self.sky_level = sky_level;
        self
    }

    fn phase_config(&self) -> PhaseConfig {
        PhaseConfig {
            poll_interval: self.poll_interval,
            join_timeout: self.join_timeout,
        }
    }
}

/// Which phase finished a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhaseKind {
    Creation,
    SecondPass,
    InternalLighting,
    LightPropagation,
}

impl PhaseKind {
    pub const ALL: [Self; 4] = [
        Self::Creation,
        Self::SecondPass,
        Self::InternalLighting,
        Self::LightPropagation,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Creation => "creation",
            Self::SecondPass => "second-pass",
            Self::InternalLighting => "internal-lighting",
            Self::LightPropagation => "light-propagation",
        }
    }
}

/// Progress notifications for subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineEvent {
    PhaseCompleted { phase: PhaseKind, pos: ChunkPos },
    ChunkReady(ChunkPos),
    ChunkUnloaded(ChunkPos),
}

/// What one call to [`ChunkPipeline::update`] achieved.
#[derive(Debug, Default, Clone)]
pub struct PipelineUpdate {
    /// Chunks that became `Complete`.
    pub ready: Vec<ChunkPos>,
    /// Chunks written to the store and dropped from the near-cache.
    pub unloaded: Vec<ChunkPos>,
}

/// Handle for a relevance region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionId(u64);

#[derive(Debug, Clone, Copy)]
struct RelevanceRegion {
    center: ChunkPos,
    radius: IVec3,
}

/// The regions the pipeline keeps loaded, shared with the phases as their
/// relevance scorer.
#[derive(Default)]
struct RegionSet {
    regions: RwLock<HashMap<RegionId, RelevanceRegion>>,
}

impl RegionSet {
    /// Whether any region expanded by `extra` covers `pos`.
    fn covers(&self, pos: ChunkPos, extra: IVec3) -> bool {
        self.regions
            .read()
            .values()
            .any(|region| Region3::around(region.center, region.radius + extra).contains(pos))
    }

    fn boxes(&self, extra: IVec3) -> Vec<Region3> {
        let mut regions: Vec<_> = self.regions.read().iter().map(|(id, r)| (*id, *r)).collect();
        regions.sort_by_key(|(id, _)| *id);
        regions
            .into_iter()
            .map(|(_, region)| Region3::around(region.center, region.radius + extra))
            .collect()
    }
}

impl Relevance for RegionSet {
    fn score(&self, pos: ChunkPos) -> i64 {
        self.regions
            .read()
            .values()
            .map(|region| i64::from(region.center.grid_distance(pos)))
            .min()
            .unwrap_or(i64::MAX)
    }
}

/// Drives chunks from nothing to `Complete` around a set of regions.
pub struct ChunkPipeline {
    config: PipelineConfig,
    cache: Arc<ChunkCache>,
    store: Arc<dyn ChunkStore>,
    regions: Arc<RegionSet>,
    next_region: u64,
    /// Temporary regions created by `request`, dropped once the chunk is ready.
    requests: HashMap<ChunkPos, RegionId>,
    /// Phases in lifecycle order, matching `PhaseKind::ALL`.
    phases: Vec<(PhaseKind, ChunkPhase)>,
    /// Set when regions changed and the whole area needs a review.
    dirty: bool,
    subscribers: Vec<Sender<PipelineEvent>>,
    disposed: bool,
}

impl ChunkPipeline {
    /// Start the phase worker pools.
    pub fn new(
        config: PipelineConfig,
        cache: Arc<ChunkCache>,
        generator: Arc<dyn ChunkGenerator>,
        store: Arc<dyn ChunkStore>,
    ) -> Result<Self> {
        let regions = Arc::new(RegionSet::default());
        let relevance: Arc<dyn Relevance> = regions.clone();
        let phase_config = config.phase_config();
        let extents = config.view_extents;

        let processors: [(PhaseKind, Arc<dyn ChunkProcessor>, usize); 4] = [
            (
                PhaseKind::Creation,
                Arc::new(CreateOrFetch {
                    cache: Arc::clone(&cache),
                    generator: Arc::clone(&generator),
                    store: Arc::clone(&store),
                }),
                config.creation_threads,
            ),
            (
                PhaseKind::SecondPass,
                Arc::new(SecondPass {
                    cache: Arc::clone(&cache),
                    generator: Arc::clone(&generator),
                    extents,
                }),
                config.second_pass_threads,
            ),
            (
                PhaseKind::InternalLighting,
                Arc::new(InternalLighting {
                    cache: Arc::clone(&cache),
                    sky_level: config.sky_level,
                }),
                config.internal_lighting_threads,
            ),
            (
                PhaseKind::LightPropagation,
                Arc::new(LightPropagation {
                    cache: Arc::clone(&cache),
                    extents,
                }),
                config.light_propagation_threads,
            ),
        ];

        let mut phases = Vec::with_capacity(processors.len());
        for (kind, processor, threads) in processors {
            let phase = ChunkPhase::new(
                kind.name(),
                processor,
                threads,
                Arc::clone(&relevance),
                phase_config,
            )?;
            phases.push((kind, phase));
        }

        info!(?extents, capacity = config.cache_capacity, "Chunk pipeline started");

        Ok(Self {
            config,
            cache,
            store,
            regions,
            next_region: 0,
            requests: HashMap::new(),
            phases,
            dirty: false,
            subscribers: Vec::new(),
            disposed: false,
        })
    }

    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<ChunkCache> {
        &self.cache
    }

    /// Keep chunks within `radius` of `center` complete.
    pub fn add_region(&mut self, center: ChunkPos, radius: IVec3) -> RegionId {
        let id = RegionId(self.next_region);
        self.next_region += 1;
        self.regions
            .regions
            .write()
            .insert(id, RelevanceRegion { center, radius });
        self.dirty = true;
        debug!(?id, ?center, ?radius, "Region added");
        id
    }

    /// Move a region. Returns false if it does not exist.
    pub fn move_region(&mut self, id: RegionId, center: ChunkPos) -> bool {
        let mut regions = self.regions.regions.write();
        let Some(region) = regions.get_mut(&id) else {
            return false;
        };
        if region.center != center {
            region.center = center;
            self.dirty = true;
        }
        true
    }

    /// Stop keeping a region loaded. Returns false if it did not exist.
    pub fn remove_region(&mut self, id: RegionId) -> bool {
        let removed = self.regions.regions.write().remove(&id).is_some();
        self.dirty |= removed;
        removed
    }

    /// Produce the chunk at `pos` and everything it depends on.
    pub fn request(&mut self, pos: ChunkPos) {
        if self.requests.contains_key(&pos) {
            return;
        }
        if self.cache.get(pos).is_some_and(|chunk| chunk.state() == ChunkState::Complete) {
            return;
        }
        let id = self.add_region(pos, IVec3::ZERO);
        self.requests.insert(pos, id);
    }

    /// Receive every subsequent [`PipelineEvent`].
    pub fn subscribe(&mut self) -> Receiver<PipelineEvent> {
        let (tx, rx) = channel::unbounded();
        self.subscribers.push(tx);
        rx
    }

    /// True when no phase has queued or running work and no review is due.
    pub fn is_idle(&self) -> bool {
        !self.dirty && self.phases.iter().all(|(_, phase)| phase.in_flight() == 0)
    }

    /// Whether any phase is working on `pos`.
    pub fn is_processing(&self, pos: ChunkPos) -> bool {
        self.phases.iter().any(|(_, phase)| phase.is_processing(pos))
    }

    /// Advance the pipeline. Call regularly from one thread.
    pub fn update(&mut self) -> PipelineUpdate {
        let mut result = PipelineUpdate::default();
        if self.disposed {
            return result;
        }
        let extents = self.config.view_extents;

        let mut completed = Vec::new();
        let mut failures = 0;
        for (kind, phase) in &self.phases {
            while let Some(pos) = phase.poll() {
                completed.push((*kind, pos));
            }
            failures += phase.take_failures();
        }

        let mut to_review = HashSet::new();
        for &(phase, pos) in &completed {
            self.emit(PipelineEvent::PhaseCompleted { phase, pos });
            // Restored chunks may already be complete.
            if phase == PhaseKind::Creation
                && self.cache.get(pos).is_some_and(|c| c.state() == ChunkState::Complete)
            {
                self.chunk_ready(pos, &mut result);
            }
            to_review.extend(Region3::around(pos, extents).iter());
        }

        if self.dirty || failures > 0 {
            self.dirty = false;
            for area in self.regions.boxes(extents * DEPENDENCY_DEPTH) {
                to_review.extend(area.iter());
            }
        }

        let mut to_review: Vec<_> = to_review.into_iter().collect();
        to_review.sort_by_key(|pos| self.regions.score(*pos));
        for pos in to_review {
            self.review(pos, &mut result);
        }

        self.unload(&mut result);
        result
    }

    /// Queue the next step for `pos` if its neighborhood allows it.
    fn review(&mut self, pos: ChunkPos, result: &mut PipelineUpdate) {
        let extents = self.config.view_extents;
        if !self.regions.covers(pos, extents * DEPENDENCY_DEPTH) {
            return;
        }
        let Some(chunk) = self.cache.get(pos) else {
            self.phase(PhaseKind::Creation).queue(pos);
            return;
        };

        let state = chunk.state();
        let gate = match state {
            ChunkState::AdjacencyGenerationPending => ChunkState::AdjacencyGenerationPending,
            ChunkState::InternalLightGenerationPending => ChunkState::InternalLightGenerationPending,
            ChunkState::LightPropagationPending => ChunkState::LightPropagationPending,
            ChunkState::FullLightConnectivityPending => ChunkState::FullLightConnectivityPending,
            ChunkState::Unready | ChunkState::Complete => return,
        };
        if !self.neighbors_reached(pos, gate) {
            return;
        }

        match state {
            ChunkState::AdjacencyGenerationPending => {
                self.phase(PhaseKind::SecondPass).queue(pos);
            }
            ChunkState::InternalLightGenerationPending => {
                self.phase(PhaseKind::InternalLighting).queue(pos);
            }
            ChunkState::LightPropagationPending => {
                self.phase(PhaseKind::LightPropagation).queue(pos);
            }
            ChunkState::FullLightConnectivityPending => {
                let finalized = {
                    let mut data = chunk.lock();
                    if data.state() == ChunkState::FullLightConnectivityPending {
                        data.advance_state(
                            ChunkState::FullLightConnectivityPending,
                            ChunkState::Complete,
                        );
                        true
                    } else {
                        false
                    }
                };
                if finalized {
                    self.chunk_ready(pos, result);
                }
            }
            ChunkState::Unready | ChunkState::Complete => {}
        }
    }

    /// Whether every neighbor within the view extents is loaded and at
    /// least in `state`.
    fn neighbors_reached(&self, pos: ChunkPos, state: ChunkState) -> bool {
        Region3::around(pos, self.config.view_extents)
            .iter()
            .filter(|&neighbor| neighbor != pos)
            .all(|neighbor| {
                self.cache
                    .get(neighbor)
                    .is_some_and(|chunk| chunk.state() >= state)
            })
    }

    fn chunk_ready(&mut self, pos: ChunkPos, result: &mut PipelineUpdate) {
        result.ready.push(pos);
        self.emit(PipelineEvent::ChunkReady(pos));
        if let Some(id) = self.requests.remove(&pos) {
            self.remove_region(id);
        }
    }

    fn unload(&mut self, result: &mut PipelineUpdate) {
        if self.cache.len() <= self.cache.capacity() {
            return;
        }
        let extents = self.config.view_extents;
        let keep = extents * DEPENDENCY_DEPTH + IVec3::splat(self.config.unload_margin);
        let regions = Arc::clone(&self.regions);
        let phases = &self.phases;
        let busy = |pos: ChunkPos| {
            Region3::around(pos, extents)
                .iter()
                .any(|near| phases.iter().any(|(_, phase)| phase.is_processing(near)))
        };
        let store = Arc::clone(&self.store);

        let unloaded = self.cache.evict_if_needed(
            |pos| !regions.covers(pos, keep) && !busy(pos),
            |pos, data| store.put(pos, data.snapshot()),
        );
        if !unloaded.is_empty() {
            debug!(count = unloaded.len(), "Unloaded chunks");
        }
        for pos in unloaded {
            self.emit(PipelineEvent::ChunkUnloaded(pos));
            result.unloaded.push(pos);
        }
    }

    fn phase(&self, kind: PhaseKind) -> &ChunkPhase {
        &self.phases[kind as usize].1
    }

    fn emit(&mut self, event: PipelineEvent) {
        self.subscribers.retain(|tx| tx.send(event).is_ok());
    }

    /// Stop every phase. Safe to call repeatedly.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        for (_, phase) in &mut self.phases {
            phase.dispose();
        }
        self.subscribers.clear();
        info!("Chunk pipeline disposed");
    }
}

impl Drop for ChunkPipeline {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::Chunk;
    use crate::generation::FlatGenerator;
    use crate::store::MemoryChunkStore;
    use std::time::Instant;
    use strata_core::{BlockId, LocalPos, WorldPos};

    fn test_config() -> PipelineConfig {
        PipelineConfig::default()
            .with_view_extents(IVec3::new(1, 0, 1))
            .with_poll_interval(Duration::from_millis(5))
            .with_join_timeout(Duration::from_millis(500))
    }

    fn pipeline_with(
        config: PipelineConfig,
        generator: Arc<dyn ChunkGenerator>,
        store: Arc<dyn ChunkStore>,
    ) -> ChunkPipeline {
        let cache = Arc::new(ChunkCache::new(config.cache_capacity));
        ChunkPipeline::new(config, cache, generator, store).unwrap()
    }

    fn run_until(pipeline: &mut ChunkPipeline, mut done: impl FnMut(&PipelineUpdate) -> bool) {
        let deadline = Instant::now() + Duration::from_secs(20);
        loop {
            let update = pipeline.update();
            if done(&update) {
                return;
            }
            assert!(Instant::now() < deadline, "pipeline stalled");
            std::thread::sleep(Duration::from_millis(2));
        }
    }

    /// Flat ground with a torch just inside the +X face of chunk (0, 0, 0).
    struct TorchGenerator;

    impl ChunkGenerator for TorchGenerator {
        fn generate_chunk(&self, pos: ChunkPos) -> Result<Chunk> {
            let mut chunk = FlatGenerator::new(0).generate_chunk(pos)?;
            if pos == ChunkPos::new(0, 0, 0) {
                chunk
                    .data_mut()
                    .set_block(LocalPos::new(15, 1, 8), BlockId::TORCH);
            }
            Ok(chunk)
        }
    }

    #[test]
    fn requested_chunk_walks_every_phase_once() {
        let mut pipeline = pipeline_with(
            test_config(),
            Arc::new(FlatGenerator::new(0)),
            Arc::new(MemoryChunkStore::new()),
        );
        let events = pipeline.subscribe();
        let target = ChunkPos::new(0, 0, 0);

        pipeline.request(target);
        run_until(&mut pipeline, |update| update.ready.contains(&target));

        // Radius 0 plus four layers of 3x1x3 neighborhoods.
        assert_eq!(pipeline.cache().len(), 81);
        assert_eq!(
            pipeline.cache().get(target).unwrap().state(),
            ChunkState::Complete
        );

        let for_target: Vec<_> = events
            .try_iter()
            .filter(|event| match event {
                PipelineEvent::PhaseCompleted { pos, .. } | PipelineEvent::ChunkReady(pos) => {
                    *pos == target
                }
                PipelineEvent::ChunkUnloaded(_) => false,
            })
            .collect();
        assert_eq!(
            for_target,
            vec![
                PipelineEvent::PhaseCompleted {
                    phase: PhaseKind::Creation,
                    pos: target
                },
                PipelineEvent::PhaseCompleted {
                    phase: PhaseKind::SecondPass,
                    pos: target
                },
                PipelineEvent::PhaseCompleted {
                    phase: PhaseKind::InternalLighting,
                    pos: target
                },
                PipelineEvent::PhaseCompleted {
                    phase: PhaseKind::LightPropagation,
                    pos: target
                },
                PipelineEvent::ChunkReady(target),
            ]
        );
    }

    #[test]
    fn ready_chunks_see_neighbor_light() {
        let mut pipeline = pipeline_with(
            test_config(),
            Arc::new(TorchGenerator),
            Arc::new(MemoryChunkStore::new()),
        );
        let target = ChunkPos::new(0, 0, 0);

        pipeline.request(target);
        run_until(&mut pipeline, |update| update.ready.contains(&target));

        let east = pipeline.cache().get(ChunkPos::new(1, 0, 0)).unwrap();
        let at = WorldPos::new(18, 1, 8).local_pos();
        assert_eq!(east.lock().light(at), 12);
    }

    #[test]
    fn regions_complete_every_chunk_inside() {
        let mut pipeline = pipeline_with(
            test_config(),
            Arc::new(FlatGenerator::new(0)),
            Arc::new(MemoryChunkStore::new()),
        );
        let id = pipeline.add_region(ChunkPos::new(0, 0, 0), IVec3::new(1, 0, 1));
        let inner = Region3::around(ChunkPos::new(0, 0, 0), IVec3::new(1, 0, 1));

        let mut ready = HashSet::new();
        run_until(&mut pipeline, |update| {
            ready.extend(update.ready.iter().copied());
            inner.iter().all(|pos| ready.contains(&pos))
        });

        assert!(pipeline.remove_region(id));
        assert!(!pipeline.remove_region(id));
    }

    #[test]
    fn unloaded_chunks_return_from_store() {
        let store = Arc::new(MemoryChunkStore::new());
        let mut pipeline = pipeline_with(
            test_config().with_cache_capacity(0),
            Arc::new(FlatGenerator::new(0)),
            store.clone(),
        );
        let events = pipeline.subscribe();
        let target = ChunkPos::new(0, 0, 0);

        pipeline.request(target);
        run_until(&mut pipeline, |update| update.ready.contains(&target));

        // The request is satisfied, so nothing holds the chunks any more.
        run_until(&mut pipeline, |_| store.len() == 81);
        assert!(events
            .try_iter()
            .any(|event| event == PipelineEvent::ChunkUnloaded(target)));
        let stored = store.get(target).unwrap().unwrap();
        assert_eq!(stored.state(), ChunkState::Complete);

        pipeline.request(target);
        run_until(&mut pipeline, |update| update.ready.contains(&target));
    }

    /// Flat ground whose chunk at `held` stays in creation until released.
    struct HeldGenerator {
        held: ChunkPos,
        entered: Sender<()>,
        release: Receiver<()>,
    }

    impl ChunkGenerator for HeldGenerator {
        fn generate_chunk(&self, pos: ChunkPos) -> Result<Chunk> {
            if pos == self.held {
                let _ = self.entered.send(());
                let _ = self.release.recv();
            }
            FlatGenerator::new(0).generate_chunk(pos)
        }
    }

    #[test]
    fn unload_spares_neighbors_of_a_step_in_progress() {
        let held = ChunkPos::new(1, 0, 0);
        let (entered_tx, entered) = channel::unbounded();
        let (release_tx, release) = channel::unbounded();
        let mut pipeline = pipeline_with(
            test_config().with_cache_capacity(0),
            Arc::new(HeldGenerator {
                held,
                entered: entered_tx,
                release,
            }),
            Arc::new(MemoryChunkStore::new()),
        );
        let cache = Arc::clone(pipeline.cache());
        let id = pipeline.add_region(ChunkPos::new(0, 0, 0), IVec3::ZERO);

        let neighbors: Vec<ChunkPos> = Region3::around(held, IVec3::new(1, 0, 1))
            .iter()
            .filter(|&pos| pos != held)
            .collect();
        let far = ChunkPos::new(-3, 0, 0);
        run_until(&mut pipeline, |_| {
            neighbors.iter().chain([&far]).all(|&pos| cache.contains(pos))
        });
        entered.recv_timeout(Duration::from_secs(20)).unwrap();
        assert!(pipeline.is_processing(held));

        // Nothing covers the old area any more and the cache is over capacity.
        assert!(pipeline.move_region(id, ChunkPos::new(100, 0, 0)));
        run_until(&mut pipeline, |_| !cache.contains(far));
        for &pos in &neighbors {
            assert!(cache.contains(pos), "{pos:?} unloaded beside a step in progress");
        }
        assert!(pipeline.is_processing(held));

        // Once the step finishes the neighbors go too.
        release_tx.send(()).unwrap();
        run_until(&mut pipeline, |_| {
            neighbors.iter().all(|&pos| !cache.contains(pos))
        });
        pipeline.dispose();
    }

    #[test]
    fn dispose_is_idempotent() {
        let mut pipeline = pipeline_with(
            test_config(),
            Arc::new(FlatGenerator::new(0)),
            Arc::new(MemoryChunkStore::new()),
        );
        pipeline.request(ChunkPos::new(0, 0, 0));
        pipeline.update();

        pipeline.dispose();
        pipeline.dispose();
        assert!(pipeline.update().ready.is_empty());
    }

    #[test]
    fn relevance_prefers_nearest_region() {
        let regions = RegionSet::default();
        assert_eq!(regions.score(ChunkPos::new(0, 0, 0)), i64::MAX);

        regions.regions.write().insert(
            RegionId(0),
            RelevanceRegion {
                center: ChunkPos::new(10, 0, 0),
                radius: IVec3::ZERO,
            },
        );
        regions.regions.write().insert(
            RegionId(1),
            RelevanceRegion {
                center: ChunkPos::new(-2, 0, 0),
                radius: IVec3::ZERO,
            },
        );
        assert_eq!(regions.score(ChunkPos::new(0, 0, 1)), 3);
        assert!(regions.covers(ChunkPos::new(12, 0, 0), IVec3::splat(2)));
        assert!(!regions.covers(ChunkPos::new(13, 0, 0), IVec3::splat(2)));
    }
}
