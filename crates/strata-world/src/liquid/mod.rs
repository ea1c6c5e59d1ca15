//! Liquid flow simulated one cell at a time on a dedicated thread.
//!
//! Every cell's liquid state is a function of its block and its neighbors
//! ([`calc_state_for`]). The simulator keeps a queue of cells that might be
//! stale and re-evaluates the whole queue once per propagation delay, so flow
//! advances one cell per step.

mod state;

pub use state::{LiquidKind, LiquidState};

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, Sender};
use crossbeam::select;
use glam::IVec3;
use strata_core::constants::CHUNK_SIZE;
use strata_core::{BlockId, ChunkPos, Side, WorldPos};
use strata_propagation::{
    BlockChange, ContinuousPropagator, LiquidRules, PropagationRules, Relaxation,
};
use tracing::{debug, trace};

use crate::chunk::ChunkState;
use crate::error::Result;
use crate::event::{BlockChangedEvent, WorldListener};
use crate::lighting::update_light;
use crate::view::{ChunkRegion, WorldView};
use crate::world::World;

/// Configuration for the liquid simulator.
#[derive(Debug, Clone, Copy)]
pub struct LiquidConfig {
    /// Time between simulation steps.
    pub propagation_delay: Duration,
}

impl Default for LiquidConfig {
    fn default() -> Self {
        Self {
            propagation_delay: Duration::from_millis(200),
        }
    }
}

impl LiquidConfig {
    pub fn with_propagation_delay(mut self, delay: Duration) -> Self {
        self.propagation_delay = delay;
        self
    }
}

/// Work for the liquid thread.
#[derive(Debug, Clone, Copy)]
pub enum LiquidTask {
    /// Re-evaluate one cell on the next step.
    Simulate(WorldPos),
    /// React to a block edit.
    BlockChanged(BlockChangedEvent),
    /// Look for stale cells in a chunk that just became ready.
    ReviewChunk(ChunkPos),
}

/// The liquid state `pos` should hold given its surroundings, with `rules`
/// deciding which blocks hold, carry and support liquid.
///
/// A liquid block without a liquid state has just been placed and counts as
/// a source. Returns `None` if `pos` is outside the view.
pub fn calc_state_for<R>(rules: &R, view: &WorldView<'_>, pos: WorldPos) -> Option<LiquidState>
where
    R: PropagationRules + ?Sized,
{
    let block = view.block(pos)?;
    let current = view.liquid(pos)?;

    if !rules.can_spread_into(block, Side::Top) {
        return Some(LiquidState::NONE);
    }
    if current.is_source() {
        return Some(current);
    }
    if block.is_liquid() && current.is_empty() {
        return Some(LiquidState::new(LiquidKind::from_block(block), rules.max_value()));
    }

    let above = pos.above();
    if let (Some(state), Some(above_block)) = (view.liquid(above), view.block(above)) {
        if !state.is_empty() && rules.can_spread_out_of(above_block, Side::Bottom) {
            let depth = rules.propagate_value(rules.max_value(), Side::Bottom, above_block);
            return Some(LiquidState::new(state.kind(), depth));
        }
    }

    // The two deepest horizontal neighbors resting on something that holds
    // no liquid. The deepest one also keeps its block and the side it flows
    // out through.
    let mut first = (LiquidState::NONE, Side::Left, block);
    let mut second = LiquidState::NONE;
    for side in Side::HORIZONTAL {
        let neighbor = pos.adjacent(side);
        let (Some(state), Some(neighbor_block)) = (view.liquid(neighbor), view.block(neighbor)) else {
            continue;
        };
        let supported = view
            .block(neighbor.below())
            .is_some_and(|below| !rules.can_spread_into(below, Side::Top));
        let flows = rules.can_spread_out_of(neighbor_block, side.reverse());
        if state.is_empty() || !supported || !flows {
            continue;
        }
        if state.depth() > first.0.depth() {
            second = first.0;
            first = (state, side.reverse(), neighbor_block);
        } else if state.depth() > second.depth() {
            second = state;
        }
    }

    let (first, outflow, from) = first;
    let flowed = |state: LiquidState| {
        LiquidState::new(state.kind(), rules.propagate_value(state.depth(), outflow, from))
    };
    let state = if first.is_empty() {
        LiquidState::NONE
    } else if second.is_empty() {
        flowed(first)
    } else if first.kind() == second.kind() {
        if first.depth() == second.depth() {
            first
        } else {
            flowed(first)
        }
    } else {
        let depth = first.depth().saturating_sub(second.depth() + 1);
        LiquidState::new(first.kind(), depth)
    };
    Some(state)
}

/// Moves one cell to its calculated state, writing blocks and light to match
/// and notifying listeners afterwards.
#[derive(Debug, Clone, Copy, Default)]
pub struct LiquidRelaxation {
    rules: LiquidRules,
}

impl LiquidRelaxation {
    pub const fn new(rules: LiquidRules) -> Self {
        Self { rules }
    }

    pub const fn rules(&self) -> &LiquidRules {
        &self.rules
    }

    fn apply(&self, view: &mut WorldView<'_>, pos: WorldPos) -> Option<Vec<BlockChange>> {
        if view.chunk_state(pos.chunk_pos()) != Some(ChunkState::Complete) {
            return None;
        }
        let new_state = calc_state_for(&self.rules, view, pos)?;
        let old_state = view.liquid(pos)?;
        if new_state == old_state {
            return None;
        }
        let old_block = view.block(pos)?;
        view.set_liquid(pos, new_state);

        let mut changes = Vec::new();
        let new_block = if new_state.is_empty() {
            if old_block.is_liquid() {
                BlockId::AIR
            } else {
                old_block
            }
        } else {
            new_state.kind().block()
        };
        if new_block != old_block {
            view.set_block(pos, new_block);
            changes.push(BlockChange::new(pos, old_block, new_block));
        }

        let below = pos.below();
        let below_ready = view.chunk_state(below.chunk_pos()) == Some(ChunkState::Complete);
        if old_state.is_empty() && !new_state.is_empty() && below_ready {
            if let Some(soil @ (BlockId::GRASS | BlockId::SNOW)) = view.block(below) {
                view.set_block(below, BlockId::DIRT);
                changes.push(BlockChange::new(below, soil, BlockId::DIRT));
            }
        }

        if !changes.is_empty() {
            update_light(view, changes.iter().copied());
        }
        Some(changes)
    }
}

impl<'w> Relaxation<&'w World> for LiquidRelaxation {
    fn relax(&self, world: &mut &'w World, pos: WorldPos) -> bool {
        let world: &World = *world;
        let region = ChunkRegion::collect_available(world.cache(), pos.chunk_pos(), IVec3::ONE);
        let changes = {
            let mut view = region.lock();
            self.apply(&mut view, pos)
        };
        let Some(changes) = changes else {
            return false;
        };
        if !changes.is_empty() {
            let events: Vec<BlockChangedEvent> = changes.into_iter().map(Into::into).collect();
            world.notify_block_changes(&events);
        }
        true
    }
}

/// Single-threaded simulation state, driven by [`LiquidSimulator`] or
/// directly by tests.
pub struct LiquidWorker {
    world: Arc<World>,
    propagator: ContinuousPropagator<LiquidRelaxation>,
}

impl LiquidWorker {
    pub fn new(world: Arc<World>) -> Self {
        Self {
            world,
            propagator: ContinuousPropagator::new(LiquidRelaxation::new(LiquidRules)),
        }
    }

    pub fn handle(&mut self, task: LiquidTask) {
        match task {
            LiquidTask::Simulate(pos) => {
                self.propagator.enqueue(pos);
            }
            LiquidTask::BlockChanged(event) => self.block_changed(&event),
            LiquidTask::ReviewChunk(pos) => self.review_chunk(pos),
        }
    }

    fn block_changed(&mut self, event: &BlockChangedEvent) {
        let pos = event.position;
        let new_block = event.new_block;
        let current = self.world.liquid(pos);

        if new_block.is_liquid() {
            let kind = LiquidKind::from_block(new_block);
            // Flow writes the block together with a state of the same kind.
            let written_by_flow = |state: LiquidState| !state.is_empty() && state.kind() == kind;
            let still_placed = self.world.block(pos) == Some(new_block);
            let placed = current
                .filter(|&state| still_placed && !state.is_source() && !written_by_flow(state));
            if let Some(current) = placed {
                self.world.set_liquid(pos, LiquidState::source(kind), current);
            }
        } else {
            if let Some(current) = current.filter(|state| !state.is_empty()) {
                self.world.set_liquid(pos, LiquidState::NONE, current);
            }
            if new_block.is_penetrable() {
                self.propagator.enqueue(pos);
            }
        }

        for side in Side::ALL {
            self.propagator.enqueue(pos.adjacent(side));
        }
    }

    /// Queue every stale cell of a chunk and its one-voxel horizontal rim.
    fn review_chunk(&mut self, chunk_pos: ChunkPos) {
        let region = ChunkRegion::collect_available(self.world.cache(), chunk_pos, IVec3::ONE);
        let stale: Vec<WorldPos> = {
            let view = region.lock();
            let rules = self.propagator.relaxation().rules();
            if view.chunk_state(chunk_pos) != Some(ChunkState::Complete) {
                return;
            }
            let base = chunk_pos.to_world_pos();
            let size = CHUNK_SIZE as i64;
            let mut stale = Vec::new();
            for x in -1..=size {
                for z in -1..=size {
                    for y in 0..size {
                        let pos = base.offset(x, y, z);
                        if calc_state_for(rules, &view, pos).is_some_and(|state| Some(state) != view.liquid(pos)) {
                            stale.push(pos);
                        }
                    }
                }
            }
            stale
        };

        if !stale.is_empty() {
            trace!(pos = ?chunk_pos, stale = stale.len(), "Liquid review found stale cells");
        }
        for pos in stale {
            self.propagator.enqueue(pos);
        }
    }

    /// Run one simulation step. Returns the number of cells that changed.
    pub fn tick(&mut self) -> usize {
        let mut world: &World = &self.world;
        self.propagator.run_round(&mut world)
    }

    pub fn is_idle(&self) -> bool {
        self.propagator.is_idle()
    }

    pub fn pending(&self) -> usize {
        self.propagator.pending()
    }
}

/// Forwards world notifications to the liquid thread.
struct LiquidListener {
    tasks: Sender<LiquidTask>,
}

impl WorldListener for LiquidListener {
    fn on_block_changed(&self, event: &BlockChangedEvent) {
        let _ = self.tasks.send(LiquidTask::BlockChanged(*event));
    }

    fn on_chunk_ready(&self, pos: ChunkPos) {
        let _ = self.tasks.send(LiquidTask::ReviewChunk(pos));
    }
}

/// Handle to the background liquid thread.
pub struct LiquidSimulator {
    tasks: Sender<LiquidTask>,
    stop: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl LiquidSimulator {
    /// Register with `world` and start simulating.
    pub fn start(world: Arc<World>, config: LiquidConfig) -> Result<Self> {
        let (tasks, task_rx) = channel::unbounded();
        let (stop, stop_rx) = channel::bounded::<()>(0);
        world.add_listener(Arc::new(LiquidListener {
            tasks: tasks.clone(),
        }));

        let worker = LiquidWorker::new(world);
        let thread = thread::Builder::new()
            .name("liquid-simulator".to_string())
            .spawn(move || Self::run(worker, &task_rx, &stop_rx, config.propagation_delay))?;

        debug!(delay = ?config.propagation_delay, "Liquid simulator started");
        Ok(Self {
            tasks,
            stop: Some(stop),
            thread: Some(thread),
        })
    }

    fn run(mut worker: LiquidWorker, tasks: &Receiver<LiquidTask>, stop: &Receiver<()>, delay: Duration) {
        let mut next_step = Instant::now() + delay;
        loop {
            let now = Instant::now();
            if now >= next_step {
                let changed = worker.tick();
                if changed > 0 {
                    trace!(changed, pending = worker.pending(), "Liquid step");
                }
                next_step = now + delay;
                continue;
            }

            select! {
                recv(stop) -> _ => return,
                recv(tasks) -> task => match task {
                    Ok(task) => worker.handle(task),
                    Err(_) => return,
                },
                default(next_step - now) => {}
            }
        }
    }

    /// Ask for `pos` to be re-evaluated.
    pub fn simulate(&self, pos: WorldPos) {
        let _ = self.tasks.send(LiquidTask::Simulate(pos));
    }

    /// Stop the thread. Safe to call repeatedly.
    pub fn dispose(&mut self) {
        // Dropping the sender disconnects the stop channel.
        self.stop.take();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::error!("Liquid simulator thread panicked");
            }
            debug!("Liquid simulator stopped");
        }
    }
}

impl Drop for LiquidSimulator {
    fn drop(&mut self) {
        self.dispose();
    }
}
