//! Continuous single-cell propagation.
//!
//! Instead of draining bucketed queues in one go, the continuous propagator
//! re-evaluates one dirty position per step against its current neighbors and
//! dirties the six neighbors whenever the position's value changes. Any caller
//! can interleave steps with other work, or spread them out over time.

use crate::block_change::BlockChange;
use crate::rules::PropagationRules;
use crate::view::PropagatorWorldView;
use hashbrown::HashSet;
use std::collections::VecDeque;
use strata_core::{Side, WorldPos};

/// Re-evaluates one position of a field against its surroundings.
pub trait Relaxation<C: ?Sized> {
    /// Recompute the value stored at `pos`. Returns true if it changed.
    fn relax(&self, ctx: &mut C, pos: WorldPos) -> bool;
}

/// Rule-driven relaxation: a cell holds the best of its own fixed value and
/// what each neighbor can push into it.
#[derive(Clone, Copy, Debug, Default)]
pub struct RuleRelaxation<R>(pub R);

impl<R: PropagationRules> RuleRelaxation<R> {
    /// Value `pos` deserves given its block and its neighbors' current values.
    pub fn expected_value<V: PropagatorWorldView + ?Sized>(&self, view: &V, pos: WorldPos) -> Option<u8> {
        let rules = &self.0;
        let block = view.block_at(pos)?;
        let mut best = rules.fixed_value(block);
        for side in Side::ALL {
            if !rules.can_spread_into(block, side) {
                continue;
            }
            let neighbor = pos.adjacent(side);
            let travel = side.reverse();
            let (Some(n_block), Some(n_value)) = (view.block_at(neighbor), view.value_at(neighbor))
            else {
                continue;
            };
            if rules.can_spread_out_of(n_block, travel) {
                best = best.max(rules.propagate_value(n_value, travel, n_block));
            }
        }
        Some(best)
    }
}

impl<R, V> Relaxation<V> for RuleRelaxation<R>
where
    R: PropagationRules,
    V: PropagatorWorldView + ?Sized,
{
    fn relax(&self, view: &mut V, pos: WorldPos) -> bool {
        let (Some(expected), Some(current)) = (self.expected_value(view, pos), view.value_at(pos))
        else {
            return false;
        };
        if expected == current {
            return false;
        }
        view.set_value_at(pos, expected);
        true
    }
}

/// Queue of dirty positions drained one relaxation at a time.
pub struct ContinuousPropagator<X> {
    relaxation: X,
    queue: VecDeque<WorldPos>,
    queued: HashSet<WorldPos>,
}

impl<X> ContinuousPropagator<X> {
    pub fn new(relaxation: X) -> Self {
        Self {
            relaxation,
            queue: VecDeque::new(),
            queued: HashSet::new(),
        }
    }

    pub const fn relaxation(&self) -> &X {
        &self.relaxation
    }

    /// Mark `pos` dirty. Returns false if it was already waiting.
    pub fn enqueue(&mut self, pos: WorldPos) -> bool {
        if self.queued.insert(pos) {
            self.queue.push_back(pos);
            true
        } else {
            false
        }
    }

    /// Mark `pos` and its six neighbors dirty.
    pub fn enqueue_around(&mut self, pos: WorldPos) {
        self.enqueue(pos);
        for side in Side::ALL {
            self.enqueue(pos.adjacent(side));
        }
    }

    /// Dirty everything a block edit can affect directly.
    pub fn enqueue_change(&mut self, change: &BlockChange) {
        self.enqueue_around(change.position);
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn is_idle(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
        self.queued.clear();
    }

    /// Relax the oldest dirty position.
    ///
    /// Returns the position and whether its value changed, or `None` when
    /// nothing is dirty.
    pub fn step<C>(&mut self, ctx: &mut C) -> Option<(WorldPos, bool)>
    where
        C: ?Sized,
        X: Relaxation<C>,
    {
        let pos = self.queue.pop_front()?;
        self.queued.remove(&pos);
        let changed = self.relaxation.relax(ctx, pos);
        if changed {
            for side in Side::ALL {
                self.enqueue(pos.adjacent(side));
            }
        }
        Some((pos, changed))
    }

    /// Relax only the positions that are dirty right now.
    ///
    /// Positions dirtied during the round wait for the next one. Returns the
    /// number of values that changed.
    pub fn run_round<C>(&mut self, ctx: &mut C) -> usize
    where
        C: ?Sized,
        X: Relaxation<C>,
    {
        let dirty = self.queue.len();
        let mut changed = 0;
        for _ in 0..dirty {
            match self.step(ctx) {
                Some((_, true)) => changed += 1,
                Some((_, false)) => {}
                None => break,
            }
        }
        tracing::trace!(dirty, changed, pending = self.queue.len(), "relaxation round");
        changed
    }

    /// Step until nothing is dirty or `max_steps` have run. Returns the
    /// number of steps taken.
    pub fn run<C>(&mut self, ctx: &mut C, max_steps: usize) -> usize
    where
        C: ?Sized,
        X: Relaxation<C>,
    {
        let mut steps = 0;
        while steps < max_steps && self.step(ctx).is_some() {
            steps += 1;
        }
        steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::BatchPropagator;
    use crate::grid::BoundedGrid;
    use crate::rules::LightRules;
    use strata_core::BlockId;

    const ORIGIN: WorldPos = WorldPos::new(0, 0, 0);

    fn apply(
        grid: &mut BoundedGrid,
        continuous: &mut ContinuousPropagator<RuleRelaxation<LightRules>>,
        pos: WorldPos,
        to: BlockId,
    ) {
        let from = grid.block_at(pos).unwrap();
        grid.set_block(pos, to);
        continuous.enqueue_change(&BlockChange::new(pos, from, to));
        continuous.run(grid, usize::MAX);
        assert!(continuous.is_idle());
    }

    #[test]
    fn torch_in_open_air_matches_distance_field() {
        let mut grid = BoundedGrid::cube(15, BlockId::AIR);
        let mut continuous = ContinuousPropagator::new(RuleRelaxation(LightRules));
        apply(&mut grid, &mut continuous, ORIGIN, BlockId::TORCH);

        for pos in grid.positions() {
            let expected = (15 - ORIGIN.grid_distance(pos)).max(0) as u8;
            assert_eq!(grid.value_at(pos), Some(expected), "at {pos:?}");
        }
    }

    #[test]
    fn converges_to_batched_field() {
        let edits = [
            (ORIGIN, BlockId::TORCH),
            (WorldPos::new(3, 1, 0), BlockId::CANDLE),
            (WorldPos::new(1, 0, 0), BlockId::STONE),
            (WorldPos::new(1, 1, 0), BlockId::STONE),
            (WorldPos::new(0, 0, 1), BlockId::GLASS),
            (ORIGIN, BlockId::EMBER),
            (WorldPos::new(1, 0, 0), BlockId::AIR),
        ];

        let mut continuous_grid = BoundedGrid::cube(10, BlockId::AIR);
        let mut continuous = ContinuousPropagator::new(RuleRelaxation(LightRules));
        for &(pos, block) in &edits {
            apply(&mut continuous_grid, &mut continuous, pos, block);
        }

        let mut batch_grid = BoundedGrid::cube(10, BlockId::AIR);
        let mut batch = BatchPropagator::new(LightRules);
        let changes: Vec<_> = edits
            .iter()
            .map(|&(pos, to)| {
                let from = batch_grid.block_at(pos).unwrap();
                batch_grid.set_block(pos, to);
                BlockChange::new(pos, from, to)
            })
            .collect();
        // Net effect of the edit sequence, one change per touched position.
        let mut net: Vec<BlockChange> = Vec::new();
        for change in changes {
            if let Some(existing) = net.iter_mut().find(|c| c.position == change.position) {
                existing.to = change.to;
            } else {
                net.push(change);
            }
        }
        batch.process(&mut batch_grid, net);

        assert_eq!(continuous_grid.values(), batch_grid.values());
    }

    #[test]
    fn removal_counts_down_to_zero() {
        let mut grid = BoundedGrid::cube(8, BlockId::AIR);
        let mut continuous = ContinuousPropagator::new(RuleRelaxation(LightRules));
        apply(&mut grid, &mut continuous, ORIGIN, BlockId::CANDLE);
        assert_eq!(grid.value_at(WorldPos::new(0, 2, 0)), Some(3));
        apply(&mut grid, &mut continuous, ORIGIN, BlockId::AIR);
        assert!(grid.values().iter().all(|&v| v == 0));
    }

    #[test]
    fn rounds_defer_newly_dirtied_positions() {
        let mut grid = BoundedGrid::cube(4, BlockId::AIR);
        let mut continuous = ContinuousPropagator::new(RuleRelaxation(LightRules));
        grid.set_block(ORIGIN, BlockId::CANDLE);
        continuous.enqueue(ORIGIN);

        assert_eq!(continuous.run_round(&mut grid), 1);
        assert_eq!(grid.value_at(ORIGIN), Some(5));
        assert_eq!(grid.value_at(WorldPos::new(1, 0, 0)), Some(0));
        assert_eq!(continuous.pending(), 6);

        assert_eq!(continuous.run_round(&mut grid), 6);
        assert_eq!(grid.value_at(WorldPos::new(1, 0, 0)), Some(4));
    }

    #[test]
    fn enqueue_deduplicates() {
        let mut continuous = ContinuousPropagator::new(RuleRelaxation(LightRules));
        assert!(continuous.enqueue(ORIGIN));
        assert!(!continuous.enqueue(ORIGIN));
        continuous.enqueue_around(ORIGIN);
        assert_eq!(continuous.pending(), 7);
        continuous.clear();
        assert!(continuous.is_idle());
    }
}
