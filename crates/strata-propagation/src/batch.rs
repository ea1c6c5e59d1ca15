//! Batched propagation over value-bucketed queues.
//!
//! Both queue arrays are indexed by `max_value - value`, so bucket 0 holds the
//! strongest values. Draining buckets in index order processes positions in
//! strictly decreasing value order with one pass per possible value, which
//! bounds the work by the affected volume times `max_value`.

use crate::block_change::BlockChange;
use crate::rules::PropagationRules;
use crate::view::PropagatorWorldView;
use hashbrown::HashSet;
use strata_core::{Side, WorldPos};

/// Recomputes a scalar field after a batch of block changes.
///
/// The propagator carries no state between calls to [`process`](Self::process)
/// or [`flush`](Self::flush): every queue is empty when they return.
pub struct BatchPropagator<R> {
    rules: R,
    increase_queues: Vec<HashSet<WorldPos>>,
    reduce_queues: Vec<HashSet<WorldPos>>,
}

impl<R: PropagationRules> BatchPropagator<R> {
    pub fn new(rules: R) -> Self {
        let buckets = usize::from(rules.max_value());
        Self {
            rules,
            increase_queues: (0..buckets).map(|_| HashSet::new()).collect(),
            reduce_queues: (0..buckets).map(|_| HashSet::new()).collect(),
        }
    }

    pub const fn rules(&self) -> &R {
        &self.rules
    }

    /// Apply `changes` (whose blocks are already written to `view`) to the field.
    pub fn process<V, I>(&mut self, view: &mut V, changes: I)
    where
        V: PropagatorWorldView + ?Sized,
        I: IntoIterator<Item = BlockChange>,
    {
        let mut count = 0usize;
        for change in changes {
            self.review_change(view, &change);
            count += 1;
        }
        self.flush(view);
        tracing::trace!(changes = count, "processed block changes");
    }

    /// Seed an increase from an already-present value.
    ///
    /// Values of 1 or less have nothing left to give and are ignored.
    pub fn propagate_from(&mut self, pos: WorldPos, value: u8) {
        self.queue_spread_value(pos, value);
    }

    /// Seed a reduction of `pos`, which currently holds `value`.
    pub fn regenerate(&mut self, pos: WorldPos, value: u8) {
        self.reduce(pos, value);
    }

    /// Run the reduction and increase passes over everything seeded so far.
    pub fn flush<V: PropagatorWorldView + ?Sized>(&mut self, view: &mut V) {
        self.process_reduction(view);
        self.process_increase(view);
        self.clean_up();
    }

    fn bucket(&self, value: u8) -> usize {
        usize::from(self.rules.max_value() - value)
    }

    fn review_change<V: PropagatorWorldView + ?Sized>(&mut self, view: &mut V, change: &BlockChange) {
        let pos = change.position;
        let Some(existing) = view.value_at(pos) else {
            return;
        };

        let new_value = self.rules.fixed_value(change.to);
        if new_value > existing {
            self.increase(view, pos, new_value);
        }

        let old_value = self.rules.fixed_value(change.from);
        if new_value < old_value {
            self.reduce(pos, old_value);
        }

        for side in Side::ALL {
            let comparison = self.rules.compare_propagation(change.to, change.from, side);
            let adj_pos = pos.adjacent(side);

            if comparison.is_restricting() && existing > 0 {
                self.reduce(pos, existing);
                let expected = self.rules.propagate_value(existing, side, change.from);
                if let Some(adj_value) = view.value_at(adj_pos) {
                    if adj_value == expected {
                        self.reduce(adj_pos, adj_value);
                    }
                }
            } else if comparison.is_permitting() {
                if existing > 0 {
                    self.queue_spread_value(pos, existing);
                }
                if let Some(adj_value) = view.value_at(adj_pos) {
                    self.queue_spread_value(adj_pos, adj_value);
                }
            }
        }
    }

    /// Reset a position to its fixed value and cascade to the neighbors that
    /// depended on it.
    fn purge<V: PropagatorWorldView + ?Sized>(&mut self, view: &mut V, pos: WorldPos, old_value: u8) {
        let bucket = self.bucket(old_value);
        self.increase_queues[bucket].remove(&pos);

        let Some(block) = view.block_at(pos) else {
            return;
        };
        let fixed = self.rules.fixed_value(block);
        if fixed > 0 {
            self.increase(view, pos, fixed);
        } else {
            view.set_value_at(pos, 0);
        }

        for side in Side::ALL {
            if !self.rules.can_spread_out_of(block, side) {
                continue;
            }
            let expected = self.rules.propagate_value(old_value, side, block);
            let adj_pos = pos.adjacent(side);
            let Some(adj_value) = view.value_at(adj_pos) else {
                continue;
            };
            if adj_value == expected {
                let enterable = view
                    .block_at(adj_pos)
                    .is_some_and(|adj_block| self.rules.can_spread_into(adj_block, side.reverse()));
                if enterable {
                    self.reduce(adj_pos, expected);
                }
            } else if adj_value > 0 {
                self.queue_spread_value(adj_pos, adj_value);
            }
        }
    }

    fn process_reduction<V: PropagatorWorldView + ?Sized>(&mut self, view: &mut V) {
        let max = self.rules.max_value();
        for depth in 0..usize::from(max) {
            let old_value = max - depth as u8;
            while !self.reduce_queues[depth].is_empty() {
                let to_process = std::mem::take(&mut self.reduce_queues[depth]);
                for pos in to_process {
                    self.purge(view, pos, old_value);
                }
            }
        }
    }

    fn process_increase<V: PropagatorWorldView + ?Sized>(&mut self, view: &mut V) {
        let max = self.rules.max_value();
        // Bucket `max - 1` holds value 1, which has nothing to spread.
        for depth in 0..usize::from(max).saturating_sub(1) {
            let value = max - depth as u8;
            while !self.increase_queues[depth].is_empty() {
                let to_process = std::mem::take(&mut self.increase_queues[depth]);
                for pos in to_process {
                    self.push(view, pos, value);
                }
            }
        }
    }

    /// Spread `value` from `pos` into every neighbor it would brighten.
    fn push<V: PropagatorWorldView + ?Sized>(&mut self, view: &mut V, pos: WorldPos, value: u8) {
        let Some(block) = view.block_at(pos) else {
            return;
        };
        for side in Side::ALL {
            if !self.rules.can_spread_out_of(block, side) {
                continue;
            }
            let propagated = self.rules.propagate_value(value, side, block);
            let adj_pos = pos.adjacent(side);
            let Some(adj_value) = view.value_at(adj_pos) else {
                continue;
            };
            if adj_value >= propagated {
                continue;
            }
            let enterable = view
                .block_at(adj_pos)
                .is_some_and(|adj_block| self.rules.can_spread_into(adj_block, side.reverse()));
            if enterable {
                self.increase(view, adj_pos, propagated);
            }
        }
    }

    fn increase<V: PropagatorWorldView + ?Sized>(&mut self, view: &mut V, pos: WorldPos, value: u8) {
        view.set_value_at(pos, value);
        self.queue_spread_value(pos, value);
    }

    fn reduce(&mut self, pos: WorldPos, old_value: u8) {
        if old_value > 0 {
            let bucket = self.bucket(old_value);
            self.reduce_queues[bucket].insert(pos);
        }
    }

    fn queue_spread_value(&mut self, pos: WorldPos, value: u8) {
        if value > 1 {
            let bucket = self.bucket(value);
            self.increase_queues[bucket].insert(pos);
        }
    }

    fn clean_up(&mut self) {
        for queue in self.increase_queues.iter_mut().chain(self.reduce_queues.iter_mut()) {
            queue.clear();
        }
    }
}
