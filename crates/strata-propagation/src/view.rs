use strata_core::{BlockId, WorldPos};

/// Read/write access to one scalar field plus the blocks that shape it.
///
/// Positions outside the view are unavailable and report `None`; writes to
/// them are ignored. Propagators never spread into unavailable cells.
pub trait PropagatorWorldView {
    /// Current field value at `pos`.
    fn value_at(&self, pos: WorldPos) -> Option<u8>;

    /// Overwrite the field value at `pos`.
    fn set_value_at(&mut self, pos: WorldPos, value: u8);

    /// Block occupying `pos`.
    fn block_at(&self, pos: WorldPos) -> Option<BlockId>;
}

impl<V: PropagatorWorldView + ?Sized> PropagatorWorldView for &mut V {
    fn value_at(&self, pos: WorldPos) -> Option<u8> {
        (**self).value_at(pos)
    }

    fn set_value_at(&mut self, pos: WorldPos, value: u8) {
        (**self).set_value_at(pos, value);
    }

    fn block_at(&self, pos: WorldPos) -> Option<BlockId> {
        (**self).block_at(pos)
    }
}
