use crate::view::PropagatorWorldView;
use strata_core::{BlockId, WorldPos};

/// Dense box of blocks and field values.
///
/// A self-contained [`PropagatorWorldView`] for exercising the propagators
/// away from chunk storage.
#[derive(Clone, Debug)]
pub struct BoundedGrid {
    min: WorldPos,
    max: WorldPos,
    blocks: Vec<BlockId>,
    values: Vec<u8>,
}

impl BoundedGrid {
    /// Grid covering `min..=max`, every cell holding `fill` with value 0.
    pub fn new(min: WorldPos, max: WorldPos, fill: BlockId) -> Self {
        assert!(
            min.x <= max.x && min.y <= max.y && min.z <= max.z,
            "grid bounds are inverted"
        );
        let volume = ((max.x - min.x + 1) * (max.y - min.y + 1) * (max.z - min.z + 1)) as usize;
        Self {
            min,
            max,
            blocks: vec![fill; volume],
            values: vec![0; volume],
        }
    }

    /// Cube of half-width `radius` around the origin.
    pub fn cube(radius: i64, fill: BlockId) -> Self {
        Self::new(
            WorldPos::new(-radius, -radius, -radius),
            WorldPos::new(radius, radius, radius),
            fill,
        )
    }

    fn index(&self, pos: WorldPos) -> Option<usize> {
        let inside = (self.min.x..=self.max.x).contains(&pos.x)
            && (self.min.y..=self.max.y).contains(&pos.y)
            && (self.min.z..=self.max.z).contains(&pos.z);
        if !inside {
            return None;
        }
        let sx = self.max.x - self.min.x + 1;
        let sy = self.max.y - self.min.y + 1;
        let (x, y, z) = (pos.x - self.min.x, pos.y - self.min.y, pos.z - self.min.z);
        Some((x + y * sx + z * sx * sy) as usize)
    }

    /// Place a block without touching the field.
    pub fn set_block(&mut self, pos: WorldPos, block: BlockId) {
        if let Some(index) = self.index(pos) {
            self.blocks[index] = block;
        }
    }

    /// Every position in the grid.
    pub fn positions(&self) -> impl Iterator<Item = WorldPos> + '_ {
        (self.min.z..=self.max.z).flat_map(move |z| {
            (self.min.y..=self.max.y)
                .flat_map(move |y| (self.min.x..=self.max.x).map(move |x| WorldPos::new(x, y, z)))
        })
    }

    /// Field values in storage order, for whole-field comparisons.
    pub fn values(&self) -> &[u8] {
        &self.values
    }
}

impl PropagatorWorldView for BoundedGrid {
    fn value_at(&self, pos: WorldPos) -> Option<u8> {
        self.index(pos).map(|i| self.values[i])
    }

    fn set_value_at(&mut self, pos: WorldPos, value: u8) {
        if let Some(index) = self.index(pos) {
            self.values[index] = value;
        }
    }

    fn block_at(&self, pos: WorldPos) -> Option<BlockId> {
        self.index(pos).map(|i| self.blocks[i])
    }
}
