//! Axis-aligned boxes of chunk positions.

use crate::coords::ChunkPos;
use glam::IVec3;

/// An inclusive box of chunk positions.
///
/// Iteration visits positions in ascending [`ChunkPos`] order, i.e. x-major,
/// then y, then z.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Region3 {
    pub min: ChunkPos,
    pub max: ChunkPos,
}

impl Region3 {
    /// Box spanning `center - extents ..= center + extents`.
    pub fn around(center: ChunkPos, extents: IVec3) -> Self {
        debug_assert!(extents.cmpge(IVec3::ZERO).all());
        Self {
            min: center.offset(-extents),
            max: center.offset(extents),
        }
    }

    /// Number of chunks along each axis.
    pub fn size(&self) -> IVec3 {
        self.max.to_ivec3() - self.min.to_ivec3() + IVec3::ONE
    }

    /// Total number of chunk positions in the box.
    pub fn volume(&self) -> usize {
        let size = self.size();
        (size.x * size.y * size.z) as usize
    }

    /// Returns true if `pos` lies within the box.
    pub fn contains(&self, pos: ChunkPos) -> bool {
        pos.x >= self.min.x
            && pos.x <= self.max.x
            && pos.y >= self.min.y
            && pos.y <= self.max.y
            && pos.z >= self.min.z
            && pos.z <= self.max.z
    }

    /// Index of `pos` within the box in iteration order.
    pub fn index_of(&self, pos: ChunkPos) -> Option<usize> {
        if !self.contains(pos) {
            return None;
        }
        let size = self.size();
        let rel = pos.to_ivec3() - self.min.to_ivec3();
        Some(((rel.x * size.y + rel.y) * size.z + rel.z) as usize)
    }

    /// Iterate all positions in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = ChunkPos> {
        let (min, max) = (self.min, self.max);
        (min.x..=max.x).flat_map(move |x| {
            (min.y..=max.y).flat_map(move |y| (min.z..=max.z).map(move |z| ChunkPos::new(x, y, z)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iteration_is_sorted_and_indexed() {
        let region = Region3::around(ChunkPos::new(2, -1, 0), IVec3::new(1, 1, 2));
        let positions: Vec<_> = region.iter().collect();
        assert_eq!(positions.len(), region.volume());
        assert_eq!(region.volume(), 3 * 3 * 5);

        let mut sorted = positions.clone();
        sorted.sort();
        assert_eq!(positions, sorted);

        for (i, pos) in positions.iter().enumerate() {
            assert_eq!(region.index_of(*pos), Some(i));
        }
    }

    #[test]
    fn contains_is_inclusive() {
        let region = Region3::around(ChunkPos::new(0, 0, 0), IVec3::new(1, 0, 1));
        assert!(region.contains(ChunkPos::new(1, 0, -1)));
        assert!(!region.contains(ChunkPos::new(0, 1, 0)));
        assert_eq!(region.index_of(ChunkPos::new(2, 0, 0)), None);
    }
}
