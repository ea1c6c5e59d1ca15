//! Coordinate systems for the voxel world.

use crate::constants::{CHUNK_BITS, CHUNK_SIZE};
use crate::side::Side;
use bytemuck::{Pod, Zeroable};
use glam::IVec3;
use serde::{Deserialize, Serialize};

/// Position within a chunk (0 to CHUNK_SIZE-1 per axis).
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable, Serialize, Deserialize,
)]
#[repr(C)]
pub struct LocalPos {
    pub x: u8,
    pub y: u8,
    pub z: u8,
    pub _pad: u8,
}

impl LocalPos {
    /// Create a new local position
    #[inline]
    pub const fn new(x: u8, y: u8, z: u8) -> Self {
        debug_assert!((x as usize) < CHUNK_SIZE);
        debug_assert!((y as usize) < CHUNK_SIZE);
        debug_assert!((z as usize) < CHUNK_SIZE);
        Self { x, y, z, _pad: 0 }
    }

    /// Convert to linear index for flat array storage
    #[inline]
    pub const fn to_index(self) -> usize {
        self.x as usize
            + (self.y as usize) * CHUNK_SIZE
            + (self.z as usize) * CHUNK_SIZE * CHUNK_SIZE
    }

    /// Create from linear index
    #[inline]
    pub const fn from_index(index: usize) -> Self {
        let x = (index % CHUNK_SIZE) as u8;
        let y = ((index / CHUNK_SIZE) % CHUNK_SIZE) as u8;
        let z = (index / (CHUNK_SIZE * CHUNK_SIZE)) as u8;
        Self { x, y, z, _pad: 0 }
    }

    /// Returns true if this position touches the face of the chunk on `side`.
    #[inline]
    pub const fn is_on_face(self, side: Side) -> bool {
        let max = (CHUNK_SIZE - 1) as u8;
        match side {
            Side::Left => self.x == 0,
            Side::Right => self.x == max,
            Side::Bottom => self.y == 0,
            Side::Top => self.y == max,
            Side::Back => self.z == 0,
            Side::Front => self.z == max,
        }
    }

    /// Iterate over every local position of a chunk in index order.
    pub fn iter_all() -> impl Iterator<Item = LocalPos> {
        (0..crate::constants::CHUNK_SIZE_CUBED).map(Self::from_index)
    }
}

/// Chunk position in chunk coordinates.
///
/// The derived ordering (x, then y, then z) is the canonical order in which
/// multi-chunk views acquire chunk locks.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Pod,
    Zeroable,
    Serialize,
    Deserialize,
)]
#[repr(C)]
pub struct ChunkPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub _pad: i32,
}

impl ChunkPos {
    /// Create a new chunk position
    #[inline]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z, _pad: 0 }
    }

    /// Convert to world position (corner of chunk)
    #[inline]
    pub const fn to_world_pos(self) -> WorldPos {
        WorldPos::new(
            (self.x as i64) << CHUNK_BITS,
            (self.y as i64) << CHUNK_BITS,
            (self.z as i64) << CHUNK_BITS,
        )
    }

    /// Get the six neighboring chunk positions
    pub fn neighbors(self) -> [ChunkPos; 6] {
        Side::ALL.map(|side| self.offset(side.direction()))
    }

    /// Offset this position by a delta in chunk units.
    #[inline]
    pub const fn offset(self, delta: IVec3) -> Self {
        Self::new(self.x + delta.x, self.y + delta.y, self.z + delta.z)
    }

    /// Manhattan distance between two chunk positions.
    #[inline]
    pub const fn grid_distance(self, other: ChunkPos) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs() + (self.z - other.z).abs()
    }

    /// Convert to glam IVec3
    #[inline]
    pub const fn to_ivec3(self) -> IVec3 {
        IVec3::new(self.x, self.y, self.z)
    }
}

impl From<IVec3> for ChunkPos {
    fn from(v: IVec3) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

/// World position in voxel coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorldPos {
    pub x: i64,
    pub y: i64,
    pub z: i64,
}

impl WorldPos {
    /// Create a new world position
    #[inline]
    pub const fn new(x: i64, y: i64, z: i64) -> Self {
        Self { x, y, z }
    }

    /// Get the chunk containing this position
    #[inline]
    pub const fn chunk_pos(self) -> ChunkPos {
        ChunkPos::new(
            (self.x >> CHUNK_BITS) as i32,
            (self.y >> CHUNK_BITS) as i32,
            (self.z >> CHUNK_BITS) as i32,
        )
    }

    /// Get the local position within the chunk
    #[inline]
    pub const fn local_pos(self) -> LocalPos {
        let mask = (CHUNK_SIZE - 1) as i64;
        LocalPos::new(
            (self.x & mask) as u8,
            (self.y & mask) as u8,
            (self.z & mask) as u8,
        )
    }

    /// Split into chunk and local position
    #[inline]
    pub const fn split(self) -> (ChunkPos, LocalPos) {
        (self.chunk_pos(), self.local_pos())
    }

    /// Create from chunk and local position
    #[inline]
    pub const fn from_chunk_local(chunk: ChunkPos, local: LocalPos) -> Self {
        Self::new(
            ((chunk.x as i64) << CHUNK_BITS) + local.x as i64,
            ((chunk.y as i64) << CHUNK_BITS) + local.y as i64,
            ((chunk.z as i64) << CHUNK_BITS) + local.z as i64,
        )
    }

    /// The position adjacent to this one across `side`.
    #[inline]
    pub const fn adjacent(self, side: Side) -> Self {
        let d = side.direction();
        Self::new(self.x + d.x as i64, self.y + d.y as i64, self.z + d.z as i64)
    }

    /// Offset by whole voxels.
    #[inline]
    pub const fn offset(self, dx: i64, dy: i64, dz: i64) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    /// The position directly below.
    #[inline]
    pub const fn below(self) -> Self {
        self.adjacent(Side::Bottom)
    }

    /// The position directly above.
    #[inline]
    pub const fn above(self) -> Self {
        self.adjacent(Side::Top)
    }

    /// Manhattan distance between two world positions.
    #[inline]
    pub const fn grid_distance(self, other: WorldPos) -> i64 {
        (self.x - other.x).abs() + (self.y - other.y).abs() + (self.z - other.z).abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_pos_index_roundtrip() {
        for (index, pos) in LocalPos::iter_all().enumerate() {
            assert_eq!(pos.to_index(), index);
        }
    }

    #[test]
    fn world_pos_chunk_local_roundtrip() {
        let world = WorldPos::new(100, -50, 200);
        let (chunk, local) = world.split();
        let recovered = WorldPos::from_chunk_local(chunk, local);
        assert_eq!(world, recovered);
    }

    #[test]
    fn negative_world_pos_chunk() {
        let world = WorldPos::new(-1, -1, -1);
        let chunk = world.chunk_pos();
        assert_eq!(chunk, ChunkPos::new(-1, -1, -1));
        assert_eq!(world.local_pos(), LocalPos::new(15, 15, 15));
    }

    #[test]
    fn chunk_pos_orders_x_then_y_then_z() {
        let mut positions = vec![
            ChunkPos::new(1, 0, 0),
            ChunkPos::new(0, 1, 0),
            ChunkPos::new(0, 0, 1),
            ChunkPos::new(-1, 5, 5),
        ];
        positions.sort();
        assert_eq!(
            positions,
            vec![
                ChunkPos::new(-1, 5, 5),
                ChunkPos::new(0, 0, 1),
                ChunkPos::new(0, 1, 0),
                ChunkPos::new(1, 0, 0),
            ]
        );
    }

    #[test]
    fn face_detection() {
        assert!(LocalPos::new(0, 3, 3).is_on_face(Side::Left));
        assert!(LocalPos::new(15, 3, 3).is_on_face(Side::Right));
        assert!(!LocalPos::new(7, 7, 7).is_on_face(Side::Top));
    }

    #[test]
    fn adjacent_crosses_chunk_boundary() {
        let edge = WorldPos::new(15, 0, 0);
        let next = edge.adjacent(Side::Right);
        assert_eq!(next, WorldPos::new(16, 0, 0));
        assert_eq!(next.chunk_pos(), ChunkPos::new(1, 0, 0));
    }
}
