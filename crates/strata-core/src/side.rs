//! The six faces of a voxel.

use glam::IVec3;
use serde::{Deserialize, Serialize};

/// A face of a block, named by the axis direction it points in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// -X
    Left,
    /// +X
    Right,
    /// -Y
    Bottom,
    /// +Y
    Top,
    /// -Z
    Back,
    /// +Z
    Front,
}

impl Side {
    /// All six sides.
    pub const ALL: [Side; 6] = [
        Side::Left,
        Side::Right,
        Side::Bottom,
        Side::Top,
        Side::Back,
        Side::Front,
    ];

    /// The four sides perpendicular to the Y axis.
    pub const HORIZONTAL: [Side; 4] = [Side::Left, Side::Right, Side::Back, Side::Front];

    /// Unit vector pointing out of this face.
    #[inline]
    pub const fn direction(self) -> IVec3 {
        match self {
            Side::Left => IVec3::new(-1, 0, 0),
            Side::Right => IVec3::new(1, 0, 0),
            Side::Bottom => IVec3::new(0, -1, 0),
            Side::Top => IVec3::new(0, 1, 0),
            Side::Back => IVec3::new(0, 0, -1),
            Side::Front => IVec3::new(0, 0, 1),
        }
    }

    /// The opposite face.
    #[inline]
    pub const fn reverse(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
            Side::Bottom => Side::Top,
            Side::Top => Side::Bottom,
            Side::Back => Side::Front,
            Side::Front => Side::Back,
        }
    }

    #[inline]
    pub const fn is_horizontal(self) -> bool {
        !matches!(self, Side::Bottom | Side::Top)
    }
}
