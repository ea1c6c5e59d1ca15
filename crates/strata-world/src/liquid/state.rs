use strata_core::constants::MAX_LIQUID_DEPTH;
use strata_core::BlockId;

/// Which liquid occupies a cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LiquidKind {
    #[default]
    None,
    Water,
    Lava,
}

impl LiquidKind {
    /// Liquid body represented by `block`, if any.
    pub const fn from_block(block: BlockId) -> Self {
        match block {
            BlockId::WATER => Self::Water,
            BlockId::LAVA => Self::Lava,
            _ => Self::None,
        }
    }

    /// Block placed in a cell holding this liquid.
    pub const fn block(self) -> BlockId {
        match self {
            Self::None => BlockId::AIR,
            Self::Water => BlockId::WATER,
            Self::Lava => BlockId::LAVA,
        }
    }
}

/// Liquid held by one voxel.
///
/// A depth of [`MAX_LIQUID_DEPTH`] marks a source; a depth of 0 means no
/// liquid, and the kind is then always [`LiquidKind::None`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct LiquidState {
    kind: LiquidKind,
    depth: u8,
}

impl LiquidState {
    pub const NONE: Self = Self {
        kind: LiquidKind::None,
        depth: 0,
    };

    /// Build a state, clamping the depth and normalising empty cells.
    pub const fn new(kind: LiquidKind, depth: u8) -> Self {
        let depth = if depth > MAX_LIQUID_DEPTH {
            MAX_LIQUID_DEPTH
        } else {
            depth
        };
        if depth == 0 || matches!(kind, LiquidKind::None) {
            Self::NONE
        } else {
            Self { kind, depth }
        }
    }

    pub const fn source(kind: LiquidKind) -> Self {
        Self::new(kind, MAX_LIQUID_DEPTH)
    }

    #[inline]
    pub const fn kind(self) -> LiquidKind {
        self.kind
    }

    #[inline]
    pub const fn depth(self) -> u8 {
        self.depth
    }

    #[inline]
    pub const fn is_source(self) -> bool {
        self.depth == MAX_LIQUID_DEPTH
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.depth == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_states_are_normalised() {
        assert_eq!(LiquidState::new(LiquidKind::Water, 0), LiquidState::NONE);
        assert_eq!(LiquidState::new(LiquidKind::None, 5), LiquidState::NONE);
        assert_eq!(LiquidState::NONE.kind(), LiquidKind::None);
    }

    #[test]
    fn depth_is_clamped() {
        let state = LiquidState::new(LiquidKind::Lava, 200);
        assert_eq!(state.depth(), MAX_LIQUID_DEPTH);
        assert!(state.is_source());
    }

    #[test]
    fn kinds_map_to_blocks() {
        assert_eq!(LiquidKind::from_block(BlockId::WATER), LiquidKind::Water);
        assert_eq!(LiquidKind::Lava.block(), BlockId::LAVA);
        assert_eq!(LiquidKind::from_block(BlockId::STONE), LiquidKind::None);
    }
}
