//! Propagation rule sets.

use strata_core::constants::{MAX_LIGHT, MAX_LIQUID_DEPTH};
use strata_core::{BlockId, Side};

/// How replacing one block with another changes propagation across a face.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PropagationComparison {
    /// The new block lets less through this face than the old one.
    MoreRestricted,
    /// The new block lets more through this face than the old one.
    MorePermissive,
    /// No change for this face.
    Identical,
}

impl PropagationComparison {
    #[inline]
    pub const fn is_restricting(self) -> bool {
        matches!(self, Self::MoreRestricted)
    }

    #[inline]
    pub const fn is_permitting(self) -> bool {
        matches!(self, Self::MorePermissive)
    }
}

/// Stateless strategy describing one propagated field.
///
/// Implementations must be pure: the same inputs always give the same
/// answer, so one instance can be shared across threads and engines.
pub trait PropagationRules: Send + Sync {
    /// Largest value the field can hold. Also the number of queue buckets.
    fn max_value(&self) -> u8;

    /// Value a block contributes by itself, regardless of its surroundings.
    fn fixed_value(&self, block: BlockId) -> u8;

    /// Value after crossing `side` out of a cell of `from` holding `value`.
    fn propagate_value(&self, value: u8, side: Side, from: BlockId) -> u8;

    /// Whether the field may leave a cell of `block` through `side`.
    fn can_spread_out_of(&self, block: BlockId, side: Side) -> bool;

    /// Whether the field may enter a cell of `block` through `side`.
    fn can_spread_into(&self, block: BlockId, side: Side) -> bool;

    /// Compare propagation through `side` after `old` is replaced by `new`.
    fn compare_propagation(
        &self,
        new: BlockId,
        old: BlockId,
        side: Side,
    ) -> PropagationComparison {
        let open = |block| self.can_spread_out_of(block, side) && self.can_spread_into(block, side);
        match (open(new), open(old)) {
            (false, true) => PropagationComparison::MoreRestricted,
            (true, false) => PropagationComparison::MorePermissive,
            _ => PropagationComparison::Identical,
        }
    }
}

/// Block light: emitted by luminous blocks, carried by translucent ones.
#[derive(Clone, Copy, Debug, Default)]
pub struct LightRules;

impl PropagationRules for LightRules {
    fn max_value(&self) -> u8 {
        MAX_LIGHT
    }

    fn fixed_value(&self, block: BlockId) -> u8 {
        block.luminance()
    }

    fn propagate_value(&self, value: u8, _side: Side, _from: BlockId) -> u8 {
        value.saturating_sub(1)
    }

    fn can_spread_out_of(&self, block: BlockId, _side: Side) -> bool {
        block.is_translucent() || block.luminance() > 0
    }

    fn can_spread_into(&self, block: BlockId, _side: Side) -> bool {
        block.is_translucent()
    }
}

/// Sunlight: enters from the sky and carries through translucent blocks.
///
/// Full sunlight travels straight down without loss; every other step loses
/// one. No block emits sunlight, so sky cells are seeded by the caller.
#[derive(Clone, Copy, Debug, Default)]
pub struct SunlightRules;

impl PropagationRules for SunlightRules {
    fn max_value(&self) -> u8 {
        MAX_LIGHT
    }

    fn fixed_value(&self, _block: BlockId) -> u8 {
        0
    }

    fn propagate_value(&self, value: u8, side: Side, _from: BlockId) -> u8 {
        if side == Side::Bottom && value == MAX_LIGHT {
            MAX_LIGHT
        } else {
            value.saturating_sub(1)
        }
    }

    fn can_spread_out_of(&self, block: BlockId, _side: Side) -> bool {
        block.is_translucent()
    }

    fn can_spread_into(&self, block: BlockId, _side: Side) -> bool {
        block.is_translucent()
    }
}

/// Liquid depth: liquid blocks are sources, penetrable blocks admit liquid.
///
/// Liquid never rises, so nothing spreads upward.
#[derive(Clone, Copy, Debug, Default)]
pub struct LiquidRules;

impl PropagationRules for LiquidRules {
    fn max_value(&self) -> u8 {
        MAX_LIQUID_DEPTH
    }

    fn fixed_value(&self, block: BlockId) -> u8 {
        if block.is_liquid() {
            MAX_LIQUID_DEPTH
        } else {
            0
        }
    }

    fn propagate_value(&self, value: u8, side: Side, _from: BlockId) -> u8 {
        if side == Side::Top {
            0
        } else {
            value.saturating_sub(1)
        }
    }

    fn can_spread_out_of(&self, block: BlockId, side: Side) -> bool {
        side != Side::Top && block.is_penetrable()
    }

    fn can_spread_into(&self, block: BlockId, _side: Side) -> bool {
        block.is_penetrable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn light_attenuates_by_one() {
        let rules = LightRules;
        assert_eq!(rules.propagate_value(15, Side::Left, BlockId::AIR), 14);
        assert_eq!(rules.propagate_value(0, Side::Left, BlockId::AIR), 0);
    }

    #[test]
    fn opaque_emitters_can_emit() {
        let rules = LightRules;
        assert!(rules.can_spread_out_of(BlockId::MAGMA, Side::Top));
        assert!(!rules.can_spread_into(BlockId::MAGMA, Side::Top));
        assert!(!rules.can_spread_out_of(BlockId::STONE, Side::Top));
    }

    #[test]
    fn placing_stone_restricts_light() {
        let rules = LightRules;
        for side in Side::ALL {
            assert_eq!(
                rules.compare_propagation(BlockId::STONE, BlockId::AIR, side),
                PropagationComparison::MoreRestricted
            );
            assert_eq!(
                rules.compare_propagation(BlockId::AIR, BlockId::STONE, side),
                PropagationComparison::MorePermissive
            );
            assert_eq!(
                rules.compare_propagation(BlockId::TORCH, BlockId::AIR, side),
                PropagationComparison::Identical
            );
        }
    }

    #[test]
    fn full_sunlight_falls_without_loss() {
        let rules = SunlightRules;
        assert_eq!(rules.propagate_value(15, Side::Bottom, BlockId::AIR), 15);
        assert_eq!(rules.propagate_value(14, Side::Bottom, BlockId::AIR), 13);
        assert_eq!(rules.propagate_value(15, Side::Left, BlockId::AIR), 14);
        assert_eq!(rules.propagate_value(15, Side::Top, BlockId::AIR), 14);
        assert_eq!(rules.fixed_value(BlockId::TORCH), 0);
        assert!(!rules.can_spread_out_of(BlockId::MAGMA, Side::Bottom));
        assert!(rules.can_spread_into(BlockId::GLASS, Side::Top));
    }

    #[test]
    fn liquid_never_rises() {
        let rules = LiquidRules;
        assert!(!rules.can_spread_out_of(BlockId::WATER, Side::Top));
        assert_eq!(rules.propagate_value(7, Side::Top, BlockId::WATER), 0);
        assert_eq!(rules.propagate_value(7, Side::Bottom, BlockId::WATER), 6);
        assert_eq!(rules.fixed_value(BlockId::LAVA), MAX_LIQUID_DEPTH);
        assert!(!rules.can_spread_into(BlockId::GLASS, Side::Left));
    }
}
