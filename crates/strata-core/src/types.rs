//! Block identifiers and their static properties.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// Unique identifier for a block type.
///
/// Block ID 0 is reserved for air (empty space).
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable, Serialize, Deserialize,
)]
#[repr(transparent)]
pub struct BlockId(pub u16);

/// Static properties that drive light and liquid behavior.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockProperties {
    pub name: &'static str,
    /// Light emitted by the block, 0 for none.
    pub luminance: u8,
    /// Light passes through the block.
    pub translucent: bool,
    /// Liquid can flow into the block's cell.
    pub penetrable: bool,
    /// The block is a liquid body.
    pub liquid: bool,
}

impl BlockProperties {
    const fn opaque(name: &'static str) -> Self {
        Self {
            name,
            luminance: 0,
            translucent: false,
            penetrable: false,
            liquid: false,
        }
    }

    const fn open(name: &'static str, luminance: u8) -> Self {
        Self {
            name,
            luminance,
            translucent: true,
            penetrable: true,
            liquid: false,
        }
    }
}

const UNKNOWN: BlockProperties = BlockProperties::opaque("unknown");

const BLOCK_TABLE: [BlockProperties; 16] = [
    BlockProperties::open("air", 0),
    BlockProperties::opaque("stone"),
    BlockProperties::opaque("dirt"),
    BlockProperties::opaque("grass"),
    BlockProperties::opaque("snow"),
    BlockProperties::opaque("sand"),
    BlockProperties {
        liquid: true,
        ..BlockProperties::open("water", 0)
    },
    BlockProperties::opaque("log"),
    BlockProperties {
        penetrable: false,
        ..BlockProperties::open("leaves", 0)
    },
    BlockProperties::open("flower", 0),
    BlockProperties {
        liquid: true,
        ..BlockProperties::open("lava", 15)
    },
    BlockProperties {
        penetrable: false,
        ..BlockProperties::open("glass", 0)
    },
    BlockProperties::open("torch", 15),
    BlockProperties::open("candle", 5),
    BlockProperties::open("ember", 2),
    BlockProperties {
        luminance: 5,
        ..BlockProperties::opaque("magma")
    },
];

impl BlockId {
    /// Air block (empty space)
    pub const AIR: Self = Self(0);
    /// Stone block
    pub const STONE: Self = Self(1);
    /// Dirt block
    pub const DIRT: Self = Self(2);
    /// Grass block
    pub const GRASS: Self = Self(3);
    /// Snow block
    pub const SNOW: Self = Self(4);
    /// Sand block
    pub const SAND: Self = Self(5);
    /// Water block
    pub const WATER: Self = Self(6);
    /// Tree log block
    pub const LOG: Self = Self(7);
    /// Tree leaves block
    pub const LEAVES: Self = Self(8);
    /// Flower block
    pub const FLOWER: Self = Self(9);
    /// Lava, a glowing liquid
    pub const LAVA: Self = Self(10);
    /// Glass
    pub const GLASS: Self = Self(11);
    /// Torch, full-brightness light source
    pub const TORCH: Self = Self(12);
    /// Candle, dim light source
    pub const CANDLE: Self = Self(13);
    /// Ember, faint light source
    pub const EMBER: Self = Self(14);
    /// Magma, an opaque block that still glows
    pub const MAGMA: Self = Self(15);

    /// Look up the static properties of this block.
    ///
    /// Unregistered ids behave like an opaque, non-emitting solid.
    #[inline]
    pub const fn properties(self) -> &'static BlockProperties {
        let index = self.0 as usize;
        if index < BLOCK_TABLE.len() {
            &BLOCK_TABLE[index]
        } else {
            &UNKNOWN
        }
    }

    #[inline]
    pub const fn name(self) -> &'static str {
        self.properties().name
    }

    /// Returns true if this block is air (empty)
    #[inline]
    pub const fn is_air(self) -> bool {
        self.0 == 0
    }

    /// Returns true if liquid cannot enter this block's cell
    #[inline]
    pub const fn is_solid(self) -> bool {
        !self.properties().penetrable
    }

    #[inline]
    pub const fn luminance(self) -> u8 {
        self.properties().luminance
    }

    #[inline]
    pub const fn is_translucent(self) -> bool {
        self.properties().translucent
    }

    #[inline]
    pub const fn is_penetrable(self) -> bool {
        self.properties().penetrable
    }

    #[inline]
    pub const fn is_liquid(self) -> bool {
        self.properties().liquid
    }

    /// Look up a block by its registered name.
    pub fn from_name(name: &str) -> Option<Self> {
        BLOCK_TABLE
            .iter()
            .position(|props| props.name.eq_ignore_ascii_case(name))
            .map(|index| Self(index as u16))
    }
}
