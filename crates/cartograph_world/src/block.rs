//! # Block Registry
//!
//! Immutable table mapping namespaced block names to compact ids, map colors
//! and a few flags the surface scan needs.
//!
//! Colors are `0xAARRGGBB`. A color of `0` is transparent: the surface scan
//! walks straight through such blocks.

use std::collections::HashMap;
use std::sync::OnceLock;

/// Compact block id, an index into a [`BlockRegistry`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId(pub u16);

impl BlockId {
    /// `minecraft:air`.
    pub const AIR: Self = Self(0);
    /// Any block name the registry does not know.
    pub const UNKNOWN: Self = Self(1);
}

/// One palette entry: a block plus the state properties the scan cares about.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct BlockState {
    /// Block id.
    pub id: BlockId,
    /// The block also contains water.
    pub waterlogged: bool,
}

impl BlockState {
    /// Air, the state of every position without a decoded section.
    pub const AIR: Self = Self::new(BlockId::AIR);

    /// Creates a plain state.
    #[inline]
    #[must_use]
    pub const fn new(id: BlockId) -> Self {
        Self { id, waterlogged: false }
    }

    /// Returns true if this is an air block.
    #[inline]
    #[must_use]
    pub const fn is_air(self) -> bool {
        self.id.0 == BlockId::AIR.0
    }
}

/// Block never occupies space.
pub const FLAG_AIR: u8 = 1 << 0;
/// Block is a liquid.
pub const FLAG_FLUID: u8 = 1 << 1;
/// Color is multiplied by the biome grass color.
pub const FLAG_GRASS_TINT: u8 = 1 << 2;
/// Color is multiplied by the biome foliage color.
pub const FLAG_FOLIAGE_TINT: u8 = 1 << 3;
/// Color is multiplied by the biome water color.
pub const FLAG_WATER_TINT: u8 = 1 << 4;

/// Static properties of one block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockInfo {
    /// Namespaced name, e.g. `minecraft:stone`.
    pub name: String,
    /// Map color, `0` when transparent.
    pub color: u32,
    /// `FLAG_*` bits.
    pub flags: u8,
}

impl BlockInfo {
    /// Returns true if the block is air.
    #[inline]
    #[must_use]
    pub const fn is_air(&self) -> bool {
        self.flags & FLAG_AIR != 0
    }

    /// Returns true if the block is a liquid.
    #[inline]
    #[must_use]
    pub const fn is_fluid(&self) -> bool {
        self.flags & FLAG_FLUID != 0
    }

    /// Returns true if the block is visible on a map.
    #[inline]
    #[must_use]
    pub const fn is_opaque(&self) -> bool {
        self.color > 0
    }
}

const BUILTIN: &[(&str, u32, u8)] = &[
    ("air", 0, FLAG_AIR),
    ("unknown", 0, 0),
    ("cave_air", 0, FLAG_AIR),
    ("void_air", 0, FLAG_AIR),
    ("water", 0xFF3F_76E4, FLAG_FLUID | FLAG_WATER_TINT),
    ("bubble_column", 0xFF3F_76E4, FLAG_FLUID | FLAG_WATER_TINT),
    ("lava", 0xFFD4_5A12, FLAG_FLUID),
    ("stone", 0xFF7D_7D7D, 0),
    ("granite", 0xFF95_6755, 0),
    ("diorite", 0xFFBC_BCBC, 0),
    ("andesite", 0xFF88_8888, 0),
    ("deepslate", 0xFF50_5050, 0),
    ("tuff", 0xFF6C_6D66, 0),
    ("calcite", 0xFFDF_E0DC, 0),
    ("bedrock", 0xFF55_5555, 0),
    ("grass_block", 0xFF7F_B238, FLAG_GRASS_TINT),
    ("dirt", 0xFF86_603F, 0),
    ("coarse_dirt", 0xFF77_5537, 0),
    ("podzol", 0xFF5B_3F18, 0),
    ("mycelium", 0xFF6F_6265, 0),
    ("mud", 0xFF3C_393D, 0),
    ("sand", 0xFFDB_D3A0, 0),
    ("red_sand", 0xFFBE_6621, 0),
    ("sandstone", 0xFFD8_CB9B, 0),
    ("gravel", 0xFF83_7F7E, 0),
    ("clay", 0xFFA0_A6B3, 0),
    ("snow", 0xFFFF_FFFF, 0),
    ("snow_block", 0xFFFF_FFFF, 0),
    ("ice", 0xFFA0_A0FF, 0),
    ("packed_ice", 0xFF8D_B4FA, 0),
    ("blue_ice", 0xFF74_A8FD, 0),
    ("terracotta", 0xFF98_5E43, 0),
    ("netherrack", 0xFF6F_3635, 0),
    ("soul_sand", 0xFF51_3E32, 0),
    ("end_stone", 0xFFDB_DE9E, 0),
    ("obsidian", 0xFF0F_0B19, 0),
    ("oak_log", 0xFF6D_5533, 0),
    ("spruce_log", 0xFF3A_2615, 0),
    ("birch_log", 0xFFD8_D7D2, 0),
    ("jungle_log", 0xFF55_4419, 0),
    ("acacia_log", 0xFF67_6157, 0),
    ("dark_oak_log", 0xFF3C_2E1A, 0),
    ("oak_leaves", 0xFF48_B518, FLAG_FOLIAGE_TINT),
    ("spruce_leaves", 0xFF61_9961, 0),
    ("birch_leaves", 0xFF80_A755, 0),
    ("jungle_leaves", 0xFF48_B518, FLAG_FOLIAGE_TINT),
    ("acacia_leaves", 0xFF48_B518, FLAG_FOLIAGE_TINT),
    ("dark_oak_leaves", 0xFF48_B518, FLAG_FOLIAGE_TINT),
    ("mangrove_leaves", 0xFF8D_B127, FLAG_FOLIAGE_TINT),
    ("oak_planks", 0xFFA2_8350, 0),
    ("cobblestone", 0xFF7A_7A7A, 0),
    ("mossy_cobblestone", 0xFF6E_7D62, 0),
    ("stone_bricks", 0xFF7A_7979, 0),
    ("bricks", 0xFF96_6152, 0),
    ("glass", 0, 0),
    ("cactus", 0xFF0D_6B1B, 0),
    ("pumpkin", 0xFFC0_7615, 0),
    ("melon", 0xFF6F_9117, 0),
    ("moss_block", 0xFF59_6D2D, 0),
    ("grass", 0, 0),
    ("short_grass", 0, 0),
    ("tall_grass", 0, 0),
    ("fern", 0, 0),
    ("dead_bush", 0, 0),
    ("seagrass", 0, 0),
    ("tall_seagrass", 0, 0),
    ("kelp", 0, 0),
    ("kelp_plant", 0, 0),
    ("lily_pad", 0xFF20_8030, FLAG_FOLIAGE_TINT),
    ("torch", 0, 0),
    ("vine", 0, 0),
    ("barrier", 0, 0),
    ("light", 0, 0),
];

/// Immutable block table.
///
/// Ids are assigned in insertion order; [`BlockId::AIR`] and
/// [`BlockId::UNKNOWN`] are always the first two entries.
#[derive(Clone, Debug)]
pub struct BlockRegistry {
    blocks: Vec<BlockInfo>,
    by_name: HashMap<String, BlockId>,
}

impl BlockRegistry {
    /// Builds the built-in table.
    #[must_use]
    pub fn new() -> Self {
        Self::with_overrides(&HashMap::new())
    }

    /// Builds the built-in table, replacing or adding colors by block name.
    ///
    /// Override keys may omit the `minecraft:` namespace.
    #[must_use]
    pub fn with_overrides(colors: &HashMap<String, u32>) -> Self {
        let mut registry = Self {
            blocks: Vec::with_capacity(BUILTIN.len() + colors.len()),
            by_name: HashMap::with_capacity(BUILTIN.len() + colors.len()),
        };
        for &(name, color, flags) in BUILTIN {
            registry.insert(namespaced(name), color, flags);
        }
        for (name, &color) in colors {
            let name = namespaced(name);
            match registry.by_name.get(&name) {
                Some(&id) => registry.blocks[usize::from(id.0)].color = color,
                None => registry.insert(name, color, 0),
            }
        }
        registry
    }

    /// Process-wide table with no overrides.
    #[must_use]
    pub fn global() -> &'static Self {
        static GLOBAL: OnceLock<BlockRegistry> = OnceLock::new();
        GLOBAL.get_or_init(Self::new)
    }

    fn insert(&mut self, name: String, color: u32, flags: u8) {
        let id = BlockId(self.blocks.len() as u16);
        self.by_name.insert(name.clone(), id);
        self.blocks.push(BlockInfo { name, color, flags });
    }

    /// Resolves a block name to its id, [`BlockId::UNKNOWN`] if absent.
    #[must_use]
    pub fn resolve(&self, name: &str) -> BlockId {
        let found = if name.contains(':') {
            self.by_name.get(name)
        } else {
            self.by_name.get(&namespaced(name))
        };
        found.copied().unwrap_or(BlockId::UNKNOWN)
    }

    /// Properties of a block. Out-of-range ids read as unknown.
    #[must_use]
    pub fn info(&self, id: BlockId) -> &BlockInfo {
        self.blocks
            .get(usize::from(id.0))
            .unwrap_or(&self.blocks[usize::from(BlockId::UNKNOWN.0)])
    }

    /// Returns true if the state holds any liquid.
    #[inline]
    #[must_use]
    pub fn is_fluid(&self, state: BlockState) -> bool {
        state.waterlogged || self.info(state.id).is_fluid()
    }

    /// Number of registered blocks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Always false; air and unknown are always present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

impl Default for BlockRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn namespaced(name: &str) -> String {
    if name.contains(':') {
        name.to_owned()
    } else {
        format!("minecraft:{name}")
    }
}

/// Parses `#RRGGBB`, `#AARRGGBB` or bare hex into `0xAARRGGBB`.
///
/// Six-digit colors are made opaque.
#[must_use]
pub fn parse_color(text: &str) -> Option<u32> {
    let hex = text.trim().trim_start_matches('#').trim_start_matches("0x");
    let value = u32::from_str_radix(hex, 16).ok()?;
    match hex.len() {
        6 => Some(0xFF00_0000 | value),
        8 => Some(value),
        _ => None,
    }
}
