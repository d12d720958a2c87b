//! # Biome Registry
//!
//! Read-only table of known biomes and their colors, plus the numeric ids
//! used by chunk schemas that predate named biome palettes.
//!
//! Built once per process on first use and never mutated afterwards.

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::noise::{SimplexNoise, TINT_NOISE_SEED};

/// Compact biome id, an index into the [`BiomeRegistry`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BiomeId(pub u16);

impl BiomeId {
    /// Unknown or not-yet-generated biome.
    pub const DEFAULT: Self = Self(0);
}

/// Per-coordinate adjustment of a biome's grass color.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GrassModifier {
    /// Grass color is used as-is.
    #[default]
    None,
    /// Darkened toward a fixed green.
    DarkForest,
    /// Two-tone, switched by a noise threshold.
    Swamp,
}

/// Immutable biome description. Colors are `0xRRGGBB`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Biome {
    /// Namespaced key, e.g. `minecraft:plains`.
    pub key: String,
    /// Base map color.
    pub color: u32,
    /// Leaf tint.
    pub foliage_color: u32,
    /// Grass tint before the modifier.
    pub grass_color: u32,
    /// Water tint.
    pub water_color: u32,
    /// Spatial grass variation.
    pub grass_modifier: GrassModifier,
}

impl Biome {
    /// Grass tint at a block position.
    #[must_use]
    pub fn grass_color_at(&self, x: i32, z: i32) -> u32 {
        match self.grass_modifier {
            GrassModifier::None => self.grass_color,
            GrassModifier::DarkForest => ((self.grass_color & 0xFE_FEFE) + 0x28_340A) >> 1,
            GrassModifier::Swamp => {
                let value = tint_noise().sample(f64::from(x) * 0.0225, f64::from(z) * 0.0225);
                if value < -0.1 {
                    0x4C_763C
                } else {
                    0x6A_7039
                }
            }
        }
    }
}

fn tint_noise() -> &'static SimplexNoise {
    static NOISE: OnceLock<SimplexNoise> = OnceLock::new();
    NOISE.get_or_init(|| SimplexNoise::new(TINT_NOISE_SEED))
}

type Row = (i32, &'static str, u32, u32, u32, u32, GrassModifier);

const N: GrassModifier = GrassModifier::None;
const WATER: u32 = 0x3F_76E4;

/// `(legacy id or -1, key, color, foliage, grass, water, modifier)`
const BUILTIN: &[Row] = &[
    (-1, "cartograph:default", 0x00_0000, 0x48_B518, 0x91_BD59, WATER, N),
    (0, "ocean", 0x00_0070, 0x71_A74D, 0x8E_B971, WATER, N),
    (1, "plains", 0x8D_B360, 0x77_AB2F, 0x91_BD59, WATER, N),
    (2, "desert", 0xFA_9418, 0xAE_A42A, 0xBF_B755, WATER, N),
    (3, "windswept_hills", 0x60_6060, 0x6D_A36B, 0x8A_B689, WATER, N),
    (4, "forest", 0x05_6621, 0x59_AE30, 0x79_C05A, WATER, N),
    (5, "taiga", 0x0B_6659, 0x68_A464, 0x86_B783, WATER, N),
    (6, "swamp", 0x07_F9B2, 0x6A_7039, 0x6A_7039, 0x61_7B64, GrassModifier::Swamp),
    (7, "river", 0x00_00FF, 0x71_A74D, 0x8E_B971, WATER, N),
    (8, "nether_wastes", 0xBF_3B3B, 0xAE_A42A, 0xBF_B755, WATER, N),
    (9, "the_end", 0x80_80FF, 0x71_A74D, 0x8E_B971, WATER, N),
    (10, "frozen_ocean", 0x70_70D6, 0x60_A17B, 0x80_B497, 0x39_38C9, N),
    (11, "frozen_river", 0xA0_A0FF, 0x60_A17B, 0x80_B497, 0x39_38C9, N),
    (12, "snowy_plains", 0xFF_FFFF, 0x60_A17B, 0x80_B497, WATER, N),
    (13, "snowy_mountains", 0xA0_A0A0, 0x60_A17B, 0x80_B497, WATER, N),
    (14, "mushroom_fields", 0xFF_00FF, 0x2B_BB0F, 0x55_C93F, WATER, N),
    (16, "beach", 0xFA_DE55, 0x77_AB2F, 0x91_BD59, WATER, N),
    (17, "desert_hills", 0xD2_5F12, 0xAE_A42A, 0xBF_B755, WATER, N),
    (18, "wooded_hills", 0x22_551C, 0x59_AE30, 0x79_C05A, WATER, N),
    (19, "taiga_hills", 0x16_3933, 0x68_A464, 0x86_B783, WATER, N),
    (21, "jungle", 0x53_7B09, 0x30_BB0B, 0x59_C93C, WATER, N),
    (22, "jungle_hills", 0x2C_4205, 0x30_BB0B, 0x59_C93C, WATER, N),
    (23, "sparse_jungle", 0x62_8B17, 0x3E_B80F, 0x64_C73F, WATER, N),
    (24, "deep_ocean", 0x00_0030, 0x71_A74D, 0x8E_B971, WATER, N),
    (25, "stony_shore", 0xA2_A284, 0x6D_A36B, 0x8A_B689, WATER, N),
    (26, "snowy_beach", 0xFA_F0C0, 0x60_A17B, 0x80_B497, 0x3D_57D6, N),
    (27, "birch_forest", 0x30_7444, 0x6B_A941, 0x88_BB67, WATER, N),
    (28, "birch_forest_hills", 0x1F_5F32, 0x6B_A941, 0x88_BB67, WATER, N),
    (29, "dark_forest", 0x40_511A, 0x59_AE30, 0x79_C05A, WATER, GrassModifier::DarkForest),
    (30, "snowy_taiga", 0x31_554A, 0x60_A17B, 0x80_B497, 0x3D_57D6, N),
    (32, "old_growth_pine_taiga", 0x59_6651, 0x68_A55F, 0x86_B87F, WATER, N),
    (34, "windswept_forest", 0x50_7050, 0x6D_A36B, 0x8A_B689, WATER, N),
    (35, "savanna", 0xBD_B25F, 0xAE_A42A, 0xBF_B755, WATER, N),
    (36, "savanna_plateau", 0xA7_9D64, 0xAE_A42A, 0xBF_B755, WATER, N),
    (37, "badlands", 0xD9_4515, 0x9E_814D, 0x90_814D, WATER, N),
    (38, "wooded_badlands", 0xB0_9765, 0x9E_814D, 0x90_814D, WATER, N),
    (40, "small_end_islands", 0x80_80FF, 0x71_A74D, 0x8E_B971, WATER, N),
    (41, "end_midlands", 0x80_80FF, 0x71_A74D, 0x8E_B971, WATER, N),
    (42, "end_highlands", 0x80_80FF, 0x71_A74D, 0x8E_B971, WATER, N),
    (43, "end_barrens", 0x80_80FF, 0x71_A74D, 0x8E_B971, WATER, N),
    (44, "warm_ocean", 0x00_00AC, 0x71_A74D, 0x8E_B971, 0x43_D5EE, N),
    (45, "lukewarm_ocean", 0x00_0090, 0x71_A74D, 0x8E_B971, 0x45_ADF2, N),
    (46, "cold_ocean", 0x20_2070, 0x71_A74D, 0x8E_B971, 0x3D_57D6, N),
    (47, "deep_warm_ocean", 0x00_0050, 0x71_A74D, 0x8E_B971, 0x43_D5EE, N),
    (48, "deep_lukewarm_ocean", 0x00_0040, 0x71_A74D, 0x8E_B971, 0x45_ADF2, N),
    (49, "deep_cold_ocean", 0x20_2038, 0x71_A74D, 0x8E_B971, 0x3D_57D6, N),
    (50, "deep_frozen_ocean", 0x40_4090, 0x60_A17B, 0x80_B497, 0x39_38C9, N),
    (127, "the_void", 0x00_0000, 0x71_A74D, 0x8E_B971, WATER, N),
    (129, "sunflower_plains", 0xB5_DB88, 0x77_AB2F, 0x91_BD59, WATER, N),
    (131, "windswept_gravelly_hills", 0x88_8888, 0x6D_A36B, 0x8A_B689, WATER, N),
    (132, "flower_forest", 0x2D_8E49, 0x59_AE30, 0x79_C05A, WATER, N),
    (140, "ice_spikes", 0xB4_DCDC, 0x60_A17B, 0x80_B497, WATER, N),
    (149, "modified_jungle", 0x7B_A331, 0x30_BB0B, 0x59_C93C, WATER, N),
    (155, "old_growth_birch_forest", 0x58_9C6C, 0x6B_A941, 0x88_BB67, WATER, N),
    (157, "dark_forest_hills", 0x68_7942, 0x59_AE30, 0x79_C05A, WATER, GrassModifier::DarkForest),
    (160, "old_growth_spruce_taiga", 0x81_8E79, 0x68_A55F, 0x86_B87F, WATER, N),
    (163, "windswept_savanna", 0xE5_DA87, 0xAE_A42A, 0xBF_B755, WATER, N),
    (165, "eroded_badlands", 0xFF_6D3D, 0x9E_814D, 0x90_814D, WATER, N),
    (168, "bamboo_jungle", 0x76_8E14, 0x30_BB0B, 0x59_C93C, WATER, N),
    (170, "soul_sand_valley", 0x5E_3830, 0xAE_A42A, 0xBF_B755, WATER, N),
    (171, "crimson_forest", 0xDD_0808, 0xAE_A42A, 0xBF_B755, WATER, N),
    (172, "warped_forest", 0x49_907B, 0xAE_A42A, 0xBF_B755, WATER, N),
    (173, "basalt_deltas", 0x40_3636, 0xAE_A42A, 0xBF_B755, WATER, N),
    (174, "dripstone_caves", 0x8E_7256, 0x77_AB2F, 0x91_BD59, WATER, N),
    (175, "lush_caves", 0x28_3C00, 0x77_AB2F, 0x91_BD59, WATER, N),
    (-1, "meadow", 0x83_BB6D, 0x63_A948, 0x83_BB6D, 0x0E_4ECF, N),
    (-1, "grove", 0xE6_E6E6, 0x60_A17B, 0x80_B497, WATER, N),
    (-1, "snowy_slopes", 0xF0_F0F0, 0x60_A17B, 0x80_B497, WATER, N),
    (-1, "jagged_peaks", 0xDC_DCC8, 0x60_A17B, 0x80_B497, WATER, N),
    (-1, "frozen_peaks", 0xB0_B3CE, 0x60_A17B, 0x80_B497, WATER, N),
    (-1, "stony_peaks", 0x7B_8F74, 0x82_AC1E, 0x9A_BE4B, WATER, N),
    (-1, "windswept_savanna", 0xE5_DA87, 0xAE_A42A, 0xBF_B755, WATER, N),
    (-1, "deep_dark", 0x0A_1A1F, 0x77_AB2F, 0x91_BD59, WATER, N),
    (-1, "mangrove_swamp", 0x2C_CC8E, 0x8D_B127, 0x6A_7039, 0x3A_7A6A, GrassModifier::Swamp),
    (-1, "cherry_grove", 0xFF_91C8, 0xB6_DB61, 0xB6_DB61, 0x5D_B7EF, N),
];

/// Immutable biome table with legacy numeric lookup.
#[derive(Clone, Debug)]
pub struct BiomeRegistry {
    biomes: Vec<Biome>,
    by_key: HashMap<String, BiomeId>,
    legacy: HashMap<i32, BiomeId>,
}

impl BiomeRegistry {
    /// Builds the built-in table.
    #[must_use]
    pub fn new() -> Self {
        let mut registry = Self {
            biomes: Vec::with_capacity(BUILTIN.len()),
            by_key: HashMap::with_capacity(BUILTIN.len()),
            legacy: HashMap::new(),
        };
        for &(legacy, key, color, foliage_color, grass_color, water_color, grass_modifier) in BUILTIN
        {
            let key = if key.contains(':') {
                key.to_owned()
            } else {
                format!("minecraft:{key}")
            };
            let id = *registry.by_key.entry(key.clone()).or_insert_with(|| {
                let id = BiomeId(registry.biomes.len() as u16);
                registry.biomes.push(Biome {
                    key,
                    color,
                    foliage_color,
                    grass_color,
                    water_color,
                    grass_modifier,
                });
                id
            });
            if legacy >= 0 {
                registry.legacy.insert(legacy, id);
            }
        }
        registry
    }

    /// Process-wide table.
    #[must_use]
    pub fn global() -> &'static Self {
        static GLOBAL: OnceLock<BiomeRegistry> = OnceLock::new();
        GLOBAL.get_or_init(Self::new)
    }

    /// Resolves a biome key; unknown keys give [`BiomeId::DEFAULT`].
    #[must_use]
    pub fn resolve(&self, key: &str) -> BiomeId {
        let found = if key.contains(':') {
            self.by_key.get(key)
        } else {
            self.by_key.get(&format!("minecraft:{key}"))
        };
        found.copied().unwrap_or(BiomeId::DEFAULT)
    }

    /// Resolves a numeric id from pre-palette schemas.
    #[must_use]
    pub fn from_legacy(&self, id: i32) -> BiomeId {
        self.legacy.get(&id).copied().unwrap_or(BiomeId::DEFAULT)
    }

    /// Looks up a biome. Out-of-range ids read as the default biome.
    #[must_use]
    pub fn get(&self, id: BiomeId) -> &Biome {
        self.biomes
            .get(usize::from(id.0))
            .unwrap_or(&self.biomes[usize::from(BiomeId::DEFAULT.0)])
    }

    /// Number of registered biomes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.biomes.len()
    }

    /// Always false; the default biome is always present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.biomes.is_empty()
    }
}

impl Default for BiomeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
