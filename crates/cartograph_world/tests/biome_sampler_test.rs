//! # Biome Sampler Integration Test
//!
//! Checks the zoom against a fixture table of `(seed, x, y, z)` to the
//! quart cell the game picks, then samples through a real region file.

mod common;

use std::fs;

use cartograph_world::nbt::{CompoundExt, NbtCompound, NbtTag};
use cartograph_world::section::biome_index;
use cartograph_world::{BiomeRegistry, BiomeSampler, Compression, PackedArray, Packing, RegionFileBuilder};
use common::{level_chunk, list, modern_chunk, section, state, temp_dir, world};

/// `(seed, x, y, z) -> (qx, qy, qz)`
const FIXTURES: &[(i64, i32, i32, i32, (i32, i32, i32))] = &[
    (0, 0, 0, 0, (-1, -1, -1)),
    (0, 1, 64, 1, (0, 15, 0)),
    (12345, 100, 70, -200, (25, 17, -50)),
    (-4_172_144_997_902_289_642, -1, 63, -1, (-1, 15, -1)),
    (-4_172_144_997_902_289_642, 517, 80, -1033, (129, 19, -259)),
    (42, 7, -30, 9, (1, -8, 2)),
    (8_077_405_618_574_856_153, -2049, 319, 2047, (-513, 79, 511)),
    (1, 2, 2, 2, (0, 0, 0)),
    (99, -17, 5, 33, (-5, 0, 8)),
    (-1, 1_000_000, 100, -1_000_000, (250_000, 24, -250_000)),
];

#[test]
fn test_fixture_table() {
    for &(seed, x, y, z, expected) in FIXTURES {
        let cell = BiomeSampler::new(seed).cell(x, y, z);
        assert_eq!(cell, expected, "seed={seed} at ({x}, {y}, {z})");
    }
}

#[test]
fn test_deterministic() {
    let sampler = BiomeSampler::new(-4_172_144_997_902_289_642);
    for i in -200..200 {
        let (x, y, z) = (i * 7, i % 64, -i * 3);
        assert_eq!(sampler.cell(x, y, z), sampler.cell(x, y, z));
    }
}

#[test]
fn test_chosen_cell_is_adjacent() {
    let sampler = BiomeSampler::new(99);
    for x in -40..40 {
        for z in -40..40 {
            let (qx, _, qz) = sampler.cell(x, 64, z);
            let base_x = (x - 2) >> 2;
            let base_z = (z - 2) >> 2;
            assert!(qx == base_x || qx == base_x + 1);
            assert!(qz == base_z || qz == base_z + 1);
        }
    }
}

#[test]
fn test_world_biome_uses_sampled_cell() {
    let dir = temp_dir("biome_world");
    let registry = BiomeRegistry::global();

    // Checkerboard of plains and desert cells in section 4.
    let cells: Vec<u32> = (0..64).map(|i| ((i & 3) + ((i >> 2) & 3)) as u32 & 1).collect();
    let data = PackedArray::pack(Packing::Aligned, 1, &cells).to_words();
    let mut sec = section(4, &["minecraft:stone"], None, &[]);
    let biomes = NbtCompound::new()
        .with_tag(
            "palette",
            list(vec![
                NbtTag::String("minecraft:plains".into()),
                NbtTag::String("minecraft:desert".into()),
            ]),
        )
        .with_tag("data", NbtTag::LongArray(data));
    sec.insert("biomes", NbtTag::Compound(biomes));
    RegionFileBuilder::new()
        .chunk(0, 0, &modern_chunk(vec![sec]), Compression::Zlib)
        .write(&dir.join("r.0.0.mca"))
        .unwrap();

    let world = world(dir.clone(), true);
    let chunk = world.chunk(0, 0);
    let plains = registry.resolve("plains");
    let desert = registry.resolve("desert");

    for x in 4..12 {
        for z in 4..12 {
            let y = 70;
            let (qx, qy, qz) = world.sampler().cell(x, y, z);
            let expected = chunk.get_biome(qx << 2, qy << 2, qz << 2);
            let sampled = world.biome_at(None, x, y, z);
            assert_eq!(sampled, expected, "({x}, {y}, {z})");
            assert!(sampled == plains || sampled == desert);
            let stored = cells[biome_index(qx << 2, qy << 2, qz << 2)];
            assert_eq!(sampled, if stored == 0 { plains } else { desert });
        }
    }

    fs::remove_dir_all(&dir).ok();
}

/// Legacy chunks store biomes chunk-wide, so sampling just above the top
/// stored section still finds them.
#[test]
fn test_world_biome_over_legacy_column_biomes() {
    let dir = temp_dir("biome_legacy");
    let level = NbtCompound::new()
        .with_tag("Biomes", NbtTag::IntArray(vec![2; 256]))
        .with_tag(
            "Sections",
            list(vec![NbtTag::Compound(
                NbtCompound::new()
                    .with_tag("Y", NbtTag::Byte(3))
                    .with_tag("Palette", list(vec![state("minecraft:sand")])),
            )]),
        );
    RegionFileBuilder::new()
        .chunk(0, 0, &level_chunk(1976, level), Compression::Zlib)
        .write(&dir.join("r.0.0.mca"))
        .unwrap();

    let world = world(dir.clone(), true);
    let desert = BiomeRegistry::global().resolve("desert");
    for x in 2..14 {
        for z in 2..14 {
            for y in [62, 63, 64, 70] {
                assert_eq!(world.biome_at(None, x, y, z), desert, "({x}, {y}, {z})");
            }
        }
    }

    fs::remove_dir_all(&dir).ok();
}
