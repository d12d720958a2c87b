//! # Region Decode Integration Test
//!
//! Builds region files on disk and reads them back through a `World`.

mod common;

use std::fs;

use cartograph_world::nbt::{self, CompoundExt, NbtCompound, NbtTag};
use cartograph_world::section::block_index;
use cartograph_world::{
    BiomeRegistry, Compression, PackedArray, Packing, RegionFileBuilder, RegionPos, Schema, WorldError,
};
use common::{list, modern_chunk, section, temp_dir, world};

fn indices(layers: &[(i32, u32)]) -> Vec<u32> {
    let mut values = vec![0u32; 4096];
    for &(y, index) in layers {
        for x in 0..16 {
            for z in 0..16 {
                values[block_index(x, y, z)] = index;
            }
        }
    }
    values
}

/// Single-entry palette, no index array: every block is the sole entry.
#[test]
fn test_single_entry_palette_fills_section() {
    let dir = temp_dir("single_palette");
    let chunk = modern_chunk(vec![section(0, &["minecraft:stone"], None, &["minecraft:plains"])]);
    RegionFileBuilder::new()
        .chunk(0, 0, &chunk, Compression::Zlib)
        .write(&dir.join("r.0.0.mca"))
        .unwrap();

    let world = world(dir.clone(), false);
    let stone = world.blocks().resolve("stone");
    let c = world.chunk(0, 0);
    assert_eq!(c.schema(), Some(Schema::Anvil118));
    for y in 0..16 {
        for z in 0..16 {
            for x in 0..16 {
                assert_eq!(c.get_block_state(x, y, z).id, stone, "({x}, {y}, {z})");
            }
        }
    }
    assert!(c.get_block_state(0, 16, 0).is_air());

    fs::remove_dir_all(&dir).ok();
}

/// Sections with biomes but no block states: biomes decode, blocks are air.
#[test]
fn test_missing_block_states_fall_back_to_air() {
    let dir = temp_dir("missing_block_states");
    let chunk = modern_chunk(vec![section(4, &[], None, &["minecraft:desert"])]);
    RegionFileBuilder::new()
        .chunk(1, 2, &chunk, Compression::Gzip)
        .write(&dir.join("r.0.0.mca"))
        .unwrap();

    let world = world(dir.clone(), false);
    let c = world.chunk(1, 2);
    assert!(!c.is_empty());
    assert!(c.get_block_state(20, 70, 40).is_air());
    assert_eq!(c.get_biome(20, 70, 40), BiomeRegistry::global().resolve("desert"));
    assert_eq!(world.store().stats().chunks_failed, 0);

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_corrupt_chunks_do_not_affect_siblings() {
    let dir = temp_dir("corrupt_sibling");
    let good = modern_chunk(vec![section(0, &["minecraft:dirt"], None, &[])]);
    let truncated = nbt::write_root("", &good).unwrap();
    RegionFileBuilder::new()
        .chunk(0, 0, &good, Compression::Zlib)
        .raw_chunk(1, 0, Compression::Zlib.tag(), b"definitely not zlib".to_vec())
        .raw_chunk(2, 0, 9, vec![1, 2, 3])
        .raw_chunk(3, 0, Compression::None.tag(), truncated[..truncated.len() / 2].to_vec())
        .write(&dir.join("r.0.0.mca"))
        .unwrap();

    let world = world(dir.clone(), false);
    let region = world.region(RegionPos::new(0, 0));
    assert!(matches!(
        region.payload(cartograph_world::ChunkPos::new(2, 0)),
        Err(WorldError::UnsupportedCompression(9))
    ));

    for x in 1..4 {
        assert!(world.chunk(x, 0).is_empty(), "chunk {x} should be empty");
    }
    let dirt = world.blocks().resolve("dirt");
    assert_eq!(world.chunk(0, 0).get_block_state(5, 5, 5).id, dirt);
    assert_eq!(world.store().stats().chunks_failed, 3);

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_stream_packed_legacy_chunk() {
    let dir = temp_dir("stream_packed");
    let names = [
        "air", "stone", "granite", "diorite", "andesite", "dirt", "grass_block", "sand", "gravel", "clay",
        "snow_block", "ice", "bedrock", "cobblestone", "oak_log", "oak_planks", "bricks", "obsidian",
        "netherrack", "end_stone",
    ];
    let mut values = vec![0u32; 4096];
    for y in 32..48 {
        for z in 0..16 {
            for x in 0..16 {
                values[block_index(x, y, z)] = ((x + z + y) % 20) as u32;
            }
        }
    }
    let words = PackedArray::pack(Packing::Stream, 5, &values).to_words();
    assert_eq!(words.len(), 320);

    let section = NbtCompound::new()
        .with_tag("Y", NbtTag::Byte(2))
        .with_tag("Palette", list(names.iter().map(|n| common::state(n)).collect()))
        .with_tag("BlockStates", NbtTag::LongArray(words));
    let level = NbtCompound::new().with_tag("Sections", list(vec![NbtTag::Compound(section)]));
    let root = common::level_chunk(1976, level);
    RegionFileBuilder::new()
        .chunk(-1, -1, &root, Compression::Zlib)
        .write(&dir.join("r.-1.-1.mca"))
        .unwrap();

    let world = world(dir.clone(), false);
    let c = world.chunk(-1, -1);
    assert_eq!(c.schema(), Some(Schema::Anvil113));
    for y in 32..48 {
        for z in 0..16 {
            for x in 0..16 {
                let expected = world.blocks().resolve(names[((x + z + y) % 20) as usize]);
                assert_eq!(c.get_block_state(x - 16, y, z - 16).id, expected);
            }
        }
    }

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_heightmap_drives_surface_scan() {
    let dir = temp_dir("heightmap");
    // Stone at y=64, a dirt layer at y=70 the heightmap does not know about.
    let data = PackedArray::pack(Packing::Aligned, 4, &indices(&[(64, 1), (70, 2)])).to_words();
    let mut chunk = modern_chunk(vec![section(
        4,
        &["minecraft:air", "minecraft:stone", "minecraft:dirt"],
        Some(data),
        &[],
    )]);
    // min_build_height -64: stored value = y + 64 + 1.
    let heights = PackedArray::pack(Packing::Aligned, 9, &[129; 256]).to_words();
    chunk.insert(
        "Heightmaps",
        NbtTag::Compound(NbtCompound::new().with_tag("WORLD_SURFACE", NbtTag::LongArray(heights))),
    );
    RegionFileBuilder::new()
        .chunk(0, 0, &chunk, Compression::Lz4)
        .write(&dir.join("r.0.0.mca"))
        .unwrap();

    let world = world(dir.clone(), true);
    let c = world.chunk(0, 0);
    assert_eq!(c.get_height(3, 3), 64);
    assert_eq!(c.get_ocean_floor(3, 3), 0);
    let surface = c.surface(3, 3).unwrap();
    assert_eq!(surface.terrain.unwrap().y, 64);
    assert_eq!(surface.terrain.unwrap().block.id, world.blocks().resolve("stone"));
    assert!(surface.fluid.is_none());

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_external_chunk_file() {
    let dir = temp_dir("external");
    let chunk = modern_chunk(vec![section(0, &["minecraft:sand"], None, &[])]);
    fs::write(
        dir.join("c.5.6.mcc"),
        Compression::Zlib.compress(&nbt::write_root("", &chunk).unwrap()),
    )
    .unwrap();
    RegionFileBuilder::new()
        .raw_chunk(5, 6, 0x80 | Compression::Zlib.tag(), Vec::new())
        .raw_chunk(7, 6, 0x80 | Compression::Zlib.tag(), Vec::new())
        .write(&dir.join("r.0.0.mca"))
        .unwrap();

    let world = world(dir.clone(), false);
    assert_eq!(world.chunk(5, 6).get_block_state(80, 1, 96).id, world.blocks().resolve("sand"));
    assert!(world.chunk(7, 6).is_empty());

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_ungenerated_chunk_is_empty() {
    let dir = temp_dir("ungenerated");
    let mut chunk = modern_chunk(vec![section(0, &["minecraft:stone"], None, &[])]);
    chunk.insert("Status", NbtTag::String("minecraft:noise".into()));
    RegionFileBuilder::new()
        .chunk(0, 0, &chunk, Compression::Zlib)
        .write(&dir.join("r.0.0.mca"))
        .unwrap();

    let world = world(dir.clone(), false);
    assert!(world.chunk(0, 0).is_empty());
    assert_eq!(world.store().stats().chunks_failed, 0);

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_list_regions() {
    let dir = temp_dir("list");
    for name in ["r.0.0.mca", "r.-1.3.mca", "c.0.0.mcc", "notes.txt"] {
        fs::write(dir.join(name), b"").unwrap();
    }
    let world = world(dir.clone(), false);
    assert_eq!(
        world.list_regions().unwrap(),
        vec![RegionPos::new(-1, 3), RegionPos::new(0, 0)]
    );
    // Empty file reads as the empty region.
    assert!(world.region(RegionPos::new(0, 0)).is_empty());

    fs::remove_dir_all(&dir).ok();
}
