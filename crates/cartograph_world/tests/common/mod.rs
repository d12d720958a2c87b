//! Shared fixtures for the world integration tests.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use cartograph_world::nbt::{CompoundExt, NbtCompound, NbtList, NbtTag};
use cartograph_world::{BlockRegistry, CacheConfig, World, WorldConfig};

/// Fresh, empty directory under the system temp dir.
pub fn temp_dir(tag: &str) -> PathBuf {
    static COUNTER: AtomicU32 = AtomicU32::new(0);
    let id = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    let dir = std::env::temp_dir().join(format!("cartograph_{tag}_{id}_{n}"));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// Palette entry for a block name.
pub fn state(name: &str) -> NbtTag {
    NbtTag::Compound(NbtCompound::new().with_tag("Name", NbtTag::String(name.into())))
}

/// List tag from its elements.
pub fn list(tags: Vec<NbtTag>) -> NbtTag {
    NbtTag::List(NbtList::from(tags))
}

/// Section of the top-level `sections` schema.
///
/// An empty `blocks` or `biomes` palette leaves that compound out.
pub fn section(y: i8, blocks: &[&str], data: Option<Vec<i64>>, biomes: &[&str]) -> NbtCompound {
    let mut section = NbtCompound::new().with_tag("Y", NbtTag::Byte(y));
    if !blocks.is_empty() {
        let mut states = NbtCompound::new().with_tag("palette", list(blocks.iter().map(|n| state(n)).collect()));
        if let Some(data) = data {
            states.insert("data", NbtTag::LongArray(data));
        }
        section.insert("block_states", NbtTag::Compound(states));
    }
    if !biomes.is_empty() {
        let palette = biomes.iter().map(|k| NbtTag::String((*k).to_owned())).collect();
        section.insert("biomes", NbtTag::Compound(NbtCompound::new().with_tag("palette", list(palette))));
    }
    section
}

/// Fully generated chunk document of the top-level `sections` schema.
pub fn modern_chunk(sections: Vec<NbtCompound>) -> NbtCompound {
    NbtCompound::new()
        .with_tag("DataVersion", NbtTag::Int(3465))
        .with_tag("Status", NbtTag::String("minecraft:full".into()))
        .with_tag("sections", list(sections.into_iter().map(NbtTag::Compound).collect()))
}

/// Fully generated chunk document of the `Level` schemas.
pub fn level_chunk(data_version: i32, level: NbtCompound) -> NbtCompound {
    NbtCompound::new()
        .with_tag("DataVersion", NbtTag::Int(data_version))
        .with_tag("Level", NbtTag::Compound(level.with_tag("Status", NbtTag::String("full".into()))))
}

/// World over `dir` with default cache settings.
pub fn world(dir: PathBuf, release_block_storage: bool) -> World {
    let config = WorldConfig {
        name: "test".into(),
        region_dir: dir,
        seed: 12345,
        release_block_storage,
        ..WorldConfig::default()
    };
    World::new(config, Arc::new(BlockRegistry::new()), &CacheConfig::default())
}
