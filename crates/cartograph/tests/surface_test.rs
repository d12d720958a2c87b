//! # Surface Statistics Integration Test

use std::fs;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use cartograph::{AppConfig, ConfigError, SurfaceStatsRenderer};
use cartograph_render::{RegionRenderer, RenderScheduler, SchedulerConfig, SchedulerEvent};
use cartograph_world::nbt::{CompoundExt, NbtCompound, NbtList, NbtTag};
use cartograph_world::{BiomeRegistry, BlockRegistry, CacheConfig, Compression, RegionFileBuilder, RegionPos, World, WorldConfig};

fn temp_dir(tag: &str) -> std::path::PathBuf {
    let id = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("cartograph_app_{tag}_{id}"));
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn palette(entries: Vec<NbtTag>) -> NbtTag {
    NbtTag::Compound(NbtCompound::new().with_tag("palette", NbtTag::List(NbtList::from(entries))))
}

fn section(y: i8, block: Option<&str>) -> NbtTag {
    let mut section = NbtCompound::new()
        .with_tag("Y", NbtTag::Byte(y))
        .with_tag("biomes", palette(vec![NbtTag::String("minecraft:plains".into())]));
    if let Some(block) = block {
        let state = NbtTag::Compound(NbtCompound::new().with_tag("Name", NbtTag::String(block.into())));
        section.insert("block_states", palette(vec![state]));
    }
    NbtTag::Compound(section)
}

fn chunk(flooded: bool) -> NbtCompound {
    let upper = flooded.then_some("minecraft:water");
    NbtCompound::new()
        .with_tag("DataVersion", NbtTag::Int(3465))
        .with_tag("Status", NbtTag::String("minecraft:full".into()))
        .with_tag(
            "sections",
            NbtTag::List(NbtList::from(vec![section(3, Some("minecraft:grass_block")), section(4, upper)])),
        )
}

fn world(dir: &std::path::Path) -> World {
    let config = WorldConfig {
        name: "plains".into(),
        region_dir: dir.to_path_buf(),
        seed: 99,
        ..WorldConfig::default()
    };
    World::new(config, Arc::new(BlockRegistry::new()), &CacheConfig::default())
}

fn write_fixture(dir: &std::path::Path) {
    RegionFileBuilder::new()
        .chunk(0, 0, &chunk(false), Compression::Zlib)
        .chunk(1, 0, &chunk(true), Compression::Gzip)
        .write(&dir.join("r.0.0.mca"))
        .unwrap();
}

#[test]
fn test_surface_statistics() {
    let dir = temp_dir("stats");
    write_fixture(&dir);
    let world = world(&dir);
    let region = world.region(RegionPos::new(0, 0));

    let renderer = SurfaceStatsRenderer::new();
    renderer.render_region(&world, &region).unwrap();
    let stats = renderer.stats("plains").unwrap();

    assert_eq!(stats.chunks, 2);
    assert_eq!(stats.columns, 512);
    assert_eq!(stats.fluid_columns, 256);
    assert_eq!(stats.void_columns, 0);
    assert_eq!((stats.min_y, stats.max_y), (Some(63), Some(63)));
    assert_eq!(stats.mean_height(), Some(63.0));

    let grass = world.blocks().resolve("grass_block");
    assert_eq!(stats.top_blocks(5), vec![(grass, 512)]);
    let plains = BiomeRegistry::global().resolve("plains");
    assert_eq!(stats.top_biomes(1)[0].0, plains);
    assert_eq!(stats.biomes.values().sum::<u64>(), 512);

    let summary = stats.summary(world.blocks());
    assert!(summary.starts_with("2 chunks, 512 columns, surface y 63..63"), "{summary}");
    assert!(summary.contains("50.0% fluid"), "{summary}");
    assert!(summary.contains("minecraft:grass_block 100.0%"), "{summary}");

    assert_eq!(renderer.take("plains"), Some(stats));
    assert_eq!(renderer.take("plains"), None);

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_scheduler_drives_renderer() {
    let dir = temp_dir("scheduled");
    write_fixture(&dir);

    let renderer = SurfaceStatsRenderer::new();
    let config = SchedulerConfig {
        worker_threads: 1,
        watch_interval_ms: 0,
        tracker_dir: dir.join("trackers"),
        ..SchedulerConfig::default()
    };
    let scheduler = RenderScheduler::new(config, renderer.clone()).unwrap();
    let events = scheduler.events();
    scheduler.register_world(Arc::new(world(&dir)));
    assert_eq!(scheduler.add_world("plains").unwrap(), 1);

    loop {
        match events.recv_timeout(Duration::from_secs(10)).unwrap() {
            SchedulerEvent::WorldFinished { progress } => {
                assert_eq!(progress.chunks_done, 2);
                break;
            }
            _ => continue,
        }
    }
    assert_eq!(renderer.stats("plains").unwrap().columns, 512);

    drop(scheduler);
    fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_load_config_file() {
    let dir = temp_dir("config");
    let path = dir.join("cartograph.toml");
    fs::write(
        &path,
        r#"
        [cache]
        max_regions = 8
        expire_after_write_secs = 0

        [[worlds]]
        name = "overworld"
        region_dir = "/srv/world/region"
        seed = -4172144997902289642
        "#,
    )
    .unwrap();

    let config = AppConfig::load(&path).unwrap();
    assert_eq!(config.cache.max_regions, 8);
    assert_eq!(config.world("overworld").unwrap().seed, -4_172_144_997_902_289_642);
    assert!(config.world("nether").is_none());

    assert!(matches!(
        AppConfig::load(&dir.join("missing.toml")),
        Err(ConfigError::Io { .. })
    ));

    fs::remove_dir_all(&dir).ok();
}
