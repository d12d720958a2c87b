//! Shared fixtures for the scheduler integration tests.

#![allow(dead_code)]

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use cartograph_render::{RegionRenderer, RenderError, RenderResult, SchedulerConfig, SchedulerEvent};
use cartograph_world::nbt::{CompoundExt, NbtCompound, NbtList, NbtTag};
use cartograph_world::{
    BlockRegistry, CacheConfig, Compression, Region, RegionFileBuilder, RegionPos, World, WorldConfig,
};
use crossbeam_channel::Receiver;

/// Fresh, empty directory under the system temp dir.
pub fn temp_dir(tag: &str) -> PathBuf {
    static COUNTER: AtomicU32 = AtomicU32::new(0);
    let id = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    let dir = std::env::temp_dir().join(format!("cartograph_render_{tag}_{id}_{n}"));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// Scheduler settings for tests: two workers, no watchdog, no watcher.
pub fn config(tracker_dir: &Path) -> SchedulerConfig {
    SchedulerConfig {
        worker_threads: 2,
        stall_timeout_secs: 0,
        checkpoint_interval: 50,
        watch_interval_ms: 0,
        tracker_dir: tracker_dir.to_path_buf(),
    }
}

/// World named `name` over `dir`.
pub fn world(name: &str, dir: &Path) -> Arc<World> {
    world_with_cache(name, dir, &CacheConfig::default())
}

/// World named `name` over `dir` with custom cache bounds.
pub fn world_with_cache(name: &str, dir: &Path, cache: &CacheConfig) -> Arc<World> {
    let config = WorldConfig {
        name: name.into(),
        region_dir: dir.to_path_buf(),
        seed: 1,
        ..WorldConfig::default()
    };
    Arc::new(World::new(config, Arc::new(BlockRegistry::new()), cache))
}

/// Fully generated chunk: one stone section.
pub fn stone_chunk() -> NbtCompound {
    let stone = NbtTag::Compound(NbtCompound::new().with_tag("Name", NbtTag::String("minecraft:stone".into())));
    let states = NbtCompound::new().with_tag("palette", NbtTag::List(NbtList::from(vec![stone])));
    let section = NbtCompound::new()
        .with_tag("Y", NbtTag::Byte(0))
        .with_tag("block_states", NbtTag::Compound(states));
    NbtCompound::new()
        .with_tag("DataVersion", NbtTag::Int(3465))
        .with_tag("Status", NbtTag::String("minecraft:full".into()))
        .with_tag("sections", NbtTag::List(NbtList::from(vec![NbtTag::Compound(section)])))
}

/// Writes a region file holding stone chunks at the given local slots.
pub fn write_region(dir: &Path, pos: RegionPos, slots: &[(i32, i32)]) -> PathBuf {
    let chunk = stone_chunk();
    let mut builder = RegionFileBuilder::new();
    for &(x, z) in slots {
        builder = builder.chunk(pos.chunk_x() + x, pos.chunk_z() + z, &chunk, Compression::Zlib);
    }
    let path = dir.join(pos.file_name());
    builder.write(&path).unwrap();
    path
}

/// Pins a file's modification time.
pub fn set_mtime(path: &Path, secs: u64) {
    let file = File::options().write(true).open(path).unwrap();
    file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(secs))
        .unwrap();
}

/// Next event matching `pred`, skipping others. Panics after ten seconds.
pub fn wait_for(events: &Receiver<SchedulerEvent>, pred: impl Fn(&SchedulerEvent) -> bool) -> SchedulerEvent {
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        let left = deadline.saturating_duration_since(Instant::now());
        let event = events
            .recv_timeout(left)
            .expect("timed out waiting for scheduler event");
        if pred(&event) {
            return event;
        }
    }
}

/// Waits for the given world's run to finish.
pub fn wait_finished(events: &Receiver<SchedulerEvent>, world: &str) -> cartograph_render::ProgressSnapshot {
    match wait_for(events, |e| matches!(e, SchedulerEvent::WorldFinished { progress } if progress.world == world)) {
        SchedulerEvent::WorldFinished { progress } => progress,
        _ => unreachable!(),
    }
}

/// Touches every chunk and counts calls.
#[derive(Clone, Default)]
pub struct CountingRenderer {
    pub calls: Arc<AtomicUsize>,
}

impl CountingRenderer {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RegionRenderer for CountingRenderer {
    fn render_region(&self, _world: &World, region: &Arc<Region>) -> RenderResult<()> {
        let pos = region.pos();
        for z in 0..32 {
            for x in 0..32 {
                let (cx, cz) = (pos.chunk_x() + x, pos.chunk_z() + z);
                if region.has_chunk(cx, cz) {
                    let _ = region.chunk(cx, cz).surface(0, 0);
                }
            }
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Blocks on regions of one world until released.
pub struct GateRenderer {
    pub world: String,
    pub gate: Receiver<()>,
}

impl RegionRenderer for GateRenderer {
    fn render_region(&self, world: &World, _region: &Arc<Region>) -> RenderResult<()> {
        if world.name() == self.world {
            let _ = self.gate.recv_timeout(Duration::from_secs(10));
        }
        Ok(())
    }
}

/// Always fails.
pub struct FailingRenderer;

impl RegionRenderer for FailingRenderer {
    fn render_region(&self, _world: &World, _region: &Arc<Region>) -> RenderResult<()> {
        Err(RenderError::Renderer("tile encoder unavailable".into()))
    }
}
