//! # Surface Statistics Renderer
//!
//! A [`RegionRenderer`] that reads every populated column and biome the way
//! a tile painter would, but only accumulates statistics.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;

use cartograph_render::{RegionRenderer, RenderResult};
use cartograph_world::{BiomeId, BiomeRegistry, BlockId, BlockRegistry, ColumnSurface, Region, World};
use parking_lot::Mutex;

/// Column statistics for one world.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SurfaceStats {
    /// Non-empty chunks read.
    pub chunks: u64,
    /// Columns read.
    pub columns: u64,
    /// Columns with fluid above the terrain.
    pub fluid_columns: u64,
    /// Columns with no terrain at all.
    pub void_columns: u64,
    /// Lowest terrain surface.
    pub min_y: Option<i32>,
    /// Highest terrain surface.
    pub max_y: Option<i32>,
    height_sum: i64,
    /// Terrain surface block counts.
    pub blocks: HashMap<BlockId, u64>,
    /// Surface biome counts.
    pub biomes: HashMap<BiomeId, u64>,
}

impl SurfaceStats {
    fn record(&mut self, column: ColumnSurface, biome: Option<BiomeId>) {
        self.columns += 1;
        if column.fluid.is_some() {
            self.fluid_columns += 1;
        }
        let Some(terrain) = column.terrain else {
            self.void_columns += 1;
            return;
        };
        self.min_y = Some(self.min_y.map_or(terrain.y, |y| y.min(terrain.y)));
        self.max_y = Some(self.max_y.map_or(terrain.y, |y| y.max(terrain.y)));
        self.height_sum += i64::from(terrain.y);
        *self.blocks.entry(terrain.block.id).or_default() += 1;
        if let Some(biome) = biome {
            *self.biomes.entry(biome).or_default() += 1;
        }
    }

    /// Adds another accumulation into this one.
    pub fn merge(&mut self, other: &Self) {
        self.chunks += other.chunks;
        self.columns += other.columns;
        self.fluid_columns += other.fluid_columns;
        self.void_columns += other.void_columns;
        self.min_y = self.min_y.into_iter().chain(other.min_y).min();
        self.max_y = self.max_y.into_iter().chain(other.max_y).max();
        self.height_sum += other.height_sum;
        for (&id, &n) in &other.blocks {
            *self.blocks.entry(id).or_default() += n;
        }
        for (&id, &n) in &other.biomes {
            *self.biomes.entry(id).or_default() += n;
        }
    }

    /// Mean terrain surface height.
    #[must_use]
    pub fn mean_height(&self) -> Option<f64> {
        let surfaced = self.columns - self.void_columns;
        (surfaced > 0).then(|| self.height_sum as f64 / surfaced as f64)
    }

    /// Most common surface blocks, most frequent first.
    #[must_use]
    pub fn top_blocks(&self, n: usize) -> Vec<(BlockId, u64)> {
        top(&self.blocks, n)
    }

    /// Most common surface biomes, most frequent first.
    #[must_use]
    pub fn top_biomes(&self, n: usize) -> Vec<(BiomeId, u64)> {
        top(&self.biomes, n)
    }

    /// One-line report.
    #[must_use]
    pub fn summary(&self, blocks: &BlockRegistry) -> String {
        let mut out = format!("{} chunks, {} columns", self.chunks, self.columns);
        if let (Some(min), Some(max), Some(mean)) = (self.min_y, self.max_y, self.mean_height()) {
            let _ = write!(out, ", surface y {min}..{max} (mean {mean:.1})");
        }
        if self.columns > 0 {
            let fluid = self.fluid_columns as f64 * 100.0 / self.columns as f64;
            let _ = write!(out, ", {fluid:.1}% fluid");
        }
        let surfaced = (self.columns - self.void_columns).max(1) as f64;
        for (id, n) in self.top_blocks(3) {
            let _ = write!(out, ", {} {:.1}%", blocks.info(id).name, n as f64 * 100.0 / surfaced);
        }
        let biomes = BiomeRegistry::global();
        for (id, n) in self.top_biomes(3) {
            let _ = write!(out, ", {} {:.1}%", biomes.get(id).key, n as f64 * 100.0 / surfaced);
        }
        out
    }
}

fn top<K: Copy + Ord>(counts: &HashMap<K, u64>, n: usize) -> Vec<(K, u64)> {
    let mut sorted: Vec<_> = counts.iter().map(|(&k, &v)| (k, v)).collect();
    sorted.sort_unstable_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    sorted.truncate(n);
    sorted
}

/// Accumulates [`SurfaceStats`] per world. Clones share one accumulator.
#[derive(Clone, Debug, Default)]
pub struct SurfaceStatsRenderer {
    worlds: Arc<Mutex<HashMap<String, SurfaceStats>>>,
}

impl SurfaceStatsRenderer {
    /// Renderer with nothing recorded.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes and returns a world's accumulated statistics.
    pub fn take(&self, world: &str) -> Option<SurfaceStats> {
        self.worlds.lock().remove(world)
    }

    /// Copy of a world's accumulated statistics.
    #[must_use]
    pub fn stats(&self, world: &str) -> Option<SurfaceStats> {
        self.worlds.lock().get(world).cloned()
    }
}

impl RegionRenderer for SurfaceStatsRenderer {
    fn render_region(&self, world: &World, region: &Arc<Region>) -> RenderResult<()> {
        let mut local = SurfaceStats::default();
        let origin = region.pos();
        for cz in 0..32 {
            for cx in 0..32 {
                let (chunk_x, chunk_z) = (origin.chunk_x() + cx, origin.chunk_z() + cz);
                if !region.has_chunk(chunk_x, chunk_z) {
                    continue;
                }
                let chunk = region.chunk(chunk_x, chunk_z);
                if chunk.is_empty() {
                    continue;
                }
                local.chunks += 1;
                let (bx, bz) = (chunk.pos().block_x(), chunk.pos().block_z());
                for z in 0..16 {
                    for x in 0..16 {
                        let Some(column) = chunk.surface(x, z) else {
                            continue;
                        };
                        let biome = column
                            .terrain
                            .map(|t| world.biome_at(Some(region), bx + x, t.y, bz + z));
                        local.record(column, biome);
                    }
                }
            }
        }
        self.worlds
            .lock()
            .entry(world.name().to_owned())
            .or_default()
            .merge(&local);
        Ok(())
    }
}
