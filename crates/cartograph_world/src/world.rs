//! # World Handle
//!
//! Ties a world's configuration to its region store and biome sampler.
//! This is the query surface a renderer works against.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::UNIX_EPOCH;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::biome::BiomeId;
use crate::biome_sampler::BiomeSampler;
use crate::block::{BlockRegistry, BlockState};
use crate::chunk::{Chunk, ChunkSettings};
use crate::region::{self, Region, RegionContext, RegionPos};
use crate::region_store::{CacheConfig, RegionStore};

/// Per-world settings, one `[[worlds]]` table in the config file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Display name, also the tracker file name.
    pub name: String,
    /// Directory holding `r.<x>.<z>.mca` files.
    pub region_dir: PathBuf,
    /// Hashed biome-zoom seed, as stored in chunk-era level data.
    /// Ignored when `raw_seed` is set.
    pub seed: i64,
    /// Level seed as shown in game; hashed into the biome-zoom seed.
    pub raw_seed: Option<i64>,
    /// Light level reported above the highest section.
    pub skylight: u8,
    /// The dimension has a solid roof.
    pub has_ceiling: bool,
    /// Lowest block y of the dimension.
    pub min_build_height: i32,
    /// Drop block palettes after the surface scan.
    pub release_block_storage: bool,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            name: "world".to_owned(),
            region_dir: PathBuf::from("world/region"),
            seed: 0,
            raw_seed: None,
            skylight: 15,
            has_ceiling: false,
            min_build_height: -64,
            release_block_storage: true,
        }
    }
}

impl WorldConfig {
    /// Seed the biome sampler runs with.
    #[must_use]
    pub fn biome_seed(&self) -> i64 {
        self.raw_seed.map_or(self.seed, hash_seed)
    }

    /// Chunk-level view of these settings.
    #[must_use]
    pub const fn chunk_settings(&self) -> ChunkSettings {
        ChunkSettings {
            skylight: self.skylight,
            has_ceiling: self.has_ceiling,
            min_build_height: self.min_build_height,
            release_block_storage: self.release_block_storage,
        }
    }
}

/// One world: configuration, region cache and biome sampler.
pub struct World {
    config: WorldConfig,
    store: RegionStore,
    sampler: BiomeSampler,
}

impl World {
    /// Opens a world. Nothing is read until the first query.
    #[must_use]
    pub fn new(config: WorldConfig, blocks: Arc<BlockRegistry>, cache: &CacheConfig) -> Self {
        let context = RegionContext::new(config.region_dir.clone(), blocks, config.chunk_settings());
        Self {
            sampler: BiomeSampler::new(config.biome_seed()),
            store: RegionStore::new(Arc::new(context), cache),
            config,
        }
    }

    /// World name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// World settings.
    #[must_use]
    pub const fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Region cache.
    #[must_use]
    pub const fn store(&self) -> &RegionStore {
        &self.store
    }

    /// Block table used for decoding.
    #[must_use]
    pub fn blocks(&self) -> &BlockRegistry {
        &self.store.context().blocks
    }

    /// Biome sampler for this world's seed.
    #[must_use]
    pub const fn sampler(&self) -> BiomeSampler {
        self.sampler
    }

    /// Path of a region file.
    #[must_use]
    pub fn region_path(&self, pos: RegionPos) -> PathBuf {
        self.config.region_dir.join(pos.file_name())
    }

    /// Every region file currently on disk.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the region directory cannot be read.
    pub fn list_regions(&self) -> io::Result<Vec<RegionPos>> {
        region::list_regions(&self.config.region_dir)
    }

    /// Modification time of a region file in unix milliseconds.
    ///
    /// `None` when the file is missing or its time is unavailable.
    #[must_use]
    pub fn region_modified(&self, pos: RegionPos) -> Option<i64> {
        let modified = fs::metadata(self.region_path(pos)).ok()?.modified().ok()?;
        let millis = modified.duration_since(UNIX_EPOCH).ok()?.as_millis();
        i64::try_from(millis).ok()
    }

    /// Loaded region.
    #[must_use]
    pub fn region(&self, pos: RegionPos) -> Arc<Region> {
        self.store.get_region(pos)
    }

    /// Decoded chunk at chunk coordinates.
    #[must_use]
    pub fn chunk(&self, chunk_x: i32, chunk_z: i32) -> Arc<Chunk> {
        self.store.get_chunk(None, chunk_x, chunk_z)
    }

    /// Block state at block coordinates.
    #[must_use]
    pub fn block_at(&self, x: i32, y: i32, z: i32) -> BlockState {
        self.chunk(x >> 4, z >> 4).get_block_state(x, y, z)
    }

    /// Smoothed biome at block coordinates.
    ///
    /// `region` is a hint reused when it covers the chosen cell.
    #[must_use]
    pub fn biome_at(&self, region: Option<&Arc<Region>>, x: i32, y: i32, z: i32) -> BiomeId {
        self.sampler.sample(x, y, z, |qx, qy, qz| {
            let (bx, by, bz) = (qx << 2, qy << 2, qz << 2);
            self.store
                .get_chunk(region, bx >> 4, bz >> 4)
                .get_biome(bx, by, bz)
        })
    }
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("name", &self.config.name)
            .field("region_dir", &self.config.region_dir)
            .finish_non_exhaustive()
    }
}

/// First eight bytes, little-endian, of the SHA-256 of the seed's
/// little-endian encoding.
#[must_use]
pub fn hash_seed(seed: i64) -> i64 {
    let digest = Sha256::digest(seed.to_le_bytes());
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    i64::from_le_bytes(head)
}
