//! # Region Store
//!
//! Bounded cache of loaded regions for one world.
//!
//! - Keyed by [`RegionPos::key`].
//! - Bounded by entry count (least recently used goes first) and by age
//!   since the entry was written.
//! - Eviction only drops the cache's reference. Workers holding an
//!   `Arc<Region>` keep using it undisturbed.
//! - At most one live cached instance per region: loads happen outside the
//!   lock and the first insert wins.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::chunk::Chunk;
use crate::error::WorldResult;
use crate::region::{DecodeStatsSnapshot, Region, RegionContext, RegionPos};

/// Cache bounds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum cached regions (at least 1).
    pub max_regions: usize,
    /// Seconds after which a cached region is reloaded; 0 never expires.
    pub expire_after_write_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_regions: 64,
            expire_after_write_secs: 300,
        }
    }
}

struct CacheEntry {
    region: Arc<Region>,
    written: Instant,
}

/// Region cache for one world.
pub struct RegionStore {
    context: Arc<RegionContext>,
    ttl: Option<Duration>,
    cache: Mutex<LruCache<i64, CacheEntry>>,
}

impl RegionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new(context: Arc<RegionContext>, config: &CacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.max_regions).unwrap_or(NonZeroUsize::MIN);
        Self {
            context,
            ttl: (config.expire_after_write_secs > 0)
                .then(|| Duration::from_secs(config.expire_after_write_secs)),
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Shared decode context.
    #[must_use]
    pub fn context(&self) -> &Arc<RegionContext> {
        &self.context
    }

    fn is_fresh(&self, entry: &CacheEntry) -> bool {
        self.ttl.map_or(true, |ttl| entry.written.elapsed() < ttl)
    }

    fn cached(&self, key: i64) -> Option<Arc<Region>> {
        let mut cache = self.cache.lock();
        match cache.get(&key) {
            Some(entry) if self.is_fresh(entry) => Some(Arc::clone(&entry.region)),
            Some(_) => {
                cache.pop(&key);
                None
            }
            None => None,
        }
    }

    /// Loads a region, degrading to the empty region on failure.
    fn load(&self, pos: RegionPos) -> Region {
        Region::load(Arc::clone(&self.context), pos).unwrap_or_else(|error| {
            tracing::warn!(region = %pos, %error, "region load failed, using empty region");
            Region::empty(Arc::clone(&self.context), pos)
        })
    }

    /// Returns the cached region or loads it.
    #[must_use]
    pub fn get_region(&self, pos: RegionPos) -> Arc<Region> {
        let key = pos.key();
        if let Some(region) = self.cached(key) {
            return region;
        }

        let loaded = Arc::new(self.load(pos));

        let mut cache = self.cache.lock();
        if let Some(entry) = cache.get(&key) {
            if self.is_fresh(entry) {
                return Arc::clone(&entry.region);
            }
        }
        cache.put(
            key,
            CacheEntry {
                region: Arc::clone(&loaded),
                written: Instant::now(),
            },
        );
        loaded
    }

    /// Decoded chunk at absolute chunk coordinates.
    ///
    /// `region` is used directly when it already covers the chunk.
    #[must_use]
    pub fn get_chunk(&self, region: Option<&Arc<Region>>, chunk_x: i32, chunk_z: i32) -> Arc<Chunk> {
        let pos = RegionPos::from_chunk(chunk_x, chunk_z);
        match region {
            Some(region) if region.pos() == pos => region.chunk(chunk_x, chunk_z),
            _ => self.get_region(pos).chunk(chunk_x, chunk_z),
        }
    }

    /// Drops a region from the cache. Returns true if it was cached.
    pub fn unload_region(&self, pos: RegionPos) -> bool {
        self.cache.lock().pop(&pos.key()).is_some()
    }

    /// Reloads a region from disk, replacing the cached instance.
    ///
    /// # Errors
    ///
    /// On failure the previously cached instance stays in place and the
    /// error is returned.
    pub fn refresh_region(&self, pos: RegionPos) -> WorldResult<Arc<Region>> {
        let region = match Region::load(Arc::clone(&self.context), pos) {
            Ok(region) => Arc::new(region),
            Err(error) => {
                tracing::warn!(region = %pos, %error, "region refresh failed, keeping last good state");
                return Err(error);
            }
        };
        self.cache.lock().put(
            pos.key(),
            CacheEntry {
                region: Arc::clone(&region),
                written: Instant::now(),
            },
        );
        Ok(region)
    }

    /// Returns true if a fresh instance is cached.
    #[must_use]
    pub fn is_cached(&self, pos: RegionPos) -> bool {
        self.cache
            .lock()
            .peek(&pos.key())
            .is_some_and(|entry| self.is_fresh(entry))
    }

    /// Number of cached regions, expired entries included.
    #[must_use]
    pub fn cached_regions(&self) -> usize {
        self.cache.lock().len()
    }

    /// Drops every expired entry.
    pub fn evict_expired(&self) {
        let mut cache = self.cache.lock();
        let expired: Vec<i64> = cache
            .iter()
            .filter(|(_, entry)| !self.is_fresh(entry))
            .map(|(&key, _)| key)
            .collect();
        for key in expired {
            cache.pop(&key);
        }
    }

    /// Drops everything.
    pub fn clear(&self) {
        self.cache.lock().clear();
    }

    /// Decode counters for this world.
    #[must_use]
    pub fn stats(&self) -> DecodeStatsSnapshot {
        self.context.stats.snapshot()
    }
}
