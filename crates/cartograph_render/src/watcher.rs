//! # Region Watcher
//!
//! Polls region directories and reports region files whose modification
//! time moved since the previous poll. The first poll of a world only
//! records a baseline.

use std::collections::HashMap;

use cartograph_world::{RegionPos, World};

/// Last seen file times per world.
#[derive(Debug, Default)]
pub struct RegionWatcher {
    seen: HashMap<String, HashMap<RegionPos, i64>>,
}

impl RegionWatcher {
    /// Watcher with no baseline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Regions of `world` that changed or appeared since the last poll.
    pub fn poll(&mut self, world: &World) -> Vec<RegionPos> {
        let regions = match world.list_regions() {
            Ok(regions) => regions,
            Err(error) => {
                tracing::warn!(world = %world.name(), %error, "region directory unreadable");
                return Vec::new();
            }
        };

        let baseline = !self.seen.contains_key(world.name());
        let seen = self.seen.entry(world.name().to_owned()).or_default();
        let mut current = HashMap::with_capacity(regions.len());
        let mut changed = Vec::new();
        for pos in regions {
            let Some(modified) = world.region_modified(pos) else {
                continue;
            };
            if !baseline && seen.get(&pos) != Some(&modified) {
                changed.push(pos);
            }
            current.insert(pos, modified);
        }
        *seen = current;
        changed
    }
}
