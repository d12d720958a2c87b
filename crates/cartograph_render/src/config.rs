//! # Scheduler Configuration
//!
//! Loaded once at startup as the `[scheduler]` table.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Worker pool and checkpoint settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Worker threads; 0 derives the count from the hardware.
    pub worker_threads: usize,
    /// Seconds without progress before a world is cancelled; 0 disables.
    pub stall_timeout_secs: u64,
    /// Regions between tracker saves; 0 saves only when a run ends.
    pub checkpoint_interval: usize,
    /// Region directory polling period; 0 disables the watcher.
    pub watch_interval_ms: u64,
    /// Directory holding one tracker file per world.
    pub tracker_dir: PathBuf,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            worker_threads: 0,
            stall_timeout_secs: 600,
            checkpoint_interval: 50,
            watch_interval_ms: 10_000,
            tracker_dir: PathBuf::from("trackers"),
        }
    }
}

impl SchedulerConfig {
    /// Effective worker count: the configured value, or half the hardware
    /// threads (at least one) when unset.
    #[must_use]
    pub fn workers(&self) -> usize {
        if self.worker_threads > 0 {
            return self.worker_threads;
        }
        let cores = std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get);
        (cores / 2).max(1)
    }

    /// Stall timeout, `None` when disabled.
    #[must_use]
    pub const fn stall_timeout(&self) -> Option<Duration> {
        if self.stall_timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.stall_timeout_secs))
        }
    }

    /// Watcher polling period, `None` when disabled.
    #[must_use]
    pub const fn watch_interval(&self) -> Option<Duration> {
        if self.watch_interval_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.watch_interval_ms))
        }
    }

    /// Tracker file for a world.
    #[must_use]
    pub fn tracker_path(&self, world: &str) -> PathBuf {
        self.tracker_dir.join(format!("{world}.tracker"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_workers() {
        let config = SchedulerConfig::default();
        assert!(config.workers() >= 1);

        let fixed = SchedulerConfig {
            worker_threads: 3,
            ..SchedulerConfig::default()
        };
        assert_eq!(fixed.workers(), 3);
    }

    #[test]
    fn test_zero_disables() {
        let config = SchedulerConfig {
            stall_timeout_secs: 0,
            watch_interval_ms: 0,
            ..SchedulerConfig::default()
        };
        assert_eq!(config.stall_timeout(), None);
        assert_eq!(config.watch_interval(), None);
        assert_eq!(
            SchedulerConfig::default().tracker_path("overworld"),
            PathBuf::from("trackers/overworld.tracker")
        );
    }
}
