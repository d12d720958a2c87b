//! # Progress Reporting
//!
//! Lock-free counters for one world run, read by status surfaces while
//! workers update them.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Counters for one world run.
#[derive(Debug)]
pub struct Progress {
    regions_total: AtomicU64,
    regions_done: AtomicU64,
    regions_skipped: AtomicU64,
    regions_failed: AtomicU64,
    chunks_total: AtomicU64,
    chunks_done: AtomicU64,
    started: AtomicBool,
    start: Mutex<Option<Instant>>,
    last_activity: Mutex<Instant>,
}

impl Default for Progress {
    fn default() -> Self {
        Self::new()
    }
}

impl Progress {
    /// Fresh counters.
    #[must_use]
    pub fn new() -> Self {
        Self {
            regions_total: AtomicU64::new(0),
            regions_done: AtomicU64::new(0),
            regions_skipped: AtomicU64::new(0),
            regions_failed: AtomicU64::new(0),
            chunks_total: AtomicU64::new(0),
            chunks_done: AtomicU64::new(0),
            started: AtomicBool::new(false),
            start: Mutex::new(None),
            last_activity: Mutex::new(Instant::now()),
        }
    }

    /// Marks the run started. Returns true on the first call only.
    pub fn start(&self) -> bool {
        if self.started.swap(true, Ordering::AcqRel) {
            return false;
        }
        *self.start.lock() = Some(Instant::now());
        self.touch();
        true
    }

    /// Returns true once the first region has been pulled.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// Records forward progress for the stall watchdog.
    pub fn touch(&self) {
        *self.last_activity.lock() = Instant::now();
    }

    /// Time since the last forward progress.
    #[must_use]
    pub fn idle(&self) -> Duration {
        self.last_activity.lock().elapsed()
    }

    /// Regions added to the run.
    pub fn add_regions(&self, count: u64) {
        self.regions_total.fetch_add(count, Ordering::Relaxed);
    }

    /// A region is about to be rendered.
    pub fn add_chunks(&self, count: u64) {
        self.chunks_total.fetch_add(count, Ordering::Relaxed);
    }

    /// A region was rendered.
    pub fn region_finished(&self, chunks: u64) {
        self.chunks_done.fetch_add(chunks, Ordering::Relaxed);
        self.regions_done.fetch_add(1, Ordering::Relaxed);
        self.touch();
    }

    /// A region was unchanged and skipped.
    pub fn region_skipped(&self) {
        self.regions_skipped.fetch_add(1, Ordering::Relaxed);
        self.regions_done.fetch_add(1, Ordering::Relaxed);
        self.touch();
    }

    /// A region failed to render.
    pub fn region_failed(&self) {
        self.regions_failed.fetch_add(1, Ordering::Relaxed);
        self.regions_done.fetch_add(1, Ordering::Relaxed);
        self.touch();
    }

    /// Point-in-time copy of the counters.
    #[must_use]
    pub fn snapshot(&self, world: &str) -> ProgressSnapshot {
        ProgressSnapshot {
            world: world.to_owned(),
            regions_total: self.regions_total.load(Ordering::Relaxed),
            regions_done: self.regions_done.load(Ordering::Relaxed),
            regions_skipped: self.regions_skipped.load(Ordering::Relaxed),
            regions_failed: self.regions_failed.load(Ordering::Relaxed),
            chunks_total: self.chunks_total.load(Ordering::Relaxed),
            chunks_done: self.chunks_done.load(Ordering::Relaxed),
            elapsed: self.start.lock().map_or(Duration::ZERO, |start| start.elapsed()),
        }
    }
}

/// Copy of a run's counters.
#[derive(Clone, Debug, PartialEq)]
pub struct ProgressSnapshot {
    /// World name.
    pub world: String,
    /// Regions queued in this run.
    pub regions_total: u64,
    /// Regions finished, skipped or failed.
    pub regions_done: u64,
    /// Regions skipped as unchanged.
    pub regions_skipped: u64,
    /// Regions whose render failed.
    pub regions_failed: u64,
    /// Chunks in regions started so far.
    pub chunks_total: u64,
    /// Chunks rendered.
    pub chunks_done: u64,
    /// Time since the first region was pulled.
    pub elapsed: Duration,
}

impl ProgressSnapshot {
    /// Chunks per second, 0 before any time has elapsed.
    #[must_use]
    pub fn cps(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.chunks_done as f64 / secs
        } else {
            0.0
        }
    }

    /// Estimated time left, extrapolated from the region rate.
    #[must_use]
    pub fn eta(&self) -> Option<Duration> {
        if self.regions_done == 0 || self.elapsed.is_zero() {
            return None;
        }
        let remaining = self.regions_total.saturating_sub(self.regions_done);
        let per_region = self.elapsed.as_secs_f64() / self.regions_done as f64;
        Some(Duration::from_secs_f64(per_region * remaining as f64))
    }

    /// ETA as `"1h 2m 3s"`, or `"Unknown"`.
    #[must_use]
    pub fn eta_string(&self) -> String {
        format_eta(self.eta())
    }
}

impl fmt::Display for ProgressSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}/{} regions, {} chunks, {:.1} cps, ETA {}",
            self.world,
            self.regions_done,
            self.regions_total,
            self.chunks_done,
            self.cps(),
            self.eta_string()
        )
    }
}

/// Formats a duration as `"1h 2m 3s"`, `"4m 5s"` or `"6s"`.
#[must_use]
pub fn format_eta(eta: Option<Duration>) -> String {
    let Some(eta) = eta else {
        return "Unknown".to_owned();
    };
    let secs = eta.as_secs();
    let (h, m, s) = (secs / 3600, secs / 60 % 60, secs % 60);
    if h > 0 {
        format!("{h}h {m}m {s}s")
    } else if m > 0 {
        format!("{m}m {s}s")
    } else {
        format!("{s}s")
    }
}
