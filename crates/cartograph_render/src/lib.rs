//! # Cartograph Render
//!
//! Drives region decoding and rendering over live worlds, incrementally.
//!
//! ## Design Principles
//!
//! 1. **Incremental**: unchanged regions are skipped using persisted file times
//! 2. **Cooperative**: pause and cancel act between regions, never inside one
//! 3. **Self-healing**: a stalled world is cancelled, other worlds carry on
//!
//! ## Core Components
//!
//! - `ModificationTracker`: region -> last rendered file time, per world
//! - `RenderScheduler`: per-world queues, worker pool, watchdog
//! - `Progress`: atomic counters with rate and ETA
//! - `RegionWatcher`: detects region files changed on disk
//!
//! ## Example
//!
//! ```rust,ignore
//! use cartograph_render::{RenderScheduler, SchedulerConfig};
//!
//! let scheduler = RenderScheduler::new(SchedulerConfig::default(), MyRenderer)?;
//! scheduler.register_world(world);
//! scheduler.add_world("overworld")?;
//! for event in scheduler.events() {
//!     println!("{event:?}");
//! }
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod error;
pub mod progress;
pub mod renderer;
pub mod scheduler;
pub mod tracker;
pub mod watcher;

pub use config::SchedulerConfig;
pub use error::{RenderError, RenderResult};
pub use progress::{format_eta, Progress, ProgressSnapshot};
pub use renderer::RegionRenderer;
pub use scheduler::{RenderScheduler, SchedulerEvent};
pub use tracker::ModificationTracker;
pub use watcher::RegionWatcher;
