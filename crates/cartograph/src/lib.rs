//! # Cartograph
//!
//! Headless renderer over the region scheduler: configuration, logging and
//! a statistics-only renderer.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod logging;
pub mod surface;

pub use config::{AppConfig, ConfigError};
pub use logging::init_logging;
pub use surface::{SurfaceStats, SurfaceStatsRenderer};
