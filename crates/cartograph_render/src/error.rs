//! # Render Error Types
//!
//! Errors surfaced by the scheduler and the modification tracker.

use std::io;
use std::time::Duration;

use cartograph_world::WorldError;
use thiserror::Error;

/// Errors that can occur while scheduling and rendering regions.
#[derive(Error, Debug)]
pub enum RenderError {
    /// A world made no forward progress for the configured timeout.
    #[error("world '{world}' made no progress for {idle:?}")]
    StallTimeout {
        /// World name.
        world: String,
        /// Time since the last progress.
        idle: Duration,
    },

    /// The renderer rejected a region.
    #[error("renderer failed: {0}")]
    Renderer(String),

    /// World storage could not be read.
    #[error(transparent)]
    World(#[from] WorldError),

    /// Tracker or directory I/O failed.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    /// A tracker file exists but cannot be decoded.
    #[error("tracker file corrupt: {0}")]
    TrackerCorrupt(String),

    /// No world is registered under this name.
    #[error("unknown world: {0}")]
    UnknownWorld(String),
}

/// Result type for render operations.
pub type RenderResult<T> = Result<T, RenderError>;
