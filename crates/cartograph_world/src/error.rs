//! # World Error Types
//!
//! All errors that can occur while decoding world storage.
//!
//! None of these are fatal to a batch: a chunk that fails to decode becomes
//! the empty chunk, a region that fails to load becomes the empty region.

use std::io;

use thiserror::Error;

/// Errors that can occur while reading region containers and chunk documents.
#[derive(Error, Debug)]
pub enum WorldError {
    /// Corrupt or truncated tagged-binary document, or a packed array that
    /// does not cover its declared entry count.
    #[error("malformed data: {0}")]
    MalformedData(String),

    /// The compression tag in front of a chunk payload is not recognised.
    #[error("unsupported compression type: {0}")]
    UnsupportedCompression(u8),

    /// The chunk document matches none of the known schema generations.
    #[error("unsupported chunk schema: {0}")]
    UnsupportedSchema(String),

    /// A chunk flagged as external has no sibling `.mcc` file.
    #[error("external chunk file missing for chunk ({x}, {z})")]
    MissingExternalChunk {
        /// Absolute chunk X.
        x: i32,
        /// Absolute chunk Z.
        z: i32,
    },

    /// Container file could not be read.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

impl WorldError {
    /// Shorthand for [`WorldError::MalformedData`].
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedData(msg.into())
    }
}

/// Result type for world decoding operations.
pub type WorldResult<T> = Result<T, WorldError>;
