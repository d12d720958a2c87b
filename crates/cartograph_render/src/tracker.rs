//! # Modification Tracker
//!
//! Persisted map of region -> file modification time (unix millis) at the
//! moment the region was last fully rendered. A region whose file still has
//! that time can be skipped.
//!
//! ## File Format
//!
//! ```text
//! [uncompressed len:4 LE][lz4 block]
//!     payload = [count:4 BE] ([region key:8 BE][millis:8 BE]) * count
//! ```
//!
//! During a run the map is only inserted into or overwritten, and it reaches
//! the disk at checkpoints chosen by the caller.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use cartograph_world::RegionPos;
use parking_lot::Mutex;

use crate::error::{RenderError, RenderResult};

const ENTRY_BYTES: usize = 16;

/// Largest entry count accepted from disk.
const MAX_ENTRIES: usize = 1 << 22;

/// Per-world region timestamps.
#[derive(Debug)]
pub struct ModificationTracker {
    path: PathBuf,
    entries: Mutex<HashMap<i64, i64>>,
    dirty: AtomicBool,
}

impl ModificationTracker {
    /// Empty tracker that saves to `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: Mutex::new(HashMap::new()),
            dirty: AtomicBool::new(false),
        }
    }

    /// Loads a tracker. A missing file is an empty tracker.
    ///
    /// # Errors
    ///
    /// [`RenderError::TrackerCorrupt`] if the file cannot be decoded,
    /// [`RenderError::Io`] if it cannot be read.
    pub fn load(path: impl Into<PathBuf>) -> RenderResult<Self> {
        let path = path.into();
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::new(path)),
            Err(e) => return Err(e.into()),
        };
        let entries = decode(&bytes)?;
        tracing::debug!(path = %path.display(), entries = entries.len(), "tracker loaded");
        Ok(Self {
            path,
            entries: Mutex::new(entries),
            dirty: AtomicBool::new(false),
        })
    }

    /// Loads a tracker, starting empty if the file is unreadable.
    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self::load(path.clone()).unwrap_or_else(|error| {
            tracing::warn!(path = %path.display(), %error, "tracker unreadable, starting empty");
            Self::new(path)
        })
    }

    /// Writes the tracker atomically (temp file then rename).
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the file cannot be written.
    pub fn save(&self) -> RenderResult<()> {
        let bytes = {
            let entries = self.entries.lock();
            self.dirty.store(false, Ordering::Release);
            encode(&entries)
        };
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("tracker.tmp");
        let written = fs::write(&tmp, &bytes).and_then(|()| fs::rename(&tmp, &self.path));
        if let Err(e) = written {
            self.dirty.store(true, Ordering::Release);
            return Err(e.into());
        }
        tracing::debug!(path = %self.path.display(), bytes = bytes.len(), "tracker saved");
        Ok(())
    }

    /// Saves only if something changed since the last save.
    ///
    /// # Errors
    ///
    /// See [`ModificationTracker::save`].
    pub fn save_if_dirty(&self) -> RenderResult<()> {
        if self.is_dirty() {
            self.save()
        } else {
            Ok(())
        }
    }

    /// Tracked timestamp of a region.
    #[must_use]
    pub fn get(&self, pos: RegionPos) -> Option<i64> {
        self.entries.lock().get(&pos.key()).copied()
    }

    /// Records a region's timestamp, overwriting any previous value.
    pub fn set(&self, pos: RegionPos, millis: i64) {
        self.entries.lock().insert(pos.key(), millis);
        self.dirty.store(true, Ordering::Release);
    }

    /// Forgets a region.
    pub fn remove(&self, pos: RegionPos) -> Option<i64> {
        let removed = self.entries.lock().remove(&pos.key());
        if removed.is_some() {
            self.dirty.store(true, Ordering::Release);
        }
        removed
    }

    /// All tracked regions.
    #[must_use]
    pub fn entries(&self) -> Vec<(RegionPos, i64)> {
        let mut entries: Vec<_> = self
            .entries
            .lock()
            .iter()
            .map(|(&key, &millis)| (RegionPos::from_key(key), millis))
            .collect();
        entries.sort_unstable();
        entries
    }

    /// Number of tracked regions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if nothing is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Returns true if there are unsaved changes.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn encode(entries: &HashMap<i64, i64>) -> Vec<u8> {
    let mut payload = Vec::with_capacity(4 + entries.len() * ENTRY_BYTES);
    payload.extend_from_slice(&(entries.len() as u32).to_be_bytes());
    for (&key, &millis) in entries {
        payload.extend_from_slice(&key.to_be_bytes());
        payload.extend_from_slice(&millis.to_be_bytes());
    }
    lz4_flex::compress_prepend_size(&payload)
}

fn decode(bytes: &[u8]) -> RenderResult<HashMap<i64, i64>> {
    let corrupt = |msg: &str| RenderError::TrackerCorrupt(msg.to_owned());

    let Some((size, block)) = bytes.split_first_chunk::<4>() else {
        return Err(corrupt("missing length prefix"));
    };
    let size = u32::from_le_bytes(*size) as usize;
    if size < 4 || size > 4 + MAX_ENTRIES * ENTRY_BYTES {
        return Err(corrupt("implausible payload length"));
    }
    let payload = lz4_flex::block::decompress(block, size).map_err(|e| corrupt(&e.to_string()))?;

    let Some((count, rest)) = payload.split_first_chunk::<4>() else {
        return Err(corrupt("missing entry count"));
    };
    let count = u32::from_be_bytes(*count) as usize;
    if rest.len() != count * ENTRY_BYTES {
        return Err(corrupt("entry count does not match payload"));
    }

    let mut entries = HashMap::with_capacity(count);
    for entry in rest.chunks_exact(ENTRY_BYTES) {
        let (key, millis) = entry.split_at(8);
        let key = i64::from_be_bytes(key.try_into().map_err(|_| corrupt("short key"))?);
        let millis = i64::from_be_bytes(millis.try_into().map_err(|_| corrupt("short timestamp"))?);
        entries.insert(key, millis);
    }
    Ok(entries)
}
