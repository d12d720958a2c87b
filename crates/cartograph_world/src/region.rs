//! # Region Containers
//!
//! A region file stores up to 32x32 chunks behind a fixed two-table header.
//!
//! ## Container Format
//!
//! ```text
//! [0..4096)     1024 x [3 bytes: sector offset][1 byte: sector count]  (BE)
//! [4096..8192)  1024 x [4 bytes: last write, unix seconds]             (BE)
//! [8192..)      4096-byte sectors:
//!               [4 bytes: length][1 byte: compression tag][length-1 bytes]
//! ```
//!
//! Chunk slot `i` belongs to chunk `(i & 31, i >> 5)` of the region, i.e.
//! `slot = (chunk_x & 31) + 32 * (chunk_z & 31)` for absolute coordinates.
//!
//! Chunks decode lazily, once per slot. A slot that fails to decode holds
//! the empty chunk; its siblings are unaffected.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use crate::biome::BiomeRegistry;
use crate::block::BlockRegistry;
use crate::chunk::{Chunk, ChunkPos, ChunkSettings};
use crate::compression::Compression;
use crate::error::{WorldError, WorldResult};
use crate::nbt::{self, NbtCompound};
use crate::schema::{self, DecodeContext};

/// Sector size in bytes.
pub const SECTOR_BYTES: usize = 4096;

/// Chunk slots per region.
pub const CHUNKS_PER_REGION: usize = 1024;

/// Bytes of the two header tables.
pub const HEADER_BYTES: usize = 2 * SECTOR_BYTES;

/// Region coordinate (identifies a region file in the world grid).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionPos {
    /// X coordinate (in regions).
    pub x: i32,
    /// Z coordinate (in regions).
    pub z: i32,
}

impl RegionPos {
    /// Creates a new region coordinate.
    #[inline]
    #[must_use]
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Region containing a chunk.
    #[inline]
    #[must_use]
    pub const fn from_chunk(chunk_x: i32, chunk_z: i32) -> Self {
        Self {
            x: chunk_x >> 5,
            z: chunk_z >> 5,
        }
    }

    /// Packs both coordinates into one integer.
    #[inline]
    #[must_use]
    pub const fn key(self) -> i64 {
        (self.x as u32 as i64) | ((self.z as i64) << 32)
    }

    /// Inverse of [`RegionPos::key`].
    #[inline]
    #[must_use]
    pub const fn from_key(key: i64) -> Self {
        Self {
            x: key as i32,
            z: (key >> 32) as i32,
        }
    }

    /// First chunk X of the region.
    #[inline]
    #[must_use]
    pub const fn chunk_x(self) -> i32 {
        self.x << 5
    }

    /// First chunk Z of the region.
    #[inline]
    #[must_use]
    pub const fn chunk_z(self) -> i32 {
        self.z << 5
    }

    /// File name, `r.<x>.<z>.mca`.
    #[must_use]
    pub fn file_name(self) -> String {
        format!("r.{}.{}.mca", self.x, self.z)
    }

    /// Parses `r.<x>.<z>.mca`.
    #[must_use]
    pub fn parse_file_name(name: &str) -> Option<Self> {
        let inner = name.strip_prefix("r.")?.strip_suffix(".mca")?;
        let (x, z) = inner.split_once('.')?;
        Some(Self::new(x.parse().ok()?, z.parse().ok()?))
    }
}

impl std::fmt::Display for RegionPos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

/// Lists every region file in a directory. A missing directory is empty.
///
/// # Errors
///
/// Returns the I/O error if the directory exists but cannot be read.
pub fn list_regions(dir: &Path) -> io::Result<Vec<RegionPos>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };
    let mut regions = Vec::new();
    for entry in entries {
        let entry = entry?;
        if let Some(pos) = entry.file_name().to_str().and_then(RegionPos::parse_file_name) {
            regions.push(pos);
        }
    }
    regions.sort_unstable();
    Ok(regions)
}

/// Decode counters shared by every region of one world.
#[derive(Debug, Default)]
pub struct DecodeStats {
    regions_loaded: AtomicU64,
    chunks_decoded: AtomicU64,
    chunks_failed: AtomicU64,
}

/// Point-in-time copy of [`DecodeStats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DecodeStatsSnapshot {
    /// Region files read from disk.
    pub regions_loaded: u64,
    /// Chunk payloads decoded, including failures.
    pub chunks_decoded: u64,
    /// Chunk payloads that failed and became the empty chunk.
    pub chunks_failed: u64,
}

impl DecodeStats {
    /// Reads all counters.
    #[must_use]
    pub fn snapshot(&self) -> DecodeStatsSnapshot {
        DecodeStatsSnapshot {
            regions_loaded: self.regions_loaded.load(Ordering::Relaxed),
            chunks_decoded: self.chunks_decoded.load(Ordering::Relaxed),
            chunks_failed: self.chunks_failed.load(Ordering::Relaxed),
        }
    }
}

/// World-wide decode inputs shared by all regions.
#[derive(Debug)]
pub struct RegionContext {
    /// Directory holding `r.*.mca` and `c.*.mcc` files.
    pub dir: PathBuf,
    /// Block table.
    pub blocks: Arc<BlockRegistry>,
    /// Biome table.
    pub biomes: &'static BiomeRegistry,
    /// Properties copied into every chunk.
    pub settings: ChunkSettings,
    /// Counters.
    pub stats: DecodeStats,
}

impl RegionContext {
    /// Creates a context with the global biome table.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, blocks: Arc<BlockRegistry>, settings: ChunkSettings) -> Self {
        Self {
            dir: dir.into(),
            blocks,
            biomes: BiomeRegistry::global(),
            settings,
            stats: DecodeStats::default(),
        }
    }

    /// Path of a region file.
    #[must_use]
    pub fn region_path(&self, pos: RegionPos) -> PathBuf {
        self.dir.join(pos.file_name())
    }
}

/// One loaded region: raw container bytes plus lazily decoded chunks.
pub struct Region {
    pos: RegionPos,
    data: Option<Box<[u8]>>,
    context: Arc<RegionContext>,
    slots: Box<[OnceLock<Arc<Chunk>>]>,
}

impl Region {
    /// Reads a region file. Missing or empty files give the empty region.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file exists but cannot be read, and
    /// `MalformedData` if it is too short to hold the header.
    pub fn load(context: Arc<RegionContext>, pos: RegionPos) -> WorldResult<Self> {
        let path = context.region_path(pos);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        context.stats.regions_loaded.fetch_add(1, Ordering::Relaxed);
        Self::from_bytes(context, pos, bytes)
    }

    /// Wraps container bytes already in memory.
    ///
    /// # Errors
    ///
    /// Returns `MalformedData` if non-empty bytes are shorter than the header.
    pub fn from_bytes(context: Arc<RegionContext>, pos: RegionPos, bytes: Vec<u8>) -> WorldResult<Self> {
        if bytes.is_empty() {
            return Ok(Self::empty(context, pos));
        }
        if bytes.len() < HEADER_BYTES {
            return Err(WorldError::malformed(format!(
                "region {pos} is {} bytes, shorter than its header",
                bytes.len()
            )));
        }
        Ok(Self {
            pos,
            data: Some(bytes.into_boxed_slice()),
            context,
            slots: new_slots(),
        })
    }

    /// A region with no chunks.
    #[must_use]
    pub fn empty(context: Arc<RegionContext>, pos: RegionPos) -> Self {
        Self {
            pos,
            data: None,
            context,
            slots: new_slots(),
        }
    }

    /// Region coordinate.
    #[inline]
    #[must_use]
    pub const fn pos(&self) -> RegionPos {
        self.pos
    }

    /// Returns true if the region has no container data.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.data.is_none()
    }

    fn header_u32(&self, table: usize, slot: usize) -> u32 {
        let Some(data) = &self.data else {
            return 0;
        };
        let at = table * SECTOR_BYTES + slot * 4;
        u32::from_be_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
    }

    /// Returns true if the header has an entry for this absolute chunk.
    #[must_use]
    pub fn has_chunk(&self, chunk_x: i32, chunk_z: i32) -> bool {
        let location = self.header_u32(0, ChunkPos::new(chunk_x, chunk_z).region_slot());
        location >> 8 != 0 && location & 0xFF != 0
    }

    /// Number of chunks present in the header.
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        (0..CHUNKS_PER_REGION)
            .filter(|&slot| {
                let location = self.header_u32(0, slot);
                location >> 8 != 0 && location & 0xFF != 0
            })
            .count()
    }

    /// Last-write time of a chunk in unix seconds, 0 if absent.
    #[must_use]
    pub fn chunk_timestamp(&self, chunk_x: i32, chunk_z: i32) -> u32 {
        self.header_u32(1, ChunkPos::new(chunk_x, chunk_z).region_slot())
    }

    /// Decoded and populated chunk at absolute chunk coordinates.
    ///
    /// Decodes on first access. Failures are logged and yield the empty
    /// chunk for this slot only.
    #[must_use]
    pub fn chunk(&self, chunk_x: i32, chunk_z: i32) -> Arc<Chunk> {
        let pos = ChunkPos::new(chunk_x, chunk_z);
        Arc::clone(self.slots[pos.region_slot()].get_or_init(|| {
            let chunk = self.decode_slot(pos).unwrap_or_else(|error| {
                self.context.stats.chunks_failed.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    region = %self.pos,
                    chunk_x,
                    chunk_z,
                    %error,
                    "chunk decode failed, using empty chunk"
                );
                Chunk::empty(pos, self.context.settings)
            });
            chunk.populate(&self.context.blocks);
            Arc::new(chunk)
        }))
    }

    fn decode_slot(&self, pos: ChunkPos) -> WorldResult<Chunk> {
        let Some(payload) = self.payload(pos)? else {
            return Ok(Chunk::empty(pos, self.context.settings));
        };
        self.context.stats.chunks_decoded.fetch_add(1, Ordering::Relaxed);
        let root = nbt::read_root(&payload)?;
        let ctx = DecodeContext {
            blocks: &self.context.blocks,
            biomes: self.context.biomes,
            settings: self.context.settings,
        };
        schema::decode_chunk(&root, pos, &ctx)
    }

    /// Decompressed chunk document, `None` if the slot is unused.
    ///
    /// # Errors
    ///
    /// Returns `MalformedData`, `UnsupportedCompression` or
    /// `MissingExternalChunk`.
    pub fn payload(&self, pos: ChunkPos) -> WorldResult<Option<Vec<u8>>> {
        let Some(data) = &self.data else {
            return Ok(None);
        };
        let location = self.header_u32(0, pos.region_slot());
        let (offset, sectors) = ((location >> 8) as usize, location & 0xFF);
        if offset == 0 || sectors == 0 {
            return Ok(None);
        }

        let start = offset * SECTOR_BYTES;
        let header = data
            .get(start..start + 5)
            .ok_or_else(|| WorldError::malformed(format!("chunk sector {offset} past end of file")))?;
        let length = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as usize;
        if length == 0 {
            return Ok(None);
        }
        let (compression, external) = Compression::from_tag(header[4])?;

        if external {
            let path = self.context.dir.join(format!("c.{}.{}.mcc", pos.x, pos.z));
            let body = fs::read(&path).map_err(|e| {
                if e.kind() == io::ErrorKind::NotFound {
                    tracing::warn!(path = %path.display(), "external chunk file missing");
                    WorldError::MissingExternalChunk { x: pos.x, z: pos.z }
                } else {
                    WorldError::Io(e)
                }
            })?;
            return compression.decompress(&body).map(Some);
        }

        let body = data
            .get(start + 5..start + 4 + length)
            .ok_or_else(|| WorldError::malformed(format!("chunk of {length} bytes overruns file")))?;
        compression.decompress(body).map(Some)
    }
}

impl std::fmt::Debug for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Region")
            .field("pos", &self.pos)
            .field("bytes", &self.data.as_ref().map_or(0, |d| d.len()))
            .finish_non_exhaustive()
    }
}

fn new_slots() -> Box<[OnceLock<Arc<Chunk>>]> {
    (0..CHUNKS_PER_REGION).map(|_| OnceLock::new()).collect()
}

/// Writes region containers; used by tooling and tests.
///
/// A chunk document that fails to encode is reported by [`build`](Self::build).
#[derive(Default)]
pub struct RegionFileBuilder {
    chunks: Vec<(usize, u32, u8, Vec<u8>)>,
    error: Option<WorldError>,
}

impl RegionFileBuilder {
    /// Creates a builder with no chunks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a chunk document at absolute chunk coordinates.
    #[must_use]
    pub fn chunk(mut self, chunk_x: i32, chunk_z: i32, root: &NbtCompound, compression: Compression) -> Self {
        match nbt::write_root("", root) {
            Ok(document) => self.raw_chunk(chunk_x, chunk_z, compression.tag(), compression.compress(&document)),
            Err(error) => {
                self.error.get_or_insert(error);
                self
            }
        }
    }

    /// Adds an already compressed payload with an arbitrary tag byte.
    #[must_use]
    pub fn raw_chunk(mut self, chunk_x: i32, chunk_z: i32, tag: u8, body: Vec<u8>) -> Self {
        let slot = ChunkPos::new(chunk_x, chunk_z).region_slot();
        self.chunks.retain(|c| c.0 != slot);
        self.chunks.push((slot, 0, tag, body));
        self
    }

    /// Sets the header timestamp of a chunk added earlier.
    #[must_use]
    pub fn timestamp(mut self, chunk_x: i32, chunk_z: i32, seconds: u32) -> Self {
        let slot = ChunkPos::new(chunk_x, chunk_z).region_slot();
        for chunk in self.chunks.iter_mut().filter(|c| c.0 == slot) {
            chunk.1 = seconds;
        }
        self
    }

    /// Serializes the container.
    ///
    /// # Errors
    ///
    /// Returns the first chunk encoding error.
    pub fn build(&mut self) -> WorldResult<Vec<u8>> {
        if let Some(error) = self.error.take() {
            return Err(error);
        }
        let mut out = vec![0u8; HEADER_BYTES];
        for (slot, timestamp, tag, body) in &self.chunks {
            let offset = out.len() / SECTOR_BYTES;
            out.extend_from_slice(&(body.len() as u32 + 1).to_be_bytes());
            out.push(*tag);
            out.extend_from_slice(body);
            out.resize(out.len().div_ceil(SECTOR_BYTES) * SECTOR_BYTES, 0);
            let sectors = out.len() / SECTOR_BYTES - offset;

            let location = ((offset as u32) << 8) | (sectors.min(255) as u32);
            out[slot * 4..slot * 4 + 4].copy_from_slice(&location.to_be_bytes());
            let ts = SECTOR_BYTES + slot * 4;
            out[ts..ts + 4].copy_from_slice(&timestamp.to_be_bytes());
        }
        Ok(out)
    }

    /// Writes the container to a file.
    ///
    /// # Errors
    ///
    /// Returns a chunk encoding error or the I/O error from the write.
    pub fn write(mut self, path: &Path) -> WorldResult<()> {
        fs::write(path, self.build()?)?;
        Ok(())
    }
}
