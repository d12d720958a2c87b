//! # Chunk Model
//!
//! A decoded 16x16 column of sections, answering block, biome, light and
//! height queries in absolute world coordinates.
//!
//! ## Lifecycle
//!
//! ```text
//! decode ──► Decoded ──populate()──► Decoded + surface summary
//!                                        │ (release_block_storage)
//!                                        ▼
//!                                    Summarized (block palettes dropped)
//! ```
//!
//! A chunk is never mutated after decode except for this one-way
//! transition, which happens under a single write lock so readers never see
//! a partially released chunk.

use std::sync::OnceLock;

use parking_lot::RwLock;

use crate::biome::BiomeId;
use crate::block::{BlockRegistry, BlockState};
use crate::packed::PackedArray;
use crate::schema::Schema;
use crate::section::Section;

/// Chunk width/depth in blocks.
pub const CHUNK_SIZE: i32 = 16;

/// Columns per chunk.
pub const COLUMNS: usize = 256;

/// Chunk coordinate (identifies a chunk in the world grid).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ChunkPos {
    /// X coordinate (in chunks, not blocks).
    pub x: i32,
    /// Z coordinate (in chunks, not blocks).
    pub z: i32,
}

impl ChunkPos {
    /// Creates a new chunk coordinate.
    #[inline]
    #[must_use]
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Chunk containing a block position.
    #[inline]
    #[must_use]
    pub const fn from_block(block_x: i32, block_z: i32) -> Self {
        Self {
            x: block_x >> 4,
            z: block_z >> 4,
        }
    }

    /// World X of the chunk's corner.
    #[inline]
    #[must_use]
    pub const fn block_x(self) -> i32 {
        self.x << 4
    }

    /// World Z of the chunk's corner.
    #[inline]
    #[must_use]
    pub const fn block_z(self) -> i32 {
        self.z << 4
    }

    /// Slot of this chunk inside its region.
    #[inline]
    #[must_use]
    pub const fn region_slot(self) -> usize {
        ((self.x & 31) + 32 * (self.z & 31)) as usize
    }
}

/// World properties a chunk needs to answer queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkSettings {
    /// Light reported above the highest section.
    pub skylight: u8,
    /// The dimension has a solid roof (the nether).
    pub has_ceiling: bool,
    /// Lowest block y of the dimension; heightmap baseline.
    pub min_build_height: i32,
    /// Drop block palettes once the surface summary exists.
    pub release_block_storage: bool,
}

impl Default for ChunkSettings {
    fn default() -> Self {
        Self {
            skylight: 15,
            has_ceiling: false,
            min_build_height: 0,
            release_block_storage: false,
        }
    }
}

/// A block and its height.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SurfacePoint {
    /// Block y.
    pub y: i32,
    /// Block at `y`.
    pub block: BlockState,
}

/// What a map renderer sees of one column.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ColumnSurface {
    /// Highest visible non-fluid block, if any.
    pub terrain: Option<SurfacePoint>,
    /// Highest fluid block above the terrain, if any.
    pub fluid: Option<SurfacePoint>,
}

/// Decoded heightmaps, 256 entries each, index `z * 16 + x`.
#[derive(Clone, Debug, Default)]
pub struct Heightmaps {
    /// Top non-air block, stored as `y - baseline + 1`.
    pub world_surface: Option<PackedArray>,
    /// Top motion-blocking non-fluid block, same encoding.
    pub ocean_floor: Option<PackedArray>,
    /// Y that a stored value of 1 stands for.
    pub baseline: i32,
}

impl Heightmaps {
    fn height(&self, map: Option<&PackedArray>, x: i32, z: i32) -> Option<i32> {
        map.map(|m| self.baseline + m.get(column_index(x, z)) as i32 - 1)
    }
}

#[inline]
const fn column_index(x: i32, z: i32) -> usize {
    (((z & 15) << 4) | (x & 15)) as usize
}

/// Chunk-wide biome storage of the `Level` schemas.
#[derive(Clone, Debug, Default)]
pub enum LegacyBiomes {
    /// Biomes live in the sections, if anywhere.
    #[default]
    None,
    /// One id per column, index `z * 16 + x`, for every height.
    Columns(Box<[BiomeId]>),
    /// One id per 4x4x4 cell from y = 0 up, index `qy << 4 | qz << 2 | qx`.
    Cells(Box<[BiomeId]>),
}

impl LegacyBiomes {
    /// Biome at absolute coordinates, `None` when nothing is stored.
    ///
    /// Columns are read at the horizontal center of the 4x4 cell. Cell
    /// heights are clamped to the stored layers.
    #[must_use]
    pub fn get(&self, x: i32, y: i32, z: i32) -> Option<BiomeId> {
        match self {
            Self::None => None,
            Self::Columns(columns) => {
                let (cx, cz) = ((x & 12) | 2, (z & 12) | 2);
                columns.get(column_index(cx, cz)).copied()
            }
            Self::Cells(cells) => {
                let layers = (cells.len() / 16) as i32;
                if layers == 0 {
                    return None;
                }
                let qy = (y >> 2).clamp(0, layers - 1) as usize;
                let index = (qy << 4) | ((((z >> 2) & 3) << 2) | ((x >> 2) & 3)) as usize;
                cells.get(index).copied()
            }
        }
    }
}

/// Whether block palettes are still held.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockLayer {
    /// Block palettes available.
    Decoded,
    /// Block palettes dropped; only the surface summary remains.
    Summarized,
}

struct Sections {
    layer: BlockLayer,
    /// Sorted by `y`, possibly with gaps.
    list: Box<[Section]>,
}

/// One decoded chunk.
pub struct Chunk {
    pos: ChunkPos,
    schema: Option<Schema>,
    data_version: Option<i32>,
    settings: ChunkSettings,
    heightmaps: Heightmaps,
    legacy_biomes: LegacyBiomes,
    section_range: Option<(i32, i32)>,
    sections: RwLock<Sections>,
    summary: OnceLock<Box<[ColumnSurface]>>,
}

impl Chunk {
    /// Assembles a chunk from decoded parts.
    #[must_use]
    pub fn new(
        pos: ChunkPos,
        schema: Schema,
        data_version: Option<i32>,
        settings: ChunkSettings,
        heightmaps: Heightmaps,
        mut sections: Vec<Section>,
    ) -> Self {
        sections.sort_by_key(Section::y);
        sections.dedup_by_key(|s| s.y());
        let section_range = match (sections.first(), sections.last()) {
            (Some(lo), Some(hi)) => Some((lo.y(), hi.y())),
            _ => None,
        };
        Self {
            pos,
            schema: Some(schema),
            data_version,
            settings,
            heightmaps,
            legacy_biomes: LegacyBiomes::None,
            section_range,
            sections: RwLock::new(Sections {
                layer: BlockLayer::Decoded,
                list: sections.into_boxed_slice(),
            }),
            summary: OnceLock::new(),
        }
    }

    /// The empty chunk: missing, ungenerated or undecodable.
    #[must_use]
    pub fn empty(pos: ChunkPos, settings: ChunkSettings) -> Self {
        Self {
            pos,
            schema: None,
            data_version: None,
            settings,
            heightmaps: Heightmaps::default(),
            legacy_biomes: LegacyBiomes::None,
            section_range: None,
            sections: RwLock::new(Sections {
                layer: BlockLayer::Decoded,
                list: Box::new([]),
            }),
            summary: OnceLock::new(),
        }
    }

    /// Attaches chunk-wide biomes, which then answer every biome query.
    #[must_use]
    pub fn with_legacy_biomes(mut self, biomes: LegacyBiomes) -> Self {
        self.legacy_biomes = biomes;
        self
    }

    /// Chunk coordinate.
    #[inline]
    #[must_use]
    pub const fn pos(&self) -> ChunkPos {
        self.pos
    }

    /// Schema generation the chunk was decoded with, `None` when empty.
    #[inline]
    #[must_use]
    pub const fn schema(&self) -> Option<Schema> {
        self.schema
    }

    /// `DataVersion` of the document, if present.
    #[inline]
    #[must_use]
    pub const fn data_version(&self) -> Option<i32> {
        self.data_version
    }

    /// Returns true if this is the empty chunk.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.schema.is_none()
    }

    /// Lowest section index present.
    #[inline]
    #[must_use]
    pub fn min_section(&self) -> Option<i32> {
        self.section_range.map(|(lo, _)| lo)
    }

    /// Highest section index present.
    #[inline]
    #[must_use]
    pub fn max_section(&self) -> Option<i32> {
        self.section_range.map(|(_, hi)| hi)
    }

    /// Lowest block y covered by a section.
    #[must_use]
    pub fn min_y(&self) -> Option<i32> {
        self.min_section().map(|s| s * CHUNK_SIZE)
    }

    /// Highest block y covered by a section.
    #[must_use]
    pub fn max_y(&self) -> Option<i32> {
        self.max_section().map(|s| s * CHUNK_SIZE + CHUNK_SIZE - 1)
    }

    /// Current storage state.
    #[must_use]
    pub fn layer(&self) -> BlockLayer {
        self.sections.read().layer
    }

    fn with_section<T>(&self, y: i32, default: T, f: impl FnOnce(&Section) -> T) -> T {
        let sections = self.sections.read();
        let sy = y >> 4;
        match sections.list.binary_search_by_key(&sy, Section::y) {
            Ok(i) => f(&sections.list[i]),
            Err(_) => default,
        }
    }

    /// Block state at absolute coordinates. Air where no section exists.
    #[must_use]
    pub fn get_block_state(&self, x: i32, y: i32, z: i32) -> BlockState {
        self.with_section(y, BlockState::AIR, |s| s.block(x, y, z))
    }

    /// Stored biome cell at absolute coordinates.
    ///
    /// `y` is clamped to the chunk's section range first. DEFAULT where no
    /// section exists at the clamped height.
    #[must_use]
    pub fn get_biome(&self, x: i32, y: i32, z: i32) -> BiomeId {
        if let Some(biome) = self.legacy_biomes.get(x, y, z) {
            return biome;
        }
        let (Some(min_y), Some(max_y)) = (self.min_y(), self.max_y()) else {
            return BiomeId::DEFAULT;
        };
        let y = y.clamp(min_y, max_y);
        self.with_section(y, BiomeId::DEFAULT, |s| s.biome(x, y, z))
    }

    /// Light at absolute coordinates.
    ///
    /// Below the lowest section reads 0, above the highest reads the world
    /// skylight, and inside a gap between sections reads the skylight.
    #[must_use]
    pub fn get_light(&self, x: i32, y: i32, z: i32) -> u8 {
        let Some((lo, hi)) = self.section_range else {
            return self.settings.skylight;
        };
        let sy = y >> 4;
        if sy < lo {
            0
        } else if sy > hi {
            self.settings.skylight
        } else {
            self.with_section(y, self.settings.skylight, |s| s.light(x, y, z))
        }
    }

    /// Top non-air block y from the surface heightmap, 0 if absent.
    #[must_use]
    pub fn get_height(&self, x: i32, z: i32) -> i32 {
        self.heightmaps
            .height(self.heightmaps.world_surface.as_ref(), x, z)
            .unwrap_or(0)
    }

    /// Top non-fluid block y from the ocean-floor heightmap, 0 if absent.
    #[must_use]
    pub fn get_ocean_floor(&self, x: i32, z: i32) -> i32 {
        self.heightmaps
            .height(self.heightmaps.ocean_floor.as_ref(), x, z)
            .unwrap_or(0)
    }

    /// Computes the surface summary. Runs at most once per chunk.
    pub fn populate(&self, registry: &BlockRegistry) {
        self.summary.get_or_init(|| {
            let summary: Box<[ColumnSurface]> = (0..COLUMNS)
                .map(|i| self.scan_column((i & 15) as i32, (i >> 4) as i32, registry))
                .collect();
            if self.settings.release_block_storage {
                let mut sections = self.sections.write();
                for section in sections.list.iter_mut() {
                    section.release_blocks();
                }
                sections.layer = BlockLayer::Summarized;
            }
            summary
        });
    }

    /// Returns true once `populate` has run.
    #[must_use]
    pub fn is_populated(&self) -> bool {
        self.summary.get().is_some()
    }

    /// Surface of a column; `None` before `populate`.
    #[must_use]
    pub fn surface(&self, x: i32, z: i32) -> Option<ColumnSurface> {
        self.summary.get().map(|s| s[column_index(x, z)])
    }

    fn scan_column(&self, lx: i32, lz: i32, registry: &BlockRegistry) -> ColumnSurface {
        let (Some(min_y), Some(max_y)) = (self.min_y(), self.max_y()) else {
            return ColumnSurface::default();
        };
        let x = self.pos.block_x() + lx;
        let z = self.pos.block_z() + lz;

        let mut y = self
            .heightmaps
            .height(self.heightmaps.world_surface.as_ref(), x, z)
            .map_or(max_y, |h| h.min(max_y));

        if self.settings.has_ceiling {
            while y >= min_y && !self.get_block_state(x, y, z).is_air() {
                y -= 1;
            }
        }

        let mut column = ColumnSurface::default();
        while y >= min_y {
            let block = self.get_block_state(x, y, z);
            if registry.is_fluid(block) && column.fluid.is_none() {
                column.fluid = Some(SurfacePoint { y, block });
            }
            let info = registry.info(block.id);
            if !info.is_fluid() && info.is_opaque() {
                column.terrain = Some(SurfacePoint { y, block });
                break;
            }
            y -= 1;
        }
        column
    }
}

impl std::fmt::Debug for Chunk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chunk")
            .field("pos", &self.pos)
            .field("schema", &self.schema)
            .field("sections", &self.section_range)
            .field("populated", &self.is_populated())
            .finish_non_exhaustive()
    }
}
