//! # Chunk Schemas
//!
//! Three on-disk generations of the chunk document are supported. The
//! generation is detected per chunk from the document's own fields.
//!
//! | Schema     | Sections at        | Block indices | Biomes                        |
//! |------------|--------------------|---------------|-------------------------------|
//! | `Anvil113` | `Level.Sections`   | stream-packed | `Level.Biomes` flat ints      |
//! | `Anvil116` | `Level.Sections`   | word-aligned  | `Level.Biomes` flat ints      |
//! | `Anvil118` | `sections`         | word-aligned  | per-section palette + indices |
//!
//! Optional fields (heightmaps, light, sections, biomes) fall back to empty
//! defaults. Anything structurally wrong fails the chunk, which the region
//! then replaces with the empty chunk.

use crate::biome::{BiomeId, BiomeRegistry};
use crate::block::{BlockRegistry, BlockState};
use crate::chunk::{Chunk, ChunkPos, ChunkSettings, Heightmaps, LegacyBiomes};
use crate::error::{WorldError, WorldResult};
use crate::nbt::{tag_compound, tag_str, CompoundExt, NbtCompound, NbtList, NbtTag};
use crate::packed::{PackedArray, Packing};
use crate::section::{Paletted, Section, BIOMES_PER_SECTION, BLOCKS_PER_SECTION};

/// First `DataVersion` that stores packed values word-aligned.
pub const ALIGNED_PACKING_VERSION: i32 = 2529;

/// First `DataVersion` with top-level `sections`.
pub const TOP_LEVEL_SECTIONS_VERSION: i32 = 2844;

/// Generation statuses that mean the chunk is fully generated.
const FULL_STATUSES: &[&str] = &["full", "postprocessed", "fullchunk", "mobs_spawned"];

/// Everything the decoder needs besides the document itself.
#[derive(Clone, Copy, Debug)]
pub struct DecodeContext<'a> {
    /// Block name lookup.
    pub blocks: &'a BlockRegistry,
    /// Biome key and legacy id lookup.
    pub biomes: &'a BiomeRegistry,
    /// World properties copied into each chunk.
    pub settings: ChunkSettings,
}

/// On-disk chunk document generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Schema {
    /// `Level` compound, stream-packed block indices.
    Anvil113,
    /// `Level` compound, word-aligned block indices.
    Anvil116,
    /// Top-level `sections` with block and biome palettes.
    Anvil118,
}

impl Schema {
    /// Detects the generation of a chunk document.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedSchema` for documents matching no generation,
    /// including pre-palette (`Blocks` byte array) chunks.
    pub fn detect(root: &NbtCompound) -> WorldResult<Self> {
        if root.get_list("sections").is_some() {
            return Ok(Self::Anvil118);
        }
        let data_version = root.get_int("DataVersion");
        if let Some(level) = root.get_compound("Level") {
            if list_items(level, "Sections")
                .filter_map(tag_compound)
                .any(|s| s.field("Blocks").is_some())
            {
                return Err(WorldError::UnsupportedSchema(
                    "pre-palette Blocks array".into(),
                ));
            }
            return Ok(match data_version {
                Some(v) if v < i64::from(ALIGNED_PACKING_VERSION) => Self::Anvil113,
                Some(_) => Self::Anvil116,
                None => Self::infer_legacy(list_items(level, "Sections")),
            });
        }
        match data_version {
            Some(v) if v >= i64::from(TOP_LEVEL_SECTIONS_VERSION) => Ok(Self::Anvil118),
            _ => Err(WorldError::UnsupportedSchema(
                "neither Level nor sections present".into(),
            )),
        }
    }

    /// Picks a `Level` generation from the first packed block array.
    fn infer_legacy<'a>(sections: impl Iterator<Item = &'a NbtTag>) -> Self {
        let packing = sections
            .filter_map(tag_compound)
            .find_map(|s| {
                let palette = s.get_list("Palette")?;
                let words = s.get_long_array("BlockStates")?;
                (palette.len() > 1)
                    .then(|| Packing::infer(BLOCKS_PER_SECTION, words.len(), palette.len()))
            });
        match packing {
            Some(Packing::Stream) => Self::Anvil113,
            _ => Self::Anvil116,
        }
    }

    /// Packing used by this generation.
    #[inline]
    #[must_use]
    pub const fn packing(self) -> Packing {
        match self {
            Self::Anvil113 => Packing::Stream,
            Self::Anvil116 | Self::Anvil118 => Packing::Aligned,
        }
    }

    /// Decodes a document of this generation.
    ///
    /// # Errors
    ///
    /// Returns `MalformedData` when a required array is missing or too short.
    pub fn decode(self, root: &NbtCompound, pos: ChunkPos, ctx: &DecodeContext<'_>) -> WorldResult<Chunk> {
        match self {
            Self::Anvil113 => decode_anvil113(root, pos, ctx),
            Self::Anvil116 => decode_anvil116(root, pos, ctx),
            Self::Anvil118 => decode_anvil118(root, pos, ctx),
        }
    }
}

/// Decodes any supported chunk document.
///
/// Chunks that are not fully generated decode as the empty chunk.
///
/// # Errors
///
/// Returns `UnsupportedSchema` or `MalformedData`.
pub fn decode_chunk(root: &NbtCompound, pos: ChunkPos, ctx: &DecodeContext<'_>) -> WorldResult<Chunk> {
    let schema = Schema::detect(root)?;
    let status = match schema {
        Schema::Anvil118 => root.get_str("Status"),
        Schema::Anvil113 | Schema::Anvil116 => root.get_compound("Level").and_then(|l| l.get_str("Status")),
    };
    if !status.map_or(true, is_full_status) {
        return Ok(Chunk::empty(pos, ctx.settings));
    }
    schema.decode(root, pos, ctx)
}

/// Returns true for statuses of fully generated chunks.
#[must_use]
pub fn is_full_status(status: &str) -> bool {
    let status = status.strip_prefix("minecraft:").unwrap_or(status);
    FULL_STATUSES.contains(&status)
}

fn data_version(root: &NbtCompound) -> Option<i32> {
    root.get_int("DataVersion").map(|v| v as i32)
}

/// Elements of a list field, empty when absent.
fn list_items<'a>(compound: &'a NbtCompound, name: &str) -> impl Iterator<Item = &'a NbtTag> {
    compound.get_list(name).into_iter().flat_map(|list| list.iter())
}

fn decode_anvil113(root: &NbtCompound, pos: ChunkPos, ctx: &DecodeContext<'_>) -> WorldResult<Chunk> {
    decode_level(root, pos, ctx, Schema::Anvil113)
}

fn decode_anvil116(root: &NbtCompound, pos: ChunkPos, ctx: &DecodeContext<'_>) -> WorldResult<Chunk> {
    decode_level(root, pos, ctx, Schema::Anvil116)
}

fn decode_level(
    root: &NbtCompound,
    pos: ChunkPos,
    ctx: &DecodeContext<'_>,
    schema: Schema,
) -> WorldResult<Chunk> {
    let level = root
        .get_compound("Level")
        .ok_or_else(|| WorldError::malformed("missing Level compound"))?;
    let packing = schema.packing();

    let mut sections = Vec::new();
    for tag in list_items(level, "Sections") {
        let Some(section) = tag_compound(tag) else {
            continue;
        };
        let y = section_y(section)?;
        let palette = section
            .get_list("Palette")
            .map(|p| block_palette(p, ctx.blocks))
            .unwrap_or_default();
        let blocks = paletted(palette, section.get_long_array("BlockStates"), BLOCKS_PER_SECTION, packing)?;
        sections.push(Section::new(
            y,
            blocks,
            Paletted::Empty,
            light(section, "BlockLight"),
            light(section, "SkyLight"),
        ));
    }

    let heightmaps = heightmaps(level.get_compound("Heightmaps"), packing, 0);
    Ok(Chunk::new(pos, schema, data_version(root), ctx.settings, heightmaps, sections)
        .with_legacy_biomes(legacy_biomes(level, ctx.biomes)))
}

fn decode_anvil118(root: &NbtCompound, pos: ChunkPos, ctx: &DecodeContext<'_>) -> WorldResult<Chunk> {
    let packing = Packing::Aligned;
    let mut sections = Vec::new();
    for tag in list_items(root, "sections") {
        let Some(section) = tag_compound(tag) else {
            continue;
        };
        let y = section_y(section)?;

        let blocks = match section.get_compound("block_states") {
            Some(states) => {
                let palette = states
                    .get_list("palette")
                    .map(|p| block_palette(p, ctx.blocks))
                    .unwrap_or_default();
                paletted(palette, states.get_long_array("data"), BLOCKS_PER_SECTION, packing)?
            }
            None => Paletted::Empty,
        };

        let biomes = match section.get_compound("biomes") {
            Some(biomes) => {
                let palette: Vec<BiomeId> = list_items(biomes, "palette")
                    .map(|t| tag_str(t).map_or(BiomeId::DEFAULT, |k| ctx.biomes.resolve(k)))
                    .collect();
                paletted(palette, biomes.get_long_array("data"), BIOMES_PER_SECTION, packing)?
            }
            None => Paletted::Empty,
        };

        sections.push(Section::new(
            y,
            blocks,
            biomes,
            light(section, "BlockLight"),
            light(section, "SkyLight"),
        ));
    }

    let heightmaps = heightmaps(root.get_compound("Heightmaps"), packing, ctx.settings.min_build_height);
    Ok(Chunk::new(pos, Schema::Anvil118, data_version(root), ctx.settings, heightmaps, sections))
}

fn section_y(section: &NbtCompound) -> WorldResult<i32> {
    section
        .get_int("Y")
        .map(|y| y as i32)
        .ok_or_else(|| WorldError::malformed("section without Y"))
}

fn block_palette(entries: &NbtList, registry: &BlockRegistry) -> Vec<BlockState> {
    entries
        .iter()
        .map(|entry| {
            let Some(entry) = tag_compound(entry) else {
                return BlockState::AIR;
            };
            let id = entry.get_str("Name").map_or(BlockState::AIR.id, |n| registry.resolve(n));
            let waterlogged = entry
                .get_compound("Properties")
                .and_then(|p| p.get_str("waterlogged"))
                == Some("true");
            BlockState { id, waterlogged }
        })
        .collect()
}

fn paletted<T: Copy>(
    palette: Vec<T>,
    data: Option<&[i64]>,
    entries: usize,
    packing: Packing,
) -> WorldResult<Paletted<T>> {
    match (palette.len(), data) {
        (0, _) => Ok(Paletted::Empty),
        (1, _) => Ok(Paletted::Single(palette[0])),
        (len, None) => Err(WorldError::malformed(format!(
            "palette of {len} entries without index data"
        ))),
        (len, Some(words)) => Ok(Paletted::Packed {
            indices: PackedArray::from_words(packing, entries, words, len)?,
            palette: palette.into_boxed_slice(),
        }),
    }
}

fn light(section: &NbtCompound, name: &str) -> Option<Vec<u8>> {
    section
        .get_byte_array(name)
        .map(|bytes| bytes.iter().map(|&b| b as u8).collect())
}

fn heightmaps(maps: Option<&NbtCompound>, packing: Packing, baseline: i32) -> Heightmaps {
    let read = |name: &str| {
        maps.and_then(|m| m.get_long_array(name))
            .and_then(|words| PackedArray::from_words(packing, 256, words, 1).ok())
    };
    Heightmaps {
        world_surface: read("WORLD_SURFACE"),
        ocean_floor: read("OCEAN_FLOOR"),
        baseline,
    }
}

/// Reads `Level.Biomes`: 256 column ids, or 4x4x4 cells from y = 0 up.
fn legacy_biomes(level: &NbtCompound, registry: &BiomeRegistry) -> LegacyBiomes {
    let resolve = |ids: &[i32]| ids.iter().map(|&id| registry.from_legacy(id)).collect::<Box<[_]>>();
    match level.field("Biomes") {
        Some(NbtTag::IntArray(ids)) if ids.len() == 256 => LegacyBiomes::Columns(resolve(ids.as_slice())),
        Some(NbtTag::IntArray(ids)) if ids.len() >= 64 && ids.len() % 64 == 0 => {
            LegacyBiomes::Cells(resolve(ids.as_slice()))
        }
        Some(NbtTag::ByteArray(ids)) if ids.len() == 256 => {
            let ids: Vec<i32> = ids.iter().map(|&b| i32::from(b as u8)).collect();
            LegacyBiomes::Columns(resolve(&ids))
        }
        _ => LegacyBiomes::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> DecodeContext<'static> {
        DecodeContext {
            blocks: BlockRegistry::global(),
            biomes: BiomeRegistry::global(),
            settings: ChunkSettings::default(),
        }
    }

    fn state(name: &str) -> NbtTag {
        NbtTag::Compound(NbtCompound::new().with_tag("Name", NbtTag::String(name.into())))
    }

    fn list(tags: Vec<NbtTag>) -> NbtTag {
        NbtTag::List(NbtList::from(tags))
    }

    fn level_chunk(data_version: i32, level: NbtCompound) -> NbtCompound {
        NbtCompound::new()
            .with_tag("DataVersion", NbtTag::Int(data_version))
            .with_tag("Level", NbtTag::Compound(level))
    }

    #[test]
    fn test_detect_generations() {
        let modern = NbtCompound::new().with_tag("sections", list(vec![]));
        assert_eq!(Schema::detect(&modern).unwrap(), Schema::Anvil118);

        let old = level_chunk(1976, NbtCompound::new());
        let mid = level_chunk(2586, NbtCompound::new());
        assert_eq!(Schema::detect(&old).unwrap(), Schema::Anvil113);
        assert_eq!(Schema::detect(&mid).unwrap(), Schema::Anvil116);

        assert!(matches!(Schema::detect(&NbtCompound::new()), Err(WorldError::UnsupportedSchema(_))));
    }

    #[test]
    fn test_detect_pre_palette_chunk() {
        let section = NbtCompound::new().with_tag("Blocks", NbtTag::ByteArray(vec![0; 4096]));
        let level = NbtCompound::new().with_tag("Sections", list(vec![NbtTag::Compound(section)]));
        let root = NbtCompound::new().with_tag("Level", NbtTag::Compound(level));
        assert!(matches!(Schema::detect(&root), Err(WorldError::UnsupportedSchema(_))));
    }

    #[test]
    fn test_detect_packing_without_version() {
        let palette = list((0..20).map(|_| state("stone")).collect());
        let stream = NbtCompound::new()
            .with_tag("Y", NbtTag::Byte(0))
            .with_tag("Palette", palette.clone())
            .with_tag("BlockStates", NbtTag::LongArray(vec![0; 320]));
        let aligned = NbtCompound::new()
            .with_tag("Y", NbtTag::Byte(0))
            .with_tag("Palette", palette)
            .with_tag("BlockStates", NbtTag::LongArray(vec![0; 342]));
        let wrap = |s: NbtCompound| {
            let level = NbtCompound::new().with_tag("Sections", list(vec![NbtTag::Compound(s)]));
            NbtCompound::new().with_tag("Level", NbtTag::Compound(level))
        };
        assert_eq!(Schema::detect(&wrap(stream)).unwrap(), Schema::Anvil113);
        assert_eq!(Schema::detect(&wrap(aligned)).unwrap(), Schema::Anvil116);
    }

    #[test]
    fn test_status_gating() {
        assert!(is_full_status("full"));
        assert!(is_full_status("minecraft:full"));
        assert!(is_full_status("postprocessed"));
        assert!(!is_full_status("minecraft:features"));

        let root = NbtCompound::new()
            .with_tag("sections", list(vec![]))
            .with_tag("Status", NbtTag::String("minecraft:carvers".into()));
        let chunk = decode_chunk(&root, ChunkPos::new(0, 0), &ctx()).unwrap();
        assert!(chunk.is_empty());
    }

    #[test]
    fn test_legacy_column_biomes() {
        let registry = BiomeRegistry::global();
        let mut ids = vec![1i32; 256];
        ids[2 * 16 + 2] = 6;
        let level = NbtCompound::new()
            .with_tag("Biomes", NbtTag::IntArray(ids))
            .with_tag(
                "Sections",
                list(vec![NbtTag::Compound(
                    NbtCompound::new()
                        .with_tag("Y", NbtTag::Byte(4))
                        .with_tag("Palette", list(vec![state("stone")])),
                )]),
            );
        let chunk = decode_chunk(&level_chunk(2230, level), ChunkPos::new(0, 0), &ctx()).unwrap();

        assert_eq!(chunk.schema(), Some(Schema::Anvil113));
        assert_eq!(chunk.get_biome(1, 70, 3), registry.from_legacy(6));
        assert_eq!(chunk.get_biome(5, 70, 3), registry.resolve("plains"));
        assert_eq!(chunk.get_block_state(9, 70, 9).id, BlockRegistry::global().resolve("stone"));
    }

    #[test]
    fn test_column_biomes_cover_heights_without_sections() {
        let desert = BiomeRegistry::global().from_legacy(2);
        let level = NbtCompound::new()
            .with_tag("Biomes", NbtTag::IntArray(vec![2; 256]))
            .with_tag(
                "Sections",
                list(vec![NbtTag::Compound(
                    NbtCompound::new()
                        .with_tag("Y", NbtTag::Byte(3))
                        .with_tag("Palette", list(vec![state("sand")])),
                )]),
            );
        let chunk = decode_chunk(&level_chunk(1976, level), ChunkPos::new(0, 0), &ctx()).unwrap();

        for y in [60, 64, 10, 255, -5] {
            assert_eq!(chunk.get_biome(5, y, 5), desert, "y={y}");
        }
    }

    #[test]
    fn test_legacy_cell_biomes() {
        let registry = BiomeRegistry::global();
        let mut ids = vec![1i32; 1024];
        // Quart layer 4 is the bottom of section 1.
        ids[(4 << 4) | (1 << 2) | 3] = 2;
        ids[(63 << 4) | 5] = 2;
        let level = NbtCompound::new()
            .with_tag("Biomes", NbtTag::IntArray(ids))
            .with_tag("Sections", list(vec![NbtTag::Compound(NbtCompound::new().with_tag("Y", NbtTag::Byte(1)))]));
        let chunk = decode_chunk(&level_chunk(2586, level), ChunkPos::new(0, 0), &ctx()).unwrap();

        assert_eq!(chunk.get_biome(12, 16, 4), registry.resolve("desert"));
        assert_eq!(chunk.get_biome(0, 16, 0), registry.resolve("plains"));
        // Outside any stored section, and clamped past the top layer.
        assert_eq!(chunk.get_biome(4, 252, 4), registry.resolve("desert"));
        assert_eq!(chunk.get_biome(4, 400, 4), registry.resolve("desert"));
        assert_eq!(chunk.get_biome(4, -30, 4), registry.resolve("plains"));
    }

    #[test]
    fn test_modern_biomes_clamp_to_section_range() {
        let biomes = NbtCompound::new().with_tag("palette", list(vec![NbtTag::String("minecraft:desert".into())]));
        let top = NbtCompound::new()
            .with_tag("Y", NbtTag::Byte(19))
            .with_tag("biomes", NbtTag::Compound(biomes));
        let root = NbtCompound::new().with_tag("sections", list(vec![NbtTag::Compound(top)]));
        let chunk = decode_chunk(&root, ChunkPos::new(0, 0), &ctx()).unwrap();

        let desert = BiomeRegistry::global().resolve("desert");
        assert_eq!(chunk.get_biome(3, 319, 3), desert);
        assert_eq!(chunk.get_biome(3, 330, 3), desert);
        assert_eq!(chunk.get_biome(3, 100, 3), desert);
    }

    #[test]
    fn test_palette_without_data_is_malformed() {
        let states = NbtCompound::new().with_tag("palette", list(vec![state("stone"), state("dirt")]));
        let section = NbtCompound::new()
            .with_tag("Y", NbtTag::Byte(0))
            .with_tag("block_states", NbtTag::Compound(states));
        let root = NbtCompound::new().with_tag("sections", list(vec![NbtTag::Compound(section)]));
        let err = decode_chunk(&root, ChunkPos::new(0, 0), &ctx()).unwrap_err();
        assert!(matches!(err, WorldError::MalformedData(_)));
    }
}
