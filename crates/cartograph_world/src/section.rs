//! # Chunk Sections
//!
//! A section is one 16x16x16 slab of a chunk. It owns its block palette,
//! its biome palette (4x4x4 cells) and two half-byte light arrays.
//!
//! ## Index Layout
//!
//! ```text
//! block:  (y & 15) << 8 | (z & 15) << 4 | (x & 15)     4096 entries
//! biome:  (qy & 3) << 4 | (qz & 3) << 2 | (qx & 3)       64 entries
//! light:  block index / 2, low nibble for even indices   2048 bytes
//! ```

use crate::biome::BiomeId;
use crate::block::BlockState;
use crate::packed::PackedArray;

/// Blocks per section.
pub const BLOCKS_PER_SECTION: usize = 4096;
/// Biome cells per section.
pub const BIOMES_PER_SECTION: usize = 64;
/// Bytes in a light array.
pub const LIGHT_BYTES: usize = BLOCKS_PER_SECTION / 2;

/// Palette-compressed storage for one section's values.
#[derive(Clone, Debug)]
pub enum Paletted<T> {
    /// No data stored; every position reads as the default value.
    Empty,
    /// Single-entry palette, no index array.
    Single(T),
    /// Palette plus packed indices.
    Packed {
        /// Distinct values.
        palette: Box<[T]>,
        /// Index into `palette` per position.
        indices: PackedArray,
    },
    /// One value per position.
    Direct(Box<[T]>),
}

impl<T: Copy + Default> Paletted<T> {
    /// Value at a position index. Corrupt palette indices read as default.
    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> T {
        match self {
            Self::Empty => T::default(),
            Self::Single(value) => *value,
            Self::Packed { palette, indices } => palette
                .get(indices.get(index) as usize)
                .copied()
                .unwrap_or_default(),
            Self::Direct(values) => values.get(index).copied().unwrap_or_default(),
        }
    }

    /// Returns true if nothing is stored.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

/// Block index inside a section from absolute block coordinates.
#[inline]
#[must_use]
pub const fn block_index(x: i32, y: i32, z: i32) -> usize {
    (((y & 15) << 8) | ((z & 15) << 4) | (x & 15)) as usize
}

/// Biome cell index inside a section from absolute block coordinates.
#[inline]
#[must_use]
pub const fn biome_index(x: i32, y: i32, z: i32) -> usize {
    ((((y >> 2) & 3) << 4) | (((z >> 2) & 3) << 2) | ((x >> 2) & 3)) as usize
}

/// Reads one nibble of a light array.
#[inline]
#[must_use]
pub fn nibble(array: &[u8], index: usize) -> u8 {
    let byte = array.get(index >> 1).copied().unwrap_or(0);
    if index & 1 == 0 {
        byte & 0x0F
    } else {
        byte >> 4
    }
}

/// One decoded 16-block slab.
#[derive(Clone, Debug)]
pub struct Section {
    y: i32,
    blocks: Paletted<BlockState>,
    biomes: Paletted<BiomeId>,
    block_light: Option<Box<[u8]>>,
    sky_light: Option<Box<[u8]>>,
}

impl Section {
    /// Creates a section at vertical index `y` (block y >> 4).
    ///
    /// Light arrays of the wrong size are dropped and read as 0.
    #[must_use]
    pub fn new(
        y: i32,
        blocks: Paletted<BlockState>,
        biomes: Paletted<BiomeId>,
        block_light: Option<Vec<u8>>,
        sky_light: Option<Vec<u8>>,
    ) -> Self {
        let checked = |array: Option<Vec<u8>>| {
            array
                .filter(|a| a.len() == LIGHT_BYTES)
                .map(Vec::into_boxed_slice)
        };
        Self {
            y,
            blocks,
            biomes,
            block_light: checked(block_light),
            sky_light: checked(sky_light),
        }
    }

    /// Vertical section index.
    #[inline]
    #[must_use]
    pub const fn y(&self) -> i32 {
        self.y
    }

    /// Block state at absolute coordinates inside this section.
    #[inline]
    #[must_use]
    pub fn block(&self, x: i32, y: i32, z: i32) -> BlockState {
        self.blocks.get(block_index(x, y, z))
    }

    /// Stored (unsmoothed) biome at absolute coordinates inside this section.
    #[inline]
    #[must_use]
    pub fn biome(&self, x: i32, y: i32, z: i32) -> BiomeId {
        self.biomes.get(biome_index(x, y, z))
    }

    /// Brightest of sky and block light, 0 where no light was stored.
    #[inline]
    #[must_use]
    pub fn light(&self, x: i32, y: i32, z: i32) -> u8 {
        let index = block_index(x, y, z);
        let sky = self.sky_light.as_deref().map_or(0, |a| nibble(a, index));
        let block = self.block_light.as_deref().map_or(0, |a| nibble(a, index));
        sky.max(block)
    }

    /// Returns true if the section carries block data.
    #[inline]
    #[must_use]
    pub const fn has_blocks(&self) -> bool {
        !self.blocks.is_empty()
    }

    /// Drops block storage, keeping biomes and light.
    pub fn release_blocks(&mut self) {
        self.blocks = Paletted::Empty;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockId;
    use crate::packed::Packing;

    #[test]
    fn test_indices_ignore_sign() {
        assert_eq!(block_index(-1, -1, -1), block_index(15, 15, 15));
        assert_eq!(block_index(1, 2, 3), (2 << 8) | (3 << 4) | 1);
        assert_eq!(biome_index(-1, 0, 0), 3);
        assert_eq!(biome_index(0, 12, 4), (3 << 4) | (1 << 2));
    }

    #[test]
    fn test_nibbles() {
        let mut light = vec![0u8; LIGHT_BYTES];
        light[0] = 0xA5;
        assert_eq!(nibble(&light, 0), 0x5);
        assert_eq!(nibble(&light, 1), 0xA);
        assert_eq!(nibble(&light, 5000), 0);
    }

    #[test]
    fn test_packed_palette_lookup() {
        let stone = BlockState::new(BlockId(7));
        let dirt = BlockState::new(BlockId(16));
        let mut indices = vec![0u32; BLOCKS_PER_SECTION];
        indices[block_index(3, 5, 7)] = 1;
        let blocks = Paletted::Packed {
            palette: vec![stone, dirt].into_boxed_slice(),
            indices: PackedArray::pack(Packing::Aligned, 4, &indices),
        };
        let section = Section::new(0, blocks, Paletted::Empty, None, None);

        assert_eq!(section.block(3, 5, 7), dirt);
        assert_eq!(section.block(3, 5, 8), stone);
        assert_eq!(section.biome(0, 0, 0), BiomeId::DEFAULT);
        assert_eq!(section.light(0, 0, 0), 0);
    }

    #[test]
    fn test_out_of_palette_index_reads_default() {
        let indices = PackedArray::pack(Packing::Aligned, 4, &[9; BLOCKS_PER_SECTION]);
        let blocks = Paletted::Packed {
            palette: vec![BlockState::new(BlockId(7))].into_boxed_slice(),
            indices,
        };
        assert_eq!(blocks.get(0), BlockState::AIR);
    }

    #[test]
    fn test_light_uses_brightest_source() {
        let mut sky = vec![0u8; LIGHT_BYTES];
        let mut block = vec![0u8; LIGHT_BYTES];
        sky[0] = 0x03;
        block[0] = 0x0C;
        let section = Section::new(2, Paletted::Empty, Paletted::Empty, Some(block), Some(sky));
        assert_eq!(section.light(0, 32, 0), 12);

        let short = Section::new(2, Paletted::Empty, Paletted::Empty, Some(vec![0xFF; 10]), None);
        assert_eq!(short.light(0, 32, 0), 0);
    }
}
