//! # Packed Index Arrays
//!
//! Palette indices are stored as fixed-width unsigned integers packed into
//! 64-bit words. Two historical layouts exist:
//!
//! ```text
//! Stream:  values are laid end to end; a value may straddle two words.
//!          words = entries * bits / 64 (rounded up)
//!
//! Aligned: floor(64 / bits) values per word, high remainder bits unused.
//!          words = ceil(entries / floor(64 / bits))
//! ```
//!
//! Bits-per-entry is never stored. It is recovered from the word count and
//! checked against the palette size.

use crate::error::{WorldError, WorldResult};

/// Widest supported entry.
pub const MAX_BITS: u32 = 32;

/// Word layout of a packed array.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Packing {
    /// Values may span word boundaries.
    Stream,
    /// Each value lives in exactly one word.
    Aligned,
}

impl Packing {
    /// Number of 64-bit words needed to hold `entries` values of `bits` each.
    #[inline]
    #[must_use]
    pub const fn words_needed(self, entries: usize, bits: u32) -> usize {
        if bits == 0 {
            return 0;
        }
        match self {
            Self::Stream => (entries * bits as usize).div_ceil(64),
            Self::Aligned => entries.div_ceil(64 / bits as usize),
        }
    }

    /// Recovers bits-per-entry from the stored word count.
    ///
    /// Picks the narrowest width that both addresses every palette entry and
    /// produces exactly `words` words.
    ///
    /// # Errors
    ///
    /// Returns `MalformedData` when no width matches.
    pub fn bits_for(self, entries: usize, words: usize, palette_len: usize) -> WorldResult<u32> {
        let min_bits = bits_to_address(palette_len).max(1);
        (min_bits..=MAX_BITS)
            .find(|&bits| self.words_needed(entries, bits) == words)
            .ok_or_else(|| {
                WorldError::malformed(format!(
                    "{words} words cannot hold {entries} entries for a palette of {palette_len}"
                ))
            })
    }

    /// Guesses the layout of an array whose schema did not declare one.
    ///
    /// When both layouts fit (widths dividing 64), they are bit-identical and
    /// `Aligned` is returned.
    #[must_use]
    pub fn infer(entries: usize, words: usize, palette_len: usize) -> Self {
        if Self::Aligned.bits_for(entries, words, palette_len).is_ok() {
            Self::Aligned
        } else {
            Self::Stream
        }
    }
}

/// Minimum number of bits needed to index a palette of `len` entries.
#[inline]
#[must_use]
pub const fn bits_to_address(len: usize) -> u32 {
    if len <= 1 {
        0
    } else {
        usize::BITS - (len - 1).leading_zeros()
    }
}

/// A decoded packed index array.
#[derive(Clone, Debug)]
pub struct PackedArray {
    packing: Packing,
    bits: u32,
    entries: usize,
    words: Box<[u64]>,
}

impl PackedArray {
    /// Wraps stored words, validating their count against the palette.
    ///
    /// # Errors
    ///
    /// Returns `MalformedData` if the array cannot cover `entries` values for
    /// the given palette.
    pub fn from_words(
        packing: Packing,
        entries: usize,
        words: &[i64],
        palette_len: usize,
    ) -> WorldResult<Self> {
        let bits = packing.bits_for(entries, words.len(), palette_len)?;
        Ok(Self {
            packing,
            bits,
            entries,
            words: words.iter().map(|&w| w as u64).collect(),
        })
    }

    /// Packs `values` at the given width.
    #[must_use]
    pub fn pack(packing: Packing, bits: u32, values: &[u32]) -> Self {
        let bits = bits.clamp(1, MAX_BITS);
        let mask = Self::mask(bits);
        let mut words = vec![0u64; packing.words_needed(values.len(), bits)];
        for (index, &value) in values.iter().enumerate() {
            let value = u64::from(value) & mask;
            let (word, offset) = Self::locate(packing, bits, index);
            words[word] |= value << offset;
            if packing == Packing::Stream && offset + bits > 64 {
                words[word + 1] |= value >> (64 - offset);
            }
        }
        Self {
            packing,
            bits,
            entries: values.len(),
            words: words.into_boxed_slice(),
        }
    }

    #[inline]
    const fn mask(bits: u32) -> u64 {
        (1u64 << bits) - 1
    }

    #[inline]
    const fn locate(packing: Packing, bits: u32, index: usize) -> (usize, u32) {
        match packing {
            Packing::Stream => {
                let bit = index * bits as usize;
                (bit / 64, (bit % 64) as u32)
            }
            Packing::Aligned => {
                let per_word = 64 / bits as usize;
                (index / per_word, ((index % per_word) as u32) * bits)
            }
        }
    }

    /// Reads the value at `index`. Out-of-range indices read as 0.
    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> u32 {
        if index >= self.entries {
            return 0;
        }
        let (word, offset) = Self::locate(self.packing, self.bits, index);
        let mut value = self.words.get(word).copied().unwrap_or(0) >> offset;
        if self.packing == Packing::Stream && offset + self.bits > 64 {
            value |= self.words.get(word + 1).copied().unwrap_or(0) << (64 - offset);
        }
        (value & Self::mask(self.bits)) as u32
    }

    /// Bits per entry.
    #[inline]
    #[must_use]
    pub const fn bits(&self) -> u32 {
        self.bits
    }

    /// Layout of the words.
    #[inline]
    #[must_use]
    pub const fn packing(&self) -> Packing {
        self.packing
    }

    /// Words in their stored signed form.
    #[must_use]
    pub fn to_words(&self) -> Vec<i64> {
        self.words.iter().map(|&w| w as i64).collect()
    }
}
