//! # Tagged Binary Documents
//!
//! Chunk payloads are big-endian NBT trees, parsed with `quartz_nbt`.
//!
//! ## Format
//!
//! ```text
//! [1 byte: tag id][2 bytes: name length][N bytes: name][payload]
//!
//! Compound payload: named tags until an End tag (id 0)
//! List payload:     [1 byte: element id][4 bytes: count][count payloads]
//! Array payloads:   [4 bytes: count][count fixed-width elements]
//! ```
//!
//! Decoded documents are depth-checked: a tree nested deeper than
//! [`MAX_DEPTH`] fails with `MalformedData` before any field is read.
//! [`CompoundExt`] adds the lenient accessors the schema decoders use.

use std::io::Cursor;

use quartz_nbt::io::{self, Flavor};
pub use quartz_nbt::{NbtCompound, NbtList, NbtTag};

use crate::error::{WorldError, WorldResult};

/// Maximum nesting depth of compounds and lists.
pub const MAX_DEPTH: usize = 512;

/// Parses a complete uncompressed document and returns its root compound.
///
/// # Errors
///
/// Returns `MalformedData` if the document is truncated, has an unknown tag
/// id, a non-compound root, or nests deeper than [`MAX_DEPTH`].
pub fn read_root(bytes: &[u8]) -> WorldResult<NbtCompound> {
    let (root, _name) = io::read_nbt(&mut Cursor::new(bytes), Flavor::Uncompressed)
        .map_err(|e| WorldError::malformed(format!("nbt: {e}")))?;
    check_depth(&root)?;
    Ok(root)
}

/// Serializes a root compound without compression.
///
/// # Errors
///
/// Returns `MalformedData` if the tree cannot be encoded (a list mixing tag
/// types, for example).
pub fn write_root(name: &str, root: &NbtCompound) -> WorldResult<Vec<u8>> {
    let mut out = Vec::new();
    io::write_nbt(&mut out, Some(name), root, Flavor::Uncompressed)
        .map_err(|e| WorldError::malformed(format!("nbt: {e}")))?;
    Ok(out)
}

/// Fails if any branch of the tree is deeper than [`MAX_DEPTH`].
fn check_depth(root: &NbtCompound) -> WorldResult<()> {
    let mut stack: Vec<(&NbtTag, usize)> = root.inner().values().map(|t| (t, 1)).collect();
    while let Some((tag, depth)) = stack.pop() {
        let nested = matches!(tag, NbtTag::Compound(_) | NbtTag::List(_));
        if nested && depth >= MAX_DEPTH {
            return Err(WorldError::malformed(format!(
                "document nested too deeply (limit {MAX_DEPTH})"
            )));
        }
        match tag {
            NbtTag::Compound(c) => stack.extend(c.inner().values().map(|t| (t, depth + 1))),
            NbtTag::List(l) => stack.extend(l.iter().map(|t| (t, depth + 1))),
            _ => {}
        }
    }
    Ok(())
}

/// Type-lenient field access on a compound.
///
/// Lookups return `None` for missing fields and for fields of another type.
pub trait CompoundExt {
    /// Raw tag by name.
    fn field(&self, name: &str) -> Option<&NbtTag>;

    /// Builder-style insert.
    #[must_use]
    fn with_tag(self, name: &str, tag: NbtTag) -> Self
    where
        Self: Sized;

    /// Any integer tag by name, widened to `i64`.
    fn get_int(&self, name: &str) -> Option<i64> {
        self.field(name).and_then(tag_i64)
    }

    /// Nested compound by name.
    fn get_compound(&self, name: &str) -> Option<&NbtCompound> {
        self.field(name).and_then(tag_compound)
    }

    /// List by name.
    fn get_list(&self, name: &str) -> Option<&NbtList> {
        match self.field(name) {
            Some(NbtTag::List(list)) => Some(list),
            _ => None,
        }
    }

    /// String by name.
    fn get_str(&self, name: &str) -> Option<&str> {
        self.field(name).and_then(tag_str)
    }

    /// Long array by name.
    fn get_long_array(&self, name: &str) -> Option<&[i64]> {
        match self.field(name) {
            Some(NbtTag::LongArray(v)) => Some(v.as_slice()),
            _ => None,
        }
    }

    /// Byte array by name.
    fn get_byte_array(&self, name: &str) -> Option<&[i8]> {
        match self.field(name) {
            Some(NbtTag::ByteArray(v)) => Some(v.as_slice()),
            _ => None,
        }
    }
}

impl CompoundExt for NbtCompound {
    fn field(&self, name: &str) -> Option<&NbtTag> {
        self.inner().get(name)
    }

    fn with_tag(mut self, name: &str, tag: NbtTag) -> Self {
        self.insert(name, tag);
        self
    }
}

/// Integer payload of any width.
#[must_use]
pub fn tag_i64(tag: &NbtTag) -> Option<i64> {
    match *tag {
        NbtTag::Byte(v) => Some(i64::from(v)),
        NbtTag::Short(v) => Some(i64::from(v)),
        NbtTag::Int(v) => Some(i64::from(v)),
        NbtTag::Long(v) => Some(v),
        _ => None,
    }
}

/// Compound payload.
#[must_use]
pub fn tag_compound(tag: &NbtTag) -> Option<&NbtCompound> {
    match tag {
        NbtTag::Compound(c) => Some(c),
        _ => None,
    }
}

/// String payload.
#[must_use]
pub fn tag_str(tag: &NbtTag) -> Option<&str> {
    match tag {
        NbtTag::String(s) => Some(s.as_str()),
        _ => None,
    }
}
