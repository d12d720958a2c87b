//! # Chunk Payload Compression
//!
//! Every chunk payload in a region container is prefixed with a 1-byte
//! compression tag. The high bit marks an external chunk whose payload lives
//! in a sibling `c.<x>.<z>.mcc` file.
//!
//! | Tag | Algorithm                          |
//! |-----|------------------------------------|
//! | 1   | gzip                               |
//! | 2   | zlib                               |
//! | 3   | uncompressed                       |
//! | 4   | LZ4 block stream (`LZ4Block`)      |

use std::io::{Read, Write};

use flate2::read::{GzDecoder, ZlibDecoder};
use flate2::write::{GzEncoder, ZlibEncoder};

use crate::error::{WorldError, WorldResult};

/// Bit set on the compression tag when the payload is stored externally.
pub const EXTERNAL_FLAG: u8 = 0x80;

const LZ4_MAGIC: &[u8; 8] = b"LZ4Block";
const LZ4_HEADER_LEN: usize = LZ4_MAGIC.len() + 1 + 4 + 4 + 4;
const LZ4_METHOD_RAW: u8 = 0x10;
const LZ4_METHOD_LZ4: u8 = 0x20;

/// Supported payload compression algorithms.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Compression {
    /// RFC 1952 gzip.
    Gzip = 1,
    /// RFC 1950 zlib.
    Zlib = 2,
    /// Stored as-is.
    None = 3,
    /// LZ4 block stream.
    Lz4 = 4,
}

impl Compression {
    /// Splits a raw tag into its algorithm and the external flag.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedCompression` for unknown algorithm ids.
    pub fn from_tag(tag: u8) -> WorldResult<(Self, bool)> {
        let external = tag & EXTERNAL_FLAG != 0;
        let algorithm = match tag & !EXTERNAL_FLAG {
            1 => Self::Gzip,
            2 => Self::Zlib,
            3 => Self::None,
            4 => Self::Lz4,
            _ => return Err(WorldError::UnsupportedCompression(tag)),
        };
        Ok((algorithm, external))
    }

    /// Tag byte for this algorithm.
    #[inline]
    #[must_use]
    pub const fn tag(self) -> u8 {
        self as u8
    }

    /// Decompresses `data` with this algorithm.
    ///
    /// # Errors
    ///
    /// Returns `MalformedData` if the stream is corrupt.
    pub fn decompress(self, data: &[u8]) -> WorldResult<Vec<u8>> {
        match self {
            Self::Gzip => read_all(GzDecoder::new(data)),
            Self::Zlib => read_all(ZlibDecoder::new(data)),
            Self::None => Ok(data.to_vec()),
            Self::Lz4 => decompress_lz4_stream(data),
        }
    }

    /// Compresses `data` with this algorithm.
    #[must_use]
    pub fn compress(self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::Gzip => {
                let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
                // Writes into a Vec cannot fail.
                let _ = encoder.write_all(data);
                encoder.finish().unwrap_or_default()
            }
            Self::Zlib => {
                let mut encoder = ZlibEncoder::new(Vec::new(), flate2::Compression::default());
                let _ = encoder.write_all(data);
                encoder.finish().unwrap_or_default()
            }
            Self::None => data.to_vec(),
            Self::Lz4 => compress_lz4_stream(data),
        }
    }
}

fn read_all(mut reader: impl Read) -> WorldResult<Vec<u8>> {
    let mut out = Vec::new();
    reader
        .read_to_end(&mut out)
        .map_err(|e| WorldError::malformed(format!("corrupt compressed stream: {e}")))?;
    Ok(out)
}

fn read_le_u32(bytes: &[u8], at: usize) -> usize {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]) as usize
}

/// Decodes a sequence of `LZ4Block` frames until the empty terminator frame
/// or end of input.
fn decompress_lz4_stream(mut data: &[u8]) -> WorldResult<Vec<u8>> {
    let mut out = Vec::new();
    while !data.is_empty() {
        if data.len() < LZ4_HEADER_LEN || &data[..LZ4_MAGIC.len()] != LZ4_MAGIC {
            return Err(WorldError::malformed("bad LZ4Block header"));
        }
        let token = data[8];
        let compressed_len = read_le_u32(data, 9);
        let decompressed_len = read_le_u32(data, 13);
        let body = data
            .get(LZ4_HEADER_LEN..LZ4_HEADER_LEN + compressed_len)
            .ok_or_else(|| WorldError::malformed("truncated LZ4Block frame"))?;

        if decompressed_len == 0 {
            break;
        }
        match token & 0xF0 {
            LZ4_METHOD_RAW => out.extend_from_slice(body),
            LZ4_METHOD_LZ4 => {
                let block = lz4_flex::block::decompress(body, decompressed_len)
                    .map_err(|e| WorldError::malformed(format!("corrupt LZ4 block: {e}")))?;
                out.extend_from_slice(&block);
            }
            method => {
                return Err(WorldError::malformed(format!("unknown LZ4Block method {method:#x}")));
            }
        }
        data = &data[LZ4_HEADER_LEN + compressed_len..];
    }
    Ok(out)
}

fn push_lz4_frame(out: &mut Vec<u8>, method: u8, body: &[u8], decompressed_len: usize) {
    out.extend_from_slice(LZ4_MAGIC);
    out.push(method);
    out.extend_from_slice(&(body.len() as u32).to_le_bytes());
    out.extend_from_slice(&(decompressed_len as u32).to_le_bytes());
    // Checksum is not verified on read.
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(body);
}

fn compress_lz4_stream(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    if !data.is_empty() {
        let block = lz4_flex::block::compress(data);
        push_lz4_frame(&mut out, LZ4_METHOD_LZ4, &block, data.len());
    }
    push_lz4_frame(&mut out, LZ4_METHOD_RAW, &[], 0);
    out
}
