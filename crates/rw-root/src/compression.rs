//! ROOT record compression.
//!
//! A compressed record is a run of blocks, each a 9-byte header followed by
//! the compressed bytes:
//!
//! ```text
//! 0..2  algorithm tag: "ZL" zlib, "L4" lz4, "ZS" zstd, "XZ" xz
//! 2     method byte
//! 3..6  compressed length, 24-bit little-endian
//! 6..9  uncompressed length, 24-bit little-endian
//! ```
//!
//! All four algorithms are decoded. Records are encoded with zlib only.

use std::io::{Read, Write};

use crate::error::{Result, RootError};

/// Size of a block header.
pub const BLOCK_HEADER_LEN: usize = 9;

/// Largest length a block header can describe.
pub const MAX_BLOCK_LEN: usize = 0xFF_FFFF;

/// Method byte ROOT stores in zlib block headers.
const ZLIB_METHOD: u8 = 8;

/// Payload compression applied by [`RootWriter`](crate::RootWriter).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    /// Store payloads as-is.
    None,
    /// zlib at the given level. Levels outside 1..=9 are clamped.
    Zlib(u32),
}

impl Default for Compression {
    fn default() -> Self {
        Compression::Zlib(1)
    }
}

impl Compression {
    fn zlib_level(self) -> Option<u32> {
        match self {
            Compression::None => None,
            Compression::Zlib(level) => Some(level.clamp(1, 9)),
        }
    }

    /// `fCompress` value for the file header: `algorithm * 100 + level`.
    pub fn setting(self) -> u32 {
        self.zlib_level().map_or(0, |level| 100 + level)
    }

    /// Encode a record payload. Returns the payload unchanged when
    /// compression is off or does not make it smaller, which readers detect
    /// from the key's object length.
    pub fn compress(self, raw: &[u8]) -> Result<Vec<u8>> {
        let packed = match self.zlib_level() {
            Some(level) => zlib_blocks(raw, level, MAX_BLOCK_LEN)?,
            None => None,
        };
        Ok(packed.unwrap_or_else(|| raw.to_vec()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Algorithm {
    Zlib,
    Lz4,
    Zstd,
    Xz,
}

impl Algorithm {
    fn from_tag(tag: [u8; 2]) -> Option<Self> {
        match &tag {
            b"ZL" => Some(Algorithm::Zlib),
            b"L4" => Some(Algorithm::Lz4),
            b"ZS" => Some(Algorithm::Zstd),
            b"XZ" => Some(Algorithm::Xz),
            _ => None,
        }
    }

    fn tag(self) -> [u8; 2] {
        match self {
            Algorithm::Zlib => *b"ZL",
            Algorithm::Lz4 => *b"L4",
            Algorithm::Zstd => *b"ZS",
            Algorithm::Xz => *b"XZ",
        }
    }

    /// Decode one block body into `out_len` bytes.
    fn inflate(self, body: &[u8], out_len: usize) -> Result<Vec<u8>> {
        let fail = |e: &dyn std::fmt::Display| {
            RootError::Decompression(format!("{:?} block: {}", self, e))
        };
        match self {
            Algorithm::Zlib => {
                let mut out = Vec::with_capacity(out_len);
                flate2::read::ZlibDecoder::new(body)
                    .read_to_end(&mut out)
                    .map_err(|e| fail(&e))?;
                Ok(out)
            }
            Algorithm::Lz4 => {
                // an xxhash64 of the data precedes the lz4 block
                let data = body.get(8..).ok_or_else(|| fail(&"missing checksum"))?;
                lz4_flex::decompress(data, out_len).map_err(|e| fail(&e))
            }
            Algorithm::Zstd => {
                let mut out = vec![0u8; out_len];
                let n = ruzstd::decoding::FrameDecoder::new()
                    .decode_all(body, &mut out)
                    .map_err(|e| fail(&e))?;
                out.truncate(n);
                Ok(out)
            }
            Algorithm::Xz => {
                let mut input = body;
                let mut out = Vec::with_capacity(out_len);
                lzma_rs::xz_decompress(&mut input, &mut out).map_err(|e| fail(&e))?;
                Ok(out)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BlockHeader {
    algorithm: Algorithm,
    method: u8,
    c_len: usize,
    u_len: usize,
}

impl BlockHeader {
    fn parse(b: &[u8]) -> Result<Self> {
        let algorithm = Algorithm::from_tag([b[0], b[1]]).ok_or_else(|| {
            RootError::Decompression(format!(
                "unsupported compression algorithm {:?}",
                String::from_utf8_lossy(&b[..2])
            ))
        })?;
        Ok(Self {
            algorithm,
            method: b[2],
            c_len: u32::from_le_bytes([b[3], b[4], b[5], 0]) as usize,
            u_len: u32::from_le_bytes([b[6], b[7], b[8], 0]) as usize,
        })
    }

    fn encode(&self) -> [u8; BLOCK_HEADER_LEN] {
        let [tag0, tag1] = self.algorithm.tag();
        let c = (self.c_len as u32).to_le_bytes();
        let u = (self.u_len as u32).to_le_bytes();
        [tag0, tag1, self.method, c[0], c[1], c[2], u[0], u[1], u[2]]
    }
}

/// Decode a compressed record into exactly `expected_len` bytes.
pub fn decompress(src: &[u8], expected_len: usize) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(expected_len);
    let mut rest = src;

    while out.len() < expected_len && rest.len() >= BLOCK_HEADER_LEN {
        let (head, tail) = rest.split_at(BLOCK_HEADER_LEN);
        let header = BlockHeader::parse(head)?;
        if header.c_len > tail.len() {
            return Err(RootError::Decompression(format!(
                "block of {} bytes truncated to {}",
                header.c_len,
                tail.len()
            )));
        }
        let (body, next) = tail.split_at(header.c_len);

        let block = header.algorithm.inflate(body, header.u_len)?;
        if block.len() != header.u_len {
            return Err(RootError::Decompression(format!(
                "block inflated to {} bytes, header says {}",
                block.len(),
                header.u_len
            )));
        }
        out.extend_from_slice(&block);
        rest = next;
    }

    if out.len() != expected_len {
        return Err(RootError::Decompression(format!(
            "record inflated to {} bytes, key says {}",
            out.len(),
            expected_len
        )));
    }
    Ok(out)
}

/// zlib-encode `raw` in blocks of at most `block_len` input bytes. `None`
/// when the result would not be smaller than `raw`.
fn zlib_blocks(raw: &[u8], level: u32, block_len: usize) -> Result<Option<Vec<u8>>> {
    let mut out = Vec::with_capacity(raw.len());
    for chunk in raw.chunks(block_len) {
        let mut encoder =
            flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::new(level));
        encoder.write_all(chunk)?;
        let body = encoder.finish()?;
        if body.len() > MAX_BLOCK_LEN {
            return Ok(None);
        }
        let header = BlockHeader {
            algorithm: Algorithm::Zlib,
            method: ZLIB_METHOD,
            c_len: body.len(),
            u_len: chunk.len(),
        };
        out.extend_from_slice(&header.encode());
        out.extend_from_slice(&body);
    }
    Ok((out.len() < raw.len()).then_some(out))
}
