//! Stack file header and table of contents structures
//!
//! This module defines the binary container format for frame stacks. A stack
//! file holds one or more named multi-dimensional arrays, each addressed by a
//! fixed-size table-of-contents entry. The packed representation keeps the
//! on-disk layout byte-for-byte stable across platforms.

use serde::Deserialize;

/// Stack file magic number to identify valid files
pub const STACK_MAGIC: u32 = 0x4653_544B;

/// Current container format version
pub const STACK_VERSION: u32 = 1;

/// Header size in bytes
pub const HEADER_SIZE: usize = 64;

/// Table-of-contents entry size in bytes
pub const TOC_ENTRY_SIZE: usize = 144;

/// Maximum array rank representable in a TOC entry
pub const MAX_RANK: usize = 8;

/// Fixed byte size reserved for an array key (NUL-terminated, max 63 chars)
pub const KEY_BYTES: usize = 64;

/// Element type identifiers
///
/// Also deserializable from schema YAML, so the writer and the binary format
/// share a single definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum DType {
    Float32 = 0,
    Float64 = 1,
    Int32 = 2,
    Uint8 = 3,
}

impl DType {
    /// Get element size in bytes
    pub fn element_size(&self) -> usize {
        match self {
            DType::Float32 | DType::Int32 => 4,
            DType::Float64 => 8,
            DType::Uint8 => 1,
        }
    }

    /// Parse from raw byte value, `None` for unknown identifiers
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(DType::Float32),
            1 => Some(DType::Float64),
            2 => Some(DType::Int32),
            3 => Some(DType::Uint8),
            _ => None,
        }
    }

    /// Get string representation for display
    pub fn as_str(&self) -> &'static str {
        match self {
            DType::Float32 => "float32",
            DType::Float64 => "float64",
            DType::Int32 => "int32",
            DType::Uint8 => "uint8",
        }
    }

    /// Decode one little-endian element at `idx` within `bytes` to f32
    ///
    /// All frame payloads are surfaced as f32, whatever the stored type.
    ///
    /// # Panics
    /// Panics if the element extent lies outside `bytes`.
    #[inline]
    pub fn decode_f32(&self, bytes: &[u8], idx: usize) -> f32 {
        let start = idx * self.element_size();
        match self {
            DType::Float32 => {
                let raw: [u8; 4] = bytes[start..start + 4]
                    .try_into()
                    .expect("4-byte extent checked by slice bounds");
                f32::from_le_bytes(raw)
            }
            DType::Float64 => {
                let raw: [u8; 8] = bytes[start..start + 8]
                    .try_into()
                    .expect("8-byte extent checked by slice bounds");
                f64::from_le_bytes(raw) as f32
            }
            DType::Int32 => {
                let raw: [u8; 4] = bytes[start..start + 4]
                    .try_into()
                    .expect("4-byte extent checked by slice bounds");
                i32::from_le_bytes(raw) as f32
            }
            DType::Uint8 => bytes[start] as f32,
        }
    }
}

/// Stack file header
///
/// Read directly from the start of the file. The packed representation
/// ensures byte-for-byte compatibility with files produced by the writer.
///
/// Layout:
///   - I: magic (4 bytes)
///   - I: version (4 bytes)
///   - I: array_count (4 bytes)
///   - 52x: reserved (pads header to 64 bytes)
#[repr(C, packed)]
#[derive(Debug, Clone, Copy)]
pub struct StackHeader {
    /// Magic number (0x4653544B)
    pub magic: u32,
    /// Format version
    pub version: u32,
    /// Number of TOC entries following the header
    pub array_count: u32,
    /// Reserved for future use
    pub reserved: [u8; 52],
}

// Ensure the header is exactly 64 bytes
const _: () = assert!(std::mem::size_of::<StackHeader>() == HEADER_SIZE);

impl StackHeader {
    /// Build a header for `array_count` arrays at the current version
    pub fn new(array_count: u32) -> Self {
        Self {
            magic: STACK_MAGIC,
            version: STACK_VERSION,
            array_count,
            reserved: [0u8; 52],
        }
    }
}

/// Table-of-contents entry for one named array
///
/// Layout:
///   - 64s: key (NUL-terminated)
///   - B: dtype (1 byte)
///   - B: rank (1 byte)
///   - xxxxxx: padding (6 bytes)
///   - 8Q: shape (64 bytes, axes beyond rank are zero)
///   - Q: data_offset (8 bytes)
#[repr(C, packed)]
#[derive(Debug, Clone, Copy)]
pub struct TocEntry {
    /// Array key (NUL-terminated, max 63 chars)
    pub key: [u8; KEY_BYTES],
    /// Element type identifier
    pub dtype: u8,
    /// Number of axes
    pub rank: u8,
    /// Padding for alignment
    pub _padding: [u8; 6],
    /// Axis extents, first axis slowest
    pub shape: [u64; MAX_RANK],
    /// Byte offset of the array data from the start of the file
    pub data_offset: u64,
}

// Ensure the entry is exactly 144 bytes
const _: () = assert!(std::mem::size_of::<TocEntry>() == TOC_ENTRY_SIZE);

impl TocEntry {
    /// Get the key as a string, trimming the NUL terminator
    pub fn key_str(&self) -> &str {
        let end = self
            .key
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(self.key.len());
        std::str::from_utf8(&self.key[..end]).unwrap_or("invalid")
    }

    /// Get the shape as a vector of the first `rank` axes
    pub fn shape_vec(&self) -> Vec<usize> {
        let shape = self.shape;
        shape[..self.rank as usize]
            .iter()
            .map(|&axis| axis as usize)
            .collect()
    }
}
