//! Memory-mapped stack file
//!
//! This module provides zero-copy access to the arrays held in a stack file.
//! The file is mapped into memory read-only and every table-of-contents entry
//! is validated at open time, so later reads never touch bytes outside the
//! mapping.

use std::fs::File;
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use tracing::debug;

use super::header::{
    DType, StackHeader, TocEntry, HEADER_SIZE, MAX_RANK, STACK_MAGIC, STACK_VERSION, TOC_ENTRY_SIZE,
};
use crate::utils::StoreError;

/// Parsed metadata for one array in a stack file
#[derive(Debug, Clone)]
pub struct ArrayMeta {
    /// Array key
    pub key: String,
    /// Element type
    pub dtype: DType,
    /// Axis extents, first axis slowest
    pub shape: Vec<usize>,
    /// Byte offset of the array data from the start of the file
    pub offset: usize,
    /// Total byte length of the array data
    pub byte_len: usize,
}

impl ArrayMeta {
    /// Total number of elements
    pub fn element_count(&self) -> usize {
        self.shape.iter().product()
    }
}

/// Memory-mapped stack file
///
/// Provides zero-copy access to named arrays. Thread-safe: safe to share via
/// Arc, the mapping is read-only.
pub struct StackFile {
    path: PathBuf,
    mmap: Mmap,
    arrays: Vec<ArrayMeta>,
}

impl StackFile {
    /// Open a stack file and memory map it
    ///
    /// # Arguments
    /// * `path` - Path to the stack file
    ///
    /// # Returns
    /// * `Ok(StackFile)` on success
    /// * `Err(StoreError)` if the file cannot be opened, mapped, or fails
    ///   header and TOC validation
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|source| StoreError::OpenFailed {
            path: path.clone(),
            source,
        })?;

        // SAFETY: The file is opened read-only and we don't modify the memory
        let mmap = unsafe { Mmap::map(&file) }.map_err(|source| StoreError::OpenFailed {
            path: path.clone(),
            source,
        })?;

        if mmap.len() < HEADER_SIZE {
            return Err(StoreError::FileTooSmall {
                size: mmap.len() as u64,
                minimum: HEADER_SIZE as u64,
            });
        }

        // Parse header (packed struct, use unaligned read)
        // SAFETY: We've verified the file is at least HEADER_SIZE bytes
        let header: StackHeader =
            unsafe { std::ptr::read_unaligned(mmap.as_ptr() as *const StackHeader) };

        let magic = header.magic;
        if magic != STACK_MAGIC {
            return Err(StoreError::InvalidMagic {
                expected: STACK_MAGIC,
                actual: magic,
            });
        }

        let version = header.version;
        if version > STACK_VERSION {
            return Err(StoreError::UnsupportedVersion(version));
        }

        let array_count = header.array_count as usize;
        let toc_end = HEADER_SIZE + array_count * TOC_ENTRY_SIZE;
        if mmap.len() < toc_end {
            return Err(StoreError::FileTooSmall {
                size: mmap.len() as u64,
                minimum: toc_end as u64,
            });
        }

        let mut arrays = Vec::with_capacity(array_count);
        for idx in 0..array_count {
            let entry_offset = HEADER_SIZE + idx * TOC_ENTRY_SIZE;
            // SAFETY: The entry extent was checked against the mapping above
            let entry: TocEntry = unsafe {
                std::ptr::read_unaligned(mmap.as_ptr().add(entry_offset) as *const TocEntry)
            };
            let meta = Self::validate_entry(&entry, mmap.len())?;
            arrays.push(meta);
        }

        debug!(path = %path.display(), arrays = arrays.len(), "opened stack file");

        Ok(Self { path, mmap, arrays })
    }

    /// Validate one TOC entry and convert it to parsed metadata
    fn validate_entry(entry: &TocEntry, file_len: usize) -> Result<ArrayMeta, StoreError> {
        let key = entry.key_str().to_string();

        let dtype = DType::from_u8(entry.dtype).ok_or_else(|| StoreError::Shape {
            key: key.clone(),
            reason: format!("unknown dtype identifier {}", entry.dtype),
        })?;

        let rank = entry.rank as usize;
        if rank > MAX_RANK {
            return Err(StoreError::Shape {
                key,
                reason: format!("rank {} exceeds maximum {}", rank, MAX_RANK),
            });
        }

        let shape = entry.shape_vec();
        if shape.iter().any(|&axis| axis == 0) {
            return Err(StoreError::Shape {
                key,
                reason: "zero-length axis".to_string(),
            });
        }

        // Overflow-checked extent: element count * element size must fit the file
        let elements = shape
            .iter()
            .try_fold(1usize, |acc, &axis| acc.checked_mul(axis))
            .ok_or_else(|| StoreError::Shape {
                key: key.clone(),
                reason: "element count overflows usize".to_string(),
            })?;
        let byte_len = elements
            .checked_mul(dtype.element_size())
            .ok_or_else(|| StoreError::Shape {
                key: key.clone(),
                reason: "byte length overflows usize".to_string(),
            })?;

        let offset = entry.data_offset as usize;
        let end = offset.checked_add(byte_len).ok_or_else(|| StoreError::Shape {
            key: key.clone(),
            reason: "data extent overflows usize".to_string(),
        })?;
        if end > file_len {
            return Err(StoreError::FileTooSmall {
                size: file_len as u64,
                minimum: end as u64,
            });
        }

        Ok(ArrayMeta {
            key,
            dtype,
            shape,
            offset,
            byte_len,
        })
    }

    // === Accessors ===

    /// Get the file path this stack was opened from
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get metadata for every array, in TOC order
    #[inline]
    pub fn arrays(&self) -> &[ArrayMeta] {
        &self.arrays
    }

    /// Find an array by key
    pub fn find(&self, key: &str) -> Option<&ArrayMeta> {
        self.arrays.iter().find(|meta| meta.key == key)
    }

    /// Get raw bytes for an array (zero-copy)
    ///
    /// The extent was validated at open time, so the slice is always within
    /// the mapping.
    #[inline]
    pub fn array_bytes(&self, meta: &ArrayMeta) -> &[u8] {
        &self.mmap[meta.offset..meta.offset + meta.byte_len]
    }

    /// Get total memory mapped size in bytes
    pub fn mmap_size(&self) -> usize {
        self.mmap.len()
    }

    /// Get stack summary string
    pub fn summary(&self) -> String {
        format!(
            "Stack: {} arrays, {} bytes mapped, path={}",
            self.arrays.len(),
            self.mmap.len(),
            self.path.display()
        )
    }
}
