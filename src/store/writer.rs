//! Stack file writer
//!
//! Builds a stack file in memory and writes header, table of contents and
//! array data in one pass. Offsets are computed when the file is written, so
//! arrays can be pushed in any order.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use ndarray::ArrayD;
use tracing::debug;

use super::header::{DType, StackHeader, HEADER_SIZE, KEY_BYTES, MAX_RANK, TOC_ENTRY_SIZE};
use super::schema::StackSchema;
use crate::utils::StoreError;

struct PendingArray {
    key: String,
    dtype: DType,
    shape: Vec<usize>,
    bytes: Vec<u8>,
}

/// Builder for stack files
///
/// With a schema attached, every push is validated against the declared
/// arrays and the write refuses to finish while declared arrays are missing.
#[derive(Default)]
pub struct StackWriter {
    arrays: Vec<PendingArray>,
    schema: Option<StackSchema>,
}

impl StackWriter {
    /// Create a new writer
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a writer validated against a schema
    pub fn with_schema(schema: StackSchema) -> Self {
        Self {
            arrays: Vec::new(),
            schema: Some(schema),
        }
    }

    /// Push an f32 array under `key`
    pub fn push_f32(&mut self, key: &str, array: &ArrayD<f32>) -> Result<(), StoreError> {
        let mut bytes = Vec::with_capacity(array.len() * 4);
        for value in array.iter() {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        self.push_raw(key, DType::Float32, array.shape().to_vec(), bytes)
    }

    /// Push an f64 array under `key`
    pub fn push_f64(&mut self, key: &str, array: &ArrayD<f64>) -> Result<(), StoreError> {
        let mut bytes = Vec::with_capacity(array.len() * 8);
        for value in array.iter() {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        self.push_raw(key, DType::Float64, array.shape().to_vec(), bytes)
    }

    /// Push an i32 array under `key`
    pub fn push_i32(&mut self, key: &str, array: &ArrayD<i32>) -> Result<(), StoreError> {
        let mut bytes = Vec::with_capacity(array.len() * 4);
        for value in array.iter() {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        self.push_raw(key, DType::Int32, array.shape().to_vec(), bytes)
    }

    /// Push a u8 array under `key`
    pub fn push_u8(&mut self, key: &str, array: &ArrayD<u8>) -> Result<(), StoreError> {
        let bytes = array.iter().copied().collect();
        self.push_raw(key, DType::Uint8, array.shape().to_vec(), bytes)
    }

    /// Push raw little-endian element bytes under `key`
    ///
    /// # Arguments
    /// * `key` - Array key, at most 63 bytes
    /// * `dtype` - Element type of `bytes`
    /// * `shape` - Axis extents, first axis slowest
    /// * `bytes` - Row-major element data matching `shape`
    pub fn push_raw(
        &mut self,
        key: &str,
        dtype: DType,
        shape: Vec<usize>,
        bytes: Vec<u8>,
    ) -> Result<(), StoreError> {
        if key.is_empty() || key.len() >= KEY_BYTES {
            return Err(StoreError::Schema(format!(
                "key {:?} must be between 1 and {} bytes",
                key,
                KEY_BYTES - 1
            )));
        }
        if self.arrays.iter().any(|pending| pending.key == key) {
            return Err(StoreError::Schema(format!("duplicate key {:?}", key)));
        }
        if shape.len() > MAX_RANK {
            return Err(StoreError::Shape {
                key: key.to_string(),
                reason: format!("rank {} exceeds maximum {}", shape.len(), MAX_RANK),
            });
        }
        if shape.iter().any(|&axis| axis == 0) {
            return Err(StoreError::Shape {
                key: key.to_string(),
                reason: "zero-length axis".to_string(),
            });
        }
        let elements: usize = shape.iter().product();
        if bytes.len() != elements * dtype.element_size() {
            return Err(StoreError::Shape {
                key: key.to_string(),
                reason: format!(
                    "{} bytes do not match {} {} elements",
                    bytes.len(),
                    elements,
                    dtype.as_str()
                ),
            });
        }

        if let Some(ref schema) = self.schema {
            let def = schema.array(key).ok_or_else(|| {
                StoreError::Schema(format!("key {:?} not declared in schema", key))
            })?;
            if def.dtype != dtype || def.shape != shape {
                return Err(StoreError::Schema(format!(
                    "key {:?} declared as {} {:?}, pushed as {} {:?}",
                    key,
                    def.dtype.as_str(),
                    def.shape,
                    dtype.as_str(),
                    shape
                )));
            }
        }

        self.arrays.push(PendingArray {
            key: key.to_string(),
            dtype,
            shape,
            bytes,
        });
        Ok(())
    }

    /// Write header, table of contents and data to `path`
    pub fn write_to(&self, path: &Path) -> Result<(), StoreError> {
        if let Some(ref schema) = self.schema {
            for def in schema.arrays() {
                if !self.arrays.iter().any(|pending| pending.key == def.key) {
                    return Err(StoreError::Schema(format!(
                        "declared key {:?} was never pushed",
                        def.key
                    )));
                }
            }
        }

        let wrap_io = |source: std::io::Error| StoreError::WriteFailed {
            path: path.to_path_buf(),
            source,
        };

        let file = File::create(path).map_err(wrap_io)?;
        let mut out = BufWriter::new(file);

        let header = StackHeader::new(self.arrays.len() as u32);
        out.write_all(&header.magic.to_le_bytes()).map_err(wrap_io)?;
        out.write_all(&header.version.to_le_bytes())
            .map_err(wrap_io)?;
        out.write_all(&header.array_count.to_le_bytes())
            .map_err(wrap_io)?;
        out.write_all(&header.reserved).map_err(wrap_io)?;

        // TOC entries, data packed contiguously after the table
        let mut data_offset = HEADER_SIZE + self.arrays.len() * TOC_ENTRY_SIZE;
        for pending in &self.arrays {
            let mut key = [0u8; KEY_BYTES];
            key[..pending.key.len()].copy_from_slice(pending.key.as_bytes());
            out.write_all(&key).map_err(wrap_io)?;
            out.write_all(&[pending.dtype as u8, pending.shape.len() as u8])
                .map_err(wrap_io)?;
            out.write_all(&[0u8; 6]).map_err(wrap_io)?;
            let mut shape = [0u64; MAX_RANK];
            for (slot, &axis) in shape.iter_mut().zip(&pending.shape) {
                *slot = axis as u64;
            }
            for axis in shape {
                out.write_all(&axis.to_le_bytes()).map_err(wrap_io)?;
            }
            out.write_all(&(data_offset as u64).to_le_bytes())
                .map_err(wrap_io)?;
            data_offset += pending.bytes.len();
        }

        for pending in &self.arrays {
            out.write_all(&pending.bytes).map_err(wrap_io)?;
        }
        out.flush().map_err(wrap_io)?;

        debug!(
            path = %path.display(),
            arrays = self.arrays.len(),
            bytes = data_offset,
            "wrote stack file"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::stack_file::StackFile;
    use ndarray::{ArrayD, IxDyn};
    use tempfile::tempdir;

    fn filled(shape: &[usize], offset: f32) -> ArrayD<f32> {
        let len: usize = shape.iter().product();
        ArrayD::from_shape_vec(IxDyn(shape), (0..len).map(|v| v as f32 + offset).collect())
            .unwrap()
    }

    #[test]
    fn test_round_trip_multiple_arrays() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("multi.stack");

        let mut writer = StackWriter::new();
        writer.push_f32("frames", &filled(&[4, 3, 3], 0.0)).unwrap();
        writer.push_f32("times", &filled(&[4], 100.0)).unwrap();
        writer
            .push_u8(
                "mask",
                &ArrayD::from_shape_vec(IxDyn(&[3, 3]), vec![1u8; 9]).unwrap(),
            )
            .unwrap();
        writer.write_to(&path).unwrap();

        let stack = StackFile::open(&path).unwrap();
        assert_eq!(stack.arrays().len(), 3);
        assert_eq!(stack.find("frames").unwrap().shape, vec![4, 3, 3]);
        assert_eq!(stack.find("times").unwrap().shape, vec![4]);
        assert_eq!(stack.find("mask").unwrap().shape, vec![3, 3]);

        // Data regions are contiguous and non-overlapping
        let frames = stack.find("frames").unwrap();
        let times = stack.find("times").unwrap();
        assert_eq!(times.offset, frames.offset + frames.byte_len);
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let mut writer = StackWriter::new();
        writer.push_f32("frames", &filled(&[2, 2], 0.0)).unwrap();
        let result = writer.push_f32("frames", &filled(&[2, 2], 0.0));
        assert!(matches!(result, Err(StoreError::Schema(_))));
    }

    #[test]
    fn test_zero_axis_rejected() {
        let mut writer = StackWriter::new();
        let result = writer.push_raw("bad", DType::Float32, vec![0, 4], Vec::new());
        assert!(matches!(result, Err(StoreError::Shape { .. })));
    }

    #[test]
    fn test_byte_length_mismatch_rejected() {
        let mut writer = StackWriter::new();
        let result = writer.push_raw("bad", DType::Float32, vec![2, 2], vec![0u8; 15]);
        assert!(matches!(result, Err(StoreError::Shape { .. })));
    }

    #[test]
    fn test_overlong_key_rejected() {
        let mut writer = StackWriter::new();
        let key = "k".repeat(KEY_BYTES);
        let result = writer.push_f32(&key, &filled(&[2], 0.0));
        assert!(matches!(result, Err(StoreError::Schema(_))));
    }

    #[test]
    fn test_schema_enforced() {
        let schema = StackSchema::from_yaml(
            r#"
version: 1
arrays:
  - key: frames
    dtype: float32
    shape: [2, 2]
"#,
        )
        .unwrap();

        let mut writer = StackWriter::with_schema(schema.clone());
        let result = writer.push_f32("other", &filled(&[2, 2], 0.0));
        assert!(matches!(result, Err(StoreError::Schema(_))));

        let result = writer.push_f32("frames", &filled(&[4, 2], 0.0));
        assert!(matches!(result, Err(StoreError::Schema(_))));

        // Writing before all declared arrays are pushed fails
        let dir = tempdir().unwrap();
        let path = dir.path().join("incomplete.stack");
        let result = writer.write_to(&path);
        assert!(matches!(result, Err(StoreError::Schema(_))));

        writer.push_f32("frames", &filled(&[2, 2], 0.0)).unwrap();
        writer.write_to(&path).unwrap();
        assert!(StackFile::open(&path).is_ok());
    }
}
