//! Stack schema parsing from YAML files
//!
//! A schema declares the arrays a stack file is expected to hold. It drives
//! the writer (pushes are validated against the declaration) and computes the
//! byte layout of the resulting file up front.

use std::path::Path;

use serde::Deserialize;

use super::header::{DType, HEADER_SIZE, KEY_BYTES, MAX_RANK, TOC_ENTRY_SIZE};
use crate::utils::StoreError;

/// Current schema version
pub const SCHEMA_VERSION: u32 = 1;

/// Declaration of one array in a stack file
#[derive(Debug, Clone, Deserialize)]
pub struct ArrayDef {
    /// Array key
    pub key: String,

    /// Element type
    pub dtype: DType,

    /// Axis extents, first axis slowest
    pub shape: Vec<usize>,
}

impl ArrayDef {
    /// Total byte size of the declared array data
    pub fn byte_len(&self) -> usize {
        let elements: usize = self.shape.iter().product();
        elements * self.dtype.element_size()
    }
}

/// Parsed stack schema
#[derive(Debug, Clone, Deserialize)]
pub struct StackSchema {
    /// Schema version
    pub version: u32,

    /// Declared arrays, in file order
    arrays: Vec<ArrayDef>,
}

/// Computed placement of one array within the file
#[derive(Debug, Clone)]
pub struct ArrayPlacement {
    /// Array key
    pub key: String,

    /// Byte offset of the array data from the start of the file
    pub offset: usize,

    /// Total byte length of the array data
    pub byte_len: usize,
}

/// Computed file layout for a schema
#[derive(Debug, Clone)]
pub struct StackLayout {
    /// Placements in file order
    pub arrays: Vec<ArrayPlacement>,

    /// Total file size in bytes
    pub total_size: usize,
}

impl StackSchema {
    /// Load and validate a schema from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|source| {
            StoreError::OpenFailed {
                path: path.as_ref().to_path_buf(),
                source,
            }
        })?;
        Self::from_yaml(&content)
    }

    /// Parse and validate a schema from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, StoreError> {
        let schema: StackSchema =
            serde_yaml::from_str(yaml).map_err(|e| StoreError::Schema(e.to_string()))?;
        schema.validate()?;
        Ok(schema)
    }

    fn validate(&self) -> Result<(), StoreError> {
        if self.version > SCHEMA_VERSION {
            return Err(StoreError::Schema(format!(
                "unsupported schema version {}",
                self.version
            )));
        }
        if self.arrays.is_empty() {
            return Err(StoreError::Schema(
                "schema declares no arrays".to_string(),
            ));
        }
        for (idx, def) in self.arrays.iter().enumerate() {
            if def.key.is_empty() || def.key.len() >= KEY_BYTES {
                return Err(StoreError::Schema(format!(
                    "key {:?} must be between 1 and {} bytes",
                    def.key,
                    KEY_BYTES - 1
                )));
            }
            if self.arrays[..idx].iter().any(|other| other.key == def.key) {
                return Err(StoreError::Schema(format!("duplicate key {:?}", def.key)));
            }
            if def.shape.len() > MAX_RANK {
                return Err(StoreError::Schema(format!(
                    "key {:?}: rank {} exceeds maximum {}",
                    def.key,
                    def.shape.len(),
                    MAX_RANK
                )));
            }
            if def.shape.iter().any(|&axis| axis == 0) {
                return Err(StoreError::Schema(format!(
                    "key {:?}: zero-length axis",
                    def.key
                )));
            }
        }
        Ok(())
    }

    /// Get the declared arrays, in file order
    #[inline]
    pub fn arrays(&self) -> &[ArrayDef] {
        &self.arrays
    }

    /// Find a declared array by key
    pub fn array(&self, key: &str) -> Option<&ArrayDef> {
        self.arrays.iter().find(|def| def.key == key)
    }

    /// Compute the byte layout of the declared file
    ///
    /// Data regions follow the header and table of contents contiguously, in
    /// declaration order, matching what the writer produces.
    pub fn layout(&self) -> StackLayout {
        let mut offset = HEADER_SIZE + self.arrays.len() * TOC_ENTRY_SIZE;
        let mut placements = Vec::with_capacity(self.arrays.len());
        for def in &self.arrays {
            let byte_len = def.byte_len();
            placements.push(ArrayPlacement {
                key: def.key.clone(),
                offset,
                byte_len,
            });
            offset += byte_len;
        }
        StackLayout {
            arrays: placements,
            total_size: offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DETECTOR_SCHEMA_YAML: &str = r#"
version: 1
arrays:
  - key: frames
    dtype: int32
    shape: [100, 10, 10]
  - key: count_times
    dtype: float32
    shape: [100]
  - key: mask
    dtype: uint8
    shape: [10, 10]
"#;

    #[test]
    fn test_parse_detector_schema() {
        let schema = StackSchema::from_yaml(DETECTOR_SCHEMA_YAML).unwrap();
        assert_eq!(schema.arrays().len(), 3);

        let frames = schema.array("frames").unwrap();
        assert_eq!(frames.dtype, DType::Int32);
        assert_eq!(frames.shape, vec![100, 10, 10]);
        assert_eq!(frames.byte_len(), 100 * 10 * 10 * 4);

        assert!(schema.array("missing").is_none());
    }

    #[test]
    fn test_layout_offsets() {
        let schema = StackSchema::from_yaml(DETECTOR_SCHEMA_YAML).unwrap();
        let layout = schema.layout();

        let data_start = HEADER_SIZE + 3 * TOC_ENTRY_SIZE;
        assert_eq!(layout.arrays[0].offset, data_start);
        assert_eq!(layout.arrays[1].offset, data_start + 100 * 10 * 10 * 4);
        assert_eq!(
            layout.arrays[2].offset,
            data_start + 100 * 10 * 10 * 4 + 100 * 4
        );
        assert_eq!(
            layout.total_size,
            data_start + 100 * 10 * 10 * 4 + 100 * 4 + 10 * 10
        );
    }

    #[test]
    fn test_invalid_yaml_rejected() {
        let result = StackSchema::from_yaml("version: [not a number");
        assert!(matches!(result, Err(StoreError::Schema(_))));
    }

    #[test]
    fn test_future_version_rejected() {
        let result = StackSchema::from_yaml("version: 99\narrays:\n  - key: a\n    dtype: float32\n    shape: [1]\n");
        assert!(matches!(result, Err(StoreError::Schema(_))));
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let yaml = r#"
version: 1
arrays:
  - key: frames
    dtype: float32
    shape: [4]
  - key: frames
    dtype: float32
    shape: [4]
"#;
        let result = StackSchema::from_yaml(yaml);
        assert!(matches!(result, Err(StoreError::Schema(_))));
    }

    #[test]
    fn test_empty_arrays_rejected() {
        let result = StackSchema::from_yaml("version: 1\narrays: []\n");
        assert!(matches!(result, Err(StoreError::Schema(_))));
    }

    #[test]
    fn test_zero_axis_rejected() {
        let yaml = "version: 1\narrays:\n  - key: a\n    dtype: float32\n    shape: [0, 4]\n";
        let result = StackSchema::from_yaml(yaml);
        assert!(matches!(result, Err(StoreError::Schema(_))));
    }
}
