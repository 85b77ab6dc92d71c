//! Frame-addressable view of one stored array
//!
//! A `FrameArray` binds an array inside an opened stack file to a frame
//! dimensionality: the trailing `frame_dims` axes form the frame payload,
//! the leading axes enumerate samples. Sample addressing happens on the
//! cached shape only, the mapped bytes are touched when a frame is read.

use std::path::Path;
use std::sync::Arc;

use ndarray::{ArrayD, IxDyn};

use super::stack_file::{ArrayMeta, StackFile};
use crate::utils::StoreError;
use crate::view::edges::ravel;

/// The payload produced by every frame read: an at-least-1-dimensional f32 array
pub type Frame = ArrayD<f32>;

/// One opened array bound to a frame dimensionality
///
/// Immutable once opened. The owning stack file is kept alive through an Arc
/// so several arrays (e.g. parallel keys of one file) can share one mapping.
pub struct FrameArray {
    stack: Arc<StackFile>,
    meta: ArrayMeta,
    /// Leading, sample-indexing axes
    leading_shape: Vec<usize>,
    /// Trailing payload axes
    frame_shape: Vec<usize>,
    /// Product of the leading axes (empty product is 1)
    sample_count: usize,
    /// Elements per frame
    frame_len: usize,
}

impl FrameArray {
    /// Bind the array at `key` in `stack` to a frame dimensionality
    ///
    /// # Arguments
    /// * `stack` - An opened stack file
    /// * `key` - The key of the array within the stack
    /// * `frame_dims` - The trailing dimensionality of the frame
    ///
    /// # Returns
    /// * `Ok(FrameArray)` on success
    /// * `Err(StoreError::KeyNotFound)` if the key is absent
    /// * `Err(StoreError::InvalidFrameDims)` if `frame_dims` exceeds the rank
    pub fn open(stack: Arc<StackFile>, key: &str, frame_dims: usize) -> Result<Self, StoreError> {
        let meta = stack
            .find(key)
            .cloned()
            .ok_or_else(|| StoreError::KeyNotFound {
                key: key.to_string(),
                path: stack.path().to_path_buf(),
            })?;

        let shape = meta.shape.clone();
        if frame_dims > shape.len() {
            return Err(StoreError::InvalidFrameDims {
                key: key.to_string(),
                frame_dims,
                rank: shape.len(),
            });
        }

        let split = shape.len() - frame_dims;
        let leading_shape = shape[..split].to_vec();
        let frame_shape = shape[split..].to_vec();
        let sample_count = leading_shape.iter().product();
        let frame_len = frame_shape.iter().product();

        Ok(Self {
            stack,
            meta,
            leading_shape,
            frame_shape,
            sample_count,
            frame_len,
        })
    }

    // === Accessors ===

    /// Get the source file path
    #[inline]
    pub fn path(&self) -> &Path {
        self.stack.path()
    }

    /// Get the array key
    #[inline]
    pub fn key(&self) -> &str {
        &self.meta.key
    }

    /// Get the full stored shape
    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.meta.shape
    }

    /// Get the leading, sample-indexing axes
    #[inline]
    pub fn leading_shape(&self) -> &[usize] {
        &self.leading_shape
    }

    /// Get the trailing payload axes
    #[inline]
    pub fn frame_shape(&self) -> &[usize] {
        &self.frame_shape
    }

    /// Get the number of frames held by this array
    #[inline]
    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    // === Frame reading ===

    /// Read the frame at a leading-axes coordinate
    ///
    /// The payload is decoded to f32 and surfaced at least 1-dimensional: a
    /// frame of dimensionality zero reads as a single-element array.
    ///
    /// # Panics
    /// Panics in debug mode if the coordinate rank or any component is out of
    /// bounds; resolve indices through an edge table for checked access.
    pub fn frame_at(&self, coordinate: &[usize]) -> Frame {
        debug_assert_eq!(
            coordinate.len(),
            self.leading_shape.len(),
            "coordinate rank mismatch"
        );
        debug_assert!(
            coordinate
                .iter()
                .zip(&self.leading_shape)
                .all(|(&c, &axis)| c < axis),
            "coordinate out of bounds"
        );

        let sample = ravel(coordinate, &self.leading_shape);
        let bytes = self.stack.array_bytes(&self.meta);
        let start = sample * self.frame_len;
        let mut elements = Vec::with_capacity(self.frame_len.max(1));
        for idx in start..start + self.frame_len {
            elements.push(self.meta.dtype.decode_f32(bytes, idx));
        }

        if self.frame_shape.is_empty() {
            Frame::from_shape_vec(IxDyn(&[1]), elements)
                .expect("single element matches shape [1]")
        } else {
            Frame::from_shape_vec(IxDyn(&self.frame_shape), elements)
                .expect("element count matches frame shape")
        }
    }
}
