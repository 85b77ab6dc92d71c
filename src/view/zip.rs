//! Index-aligned dataset combinators
//!
//! Zipping creates a one to one mapping between items of the contained
//! datasets: `get(idx)` collects every child's item at the same index. By
//! default construction checks that all children report the same length.

use super::{BoxedDataset, Dataset};
use crate::utils::{Result, ViewError};

/// A dataset which loads index-aligned items from any number of children
///
/// Children are type-erased so differently-shaped view trees can be zipped,
/// as long as they produce the same item type.
pub struct ZipDataset<T> {
    children: Vec<BoxedDataset<T>>,
    len: usize,
}

impl<T> ZipDataset<T> {
    /// Create a zipped dataset over `children`
    ///
    /// # Arguments
    /// * `children` - The datasets to align, at least one
    /// * `check_lengths` - When true, fail construction unless all children
    ///   report the same length
    ///
    /// # Returns
    /// * `Err(ViewError::EmptyComposite)` when `children` is empty
    /// * `Err(ViewError::LengthMismatch)` naming every child length when
    ///   validation is requested and lengths differ
    pub fn new(children: Vec<BoxedDataset<T>>, check_lengths: bool) -> Result<Self> {
        if children.is_empty() {
            return Err(ViewError::EmptyComposite { combinator: "Zip" }.into());
        }

        let lengths: Vec<usize> = children.iter().map(|child| child.len()).collect();
        if check_lengths && lengths.iter().any(|&len| len != lengths[0]) {
            return Err(ViewError::LengthMismatch { lengths }.into());
        }

        // The minimum bounds iteration, so no child is ever over-indexed
        let len = lengths.iter().copied().min().unwrap_or(0);
        Ok(Self { children, len })
    }
}

impl<T> Dataset for ZipDataset<T> {
    type Item = Vec<T>;

    fn len(&self) -> usize {
        self.len
    }

    fn get(&self, index: usize) -> Result<Self::Item> {
        if index >= self.len {
            return Err(ViewError::IndexOutOfRange {
                index,
                length: self.len,
            }
            .into());
        }
        self.children.iter().map(|child| child.get(index)).collect()
    }
}

/// A dataset zipping an input and a target dataset into typed pairs
pub struct PairDataset<A, B> {
    left: A,
    right: B,
    len: usize,
}

impl<A: Dataset, B: Dataset> PairDataset<A, B> {
    /// Create a pair dataset over `left` and `right`
    ///
    /// # Arguments
    /// * `check_lengths` - When true, fail construction unless both children
    ///   report the same length
    pub fn new(left: A, right: B, check_lengths: bool) -> Result<Self> {
        let lengths = [left.len(), right.len()];
        if check_lengths && lengths[0] != lengths[1] {
            return Err(ViewError::LengthMismatch {
                lengths: lengths.to_vec(),
            }
            .into());
        }
        let len = lengths[0].min(lengths[1]);
        Ok(Self { left, right, len })
    }
}

impl<A: Dataset, B: Dataset> Dataset for PairDataset<A, B> {
    type Item = (A::Item, B::Item);

    fn len(&self) -> usize {
        self.len
    }

    fn get(&self, index: usize) -> Result<Self::Item> {
        if index >= self.len {
            return Err(ViewError::IndexOutOfRange {
                index,
                length: self.len,
            }
            .into());
        }
        Ok((self.left.get(index)?, self.right.get(index)?))
    }
}
