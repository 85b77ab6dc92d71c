//! Transforming dataset combinator
//!
//! A computed dataset applies a caller-supplied transformation to every item
//! of the wrapped dataset, preserving its length. Errors returned by the
//! transformation propagate to the caller unchanged.

use super::Dataset;
use crate::utils::Result;

/// A dataset which applies a computation to the wrapped dataset's items
///
/// The computation must be pure: `get` stays idempotent only when the
/// transformation is deterministic.
pub struct ComputeDataset<D, F> {
    dataset: D,
    computation: F,
}

impl<D, F, T> ComputeDataset<D, F>
where
    D: Dataset,
    F: Fn(D::Item) -> Result<T> + Send + Sync,
{
    /// Create a computed dataset over `dataset`
    pub fn new(dataset: D, computation: F) -> Self {
        Self {
            dataset,
            computation,
        }
    }
}

impl<D, F, T> Dataset for ComputeDataset<D, F>
where
    D: Dataset,
    F: Fn(D::Item) -> Result<T> + Send + Sync,
{
    type Item = T;

    fn len(&self) -> usize {
        self.dataset.len()
    }

    fn get(&self, index: usize) -> Result<Self::Item> {
        (self.computation)(self.dataset.get(index)?)
    }
}
