//! Broadcast dataset combinator
//!
//! A repeating dataset reports a configured apparent length and serves the
//! same item, drawn once from a fixed index of the wrapped dataset, for
//! every valid index. The one-time fetch is the only shared mutable state in
//! the view tree; a double-checked lock keeps it memoize-once even when the
//! first accesses race across threads.

use parking_lot::RwLock;

use super::Dataset;
use crate::utils::{Result, ViewError};

/// A dataset which repeats one item of the wrapped dataset
pub struct RepeatDataset<D: Dataset> {
    dataset: D,
    apparent_length: usize,
    child_index: usize,
    cache: RwLock<Option<D::Item>>,
}

impl<D: Dataset> RepeatDataset<D>
where
    D::Item: Clone,
{
    /// Repeat the item at child index 0 for `apparent_length` indices
    pub fn new(dataset: D, apparent_length: usize) -> Self {
        Self::with_child_index(dataset, apparent_length, 0)
    }

    /// Repeat the item at `child_index` for `apparent_length` indices
    pub fn with_child_index(dataset: D, apparent_length: usize, child_index: usize) -> Self {
        Self {
            dataset,
            apparent_length,
            child_index,
            cache: RwLock::new(None),
        }
    }

    /// Fetch the repeated item, at most once
    ///
    /// A failed fetch leaves the cache empty and surfaces the error, so a
    /// later call retries instead of caching a failure.
    fn cached(&self) -> Result<D::Item> {
        if let Some(item) = self.cache.read().as_ref() {
            return Ok(item.clone());
        }

        let mut slot = self.cache.write();
        // Another thread may have filled the slot while we waited
        if let Some(item) = slot.as_ref() {
            return Ok(item.clone());
        }
        let item = self.dataset.get(self.child_index)?;
        *slot = Some(item.clone());
        Ok(item)
    }
}

impl<D: Dataset> Dataset for RepeatDataset<D>
where
    D::Item: Clone + Send + Sync,
{
    type Item = D::Item;

    fn len(&self) -> usize {
        self.apparent_length
    }

    /// Get the repeated item
    ///
    /// Indices from `apparent_length` upwards are rejected; `get(len() - 1)`
    /// succeeds and `get(len())` fails.
    fn get(&self, index: usize) -> Result<Self::Item> {
        if index >= self.apparent_length {
            return Err(ViewError::IndexOutOfRange {
                index,
                length: self.apparent_length,
            }
            .into());
        }
        self.cached()
    }
}
