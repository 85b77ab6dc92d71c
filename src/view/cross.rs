//! Cross-product dataset combinator
//!
//! A crossed dataset enumerates every combination of its children's items:
//! its length is the product of the children's lengths and a global index
//! decomposes into one component index per child by mixed-radix arithmetic.
//!
//! Ordering convention: component `k` is `(idx / edge_k) % len_k` with
//! `edge_0 = 1` and `edge_k` the product of the lengths of children
//! `0..k`. Child 0 therefore varies fastest as the global index increases.
//! Swapping this convention silently changes which items are paired, so it
//! is pinned by tests.

use super::{BoxedDataset, Dataset};
use crate::utils::{Result, ViewError};

/// A dataset which loads crossed combinations from any number of children
pub struct CrossDataset<T> {
    children: Vec<BoxedDataset<T>>,
    /// Mixed-radix place values, one per child
    edges: Vec<usize>,
    len: usize,
}

impl<T> CrossDataset<T> {
    /// Create a crossed dataset over `children`
    ///
    /// # Returns
    /// * `Err(ViewError::EmptyComposite)` when `children` is empty
    /// * `Err(ViewError::LengthOverflow)` when the product of the children's
    ///   lengths exceeds `usize`
    pub fn new(children: Vec<BoxedDataset<T>>) -> Result<Self> {
        if children.is_empty() {
            return Err(ViewError::EmptyComposite { combinator: "Cross" }.into());
        }

        let mut edges = Vec::with_capacity(children.len());
        let mut product: usize = 1;
        for child in &children {
            edges.push(product);
            product = product
                .checked_mul(child.len())
                .ok_or(ViewError::LengthOverflow)?;
        }

        Ok(Self {
            children,
            edges,
            len: product,
        })
    }
}

impl<T> Dataset for CrossDataset<T> {
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
        self.children
            .iter()
            .zip(&self.edges)
            .map(|(child, &edge)| child.get((index / edge) % child.len()))
            .collect()
    }
}
