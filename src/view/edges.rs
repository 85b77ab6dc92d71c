//! Edge tables and flat-index arithmetic
//!
//! An edge table is the cumulative sample count over a run of arrays: entry
//! `i` is the total number of frames in all preceding arrays, entry 0 is
//! always 0 and the last entry is the total length. Resolving a global index
//! scans the table for the unique slot satisfying
//! `edges[i] <= idx < edges[i + 1]`.

use crate::utils::{Result, ViewError};

/// Compute the edge table for a run of sample counts
///
/// # Arguments
/// * `counts` - The number of frames in each array, in order
///
/// # Returns
/// A monotonically non-decreasing table of length `n + 1` starting at 0 and
/// ending at the total frame count.
pub fn edge_table<I: IntoIterator<Item = usize>>(counts: I) -> Vec<usize> {
    let mut edges = vec![0];
    let mut total = 0;
    for count in counts {
        total += count;
        edges.push(total);
    }
    edges
}

/// Resolve a global index against an edge table
///
/// # Arguments
/// * `idx` - The global frame index
/// * `edges` - An edge table as produced by [`edge_table`]
///
/// # Returns
/// * `Ok((array_index, local_index))` for the unique array containing `idx`
/// * `Err(ViewError::IndexOutOfRange)` when `idx` is past the total length
pub fn resolve(idx: usize, edges: &[usize]) -> Result<(usize, usize)> {
    for (array_idx, &edge) in edges.iter().enumerate() {
        if idx < edge {
            let start = edges[array_idx - 1];
            return Ok((array_idx - 1, idx - start));
        }
    }
    Err(ViewError::IndexOutOfRange {
        index: idx,
        length: edges.last().copied().unwrap_or(0),
    }
    .into())
}

/// Convert a flat index into a row-major coordinate over `shape`
///
/// The first axis varies slowest, matching the enumeration order of the
/// stored arrays. An empty shape yields an empty coordinate.
///
/// # Panics
/// Panics in debug mode if `idx` is out of range for `shape`.
pub fn unravel(idx: usize, shape: &[usize]) -> Vec<usize> {
    debug_assert!(
        idx < shape.iter().product::<usize>().max(1),
        "flat index out of range"
    );
    let mut coordinate = vec![0; shape.len()];
    let mut remainder = idx;
    for (slot, &axis) in coordinate.iter_mut().zip(shape).rev() {
        *slot = remainder % axis;
        remainder /= axis;
    }
    coordinate
}

/// Convert a row-major coordinate over `shape` back to a flat index
///
/// Inverse of [`unravel`] for every in-range coordinate.
pub fn ravel(coordinate: &[usize], shape: &[usize]) -> usize {
    debug_assert_eq!(coordinate.len(), shape.len(), "coordinate rank mismatch");
    let mut flat = 0;
    for (&component, &axis) in coordinate.iter().zip(shape) {
        flat = flat * axis + component;
    }
    flat
}
