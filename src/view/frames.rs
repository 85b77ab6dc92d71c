//! Concatenated frame datasets
//!
//! A frame dataset reads one logical stream of frames spanning any number of
//! stack files. Each configured key is opened in every file and concatenated
//! through an edge table; a global index resolves to one array and one local
//! offset, which unravels to a leading-axes coordinate for the read.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info};

use super::edges::{edge_table, resolve, unravel};
use super::Dataset;
use crate::store::{Frame, FrameArray, StackFile};
use crate::utils::{Result, ViewError};

/// One key to read from every stack file, with its frame dimensionality
#[derive(Debug, Clone)]
pub struct KeySpec {
    /// Array key within each stack file
    pub key: String,
    /// The trailing dimensionality of the frame
    pub frame_dims: usize,
}

impl KeySpec {
    /// Create a key with its frame dimensionality
    pub fn new(key: impl Into<String>, frame_dims: usize) -> Self {
        Self {
            key: key.into(),
            frame_dims,
        }
    }
}

/// The arrays and edge table for one key across all files
struct KeyGroup {
    key: String,
    arrays: Vec<FrameArray>,
    edges: Vec<usize>,
}

impl KeyGroup {
    fn total(&self) -> usize {
        self.edges.last().copied().unwrap_or(0)
    }

    /// Resolve a global index and read the frame it addresses
    fn frame(&self, idx: usize) -> Result<Frame> {
        let (array_idx, local_idx) = resolve(idx, &self.edges)?;
        let array = &self.arrays[array_idx];
        let coordinate = unravel(local_idx, array.leading_shape());
        Ok(array.frame_at(&coordinate))
    }
}

/// A dataset which loads frames at one or more keys from multiple stack files
///
/// Input paths may arrive unordered or duplicated; they are deduplicated and
/// sorted by path so two constructions with the same inputs index
/// identically. When several keys are configured, every key must account for
/// exactly the same total number of frames, enforced at construction.
pub struct FrameDataset {
    groups: Vec<KeyGroup>,
    total: usize,
}

impl FrameDataset {
    /// Open `keys` in every stack file named by `paths`
    ///
    /// # Arguments
    /// * `paths` - Stack file paths, tolerated unordered and with duplicates
    /// * `keys` - The keys to read per file, each with its frame dimensionality
    ///
    /// # Returns
    /// * `Err(ViewError::EmptyComposite)` when no keys are given
    /// * `Err(StoreError)` when a file fails to open or a key is absent
    /// * `Err(ViewError::InconsistentLength)` when keys disagree on the total
    pub fn open<I, P>(paths: I, keys: &[KeySpec]) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        if keys.is_empty() {
            return Err(ViewError::EmptyComposite {
                combinator: "Frame dataset",
            }
            .into());
        }

        // Deterministic total ordering over possibly unordered inputs
        let paths: BTreeSet<PathBuf> = paths.into_iter().map(Into::into).collect();
        let mut stacks = Vec::with_capacity(paths.len());
        for path in &paths {
            stacks.push(Arc::new(StackFile::open(path).map_err(|e| {
                debug!(path = %path.display(), "failed to open stack file");
                e
            })?));
        }

        let mut groups: Vec<KeyGroup> = Vec::with_capacity(keys.len());
        for spec in keys {
            let mut arrays = Vec::with_capacity(stacks.len());
            for stack in &stacks {
                arrays.push(FrameArray::open(
                    Arc::clone(stack),
                    &spec.key,
                    spec.frame_dims,
                )?);
            }
            let edges = edge_table(arrays.iter().map(FrameArray::sample_count));
            let group = KeyGroup {
                key: spec.key.clone(),
                arrays,
                edges,
            };

            let actual = group.total();
            if let Some(first) = groups.first() {
                if actual != first.total() {
                    return Err(ViewError::InconsistentLength {
                        key: group.key,
                        expected: first.total(),
                        actual,
                    }
                    .into());
                }
            }
            groups.push(group);
        }

        let total = groups[0].total();
        info!(
            files = stacks.len(),
            keys = groups.len(),
            frames = total,
            "opened frame dataset"
        );

        Ok(Self { groups, total })
    }

    /// Get the number of configured keys
    pub fn key_count(&self) -> usize {
        self.groups.len()
    }

    /// Read the frame for one key at a global index
    ///
    /// # Panics
    /// Panics if `key_idx` is not below [`key_count`](Self::key_count).
    pub fn frame(&self, idx: usize, key_idx: usize) -> Result<Frame> {
        self.groups[key_idx].frame(idx)
    }
}

impl Dataset for FrameDataset {
    type Item = Vec<Frame>;

    fn len(&self) -> usize {
        self.total
    }

    /// Get one frame per configured key, in key order
    fn get(&self, index: usize) -> Result<Self::Item> {
        self.groups.iter().map(|group| group.frame(index)).collect()
    }
}

/// The single-key frame dataset, yielding bare frames
pub struct SingleFrames {
    inner: FrameDataset,
}

impl SingleFrames {
    /// Open `key` in every stack file named by `paths`
    pub fn open<I, P>(paths: I, key: impl Into<String>, frame_dims: usize) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let inner = FrameDataset::open(paths, &[KeySpec::new(key, frame_dims)])?;
        Ok(Self { inner })
    }
}

impl Dataset for SingleFrames {
    type Item = Frame;

    fn len(&self) -> usize {
        self.inner.len()
    }

    fn get(&self, index: usize) -> Result<Self::Item> {
        self.inner.frame(index, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StackWriter;
    use crate::utils::FramestackError;
    use ndarray::{ArrayD, IxDyn};
    use tempfile::{tempdir, TempDir};

    fn indexed_array(shape: &[usize], offset: f32) -> ArrayD<f32> {
        let len: usize = shape.iter().product();
        ArrayD::from_shape_vec(IxDyn(shape), (0..len).map(|v| v as f32 + offset).collect())
            .unwrap()
    }

    /// Three files holding 8, 12 and 20 frames of shape (10, 10)
    fn spanning_files(dir: &TempDir) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        for (name, samples, offset) in [("a", 8, 0.0), ("b", 12, 10_000.0), ("c", 20, 20_000.0)] {
            let path = dir.path().join(format!("{name}.stack"));
            let mut writer = StackWriter::new();
            writer
                .push_f32("frames", &indexed_array(&[samples, 10, 10], offset))
                .unwrap();
            writer.write_to(&path).unwrap();
            paths.push(path);
        }
        paths
    }

    #[test]
    fn test_length_spans_files() {
        let dir = tempdir().unwrap();
        let paths = spanning_files(&dir);
        let dataset = SingleFrames::open(paths, "frames", 2).unwrap();
        assert_eq!(dataset.len(), 40);
    }

    #[test]
    fn test_get_resolves_across_files() {
        let dir = tempdir().unwrap();
        let paths = spanning_files(&dir);
        let dataset = SingleFrames::open(paths, "frames", 2).unwrap();

        // First frame of the first file
        let frame = dataset.get(0).unwrap();
        assert_eq!(frame.shape(), &[10, 10]);
        assert_eq!(frame[[0, 0]], 0.0);

        // Twelfth frame (local index 11) of the second file
        let frame = dataset.get(19).unwrap();
        assert_eq!(frame[[0, 0]], 10_000.0 + 11.0 * 100.0);

        // First frame of the third file
        let frame = dataset.get(20).unwrap();
        assert_eq!(frame[[0, 0]], 20_000.0);

        assert!(matches!(
            dataset.get(40),
            Err(FramestackError::View(ViewError::IndexOutOfRange {
                index: 40,
                length: 40
            }))
        ));
    }

    #[test]
    fn test_get_matches_direct_read() {
        let dir = tempdir().unwrap();
        let data = indexed_array(&[6, 4, 4], 0.0);
        let path = dir.path().join("solo.stack");
        let mut writer = StackWriter::new();
        writer.push_f32("frames", &data).unwrap();
        writer.write_to(&path).unwrap();

        let dataset = SingleFrames::open([path], "frames", 2).unwrap();
        for idx in 0..6 {
            let expected = data.index_axis(ndarray::Axis(0), idx).to_owned();
            assert_eq!(dataset.get(idx).unwrap(), expected.into_dyn());
        }
    }

    #[test]
    fn test_duplicate_and_unordered_paths() {
        let dir = tempdir().unwrap();
        let paths = spanning_files(&dir);

        let forward = SingleFrames::open(paths.clone(), "frames", 2).unwrap();
        let mut shuffled = paths.clone();
        shuffled.reverse();
        shuffled.push(paths[0].clone());
        let reordered = SingleFrames::open(shuffled, "frames", 2).unwrap();

        assert_eq!(forward.len(), reordered.len());
        for idx in [0, 7, 8, 19, 20, 39] {
            assert_eq!(forward.get(idx).unwrap(), reordered.get(idx).unwrap());
        }
    }

    #[test]
    fn test_multi_key_returns_parallel_frames() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("paired.stack");
        let frames = indexed_array(&[5, 3, 3], 0.0);
        let times = indexed_array(&[5], 500.0);
        let mut writer = StackWriter::new();
        writer.push_f32("frames", &frames).unwrap();
        writer.push_f32("count_times", &times).unwrap();
        writer.write_to(&path).unwrap();

        let dataset = FrameDataset::open(
            [path],
            &[KeySpec::new("frames", 2), KeySpec::new("count_times", 0)],
        )
        .unwrap();
        assert_eq!(dataset.len(), 5);
        assert_eq!(dataset.key_count(), 2);

        let parts = dataset.get(3).unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].shape(), &[3, 3]);
        assert_eq!(parts[1].shape(), &[1]);
        assert_eq!(parts[1][[0]], 503.0);
    }

    #[test]
    fn test_inconsistent_keys_fail_at_open() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("skewed.stack");
        let mut writer = StackWriter::new();
        writer
            .push_f32("frames", &indexed_array(&[5, 3, 3], 0.0))
            .unwrap();
        writer
            .push_f32("count_times", &indexed_array(&[4], 0.0))
            .unwrap();
        writer.write_to(&path).unwrap();

        let result = FrameDataset::open(
            [path],
            &[KeySpec::new("frames", 2), KeySpec::new("count_times", 0)],
        );
        assert!(matches!(
            result,
            Err(FramestackError::View(ViewError::InconsistentLength {
                expected: 5,
                actual: 4,
                ..
            }))
        ));
    }

    #[test]
    fn test_missing_key_fails_at_open() {
        let dir = tempdir().unwrap();
        let paths = spanning_files(&dir);
        let result = SingleFrames::open(paths, "absent", 2);
        assert!(matches!(result, Err(FramestackError::Store(_))));
    }

    #[test]
    fn test_no_keys_rejected() {
        let dir = tempdir().unwrap();
        let paths = spanning_files(&dir);
        let result = FrameDataset::open(paths, &[]);
        assert!(matches!(
            result,
            Err(FramestackError::View(ViewError::EmptyComposite { .. }))
        ));
    }
}
