//! High-level detector image dataset
//!
//! Composes the primitive views into the standard masked, normalized
//! detector pipeline: frames and per-frame count times read from the same
//! stack files, a single detector mask broadcast over the whole run, and a
//! computation producing `frame * count_time / mask` per index.

use std::path::{Path, PathBuf};

use super::compute::ComputeDataset;
use super::frames::SingleFrames;
use super::repeat::RepeatDataset;
use super::zip::PairDataset;
use super::Dataset;
use crate::store::Frame;
use crate::utils::Result;

type MaskedInput = ((Frame, Frame), Frame);
type Pipeline = ComputeDataset<
    PairDataset<PairDataset<SingleFrames, SingleFrames>, RepeatDataset<SingleFrames>>,
    fn(MaskedInput) -> Result<Frame>,
>;

/// A dataset of masked, normalized detector images
pub struct DetectorImages {
    dataset: Pipeline,
}

impl DetectorImages {
    /// Open a detector image dataset
    ///
    /// # Arguments
    /// * `data_paths` - Stack files holding frames and count times
    /// * `frame_key` - The key of the detector data within each stack file
    /// * `count_time_key` - The key of the per-frame count times
    /// * `mask_path` - The stack file holding the detector mask
    /// * `mask_key` - The key of the mask within its stack file
    pub fn open<I, P>(
        data_paths: I,
        frame_key: &str,
        count_time_key: &str,
        mask_path: &Path,
        mask_key: &str,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let data_paths: Vec<PathBuf> = data_paths.into_iter().map(Into::into).collect();
        let frames = SingleFrames::open(data_paths.clone(), frame_key, 2)?;
        let count_times = SingleFrames::open(data_paths, count_time_key, 0)?;
        let mask = SingleFrames::open([mask_path.to_path_buf()], mask_key, 2)?;

        let frame_count = frames.len();
        let mask = RepeatDataset::new(mask, frame_count);
        let zipped = PairDataset::new(
            PairDataset::new(frames, count_times, true)?,
            mask,
            true,
        )?;

        let mask_and_normalize: fn(MaskedInput) -> Result<Frame> = Self::mask_and_normalize;
        Ok(Self {
            dataset: ComputeDataset::new(zipped, mask_and_normalize),
        })
    }

    fn mask_and_normalize(((frame, count_time), mask): MaskedInput) -> Result<Frame> {
        Ok((&frame * &count_time) / &mask)
    }
}

impl Dataset for DetectorImages {
    type Item = Frame;

    fn len(&self) -> usize {
        self.dataset.len()
    }

    fn get(&self, index: usize) -> Result<Self::Item> {
        self.dataset.get(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StackWriter;
    use ndarray::{ArrayD, IxDyn};
    use tempfile::tempdir;

    #[test]
    fn test_masked_normalized_pipeline() {
        let dir = tempdir().unwrap();

        // Two data files of 2 and 3 frames, every element of frame f is f + 1
        let mut paths = Vec::new();
        let mut times = Vec::new();
        let mut frame_id = 0;
        for (name, samples) in [("run1", 2usize), ("run2", 3usize)] {
            let mut frames = Vec::new();
            let mut file_times = Vec::new();
            for _ in 0..samples {
                frames.extend(std::iter::repeat((frame_id + 1) as f32).take(4));
                file_times.push(((frame_id + 1) * 10) as f32);
                frame_id += 1;
            }
            let path = dir.path().join(format!("{name}.stack"));
            let mut writer = StackWriter::new();
            writer
                .push_f32(
                    "frames",
                    &ArrayD::from_shape_vec(IxDyn(&[samples, 2, 2]), frames).unwrap(),
                )
                .unwrap();
            writer
                .push_f32(
                    "count_times",
                    &ArrayD::from_shape_vec(IxDyn(&[samples]), file_times.clone()).unwrap(),
                )
                .unwrap();
            writer.write_to(&path).unwrap();
            paths.push(path);
            times.extend(file_times);
        }

        // Mask halves one column
        let mask_path = dir.path().join("mask.stack");
        let mut writer = StackWriter::new();
        writer
            .push_f32(
                "mask",
                &ArrayD::from_shape_vec(IxDyn(&[2, 2]), vec![1.0, 2.0, 1.0, 2.0]).unwrap(),
            )
            .unwrap();
        writer.write_to(&mask_path).unwrap();

        let dataset =
            DetectorImages::open(paths, "frames", "count_times", &mask_path, "mask").unwrap();
        assert_eq!(dataset.len(), 5);

        for idx in 0..5 {
            let image = dataset.get(idx).unwrap();
            assert_eq!(image.shape(), &[2, 2]);
            let base = (idx + 1) as f32 * times[idx];
            assert_eq!(image[[0, 0]], base);
            assert_eq!(image[[0, 1]], base / 2.0);
            assert_eq!(image[[1, 0]], base);
            assert_eq!(image[[1, 1]], base / 2.0);
        }

        assert!(dataset.get(5).is_err());
    }
}
