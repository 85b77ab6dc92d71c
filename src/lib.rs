//! framestack library
//!
//! Composable random-access frame datasets over binary multi-dimensional
//! array stacks. Stack files are memory mapped and validated once; views
//! concatenate, zip, cross, repeat and transform frames while preserving
//! cheap random access for shuffled training loops.

pub mod store;
pub mod utils;
pub mod view;

pub use store::{DType, Frame, FrameArray, StackFile, StackSchema, StackWriter};
pub use utils::{FramestackError, Result, StoreError, ViewError};
pub use view::{
    BoxedDataset, ComputeDataset, CrossDataset, Dataset, DetectorImages, FrameDataset, KeySpec,
    PairDataset, RepeatDataset, SingleFrames, ZipDataset,
};
