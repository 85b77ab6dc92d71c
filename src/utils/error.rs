//! Error types for framestack

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Top-level crate error
#[derive(Error, Debug)]
pub enum FramestackError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("View error: {0}")]
    View(#[from] ViewError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Stack file errors (open, parse, write)
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to open stack file {path:?}: {source}")]
    OpenFailed { path: PathBuf, source: io::Error },

    #[error("Invalid stack magic: expected 0x{expected:08X}, got 0x{actual:08X}")]
    InvalidMagic { expected: u32, actual: u32 },

    #[error("Unsupported stack version: {0}")]
    UnsupportedVersion(u32),

    #[error("Stack file too small: {size} bytes, minimum {minimum} bytes")]
    FileTooSmall { size: u64, minimum: u64 },

    #[error("Array {key:?} not found in {path:?}")]
    KeyNotFound { key: String, path: PathBuf },

    #[error("Invalid array {key:?}: {reason}")]
    Shape { key: String, reason: String },

    #[error("Frame dims {frame_dims} exceed rank {rank} of array {key:?}")]
    InvalidFrameDims {
        key: String,
        frame_dims: usize,
        rank: usize,
    },

    #[error("Failed to write stack file {path:?}: {source}")]
    WriteFailed { path: PathBuf, source: io::Error },

    #[error("Schema error: {0}")]
    Schema(String),
}

/// Dataset view errors (construction and access)
#[derive(Error, Debug)]
pub enum ViewError {
    #[error("Index {index} out of range for dataset of length {length}")]
    IndexOutOfRange { index: usize, length: usize },

    #[error("Zipped datasets must contain the same number of frames, got {lengths:?}")]
    LengthMismatch { lengths: Vec<usize> },

    #[error("Key {key:?} holds {actual} frames, expected {expected}")]
    InconsistentLength {
        key: String,
        expected: usize,
        actual: usize,
    },

    #[error("{combinator} requires at least one child dataset")]
    EmptyComposite { combinator: &'static str },

    #[error("Cross product length overflows usize")]
    LengthOverflow,
}

pub type Result<T> = std::result::Result<T, FramestackError>;
