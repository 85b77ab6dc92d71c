//! Utility modules

pub mod error;

pub use error::{FramestackError, Result, StoreError, ViewError};
