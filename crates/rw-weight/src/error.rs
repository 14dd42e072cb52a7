//! Error types for weight lookup.

use std::path::PathBuf;

use rw_root::RootError;
use thiserror::Error;

/// Errors raised while building or batch-evaluating a [`Weighter`](crate::Weighter).
#[derive(Error, Debug)]
pub enum WeightError {
    /// The weight file cannot be opened or is not a valid ROOT file.
    #[error("cannot open weight file {}: {source}", path.display())]
    Open {
        /// Offending file path.
        path: PathBuf,
        /// Underlying reader error.
        #[source]
        source: RootError,
    },

    /// The file opened, but holds no object under the requested name.
    #[error("histogram '{name}' not found in weight file {}", path.display())]
    MissingHistogram {
        /// File that was searched.
        path: PathBuf,
        /// Requested histogram path inside the file.
        name: String,
    },

    /// The named object exists but is not a readable histogram.
    #[error("cannot read histogram '{name}' from {}: {source}", path.display())]
    Read {
        /// File the object lives in.
        path: PathBuf,
        /// Requested histogram path inside the file.
        name: String,
        /// Underlying reader error.
        #[source]
        source: RootError,
    },

    /// Batch inputs of different lengths.
    #[error("coordinate column has {got} values, expected {expected}")]
    ColumnLength {
        /// Length of the x column.
        expected: usize,
        /// Length of the offending column.
        got: usize,
    },
}

/// Result alias for weight lookup.
pub type Result<T> = std::result::Result<T, WeightError>;
