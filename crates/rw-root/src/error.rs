//! Error types for ROOT file reading.

use thiserror::Error;

/// Errors that can occur reading or writing ROOT files.
#[derive(Error, Debug)]
pub enum RootError {
    /// I/O error reading the file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid ROOT file magic bytes.
    #[error("not a ROOT file (bad magic)")]
    BadMagic,

    /// Buffer underflow (tried to read past end).
    #[error("unexpected end of buffer at offset {offset}, need {need} bytes, have {have}")]
    BufferUnderflow {
        /// Current offset in buffer.
        offset: usize,
        /// Bytes requested.
        need: usize,
        /// Bytes remaining.
        have: usize,
    },

    /// Key not found in directory.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// Unsupported object class.
    #[error("unsupported class: {0}")]
    UnsupportedClass(String),

    /// Decompression failure.
    #[error("decompression error: {0}")]
    Decompression(String),

    /// Object deserialization error.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// Global bin index outside the histogram's cell array.
    #[error("bin {bin} out of range (histogram has {n_cells} cells)")]
    BinOutOfRange {
        /// Requested global bin.
        bin: usize,
        /// Number of cells including under/overflow.
        n_cells: usize,
    },

    /// Input the writer cannot represent (bad key names, oversized files).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Axis or histogram definition that cannot hold bins.
    #[error("invalid binning: {0}")]
    InvalidBinning(String),
}

/// Result alias for ROOT operations.
pub type Result<T> = std::result::Result<T, RootError>;
