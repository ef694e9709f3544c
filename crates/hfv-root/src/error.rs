//! Error types for ROOT file reading.

use thiserror::Error;

/// Errors raised while reading a ROOT file.
#[derive(Error, Debug)]
pub enum RootError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File does not start with the `root` magic or is truncated
    #[error("not a ROOT file (bad magic or truncated header)")]
    BadMagic,

    /// No key with the given name/path
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// Malformed streamer data
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// Object class has no reader
    #[error("unsupported class: {0}")]
    UnsupportedClass(String),

    /// Read past the end of a buffer
    #[error("buffer underflow at offset {offset}: need {need} bytes, have {have}")]
    BufferUnderflow {
        /// Read position
        offset: usize,
        /// Requested bytes
        need: usize,
        /// Bytes left
        have: usize,
    },

    /// Compressed block could not be decoded
    #[error("decompression error: {0}")]
    Decompression(String),

    /// Histogram model rejected the decoded object
    #[error("histogram error: {0}")]
    Hist(#[from] hfv_core::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, RootError>;

impl From<RootError> for hfv_core::Error {
    fn from(e: RootError) -> Self {
        match e {
            RootError::Io(io) => hfv_core::Error::Io(io),
            RootError::KeyNotFound(k) => hfv_core::Error::NotFound(k),
            RootError::Hist(h) => h,
            other => hfv_core::Error::Validation(other.to_string()),
        }
    }
}
