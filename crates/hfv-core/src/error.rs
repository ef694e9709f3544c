//! Error types for hfv

use thiserror::Error;

/// hfv error type
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Binning mismatch or invalid bin edges
    #[error("Binning error: {0}")]
    Binning(String),

    /// Requested object does not exist
    #[error("Object not found: {0}")]
    NotFound(String),

    /// Object exists but has a different kind than requested
    #[error("Type mismatch for '{path}': expected {expected}, found {found}")]
    TypeMismatch {
        /// Object path
        path: String,
        /// Requested kind
        expected: &'static str,
        /// Actual kind
        found: &'static str,
    },
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
