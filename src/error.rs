//! Error types for the replay pipeline.
//!
//! The book itself never fails: inapplicable events are ignored and reported
//! through [`Outcome`](crate::lob::Outcome). Errors only come from the layers
//! around it (decoding, CSV, files).

use thiserror::Error;

/// Result type alias for replay operations.
pub type Result<T> = std::result::Result<T, ReplayError>;

/// Main error type for replay operations.
#[derive(Error, Debug)]
pub enum ReplayError {
    /// Price text that is not a decimal number
    #[error("Invalid price: {0:?}")]
    InvalidPrice(String),

    /// Size text that is not an unsigned integer
    #[error("Invalid size: {0:?}")]
    InvalidSize(String),

    /// Side text other than B, A or N
    #[error("Invalid side: {0:?}")]
    InvalidSide(String),

    /// A record that could not be turned into an event
    #[error("Malformed record at line {line}: {reason}")]
    MalformedRecord { line: u64, reason: String },

    /// CSV reader/writer failure
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// File or stream failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Report serialization failure
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("Error: {0}")]
    Generic(String),
}

impl ReplayError {
    /// Create a generic error from any string-like type.
    pub fn generic(msg: impl Into<String>) -> Self {
        ReplayError::Generic(msg.into())
    }

    /// Whether this error concerns a single input record (and can be skipped).
    pub fn is_record_error(&self) -> bool {
        matches!(
            self,
            ReplayError::InvalidPrice(_)
                | ReplayError::InvalidSize(_)
                | ReplayError::InvalidSide(_)
                | ReplayError::MalformedRecord { .. }
        )
    }
}

impl From<String> for ReplayError {
    fn from(err: String) -> Self {
        ReplayError::Generic(err)
    }
}

impl From<&str> for ReplayError {
    fn from(err: &str) -> Self {
        ReplayError::Generic(err.to_string())
    }
}
