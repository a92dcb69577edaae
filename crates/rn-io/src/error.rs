//! Error types for rn-io.

use thiserror::Error;

use rn_network::NetworkError;

/// Errors that can occur when reading or writing network files.
#[derive(Debug, Error)]
pub enum IoError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    /// A record that parses but cannot be turned into network objects.
    #[error("{record}: {reason}")]
    Record { record: String, reason: String },

    #[error(transparent)]
    Network(#[from] NetworkError),
}

impl IoError {
    pub(crate) fn record(record: impl Into<String>, reason: impl Into<String>) -> Self {
        IoError::Record { record: record.into(), reason: reason.into() }
    }
}

/// Alias for `Result<T, IoError>`.
pub type IoResult<T> = Result<T, IoError>;
