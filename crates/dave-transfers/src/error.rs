//! Error types for transfer tracking

use thiserror::Error;

/// Errors from the upload and download trackers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    /// No transfer with this id is tracked
    #[error("Unknown transfer: {0}")]
    Unknown(String),

    /// The transfer reached a terminal status and only accepts a retry
    #[error("Transfer {id} is already {status}")]
    Finished { id: String, status: &'static str },

    /// Only failed or cancelled transfers can be retried
    #[error("Transfer {id} is {status} and cannot be retried")]
    NotRetryable { id: String, status: &'static str },
}

impl TransferError {
    pub fn unknown(id: impl Into<String>) -> Self {
        Self::Unknown(id.into())
    }
}

/// Result type alias for tracker operations
pub type Result<T> = std::result::Result<T, TransferError>;
