//! Error types for the core crate

use thiserror::Error;

/// Errors raised by collaborators (wallet, loaders) and shared helpers.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The wallet failed to produce a signature
    #[error("Signature failed: {0}")]
    Signature(String),

    /// The user declined the signature request
    #[error("Signature rejected by user")]
    SignatureRejected,

    /// No wallet is connected
    #[error("Wallet not connected")]
    WalletDisconnected,

    /// A loader failed to start or fetch
    #[error("Loader error: {0}")]
    Loader(String),

    /// A single-file lookup found nothing
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    /// A textual address could not be parsed
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// JSON encoding/decoding failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CoreError {
    pub fn signature(msg: impl Into<String>) -> Self {
        Self::Signature(msg.into())
    }

    pub fn loader(msg: impl Into<String>) -> Self {
        Self::Loader(msg.into())
    }

    pub fn file_not_found(path: impl Into<String>) -> Self {
        Self::FileNotFound { path: path.into() }
    }
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
