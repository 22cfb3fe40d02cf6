//! Error types for the reconciliation stores

use dave_core::CoreError;
use dave_tree::TreeError;
use thiserror::Error;

/// Errors surfaced by [`VaultStore`](crate::VaultStore) and
/// [`LocalStore`](crate::LocalStore) operations.
#[derive(Debug, Error)]
pub enum VaultError {
    /// A collaborator (wallet, loader) failed
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The tree could not be built
    #[error(transparent)]
    Tree(#[from] TreeError),

    /// A newer load started while this one was awaiting
    #[error("Load superseded by a newer load")]
    Superseded,

    /// No file with this path in the file index
    #[error("File not in index: {path}")]
    UnknownFile { path: String },

    /// The node id does not belong to the current tree
    #[error("Unknown directory node")]
    UnknownNode,

    /// Only folders can become the current directory
    #[error("Not a folder: {name}")]
    NotAFolder { name: String },

    /// No tree has been built yet
    #[error("No directory tree")]
    NoTree,
}

/// Result type alias for store operations
pub type Result<T> = std::result::Result<T, VaultError>;
