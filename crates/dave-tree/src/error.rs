//! Error types for tree construction

use thiserror::Error;

/// Failures that abort a build entirely.
///
/// Per-entry problems are not errors; they are reported as
/// [`TreeDiagnostic`](crate::TreeDiagnostic)s and the entry is skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    /// No free `"name (n)"` slot was found for a named archive
    #[error("Could not find a free name for archive '{name}' after {attempts} attempts")]
    RenameExhausted { name: String, attempts: u32 },

    /// Options rejected before building
    #[error("Invalid tree options: {0}")]
    InvalidOptions(String),
}

/// Result type alias for tree operations
pub type Result<T> = std::result::Result<T, TreeError>;
