//! Error types for logging setup

use thiserror::Error;

/// Errors from installing the global subscriber.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// The log directory or file could not be created
    #[error("Log file error: {0}")]
    Io(#[from] std::io::Error),

    /// The rolling appender rejected its configuration
    #[error("Log appender error: {0}")]
    Appender(#[from] tracing_appender::rolling::InitError),

    /// A global subscriber is already installed
    #[error("Subscriber already set: {0}")]
    AlreadySet(#[from] tracing_subscriber::util::TryInitError),
}

/// Result type alias for logging setup
pub type Result<T> = std::result::Result<T, LoggingError>;
