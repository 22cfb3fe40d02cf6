//! Logging setup for the Dave vault client
//!
//! Installs a global `tracing` subscriber with console output (pretty or
//! JSONL) and optional JSONL file output. `RUST_LOG` overrides the configured
//! level.
//!
//! ```ignore
//! use dave_logging::{DaveSubscriberBuilder, LogConfig};
//!
//! // Keep the guard alive for as long as file logging should run.
//! let _guard = DaveSubscriberBuilder::new()
//!     .with_config(LogConfig::per_run().unwrap_or_else(LogConfig::development))
//!     .init();
//! ```

pub mod config;
pub mod error;

pub use config::{
    default_log_dir, ConfigWarning, ConsoleConfig, FileConfig, JsonlConfig, LogConfig,
    RotationStrategy, LOG_FILE_PREFIX,
};
pub use error::{LoggingError, Result};

use std::fs::{self, OpenOptions};

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Builder for configuring and initializing the logging subscriber
///
/// By default, console output uses JSONL format. Use `LogConfig::development()`
/// for human-readable pretty output during development.
pub struct DaveSubscriberBuilder {
    config: LogConfig,
}

impl DaveSubscriberBuilder {
    /// Create a new subscriber builder with default configuration
    pub fn new() -> Self {
        Self {
            config: LogConfig::default(),
        }
    }

    /// Use a specific configuration
    pub fn with_config(mut self, config: LogConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the default log level
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.config.default_level = level.into();
        self
    }

    /// Enable or disable console output
    pub fn with_console(mut self, enabled: bool) -> Self {
        self.config.console.enabled = enabled;
        self
    }

    /// Configure file output
    pub fn with_file_output(mut self, config: FileConfig) -> Self {
        self.config.file = Some(config);
        self
    }

    /// Initialize the subscriber globally
    ///
    /// Returns a guard that must be kept alive for the duration of the program
    /// when file output is enabled. Setup failures are reported on stderr.
    pub fn init(self) -> Option<WorkerGuard> {
        match self.try_init() {
            Ok(guard) => guard,
            Err(e) => {
                eprintln!("Warning: Failed to initialize logging: {}", e);
                None
            }
        }
    }

    /// Try to initialize the subscriber globally
    pub fn try_init(self) -> Result<Option<WorkerGuard>> {
        for warning in self.config.validate() {
            eprintln!("Warning: logging config: {}", warning);
        }

        let mut layers: Vec<BoxedLayer> = Vec::new();
        let mut guard = None;

        if self.config.console.enabled {
            let level = self
                .config
                .console
                .level
                .as_deref()
                .unwrap_or(&self.config.default_level);
            layers.push(self.console_layer(level));
        }

        if let Some(file_config) = &self.config.file {
            let (writer, file_guard) = file_writer(file_config)?;
            guard = Some(file_guard);
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_ansi(false)
                .with_current_span(self.config.jsonl.include_current_span)
                .with_span_list(self.config.jsonl.include_spans)
                .flatten_event(self.config.jsonl.flatten_events)
                .with_file(self.config.jsonl.include_location)
                .with_line_number(self.config.jsonl.include_location)
                .with_writer(writer)
                .with_filter(env_filter(&self.config.default_level));
            layers.push(Box::new(layer));
        }

        Registry::default().with(layers).try_init()?;
        Ok(guard)
    }

    fn console_layer(&self, level: &str) -> BoxedLayer {
        if self.config.console.pretty {
            Box::new(
                tracing_subscriber::fmt::layer()
                    .with_ansi(self.config.console.ansi)
                    .with_target(true)
                    .with_filter(env_filter(level)),
            )
        } else {
            Box::new(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(self.config.jsonl.include_current_span)
                    .with_span_list(self.config.jsonl.include_spans)
                    .flatten_event(self.config.jsonl.flatten_events)
                    .with_file(self.config.jsonl.include_location)
                    .with_line_number(self.config.jsonl.include_location)
                    .with_filter(env_filter(level)),
            )
        }
    }
}

impl Default for DaveSubscriberBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// `RUST_LOG` if set, otherwise `level`.
fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Non-blocking writer for `config`; a single appended file unless rotated.
fn file_writer(config: &FileConfig) -> Result<(NonBlocking, WorkerGuard)> {
    fs::create_dir_all(&config.directory)?;

    let rotation = match config.rotation {
        RotationStrategy::Never => {
            let path = config.directory.join(format!("{}.log", config.prefix));
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            return Ok(tracing_appender::non_blocking(file));
        }
        RotationStrategy::Daily => Rotation::DAILY,
        RotationStrategy::Hourly => Rotation::HOURLY,
    };

    let mut builder = RollingFileAppender::builder()
        .rotation(rotation)
        .filename_prefix(config.prefix.as_str())
        .filename_suffix("log");
    if let Some(max) = config.max_files {
        builder = builder.max_log_files(max);
    }
    let appender = builder.build(&config.directory)?;
    Ok(tracing_appender::non_blocking(appender))
}

/// Initialize logging for development (verbose, pretty console output)
pub fn init_development() {
    DaveSubscriberBuilder::new()
        .with_config(LogConfig::development())
        .init();
}

/// Initialize logging for testing (minimal output)
pub fn init_testing() {
    let _ = DaveSubscriberBuilder::new()
        .with_config(LogConfig::testing())
        .try_init();
}
