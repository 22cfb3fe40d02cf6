//! Configuration types for the logging system

use std::path::PathBuf;

use chrono::Local;
use serde::{Deserialize, Serialize};

/// Prefix of log file names.
pub const LOG_FILE_PREFIX: &str = "dave";

/// Main logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Default log level (can be overridden by RUST_LOG)
    pub default_level: String,

    /// Console output configuration
    pub console: ConsoleConfig,

    /// File output configuration
    pub file: Option<FileConfig>,

    /// JSONL output configuration
    pub jsonl: JsonlConfig,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            default_level: "info".to_string(),
            console: ConsoleConfig::default(),
            file: None,
            jsonl: JsonlConfig::default(),
        }
    }
}

impl LogConfig {
    /// Create a config for development (verbose console output)
    pub fn development() -> Self {
        Self {
            default_level: "debug".to_string(),
            console: ConsoleConfig {
                enabled: true,
                pretty: true,
                ansi: true,
                level: Some("debug".to_string()),
            },
            ..Default::default()
        }
    }

    /// Create a config for production (JSONL file output, colored console)
    pub fn production(log_dir: PathBuf) -> Self {
        Self {
            default_level: "info".to_string(),
            console: ConsoleConfig {
                enabled: true,
                pretty: true,
                ansi: true,
                level: None,
            },
            file: Some(FileConfig {
                directory: log_dir,
                ..FileConfig::default()
            }),
            jsonl: JsonlConfig::default(),
        }
    }

    /// Create a config for testing (minimal output)
    pub fn testing() -> Self {
        Self {
            default_level: "warn".to_string(),
            console: ConsoleConfig {
                enabled: true,
                pretty: false,
                ansi: false,
                level: Some("warn".to_string()),
            },
            ..Default::default()
        }
    }

    /// Production settings writing to a fresh per-run directory, when the
    /// platform has a data directory.
    pub fn per_run() -> Option<Self> {
        default_log_dir().map(Self::production)
    }

    pub fn with_file(mut self, file: FileConfig) -> Self {
        self.file = Some(file);
        self
    }

    /// Validate the configuration and return any warnings
    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if !self.console.enabled && self.file.is_none() {
            warnings.push(ConfigWarning::NoOutput);
        }
        if let Some(file) = &self.file {
            if file.prefix.trim().is_empty() {
                warnings.push(ConfigWarning::EmptyFilePrefix);
            }
            if file.rotation == RotationStrategy::Never && file.max_files.is_some() {
                warnings.push(ConfigWarning::RetentionWithoutRotation);
            }
        }

        warnings
    }
}

/// Configuration warnings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigWarning {
    /// Neither console nor file output is enabled
    NoOutput,
    EmptyFilePrefix,
    /// `max_files` only applies to rotated logs
    RetentionWithoutRotation,
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigWarning::NoOutput => write!(f, "no log output is enabled"),
            ConfigWarning::EmptyFilePrefix => write!(f, "log file prefix is empty"),
            ConfigWarning::RetentionWithoutRotation => {
                write!(f, "max_files has no effect without rotation")
            }
        }
    }
}

/// Console output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleConfig {
    /// Enable console output
    pub enabled: bool,
    /// Use pretty (human-readable) format
    pub pretty: bool,
    /// Include ANSI colors
    pub ansi: bool,
    /// Level for console output (can be different from file)
    pub level: Option<String>,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            pretty: false, // JSONL by default
            ansi: false,
            level: None,
        }
    }
}

/// File output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    /// Directory for log files
    pub directory: PathBuf,
    /// File name prefix
    pub prefix: String,
    /// Rotation strategy
    pub rotation: RotationStrategy,
    /// Maximum rotated files to retain
    pub max_files: Option<usize>,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("./logs"),
            prefix: LOG_FILE_PREFIX.to_string(),
            rotation: RotationStrategy::Never,
            max_files: None,
        }
    }
}

/// File rotation strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RotationStrategy {
    /// Rotate daily
    Daily,
    /// Rotate hourly
    Hourly,
    /// Never rotate (single file, appended)
    #[default]
    Never,
}

/// JSONL formatting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonlConfig {
    /// Flatten event fields to root level
    pub flatten_events: bool,
    /// Include span list in events
    pub include_spans: bool,
    /// Include current span details
    pub include_current_span: bool,
    /// Include file/line information
    pub include_location: bool,
}

impl Default for JsonlConfig {
    fn default() -> Self {
        Self {
            flatten_events: true,
            include_spans: true,
            include_current_span: true,
            include_location: true,
        }
    }
}

/// `<data dir>/dave/logs/log_<local timestamp>`, one directory per run.
pub fn default_log_dir() -> Option<PathBuf> {
    let timestamp = Local::now().format("%Y-%m-%d_%H-%M-%S");
    dirs::data_dir().map(|dir| {
        dir.join(LOG_FILE_PREFIX)
            .join("logs")
            .join(format!("log_{timestamp}"))
    })
}
