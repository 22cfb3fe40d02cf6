//! User-facing notices
//!
//! Stores report user-visible outcomes (failed loads, completed payments)
//! on a broadcast channel. The UI subscribes and renders them as toasts.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

/// Notice severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Success,
    Warn,
    Error,
}

/// A single user-facing message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub severity: Severity,
    pub summary: String,
    pub detail: String,
}

impl Notice {
    pub fn new(severity: Severity, summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity,
            summary: summary.into(),
            detail: detail.into(),
        }
    }

    pub fn error(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(Severity::Error, summary, detail)
    }

    pub fn success(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(Severity::Success, summary, detail)
    }
}

const NOTICE_CHANNEL_CAPACITY: usize = 64;

/// Broadcast hub for notices. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Notices {
    tx: broadcast::Sender<Notice>,
}

impl Default for Notices {
    fn default() -> Self {
        Self::new()
    }
}

impl Notices {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(NOTICE_CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.tx.subscribe()
    }

    /// Publish a notice. Having no subscribers is not an error.
    pub fn publish(&self, notice: Notice) {
        debug!(summary = %notice.summary, severity = ?notice.severity, "notice");
        let _ = self.tx.send(notice);
    }
}
