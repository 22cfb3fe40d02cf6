//! Download tracking

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use dave_core::FileMetadata;
use dave_core::ids::timestamped_id;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::error::Result;
use crate::progress::percent;
use crate::tracker::{Published, Tracker, Transfer, TransferStatus};

const UNKNOWN_FILE_NAME: &str = "unknown_file";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadStatus {
    Pending,
    /// Fetching the file's data map
    Loading,
    Downloading,
    Completed,
    Failed,
    Cancelled,
}

impl TransferStatus for DownloadStatus {
    fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Loading => "loading",
            Self::Downloading => "downloading",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    fn is_active(self) -> bool {
        matches!(self, Self::Pending | Self::Loading | Self::Downloading)
    }

    fn is_completed(self) -> bool {
        self == Self::Completed
    }

    fn is_failed(self) -> bool {
        self == Self::Failed
    }

    fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    fn is_retryable(self) -> bool {
        matches!(self, Self::Failed | Self::Cancelled)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadItem {
    pub id: String,
    pub file_name: String,
    /// Path in the vault
    pub file_path: String,
    /// The file as listed, kept for retries
    pub file: FileMetadata,
    pub status: DownloadStatus,
    pub progress: u8,
    pub file_size: Option<u64>,
    pub downloaded_bytes: Option<u64>,
    /// Where the file is written locally
    pub download_path: Option<PathBuf>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Transfer for DownloadItem {
    type Status = DownloadStatus;

    fn id(&self) -> &str {
        &self.id
    }

    fn status(&self) -> DownloadStatus {
        self.status
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Fields to merge into a download. `None` leaves a field as it is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadUpdate {
    pub status: Option<DownloadStatus>,
    pub file_size: Option<u64>,
    pub downloaded_bytes: Option<u64>,
    pub download_path: Option<PathBuf>,
    pub progress: Option<u8>,
    pub error: Option<String>,
}

impl DownloadUpdate {
    pub fn status(status: DownloadStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn bytes(downloaded: u64) -> Self {
        Self {
            downloaded_bytes: Some(downloaded),
            ..Default::default()
        }
    }

    pub fn completed(path: impl Into<PathBuf>) -> Self {
        Self {
            status: Some(DownloadStatus::Completed),
            download_path: Some(path.into()),
            ..Default::default()
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: Some(DownloadStatus::Failed),
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

impl DownloadItem {
    fn apply(&mut self, update: DownloadUpdate) {
        if let Some(status) = update.status {
            self.status = status;
            if status.is_terminal() {
                self.completed_at = Some(Utc::now());
            }
        }
        if update.file_size.is_some() {
            self.file_size = update.file_size;
        }
        if update.downloaded_bytes.is_some() {
            self.downloaded_bytes = update.downloaded_bytes;
        }
        if update.download_path.is_some() {
            self.download_path = update.download_path;
        }
        if let Some(progress) = update.progress {
            self.progress = progress.min(100);
        }
        if update.error.is_some() {
            self.error = update.error;
        }
        if let Some(progress) = percent(self.downloaded_bytes, self.file_size) {
            self.progress = progress;
        }
    }

    fn reset(&mut self) {
        self.status = DownloadStatus::Pending;
        self.progress = 0;
        self.downloaded_bytes = None;
        self.error = None;
        self.completed_at = None;
    }
}

/// Downloads by id, published for subscribers.
#[derive(Debug, Default)]
pub struct DownloadTracker {
    downloads: Published<DownloadItem>,
}

impl DownloadTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Follow every change to the collection.
    pub fn subscribe(&self) -> watch::Receiver<Tracker<DownloadItem>> {
        self.downloads.subscribe()
    }

    /// Start tracking a download of `file`; returns its id.
    pub fn create_download(&self, file: FileMetadata) -> String {
        let file_name = file.file_name().unwrap_or(UNKNOWN_FILE_NAME).to_string();
        let file_size = (file.metadata.size > 0).then_some(file.metadata.size);
        let item = DownloadItem {
            id: timestamped_id("", 9),
            file_name,
            file_path: file.path.clone(),
            file,
            status: DownloadStatus::Pending,
            progress: 0,
            file_size,
            downloaded_bytes: None,
            download_path: None,
            error: None,
            created_at: Utc::now(),
            completed_at: None,
        };
        let id = self.downloads.insert(item);
        info!(download = %id, "download created");
        id
    }

    /// Merge `update` into a running download.
    pub fn update_download(&self, id: &str, update: DownloadUpdate) -> Result<DownloadItem> {
        let item = self.downloads.modify(id, |item| item.apply(update))?;
        debug!(download = id, status = item.status.label(), progress = item.progress, "download updated");
        Ok(item)
    }

    /// Cancel before the transfer starts.
    pub fn cancel_download(&self, id: &str) -> Result<DownloadItem> {
        let item = self.update_download(id, DownloadUpdate::status(DownloadStatus::Cancelled))?;
        info!(download = id, "download cancelled");
        Ok(item)
    }

    /// Restart a failed or cancelled download from pending.
    pub fn retry_download(&self, id: &str) -> Result<DownloadItem> {
        info!(download = id, "retrying download");
        self.downloads.restart(id, DownloadItem::reset)
    }

    pub fn remove_download(&self, id: &str) -> Option<DownloadItem> {
        self.downloads.remove(id)
    }

    pub fn get(&self, id: &str) -> Option<DownloadItem> {
        self.downloads.read(|tracker| tracker.get(id).cloned())
    }

    pub fn len(&self) -> usize {
        self.downloads.read(Tracker::len)
    }

    pub fn is_empty(&self) -> bool {
        self.downloads.read(Tracker::is_empty)
    }

    pub fn sorted(&self) -> Vec<DownloadItem> {
        self.downloads.list(Tracker::sorted)
    }

    pub fn active(&self) -> Vec<DownloadItem> {
        self.downloads.list(Tracker::active)
    }

    pub fn completed(&self) -> Vec<DownloadItem> {
        self.downloads.list(Tracker::completed)
    }

    pub fn failed(&self) -> Vec<DownloadItem> {
        self.downloads.list(Tracker::failed)
    }

    pub fn clear_completed(&self) -> usize {
        self.downloads.clear(Tracker::clear_completed)
    }

    pub fn clear_failed(&self) -> usize {
        self.downloads.clear(Tracker::clear_failed)
    }
}
