//! Upload tracking
//!
//! Uploads start in `Quoting` while storage costs are fetched, then move to
//! `Uploading`. Cancelling is only offered before payment and is purely
//! local: the upload is marked failed with "Upload cancelled".

use chrono::{DateTime, Utc};
use dave_core::ids::timestamped_id;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::error::Result;
use crate::progress::percent;
use crate::tracker::{Published, Tracker, Transfer, TransferStatus};

/// Error recorded on a cancelled upload.
pub const UPLOAD_CANCELLED: &str = "Upload cancelled";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Quoting,
    Uploading,
    Completed,
    Failed,
}

impl TransferStatus for UploadStatus {
    fn label(self) -> &'static str {
        match self {
            Self::Quoting => "quoting",
            Self::Uploading => "uploading",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    fn is_active(self) -> bool {
        matches!(self, Self::Quoting | Self::Uploading)
    }

    fn is_completed(self) -> bool {
        self == Self::Completed
    }

    fn is_failed(self) -> bool {
        self == Self::Failed
    }

    fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    fn is_retryable(self) -> bool {
        self == Self::Failed
    }
}

/// A local file selected for upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadFile {
    pub path: String,
    pub name: String,
}

impl UploadFile {
    pub fn new(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadItem {
    pub id: String,
    /// The single file's name, or "N files"
    pub name: String,
    pub total_files: usize,
    pub total_size: u64,
    pub status: UploadStatus,
    pub progress: u8,
    pub current_file: Option<String>,
    pub files_processed: u64,
    pub bytes_processed: u64,
    pub chunks_uploaded: Option<u64>,
    pub total_chunks: Option<u64>,
    pub error: Option<String>,
    pub completion_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Record the upload in the user's vault once stored
    pub add_to_vault: bool,
}

impl Transfer for UploadItem {
    type Status = UploadStatus;

    fn id(&self) -> &str {
        &self.id
    }

    fn status(&self) -> UploadStatus {
        self.status
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Fields to merge into an upload. `None` leaves a field as it is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadUpdate {
    pub status: Option<UploadStatus>,
    pub total_size: Option<u64>,
    pub current_file: Option<String>,
    pub files_processed: Option<u64>,
    pub bytes_processed: Option<u64>,
    pub chunks_uploaded: Option<u64>,
    pub total_chunks: Option<u64>,
    /// Explicit progress, overridden whenever chunk counts are known
    pub progress: Option<u8>,
    pub error: Option<String>,
    pub completion_message: Option<String>,
}

impl UploadUpdate {
    pub fn status(status: UploadStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn chunks(uploaded: u64, total: u64) -> Self {
        Self {
            chunks_uploaded: Some(uploaded),
            total_chunks: Some(total),
            ..Default::default()
        }
    }

    pub fn completed(message: impl Into<String>) -> Self {
        Self {
            status: Some(UploadStatus::Completed),
            completion_message: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: Some(UploadStatus::Failed),
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

impl UploadItem {
    fn apply(&mut self, update: UploadUpdate) {
        if let Some(status) = update.status {
            self.status = status;
            if status.is_terminal() {
                self.completed_at = Some(Utc::now());
            }
        }
        if let Some(total_size) = update.total_size {
            self.total_size = total_size;
        }
        if update.current_file.is_some() {
            self.current_file = update.current_file;
        }
        if let Some(files) = update.files_processed {
            self.files_processed = files;
        }
        if let Some(bytes) = update.bytes_processed {
            self.bytes_processed = bytes;
        }
        if update.chunks_uploaded.is_some() {
            self.chunks_uploaded = update.chunks_uploaded;
        }
        if update.total_chunks.is_some() {
            self.total_chunks = update.total_chunks;
        }
        if let Some(progress) = update.progress {
            self.progress = progress.min(100);
        }
        if update.error.is_some() {
            self.error = update.error;
        }
        if update.completion_message.is_some() {
            self.completion_message = update.completion_message;
        }
        if let Some(progress) = percent(self.chunks_uploaded, self.total_chunks) {
            self.progress = progress;
        }
    }

    fn reset(&mut self) {
        self.status = UploadStatus::Quoting;
        self.progress = 0;
        self.current_file = None;
        self.files_processed = 0;
        self.bytes_processed = 0;
        self.chunks_uploaded = None;
        self.total_chunks = None;
        self.error = None;
        self.completion_message = None;
        self.completed_at = None;
    }
}

/// Uploads by id, published for subscribers.
#[derive(Debug, Default)]
pub struct UploadTracker {
    uploads: Published<UploadItem>,
}

impl UploadTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Follow every change to the collection.
    pub fn subscribe(&self) -> watch::Receiver<Tracker<UploadItem>> {
        self.uploads.subscribe()
    }

    /// Start tracking an upload of `files`; returns its id.
    pub fn create_upload(&self, files: &[UploadFile], add_to_vault: bool) -> String {
        let name = match files {
            [single] => single.name.clone(),
            _ => format!("{} files", files.len()),
        };
        let item = UploadItem {
            id: timestamped_id("", 9),
            name,
            total_files: files.len(),
            total_size: 0,
            status: UploadStatus::Quoting,
            progress: 0,
            current_file: None,
            files_processed: 0,
            bytes_processed: 0,
            chunks_uploaded: None,
            total_chunks: None,
            error: None,
            completion_message: None,
            created_at: Utc::now(),
            completed_at: None,
            add_to_vault,
        };
        let id = self.uploads.insert(item);
        info!(upload = %id, files = files.len(), "upload created");
        id
    }

    /// Merge `update` into a running upload.
    pub fn update_upload(&self, id: &str, update: UploadUpdate) -> Result<UploadItem> {
        let item = self.uploads.modify(id, |item| item.apply(update))?;
        debug!(upload = id, status = item.status.label(), progress = item.progress, "upload updated");
        Ok(item)
    }

    /// Cancel before execution; marks the upload failed.
    pub fn cancel_upload(&self, id: &str) -> Result<UploadItem> {
        let item = self.update_upload(id, UploadUpdate::failed(UPLOAD_CANCELLED))?;
        info!(upload = id, "upload cancelled");
        Ok(item)
    }

    /// Restart a failed upload from quoting.
    pub fn retry_upload(&self, id: &str) -> Result<UploadItem> {
        info!(upload = id, "retrying upload");
        self.uploads.restart(id, UploadItem::reset)
    }

    pub fn remove_upload(&self, id: &str) -> Option<UploadItem> {
        self.uploads.remove(id)
    }

    pub fn get(&self, id: &str) -> Option<UploadItem> {
        self.uploads.read(|tracker| tracker.get(id).cloned())
    }

    pub fn len(&self) -> usize {
        self.uploads.read(Tracker::len)
    }

    pub fn is_empty(&self) -> bool {
        self.uploads.read(Tracker::is_empty)
    }

    pub fn sorted(&self) -> Vec<UploadItem> {
        self.uploads.list(Tracker::sorted)
    }

    pub fn active(&self) -> Vec<UploadItem> {
        self.uploads.list(Tracker::active)
    }

    pub fn completed(&self) -> Vec<UploadItem> {
        self.uploads.list(Tracker::completed)
    }

    pub fn failed(&self) -> Vec<UploadItem> {
        self.uploads.list(Tracker::failed)
    }

    pub fn clear_completed(&self) -> usize {
        self.uploads.clear(Tracker::clear_completed)
    }

    pub fn clear_failed(&self) -> usize {
        self.uploads.clear(Tracker::clear_failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransferError;

    fn files(n: usize) -> Vec<UploadFile> {
        (0..n)
            .map(|i| UploadFile::new(format!("/home/me/f{i}.txt"), format!("f{i}.txt")))
            .collect()
    }

    #[test]
    fn test_display_name() {
        let uploads = UploadTracker::new();
        let one = uploads.create_upload(&files(1), true);
        let three = uploads.create_upload(&files(3), false);

        assert_eq!(uploads.get(&one).unwrap().name, "f0.txt");
        assert_eq!(uploads.get(&three).unwrap().name, "3 files");
        assert!(!uploads.get(&three).unwrap().add_to_vault);
        assert_eq!(uploads.get(&one).unwrap().status, UploadStatus::Quoting);
    }

    #[test]
    fn test_progress_from_chunks() {
        let uploads = UploadTracker::new();
        let id = uploads.create_upload(&files(1), true);

        let item = uploads
            .update_upload(&id, UploadUpdate::status(UploadStatus::Uploading))
            .unwrap();
        assert_eq!(item.progress, 0);

        let item = uploads.update_upload(&id, UploadUpdate::chunks(1, 3)).unwrap();
        assert_eq!(item.progress, 33);

        // Only the uploaded count changes; the known total is reused.
        let update = UploadUpdate {
            chunks_uploaded: Some(3),
            ..Default::default()
        };
        assert_eq!(uploads.update_upload(&id, update).unwrap().progress, 100);
    }

    #[test]
    fn test_cancel_is_terminal() {
        let uploads = UploadTracker::new();
        let id = uploads.create_upload(&files(2), true);

        let item = uploads.cancel_upload(&id).unwrap();
        assert_eq!(item.status, UploadStatus::Failed);
        assert_eq!(item.error.as_deref(), Some(UPLOAD_CANCELLED));
        assert!(item.completed_at.is_some());

        assert!(matches!(
            uploads.update_upload(&id, UploadUpdate::status(UploadStatus::Uploading)),
            Err(TransferError::Finished { status: "failed", .. })
        ));
        assert_eq!(uploads.failed().len(), 1);
    }

    #[test]
    fn test_retry_resets_counters() {
        let uploads = UploadTracker::new();
        let id = uploads.create_upload(&files(1), true);
        uploads.update_upload(&id, UploadUpdate::chunks(2, 4)).unwrap();
        uploads.update_upload(&id, UploadUpdate::failed("network")).unwrap();

        let item = uploads.retry_upload(&id).unwrap();
        assert_eq!(item.status, UploadStatus::Quoting);
        assert_eq!(item.progress, 0);
        assert_eq!(item.chunks_uploaded, None);
        assert_eq!(item.error, None);
        assert_eq!(item.completed_at, None);

        assert!(matches!(
            uploads.retry_upload(&id),
            Err(TransferError::NotRetryable { status: "quoting", .. })
        ));
    }

    #[test]
    fn test_unknown_upload() {
        let uploads = UploadTracker::new();
        assert_eq!(
            uploads.cancel_upload("nope").unwrap_err(),
            TransferError::Unknown("nope".to_string())
        );
        assert!(uploads.remove_upload("nope").is_none());
    }
}
