//! # Dave Transfers
//!
//! In-memory upload and download trackers.
//!
//! Each tracker is a keyed collection of items with an enum status and a
//! derived percentage. Progress is recomputed from the processed and total
//! counts whenever both are known. Completed, failed, and cancelled items
//! accept no further updates; only an explicit retry brings a failed or
//! cancelled item back.

pub mod download;
pub mod error;
pub mod progress;
pub mod tracker;
pub mod upload;

pub use download::{DownloadItem, DownloadStatus, DownloadTracker, DownloadUpdate};
pub use error::{Result, TransferError};
pub use progress::percent;
pub use tracker::{Tracker, Transfer, TransferStatus};
pub use upload::{UploadFile, UploadItem, UploadStatus, UploadTracker, UploadUpdate, UPLOAD_CANCELLED};
