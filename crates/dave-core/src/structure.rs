//! Vault structure model
//!
//! The best-known decomposition of a vault into archives and loose files.
//! Field names follow the loader's JSON so events deserialize directly.

use serde::{Deserialize, Serialize};

use crate::access::ArchiveAccess;

/// Size and timestamps (Unix seconds) of a file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStats {
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub created: i64,
    #[serde(default)]
    pub modified: i64,
    #[serde(default)]
    pub uploaded: i64,
}

/// Resolved content pointer of a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataAccess {
    /// Data map chunk bytes.
    Private(Vec<u8>),
    /// Public data address.
    Public(String),
}

/// Metadata of a single file, inside an archive or standalone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    /// Slash-separated path; empty segments are discarded.
    pub path: String,
    #[serde(default)]
    pub metadata: FileStats,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_data: Option<DataAccess>,
    #[serde(default)]
    pub is_loaded: bool,
    /// Name of the archive the file came from (empty when standalone).
    #[serde(default)]
    pub archive_name: String,
}

impl FileMetadata {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            metadata: FileStats::default(),
            access_data: None,
            is_loaded: false,
            archive_name: String::new(),
        }
    }

    /// Mark as fully loaded.
    pub fn loaded(mut self) -> Self {
        self.is_loaded = true;
        self
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.metadata.size = size;
        self
    }

    pub fn with_access(mut self, access: DataAccess) -> Self {
        self.access_data = Some(access);
        self
    }

    /// Non-empty path segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.path.split('/').filter(|segment| !segment.is_empty())
    }

    /// The final path segment.
    pub fn file_name(&self) -> Option<&str> {
        self.segments().last()
    }

    /// Merge a later sighting of the same file.
    ///
    /// A loaded entry replaces whatever is there; a not-loaded entry never
    /// replaces anything. Returns whether `self` changed.
    pub fn absorb(&mut self, later: FileMetadata) -> bool {
        if later.is_loaded {
            *self = later;
            true
        } else {
            false
        }
    }
}

/// A bundle of files addressed by a single pointer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Archive {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "archive_access")]
    pub access: ArchiveAccess,
    #[serde(default)]
    pub files: Vec<FileMetadata>,
}

impl Archive {
    pub fn new(name: impl Into<String>, access: ArchiveAccess) -> Self {
        Self {
            name: name.into(),
            access,
            files: Vec::new(),
        }
    }

    pub fn with_files(mut self, files: Vec<FileMetadata>) -> Self {
        self.files = files;
        self
    }

    /// Named archives get their own folder; unnamed ones spill into the root.
    pub fn is_named(&self) -> bool {
        !self.name.trim().is_empty()
    }

    pub fn reference(&self) -> ArchiveRef {
        ArchiveRef {
            name: self.name.clone(),
            access: self.access.clone(),
        }
    }
}

/// Name and pointer of an archive whose contents are not (yet) known.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArchiveRef {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "archive_access")]
    pub access: ArchiveAccess,
}

impl ArchiveRef {
    pub fn new(name: impl Into<String>, access: ArchiveAccess) -> Self {
        Self {
            name: name.into(),
            access,
        }
    }
}

/// Current decomposition of a vault (or of the local mirror).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultStructure {
    #[serde(default)]
    pub archives: Vec<Archive>,
    #[serde(default)]
    pub failed_archives: Vec<ArchiveRef>,
    #[serde(default)]
    pub files: Vec<FileMetadata>,
}

impl VaultStructure {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when there is nothing to show.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.archives.iter().all(|a| a.files.is_empty())
    }

    /// Standalone files followed by every archive's files, in input order.
    pub fn all_files(&self) -> impl Iterator<Item = &FileMetadata> {
        self.files
            .iter()
            .chain(self.archives.iter().flat_map(|a| a.files.iter()))
    }
}
