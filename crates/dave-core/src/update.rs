//! Streaming structure updates
//!
//! Loaders stream the vault structure as a sequence of [`StructureUpdate`]s.
//! Each update is stamped with the [`LoadToken`] of the load that produced
//! it, so that stores can drop events from superseded loads.

use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::ids::timestamped_id;
use crate::structure::{Archive, ArchiveRef, FileMetadata};

/// Generation token identifying one load of a structure.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LoadToken(String);

impl LoadToken {
    /// Mint a fresh token, unique within the session.
    pub fn mint(prefix: &str) -> Self {
        Self(timestamped_id(prefix, 7))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for LoadToken {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// One streamed step of a structure load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "update_type")]
pub enum StructureUpdate {
    /// A batch of standalone files.
    IndividualFiles { files: Vec<FileMetadata> },
    /// An archive whose contents are being fetched.
    ArchiveLoading { loading_archive: ArchiveRef },
    /// An archive finished loading.
    ArchiveLoaded { archive: Archive },
    /// An archive could not be loaded.
    ArchiveFailed { failed_archive: ArchiveRef },
    /// The load finished.
    Complete,
}

impl StructureUpdate {
    pub fn kind(&self) -> &'static str {
        match self {
            StructureUpdate::IndividualFiles { .. } => "IndividualFiles",
            StructureUpdate::ArchiveLoading { .. } => "ArchiveLoading",
            StructureUpdate::ArchiveLoaded { .. } => "ArchiveLoaded",
            StructureUpdate::ArchiveFailed { .. } => "ArchiveFailed",
            StructureUpdate::Complete => "Complete",
        }
    }
}

/// An update together with the token of the load it belongs to.
///
/// Updates without a token are treated as belonging to no load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedUpdate {
    #[serde(rename = "temp_code", default, skip_serializing_if = "Option::is_none")]
    pub token: Option<LoadToken>,
    #[serde(flatten)]
    pub update: StructureUpdate,
}

impl TaggedUpdate {
    pub fn new(token: &LoadToken, update: StructureUpdate) -> Self {
        Self {
            token: Some(token.clone()),
            update,
        }
    }

    /// Whether this update belongs to the load identified by `current`.
    pub fn belongs_to(&self, current: Option<&LoadToken>) -> bool {
        matches!((self.token.as_ref(), current), (Some(a), Some(b)) if a == b)
    }
}
