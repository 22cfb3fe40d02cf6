//! Observable store state
//!
//! Everything the UI reads reactively lives in [`StructureState`], published
//! through a `watch` channel by each store.

use std::collections::HashMap;

use dave_core::{ArchiveKey, ArchiveRef, FileMetadata, LoadToken, VaultStructure};
use dave_tree::{DirectoryTree, Node, NodeId, TreeDiagnostic};

/// Where the store is in its load sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadPhase {
    /// Nothing requested yet
    #[default]
    Idle,
    /// Waiting for the vault key signature
    Signing,
    /// Structure request in flight, updates arriving
    Streaming,
    /// `Complete` received for the active load
    Complete,
    /// The load could not be started
    Failed,
}

/// A file as shown in the flat file list, with its UI flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub file: FileMetadata,
    /// Full content resolution in flight
    pub is_loading: bool,
    /// The last resolution attempt failed
    pub load_error: bool,
}

impl FileEntry {
    pub fn new(file: FileMetadata) -> Self {
        Self {
            file,
            is_loading: false,
            load_error: false,
        }
    }

    pub fn path(&self) -> &str {
        &self.file.path
    }

    /// Index key: the same path may occur once per archive.
    pub fn key(&self) -> (&str, &str) {
        (&self.file.archive_name, &self.file.path)
    }
}

/// State of one reconciliation store.
#[derive(Debug, Clone, Default)]
pub struct StructureState {
    pub phase: LoadPhase,
    /// Token of the active load; updates carrying any other token are dropped
    pub token: Option<LoadToken>,
    pub structure: VaultStructure,
    /// Flattened files of the structure
    pub files: Vec<FileEntry>,
    pub loading_archives: Vec<ArchiveRef>,
    /// Archives known to be loaded, by identity key
    pub loaded_archives: HashMap<ArchiveKey, ArchiveRef>,
    /// Root directory; `None` before the first build or after a failed one
    pub tree: Option<DirectoryTree>,
    pub current_directory: Option<NodeId>,
    /// Entries skipped by the last build
    pub diagnostics: Vec<TreeDiagnostic>,
    /// True from the start of a load until content or `Complete` arrives
    pub pending: bool,
}

impl StructureState {
    pub fn failed_archives(&self) -> &[ArchiveRef] {
        &self.structure.failed_archives
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.phase, LoadPhase::Signing | LoadPhase::Streaming)
    }

    pub fn root_directory(&self) -> Option<NodeId> {
        self.tree.as_ref().map(DirectoryTree::root)
    }

    pub fn current_node(&self) -> Option<&Node> {
        let tree = self.tree.as_ref()?;
        tree.get(self.current_directory?)
    }

    /// Children of the current directory, in insertion order.
    pub fn current_directory_children(&self) -> Vec<(NodeId, &Node)> {
        let (Some(tree), Some(current)) = (self.tree.as_ref(), self.current_directory) else {
            return Vec::new();
        };
        tree.children(current)
            .iter()
            .filter_map(|id| tree.get(*id).map(|node| (*id, node)))
            .collect()
    }

    /// First entry with this path, whatever its archive.
    pub fn file(&self, path: &str) -> Option<&FileEntry> {
        self.files.iter().find(|entry| entry.path() == path)
    }

    /// The entry for `path` inside `archive_name` (empty for standalone files).
    pub fn file_in(&self, archive_name: &str, path: &str) -> Option<&FileEntry> {
        self.files.iter().find(|entry| entry.key() == (archive_name, path))
    }
}
