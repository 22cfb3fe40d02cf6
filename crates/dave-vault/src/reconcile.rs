//! Update application
//!
//! [`Reconciler`] applies one [`StructureUpdate`] to a [`StructureState`] and
//! rebuilds the derived views (file index, tree). It never looks at load
//! tokens; stores check those before handing an update over.

use std::collections::HashMap;

use dave_core::{Archive, ArchiveIdentity, ArchiveRef, FileMetadata, LoadToken, StructureUpdate};
use dave_tree::{build, TreeOptions};
use tracing::{debug, error, trace};

use crate::state::{FileEntry, LoadPhase, StructureState};

/// Applies structure updates under one archive identity rule.
#[derive(Debug, Clone)]
pub struct Reconciler {
    options: TreeOptions,
}

impl Reconciler {
    pub fn new(options: TreeOptions) -> Self {
        Self { options }
    }

    pub fn identity(&self) -> ArchiveIdentity {
        self.options.identity
    }

    pub fn options(&self) -> &TreeOptions {
        &self.options
    }

    /// Clear everything and make `token` the active load.
    pub fn reset(&self, state: &mut StructureState, token: LoadToken, phase: LoadPhase) {
        *state = StructureState {
            phase,
            token: Some(token),
            pending: true,
            ..StructureState::default()
        };
    }

    /// Apply one update. Returns whether observable state changed.
    pub fn apply(&self, state: &mut StructureState, update: StructureUpdate) -> bool {
        trace!(update = update.kind(), "applying structure update");
        match update {
            StructureUpdate::IndividualFiles { files } => {
                state.structure.files = files;
                self.refresh(state);
                true
            }
            StructureUpdate::ArchiveLoading { loading_archive } => {
                self.mark_loading(state, loading_archive)
            }
            StructureUpdate::ArchiveLoaded { archive } => {
                self.record_loaded(state, archive);
                true
            }
            StructureUpdate::ArchiveFailed { failed_archive } => {
                self.record_failed(state, failed_archive)
            }
            StructureUpdate::Complete => {
                state.loading_archives.clear();
                state.pending = false;
                state.phase = LoadPhase::Complete;
                debug!(
                    archives = state.structure.archives.len(),
                    failed = state.structure.failed_archives.len(),
                    "structure load complete"
                );
                true
            }
        }
    }

    /// Add to the loading set unless already tracked or already loaded.
    pub fn mark_loading(&self, state: &mut StructureState, archive: ArchiveRef) -> bool {
        let identity = self.identity();
        let key = identity.key(&archive.access);
        let tracked = state
            .loading_archives
            .iter()
            .any(|a| identity.key(&a.access) == key);
        if tracked || state.loaded_archives.contains_key(&key) {
            return false;
        }
        state.loading_archives.push(archive);
        true
    }

    /// Record a loaded archive. A loaded archive supersedes an earlier failure.
    pub fn record_loaded(&self, state: &mut StructureState, archive: Archive) {
        let identity = self.identity();
        let key = identity.key(&archive.access);

        state
            .loading_archives
            .retain(|a| identity.key(&a.access) != key);
        state
            .structure
            .failed_archives
            .retain(|a| identity.key(&a.access) != key);

        let known = state
            .structure
            .archives
            .iter()
            .any(|a| identity.key(&a.access) == key);
        if known {
            debug!(archive = %archive.name, "archive already loaded, ignoring duplicate");
        } else {
            state.loaded_archives.insert(key, archive.reference());
            state.structure.archives.push(archive);
        }

        self.refresh(state);
    }

    /// Record a failed archive. Ignored when the archive already loaded.
    pub fn record_failed(&self, state: &mut StructureState, failed: ArchiveRef) -> bool {
        let identity = self.identity();
        let key = identity.key(&failed.access);

        let before = state.loading_archives.len();
        state
            .loading_archives
            .retain(|a| identity.key(&a.access) != key);
        let removed = state.loading_archives.len() != before;

        if state.loaded_archives.contains_key(&key) {
            debug!(archive = %failed.name, "failure reported for a loaded archive, ignoring");
            return removed;
        }

        let duplicate = state
            .structure
            .failed_archives
            .iter()
            .any(|a| a.name == failed.name && identity.key(&a.access) == key);
        if !duplicate {
            state.structure.failed_archives.push(failed);
        }

        self.rebuild(state);
        true
    }

    /// Reindex files, rebuild the tree and clear `pending` once content exists.
    fn refresh(&self, state: &mut StructureState) {
        reindex(state);
        self.rebuild(state);
        if !state.structure.is_empty() {
            state.pending = false;
        }
    }

    fn rebuild(&self, state: &mut StructureState) {
        match build(&state.structure, &self.options) {
            Ok(out) => {
                state.current_directory = Some(out.tree.root());
                state.tree = Some(out.tree);
                state.diagnostics = out.diagnostics;
            }
            Err(e) => {
                error!(error = %e, "failed to build directory tree");
                state.tree = None;
                state.current_directory = None;
                state.diagnostics.clear();
            }
        }
    }
}

/// Flatten the structure into the file index, keeping per-file UI flags.
///
/// Entries are keyed by `(archive_name, path)`; a repeated key merges with
/// the loaded-supersedes-not-loaded rule.
fn reindex(state: &mut StructureState) {
    let flags: HashMap<(String, String), (bool, bool)> = state
        .files
        .iter()
        .map(|entry| {
            let key = (entry.file.archive_name.clone(), entry.file.path.clone());
            (key, (entry.is_loading, entry.load_error))
        })
        .collect();

    let mut files: Vec<FileEntry> = Vec::new();
    let mut positions: HashMap<(String, String), usize> = HashMap::new();

    let standalone = state.structure.files.iter().map(|f| (f, None));
    let archived = state
        .structure
        .archives
        .iter()
        .flat_map(|a| a.files.iter().map(move |f| (f, Some(a.name.as_str()))));

    for (file, archive) in standalone.chain(archived) {
        let mut file: FileMetadata = file.clone();
        if let Some(name) = archive
            && file.archive_name.is_empty()
        {
            file.archive_name = name.to_string();
        }

        let key = (file.archive_name.clone(), file.path.clone());
        match positions.get(&key) {
            Some(&at) => {
                files[at].file.absorb(file);
            }
            None => {
                let mut entry = FileEntry::new(file);
                if let Some(&(is_loading, load_error)) = flags.get(&key) {
                    entry.is_loading = is_loading;
                    entry.load_error = load_error;
                }
                positions.insert(key, files.len());
                files.push(entry);
            }
        }
    }

    state.files = files;
}
