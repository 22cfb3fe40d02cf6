//! Remote vault store
//!
//! Owns the structure of the user's remote vault. A load asks the wallet for
//! the vault key signature, then asks the loader to stream the structure;
//! streamed updates arrive through [`VaultStore::apply_update`], usually fed
//! by [`spawn_listener`](crate::spawn_listener).

use std::sync::Arc;

use dave_core::{Archive, FileMetadata, LoadToken, Notice, Notices, SignatureCache, TaggedUpdate, VaultLoader};
use dave_tree::{NodeId, TreeOptions};
use tokio::sync::watch;
use tracing::{debug, instrument, warn};

use crate::engine::Engine;
use crate::error::{Result, VaultError};
use crate::listener::UpdateSink;
use crate::state::{LoadPhase, StructureState};

const TOKEN_PREFIX: &str = "vault";

/// Reconciliation store for the remote vault.
pub struct VaultStore {
    engine: Engine,
    signatures: Arc<SignatureCache>,
    loader: Arc<dyn VaultLoader>,
}

impl VaultStore {
    pub fn new(
        signatures: Arc<SignatureCache>,
        loader: Arc<dyn VaultLoader>,
        notices: Notices,
    ) -> Self {
        Self::with_options(TreeOptions::vault(), signatures, loader, notices)
    }

    pub fn with_options(
        options: TreeOptions,
        signatures: Arc<SignatureCache>,
        loader: Arc<dyn VaultLoader>,
        notices: Notices,
    ) -> Self {
        Self {
            engine: Engine::new(options, notices),
            signatures,
            loader,
        }
    }

    /// Reactive view of the store state.
    pub fn subscribe(&self) -> watch::Receiver<StructureState> {
        self.engine.subscribe()
    }

    /// Read the current state without cloning it.
    pub fn with_state<R>(&self, f: impl FnOnce(&StructureState) -> R) -> R {
        self.engine.with_state(f)
    }

    /// Start a fresh load, superseding any load in progress.
    ///
    /// Returns once the loader has accepted the request; updates keep
    /// arriving afterwards. If a newer load starts while this one awaits the
    /// signature, this one returns [`VaultError::Superseded`] without
    /// touching state.
    #[instrument(skip(self))]
    pub async fn start_load(&self) -> Result<LoadToken> {
        let token = self.engine.begin(TOKEN_PREFIX, LoadPhase::Signing);

        let signature = match self.signatures.vault_key_signature().await {
            Ok(signature) => signature,
            Err(e) => return Err(self.fail(&token, e.into())),
        };

        let streaming = self.engine.modify_if_current(&token, |state, _| {
            state.phase = LoadPhase::Streaming;
            true
        });
        if !streaming {
            debug!(token = %token, "load superseded while signing");
            return Err(VaultError::Superseded);
        }

        if let Err(e) = self.loader.stream_vault_structure(&signature, &token).await {
            return Err(self.fail(&token, e.into()));
        }
        Ok(token)
    }

    /// Apply one streamed update. Returns whether state changed.
    pub fn apply_update(&self, update: TaggedUpdate) -> bool {
        self.engine.apply_update(update)
    }

    /// Resolve a single file's content pointer.
    ///
    /// `file` is identified by its archive name and path, so the same path in
    /// two archives is resolved independently. The entry is flagged
    /// `is_loading` first; on success it is replaced by the resolved
    /// metadata, on failure it is flagged `load_error`. State is always
    /// updated before an error is returned.
    #[instrument(skip_all, fields(path = %file.path, archive = %file.archive_name))]
    pub async fn load_single_file_data(&self, file: &FileMetadata) -> Result<FileMetadata> {
        let (archive, path) = (file.archive_name.as_str(), file.path.as_str());
        let mut known = false;
        self.engine.modify(|state| {
            if let Some(entry) = state.files.iter_mut().find(|e| e.key() == (archive, path)) {
                entry.is_loading = true;
                entry.load_error = false;
                known = true;
            }
        });
        if !known {
            warn!("file not in index");
            return Err(VaultError::UnknownFile {
                path: path.to_string(),
            });
        }

        let resolved = match self.signatures.vault_key_signature().await {
            Ok(signature) => self.loader.load_single_file(&signature, path).await,
            Err(e) => Err(e),
        };

        match resolved {
            Ok(mut resolved) => {
                resolved.is_loaded = true;
                resolved.archive_name = archive.to_string();
                self.engine.modify(|state| {
                    if let Some(entry) = state.files.iter_mut().find(|e| e.key() == (archive, path)) {
                        entry.file = resolved.clone();
                        entry.is_loading = false;
                        entry.load_error = false;
                    }
                    let structure = &mut state.structure;
                    let standalone = structure.files.iter_mut().map(|f| (None, f));
                    let archived = structure.archives.iter_mut().flat_map(|a| {
                        let Archive { name, files, .. } = a;
                        let name: &str = name;
                        files.iter_mut().map(move |f| (Some(name), f))
                    });
                    for (_, stored) in standalone.chain(archived).filter(|(owner, stored)| {
                        stored.path == path && effective_archive(*owner, stored) == archive
                    }) {
                        let archive_name = std::mem::take(&mut stored.archive_name);
                        stored.absorb(resolved.clone());
                        stored.archive_name = archive_name;
                    }
                });
                debug!("file data loaded");
                Ok(resolved)
            }
            Err(e) => {
                self.engine.modify(|state| {
                    if let Some(entry) = state.files.iter_mut().find(|e| e.key() == (archive, path)) {
                        entry.is_loading = false;
                        entry.load_error = true;
                    }
                });
                self.engine
                    .notices()
                    .publish(Notice::error("Failed to load file", e.to_string()));
                Err(e.into())
            }
        }
    }

    /// Make a folder the current directory.
    pub fn change_directory(&self, node: NodeId) -> Result<()> {
        self.engine.change_directory(node)
    }

    /// Go up one level. Returns false when already at the root.
    pub fn parent_directory(&self) -> bool {
        self.engine.parent_directory()
    }

    /// Forget the signature and all vault state (wallet disconnected).
    pub async fn disconnect(&self) {
        self.signatures.disconnect().await;
        self.engine.modify(|state| *state = StructureState::default());
    }

    fn fail(&self, token: &LoadToken, err: VaultError) -> VaultError {
        self.engine.fail(token, "Failed to get vault structure", err)
    }
}

impl UpdateSink for VaultStore {
    fn apply_update(&self, update: TaggedUpdate) -> bool {
        VaultStore::apply_update(self, update)
    }
}

/// Archive name a stored file is indexed under.
fn effective_archive<'a>(owner: Option<&'a str>, stored: &'a FileMetadata) -> &'a str {
    match owner {
        Some(name) if stored.archive_name.is_empty() => name,
        _ => &stored.archive_name,
    }
}
