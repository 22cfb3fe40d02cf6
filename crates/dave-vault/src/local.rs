//! Local mirror store
//!
//! Same reconciliation as the vault store, applied to the device-local
//! structure. Archives are identified by address and privacy tier, and every
//! load is stamped with a fresh token that the loader echoes back.

use std::sync::Arc;

use dave_core::{Archive, ArchiveRef, LoadToken, LocalLoader, Notice, Notices, TaggedUpdate};
use dave_tree::{NodeId, TreeOptions};
use tokio::sync::watch;
use tracing::{debug, instrument};

use crate::engine::Engine;
use crate::error::{Result, VaultError};
use crate::listener::UpdateSink;
use crate::state::{LoadPhase, StructureState};

const TOKEN_PREFIX: &str = "local";

/// Reconciliation store for the local mirror.
pub struct LocalStore {
    engine: Engine,
    loader: Arc<dyn LocalLoader>,
}

impl LocalStore {
    pub fn new(loader: Arc<dyn LocalLoader>, notices: Notices) -> Self {
        Self::with_options(TreeOptions::local(), loader, notices)
    }

    pub fn with_options(options: TreeOptions, loader: Arc<dyn LocalLoader>, notices: Notices) -> Self {
        Self {
            engine: Engine::new(options, notices),
            loader,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<StructureState> {
        self.engine.subscribe()
    }

    pub fn with_state<R>(&self, f: impl FnOnce(&StructureState) -> R) -> R {
        self.engine.with_state(f)
    }

    /// Token of the active load, if any.
    pub fn current_token(&self) -> Option<LoadToken> {
        self.engine.with_state(|state| state.token.clone())
    }

    /// Start a fresh local structure load under a new token.
    #[instrument(skip(self))]
    pub async fn get_local_structure(&self) -> Result<LoadToken> {
        let token = self.engine.begin(TOKEN_PREFIX, LoadPhase::Streaming);

        if let Err(e) = self.loader.stream_local_structure(&token).await {
            return Err(self
                .engine
                .fail(&token, "Failed to get local structure", e.into()));
        }
        Ok(token)
    }

    /// Apply one streamed update; the token is checked before anything else.
    pub fn apply_update(&self, update: TaggedUpdate) -> bool {
        self.engine.apply_update(update)
    }

    /// Load one archive's contents on demand.
    ///
    /// The archive joins the loading set, then is recorded as loaded or
    /// failed exactly as a streamed event would be. If a new structure load
    /// starts meanwhile, the result is discarded.
    #[instrument(skip(self), fields(archive = %archive.name))]
    pub async fn load_archive(&self, archive: ArchiveRef) -> Result<Archive> {
        let Some(token) = self.current_token() else {
            return Err(VaultError::Superseded);
        };

        let identity = self.engine.reconciler().identity();
        let key = identity.key(&archive.access);
        let already = self.engine.with_state(|state| {
            state
                .structure
                .archives
                .iter()
                .find(|a| identity.key(&a.access) == key)
                .cloned()
        });
        if let Some(loaded) = already {
            debug!("archive already loaded");
            return Ok(loaded);
        }

        self.engine.modify_if_current(&token, |state, reconciler| {
            reconciler.mark_loading(state, archive.clone())
        });

        match self.loader.load_local_archive(&archive.access).await {
            Ok(files) => {
                let loaded = Archive::new(archive.name.clone(), archive.access.clone()).with_files(files);
                let applied = self.engine.modify_if_current(&token, |state, reconciler| {
                    reconciler.record_loaded(state, loaded.clone());
                    true
                });
                if !applied {
                    return Err(VaultError::Superseded);
                }
                Ok(loaded)
            }
            Err(e) => {
                let applied = self.engine.modify_if_current(&token, |state, reconciler| {
                    reconciler.record_failed(state, archive.clone())
                });
                if applied {
                    self.engine
                        .notices()
                        .publish(Notice::error("Failed to load archive", e.to_string()));
                }
                Err(e.into())
            }
        }
    }

    pub fn change_directory(&self, node: NodeId) -> Result<()> {
        self.engine.change_directory(node)
    }

    pub fn parent_directory(&self) -> bool {
        self.engine.parent_directory()
    }
}

impl UpdateSink for LocalStore {
    fn apply_update(&self, update: TaggedUpdate) -> bool {
        LocalStore::apply_update(self, update)
    }
}
