//! Shared store plumbing
//!
//! Both stores own a `watch` channel of [`StructureState`] and mutate it only
//! through short synchronous sections. Nothing here is held across an await.

use dave_core::{LoadToken, Notice, Notices, TaggedUpdate};
use dave_tree::TreeOptions;
use tokio::sync::watch;
use tracing::{debug, error, trace};

use crate::error::{Result, VaultError};
use crate::reconcile::Reconciler;
use crate::state::{LoadPhase, StructureState};

pub(crate) struct Engine {
    state: watch::Sender<StructureState>,
    reconciler: Reconciler,
    notices: Notices,
}

impl Engine {
    pub(crate) fn new(options: TreeOptions, notices: Notices) -> Self {
        let (state, _rx) = watch::channel(StructureState::default());
        Self {
            state,
            reconciler: Reconciler::new(options),
            notices,
        }
    }

    pub(crate) fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub(crate) fn notices(&self) -> &Notices {
        &self.notices
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<StructureState> {
        self.state.subscribe()
    }

    pub(crate) fn with_state<R>(&self, f: impl FnOnce(&StructureState) -> R) -> R {
        f(&self.state.borrow())
    }

    /// Mutate the state unconditionally.
    pub(crate) fn modify(&self, f: impl FnOnce(&mut StructureState)) {
        self.state.send_modify(f);
    }

    /// Mutate the state only while `token` is still the active load.
    pub(crate) fn modify_if_current(
        &self,
        token: &LoadToken,
        f: impl FnOnce(&mut StructureState, &Reconciler) -> bool,
    ) -> bool {
        self.state.send_if_modified(|state| {
            if state.token.as_ref() != Some(token) {
                return false;
            }
            f(state, &self.reconciler)
        })
    }

    pub(crate) fn is_current(&self, token: &LoadToken) -> bool {
        self.state.borrow().token.as_ref() == Some(token)
    }

    /// Start a new load generation, discarding all previous state.
    pub(crate) fn begin(&self, prefix: &str, phase: LoadPhase) -> LoadToken {
        let token = LoadToken::mint(prefix);
        debug!(token = %token, "starting structure load");
        self.state
            .send_modify(|state| self.reconciler.reset(state, token.clone(), phase));
        token
    }

    /// Apply a streamed update. Updates from any other generation are dropped
    /// before anything is touched.
    pub(crate) fn apply_update(&self, tagged: TaggedUpdate) -> bool {
        self.state.send_if_modified(|state| {
            if !tagged.belongs_to(state.token.as_ref()) {
                trace!(
                    update = tagged.update.kind(),
                    token = ?tagged.token,
                    "dropping stale structure update"
                );
                return false;
            }
            self.reconciler.apply(state, tagged.update)
        })
    }

    /// Mark the load as failed and tell the user. Returns the error for `?`.
    pub(crate) fn fail(&self, token: &LoadToken, summary: &str, err: VaultError) -> VaultError {
        error!(token = %token, error = %err, "{summary}");
        let current = self.modify_if_current(token, |state, _| {
            state.phase = LoadPhase::Failed;
            state.pending = false;
            state.loading_archives.clear();
            true
        });
        if current {
            self.notices.publish(Notice::error(summary, err.to_string()));
        }
        err
    }

    /// Make `node` the current directory. Files are rejected.
    pub(crate) fn change_directory(&self, node: dave_tree::NodeId) -> Result<()> {
        let mut outcome = Ok(());
        self.state.send_if_modified(|state| {
            let Some(tree) = state.tree.as_ref() else {
                outcome = Err(VaultError::NoTree);
                return false;
            };
            match tree.get(node) {
                None => {
                    outcome = Err(VaultError::UnknownNode);
                    false
                }
                Some(target) if target.is_file() => {
                    outcome = Err(VaultError::NotAFolder {
                        name: target.name().to_string(),
                    });
                    false
                }
                Some(_) => {
                    let changed = state.current_directory != Some(node);
                    state.current_directory = Some(node);
                    changed
                }
            }
        });
        outcome
    }

    /// Move to the parent of the current directory. Returns false at the root.
    pub(crate) fn parent_directory(&self) -> bool {
        self.state.send_if_modified(|state| {
            let parent = state
                .tree
                .as_ref()
                .zip(state.current_directory)
                .and_then(|(tree, current)| tree.parent(current));
            match parent {
                Some(parent) => {
                    state.current_directory = Some(parent);
                    true
                }
                None => false,
            }
        })
    }
}
