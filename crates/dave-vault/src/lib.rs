//! # Dave Vault
//!
//! Reconciliation stores that consume a streamed vault structure and keep a
//! navigable directory tree in sync with it.
//!
//! - [`VaultStore`]: the user's remote vault, unlocked with the wallet's
//!   vault key signature
//! - [`LocalStore`]: the device-local mirror, with on-demand archive loads
//!
//! Each load is identified by a [`LoadToken`](dave_core::LoadToken). Updates
//! carrying any other token are dropped before they touch state, so results
//! of a superseded load are harmless.
//!
//! ```ignore
//! let store = Arc::new(VaultStore::new(signatures, loader, notices));
//! let (tx, rx) = update_channel();
//! spawn_listener(store.clone(), rx);
//! store.start_load().await?;
//! ```

mod engine;
pub mod error;
pub mod listener;
pub mod local;
pub mod reconcile;
pub mod state;
pub mod vault;

pub use error::{Result, VaultError};
pub use listener::{spawn_listener, update_channel, UpdateSink, UPDATE_CHANNEL_CAPACITY};
pub use local::LocalStore;
pub use reconcile::Reconciler;
pub use state::{FileEntry, LoadPhase, StructureState};
pub use vault::VaultStore;
