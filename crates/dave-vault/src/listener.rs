//! Update channel pump
//!
//! Loaders push [`TaggedUpdate`]s onto an mpsc channel; a spawned listener
//! drains it in order into a store.

use std::sync::Arc;

use dave_core::TaggedUpdate;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Capacity of the loader-to-store update channel.
pub const UPDATE_CHANNEL_CAPACITY: usize = 128;

/// Anything that consumes structure updates.
pub trait UpdateSink: Send + Sync + 'static {
    fn apply_update(&self, update: TaggedUpdate) -> bool;
}

/// Create a bounded update channel.
pub fn update_channel() -> (mpsc::Sender<TaggedUpdate>, mpsc::Receiver<TaggedUpdate>) {
    mpsc::channel(UPDATE_CHANNEL_CAPACITY)
}

/// Drain `rx` into `sink` until every sender is dropped.
///
/// Updates are applied in arrival order.
pub fn spawn_listener<S: UpdateSink>(sink: Arc<S>, mut rx: mpsc::Receiver<TaggedUpdate>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(update) = rx.recv().await {
            sink.apply_update(update);
        }
        debug!("structure update channel closed");
    })
}
