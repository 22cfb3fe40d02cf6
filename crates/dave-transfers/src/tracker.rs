//! Keyed transfer collection shared by uploads and downloads.
//!
//! The collection itself is a plain [`Tracker`]. The upload and download
//! trackers publish theirs on a `watch` channel so the UI can follow every
//! change.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::{Result, TransferError};

/// Status of a tracked transfer.
pub trait TransferStatus: Copy + Eq + std::fmt::Debug {
    /// Lowercase label, as shown in the UI.
    fn label(self) -> &'static str;

    /// Still queued or running.
    fn is_active(self) -> bool;

    fn is_completed(self) -> bool;

    /// Ended without completing. Cancelled uploads count as failed.
    fn is_failed(self) -> bool;

    /// No further updates are accepted; only a retry leaves this state.
    fn is_terminal(self) -> bool;

    /// A retry may start from here.
    fn is_retryable(self) -> bool;
}

/// An item in a [`Tracker`].
pub trait Transfer: Clone {
    type Status: TransferStatus;

    fn id(&self) -> &str;

    fn status(&self) -> Self::Status;

    fn created_at(&self) -> DateTime<Utc>;
}

/// Transfers by id.
#[derive(Debug, Clone)]
pub struct Tracker<T> {
    items: HashMap<String, T>,
}

impl<T: Transfer> Tracker<T> {
    pub fn new() -> Self {
        Self {
            items: HashMap::new(),
        }
    }

    pub(crate) fn insert(&mut self, item: T) -> String {
        let id = item.id().to_string();
        self.items.insert(id.clone(), item);
        id
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.items.get(id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Mutate a non-terminal transfer.
    pub(crate) fn modify<F>(&mut self, id: &str, f: F) -> Result<&T>
    where
        F: FnOnce(&mut T),
    {
        let Some(item) = self.items.get_mut(id) else {
            warn!(transfer = id, "transfer not found");
            return Err(TransferError::unknown(id));
        };
        let status = item.status();
        if status.is_terminal() {
            debug!(transfer = id, status = status.label(), "update on finished transfer ignored");
            return Err(TransferError::Finished {
                id: id.to_string(),
                status: status.label(),
            });
        }
        f(item);
        Ok(item)
    }

    /// Mutate a failed or cancelled transfer back into its initial state.
    pub(crate) fn restart<F>(&mut self, id: &str, f: F) -> Result<&T>
    where
        F: FnOnce(&mut T),
    {
        let Some(item) = self.items.get_mut(id) else {
            warn!(transfer = id, "transfer not found");
            return Err(TransferError::unknown(id));
        };
        let status = item.status();
        if !status.is_retryable() {
            return Err(TransferError::NotRetryable {
                id: id.to_string(),
                status: status.label(),
            });
        }
        f(item);
        Ok(item)
    }

    pub fn remove(&mut self, id: &str) -> Option<T> {
        self.items.remove(id)
    }

    /// All transfers, newest first.
    pub fn sorted(&self) -> Vec<&T> {
        let mut items: Vec<&T> = self.items.values().collect();
        items.sort_by(|a, b| {
            b.created_at()
                .cmp(&a.created_at())
                .then_with(|| b.id().cmp(a.id()))
        });
        items
    }

    pub fn active(&self) -> Vec<&T> {
        self.filtered(|status| status.is_active())
    }

    pub fn completed(&self) -> Vec<&T> {
        self.filtered(|status| status.is_completed())
    }

    pub fn failed(&self) -> Vec<&T> {
        self.filtered(|status| status.is_failed())
    }

    fn filtered(&self, keep: impl Fn(T::Status) -> bool) -> Vec<&T> {
        self.sorted()
            .into_iter()
            .filter(|item| keep(item.status()))
            .collect()
    }

    /// Drop completed transfers; returns how many were removed.
    pub fn clear_completed(&mut self) -> usize {
        self.clear_where(|status| status.is_completed())
    }

    /// Drop failed transfers; returns how many were removed.
    pub fn clear_failed(&mut self) -> usize {
        self.clear_where(|status| status.is_failed())
    }

    fn clear_where(&mut self, drop: impl Fn(T::Status) -> bool) -> usize {
        let before = self.items.len();
        self.items.retain(|_, item| !drop(item.status()));
        before - self.items.len()
    }
}

impl<T: Transfer> Default for Tracker<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A [`Tracker`] published on a `watch` channel.
///
/// Mutations go through short `send_modify` sections; subscribers are only
/// woken when something actually changed.
#[derive(Debug)]
pub(crate) struct Published<T> {
    tx: watch::Sender<Tracker<T>>,
}

impl<T: Transfer> Published<T> {
    pub(crate) fn new() -> Self {
        let (tx, _rx) = watch::channel(Tracker::new());
        Self { tx }
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<Tracker<T>> {
        self.tx.subscribe()
    }

    pub(crate) fn read<R>(&self, f: impl FnOnce(&Tracker<T>) -> R) -> R {
        f(&self.tx.borrow())
    }

    /// Owned copies of a view.
    pub(crate) fn list(&self, view: impl for<'a> FnOnce(&'a Tracker<T>) -> Vec<&'a T>) -> Vec<T> {
        self.read(|tracker| view(tracker).into_iter().cloned().collect())
    }

    pub(crate) fn insert(&self, item: T) -> String {
        let mut id = String::new();
        self.tx.send_modify(|tracker| id = tracker.insert(item));
        id
    }

    pub(crate) fn modify(&self, id: &str, f: impl FnOnce(&mut T)) -> Result<T> {
        let mut outcome = Err(TransferError::unknown(id));
        self.tx.send_if_modified(|tracker| {
            outcome = tracker.modify(id, f).cloned();
            outcome.is_ok()
        });
        outcome
    }

    pub(crate) fn restart(&self, id: &str, f: impl FnOnce(&mut T)) -> Result<T> {
        let mut outcome = Err(TransferError::unknown(id));
        self.tx.send_if_modified(|tracker| {
            outcome = tracker.restart(id, f).cloned();
            outcome.is_ok()
        });
        outcome
    }

    pub(crate) fn remove(&self, id: &str) -> Option<T> {
        let mut removed = None;
        self.tx.send_if_modified(|tracker| {
            removed = tracker.remove(id);
            removed.is_some()
        });
        removed
    }

    pub(crate) fn clear(&self, f: impl FnOnce(&mut Tracker<T>) -> usize) -> usize {
        let mut cleared = 0;
        self.tx.send_if_modified(|tracker| {
            cleared = f(tracker);
            cleared > 0
        });
        cleared
    }
}

impl<T: Transfer> Default for Published<T> {
    fn default() -> Self {
        Self::new()
    }
}
