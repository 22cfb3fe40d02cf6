//! Pending payment orders on the UI side
//!
//! Orders received from the backend wait here until the user pays or cancels
//! them. Each order owns one processing-state slot; [`PaymentStore::pay`]
//! claims the slot atomically so a second submission of the same order is a
//! no-op.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use alloy_primitives::{B256, U256};
use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use dave_core::{Notice, Notices};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{error, info, instrument, warn};

use crate::backend::{OrderMessage, OrderNotifier};
use crate::config::PaymentConfig;
use crate::error::{PaymentError, Result};
use crate::quote::{payments_total, OrderId, PaymentOrder};
use crate::settle::QuoteSettler;

/// Lifecycle of a pending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessingState {
    Pending,
    Processing,
    Completed,
    Cancelled,
}

impl ProcessingState {
    /// Already claimed by a payment attempt (or done).
    pub fn is_claimed(&self) -> bool {
        matches!(self, Self::Processing | Self::Completed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingPayment {
    pub order: PaymentOrder,
    pub expires: DateTime<Utc>,
    pub processing: ProcessingState,
}

/// Result of [`PaymentStore::pay`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayOutcome {
    /// One transaction hash per batch
    Settled(Vec<B256>),
    /// The order was already processing or completed
    AlreadyHandled,
}

/// Pending orders and the payment entry point.
pub struct PaymentStore {
    pending: DashMap<OrderId, PendingPayment>,
    current: watch::Sender<Option<OrderId>>,
    revision: watch::Sender<u64>,
    /// Orders waiting on the wallet/backend handshake before settling
    signing: AtomicUsize,
    settler: Arc<dyn QuoteSettler>,
    notifier: Arc<dyn OrderNotifier>,
    notices: Notices,
    config: PaymentConfig,
}

impl PaymentStore {
    pub fn new(
        settler: Arc<dyn QuoteSettler>,
        notifier: Arc<dyn OrderNotifier>,
        notices: Notices,
        config: PaymentConfig,
    ) -> Self {
        let (current, _rx) = watch::channel(None);
        let (revision, _rx) = watch::channel(0);
        Self {
            pending: DashMap::new(),
            current,
            revision,
            signing: AtomicUsize::new(0),
            settler,
            notifier,
            notices,
            config,
        }
    }

    /// Ticks on every change to the pending set.
    pub fn subscribe_changes(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    pub fn subscribe_current(&self) -> watch::Receiver<Option<OrderId>> {
        self.current.subscribe()
    }

    fn changed(&self) {
        self.revision.send_modify(|rev| *rev = rev.wrapping_add(1));
    }

    fn expiry_from(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let idle = TimeDelta::from_std(self.config.idle_expiration).unwrap_or(TimeDelta::MAX);
        now.checked_add_signed(idle).unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Track a new order and make it the current one.
    pub fn add_pending_payment(&self, order: PaymentOrder) {
        let id = order.id;
        let payment = PendingPayment {
            expires: self.expiry_from(Utc::now()),
            order,
            processing: ProcessingState::Pending,
        };
        self.pending.insert(id, payment);
        self.current.send_replace(Some(id));
        info!(order_id = %id, "pending payment added");
        self.changed();
    }

    pub fn get(&self, id: OrderId) -> Option<PendingPayment> {
        self.pending.get(&id).map(|entry| entry.clone())
    }

    /// Push the expiry of `id` a full idle window into the future.
    pub fn reset_expiration(&self, id: OrderId) {
        match self.pending.get_mut(&id) {
            Some(mut payment) => payment.expires = self.expiry_from(Utc::now()),
            None => {
                error!(order_id = %id, "order not found in pending payments");
                return;
            }
        }
        self.changed();
    }

    /// Move `id` to `state`. A completed order stays completed.
    pub fn set_processing_state(&self, id: OrderId, state: ProcessingState) {
        match self.pending.get_mut(&id) {
            Some(mut payment) => {
                if payment.processing == ProcessingState::Completed && state != ProcessingState::Completed {
                    warn!(order_id = %id, ?state, "ignoring transition out of completed");
                    return;
                }
                payment.processing = state;
            }
            None => {
                error!(order_id = %id, "order not found in pending payments");
                return;
            }
        }
        self.changed();
    }

    pub fn processing_state(&self, id: OrderId) -> Option<ProcessingState> {
        self.pending.get(&id).map(|payment| payment.processing)
    }

    /// Orders still waiting on the user or in flight.
    pub fn pending_count(&self) -> usize {
        self.pending
            .iter()
            .filter(|payment| {
                matches!(
                    payment.processing,
                    ProcessingState::Pending | ProcessingState::Processing
                )
            })
            .count()
    }

    /// Unexpired orders, soonest expiry first.
    pub fn sorted_pending(&self) -> Vec<PendingPayment> {
        self.sorted_pending_at(Utc::now())
    }

    pub fn sorted_pending_at(&self, now: DateTime<Utc>) -> Vec<PendingPayment> {
        let mut payments: Vec<_> = self
            .pending
            .iter()
            .filter(|payment| payment.expires > now)
            .map(|payment| payment.clone())
            .collect();
        payments.sort_by_key(|payment| (payment.expires, payment.order.id));
        payments
    }

    /// Time left on `id`, as `HH:MM:SS`.
    pub fn remaining_time(&self, id: OrderId) -> Option<String> {
        self.pending
            .get(&id)
            .map(|payment| format_remaining(payment.expires, Utc::now()))
    }

    /// Total owed by `id`.
    pub fn total_amount(&self, id: OrderId) -> Result<U256> {
        let payment = self.pending.get(&id).ok_or(PaymentError::UnknownOrder(id))?;
        payments_total(&payment.order.payments)
    }

    pub fn current_payment(&self) -> Option<PendingPayment> {
        let id = (*self.current.borrow())?;
        self.get(id)
    }

    pub fn set_current_payment(&self, id: Option<OrderId>) {
        self.current.send_replace(id);
    }

    /// True while any order is being confirmed with the backend.
    pub fn is_sign_pending(&self) -> bool {
        self.signing.load(Ordering::Acquire) > 0
    }

    /// Cancel an order the user has not started paying.
    pub async fn cancel(&self, id: OrderId) -> Result<()> {
        match self.pending.get_mut(&id) {
            Some(mut payment) => {
                if payment.processing.is_claimed() {
                    return Err(PaymentError::NotCancellable(id));
                }
                payment.processing = ProcessingState::Cancelled;
            }
            None => {
                error!(order_id = %id, "order not found in pending payments");
                return Ok(());
            }
        }
        self.changed();
        info!(order_id = %id, "order cancelled");
        self.notify(id, OrderMessage::Cancelled).await;
        Ok(())
    }

    /// Pay `order` once.
    ///
    /// The order is claimed before anything is awaited; a concurrent or
    /// repeated call for a processing or completed order returns
    /// [`PayOutcome::AlreadyHandled`] without settling. A failed KeepAlive
    /// or settlement leaves the order cancelled; settlement is never
    /// attempted after a failed KeepAlive.
    #[instrument(skip_all, fields(order_id = %order.id))]
    pub async fn pay(&self, order: &PaymentOrder) -> Result<PayOutcome> {
        if !self.claim(order) {
            info!("order already handled");
            return Ok(PayOutcome::AlreadyHandled);
        }
        self.changed();

        let result = match self.keep_alive(order.id).await {
            Ok(()) => self.settler.settle(&order.payments).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(hashes) => {
                self.set_processing_state(order.id, ProcessingState::Completed);
                self.notify(order.id, OrderMessage::Completed).await;
                info!(batches = hashes.len(), "payment complete");
                self.notices
                    .publish(Notice::success("Payment complete", format!("Order {}", order.id)));
                Ok(PayOutcome::Settled(hashes))
            }
            Err(e) => {
                error!(error = %e, "payment failed");
                self.set_processing_state(order.id, ProcessingState::Cancelled);
                self.notify(order.id, OrderMessage::Cancelled).await;
                self.notices.publish(Notice::error("Payment failed", e.to_string()));
                Err(e)
            }
        }
    }

    /// Flip the order to processing unless it already is (or is done).
    fn claim(&self, order: &PaymentOrder) -> bool {
        let expires = self.expiry_from(Utc::now());
        match self.pending.entry(order.id) {
            Entry::Occupied(mut slot) => {
                let payment = slot.get_mut();
                if payment.processing.is_claimed() {
                    return false;
                }
                payment.processing = ProcessingState::Processing;
                payment.expires = expires;
            }
            Entry::Vacant(slot) => {
                slot.insert(PendingPayment {
                    order: order.clone(),
                    expires,
                    processing: ProcessingState::Processing,
                });
            }
        }
        true
    }

    /// Tell the backend the order is being paid. Settlement must not start
    /// when this fails.
    async fn keep_alive(&self, id: OrderId) -> Result<()> {
        let _signing = SigningGuard::enter(&self.signing);
        self.notifier.notify(id, OrderMessage::KeepAlive).await
    }

    async fn notify(&self, id: OrderId, message: OrderMessage) {
        if let Err(e) = self.notifier.notify(id, message).await {
            warn!(order_id = %id, ?message, error = %e, "order notification failed");
        }
    }
}

/// Counts one order in the signing phase until dropped.
struct SigningGuard<'a>(&'a AtomicUsize);

impl<'a> SigningGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self(counter)
    }
}

impl Drop for SigningGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// `expires - now` as `HH:MM:SS`, floored at zero.
pub fn format_remaining(expires: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let total = (expires - now).num_seconds().max(0);
    format!("{:02}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}
