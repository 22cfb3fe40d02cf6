//! Backend side of payment orders
//!
//! The backend creates an order for the quotes it needs paid, hands the
//! order to the UI, and waits on a per-order channel for the outcome. The UI
//! reports liveness and the outcome through [`OrderManager::send_message`].

use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::error::{PaymentError, Result};
use crate::quote::{OrderId, PaymentOrder, QuotePayment};

/// Idle window the backend waits between messages.
pub const IDLE_PAYMENT_TIMEOUT: Duration = Duration::from_secs(30);

const CHANNEL_SIZE: usize = 128;

/// Random ids tried before `create_order` gives up.
const MAX_ID_ATTEMPTS: usize = 1024;

/// Message from the UI about an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderMessage {
    /// The user is still working on it; resets the idle timer
    KeepAlive,
    Completed,
    Cancelled,
}

/// Where the payment store reports order progress.
#[async_trait]
pub trait OrderNotifier: Send + Sync {
    async fn notify(&self, id: OrderId, message: OrderMessage) -> Result<()>;
}

/// Tracks open orders and their confirmation channels.
#[derive(Default)]
pub struct OrderManager {
    orders: DashMap<OrderId, (PaymentOrder, mpsc::Sender<OrderMessage>)>,
}

impl OrderManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open an order under a fresh random id.
    pub fn create_order(
        &self,
        payments: Vec<QuotePayment>,
    ) -> Result<(PaymentOrder, mpsc::Receiver<OrderMessage>)> {
        for _ in 0..MAX_ID_ATTEMPTS {
            let id = OrderId::random();
            if let Entry::Vacant(slot) = self.orders.entry(id) {
                let (tx, rx) = mpsc::channel(CHANNEL_SIZE);
                let order = PaymentOrder::new(id, payments);
                slot.insert((order.clone(), tx));
                debug!(order_id = %id, payments = order.payments.len(), "order created");
                return Ok((order, rx));
            }
        }
        error!(open = self.orders.len(), "no free order id");
        Err(PaymentError::OrderIdsExhausted {
            attempts: MAX_ID_ATTEMPTS,
        })
    }

    /// Stop tracking `id`. Returns whether it was open.
    pub fn close(&self, id: OrderId) -> bool {
        self.orders.remove(&id).is_some()
    }

    pub fn get(&self, id: OrderId) -> Option<PaymentOrder> {
        self.orders.get(&id).map(|entry| entry.0.clone())
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Order as JSON, for the UI.
    pub fn order_json(&self, id: OrderId) -> Result<String> {
        self.get(id)
            .ok_or(PaymentError::UnknownOrder(id))?
            .to_json()
    }

    /// Forward a message to the waiting backend task.
    ///
    /// `Completed` and `Cancelled` close the order.
    pub async fn send_message(&self, id: OrderId, message: OrderMessage) -> Result<()> {
        let sender = match self.orders.get(&id) {
            Some(entry) => entry.1.clone(),
            None => {
                error!(order_id = %id, ?message, "message for unknown order");
                return Err(PaymentError::UnknownOrder(id));
            }
        };

        if matches!(message, OrderMessage::Completed | OrderMessage::Cancelled) {
            self.close(id);
        }

        if sender.send(message).await.is_err() {
            warn!(order_id = %id, ?message, "order receiver dropped");
            return Err(PaymentError::ChannelClosed(id));
        }
        Ok(())
    }
}

#[async_trait]
impl OrderNotifier for OrderManager {
    async fn notify(&self, id: OrderId, message: OrderMessage) -> Result<()> {
        self.send_message(id, message).await
    }
}

impl OrderManager {
    /// Wait for the outcome of an order, then close it.
    ///
    /// Resolves on `Completed`; fails on `Cancelled`, on channel close, or
    /// when no message arrives within `idle_timeout`. Each `KeepAlive`
    /// restarts the idle window. The order is no longer tracked afterwards,
    /// whatever the outcome.
    pub async fn await_confirmation(
        &self,
        id: OrderId,
        rx: &mut mpsc::Receiver<OrderMessage>,
        idle_timeout: Duration,
    ) -> Result<()> {
        let outcome = wait_for_outcome(id, rx, idle_timeout).await;
        self.close(id);
        outcome
    }
}

async fn wait_for_outcome(
    id: OrderId,
    rx: &mut mpsc::Receiver<OrderMessage>,
    idle_timeout: Duration,
) -> Result<()> {
    loop {
        match tokio::time::timeout(idle_timeout, rx.recv()).await {
            Ok(Some(OrderMessage::KeepAlive)) => {
                debug!(order_id = %id, "keep alive");
            }
            Ok(Some(OrderMessage::Completed)) => return Ok(()),
            Ok(Some(OrderMessage::Cancelled)) => return Err(PaymentError::Cancelled(id)),
            Ok(None) => return Err(PaymentError::ChannelClosed(id)),
            Err(_) => {
                warn!(order_id = %id, "order idle timeout");
                return Err(PaymentError::IdleTimeout(id));
            }
        }
    }
}
