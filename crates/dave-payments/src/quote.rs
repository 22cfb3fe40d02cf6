//! Quote payments and payment orders
//!
//! On the wire a payment is a `(quoteHash, rewardsAddress, amountHex)` string
//! triple. It is parsed into typed values once, when an order is received.

use std::str::FromStr;

use alloy_primitives::{Address, B256, U256};
use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::amount::{format_amount, parse_amount, total_amount};
use crate::error::{PaymentError, Result};

/// Identifier of a payment order (16 bits, as issued by the backend).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub u16);

impl OrderId {
    /// A random id.
    pub fn random() -> Self {
        Self(rand::random::<u16>())
    }
}

/// Wire form of a payment: `(quoteHash, rewardsAddress, amountHex)`.
pub type WirePayment = (String, String, String);

/// One quote to pay for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotePayment {
    pub quote_hash: B256,
    pub rewards_address: Address,
    pub amount: U256,
}

impl QuotePayment {
    pub fn new(quote_hash: B256, rewards_address: Address, amount: U256) -> Self {
        Self {
            quote_hash,
            rewards_address,
            amount,
        }
    }

    pub fn from_wire(wire: &WirePayment) -> Result<Self> {
        let (hash, address, amount) = wire;
        Ok(Self {
            quote_hash: B256::from_str(hash).map_err(|_| PaymentError::invalid("quote hash", hash))?,
            rewards_address: Address::from_str(address)
                .map_err(|_| PaymentError::invalid("rewards address", address))?,
            amount: parse_amount(amount)?,
        })
    }

    pub fn to_wire(&self) -> WirePayment {
        (
            self.quote_hash.to_string(),
            self.rewards_address.to_string(),
            format_amount(self.amount),
        )
    }
}

/// Sum of all payment amounts.
pub fn payments_total(payments: &[QuotePayment]) -> Result<U256> {
    total_amount(payments.iter().map(|p| p.amount))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireOrder {
    id: u16,
    payments: Vec<WirePayment>,
}

/// A set of quotes the backend asks the user to pay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WireOrder", into = "WireOrder")]
pub struct PaymentOrder {
    pub id: OrderId,
    pub payments: Vec<QuotePayment>,
}

impl PaymentOrder {
    pub fn new(id: OrderId, payments: Vec<QuotePayment>) -> Self {
        Self { id, payments }
    }

    pub fn total_amount(&self) -> Result<U256> {
        payments_total(&self.payments)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl TryFrom<WireOrder> for PaymentOrder {
    type Error = PaymentError;

    fn try_from(wire: WireOrder) -> Result<Self> {
        let payments = wire
            .payments
            .iter()
            .map(QuotePayment::from_wire)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(OrderId(wire.id), payments))
    }
}

impl From<PaymentOrder> for WireOrder {
    fn from(order: PaymentOrder) -> Self {
        Self {
            id: order.id.0,
            payments: order.payments.iter().map(QuotePayment::to_wire).collect(),
        }
    }
}
