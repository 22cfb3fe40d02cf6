//! Error types for payment orchestration

use alloy_primitives::B256;
use dave_core::CoreError;
use thiserror::Error;

use crate::quote::OrderId;

/// Failures reported by chain and smart-account collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    /// Transport or node failure
    #[error("RPC error: {0}")]
    Rpc(String),

    /// The transaction was mined but reverted
    #[error("Transaction reverted: {hash}")]
    Reverted { hash: B256 },

    /// Gas estimation failed
    #[error("Gas estimation failed: {0}")]
    Estimation(String),
}

impl ChainError {
    pub fn rpc(msg: impl Into<String>) -> Self {
        Self::Rpc(msg.into())
    }

    pub fn estimation(msg: impl Into<String>) -> Self {
        Self::Estimation(msg.into())
    }
}

/// Errors from settling quotes and managing orders.
#[derive(Debug, Error)]
pub enum PaymentError {
    #[error(transparent)]
    Chain(#[from] ChainError),

    /// Wallet or signing failure
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A wire amount/hash/address could not be parsed
    #[error("Invalid {field}: {value}")]
    InvalidWire { field: &'static str, value: String },

    /// Amount arithmetic exceeded 256 bits
    #[error("Amount overflow")]
    Overflow,

    /// No order with this id is tracked
    #[error("Unknown order: {0}")]
    UnknownOrder(OrderId),

    /// The order can no longer be cancelled
    #[error("Order {0} is already being processed")]
    NotCancellable(OrderId),

    /// The order was cancelled by the user
    #[error("Order {0} cancelled")]
    Cancelled(OrderId),

    /// The confirmation channel closed without an outcome
    #[error("Order {0} confirmation channel closed")]
    ChannelClosed(OrderId),

    /// No KeepAlive arrived within the idle window
    #[error("Order {0} timed out waiting for confirmation")]
    IdleTimeout(OrderId),

    /// No free order id was found
    #[error("No free order id after {attempts} attempts")]
    OrderIdsExhausted { attempts: usize },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PaymentError {
    pub fn invalid(field: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidWire {
            field,
            value: value.into(),
        }
    }
}

/// Result type alias for payment operations
pub type Result<T> = std::result::Result<T, PaymentError>;
