//! Settlement strategy seam

use alloy_primitives::B256;
use async_trait::async_trait;

use crate::error::Result;
use crate::quote::QuotePayment;

/// Turns quote payments into confirmed on-chain settlement.
///
/// Implementations return one transaction hash per batch, in batch order.
#[async_trait]
pub trait QuoteSettler: Send + Sync {
    async fn settle(&self, payments: &[QuotePayment]) -> Result<Vec<B256>>;
}
