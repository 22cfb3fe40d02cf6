//! Direct settlement
//!
//! The user's own account approves the vault once for the full total, then
//! pays batch by batch, waiting for each receipt before the next submission.

use std::sync::Arc;

use alloy_primitives::{Address, B256};
use async_trait::async_trait;
use tracing::{info, instrument};

use crate::batch::batches;
use crate::chain::{confirm, ChainClient, ContractCall, ContractRead};
use crate::config::PaymentConfig;
use crate::error::Result;
use crate::quote::{payments_total, QuotePayment};
use crate::settle::QuoteSettler;

/// Pays quotes from the user's account.
pub struct DirectPayer {
    chain: Arc<dyn ChainClient>,
    owner: Address,
    config: PaymentConfig,
}

impl DirectPayer {
    pub fn new(chain: Arc<dyn ChainClient>, owner: Address, config: PaymentConfig) -> Self {
        Self {
            chain,
            owner,
            config,
        }
    }

    /// Settle all payments; one transaction hash per batch.
    #[instrument(skip_all, fields(payments = payments.len()))]
    pub async fn pay_for_quotes(&self, payments: &[QuotePayment]) -> Result<Vec<B256>> {
        let total = payments_total(payments)?;

        let allowance = self
            .chain
            .read_contract(ContractRead::Allowance {
                token: self.config.token,
                owner: self.owner,
                spender: self.config.payment_vault,
            })
            .await?;

        if allowance < total {
            info!(%allowance, %total, "approving payment vault");
            let hash = self
                .chain
                .write_contract(ContractCall::Approve {
                    token: self.config.token,
                    spender: self.config.payment_vault,
                    amount: total,
                })
                .await?;
            confirm(self.chain.as_ref(), hash).await?;
        }

        let chunks = batches(payments, self.config.max_payments_per_transaction);
        let mut hashes = Vec::with_capacity(chunks.len());
        for (index, batch) in chunks.into_iter().enumerate() {
            let hash = self
                .chain
                .write_contract(ContractCall::PayForQuotes {
                    vault: self.config.payment_vault,
                    payments: batch.to_vec(),
                })
                .await?;
            confirm(self.chain.as_ref(), hash).await?;
            info!(batch = index, size = batch.len(), %hash, "batch paid");
            hashes.push(hash);
        }

        Ok(hashes)
    }
}

#[async_trait]
impl QuoteSettler for DirectPayer {
    async fn settle(&self, payments: &[QuotePayment]) -> Result<Vec<B256>> {
        self.pay_for_quotes(payments).await
    }
}
