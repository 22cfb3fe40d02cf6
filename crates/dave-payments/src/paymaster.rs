//! Sponsored settlement through a smart account and a token paymaster
//!
//! Gas is fronted by the paymaster and reimbursed in the payment token, so
//! the smart account must hold the payment total plus the gas cost of every
//! batch. A shortfall is covered by one funding operation (permit +
//! transferFrom + paymaster approval) whose own gas is added to the amount
//! transferred.

use std::sync::Arc;

use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;
use dave_core::WalletSigner;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, error, info, instrument};

use crate::amount::{add, total_amount};
use crate::batch::batches;
use crate::chain::{confirm, ChainClient, ContractCall, ContractRead, SmartAccount};
use crate::config::PaymentConfig;
use crate::error::Result;
use crate::permit::sign_permit;
use crate::quote::{payments_total, QuotePayment};
use crate::settle::QuoteSettler;

/// Progress of a sponsored payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum PaymasterFlowStep {
    #[default]
    Idle,
    CheckingSmartAccount,
    CostEstimation,
    FundingSmartAccount,
    ExecutingPayments,
    Completed,
    Error,
}

/// Token-denominated cost breakdown of a sponsored payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymasterCostEstimate {
    pub total_payment_amount: U256,
    pub payment_batch_count: usize,
    pub estimated_payment_gas_cost: U256,
    pub estimated_funding_gas_cost: U256,
    pub total_gas_cost: U256,
    pub required_in_smart_account: U256,
    pub current_smart_account_balance: U256,
    pub funding_required: bool,
    /// Amount to move from the owner into the smart account
    pub funding_amount: U256,
}

/// Pays quotes through a paymaster-sponsored smart account.
pub struct PaymasterPayer {
    chain: Arc<dyn ChainClient>,
    account: Arc<dyn SmartAccount>,
    signer: Arc<dyn WalletSigner>,
    config: PaymentConfig,
    step: watch::Sender<PaymasterFlowStep>,
}

impl PaymasterPayer {
    pub fn new(
        chain: Arc<dyn ChainClient>,
        account: Arc<dyn SmartAccount>,
        signer: Arc<dyn WalletSigner>,
        config: PaymentConfig,
    ) -> Self {
        let (step, _rx) = watch::channel(PaymasterFlowStep::Idle);
        Self {
            chain,
            account,
            signer,
            config,
            step,
        }
    }

    pub fn smart_account_address(&self) -> Address {
        self.account.address()
    }

    /// Reactive view of the flow step.
    pub fn subscribe_steps(&self) -> watch::Receiver<PaymasterFlowStep> {
        self.step.subscribe()
    }

    pub fn current_step(&self) -> PaymasterFlowStep {
        *self.step.borrow()
    }

    fn set_step(&self, step: PaymasterFlowStep) {
        debug!(?step, "paymaster flow step");
        self.step.send_replace(step);
    }

    /// Compute what the smart account needs and whether it must be funded.
    ///
    /// Funding gas is estimated with a permit signed for the bare shortfall;
    /// the final funding amount is shortfall plus that gas.
    #[instrument(skip_all, fields(payments = payments.len()))]
    pub async fn estimate_costs(&self, payments: &[QuotePayment]) -> Result<PaymasterCostEstimate> {
        self.set_step(PaymasterFlowStep::CheckingSmartAccount);
        let smart_account = self.account.address();
        let balance = self
            .chain
            .read_contract(ContractRead::BalanceOf {
                token: self.config.token,
                account: smart_account,
            })
            .await?;

        self.set_step(PaymasterFlowStep::CostEstimation);
        let total = payments_total(payments)?;
        let chunks = batches(payments, self.config.max_payments_per_transaction);
        let gas_price = self.chain.gas_price().await?;

        let mut per_batch = Vec::with_capacity(chunks.len());
        for batch in &chunks {
            let calls = self.batch_calls(batch, self.config.paymaster_approval_placeholder)?;
            per_batch.push(self.token_cost(&calls, gas_price).await?);
        }
        let payment_gas = total_amount(per_batch)?;
        let required = add(total, payment_gas)?;

        let funding_required = balance < required;
        let (funding_gas, funding_amount) = if funding_required {
            let shortfall = required - balance;
            let calls = self
                .funding_calls(shortfall, self.config.paymaster_approval_placeholder)
                .await?;
            let funding_gas = self.token_cost(&calls, gas_price).await?;
            (funding_gas, add(shortfall, funding_gas)?)
        } else {
            (U256::ZERO, U256::ZERO)
        };

        let estimate = PaymasterCostEstimate {
            total_payment_amount: total,
            payment_batch_count: chunks.len(),
            estimated_payment_gas_cost: payment_gas,
            estimated_funding_gas_cost: funding_gas,
            total_gas_cost: add(payment_gas, funding_gas)?,
            required_in_smart_account: required,
            current_smart_account_balance: balance,
            funding_required,
            funding_amount,
        };
        debug!(?estimate, "paymaster cost estimate");
        Ok(estimate)
    }

    /// Settle all payments; one transaction hash per batch.
    pub async fn pay_for_quotes(&self, payments: &[QuotePayment]) -> Result<Vec<B256>> {
        match self.run(payments).await {
            Ok(hashes) => {
                self.set_step(PaymasterFlowStep::Completed);
                Ok(hashes)
            }
            Err(e) => {
                error!(error = %e, "sponsored payment failed");
                self.set_step(PaymasterFlowStep::Error);
                Err(e)
            }
        }
    }

    async fn run(&self, payments: &[QuotePayment]) -> Result<Vec<B256>> {
        let estimate = self.estimate_costs(payments).await?;

        if estimate.funding_required {
            self.set_step(PaymasterFlowStep::FundingSmartAccount);
            self.fund(&estimate).await?;
        }

        self.set_step(PaymasterFlowStep::ExecutingPayments);
        let chunks = batches(payments, self.config.max_payments_per_transaction);
        let mut hashes = Vec::with_capacity(chunks.len());
        for (index, batch) in chunks.into_iter().enumerate() {
            if index > 0 && !self.config.inter_batch_delay.is_zero() {
                tokio::time::sleep(self.config.inter_batch_delay).await;
            }

            let gas_price = self.chain.gas_price().await?;
            let mut calls = self.batch_calls(batch, self.config.paymaster_approval_placeholder)?;
            let gas_cost = self.token_cost(&calls, gas_price).await?;
            patch_paymaster_approval(&mut calls, self.config.paymaster, gas_cost);

            let hash = self.account.send_user_operation(calls).await?;
            confirm(self.chain.as_ref(), hash).await?;
            info!(batch = index, size = batch.len(), %gas_cost, %hash, "sponsored batch paid");
            hashes.push(hash);
        }

        Ok(hashes)
    }

    async fn fund(&self, estimate: &PaymasterCostEstimate) -> Result<()> {
        let calls = self
            .funding_calls(estimate.funding_amount, estimate.estimated_funding_gas_cost)
            .await?;
        let hash = self.account.send_user_operation(calls).await?;
        confirm(self.chain.as_ref(), hash).await?;
        info!(amount = %estimate.funding_amount, %hash, "smart account funded");

        if !self.config.funding_settle_delay.is_zero() {
            tokio::time::sleep(self.config.funding_settle_delay).await;
        }
        Ok(())
    }

    /// `approve(vault) + payForQuotes + approve(paymaster)` for one batch.
    fn batch_calls(&self, batch: &[QuotePayment], paymaster_amount: U256) -> Result<Vec<ContractCall>> {
        Ok(vec![
            ContractCall::Approve {
                token: self.config.token,
                spender: self.config.payment_vault,
                amount: payments_total(batch)?,
            },
            ContractCall::PayForQuotes {
                vault: self.config.payment_vault,
                payments: batch.to_vec(),
            },
            ContractCall::Approve {
                token: self.config.token,
                spender: self.config.paymaster,
                amount: paymaster_amount,
            },
        ])
    }

    /// `permit + transferFrom(owner -> smart account) + approve(paymaster)`.
    async fn funding_calls(&self, value: U256, paymaster_amount: U256) -> Result<Vec<ContractCall>> {
        let owner = self.signer.address();
        let smart_account = self.account.address();
        let signature = sign_permit(
            self.signer.as_ref(),
            self.config.token,
            smart_account,
            value,
            self.config.permit_validity,
        )
        .await?;

        Ok(vec![
            ContractCall::Permit {
                token: self.config.token,
                owner,
                spender: smart_account,
                value,
                signature,
            },
            ContractCall::TransferFrom {
                token: self.config.token,
                from: owner,
                to: smart_account,
                amount: value,
            },
            ContractCall::Approve {
                token: self.config.token,
                spender: self.config.paymaster,
                amount: paymaster_amount,
            },
        ])
    }

    /// Gas of a user operation, priced in the payment token.
    async fn token_cost(&self, calls: &[ContractCall], gas_price: U256) -> Result<U256> {
        let gas = self.account.estimate_user_operation_gas(calls).await?;
        let cost = self
            .chain
            .read_contract(ContractRead::GasCostInToken {
                paymaster: self.config.paymaster,
                gas,
                gas_price,
            })
            .await?;
        Ok(cost)
    }
}

/// Set the amount of the paymaster approval in `calls`.
fn patch_paymaster_approval(calls: &mut [ContractCall], paymaster: Address, amount: U256) {
    for call in calls.iter_mut() {
        if let ContractCall::Approve {
            spender, amount: approved, ..
        } = call
            && *spender == paymaster
        {
            *approved = amount;
        }
    }
}

#[async_trait]
impl QuoteSettler for PaymasterPayer {
    async fn settle(&self, payments: &[QuotePayment]) -> Result<Vec<B256>> {
        self.pay_for_quotes(payments).await
    }
}
