//! Chain and smart-account contracts
//!
//! The orchestrator never encodes calldata itself. It describes the calls it
//! needs as [`ContractCall`]s and hands them to a [`ChainClient`] (the
//! user's own account) or a [`SmartAccount`] (sponsored user operations).

use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;
use dave_core::PermitSignature;

use crate::error::ChainError;
use crate::quote::QuotePayment;

/// Result of a chain collaborator call
pub type ChainResult<T> = std::result::Result<T, ChainError>;

/// Mined transaction outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxReceipt {
    pub hash: B256,
    pub success: bool,
}

/// Read-only contract queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractRead {
    /// `token.allowance(owner, spender)`
    Allowance {
        token: Address,
        owner: Address,
        spender: Address,
    },
    /// `token.balanceOf(account)`
    BalanceOf { token: Address, account: Address },
    /// Paymaster oracle: cost of `gas` units at `gas_price`, in the token
    GasCostInToken {
        paymaster: Address,
        gas: U256,
        gas_price: U256,
    },
}

/// State-changing contract calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractCall {
    Approve {
        token: Address,
        spender: Address,
        amount: U256,
    },
    PayForQuotes {
        vault: Address,
        payments: Vec<QuotePayment>,
    },
    Permit {
        token: Address,
        owner: Address,
        spender: Address,
        value: U256,
        signature: PermitSignature,
    },
    TransferFrom {
        token: Address,
        from: Address,
        to: Address,
        amount: U256,
    },
}

/// Access to the chain through the user's own (nonce-owning) account.
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn read_contract(&self, read: ContractRead) -> ChainResult<U256>;

    /// Submit a transaction; returns its hash without waiting.
    async fn write_contract(&self, call: ContractCall) -> ChainResult<B256>;

    async fn wait_for_receipt(&self, hash: B256) -> ChainResult<TxReceipt>;

    /// Current gas price in wei.
    async fn gas_price(&self) -> ChainResult<U256>;
}

/// A counterfactual smart account whose gas is fronted by a paymaster.
#[async_trait]
pub trait SmartAccount: Send + Sync {
    /// Deterministic address derived from the owner.
    fn address(&self) -> Address;

    /// Gas units the user operation would consume.
    async fn estimate_user_operation_gas(&self, calls: &[ContractCall]) -> ChainResult<U256>;

    /// Submit one user operation; returns the transaction hash.
    async fn send_user_operation(&self, calls: Vec<ContractCall>) -> ChainResult<B256>;
}

/// Wait for `hash` and turn a revert into an error.
pub async fn confirm(chain: &dyn ChainClient, hash: B256) -> ChainResult<TxReceipt> {
    let receipt = chain.wait_for_receipt(hash).await?;
    if !receipt.success {
        return Err(ChainError::Reverted { hash });
    }
    Ok(receipt)
}
