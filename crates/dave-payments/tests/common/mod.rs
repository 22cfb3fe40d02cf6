//! Chain, wallet, and backend fakes shared by the payment tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use dave_core::{Address, B256, CoreError, PermitRequest, PermitSignature, U256, WalletSigner};
use dave_payments::{
    ChainClient, ChainError, ChainResult, ContractCall, ContractRead, OrderId, OrderMessage,
    OrderNotifier, PaymentConfig, PaymentError, QuotePayment, QuoteSettler, SmartAccount, TxReceipt,
};
use tokio::sync::Notify;

pub const OWNER: Address = Address::repeat_byte(0x11);
pub const TOKEN: Address = Address::repeat_byte(0x7a);
pub const VAULT: Address = Address::repeat_byte(0x7b);
pub const PAYMASTER: Address = Address::repeat_byte(0x7c);
pub const SMART_ACCOUNT: Address = Address::repeat_byte(0x5a);

pub fn config() -> PaymentConfig {
    PaymentConfig::instant(TOKEN, VAULT, PAYMASTER)
}

pub fn payments(amounts: &[u64]) -> Vec<QuotePayment> {
    amounts
        .iter()
        .enumerate()
        .map(|(i, amount)| {
            QuotePayment::new(
                B256::left_padding_from(&(i as u64).to_be_bytes()),
                Address::with_last_byte((i % 256) as u8),
                U256::from(*amount),
            )
        })
        .collect()
}

/// Chain that records every write and tracks unconfirmed submissions.
///
/// Gas price is 1 and the token oracle prices one unit of gas at one token
/// unit, so token costs equal the gas estimates of [`FakeSmartAccount`].
pub struct FakeChain {
    pub allowance: U256,
    pub balance: U256,
    pub writes: Mutex<Vec<ContractCall>>,
    pub reverted: Mutex<HashSet<B256>>,
    /// Revert the write with this (1-based) sequence number
    pub revert_write: Option<usize>,
    next_hash: AtomicUsize,
    unconfirmed: AtomicUsize,
    pub max_unconfirmed: AtomicUsize,
}

impl FakeChain {
    pub fn new(allowance: u64, balance: u64) -> Arc<Self> {
        Arc::new(Self::build(allowance, balance, None))
    }

    pub fn reverting(allowance: u64, write: usize) -> Arc<Self> {
        Arc::new(Self::build(allowance, 0, Some(write)))
    }

    fn build(allowance: u64, balance: u64, revert_write: Option<usize>) -> Self {
        Self {
            allowance: U256::from(allowance),
            balance: U256::from(balance),
            writes: Mutex::new(Vec::new()),
            reverted: Mutex::new(HashSet::new()),
            revert_write,
            next_hash: AtomicUsize::new(0),
            unconfirmed: AtomicUsize::new(0),
            max_unconfirmed: AtomicUsize::new(0),
        }
    }

    pub fn writes(&self) -> Vec<ContractCall> {
        self.writes.lock().unwrap().clone()
    }

    /// Mint a hash for a submission and count it as unconfirmed.
    pub fn submit(&self) -> B256 {
        let seq = self.next_hash.fetch_add(1, Ordering::SeqCst) + 1;
        let hash = B256::left_padding_from(&(seq as u64).to_be_bytes());
        if self.revert_write == Some(seq) {
            self.reverted.lock().unwrap().insert(hash);
        }
        let unconfirmed = self.unconfirmed.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_unconfirmed.fetch_max(unconfirmed, Ordering::SeqCst);
        hash
    }
}

#[async_trait]
impl ChainClient for FakeChain {
    async fn read_contract(&self, read: ContractRead) -> ChainResult<U256> {
        match read {
            ContractRead::Allowance { .. } => Ok(self.allowance),
            ContractRead::BalanceOf { .. } => Ok(self.balance),
            ContractRead::GasCostInToken { gas, gas_price, .. } => gas
                .checked_mul(gas_price)
                .ok_or_else(|| ChainError::rpc("oracle overflow")),
        }
    }

    async fn write_contract(&self, call: ContractCall) -> ChainResult<B256> {
        self.writes.lock().unwrap().push(call);
        Ok(self.submit())
    }

    async fn wait_for_receipt(&self, hash: B256) -> ChainResult<TxReceipt> {
        tokio::task::yield_now().await;
        self.unconfirmed.fetch_sub(1, Ordering::SeqCst);
        let success = !self.reverted.lock().unwrap().contains(&hash);
        Ok(TxReceipt { hash, success })
    }

    async fn gas_price(&self) -> ChainResult<U256> {
        Ok(U256::from(1))
    }
}

/// Smart account whose gas estimate depends only on the kind of operation.
pub struct FakeSmartAccount {
    pub chain: Arc<FakeChain>,
    pub payment_gas: U256,
    pub funding_gas: U256,
    pub operations: Mutex<Vec<Vec<ContractCall>>>,
}

impl FakeSmartAccount {
    pub fn new(chain: Arc<FakeChain>, payment_gas: u64, funding_gas: u64) -> Arc<Self> {
        Arc::new(Self {
            chain,
            payment_gas: U256::from(payment_gas),
            funding_gas: U256::from(funding_gas),
            operations: Mutex::new(Vec::new()),
        })
    }

    pub fn operations(&self) -> Vec<Vec<ContractCall>> {
        self.operations.lock().unwrap().clone()
    }
}

#[async_trait]
impl SmartAccount for FakeSmartAccount {
    fn address(&self) -> Address {
        SMART_ACCOUNT
    }

    async fn estimate_user_operation_gas(&self, calls: &[ContractCall]) -> ChainResult<U256> {
        if calls.iter().any(|c| matches!(c, ContractCall::PayForQuotes { .. })) {
            Ok(self.payment_gas)
        } else if calls.iter().any(|c| matches!(c, ContractCall::Permit { .. })) {
            Ok(self.funding_gas)
        } else {
            Err(ChainError::estimation("unexpected user operation"))
        }
    }

    async fn send_user_operation(&self, calls: Vec<ContractCall>) -> ChainResult<B256> {
        self.operations.lock().unwrap().push(calls);
        Ok(self.chain.submit())
    }
}

/// Wallet that signs every permit it is asked for and remembers the values.
pub struct PermitWallet {
    pub permits: Mutex<Vec<PermitRequest>>,
    pub reject: bool,
}

impl PermitWallet {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            permits: Mutex::new(Vec::new()),
            reject: false,
        })
    }

    pub fn rejecting() -> Arc<Self> {
        Arc::new(Self {
            permits: Mutex::new(Vec::new()),
            reject: true,
        })
    }
}

#[async_trait]
impl WalletSigner for PermitWallet {
    fn address(&self) -> Address {
        OWNER
    }

    async fn sign_message(&self, _message: &[u8]) -> dave_core::Result<String> {
        Ok("0xsig".to_string())
    }

    async fn sign_permit(&self, request: PermitRequest) -> dave_core::Result<PermitSignature> {
        if self.reject {
            return Err(CoreError::SignatureRejected);
        }
        let deadline = request.deadline;
        self.permits.lock().unwrap().push(request);
        Ok(PermitSignature {
            v: 27,
            r: B256::repeat_byte(0x01),
            s: B256::repeat_byte(0x02),
            deadline,
        })
    }
}

/// Settler that counts attempts and can be held at a gate.
pub struct CountingSettler {
    pub calls: AtomicUsize,
    pub gate: Option<Arc<Notify>>,
    pub fail: bool,
}

impl CountingSettler {
    pub fn ok() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            gate: None,
            fail: false,
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            gate: None,
            fail: true,
        })
    }

    pub fn gated(gate: Arc<Notify>) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            gate: Some(gate),
            fail: false,
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuoteSettler for CountingSettler {
    async fn settle(&self, payments: &[QuotePayment]) -> dave_payments::Result<Vec<B256>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if self.fail {
            return Err(ChainError::rpc("node unavailable").into());
        }
        Ok(vec![B256::with_last_byte(payments.len() as u8)])
    }
}

/// Notifier that records every message it is given.
///
/// KeepAlive can be made to fail or to wait at a gate.
#[derive(Default)]
pub struct RecordingNotifier {
    pub messages: Mutex<Vec<(OrderId, OrderMessage)>>,
    pub reject_keep_alive: bool,
    pub keep_alive_gate: Option<Arc<Notify>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn rejecting_keep_alive() -> Arc<Self> {
        Arc::new(Self {
            reject_keep_alive: true,
            ..Self::default()
        })
    }

    pub fn gated(gate: Arc<Notify>) -> Arc<Self> {
        Arc::new(Self {
            keep_alive_gate: Some(gate),
            ..Self::default()
        })
    }

    pub fn messages(&self) -> Vec<(OrderId, OrderMessage)> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl OrderNotifier for RecordingNotifier {
    async fn notify(&self, id: OrderId, message: OrderMessage) -> dave_payments::Result<()> {
        self.messages.lock().unwrap().push((id, message));
        if message == OrderMessage::KeepAlive {
            if let Some(gate) = &self.keep_alive_gate {
                gate.notified().await;
            }
            if self.reject_keep_alive {
                return Err(PaymentError::ChannelClosed(id));
            }
        }
        Ok(())
    }
}
