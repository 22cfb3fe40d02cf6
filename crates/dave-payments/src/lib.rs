//! # Dave Payments
//!
//! Settles storage quotes on-chain.
//!
//! Quotes arrive from the backend as a [`PaymentOrder`]. The UI tracks them in
//! a [`PaymentStore`] and pays through a [`QuoteSettler`]: either
//! [`DirectPayer`] (the user's account pays and owns the nonce) or
//! [`PaymasterPayer`] (a smart account pays, gas is reimbursed in the
//! payment token). Payments are split into batches of at most
//! [`MAX_PAYMENTS_PER_TRANSACTION`] and submitted one batch at a time.
//!
//! ## Modules
//!
//! - [`amount`]: Exact token amount parsing and arithmetic
//! - [`quote`]: Quote payments, order ids, and orders
//! - [`batch`]: Batching
//! - [`chain`]: Chain client and smart account contracts
//! - [`permit`]: Permit signing
//! - [`direct`]: Direct settlement
//! - [`paymaster`]: Sponsored settlement and cost estimation
//! - [`orders`]: Pending orders and the `pay` entry point
//! - [`backend`]: Order creation and confirmation on the backend side
//! - [`config`]: Addresses and timings

pub mod amount;
pub mod backend;
pub mod batch;
pub mod chain;
pub mod config;
pub mod direct;
pub mod error;
pub mod orders;
pub mod paymaster;
pub mod permit;
pub mod quote;
pub mod settle;

pub use amount::{format_amount, parse_amount, total_amount};
pub use backend::{OrderManager, OrderMessage, OrderNotifier, IDLE_PAYMENT_TIMEOUT};
pub use batch::{batch_totals, batches, MAX_PAYMENTS_PER_TRANSACTION};
pub use chain::{ChainClient, ChainResult, ContractCall, ContractRead, SmartAccount, TxReceipt};
pub use config::{ConfigWarning, PaymentConfig, ARBITRUM_ONE_PAYMASTER};
pub use direct::DirectPayer;
pub use error::{ChainError, PaymentError, Result};
pub use orders::{format_remaining, PayOutcome, PaymentStore, PendingPayment, ProcessingState};
pub use paymaster::{PaymasterCostEstimate, PaymasterFlowStep, PaymasterPayer};
pub use quote::{payments_total, OrderId, PaymentOrder, QuotePayment, WirePayment};
pub use settle::QuoteSettler;
