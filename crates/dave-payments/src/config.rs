//! Payment configuration

use std::time::Duration;

use alloy_primitives::{address, Address, U256};

use crate::batch::MAX_PAYMENTS_PER_TRANSACTION;

/// Paymaster deployed on Arbitrum One.
pub const ARBITRUM_ONE_PAYMASTER: Address = address!("0x95bf2207288ca0e7fE421F8303D355AF1ca41EF4");

/// Addresses and timings used by the settlement flows and order store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentConfig {
    /// ERC-20 payment token
    pub token: Address,
    /// Contract that receives quote payments
    pub payment_vault: Address,
    /// Paymaster reimbursed in the payment token
    pub paymaster: Address,
    pub max_payments_per_transaction: usize,
    /// Idle window before a pending order expires
    pub idle_expiration: Duration,
    /// Wait after funding the smart account
    pub funding_settle_delay: Duration,
    /// Wait between sponsored batches
    pub inter_batch_delay: Duration,
    /// Lifetime of a signed permit
    pub permit_validity: Duration,
    /// Paymaster allowance used in dummy calls during estimation
    pub paymaster_approval_placeholder: U256,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            token: Address::ZERO,
            payment_vault: Address::ZERO,
            paymaster: Address::ZERO,
            max_payments_per_transaction: MAX_PAYMENTS_PER_TRANSACTION,
            idle_expiration: Duration::from_secs(600),
            funding_settle_delay: Duration::from_secs(5),
            inter_batch_delay: Duration::from_secs(1),
            permit_validity: Duration::from_secs(3600),
            paymaster_approval_placeholder: U256::from(1_000_000_000_000_000_000u128),
        }
    }
}

impl PaymentConfig {
    /// Production settings on Arbitrum One.
    pub fn arbitrum_one(token: Address, payment_vault: Address) -> Self {
        Self {
            token,
            payment_vault,
            paymaster: ARBITRUM_ONE_PAYMASTER,
            ..Default::default()
        }
    }

    /// Settings for tests: no delays.
    pub fn instant(token: Address, payment_vault: Address, paymaster: Address) -> Self {
        Self {
            token,
            payment_vault,
            paymaster,
            funding_settle_delay: Duration::ZERO,
            inter_batch_delay: Duration::ZERO,
            ..Default::default()
        }
    }

    pub fn with_max_payments_per_transaction(mut self, max: usize) -> Self {
        self.max_payments_per_transaction = max;
        self
    }

    pub fn with_idle_expiration(mut self, idle: Duration) -> Self {
        self.idle_expiration = idle;
        self
    }

    /// Validate the configuration and return any warnings
    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.token == Address::ZERO {
            warnings.push(ConfigWarning::MissingToken);
        }
        if self.payment_vault == Address::ZERO {
            warnings.push(ConfigWarning::MissingPaymentVault);
        }
        if self.paymaster == Address::ZERO {
            warnings.push(ConfigWarning::MissingPaymaster);
        }
        if self.max_payments_per_transaction == 0
            || self.max_payments_per_transaction > MAX_PAYMENTS_PER_TRANSACTION
        {
            warnings.push(ConfigWarning::BatchSizeOutOfRange);
        }
        if self.permit_validity < Duration::from_secs(60) {
            warnings.push(ConfigWarning::PermitValidityTooShort);
        }

        warnings
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}

/// Configuration warnings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigWarning {
    MissingToken,
    MissingPaymentVault,
    /// Only the sponsored flow needs a paymaster
    MissingPaymaster,
    /// Batch size is 0 or above the contract limit
    BatchSizeOutOfRange,
    /// Permits may expire before the funding call lands (< 60s)
    PermitValidityTooShort,
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigWarning::MissingToken => write!(f, "token address is zero"),
            ConfigWarning::MissingPaymentVault => write!(f, "payment_vault address is zero"),
            ConfigWarning::MissingPaymaster => write!(f, "paymaster address is zero"),
            ConfigWarning::BatchSizeOutOfRange => {
                write!(f, "max_payments_per_transaction must be within 1..=256")
            }
            ConfigWarning::PermitValidityTooShort => {
                write!(f, "permit_validity is very short (< 60s)")
            }
        }
    }
}
