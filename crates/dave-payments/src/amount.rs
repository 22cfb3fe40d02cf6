//! Token amounts
//!
//! Amounts travel as hex strings and are parsed exactly once into [`U256`].
//! All arithmetic is checked; nothing passes through floating point.

use alloy_primitives::U256;

use crate::error::{PaymentError, Result};

/// Parse a hex amount, with or without a `0x` prefix.
pub fn parse_amount(hex: &str) -> Result<U256> {
    let digits = hex
        .strip_prefix("0x")
        .or_else(|| hex.strip_prefix("0X"))
        .unwrap_or(hex);
    if digits.is_empty() {
        return Err(PaymentError::invalid("amount", hex));
    }
    U256::from_str_radix(digits, 16).map_err(|_| PaymentError::invalid("amount", hex))
}

/// Wire representation of an amount.
pub fn format_amount(amount: U256) -> String {
    format!("0x{amount:x}")
}

/// Checked sum.
pub fn total_amount<I>(amounts: I) -> Result<U256>
where
    I: IntoIterator<Item = U256>,
{
    amounts
        .into_iter()
        .try_fold(U256::ZERO, |total, amount| total.checked_add(amount))
        .ok_or(PaymentError::Overflow)
}

/// Checked addition.
pub fn add(a: U256, b: U256) -> Result<U256> {
    a.checked_add(b).ok_or(PaymentError::Overflow)
}
