//! Payment batching

use alloy_primitives::U256;

use crate::error::Result;
use crate::quote::{payments_total, QuotePayment};

/// Largest number of payments the vault contract accepts in one call.
pub const MAX_PAYMENTS_PER_TRANSACTION: usize = 256;

/// Split payments into consecutive batches of at most `max` items.
///
/// Order is preserved within and across batches. A `max` of zero is treated
/// as one.
pub fn batches(payments: &[QuotePayment], max: usize) -> Vec<&[QuotePayment]> {
    payments.chunks(max.max(1)).collect()
}

/// Per-batch totals, in batch order.
pub fn batch_totals(batches: &[&[QuotePayment]]) -> Result<Vec<U256>> {
    batches.iter().map(|batch| payments_total(batch)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amount::total_amount;
    use alloy_primitives::{Address, B256};

    fn payments(n: usize) -> Vec<QuotePayment> {
        (0..n)
            .map(|i| {
                QuotePayment::new(
                    B256::with_last_byte((i % 256) as u8),
                    Address::with_last_byte((i / 256) as u8),
                    U256::from(i as u64 * 1_000_000_007),
                )
            })
            .collect()
    }

    #[test]
    fn test_300_payments_make_two_batches() {
        let all = payments(300);
        let chunks = batches(&all, MAX_PAYMENTS_PER_TRANSACTION);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].len(), 256);
        assert_eq!(chunks[1].len(), 44);

        let rejoined: Vec<QuotePayment> = chunks.iter().flat_map(|b| b.iter().cloned()).collect();
        assert_eq!(rejoined, all);
    }

    #[test]
    fn test_amount_conservation() {
        for n in [0, 1, 255, 256, 257, 513] {
            let all = payments(n);
            let chunks = batches(&all, MAX_PAYMENTS_PER_TRANSACTION);
            let per_batch = batch_totals(&chunks).unwrap();
            assert_eq!(
                total_amount(per_batch).unwrap(),
                payments_total(&all).unwrap()
            );
        }
    }

    #[test]
    fn test_empty_and_degenerate_sizes() {
        assert!(batches(&[], 256).is_empty());
        assert_eq!(batches(&payments(3), 0).len(), 3);
    }
}
