//! Derived progress percentage

/// `round(processed / total * 100)`, or `None` unless both are known.
///
/// Integer arithmetic only; a zero total yields `None` and the result is
/// capped at 100.
pub fn percent(processed: Option<u64>, total: Option<u64>) -> Option<u8> {
    let (processed, total) = (processed?, total?);
    if total == 0 {
        return None;
    }
    let (processed, total) = (u128::from(processed), u128::from(total));
    let rounded = (processed * 100 + total / 2) / total;
    Some(rounded.min(100) as u8)
}
