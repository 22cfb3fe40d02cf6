//! Session-unique identifiers
//!
//! Identifiers are the current time in milliseconds plus a short random
//! base36 suffix, optionally behind a prefix: `local_1718000000000_k3j9x0a`.

use chrono::Utc;
use rand::Rng;

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Random base36 string of `len` characters.
pub fn random_base36(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| BASE36[rng.random_range(0..BASE36.len())] as char)
        .collect()
}

/// `<prefix>_<millis>_<suffix>`, or `<millis><suffix>` with an empty prefix.
pub fn timestamped_id(prefix: &str, suffix_len: usize) -> String {
    let millis = Utc::now().timestamp_millis();
    let suffix = random_base36(suffix_len);
    if prefix.is_empty() {
        format!("{millis}{suffix}")
    } else {
        format!("{prefix}_{millis}_{suffix}")
    }
}
