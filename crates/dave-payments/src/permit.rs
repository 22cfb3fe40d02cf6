//! EIP-2612 permits

use std::time::Duration;

use alloy_primitives::{Address, U256};
use chrono::Utc;
use dave_core::{PermitRequest, PermitSignature, WalletSigner};
use tracing::debug;

use crate::error::Result;

/// Unix deadline `validity` from now.
pub fn deadline_after(validity: Duration) -> u64 {
    let now = Utc::now().timestamp().max(0) as u64;
    now.saturating_add(validity.as_secs())
}

/// Ask the wallet to sign a permit letting `spender` move `value` tokens.
pub async fn sign_permit(
    signer: &dyn WalletSigner,
    token: Address,
    spender: Address,
    value: U256,
    validity: Duration,
) -> Result<PermitSignature> {
    let request = PermitRequest {
        token,
        owner: signer.address(),
        spender,
        value,
        deadline: deadline_after(validity),
    };
    debug!(%spender, %value, deadline = request.deadline, "requesting permit signature");
    Ok(signer.sign_permit(request).await?)
}
