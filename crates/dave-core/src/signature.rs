//! Vault key signature cache
//!
//! The vault is unlocked with the wallet's signature over a fixed seed
//! message. The signature is requested once and reused until the wallet
//! disconnects.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, instrument};

use crate::error::Result;
use crate::traits::WalletSigner;

/// Message signed to derive the vault key.
pub const VAULT_KEY_SEED: &str = "Massive Array of Internet Disks Secure Access For Everyone";

/// Process-lifetime cache of the vault key signature.
pub struct SignatureCache {
    signer: Arc<dyn WalletSigner>,
    cached: Mutex<Option<String>>,
}

impl SignatureCache {
    pub fn new(signer: Arc<dyn WalletSigner>) -> Self {
        Self {
            signer,
            cached: Mutex::new(None),
        }
    }

    pub fn signer(&self) -> &Arc<dyn WalletSigner> {
        &self.signer
    }

    /// Return the cached signature, asking the wallet on first use.
    ///
    /// Concurrent callers wait for the first request instead of prompting
    /// the user twice.
    #[instrument(skip(self))]
    pub async fn vault_key_signature(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;
        if let Some(signature) = cached.as_ref() {
            return Ok(signature.clone());
        }
        debug!("requesting vault key signature");
        let signature = self.signer.sign_message(VAULT_KEY_SEED.as_bytes()).await?;
        *cached = Some(signature.clone());
        Ok(signature)
    }

    /// Forget the signature (wallet disconnected).
    pub async fn disconnect(&self) {
        self.cached.lock().await.take();
    }

    pub async fn is_cached(&self) -> bool {
        self.cached.lock().await.is_some()
    }
}
