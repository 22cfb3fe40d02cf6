//! Collaborator fakes shared by the store tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use dave_core::{
    Address, ArchiveAccess, CoreError, FileMetadata, LoadToken, LocalLoader, PermitRequest,
    PermitSignature, Result, SignatureCache, StructureUpdate, TaggedUpdate, VaultLoader,
    WalletSigner,
};
use tokio::sync::{mpsc, Mutex, Notify};

/// Signer that optionally waits for a gate before answering.
pub struct FakeSigner {
    pub calls: AtomicUsize,
    pub reject: bool,
    pub gate: Option<Arc<Notify>>,
}

impl FakeSigner {
    pub fn ok() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            reject: false,
            gate: None,
        })
    }

    pub fn rejecting() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            reject: true,
            gate: None,
        })
    }

    pub fn gated(gate: Arc<Notify>) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            reject: false,
            gate: Some(gate),
        })
    }
}

#[async_trait]
impl WalletSigner for FakeSigner {
    fn address(&self) -> Address {
        Address::repeat_byte(0x11)
    }

    async fn sign_message(&self, _message: &[u8]) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if self.reject {
            return Err(CoreError::SignatureRejected);
        }
        Ok("0xvaultsig".to_string())
    }

    async fn sign_permit(&self, _request: PermitRequest) -> Result<PermitSignature> {
        Err(CoreError::SignatureRejected)
    }
}

pub fn signatures(signer: Arc<FakeSigner>) -> Arc<SignatureCache> {
    Arc::new(SignatureCache::new(signer))
}

/// Loader that replays a script of updates onto a channel, stamped with the
/// token it was called with.
pub struct ScriptedLoader {
    pub tx: mpsc::Sender<TaggedUpdate>,
    pub script: Vec<StructureUpdate>,
    pub tokens: Mutex<Vec<LoadToken>>,
    pub fail_stream: bool,
    pub single_file: Option<FileMetadata>,
    pub archive_files: Option<Vec<FileMetadata>>,
}

impl ScriptedLoader {
    pub fn new(tx: mpsc::Sender<TaggedUpdate>, script: Vec<StructureUpdate>) -> Self {
        Self {
            tx,
            script,
            tokens: Mutex::new(Vec::new()),
            fail_stream: false,
            single_file: None,
            archive_files: None,
        }
    }

    async fn replay(&self, token: &LoadToken) -> Result<()> {
        self.tokens.lock().await.push(token.clone());
        if self.fail_stream {
            return Err(CoreError::loader("network unreachable"));
        }
        for update in &self.script {
            self.tx
                .send(TaggedUpdate::new(token, update.clone()))
                .await
                .map_err(|e| CoreError::loader(e.to_string()))?;
        }
        Ok(())
    }
}

#[async_trait]
impl VaultLoader for ScriptedLoader {
    async fn stream_vault_structure(&self, signature: &str, token: &LoadToken) -> Result<()> {
        assert_eq!(signature, "0xvaultsig");
        self.replay(token).await
    }

    async fn load_single_file(&self, _signature: &str, path: &str) -> Result<FileMetadata> {
        self.single_file
            .clone()
            .ok_or_else(|| CoreError::file_not_found(path))
    }
}

#[async_trait]
impl LocalLoader for ScriptedLoader {
    async fn stream_local_structure(&self, token: &LoadToken) -> Result<()> {
        self.replay(token).await
    }

    async fn load_local_archive(&self, access: &ArchiveAccess) -> Result<Vec<FileMetadata>> {
        self.archive_files
            .clone()
            .ok_or_else(|| CoreError::loader(format!("archive {} unreadable", access.address())))
    }
}

/// Apply everything already queued on `rx`, in order.
pub fn drain(rx: &mut mpsc::Receiver<TaggedUpdate>, apply: impl Fn(TaggedUpdate) -> bool) -> usize {
    let mut applied = 0;
    while let Ok(update) = rx.try_recv() {
        if apply(update) {
            applied += 1;
        }
    }
    applied
}
