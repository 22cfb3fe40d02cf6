//! Collaborator contracts
//!
//! The wallet and the structure loaders live outside this workspace (a
//! browser wallet, the network client). Stores talk to them only through
//! these traits.

use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::access::ArchiveAccess;
use crate::error::Result;
use crate::structure::FileMetadata;
use crate::update::LoadToken;

/// Parameters of an EIP-2612 permit to be signed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermitRequest {
    pub token: Address,
    pub owner: Address,
    pub spender: Address,
    pub value: U256,
    /// Unix seconds.
    pub deadline: u64,
}

/// A signed permit, split into its components.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermitSignature {
    pub v: u8,
    pub r: B256,
    pub s: B256,
    pub deadline: u64,
}

/// The connected wallet.
#[async_trait]
pub trait WalletSigner: Send + Sync {
    /// Address of the connected account.
    fn address(&self) -> Address;

    /// Sign an arbitrary message (personal_sign), returning the hex signature.
    async fn sign_message(&self, message: &[u8]) -> Result<String>;

    /// Sign typed permit data.
    async fn sign_permit(&self, request: PermitRequest) -> Result<PermitSignature>;
}

/// Streams the remote vault structure.
///
/// `stream_vault_structure` returns once streaming has been started; updates
/// arrive separately, each stamped with `token`.
#[async_trait]
pub trait VaultLoader: Send + Sync {
    async fn stream_vault_structure(&self, signature: &str, token: &LoadToken) -> Result<()>;

    /// Fetch a single file's full metadata.
    async fn load_single_file(&self, signature: &str, path: &str) -> Result<FileMetadata>;
}

/// Streams the local mirror's structure.
#[async_trait]
pub trait LocalLoader: Send + Sync {
    async fn stream_local_structure(&self, token: &LoadToken) -> Result<()>;

    /// Fetch every file of one local archive.
    async fn load_local_archive(&self, access: &ArchiveAccess) -> Result<Vec<FileMetadata>>;
}
