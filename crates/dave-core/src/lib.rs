//! # Dave Core
//!
//! Core types, update events, and collaborator traits shared by the Dave
//! vault client crates.
//!
//! ## Modules
//!
//! - [`access`]: Tagged access references and archive identity rules
//! - [`structure`]: Vault structure, archives, and file metadata
//! - [`update`]: Streaming structure updates and generation tokens
//! - [`traits`]: Wallet and loader collaborator contracts
//! - [`signature`]: Process-lifetime cache for the vault key signature
//! - [`notice`]: User-facing notices (toast channel)
//! - [`ids`]: Session-unique identifier minting
//! - [`error`]: Core error types

pub mod access;
pub mod error;
pub mod ids;
pub mod notice;
pub mod signature;
pub mod structure;
pub mod traits;
pub mod update;

// Re-exports
pub use access::{ArchiveAccess, ArchiveIdentity, ArchiveKey, PrivacyTier};
pub use error::{CoreError, Result};
pub use notice::{Notice, Notices, Severity};
pub use signature::{SignatureCache, VAULT_KEY_SEED};
pub use structure::{Archive, ArchiveRef, DataAccess, FileMetadata, FileStats, VaultStructure};
pub use traits::{LocalLoader, PermitRequest, PermitSignature, VaultLoader, WalletSigner};
pub use update::{LoadToken, StructureUpdate, TaggedUpdate};

pub use alloy_primitives::{Address, B256, U256};
