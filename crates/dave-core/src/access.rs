//! Access references
//!
//! The network exposes a single address space at two confidentiality tiers:
//! public archives are reachable through a plain address, private archives
//! through an encrypted pointer. Both are modelled as one tagged variant.

use serde::{Deserialize, Serialize};

/// Confidentiality tier of an access reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrivacyTier {
    Private,
    Public,
}

/// Tagged pointer to an archive on the network.
///
/// Serialized in the loader's wire shape: `{"Private": "..."}` or
/// `{"Public": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArchiveAccess {
    /// Encrypted pointer (hex-encoded data map).
    Private(String),
    /// Plain archive address.
    Public(String),
}

impl ArchiveAccess {
    /// The underlying address, regardless of tier.
    pub fn address(&self) -> &str {
        match self {
            ArchiveAccess::Private(address) | ArchiveAccess::Public(address) => address,
        }
    }

    /// The confidentiality tier of this reference.
    pub fn tier(&self) -> PrivacyTier {
        match self {
            ArchiveAccess::Private(_) => PrivacyTier::Private,
            ArchiveAccess::Public(_) => PrivacyTier::Public,
        }
    }

    pub fn is_private(&self) -> bool {
        self.tier() == PrivacyTier::Private
    }
}

/// Rule deciding when two archive references denote the same archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArchiveIdentity {
    /// Same underlying address, whatever the tier (remote vault).
    #[default]
    Address,
    /// Same address and same tier (local mirror, where a private and a
    /// public archive may share an address position).
    AddressAndTier,
}

/// Key under which archives are tracked in loading/failed/loaded sets.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArchiveKey {
    address: String,
    tier: Option<PrivacyTier>,
}

impl ArchiveKey {
    pub fn address(&self) -> &str {
        &self.address
    }
}

impl ArchiveIdentity {
    /// Compute the tracking key for an access reference.
    pub fn key(&self, access: &ArchiveAccess) -> ArchiveKey {
        let tier = match self {
            ArchiveIdentity::Address => None,
            ArchiveIdentity::AddressAndTier => Some(access.tier()),
        };
        ArchiveKey {
            address: access.address().to_string(),
            tier,
        }
    }

    /// Whether two references denote the same archive under this rule.
    pub fn same(&self, a: &ArchiveAccess, b: &ArchiveAccess) -> bool {
        match self {
            ArchiveIdentity::Address => a.address() == b.address(),
            ArchiveIdentity::AddressAndTier => a == b,
        }
    }
}
