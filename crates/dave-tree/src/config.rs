//! Tree builder options

use dave_core::ArchiveIdentity;

/// Root name used for the remote vault tree.
pub const VAULT_ROOT_NAME: &str = "Root";

/// Root name used for the local mirror tree.
pub const LOCAL_ROOT_NAME: &str = "Local Files";

/// Options controlling how a structure is materialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeOptions {
    /// Name of the root folder
    pub root_name: String,
    /// When two named archives are the same archive
    pub identity: ArchiveIdentity,
    /// Upper bound on the `"name (n)"` counter
    pub max_rename_attempts: u32,
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self::vault()
    }
}

impl TreeOptions {
    /// Options for the remote vault.
    pub fn vault() -> Self {
        Self {
            root_name: VAULT_ROOT_NAME.to_string(),
            identity: ArchiveIdentity::Address,
            max_rename_attempts: 1000,
        }
    }

    /// Options for the local mirror.
    pub fn local() -> Self {
        Self {
            root_name: LOCAL_ROOT_NAME.to_string(),
            identity: ArchiveIdentity::AddressAndTier,
            max_rename_attempts: 1000,
        }
    }

    pub fn with_root_name(mut self, name: impl Into<String>) -> Self {
        self.root_name = name.into();
        self
    }

    pub fn with_identity(mut self, identity: ArchiveIdentity) -> Self {
        self.identity = identity;
        self
    }

    pub fn with_max_rename_attempts(mut self, attempts: u32) -> Self {
        self.max_rename_attempts = attempts;
        self
    }

    /// Validate the options and return any warnings
    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.root_name.trim().is_empty() {
            warnings.push(ConfigWarning::EmptyRootName);
        }

        if self.max_rename_attempts == 0 {
            warnings.push(ConfigWarning::RenamingDisabled);
        }

        warnings
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}

/// Configuration warnings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigWarning {
    /// Root name is empty or whitespace
    EmptyRootName,
    /// Any name collision between archives aborts the build
    RenamingDisabled,
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigWarning::EmptyRootName => write!(f, "root_name is empty"),
            ConfigWarning::RenamingDisabled => {
                write!(f, "max_rename_attempts is 0, archive name collisions will fail")
            }
        }
    }
}
