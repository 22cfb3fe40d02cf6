//! # Dave Tree
//!
//! Turns a flat [`VaultStructure`](dave_core::VaultStructure) into a navigable
//! directory tree.
//!
//! The tree is rebuilt from scratch on every structural change rather than
//! patched. Nodes are stored in an arena and reference their parent by
//! index.
//!
//! ```ignore
//! use dave_tree::{build, TreeOptions};
//!
//! let out = build(&structure, &TreeOptions::vault())?;
//! for skipped in &out.diagnostics {
//!     println!("{}: {}", skipped.path, skipped.kind);
//! }
//! let docs = out.tree.find("Docs/reports");
//! ```

pub mod builder;
pub mod config;
pub mod error;
pub mod tree;

pub use builder::{build, BuildOutput, DiagnosticKind, TreeDiagnostic};
pub use config::{ConfigWarning, TreeOptions, LOCAL_ROOT_NAME, VAULT_ROOT_NAME};
pub use error::{Result, TreeError};
pub use tree::{DirectoryTree, Folder, Node, NodeId, NodeKind};
