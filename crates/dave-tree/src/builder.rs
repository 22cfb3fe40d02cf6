//! Structure to tree transform
//!
//! Builds a fresh [`DirectoryTree`] from a [`VaultStructure`]. Construction is
//! best effort: an entry that cannot be placed is skipped and reported as a
//! [`TreeDiagnostic`], while the remaining entries are still inserted.

use dave_core::{Archive, ArchiveIdentity, FileMetadata, VaultStructure};
use derive_more::Display;
use tracing::{debug, instrument, warn};

use crate::config::TreeOptions;
use crate::error::{Result, TreeError};
use crate::tree::{Conflict, DirectoryTree, NodeId};

/// Why an entry was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum DiagnosticKind {
    /// The path had no non-empty segment
    #[display("path has no segments")]
    EmptyPath,
    /// A folder was needed where a file already exists
    #[display("a file occupies a folder position")]
    FileShadowsFolder,
    /// A file was to be placed where a folder already exists
    #[display("a folder occupies the file position")]
    FolderShadowsFile,
}

/// One skipped entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeDiagnostic {
    pub kind: DiagnosticKind,
    /// The offending file path
    pub path: String,
    /// The archive the file came from, if any
    pub archive: Option<String>,
}

/// A built tree and the entries it had to skip.
#[derive(Debug, Clone)]
pub struct BuildOutput {
    pub tree: DirectoryTree,
    pub diagnostics: Vec<TreeDiagnostic>,
}

/// Materialize `structure` into a new tree.
///
/// Archives are placed first, in input order, then standalone files. An
/// unnamed archive spills its files into the root. A named archive gets its
/// own folder; if the name is taken by a different archive, the folder is
/// renamed `"name (n)"`, and if it is taken by the same archive the archive
/// is skipped. Archives without files are skipped.
///
/// Only a failure to place a named archive at the root aborts the build.
#[instrument(skip_all, fields(root = %options.root_name, archives = structure.archives.len(), files = structure.files.len()))]
pub fn build(structure: &VaultStructure, options: &TreeOptions) -> Result<BuildOutput> {
    if options.root_name.trim().is_empty() {
        return Err(TreeError::InvalidOptions("root_name is empty".to_string()));
    }

    let mut builder = Builder {
        tree: DirectoryTree::new(options.root_name.clone()),
        diagnostics: Vec::new(),
    };
    let root = builder.tree.root();

    for archive in &structure.archives {
        if archive.files.is_empty() {
            continue;
        }

        if !archive.is_named() {
            for file in &archive.files {
                builder.place(root, file, Some(&archive.name));
            }
            continue;
        }

        let Some(name) = resolve_archive_name(&builder.tree, archive, options)? else {
            debug!(archive = %archive.name, "archive already present, skipping");
            continue;
        };
        let folder = builder
            .tree
            .add_archive_root(root, &name, archive.reference())
            .map_err(|_| TreeError::InvalidOptions("root is not a folder".to_string()))?;
        for file in &archive.files {
            builder.place(folder, file, Some(&archive.name));
        }
    }

    for file in &structure.files {
        builder.place(root, file, None);
    }

    debug!(
        nodes = builder.tree.len(),
        skipped = builder.diagnostics.len(),
        "tree built"
    );

    Ok(BuildOutput {
        tree: builder.tree,
        diagnostics: builder.diagnostics,
    })
}

/// Pick the root-level folder name for a named archive.
///
/// Returns `None` when the same archive already occupies a candidate name.
fn resolve_archive_name(
    tree: &DirectoryTree,
    archive: &Archive,
    options: &TreeOptions,
) -> Result<Option<String>> {
    let root = tree.root();
    let mut candidate = archive.name.clone();
    let mut counter: u32 = 0;

    while let Some(existing) = tree.child_by_name(root, &candidate) {
        let same = tree
            .get(existing)
            .and_then(|node| node.archive())
            .is_some_and(|existing| same_archive(options.identity, existing, archive));
        if same {
            return Ok(None);
        }

        counter += 1;
        if counter > options.max_rename_attempts {
            return Err(TreeError::RenameExhausted {
                name: archive.name.clone(),
                attempts: options.max_rename_attempts,
            });
        }
        candidate = format!("{} ({})", archive.name, counter);
    }

    Ok(Some(candidate))
}

fn same_archive(identity: ArchiveIdentity, existing: &dave_core::ArchiveRef, archive: &Archive) -> bool {
    identity.same(&existing.access, &archive.access)
}

struct Builder {
    tree: DirectoryTree,
    diagnostics: Vec<TreeDiagnostic>,
}

impl Builder {
    /// Walk/create the folders of `file.path` under `base` and attach the leaf.
    fn place(&mut self, base: NodeId, file: &FileMetadata, archive: Option<&str>) {
        let segments: Vec<&str> = file.segments().collect();
        let Some((leaf, folders)) = segments.split_last() else {
            self.skip(DiagnosticKind::EmptyPath, file, archive);
            return;
        };

        let mut parent = base;
        for segment in folders {
            match self.tree.ensure_folder(parent, segment) {
                Ok(folder) => parent = folder,
                Err(conflict) => {
                    self.skip(kind_for(conflict), file, archive);
                    return;
                }
            }
        }

        let mut entry = file.clone();
        if let Some(name) = archive {
            entry.archive_name = name.to_string();
        }
        if let Err(conflict) = self.tree.insert_file(parent, leaf, entry) {
            self.skip(kind_for(conflict), file, archive);
        }
    }

    fn skip(&mut self, kind: DiagnosticKind, file: &FileMetadata, archive: Option<&str>) {
        warn!(path = %file.path, archive = ?archive, reason = %kind, "skipping file");
        self.diagnostics.push(TreeDiagnostic {
            kind,
            path: file.path.clone(),
            archive: archive.map(str::to_string),
        });
    }
}

fn kind_for(conflict: Conflict) -> DiagnosticKind {
    match conflict {
        Conflict::FolderInTheWay => DiagnosticKind::FolderShadowsFile,
        Conflict::FileInTheWay | Conflict::NotAFolder => DiagnosticKind::FileShadowsFolder,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dave_core::ArchiveAccess;

    fn public(addr: &str) -> ArchiveAccess {
        ArchiveAccess::Public(addr.to_string())
    }

    fn names(tree: &DirectoryTree, id: NodeId) -> Vec<String> {
        tree.children(id)
            .iter()
            .map(|child| tree.get(*child).unwrap().name().to_string())
            .collect()
    }

    #[test]
    fn test_unnamed_archive_spills_into_root() {
        let structure = VaultStructure {
            archives: vec![
                Archive::new(" ", public("aa")).with_files(vec![FileMetadata::new("a/b.txt")]),
            ],
            ..Default::default()
        };
        let out = build(&structure, &TreeOptions::vault()).unwrap();
        let leaf = out.tree.find("a/b.txt").unwrap();
        let file = out.tree.get(leaf).unwrap().file().unwrap();
        assert_eq!(file.archive_name, " ");
        assert!(!out.tree.get(out.tree.find("a").unwrap()).unwrap().is_archive_root());
    }

    #[test]
    fn test_name_collision_renames_in_order() {
        let structure = VaultStructure {
            archives: vec![
                Archive::new("X", public("aa")).with_files(vec![FileMetadata::new("1")]),
                Archive::new("X", public("bb")).with_files(vec![FileMetadata::new("2")]),
                Archive::new("X", public("cc")).with_files(vec![FileMetadata::new("3")]),
            ],
            ..Default::default()
        };
        let out = build(&structure, &TreeOptions::vault()).unwrap();
        assert_eq!(names(&out.tree, out.tree.root()), vec!["X", "X (1)", "X (2)"]);
        assert!(out.tree.find("X (2)/3").is_some());
    }

    #[test]
    fn test_same_address_is_skipped() {
        let archive = Archive::new("Docs", public("aa")).with_files(vec![FileMetadata::new("f")]);
        let renamed = Archive::new("Docs", ArchiveAccess::Private("aa".into()))
            .with_files(vec![FileMetadata::new("g")]);
        let structure = VaultStructure {
            archives: vec![archive.clone(), archive, renamed],
            ..Default::default()
        };

        let out = build(&structure, &TreeOptions::vault()).unwrap();
        assert_eq!(names(&out.tree, out.tree.root()), vec!["Docs"]);

        // With tier-aware identity the private archive is a different entity.
        let out = build(&structure, &TreeOptions::local()).unwrap();
        assert_eq!(
            names(&out.tree, out.tree.root()),
            vec!["Docs", "Docs (1)"]
        );
    }

    #[test]
    fn test_empty_archive_skipped() {
        let structure = VaultStructure {
            archives: vec![Archive::new("Empty", public("aa"))],
            ..Default::default()
        };
        let out = build(&structure, &TreeOptions::vault()).unwrap();
        assert!(out.tree.is_empty());
        assert!(out.diagnostics.is_empty());
    }

    #[test]
    fn test_rename_exhausted_aborts() {
        let structure = VaultStructure {
            archives: vec![
                Archive::new("X", public("aa")).with_files(vec![FileMetadata::new("1")]),
                Archive::new("X", public("bb")).with_files(vec![FileMetadata::new("2")]),
            ],
            ..Default::default()
        };
        let options = TreeOptions::vault().with_max_rename_attempts(0);
        assert_eq!(
            build(&structure, &options).unwrap_err(),
            TreeError::RenameExhausted {
                name: "X".into(),
                attempts: 0
            }
        );
    }

    #[test]
    fn test_conflicts_become_diagnostics() {
        let structure = VaultStructure {
            files: vec![
                FileMetadata::new("a"),
                FileMetadata::new("a/b"),
                FileMetadata::new("c/d"),
                FileMetadata::new("c"),
                FileMetadata::new("//"),
                FileMetadata::new("e"),
            ],
            ..Default::default()
        };
        let out = build(&structure, &TreeOptions::vault()).unwrap();
        let kinds: Vec<_> = out.diagnostics.iter().map(|d| d.kind).collect();
        assert_eq!(
            kinds,
            vec![
                DiagnosticKind::FileShadowsFolder,
                DiagnosticKind::FolderShadowsFile,
                DiagnosticKind::EmptyPath,
            ]
        );
        assert_eq!(names(&out.tree, out.tree.root()), vec!["a", "c", "e"]);
    }

    #[test]
    fn test_empty_root_name_rejected() {
        let options = TreeOptions::vault().with_root_name("");
        assert!(matches!(
            build(&VaultStructure::new(), &options),
            Err(TreeError::InvalidOptions(_))
        ));
    }
}
