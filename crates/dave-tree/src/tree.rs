//! Arena-backed directory tree
//!
//! Nodes live in a flat table and refer to each other by [`NodeId`]. A node's
//! parent is a plain index, so the tree owns no cycles and drops in one go.

use std::collections::HashMap;

use dave_core::{ArchiveRef, FileMetadata};
use derive_more::Display;

/// Index of a node within its [`DirectoryTree`].
///
/// Ids are only meaningful for the tree that issued them; a rebuild issues
/// a fresh set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
#[display("node#{_0}")]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Folder payload: children in insertion order plus a by-name index.
#[derive(Debug, Clone, Default)]
pub struct Folder {
    children: Vec<NodeId>,
    by_name: HashMap<String, NodeId>,
    archive: Option<ArchiveRef>,
}

impl Folder {
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// The archive this folder is the root of, if any.
    pub fn archive(&self) -> Option<&ArchiveRef> {
        self.archive.as_ref()
    }
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Folder(Folder),
    File(FileMetadata),
}

/// A single entry of the tree.
#[derive(Debug, Clone)]
pub struct Node {
    name: String,
    parent: Option<NodeId>,
    kind: NodeKind,
}

impl Node {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn is_folder(&self) -> bool {
        matches!(self.kind, NodeKind::Folder(_))
    }

    pub fn is_file(&self) -> bool {
        matches!(self.kind, NodeKind::File(_))
    }

    pub fn is_archive_root(&self) -> bool {
        matches!(&self.kind, NodeKind::Folder(folder) if folder.archive.is_some())
    }

    pub fn folder(&self) -> Option<&Folder> {
        match &self.kind {
            NodeKind::Folder(folder) => Some(folder),
            NodeKind::File(_) => None,
        }
    }

    pub fn file(&self) -> Option<&FileMetadata> {
        match &self.kind {
            NodeKind::File(file) => Some(file),
            NodeKind::Folder(_) => None,
        }
    }

    pub fn archive(&self) -> Option<&ArchiveRef> {
        self.folder().and_then(Folder::archive)
    }
}

/// Why an insertion could not be performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Conflict {
    /// A folder was needed where a file already sits
    FileInTheWay,
    /// A file was to be placed where a folder already sits
    FolderInTheWay,
    /// The parent id is not a folder of this tree
    NotAFolder,
}

/// Materialized directory tree.
#[derive(Debug, Clone)]
pub struct DirectoryTree {
    nodes: Vec<Node>,
}

impl DirectoryTree {
    /// Create a tree holding only a root folder.
    pub fn new(root_name: impl Into<String>) -> Self {
        Self {
            nodes: vec![Node {
                name: root_name.into(),
                parent: None,
                kind: NodeKind::Folder(Folder::default()),
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// Number of nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when the tree has nothing but its root.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    pub fn file_count(&self) -> usize {
        self.nodes.iter().filter(|node| node.is_file()).count()
    }

    /// Children of a folder, in insertion order. Empty for files.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id)
            .and_then(Node::folder)
            .map(Folder::children)
            .unwrap_or(&[])
    }

    pub fn child_by_name(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.get(id)
            .and_then(Node::folder)
            .and_then(|folder| folder.by_name.get(name).copied())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(Node::parent)
    }

    /// Slash-joined path from (excluding) the root; empty for the root.
    pub fn path(&self, id: NodeId) -> String {
        let mut segments = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let Some(node) = self.get(current) else { break };
            if node.parent.is_some() {
                segments.push(node.name.as_str());
            }
            cursor = node.parent;
        }
        segments.reverse();
        segments.join("/")
    }

    /// Resolve a slash-separated path relative to the root.
    pub fn find(&self, path: &str) -> Option<NodeId> {
        path.split('/')
            .filter(|segment| !segment.is_empty())
            .try_fold(self.root(), |current, segment| {
                self.child_by_name(current, segment)
            })
    }

    /// All node ids in depth-first pre-order, starting at the root.
    pub fn walk(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        order
    }

    fn push(&mut self, parent: NodeId, name: &str, kind: NodeKind) -> Result<NodeId, Conflict> {
        let id = NodeId(self.nodes.len());
        match self.nodes.get_mut(parent.0).map(|node| &mut node.kind) {
            Some(NodeKind::Folder(folder)) => {
                folder.children.push(id);
                folder.by_name.insert(name.to_string(), id);
            }
            _ => return Err(Conflict::NotAFolder),
        }
        self.nodes.push(Node {
            name: name.to_string(),
            parent: Some(parent),
            kind,
        });
        Ok(id)
    }

    /// Return the folder `name` under `parent`, creating it when absent.
    pub(crate) fn ensure_folder(&mut self, parent: NodeId, name: &str) -> Result<NodeId, Conflict> {
        match self.child_by_name(parent, name) {
            Some(existing) if self.nodes[existing.0].is_folder() => Ok(existing),
            Some(_) => Err(Conflict::FileInTheWay),
            None => self.push(parent, name, NodeKind::Folder(Folder::default())),
        }
    }

    /// Create a fresh archive-root folder. The caller guarantees the name is free.
    pub(crate) fn add_archive_root(
        &mut self,
        parent: NodeId,
        name: &str,
        archive: ArchiveRef,
    ) -> Result<NodeId, Conflict> {
        let folder = Folder {
            archive: Some(archive),
            ..Folder::default()
        };
        self.push(parent, name, NodeKind::Folder(folder))
    }

    /// Attach a file leaf, merging into an existing leaf of the same name.
    pub(crate) fn insert_file(
        &mut self,
        parent: NodeId,
        name: &str,
        file: FileMetadata,
    ) -> Result<NodeId, Conflict> {
        match self.child_by_name(parent, name) {
            Some(existing) => match &mut self.nodes[existing.0].kind {
                NodeKind::File(current) => {
                    current.absorb(file);
                    Ok(existing)
                }
                NodeKind::Folder(_) => Err(Conflict::FolderInTheWay),
            },
            None => self.push(parent, name, NodeKind::File(file)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dave_core::ArchiveAccess;

    #[test]
    fn test_new_tree_has_root_only() {
        let tree = DirectoryTree::new("Root");
        assert!(tree.is_empty());
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.get(tree.root()).unwrap().name(), "Root");
        assert!(tree.parent(tree.root()).is_none());
    }

    #[test]
    fn test_ensure_folder_reuses() {
        let mut tree = DirectoryTree::new("Root");
        let a = tree.ensure_folder(tree.root(), "a").unwrap();
        let again = tree.ensure_folder(tree.root(), "a").unwrap();
        assert_eq!(a, again);
        assert_eq!(tree.children(tree.root()).len(), 1);
        assert_eq!(tree.parent(a), Some(tree.root()));
    }

    #[test]
    fn test_insert_file_merges() {
        let mut tree = DirectoryTree::new("Root");
        let root = tree.root();
        let first = tree.insert_file(root, "a.txt", FileMetadata::new("a.txt")).unwrap();
        let second = tree
            .insert_file(root, "a.txt", FileMetadata::new("a.txt").loaded())
            .unwrap();
        assert_eq!(first, second);
        assert!(tree.get(first).unwrap().file().unwrap().is_loaded);

        tree.insert_file(root, "a.txt", FileMetadata::new("a.txt")).unwrap();
        assert!(tree.get(first).unwrap().file().unwrap().is_loaded);
        assert_eq!(tree.file_count(), 1);
    }

    #[test]
    fn test_conflicts() {
        let mut tree = DirectoryTree::new("Root");
        let root = tree.root();
        let file = tree.insert_file(root, "x", FileMetadata::new("x")).unwrap();
        assert_eq!(tree.ensure_folder(root, "x"), Err(Conflict::FileInTheWay));
        assert_eq!(
            tree.insert_file(file, "y", FileMetadata::new("x/y")),
            Err(Conflict::NotAFolder)
        );

        tree.ensure_folder(root, "dir").unwrap();
        assert_eq!(
            tree.insert_file(root, "dir", FileMetadata::new("dir")),
            Err(Conflict::FolderInTheWay)
        );
    }

    #[test]
    fn test_find_path_and_walk() {
        let mut tree = DirectoryTree::new("Root");
        let root = tree.root();
        let docs = tree
            .add_archive_root(
                root,
                "Docs",
                ArchiveRef::new("Docs", ArchiveAccess::Public("aa".into())),
            )
            .unwrap();
        let x = tree.ensure_folder(docs, "x").unwrap();
        let y = tree.insert_file(x, "y.txt", FileMetadata::new("x/y.txt")).unwrap();

        assert_eq!(tree.find("/Docs//x/y.txt"), Some(y));
        assert_eq!(tree.find(""), Some(root));
        assert_eq!(tree.find("Docs/missing"), None);
        assert_eq!(tree.path(y), "Docs/x/y.txt");
        assert!(tree.get(docs).unwrap().is_archive_root());
        assert!(!tree.get(x).unwrap().is_archive_root());
        assert_eq!(tree.walk(), vec![root, docs, x, y]);
    }
}
