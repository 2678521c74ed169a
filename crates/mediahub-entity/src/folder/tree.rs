//! Folder tree structures for hierarchical display.

use serde::{Deserialize, Serialize};

use mediahub_core::types::FolderId;

use super::model::Visibility;
use super::stats::FileStats;

/// A node in a folder tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderNode {
    /// Folder ID.
    pub id: FolderId,
    /// Parent folder ID as stored on the record.
    pub parent_id: Option<FolderId>,
    /// Folder name.
    pub name: String,
    /// Materialized path.
    pub path: String,
    /// Depth level.
    pub depth: i32,
    /// Display order among siblings.
    pub sort_order: i32,
    /// Display color.
    pub color: Option<String>,
    /// Display icon.
    pub icon: Option<String>,
    /// Default access policy.
    pub visibility: Visibility,
    /// Stats of files directly in this folder.
    pub direct: FileStats,
    /// Files in this folder and all descendants.
    pub file_count: i64,
    /// Bytes in this folder and all descendants.
    pub total_size: i64,
    /// Set when the record's parent was not found; the node is shown as a root.
    pub dangling_parent: bool,
    /// Child folder nodes, sorted for display.
    pub children: Vec<FolderNode>,
}

impl FolderNode {
    /// Aggregate statistics of the subtree.
    pub fn stats(&self) -> FileStats {
        FileStats::new(self.file_count, self.total_size)
    }

    /// Number of direct child folders.
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Pre-order iterator over this node and its descendants.
    pub fn iter(&self) -> NodeIter<'_> {
        NodeIter { stack: vec![self] }
    }
}

/// Pre-order iterator over folder nodes.
#[derive(Debug)]
pub struct NodeIter<'a> {
    stack: Vec<&'a FolderNode>,
}

impl<'a> Iterator for NodeIter<'a> {
    type Item = &'a FolderNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

/// A forest of folder trees.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderForest {
    /// The root node(s) of the forest.
    pub roots: Vec<FolderNode>,
    /// Total number of folders in the forest.
    pub total_folders: u64,
}

impl FolderForest {
    /// Create an empty forest.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Pre-order iterator over every node of every tree.
    pub fn iter(&self) -> impl Iterator<Item = &FolderNode> {
        self.roots.iter().flat_map(|root| root.iter())
    }

    /// Find a node anywhere in the forest.
    pub fn find(&self, id: FolderId) -> Option<&FolderNode> {
        self.iter().find(|node| node.id == id)
    }

    /// Nodes that were surfaced as roots because their parent is missing.
    pub fn orphans(&self) -> impl Iterator<Item = &FolderNode> {
        self.roots.iter().filter(|node| node.dangling_parent)
    }
}
