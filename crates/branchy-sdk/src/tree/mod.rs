//! Materialized unit tree
//!
//! The backend hands out the tree as a flat, index-addressed array
//! ([`FlatNode`](branchy_types::FlatNode)). This module rebuilds it into a
//! recursive [`Node`] and answers path queries against it. Nothing here does
//! I/O; a fresh snapshot always produces a whole new tree.

mod materialize;
mod resolve;

pub use materialize::{materialize, materialize_with_root};
pub use resolve::{descendant_paths, find_by_path, join_path};

use branchy_types::{Content, UnitInfo};
use serde::{Deserialize, Serialize};

/// A node of the materialized tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub val: Content,
    /// Index of the originating flat node, as a string
    pub id: String,
    pub children: Vec<Node>,
}

impl Node {
    /// A lone root node, used before the first pull and for empty snapshots
    pub fn empty(root_name: impl Into<String>) -> Self {
        Self {
            val: Content::named(root_name),
            id: "0".to_string(),
            children: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.val.name
    }

    pub fn units(&self) -> &[UnitInfo] {
        &self.val.units
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn child(&self, name: &str) -> Option<&Node> {
        self.children.iter().find(|c| c.val.name == name)
    }

    /// Number of nodes in this subtree, itself included
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(Node::count).sum::<usize>()
    }

    /// Nodes of this subtree in pre-order
    pub fn preorder(&self) -> Vec<&Node> {
        let mut out = Vec::with_capacity(self.count());
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(node.children.iter().rev());
        }
        out
    }
}
