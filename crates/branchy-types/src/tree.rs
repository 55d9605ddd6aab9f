//! Flat tree snapshot as returned by the backend

use crate::UnitInfo;
use serde::{Deserialize, Serialize};

/// Name of the root node of every tree
pub const TREE_ROOT: &str = "T";

/// Payload of one tree node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    pub name: String,
    /// Units placed at this node
    #[serde(default)]
    pub units: Vec<UnitInfo>,
}

impl Content {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            units: Vec::new(),
        }
    }
}

/// One node of the flat array. `idx` is its position in the array and its
/// identity within that snapshot; `children` are indices into the same array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatNode {
    pub idx: usize,
    pub val: Content,
    pub parent: Option<usize>,
    #[serde(default)]
    pub children: Vec<usize>,
}

/// Flat tree snapshot; element 0 is the root
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatTree {
    pub tree: Vec<FlatNode>,
}

impl FlatTree {
    pub fn root(&self) -> Option<&FlatNode> {
        self.tree.first()
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }
}
