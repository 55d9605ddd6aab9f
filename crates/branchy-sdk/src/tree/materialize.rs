//! Flat snapshot to recursive tree

use super::Node;
use crate::error::{BranchyError, Result};
use branchy_types::{FlatNode, TREE_ROOT};

/// Rebuild the recursive tree from a flat snapshot whose element 0 is the root.
///
/// An empty snapshot yields a lone root named [`TREE_ROOT`].
pub fn materialize(flat: &[FlatNode]) -> Result<Node> {
    materialize_with_root(flat, TREE_ROOT)
}

/// Same as [`materialize`], naming the lone root of an empty snapshot
/// `root_name`.
///
/// # Errors
/// `MalformedSnapshot` when a child index points outside the array or a node
/// is reached twice (a cycle, or a child shared by two parents).
pub fn materialize_with_root(flat: &[FlatNode], root_name: &str) -> Result<Node> {
    if flat.is_empty() {
        return Ok(Node::empty(root_name));
    }
    let mut visited = vec![false; flat.len()];
    build(flat, 0, &mut visited)
}

fn build(flat: &[FlatNode], idx: usize, visited: &mut [bool]) -> Result<Node> {
    let node = flat.get(idx).ok_or_else(|| {
        BranchyError::MalformedSnapshot(format!(
            "child index {} out of range ({} nodes)",
            idx,
            flat.len()
        ))
    })?;
    if std::mem::replace(&mut visited[idx], true) {
        return Err(BranchyError::MalformedSnapshot(format!(
            "node {} reached twice",
            idx
        )));
    }

    let children = node
        .children
        .iter()
        .map(|&child| build(flat, child, visited))
        .collect::<Result<Vec<_>>>()?;

    Ok(Node {
        val: node.val.clone(),
        id: node.idx.to_string(),
        children,
    })
}
