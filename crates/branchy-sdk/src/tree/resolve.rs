//! Path lookups on the materialized tree
//!
//! Paths are dot-delimited node names below the root, e.g. `"a.b"`. The root
//! itself is the empty path. When siblings share a name the first one in
//! children order wins.

use super::Node;

/// Join a parent path and a child name, the empty path being the root
pub fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", parent, name)
    }
}

/// Locate the node at `path` under `tree`. The empty path is `tree` itself.
pub fn find_by_path<'a>(tree: &'a Node, path: &str) -> Option<&'a Node> {
    if path.is_empty() {
        return Some(tree);
    }
    path.split('.')
        .try_fold(tree, |node, segment| node.child(segment))
}

/// Paths of every descendant of the node at `path`, depth-first, parents
/// before their children. Empty when `path` does not resolve.
pub fn descendant_paths(tree: &Node, path: &str) -> Vec<String> {
    let mut paths = Vec::new();
    if let Some(node) = find_by_path(tree, path) {
        collect(node, path, &mut paths);
    }
    paths
}

fn collect(node: &Node, prefix: &str, out: &mut Vec<String>) {
    for child in &node.children {
        let child_path = join_path(prefix, child.name());
        out.push(child_path.clone());
        collect(child, &child_path, out);
    }
}
