//! Store integration tests
//!
//! Drives [`BranchyStore`] against the in-memory backend:
//! - unit pulls and the path index
//! - lifecycle state changes
//! - updates that move a unit and its descendants
//! - tree pulls and path resolution
//! - transport failures

use branchy_sdk::{BranchyError, BranchyStore, MemoryBackend, StoreConfig, Unit, UnitHash};
use std::sync::Arc;

fn store() -> (Arc<MemoryBackend>, BranchyStore) {
    let backend = MemoryBackend::with_defaults();
    let store = BranchyStore::with_defaults(Arc::new(backend.port("alice")));
    (backend, store)
}

/// Every path entry points at a unit whose computed path is that entry
fn assert_path_index_consistent(store: &BranchyStore) {
    let units = store.units();
    for (path, hash) in store.unit_paths() {
        let unit = units.get(&hash).expect("path entry points at a cached unit");
        assert_eq!(unit.path(), path);
    }
}

// =============================================================================
// Units
// =============================================================================

#[tokio::test]
async fn test_root_and_child_paths() {
    let (_, store) = store();
    let root = store.add_unit(Unit::new("root"), "_alive").await.unwrap();
    let a = store
        .add_unit(Unit::new("a").with_parent("root"), "_build")
        .await
        .unwrap();

    assert_eq!(store.unit(&root).unwrap().path(), "root");
    assert_eq!(store.unit(&a).unwrap().path(), "root.a");
    assert_eq!(store.hash_for_path("root.a"), Some(a));
    assert_path_index_consistent(&store);
}

#[tokio::test]
async fn test_pull_units_folds_everything() {
    let (_, store) = store();
    store
        .initialize(vec![
            ("_alive".into(), Unit::new("root")),
            ("_build".into(), Unit::new("a").with_parent("root")),
            ("_build".into(), Unit::new("b").with_parent("root.a")),
        ])
        .await
        .unwrap();
    assert!(store.units().is_empty());

    let units = store.pull_units().await.unwrap();
    assert_eq!(units.len(), 3);
    assert!(store.hash_for_path("root.a.b").is_some());
    assert_eq!(store.unit_paths().len(), 3);
    assert_path_index_consistent(&store);
}

#[tokio::test]
async fn test_advance_state_visible_after_pull() {
    let (_, store) = store();
    let hash = store.add_unit_default(Unit::new("root")).await.unwrap();
    assert_eq!(store.unit_info(&hash).unwrap().state, "_build");

    assert!(store.advance_state(&hash, "_alive").await.unwrap());
    // Not refreshed until the next pull
    assert_eq!(store.unit_info(&hash).unwrap().state, "_build");

    store.pull_units().await.unwrap();
    assert_eq!(store.unit_info(&hash).unwrap().state, "_alive");
    assert!(store.unit_info(&hash).unwrap().is_alive());
}

#[tokio::test]
async fn test_advance_state_accepts_extension_states() {
    let (_, store) = store();
    let hash = store.add_unit_default(Unit::new("root")).await.unwrap();
    assert!(store.advance_state(&hash, "review").await.unwrap());
    store.pull_units().await.unwrap();

    let info = store.unit_info(&hash).unwrap();
    assert_eq!(info.state, "review");
    assert!(info.sys_state().is_none());
}

#[tokio::test]
async fn test_advance_state_unknown_unit_is_skipped() {
    let (_, store) = store();
    let advanced = store
        .advance_state(&UnitHash::from("missing"), "_alive")
        .await
        .unwrap();
    assert!(!advanced);
}

#[tokio::test]
async fn test_invalid_unit_never_reaches_backend() {
    let (backend, store) = store();
    let err = store.add_unit(Unit::new("a.b"), "_build").await.unwrap_err();
    assert!(matches!(err, BranchyError::InvalidUnit(_)));

    let err = store
        .add_unit(Unit::new("").with_parent("root"), "_build")
        .await
        .unwrap_err();
    assert!(matches!(err, BranchyError::InvalidUnit(_)));
    assert_eq!(backend.unit_count(), 0);
}

#[tokio::test]
async fn test_limits_come_from_config() {
    let backend = MemoryBackend::with_defaults();
    let config = StoreConfig::from_toml_str("[limits]\nmax_name_chars = 3").unwrap();
    let store = BranchyStore::new(Arc::new(backend.port("alice")), config);

    assert!(store.add_unit(Unit::new("abc"), "_build").await.is_ok());
    assert!(store.add_unit(Unit::new("abcd"), "_build").await.is_err());
}

#[tokio::test]
async fn test_update_replaces_cached_entry() {
    let (_, store) = store();
    let old = store.add_unit(Unit::new("root"), "_alive").await.unwrap();
    let new = store
        .update_unit(&old, Unit::new("root").with_description("top"), "_alive")
        .await
        .unwrap();

    assert_ne!(old, new);
    assert!(store.unit(&old).is_none());
    assert!(store.unit_info(&old).is_none());
    assert_eq!(store.unit(&new).unwrap().description, "top");
    assert_eq!(store.hash_for_path("root"), Some(new));
    assert_path_index_consistent(&store);
}

#[tokio::test]
async fn test_rename_moves_descendants() {
    let (_, store) = store();
    let root = store.add_unit(Unit::new("root"), "_alive").await.unwrap();
    store
        .add_unit(Unit::new("a").with_parent("root"), "_build")
        .await
        .unwrap();
    store
        .add_unit(Unit::new("b").with_parent("root.a"), "_build")
        .await
        .unwrap();

    store
        .update_unit(&root, Unit::new("top"), "_alive")
        .await
        .unwrap();
    store.pull_units().await.unwrap();
    store.pull_tree().await.unwrap();

    assert!(store.hash_for_path("top.a.b").is_some());
    assert_eq!(store.branch_paths("top"), vec!["top.a", "top.a.b"]);
    assert!(store.find_in_tree("root").is_none());
    assert_path_index_consistent(&store);
}

#[tokio::test]
async fn test_unit_cache_revision_notifies() {
    let (_, store) = store();
    let mut rx = store.subscribe_units();
    store.add_unit(Unit::new("root"), "_build").await.unwrap();
    assert!(rx.has_changed().unwrap());
    rx.borrow_and_update();

    store.pull_units().await.unwrap();
    assert!(rx.has_changed().unwrap());
}

// =============================================================================
// Tree
// =============================================================================

#[tokio::test]
async fn test_tree_starts_as_lone_root() {
    let (_, store) = store();
    let tree = store.tree();
    assert_eq!(tree.name(), "T");
    assert!(tree.is_leaf());
    assert!(store.branch_paths("").is_empty());
}

#[tokio::test]
async fn test_pull_tree_and_resolve() {
    let (_, store) = store();
    let root = store.add_unit(Unit::new("root"), "_alive").await.unwrap();
    let a = store
        .add_unit(Unit::new("a").with_parent("root"), "_build")
        .await
        .unwrap();

    let tree = store.pull_tree().await.unwrap();
    assert_eq!(tree.name(), "T");
    assert_eq!(tree.count(), 3);

    let node = store.find_in_tree("root").unwrap();
    assert_eq!(node.units()[0].hash, root);
    let child = store.find_in_tree("root.a").unwrap();
    assert_eq!(child.name(), "a");
    assert_eq!(child.units()[0].hash, a);

    assert_eq!(store.branch_paths(""), vec!["root", "root.a"]);
    assert_eq!(store.branch_paths("root"), vec!["root.a"]);
    assert!(store.branch_paths("nowhere").is_empty());
    assert!(store.find_in_tree("root.b").is_none());
}

#[tokio::test]
async fn test_tree_subscribers_see_new_snapshot() {
    let (_, store) = store();
    let mut rx = store.subscribe_tree();
    store.add_unit(Unit::new("root"), "_alive").await.unwrap();
    store.pull_tree().await.unwrap();

    assert!(rx.has_changed().unwrap());
    assert_eq!(rx.borrow_and_update().count(), 2);
}

// =============================================================================
// Transport failures
// =============================================================================

#[tokio::test]
async fn test_failed_pull_keeps_previous_state() {
    let (backend, store) = store();
    store.add_unit(Unit::new("root"), "_alive").await.unwrap();
    store.pull_units().await.unwrap();
    store.pull_tree().await.unwrap();

    backend.set_offline(true);
    assert!(store.pull_units().await.unwrap_err().is_transport());
    assert!(store.pull_tree().await.unwrap_err().is_transport());

    assert_eq!(store.units().len(), 1);
    assert!(store.find_in_tree("root").is_some());
}

#[tokio::test]
async fn test_failed_create_leaves_cache_untouched() {
    let (backend, store) = store();
    backend.set_offline(true);
    let err = store.add_unit(Unit::new("root"), "_build").await.unwrap_err();
    assert!(err.is_transport());
    assert!(store.units().is_empty());
    assert!(store.unit_paths().is_empty());
}
