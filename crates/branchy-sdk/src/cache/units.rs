//! Entity cache
//!
//! Four indices describe every known unit: content, provenance and info keyed
//! by hash, plus `path -> hash`. They live behind a single lock and are only
//! changed one whole unit at a time, so readers never see a unit with some of
//! its entries missing, and the path index always agrees with the content.
//!
//! Every change bumps a revision counter published through a
//! [`tokio::sync::watch`] channel, which is how views learn they should
//! re-read.

use branchy_types::{Action, Unit, UnitHash, UnitInfo, UnitOutput, UnitRecord};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::watch;
use tracing::debug;

#[derive(Default)]
struct UnitIndex {
    units: HashMap<UnitHash, Unit>,
    actions: HashMap<UnitHash, Action>,
    infos: HashMap<UnitHash, UnitInfo>,
    paths: HashMap<String, UnitHash>,
}

impl UnitIndex {
    fn fold(&mut self, output: &UnitOutput) -> UnitHash {
        let hash = output.info.hash.clone();
        let unit = output.record.entry.clone();
        let path = unit.path();

        // A re-folded unit may have moved; drop the path it was indexed under.
        if let Some(previous) = self.units.get(&hash) {
            let previous_path = previous.path();
            if previous_path != path && self.paths.get(&previous_path) == Some(&hash) {
                self.paths.remove(&previous_path);
            }
        }

        self.paths.insert(path, hash.clone());
        self.units.insert(hash.clone(), unit);
        self.actions.insert(hash.clone(), output.record.action.clone());
        self.infos.insert(hash.clone(), output.info.clone());
        hash
    }

    fn remove(&mut self, hash: &UnitHash) {
        if let Some(unit) = self.units.remove(hash) {
            let path = unit.path();
            if self.paths.get(&path) == Some(hash) {
                self.paths.remove(&path);
            }
        }
        self.actions.remove(hash);
        self.infos.remove(hash);
    }
}

/// Single source of truth for which units exist and what they look like.
pub struct UnitCache {
    index: RwLock<UnitIndex>,
    revision: watch::Sender<u64>,
}

impl Default for UnitCache {
    fn default() -> Self {
        Self::new()
    }
}

impl UnitCache {
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            index: RwLock::new(UnitIndex::default()),
            revision,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, UnitIndex> {
        self.index.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, UnitIndex> {
        self.index.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn bump(&self) {
        self.revision.send_modify(|r| *r += 1);
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Insert or overwrite one unit from a backend output. Returns its hash.
    pub(crate) fn fold(&self, output: &UnitOutput) -> UnitHash {
        let hash = self.write().fold(output);
        debug!(hash = %hash, path = %output.record.entry.path(), "Unit folded");
        self.bump();
        hash
    }

    /// Fold a batch of outputs; each unit is written atomically on its own.
    pub(crate) fn fold_all<'a>(&self, outputs: impl IntoIterator<Item = &'a UnitOutput>) -> usize {
        let mut count = 0;
        for output in outputs {
            self.write().fold(output);
            count += 1;
        }
        if count > 0 {
            self.bump();
        }
        count
    }

    /// Replace the unit stored under `old` with `output`.
    ///
    /// The backend may hand back a new hash for updated content; the old
    /// hash's entries are dropped in the same critical section that inserts
    /// the new ones.
    pub(crate) fn replace(&self, old: &UnitHash, output: &UnitOutput) -> UnitHash {
        let hash = {
            let mut index = self.write();
            if old != &output.info.hash {
                index.remove(old);
            }
            index.fold(output)
        };
        debug!(old = %old, new = %hash, "Unit replaced");
        self.bump();
        hash
    }

    /// Fold `output` only if its hash is not cached yet. Returns whether it
    /// was inserted. Check and insert happen under one lock.
    pub(crate) fn merge_if_absent(&self, output: &UnitOutput) -> bool {
        let inserted = {
            let mut index = self.write();
            if index.units.contains_key(&output.info.hash) {
                false
            } else {
                index.fold(output);
                true
            }
        };
        if inserted {
            self.bump();
        }
        inserted
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    pub fn unit(&self, hash: &UnitHash) -> Option<Unit> {
        self.read().units.get(hash).cloned()
    }

    pub fn unit_info(&self, hash: &UnitHash) -> Option<UnitInfo> {
        self.read().infos.get(hash).cloned()
    }

    pub fn unit_action(&self, hash: &UnitHash) -> Option<Action> {
        self.read().actions.get(hash).cloned()
    }

    /// Unit, info and provenance recombined, read under one lock
    pub fn output(&self, hash: &UnitHash) -> Option<UnitOutput> {
        let index = self.read();
        Some(UnitOutput {
            info: index.infos.get(hash)?.clone(),
            record: UnitRecord {
                entry_hash: hash.clone(),
                action: index.actions.get(hash)?.clone(),
                entry: index.units.get(hash)?.clone(),
            },
        })
    }

    pub fn hash_for_path(&self, path: &str) -> Option<UnitHash> {
        self.read().paths.get(path).cloned()
    }

    pub fn contains(&self, hash: &UnitHash) -> bool {
        self.read().units.contains_key(hash)
    }

    /// Snapshot of every cached unit
    pub fn units(&self) -> HashMap<UnitHash, Unit> {
        self.read().units.clone()
    }

    /// Snapshot of the path index
    pub fn paths(&self) -> HashMap<String, UnitHash> {
        self.read().paths.clone()
    }

    pub fn len(&self) -> usize {
        self.read().units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    /// Notified whenever the cache changes
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use branchy_types::AgentPubKey;
    use chrono::Utc;

    fn output(hash: &str, unit: Unit, state: &str) -> UnitOutput {
        UnitOutput {
            info: UnitInfo {
                hash: hash.into(),
                state: state.into(),
                flags: String::new(),
            },
            record: UnitRecord {
                entry_hash: hash.into(),
                action: Action {
                    action_hash: format!("act-{}", hash),
                    author: AgentPubKey::from("alice"),
                    timestamp: Utc::now(),
                },
                entry: unit,
            },
        }
    }

    #[test]
    fn test_fold_writes_all_indices() {
        let cache = UnitCache::new();
        let hash = cache.fold(&output("h1", Unit::new("a").with_parent("root"), "_build"));

        assert_eq!(cache.unit(&hash).unwrap().name, "a");
        assert_eq!(cache.unit_info(&hash).unwrap().state, "_build");
        assert_eq!(cache.unit_action(&hash).unwrap().action_hash, "act-h1");
        assert_eq!(cache.hash_for_path("root.a"), Some(hash));
    }

    #[test]
    fn test_refold_moves_path_entry() {
        let cache = UnitCache::new();
        cache.fold(&output("h1", Unit::new("a"), "_build"));
        cache.fold(&output("h1", Unit::new("b"), "_build"));

        assert_eq!(cache.hash_for_path("a"), None);
        assert_eq!(cache.hash_for_path("b"), Some("h1".into()));
        assert_eq!(cache.paths().len(), 1);
    }

    #[test]
    fn test_replace_drops_old_hash() {
        let cache = UnitCache::new();
        cache.fold(&output("old", Unit::new("a"), "_build"));
        let new = cache.replace(&"old".into(), &output("new", Unit::new("a2"), "_alive"));

        assert_eq!(new, UnitHash::from("new"));
        assert!(cache.unit(&"old".into()).is_none());
        assert!(cache.unit_info(&"old".into()).is_none());
        assert!(cache.unit_action(&"old".into()).is_none());
        assert_eq!(cache.hash_for_path("a"), None);
        assert_eq!(cache.hash_for_path("a2"), Some(new));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_replace_same_hash_overwrites() {
        let cache = UnitCache::new();
        cache.fold(&output("h", Unit::new("a"), "_build"));
        cache.replace(&"h".into(), &output("h", Unit::new("a"), "_alive"));
        assert_eq!(cache.unit_info(&"h".into()).unwrap().state, "_alive");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_merge_if_absent_is_idempotent() {
        let cache = UnitCache::new();
        let out = output("h", Unit::new("a"), "_build");
        assert!(cache.merge_if_absent(&out));
        assert!(!cache.merge_if_absent(&out));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_revision_bumps_on_change() {
        let cache = UnitCache::new();
        let rx = cache.subscribe();
        assert_eq!(*rx.borrow(), 0);

        cache.fold(&output("h", Unit::new("a"), "_build"));
        assert_eq!(cache.revision(), 1);
        assert!(rx.has_changed().unwrap());

        cache.merge_if_absent(&output("h", Unit::new("a"), "_build"));
        assert_eq!(cache.revision(), 1);
    }

    #[test]
    fn test_missing_lookups_are_none() {
        let cache = UnitCache::new();
        assert!(cache.is_empty());
        assert!(cache.unit(&"nope".into()).is_none());
        assert!(cache.hash_for_path("nope").is_none());
    }
}
