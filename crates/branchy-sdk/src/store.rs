//! Branchy store
//!
//! Front door of the SDK. Owns the remote port, the unit cache, the current
//! tree and the attachment cache, and exposes every logical operation on
//! them. State is held in owned containers; callers get snapshots and
//! `watch` receivers, and can only change anything through the methods here.

use crate::cache::{AttachmentCache, AttachmentCell, UnitCache};
use crate::config::StoreConfig;
use crate::error::Result;
use crate::port::RemotePort;
use crate::signal::SignalListener;
use crate::tree::{self, Node};
use branchy_types::{
    Action, AdvanceStateInput, AgentPubKey, Attachment, BranchySignal, Initialization, SysState,
    Unit, UnitHash, UnitInfo, UnitInput, UpdateUnitInput,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Client-side projection of the unit store
///
/// # Example
///
/// ```rust,ignore
/// use branchy_sdk::{BranchyStore, MemoryBackend, StoreConfig};
///
/// let backend = MemoryBackend::with_defaults();
/// let store = BranchyStore::new(Arc::new(backend.port("alice")), StoreConfig::default());
///
/// let root = store.add_unit(Unit::new("root"), "_alive").await?;
/// store.pull_units().await?;
/// store.pull_tree().await?;
///
/// let node = store.find_in_tree("root");
/// ```
pub struct BranchyStore {
    port: Arc<dyn RemotePort>,
    config: StoreConfig,
    my_agent_pub_key: AgentPubKey,
    units: Arc<UnitCache>,
    tree: watch::Sender<Arc<Node>>,
    attachments: AttachmentCache,
}

impl BranchyStore {
    pub fn new(port: Arc<dyn RemotePort>, config: StoreConfig) -> Self {
        let my_agent_pub_key = port.my_agent_pub_key();
        let (tree, _) = watch::channel(Arc::new(Node::empty(config.store.tree_root.clone())));
        let attachments =
            AttachmentCache::new(Arc::clone(&port), config.attachments.self_invalidate);

        info!(agent = %my_agent_pub_key, tree = %config.store.tree_name, "BranchyStore initialized");

        Self {
            port,
            config,
            my_agent_pub_key,
            units: Arc::new(UnitCache::new()),
            tree,
            attachments,
        }
    }

    pub fn with_defaults(port: Arc<dyn RemotePort>) -> Self {
        Self::new(port, StoreConfig::default())
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn my_agent_pub_key(&self) -> &AgentPubKey {
        &self.my_agent_pub_key
    }

    pub fn tree_name(&self) -> &str {
        &self.config.store.tree_name
    }

    // =========================================================================
    // Units
    // =========================================================================

    /// Create many `(state, unit)` pairs in one call. Nothing is folded into
    /// the cache; pull afterwards.
    pub async fn initialize(&self, units: Vec<(String, Unit)>) -> Result<()> {
        for (_, unit) in &units {
            self.config.limits.validate(unit)?;
        }
        let count = units.len();
        self.port.initialize(Initialization { units }).await?;
        info!(count = count, "Initialized units");
        Ok(())
    }

    /// Fetch every visible unit and fold each into the cache. Returns the
    /// whole cache afterwards.
    pub async fn pull_units(&self) -> Result<HashMap<UnitHash, Unit>> {
        let outputs = self.port.get_units().await?;
        let count = self.units.fold_all(&outputs);
        info!(count = count, "Pulled units");
        Ok(self.units.units())
    }

    /// Create a unit and fold the backend's record. Returns the hash the
    /// backend assigned.
    pub async fn add_unit(&self, unit: Unit, state: &str) -> Result<UnitHash> {
        self.config.limits.validate(&unit)?;
        let output = self
            .port
            .create_unit(UnitInput {
                state: state.to_string(),
                unit,
            })
            .await?;
        Ok(self.units.fold(&output))
    }

    /// Create a unit in the configured initial state
    pub async fn add_unit_default(&self, unit: Unit) -> Result<UnitHash> {
        let state = self.config.store.initial_state.clone();
        self.add_unit(unit, &state).await
    }

    /// Replace a unit's content. The entry under `hash` is dropped and the
    /// returned record is cached under whatever hash the backend gave it.
    pub async fn update_unit(&self, hash: &UnitHash, unit: Unit, state: &str) -> Result<UnitHash> {
        self.config.limits.validate(&unit)?;
        let output = self
            .port
            .update_unit(UpdateUnitInput {
                hash: hash.clone(),
                state: state.to_string(),
                unit,
            })
            .await?;
        Ok(self.units.replace(hash, &output))
    }

    /// Move a unit to another lifecycle state.
    ///
    /// Any string is forwarded. The cache is not refreshed; pull to see the
    /// new state. Returns `false` without calling the backend when the unit
    /// is not cached.
    pub async fn advance_state(&self, hash: &UnitHash, state: &str) -> Result<bool> {
        let Some(info) = self.units.unit_info(hash) else {
            warn!(hash = %hash, "advance_state on unknown unit skipped");
            return Ok(false);
        };
        if info.sys_state().is_some_and(|s| s.is_terminal()) {
            warn!(hash = %hash, from = %info.state, to = %state, "Leaving a terminal state");
        }
        if SysState::parse(state).is_none() {
            debug!(hash = %hash, state = %state, "Advancing to an extension state");
        }
        self.port
            .advance_state(AdvanceStateInput {
                new_state: state.to_string(),
                unit_hash: hash.clone(),
            })
            .await?;
        Ok(true)
    }

    pub fn unit(&self, hash: &UnitHash) -> Option<Unit> {
        self.units.unit(hash)
    }

    pub fn unit_info(&self, hash: &UnitHash) -> Option<UnitInfo> {
        self.units.unit_info(hash)
    }

    pub fn unit_action(&self, hash: &UnitHash) -> Option<Action> {
        self.units.unit_action(hash)
    }

    pub fn hash_for_path(&self, path: &str) -> Option<UnitHash> {
        self.units.hash_for_path(path)
    }

    pub fn units(&self) -> HashMap<UnitHash, Unit> {
        self.units.units()
    }

    pub fn unit_paths(&self) -> HashMap<String, UnitHash> {
        self.units.paths()
    }

    /// Notified on every unit cache change
    pub fn subscribe_units(&self) -> watch::Receiver<u64> {
        self.units.subscribe()
    }

    // =========================================================================
    // Tree
    // =========================================================================

    /// Fetch a fresh snapshot, materialize it and publish it as the current
    /// tree. On error the previous tree stays in place.
    pub async fn pull_tree(&self) -> Result<Arc<Node>> {
        let flat = self.port.get_tree().await?;
        let node = Arc::new(tree::materialize_with_root(
            &flat.tree,
            &self.config.store.tree_root,
        )?);
        debug!(nodes = flat.len(), "Pulled tree");
        self.tree.send_replace(Arc::clone(&node));
        Ok(node)
    }

    pub fn tree(&self) -> Arc<Node> {
        Arc::clone(&self.tree.borrow())
    }

    pub fn subscribe_tree(&self) -> watch::Receiver<Arc<Node>> {
        self.tree.subscribe()
    }

    pub fn find_in_tree(&self, path: &str) -> Option<Node> {
        tree::find_by_path(&self.tree(), path).cloned()
    }

    /// Paths of every node below `path` in the current tree
    pub fn branch_paths(&self, path: &str) -> Vec<String> {
        tree::descendant_paths(&self.tree(), path)
    }

    // =========================================================================
    // Attachments
    // =========================================================================

    /// The cached attachment cell of a unit
    pub fn unit_attachments(&self, hash: &UnitHash) -> Arc<AttachmentCell> {
        self.attachments.get(hash)
    }

    /// Uncached fetch of a unit's attachments
    pub async fn get_attachments(&self, hash: &UnitHash) -> Result<Vec<Attachment>> {
        self.port.get_attachments(hash).await
    }

    /// Returns `false` without calling the backend when the unit is not cached
    pub async fn add_attachment(&self, hash: &UnitHash, attachment: Attachment) -> Result<bool> {
        if !self.units.contains(hash) {
            warn!(hash = %hash, "add_attachment on unknown unit skipped");
            return Ok(false);
        }
        self.attachments.add(hash, attachment).await?;
        Ok(true)
    }

    /// Returns `false` without calling the backend when the unit is not cached
    pub async fn remove_attachment(&self, hash: &UnitHash, attachment: Attachment) -> Result<bool> {
        if !self.units.contains(hash) {
            warn!(hash = %hash, "remove_attachment on unknown unit skipped");
            return Ok(false);
        }
        self.attachments.remove(hash, attachment).await?;
        Ok(true)
    }

    // =========================================================================
    // Signals
    // =========================================================================

    /// A listener merging peer signals into this store's unit cache
    pub fn listener(&self) -> SignalListener {
        SignalListener::new(Arc::clone(&self.units))
    }

    pub async fn notify(&self, signal: BranchySignal, folks: Vec<AgentPubKey>) -> Result<()> {
        self.port.notify(signal, folks).await
    }

    /// Tell `folks` about a cached unit. Returns `false` when the unit is not
    /// cached.
    pub async fn announce(&self, hash: &UnitHash, folks: Vec<AgentPubKey>) -> Result<bool> {
        let Some(output) = self.units.output(hash) else {
            return Ok(false);
        };
        self.notify(BranchySignal::new_unit(output), folks).await?;
        Ok(true)
    }
}
