//! In-memory backend
//!
//! A [`RemotePort`] implementation that keeps every record in process memory
//! and reproduces the behaviour of the Branchy backend zome:
//! - content-addressed unit hashes (identical content, identical hash)
//! - a single ordered unit index carrying `(state, flags)` per unit
//! - re-parenting of descendants when an update moves a unit's path
//! - deduplicated, insertion-ordered attachments
//! - signals fanned out to the listed peers
//!
//! One [`MemoryBackend`] is shared by several [`MemoryPort`]s, one per agent,
//! which lets tests and the CLI simulate peers talking to the same network.

use super::RemotePort;
use crate::config::SignalConfig;
use crate::error::{BranchyError, Result};
use async_trait::async_trait;
use branchy_types::{
    Action, AdvanceStateInput, AgentPubKey, Attachment, AttachmentInput, BranchySignal, Content,
    FlatNode, FlatTree, Initialization, Unit, UnitHash, UnitInfo, UnitInput, UnitOutput,
    UnitRecord, UpdateUnitInput, TREE_ROOT,
};
use chrono::Utc;
use futures::stream::{BoxStream, StreamExt};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, warn};

/// Prefix of unit content hashes
const ENTRY_HASH_PREFIX: &str = "uhCEk";

/// Prefix of record version hashes
const ACTION_HASH_PREFIX: &str = "uhCkk";

/// One link from the unit anchor
#[derive(Debug, Clone)]
struct IndexEntry {
    hash: UnitHash,
    state: String,
    flags: String,
}

#[derive(Default)]
struct BackendState {
    records: HashMap<UnitHash, UnitRecord>,
    /// Creation-ordered unit links
    index: Vec<IndexEntry>,
    attachments: HashMap<UnitHash, Vec<Attachment>>,
    action_seq: u64,
}

impl BackendState {
    fn indexed(&self, hash: &UnitHash) -> Option<&IndexEntry> {
        self.index.iter().find(|e| &e.hash == hash)
    }

    fn unlink(&mut self, hash: &UnitHash) {
        self.index.retain(|e| &e.hash != hash);
    }

    fn output_for(&self, entry: &IndexEntry) -> Option<UnitOutput> {
        self.records.get(&entry.hash).map(|record| UnitOutput {
            info: UnitInfo {
                hash: entry.hash.clone(),
                state: entry.state.clone(),
                flags: entry.flags.clone(),
            },
            record: record.clone(),
        })
    }

    /// Write a record and link it with `state`, replacing any link the same
    /// hash already had.
    fn commit(&mut self, unit: Unit, state: &str, author: &AgentPubKey) -> Result<UnitOutput> {
        let hash = hash_unit(&unit)?;
        self.action_seq += 1;
        let record = UnitRecord {
            entry_hash: hash.clone(),
            action: Action {
                action_hash: format!("{}{:016x}", ACTION_HASH_PREFIX, self.action_seq),
                author: author.clone(),
                timestamp: Utc::now(),
            },
            entry: unit,
        };
        let info = UnitInfo {
            hash: hash.clone(),
            state: state.to_string(),
            flags: record.entry.flags().to_string(),
        };

        self.unlink(&hash);
        self.index.push(IndexEntry {
            hash: hash.clone(),
            state: info.state.clone(),
            flags: info.flags.clone(),
        });
        self.records.insert(hash, record.clone());

        Ok(UnitOutput { info, record })
    }

    /// Rewrite every parent path under `from` so it sits under `to`
    fn reparent(&mut self, from: &str, to: &str, author: &AgentPubKey) -> Result<usize> {
        let mut moved = Vec::new();
        for entry in &self.index {
            let Some(record) = self.records.get(&entry.hash) else {
                continue;
            };
            let mut unit = record.entry.clone();
            let mut changed = false;
            for parent in unit.parents.iter_mut() {
                if let Some(rest) = strip_path_prefix(parent, from) {
                    *parent = format!("{}{}", to, rest);
                    changed = true;
                }
            }
            if changed {
                moved.push((entry.clone(), unit));
            }
        }

        let count = moved.len();
        for (entry, unit) in moved {
            self.unlink(&entry.hash);
            self.commit(unit, &entry.state, author)?;
        }
        Ok(count)
    }

    fn flat_tree(&self) -> FlatTree {
        let mut nodes = vec![FlatNode {
            idx: 0,
            val: Content::named(TREE_ROOT),
            parent: None,
            children: Vec::new(),
        }];

        for entry in &self.index {
            let Some(record) = self.records.get(&entry.hash) else {
                continue;
            };
            let path = record.entry.path();
            let mut current = 0;
            for segment in path.split('.').filter(|s| !s.is_empty()) {
                let existing = nodes[current]
                    .children
                    .iter()
                    .copied()
                    .find(|&c| nodes[c].val.name == segment);
                current = match existing {
                    Some(child) => child,
                    None => {
                        let idx = nodes.len();
                        nodes.push(FlatNode {
                            idx,
                            val: Content::named(segment),
                            parent: Some(current),
                            children: Vec::new(),
                        });
                        nodes[current].children.push(idx);
                        idx
                    }
                };
            }
            nodes[current].val.units.push(UnitInfo {
                hash: entry.hash.clone(),
                state: entry.state.clone(),
                flags: entry.flags.clone(),
            });
        }

        FlatTree { tree: nodes }
    }
}

/// Returns the remainder of `path` after `prefix` when `path` is `prefix`
/// itself or a descendant of it.
fn strip_path_prefix<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = path.strip_prefix(prefix)?;
    if rest.is_empty() || rest.starts_with('.') {
        Some(rest)
    } else {
        None
    }
}

/// Content hash of a unit
pub fn hash_unit(unit: &Unit) -> Result<UnitHash> {
    let bytes = serde_json::to_vec(unit)?;
    let digest = Sha256::digest(&bytes);
    Ok(UnitHash(format!("{}{}", ENTRY_HASH_PREFIX, hex::encode(digest))))
}

/// A signal on its way to some peers
#[derive(Debug, Clone)]
struct Delivery {
    to: Vec<AgentPubKey>,
    signal: BranchySignal,
}

/// Shared in-memory record store
pub struct MemoryBackend {
    state: Mutex<BackendState>,
    signals: broadcast::Sender<Delivery>,
    offline: AtomicBool,
    attachment_fetches: AtomicUsize,
}

impl MemoryBackend {
    pub fn new(config: &SignalConfig) -> Arc<Self> {
        let (signals, _) = broadcast::channel(config.channel_capacity.max(1));
        Arc::new(Self {
            state: Mutex::new(BackendState::default()),
            signals,
            offline: AtomicBool::new(false),
            attachment_fetches: AtomicUsize::new(0),
        })
    }

    pub fn with_defaults() -> Arc<Self> {
        Self::new(&SignalConfig::default())
    }

    /// A port acting as `agent`
    pub fn port(self: &Arc<Self>, agent: impl Into<AgentPubKey>) -> MemoryPort {
        MemoryPort {
            backend: Arc::clone(self),
            agent: agent.into(),
        }
    }

    /// While offline every call fails with a transport error
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of `get_attachments` calls served so far
    pub fn attachment_fetch_count(&self) -> usize {
        self.attachment_fetches.load(Ordering::SeqCst)
    }

    pub fn unit_count(&self) -> usize {
        self.lock().index.len()
    }

    fn lock(&self) -> MutexGuard<'_, BackendState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(BranchyError::transport("backend offline"));
        }
        Ok(())
    }
}

/// One agent's connection to a [`MemoryBackend`]
#[derive(Clone)]
pub struct MemoryPort {
    backend: Arc<MemoryBackend>,
    agent: AgentPubKey,
}

impl MemoryPort {
    pub fn backend(&self) -> &Arc<MemoryBackend> {
        &self.backend
    }

    /// Signals addressed to this agent, from now on
    pub fn signals(&self) -> BoxStream<'static, BranchySignal> {
        let me = self.agent.clone();
        BroadcastStream::new(self.backend.signals.subscribe())
            .filter_map(move |delivery| {
                let signal = match delivery {
                    Ok(d) if d.to.contains(&me) => Some(d.signal),
                    Ok(_) => None,
                    Err(e) => {
                        warn!(agent = %me, error = %e, "Signal stream lagged");
                        None
                    }
                };
                futures::future::ready(signal)
            })
            .boxed()
    }
}

#[async_trait]
impl RemotePort for MemoryPort {
    fn my_agent_pub_key(&self) -> AgentPubKey {
        self.agent.clone()
    }

    async fn initialize(&self, input: Initialization) -> Result<()> {
        self.backend.check_online()?;
        let mut state = self.backend.lock();
        for (unit_state, unit) in input.units {
            state.commit(unit, &unit_state, &self.agent)?;
        }
        Ok(())
    }

    async fn create_unit(&self, input: UnitInput) -> Result<UnitOutput> {
        self.backend.check_online()?;
        let output = self.backend.lock().commit(input.unit, &input.state, &self.agent)?;
        debug!(hash = %output.info.hash, "Unit created");
        Ok(output)
    }

    async fn update_unit(&self, input: UpdateUnitInput) -> Result<UnitOutput> {
        self.backend.check_online()?;
        let mut state = self.backend.lock();

        let old_path = state
            .records
            .get(&input.hash)
            .filter(|_| state.indexed(&input.hash).is_some())
            .map(|record| record.entry.path())
            .ok_or_else(|| BranchyError::transport(format!("Unit not found: {}", input.hash)))?;

        state.unlink(&input.hash);
        let new_path = input.unit.path();
        let output = state.commit(input.unit, &input.state, &self.agent)?;

        if new_path != old_path && !old_path.is_empty() {
            let moved = state.reparent(&old_path, &new_path, &self.agent)?;
            debug!(from = %old_path, to = %new_path, moved = moved, "Reparented descendants");
        }
        Ok(output)
    }

    async fn get_units(&self) -> Result<Vec<UnitOutput>> {
        self.backend.check_online()?;
        let state = self.backend.lock();
        Ok(state
            .index
            .iter()
            .filter_map(|entry| state.output_for(entry))
            .collect())
    }

    async fn get_tree(&self) -> Result<FlatTree> {
        self.backend.check_online()?;
        Ok(self.backend.lock().flat_tree())
    }

    async fn advance_state(&self, input: AdvanceStateInput) -> Result<()> {
        self.backend.check_online()?;
        let mut state = self.backend.lock();
        let entry = state
            .index
            .iter_mut()
            .find(|e| e.hash == input.unit_hash)
            .ok_or_else(|| {
                BranchyError::transport(format!("Unit not found: {}", input.unit_hash))
            })?;
        entry.state = input.new_state;
        Ok(())
    }

    async fn add_attachment(&self, input: AttachmentInput) -> Result<()> {
        self.backend.check_online()?;
        let mut state = self.backend.lock();
        let list = state.attachments.entry(input.unit_hash).or_default();
        if !list.contains(&input.attachment) {
            list.push(input.attachment);
        }
        Ok(())
    }

    async fn remove_attachment(&self, input: AttachmentInput) -> Result<()> {
        self.backend.check_online()?;
        let mut state = self.backend.lock();
        if let Some(list) = state.attachments.get_mut(&input.unit_hash) {
            list.retain(|a| a != &input.attachment);
        }
        Ok(())
    }

    async fn get_attachments(&self, unit_hash: &UnitHash) -> Result<Vec<Attachment>> {
        self.backend.check_online()?;
        self.backend.attachment_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .backend
            .lock()
            .attachments
            .get(unit_hash)
            .cloned()
            .unwrap_or_default())
    }

    async fn notify(&self, signal: BranchySignal, folks: Vec<AgentPubKey>) -> Result<()> {
        self.backend.check_online()?;
        // No receivers is not an error: nobody is listening yet.
        let _ = self.backend.signals.send(Delivery { to: folks, signal });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn port() -> MemoryPort {
        MemoryBackend::with_defaults().port("alice")
    }

    async fn create(port: &MemoryPort, unit: Unit) -> UnitOutput {
        port.create_unit(UnitInput {
            state: "_build".into(),
            unit,
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_same_content_same_hash() {
        let port = port();
        let a = create(&port, Unit::new("root")).await;
        let b = create(&port, Unit::new("root")).await;
        assert_eq!(a.info.hash, b.info.hash);
        assert_eq!(port.get_units().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_flat_tree_follows_primary_parent() {
        let port = port();
        create(&port, Unit::new("")).await;
        create(&port, Unit::new("a")).await;
        let mut b = Unit::new("b").with_parent("a");
        b.parents.push("elsewhere".into());
        create(&port, b).await;

        let tree = port.get_tree().await.unwrap().tree;
        assert_eq!(tree.len(), 3);
        assert_eq!(tree[0].val.name, TREE_ROOT);
        assert_eq!(tree[0].val.units.len(), 1);
        assert_eq!(tree[0].children, vec![1]);
        assert_eq!(tree[1].val.name, "a");
        assert_eq!(tree[1].children, vec![2]);
        assert_eq!(tree[2].val.name, "b");
        assert_eq!(tree[2].parent, Some(1));
    }

    #[tokio::test]
    async fn test_update_reparents_descendants() {
        let port = port();
        let a = create(&port, Unit::new("a")).await;
        create(&port, Unit::new("b").with_parent("a")).await;
        create(&port, Unit::new("c").with_parent("a.b")).await;
        create(&port, Unit::new("ab")).await;

        port.update_unit(UpdateUnitInput {
            hash: a.info.hash.clone(),
            state: "_alive".into(),
            unit: Unit::new("z"),
        })
        .await
        .unwrap();

        let mut paths: Vec<String> = port
            .get_units()
            .await
            .unwrap()
            .iter()
            .map(|o| o.record.entry.path())
            .collect();
        paths.sort();
        assert_eq!(paths, vec!["ab", "z", "z.b", "z.b.c"]);
    }

    #[tokio::test]
    async fn test_update_unknown_hash_fails() {
        let port = port();
        let err = port
            .update_unit(UpdateUnitInput {
                hash: UnitHash::from("nope"),
                state: "_alive".into(),
                unit: Unit::new("x"),
            })
            .await
            .unwrap_err();
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_attachments_dedupe_and_order() {
        let port = port();
        let hash = UnitHash::from("u1");
        let first = Attachment::new("dna", "one");
        let second = Attachment::new("dna", "two").with_context("ctx");
        for attachment in [first.clone(), second.clone(), first.clone()] {
            port.add_attachment(AttachmentInput {
                unit_hash: hash.clone(),
                attachment,
            })
            .await
            .unwrap();
        }
        assert_eq!(
            port.get_attachments(&hash).await.unwrap(),
            vec![first.clone(), second.clone()]
        );

        port.remove_attachment(AttachmentInput {
            unit_hash: hash.clone(),
            attachment: first,
        })
        .await
        .unwrap();
        assert_eq!(port.get_attachments(&hash).await.unwrap(), vec![second]);
    }

    #[tokio::test]
    async fn test_offline_is_transport_error() {
        let port = port();
        port.backend().set_offline(true);
        assert!(port.get_units().await.unwrap_err().is_transport());
        port.backend().set_offline(false);
        assert!(port.get_units().await.is_ok());
    }

    #[test]
    fn test_strip_path_prefix_respects_segments() {
        assert_eq!(strip_path_prefix("a.b", "a"), Some(".b"));
        assert_eq!(strip_path_prefix("a", "a"), Some(""));
        assert_eq!(strip_path_prefix("ab", "a"), None);
    }
}
