//! Remote access port
//!
//! The contract the projection layer needs from whatever talks to the record
//! store. Every call is a request/response that either fails with
//! [`BranchyError::Transport`](crate::BranchyError::Transport) or returns its
//! typed payload. Retries and timeouts belong to the implementation, not to
//! the caches built on top.

mod memory;

pub use memory::{MemoryBackend, MemoryPort};

use crate::error::Result;
use async_trait::async_trait;
use branchy_types::{
    AdvanceStateInput, AgentPubKey, Attachment, AttachmentInput, BranchySignal, FlatTree,
    Initialization, UnitHash, UnitInput, UnitOutput, UpdateUnitInput,
};

#[async_trait]
pub trait RemotePort: Send + Sync {
    /// Agent this port acts as
    fn my_agent_pub_key(&self) -> AgentPubKey;

    /// Create many units at once, each with its own state
    async fn initialize(&self, input: Initialization) -> Result<()>;

    async fn create_unit(&self, input: UnitInput) -> Result<UnitOutput>;

    /// Replace a unit's content; the backend decides the resulting hash
    async fn update_unit(&self, input: UpdateUnitInput) -> Result<UnitOutput>;

    /// Every unit visible to the caller
    async fn get_units(&self) -> Result<Vec<UnitOutput>>;

    /// Flat tree snapshot, root first
    async fn get_tree(&self) -> Result<FlatTree>;

    async fn advance_state(&self, input: AdvanceStateInput) -> Result<()>;

    async fn add_attachment(&self, input: AttachmentInput) -> Result<()>;

    async fn remove_attachment(&self, input: AttachmentInput) -> Result<()>;

    async fn get_attachments(&self, unit_hash: &UnitHash) -> Result<Vec<Attachment>>;

    /// Send a signal to the listed peers
    async fn notify(&self, signal: BranchySignal, folks: Vec<AgentPubKey>) -> Result<()>;
}
