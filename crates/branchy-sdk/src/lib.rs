//! Branchy SDK - client projection layer
//!
//! Turns the flat primitives of the Branchy backend (list every unit, fetch a
//! flattened tree) into state a client can navigate:
//!
//! - [`UnitCache`]: units by content hash and by dotted path
//! - [`tree`]: the flat snapshot rebuilt into a recursive [`Node`], with path
//!   lookups
//! - [`AttachmentCache`]: per-unit attachment lists, fetched once and
//!   reloaded on demand
//! - [`SignalListener`]: merges units announced by peers
//!
//! [`BranchyStore`] ties them together over a [`RemotePort`].
//!
//! # Example
//!
//! ```rust,ignore
//! use branchy_sdk::{BranchyStore, MemoryBackend};
//!
//! let backend = MemoryBackend::with_defaults();
//! let store = BranchyStore::with_defaults(Arc::new(backend.port("alice")));
//!
//! store.add_unit(Unit::new("root"), "_alive").await?;
//! store.pull_tree().await?;
//! assert_eq!(store.branch_paths(""), vec!["root"]);
//! ```

// Remote access port and the in-memory backend
pub mod port;

// Entity and attachment caches
pub mod cache;

// Tree materialization and path resolution
pub mod tree;

// Peer signal reconciliation
pub mod signal;

// Store facade
pub mod store;

// Configuration
pub mod config;

// Error types
pub mod error;

pub use cache::{AsyncStatus, AttachmentCache, AttachmentCell, Attachments, UnitCache};
pub use config::{AttachmentConfig, SignalConfig, StoreConfig, TreeConfig, UnitLimits};
pub use error::{BranchyError, Result};
pub use port::{MemoryBackend, MemoryPort, RemotePort};
pub use signal::{SignalListener, SignalOutcome};
pub use store::BranchyStore;
pub use tree::Node;

// Re-export the wire types
pub use branchy_types::{
    Action, AdvanceStateInput, AgentPubKey, Attachment, AttachmentInput, BranchySignal, Content,
    FlatNode, FlatTree, Initialization, Message, SysState, Unit, UnitHash, UnitInfo, UnitInput,
    UnitOutput, UnitRecord, UpdateUnitInput,
};
