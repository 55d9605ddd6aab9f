//! Branchy wire types
//!
//! Data shared between Branchy peers, the backend record store and the client
//! projection layer (`branchy-sdk`).
//!
//! ## Core Concepts
//!
//! 1. **Unit** - an authored record placed in the tree by its primary parent path
//! 2. **UnitInfo / Action** - lifecycle state and provenance travelling with a unit
//! 3. **FlatTree** - the index-addressed tree snapshot returned by the backend
//! 4. **Attachment** - an external resource linked to a unit
//! 5. **BranchySignal** - push notifications exchanged between peers
//!
//! Everything here is plain serde data; field names follow the backend's
//! camelCase JSON encoding.

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod attachment;
pub mod inputs;
pub mod record;
pub mod signal;
pub mod state;
pub mod tree;
pub mod unit;

pub use attachment::{Attachment, Hrl};
pub use inputs::{AdvanceStateInput, AttachmentInput, Initialization, UnitInput, UpdateUnitInput};
pub use record::{Action, UnitInfo, UnitOutput, UnitRecord};
pub use signal::{BranchySignal, Message};
pub use state::SysState;
pub use tree::{Content, FlatNode, FlatTree, TREE_ROOT};
pub use unit::Unit;

/// Content hash of a unit record, base64 encoded.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitHash(pub String);

impl UnitHash {
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UnitHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UnitHash {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for UnitHash {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Public key of an agent, base64 encoded.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentPubKey(pub String);

impl AgentPubKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentPubKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AgentPubKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for AgentPubKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}
