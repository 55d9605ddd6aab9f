//! Records returned by the backend for every unit

use crate::state::SysState;
use crate::{AgentPubKey, Unit, UnitHash};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle and flag sidecar of a unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitInfo {
    /// Content identity of the current record
    pub hash: UnitHash,
    /// Lifecycle state; open string, see [`SysState`] for the known values
    pub state: String,
    /// Reserved extension string
    #[serde(default)]
    pub flags: String,
}

impl UnitInfo {
    /// The known lifecycle state, if `state` is one of them
    pub fn sys_state(&self) -> Option<SysState> {
        SysState::parse(&self.state)
    }

    pub fn is_alive(&self) -> bool {
        self.sys_state() == Some(SysState::Alive)
    }

    pub fn is_defunct(&self) -> bool {
        self.sys_state() == Some(SysState::Defunct)
    }
}

/// Provenance of a record version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    /// Identity of this record version
    pub action_hash: String,
    pub author: AgentPubKey,
    pub timestamp: DateTime<Utc>,
}

/// A stored unit together with its provenance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitRecord {
    pub entry_hash: UnitHash,
    pub action: Action,
    pub entry: Unit,
}

/// What the backend returns for create, update and list calls
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitOutput {
    pub info: UnitInfo,
    pub record: UnitRecord,
}

impl UnitOutput {
    pub fn hash(&self) -> &UnitHash {
        &self.info.hash
    }

    pub fn unit(&self) -> &Unit {
        &self.record.entry
    }
}
