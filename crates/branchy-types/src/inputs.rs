//! Inputs of backend calls

use crate::{Attachment, Unit, UnitHash};
use serde::{Deserialize, Serialize};

/// Bulk creation of `(state, unit)` pairs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Initialization {
    pub units: Vec<(String, Unit)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitInput {
    pub state: String,
    pub unit: Unit,
}

/// Full-record replacement of an existing unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUnitInput {
    pub hash: UnitHash,
    pub state: String,
    pub unit: Unit,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvanceStateInput {
    pub new_state: String,
    pub unit_hash: UnitHash,
}

/// Used for both adding and removing an attachment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentInput {
    pub unit_hash: UnitHash,
    pub attachment: Attachment,
}
