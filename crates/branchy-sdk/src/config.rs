//! Store configuration

use crate::error::{BranchyError, Result};
use branchy_types::{SysState, Unit, TREE_ROOT};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub store: TreeConfig,
    #[serde(default)]
    pub limits: UnitLimits,
    #[serde(default)]
    pub attachments: AttachmentConfig,
    #[serde(default)]
    pub signals: SignalConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeConfig {
    /// Name of the root node of an empty tree
    #[serde(default = "default_tree_root")]
    pub tree_root: String,

    /// Display name of the tree
    #[serde(default = "default_tree_name")]
    pub tree_name: String,

    /// State given to units created without an explicit one
    #[serde(default = "default_initial_state")]
    pub initial_state: String,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            tree_root: default_tree_root(),
            tree_name: default_tree_name(),
            initial_state: default_initial_state(),
        }
    }
}

/// Caps checked on units before they are sent to the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitLimits {
    #[serde(default = "default_max_name_chars")]
    pub max_name_chars: usize,

    #[serde(default = "default_max_description_chars")]
    pub max_description_chars: usize,
}

impl Default for UnitLimits {
    fn default() -> Self {
        Self {
            max_name_chars: default_max_name_chars(),
            max_description_chars: default_max_description_chars(),
        }
    }
}

impl UnitLimits {
    /// Check a unit about to be created or updated.
    ///
    /// A dot in the name would split the unit's path into extra segments, and
    /// a child without a name would be unreachable by path.
    pub fn validate(&self, unit: &Unit) -> Result<()> {
        if unit.name.contains('.') {
            return Err(BranchyError::InvalidUnit(format!(
                "name `{}` must not contain `.`",
                unit.name
            )));
        }
        if unit.name.is_empty() && !unit.parents.is_empty() {
            return Err(BranchyError::InvalidUnit(
                "a unit with a parent needs a name".into(),
            ));
        }
        let name_len = unit.name.chars().count();
        if name_len > self.max_name_chars {
            return Err(BranchyError::InvalidUnit(format!(
                "name is {} chars, limit is {}",
                name_len, self.max_name_chars
            )));
        }
        let description_len = unit.description.chars().count();
        if description_len > self.max_description_chars {
            return Err(BranchyError::InvalidUnit(format!(
                "description is {} chars, limit is {}",
                description_len, self.max_description_chars
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachmentConfig {
    /// Reload a key's cell after adding or removing one of its attachments
    #[serde(default = "default_true")]
    pub self_invalidate: bool,
}

impl Default for AttachmentConfig {
    fn default() -> Self {
        Self {
            self_invalidate: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalConfig {
    /// Capacity of the in-memory backend's broadcast channel
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
        }
    }
}

// Defaults
fn default_tree_root() -> String { TREE_ROOT.to_string() }
fn default_tree_name() -> String { "Root".to_string() }
fn default_initial_state() -> String { SysState::INITIAL.as_str().to_string() }
fn default_max_name_chars() -> usize { 10 }
fn default_max_description_chars() -> usize { 64 }
fn default_true() -> bool { true }
fn default_channel_capacity() -> usize { 256 }

impl StoreConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}
