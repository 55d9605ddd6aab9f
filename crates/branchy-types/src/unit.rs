//! Unit records

use crate::AgentPubKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Meta key holding the unit's flag string
pub const FLAGS_META_KEY: &str = "flags";

/// An authored record occupying one position in the tree.
///
/// Units form a DAG: `parents` holds full paths of every parent node, but
/// only the first entry decides where the unit sits in the materialized tree.
/// The remaining entries are semantic backlinks.
///
/// The path is never stored. It is recomputed from `parents` and `name` on
/// every call, so renaming or reparenting changes it immediately.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    /// Full dotted paths of the parent nodes, primary parent first
    #[serde(default)]
    pub parents: Vec<String>,
    /// Node name, practically capped at 10 characters
    pub name: String,
    /// Short description, practically capped at 64 characters
    #[serde(default)]
    pub description: String,
    /// Agents allowed to change this unit
    #[serde(default)]
    pub stewards: Vec<AgentPubKey>,
    /// Open extension slot for the UI
    #[serde(default)]
    pub meta: BTreeMap<String, String>,
}

impl Unit {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Builder-style helper setting the primary parent path
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parents.insert(0, parent.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_steward(mut self, steward: AgentPubKey) -> Self {
        self.stewards.push(steward);
        self
    }

    /// Dotted path of this unit: `parents[0] + "." + name`, or `name` alone
    /// for a unit without parents.
    pub fn path(&self) -> String {
        match self.parents.first() {
            Some(parent) => format!("{}.{}", parent, self.name),
            None => self.name.clone(),
        }
    }

    /// The parent that determines tree placement
    pub fn primary_parent(&self) -> Option<&str> {
        self.parents.first().map(String::as_str)
    }

    /// Parents beyond the first; they never affect placement
    pub fn backlinks(&self) -> &[String] {
        self.parents.get(1..).unwrap_or(&[])
    }

    /// Flag string stored under `meta["flags"]`, empty when absent
    pub fn flags(&self) -> &str {
        self.meta.get(FLAGS_META_KEY).map(String::as_str).unwrap_or("")
    }

    pub fn is_steward(&self, agent: &AgentPubKey) -> bool {
        self.stewards.contains(agent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_without_parent_is_name() {
        let unit = Unit::new("root");
        assert_eq!(unit.path(), "root");
    }

    #[test]
    fn test_path_uses_primary_parent_only() {
        let mut unit = Unit::new("a").with_parent("root");
        unit.parents.push("other.branch".to_string());

        assert_eq!(unit.path(), "root.a");
        assert_eq!(unit.primary_parent(), Some("root"));
        assert_eq!(unit.backlinks(), &["other.branch".to_string()]);
    }

    #[test]
    fn test_path_follows_rename() {
        let mut unit = Unit::new("a").with_parent("root");
        unit.name = "b".to_string();
        assert_eq!(unit.path(), "root.b");
    }

    #[test]
    fn test_flags_from_meta() {
        let mut unit = Unit::new("x");
        assert_eq!(unit.flags(), "");
        unit.meta.insert(FLAGS_META_KEY.to_string(), "p".to_string());
        assert_eq!(unit.flags(), "p");
    }

    #[test]
    fn test_camel_case_wire_format() {
        let unit = Unit::new("a").with_parent("root");
        let json = serde_json::to_value(&unit).unwrap();
        assert_eq!(json["parents"][0], "root");
        assert_eq!(json["name"], "a");

        let parsed: Unit = serde_json::from_str(r#"{"name": "solo"}"#).unwrap();
        assert!(parsed.parents.is_empty());
        assert_eq!(parsed.path(), "solo");
    }
}
