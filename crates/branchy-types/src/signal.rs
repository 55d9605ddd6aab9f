//! Peer-to-peer push notifications

use crate::{UnitHash, UnitOutput};
use serde::{Deserialize, Serialize};

/// Signal sent between peers when something changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchySignal {
    pub unit_hash: UnitHash,
    pub message: Message,
}

/// Signal body, tagged by `type`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "content")]
pub enum Message {
    /// A peer created a unit; carries the full record so receivers can merge
    /// it without a re-pull
    NewUnit(UnitOutput),
}

impl BranchySignal {
    pub fn new_unit(output: UnitOutput) -> Self {
        Self {
            unit_hash: output.info.hash.clone(),
            message: Message::NewUnit(output),
        }
    }

    pub fn message_type(&self) -> &'static str {
        match self.message {
            Message::NewUnit(_) => "NewUnit",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Action, AgentPubKey, Unit, UnitInfo, UnitRecord};
    use chrono::Utc;

    #[test]
    fn test_new_unit_signal_wire_shape() {
        let hash = UnitHash::from("uhC-abc");
        let output = UnitOutput {
            info: UnitInfo {
                hash: hash.clone(),
                state: "_build".into(),
                flags: String::new(),
            },
            record: UnitRecord {
                entry_hash: hash.clone(),
                action: Action {
                    action_hash: "uhCk-1".into(),
                    author: AgentPubKey::from("alice"),
                    timestamp: Utc::now(),
                },
                entry: Unit::new("a").with_parent("root"),
            },
        };

        let signal = BranchySignal::new_unit(output);
        let json = serde_json::to_value(&signal).unwrap();
        assert_eq!(json["unitHash"], "uhC-abc");
        assert_eq!(json["message"]["type"], "NewUnit");
        assert_eq!(json["message"]["content"]["record"]["entry"]["name"], "a");

        let back: BranchySignal = serde_json::from_value(json).unwrap();
        assert_eq!(back, signal);
        assert_eq!(back.message_type(), "NewUnit");
    }
}
