//! Unit lifecycle states
//!
//! The state carried by [`crate::UnitInfo`] is an open string so peers can
//! introduce new states without breaking older clients. Three values have
//! first-class meaning and are modelled here. No transition table is
//! enforced: any state may follow any other, and `Defunct` is terminal only by
//! convention.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Known lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SysState {
    /// Newly created, still being shaped
    #[serde(rename = "_build")]
    UnderConstruction,
    /// In active use
    #[serde(rename = "_alive")]
    Alive,
    /// Retired
    #[serde(rename = "_defunct")]
    Defunct,
}

impl SysState {
    /// State given to a unit unless the creator asks for another
    pub const INITIAL: SysState = SysState::UnderConstruction;

    pub const ALL: [SysState; 3] = [
        SysState::UnderConstruction,
        SysState::Alive,
        SysState::Defunct,
    ];

    /// Parse a wire state; `None` for extension states
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "_build" => Some(Self::UnderConstruction),
            "_alive" => Some(Self::Alive),
            "_defunct" => Some(Self::Defunct),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnderConstruction => "_build",
            Self::Alive => "_alive",
            Self::Defunct => "_defunct",
        }
    }

    /// Consumers treat this state as final; nothing enforces it
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Defunct)
    }
}

impl fmt::Display for SysState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<SysState> for String {
    fn from(state: SysState) -> Self {
        state.as_str().to_string()
    }
}
