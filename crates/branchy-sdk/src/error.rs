//! Error types for the Branchy SDK

use thiserror::Error;

/// Result type for SDK operations
pub type Result<T> = std::result::Result<T, BranchyError>;

/// SDK error types
///
/// `Clone` so a single fetch result can be handed to every caller waiting on
/// it. Lookups that miss are `Option::None`, not errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BranchyError {
    /// Remote access port call failed or was rejected
    #[error("Transport error: {0}")]
    Transport(String),

    /// Flat tree snapshot is structurally invalid
    #[error("Malformed snapshot: {0}")]
    MalformedSnapshot(String),

    /// Outbound unit failed validation
    #[error("Invalid unit: {0}")]
    InvalidUnit(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl BranchyError {
    pub fn transport(msg: impl Into<String>) -> Self {
        BranchyError::Transport(msg.into())
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, BranchyError::Transport(_))
    }
}

impl From<serde_json::Error> for BranchyError {
    fn from(err: serde_json::Error) -> Self {
        BranchyError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for BranchyError {
    fn from(err: toml::de::Error) -> Self {
        BranchyError::Config(err.to_string())
    }
}

impl From<std::io::Error> for BranchyError {
    fn from(err: std::io::Error) -> Self {
        BranchyError::Config(err.to_string())
    }
}
