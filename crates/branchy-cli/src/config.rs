//! CLI configuration
//!
//! `branchy.toml` carries the store sections understood by
//! [`StoreConfig`] plus a logging filter and the units seeded into the
//! in-memory backend at startup.

use anyhow::Context;
use branchy_sdk::{StoreConfig, Unit};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(flatten)]
    pub store: StoreConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Units created through `initialize` before the first pull
    #[serde(default)]
    pub seed: Vec<SeedUnit>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directives, overridden by `RUST_LOG`
    #[serde(default = "default_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedUnit {
    /// Falls back to `store.initial_state`
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub parents: Vec<String>,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

fn default_filter() -> String { "branchy=info,branchy_sdk=info".to_string() }

impl Config {
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load `path`, or defaults when it does not exist. The flag says whether
    /// the file was found.
    pub fn load(path: &Path) -> anyhow::Result<(Self, bool)> {
        if !path.exists() {
            return Ok((Self::default(), false));
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config = Self::from_toml_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok((config, true))
    }

    /// Seed entries as `(state, unit)` pairs
    pub fn seed_units(&self) -> Vec<(String, Unit)> {
        self.seed
            .iter()
            .map(|seed| {
                let state = seed
                    .state
                    .clone()
                    .unwrap_or_else(|| self.store.store.initial_state.clone());
                let unit = Unit {
                    parents: seed.parents.clone(),
                    name: seed.name.clone(),
                    description: seed.description.clone(),
                    ..Unit::default()
                };
                (state, unit)
            })
            .collect()
    }
}
