//! Attachments: references to resources living outside Branchy

use serde::{Deserialize, Serialize};

/// Locator of an external resource: (DNA hash, resource hash), base64 encoded
pub type Hrl = (String, String);

/// An external resource linked to a unit.
///
/// There is no identity beyond value equality; the same locator with a
/// different context is a different attachment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub hrl: Hrl,
    #[serde(default)]
    pub context: Option<String>,
}

impl Attachment {
    pub fn new(dna_hash: impl Into<String>, resource_hash: impl Into<String>) -> Self {
        Self {
            hrl: (dna_hash.into(), resource_hash.into()),
            context: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}
