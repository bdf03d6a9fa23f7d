//! Signing metadata published next to every unsigned payload

use serde::{Deserialize, Serialize};

/// Data every co-signer needs to sign offline.
///
/// The signed bytes are a function of these values, so they are fixed at
/// publish time and never edited afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignMetadata {
    /// Account number of the multisig account
    pub account: u64,
    /// Sequence number the transaction is signed for
    pub sequence: u64,
    /// Chain ID the transaction is signed for
    #[serde(rename = "chain-id")]
    pub chain_id: String,
    /// Free-form note shown to signers
    #[serde(default)]
    pub description: String,
}

impl SignMetadata {
    pub fn new(account: u64, sequence: u64, chain_id: impl Into<String>) -> Self {
        Self {
            account,
            sequence,
            chain_id: chain_id.into(),
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Encode as the JSON object stored in the `signdata` file
    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    pub fn from_json(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}
