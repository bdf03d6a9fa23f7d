//! Fee denom lookup
//!
//! The configured denom wins. Otherwise the first fee token listed for the
//! chain in the cosmos chain registry is used, which only works when the
//! configured chain name matches the registry's directory name.

use crate::ChainError;
use cosign_types::ChainProfile;
use reqwest::{Client as HttpClient, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

pub const CHAIN_REGISTRY_URL: &str =
    "https://raw.githubusercontent.com/cosmos/chain-registry/master";

#[derive(Deserialize)]
struct ChainInfo {
    #[serde(default)]
    fees: Fees,
}

#[derive(Deserialize, Default)]
struct Fees {
    #[serde(default)]
    fee_tokens: Vec<FeeToken>,
}

#[derive(Deserialize)]
struct FeeToken {
    #[serde(default)]
    denom: String,
}

/// Client for the chain registry
pub struct RegistryClient {
    client: HttpClient,
    base_url: String,
}

impl RegistryClient {
    pub fn new() -> Result<Self, ChainError> {
        Self::with_base_url(CHAIN_REGISTRY_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, ChainError> {
        let client = HttpClient::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ChainError::Registry(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// First fee token of `chain_name`
    pub async fn fee_denom(&self, chain_name: &str) -> Result<String, ChainError> {
        let url = format!("{}/{}/chain.json", self.base_url.trim_end_matches('/'), chain_name);
        debug!(%url, "querying chain registry");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ChainError::Registry(e.to_string()))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(ChainError::Registry(format!(
                "{chain_name} is not in the chain registry; the chain name in the \
                 configuration must match its folder name in the registry"
            )));
        }
        let body = response
            .error_for_status()
            .map_err(|e| ChainError::Registry(e.to_string()))?
            .bytes()
            .await
            .map_err(|e| ChainError::Registry(e.to_string()))?;

        first_fee_token(&body, chain_name)
    }
}

fn first_fee_token(chain_json: &[u8], chain_name: &str) -> Result<String, ChainError> {
    let info: ChainInfo =
        serde_json::from_slice(chain_json).map_err(|e| ChainError::Registry(e.to_string()))?;
    info.fees
        .fee_tokens
        .into_iter()
        .next()
        .map(|token| token.denom)
        .filter(|denom| !denom.is_empty())
        .ok_or_else(|| {
            ChainError::Registry(format!(
                "no fee denom for the {chain_name} chain in the registry"
            ))
        })
}

/// Fee denom for `chain`: configured value, else the registry
pub async fn resolve_denom(chain: &ChainProfile) -> Result<String, ChainError> {
    if !chain.denom.is_empty() {
        return Ok(chain.denom.clone());
    }
    RegistryClient::new()?.fee_denom(&chain.name).await
}

/// Denom of the first fee coin in an unsigned transaction
pub fn payload_fee_denom(payload: &[u8]) -> Option<String> {
    let tx: Value = serde_json::from_slice(payload).ok()?;
    tx.pointer("/auth_info/fee/amount/0/denom")
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_fee_token() {
        let json = br#"{"chain_name":"osmosis","fees":{"fee_tokens":[{"denom":"uosmo","fixed_min_gas_price":0},{"denom":"uion"}]}}"#;
        assert_eq!(first_fee_token(json, "osmosis").unwrap(), "uosmo");
        assert!(first_fee_token(br#"{"chain_name":"x"}"#, "x").is_err());
        assert!(first_fee_token(br#"{"fees":{"fee_tokens":[]}}"#, "x").is_err());
    }

    #[tokio::test]
    async fn test_configured_denom_skips_registry() {
        let chain = ChainProfile {
            name: "not-a-registry-chain".into(),
            id: "local-1".into(),
            binary: "simd".into(),
            prefix: "cosmos".into(),
            node: String::new(),
            denom: "stake".into(),
        };
        assert_eq!(resolve_denom(&chain).await.unwrap(), "stake");
    }

    #[test]
    fn test_payload_fee_denom() {
        let tx = br#"{"body":{"messages":[]},"auth_info":{"signer_infos":[],"fee":{"amount":[{"denom":"uatom","amount":"5000"}],"gas_limit":"300000"}},"signatures":[]}"#;
        assert_eq!(payload_fee_denom(tx).as_deref(), Some("uatom"));
        assert_eq!(payload_fee_denom(br#"{"auth_info":{"fee":{"amount":[]}}}"#), None);
        assert_eq!(payload_fee_denom(b"not json"), None);
    }
}
