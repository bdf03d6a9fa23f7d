//! Submission result parsing

use crate::ChainError;
use serde::Deserialize;

/// Result code and hash reported by `tx broadcast`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxResult {
    pub code: u32,
    pub txhash: String,
}

#[derive(Deserialize)]
struct JsonResult {
    code: Option<u32>,
    txhash: Option<String>,
}

impl TxResult {
    /// Parse YAML-ish text (`code: 0` / `txhash: ABC…` lines) or a JSON object
    pub fn parse(output: &[u8]) -> Result<Self, ChainError> {
        let text = String::from_utf8_lossy(output);
        let trimmed = text.trim_start();

        // stderr warnings may follow the JSON object
        if trimmed.starts_with('{') {
            let mut values = serde_json::Deserializer::from_str(trimmed).into_iter::<JsonResult>();
            if let Some(Ok(json)) = values.next() {
                return Self::complete(json.code, json.txhash);
            }
        }

        let mut code = None;
        let mut txhash = None;
        for line in text.lines().map(str::trim) {
            if let Some(value) = line.strip_prefix("code:") {
                if code.is_none() {
                    let value = value.trim();
                    code = Some(value.parse::<u32>().map_err(|_| {
                        ChainError::Unparsable(format!("code {value:?} in tx response is not an integer"))
                    })?);
                }
            } else if let Some(value) = line.strip_prefix("txhash:") {
                if txhash.is_none() {
                    txhash = Some(value.trim().trim_matches('"').to_string());
                }
            }
        }
        Self::complete(code, txhash)
    }

    fn complete(code: Option<u32>, txhash: Option<String>) -> Result<Self, ChainError> {
        let code =
            code.ok_or_else(|| ChainError::Unparsable("couldn't find code in tx response".into()))?;
        let txhash = txhash
            .filter(|h| !h.is_empty())
            .ok_or_else(|| ChainError::Unparsable("couldn't find txhash in tx response".into()))?;
        Ok(Self { code, txhash })
    }

    pub fn is_success(&self) -> bool {
        self.code == 0
    }
}
