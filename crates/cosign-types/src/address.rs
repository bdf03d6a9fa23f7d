//! Bech32 address helpers
//!
//! Keys are configured with one address; each chain renders it under its own
//! human-readable prefix.

use bech32::{Bech32, Hrp};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AddressError {
    #[error("invalid bech32 address {address}: {reason}")]
    Decode { address: String, reason: String },

    #[error("invalid bech32 prefix {prefix}: {reason}")]
    Prefix { prefix: String, reason: String },

    #[error("cannot encode address with prefix {prefix}: {reason}")]
    Encode { prefix: String, reason: String },
}

/// Re-encode `address` under `prefix`, keeping the payload bytes
pub fn convert_prefix(address: &str, prefix: &str) -> Result<String, AddressError> {
    let (_, data) = bech32::decode(address).map_err(|e| AddressError::Decode {
        address: address.to_string(),
        reason: e.to_string(),
    })?;

    let hrp = Hrp::parse(prefix).map_err(|e| AddressError::Prefix {
        prefix: prefix.to_string(),
        reason: e.to_string(),
    })?;

    bech32::encode::<Bech32>(hrp, &data).map_err(|e| AddressError::Encode {
        prefix: prefix.to_string(),
        reason: e.to_string(),
    })
}

/// The human-readable prefix of `address`
pub fn prefix_of(address: &str) -> Result<String, AddressError> {
    let (hrp, _) = bech32::decode(address).map_err(|e| AddressError::Decode {
        address: address.to_string(),
        reason: e.to_string(),
    })?;
    Ok(hrp.to_string())
}
