//! Chain client adapter for cosign.
//!
//! Coordinators never construct, sign or broadcast transactions themselves.
//! They talk to the [`Signer`], [`Broadcaster`] and [`AccountQuery`] services
//! defined here; [`ChainBinary`] implements all three by running the chain's
//! own command line client.

pub mod account;
pub mod binary;
pub mod generate;
pub mod registry;
pub mod result;

use async_trait::async_trait;
use cosign_types::SignMetadata;
use std::time::Duration;
use thiserror::Error;

pub use account::{parse_account, parse_balance, AccountNumbers};
pub use binary::ChainBinary;
pub use generate::{authz_expiration, AuthzMsg, GenerateOptions, GenerateTx, VoteOption};
pub use registry::{payload_fee_denom, resolve_denom, RegistryClient};
pub use result::TxResult;

/// Chain adapter error types
#[derive(Error, Debug)]
pub enum ChainError {
    /// The binary could not be started
    #[error("failed to start {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The binary exited unsuccessfully
    #[error("{command} exited with {status}")]
    Exit {
        command: String,
        status: String,
        output: String,
    },

    #[error("{command} did not finish within {after:?}")]
    Timeout { command: String, after: Duration },

    /// Output did not have the expected shape
    #[error("unparsable output: {0}")]
    Unparsable(String),

    #[error("chain registry lookup failed: {0}")]
    Registry(String),

    #[error("balance {balance} is less than {required} (amount plus fee); the transaction would fail")]
    InsufficientBalance { balance: String, required: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ChainError> for cosign_errors::Error {
    fn from(err: ChainError) -> Self {
        use cosign_errors::Error;

        match err {
            ChainError::Spawn { command, source } => Error::SubprocessFailed {
                command,
                output: String::new(),
                source: Some(Box::new(source)),
            },
            ChainError::Exit {
                command,
                status,
                output,
            } => Error::SubprocessFailed {
                command,
                output: format!("{status}\n{output}"),
                source: None,
            },
            ChainError::Timeout { command, after } => Error::Timeout {
                operation: format!("running {command}"),
                after,
            },
            ChainError::Unparsable(msg) => Error::UnparsableResult(msg),
            ChainError::Registry(msg) => {
                Error::Config(format!("cannot find fee denom in the config or registry: {msg}"))
            }
            err @ ChainError::InsufficientBalance { .. } => Error::InputConflict(err.to_string()),
            ChainError::Io(e) => Error::Io(e),
        }
    }
}

/// Inputs of an offline signature
#[derive(Debug, Clone, Copy)]
pub struct SignRequest<'a> {
    /// Unsigned transaction payload
    pub payload: &'a [u8],
    /// Multisig group address, rendered for the target chain
    pub multisig_address: &'a str,
    /// Local key the operator signs with
    pub from: &'a str,
    pub metadata: &'a SignMetadata,
}

/// Inputs of an offline multisig aggregation
#[derive(Debug, Clone, Copy)]
pub struct AggregateRequest<'a> {
    pub payload: &'a [u8],
    /// Local name of the multisig key
    pub multisig_key: &'a str,
    /// `(signer, signature)` pairs in the order they are passed on
    pub signatures: &'a [(String, Vec<u8>)],
    pub metadata: &'a SignMetadata,
    pub node: Option<&'a str>,
}

/// Produces one co-signer's signature over an unsigned payload
#[async_trait]
pub trait Signer: Send + Sync {
    async fn sign(&self, request: SignRequest<'_>) -> cosign_errors::Result<Vec<u8>>;
}

/// Aggregates signatures and submits the signed transaction
#[async_trait]
pub trait Broadcaster: Send + Sync {
    /// Combine signatures into a fully signed transaction
    async fn aggregate(&self, request: AggregateRequest<'_>) -> cosign_errors::Result<Vec<u8>>;

    /// Submit a signed transaction to `node`
    async fn submit(&self, signed: &[u8], node: &str) -> cosign_errors::Result<TxResult>;
}

/// Looks up the account number and sequence of an address
#[async_trait]
pub trait AccountQuery: Send + Sync {
    async fn account(&self, address: &str, node: &str) -> cosign_errors::Result<AccountNumbers>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use cosign_errors::codes;

    #[test]
    fn test_error_mapping() {
        let err: cosign_errors::Error = ChainError::Exit {
            command: "gaiad tx sign".into(),
            status: "exit status: 1".into(),
            output: "key not found".into(),
        }
        .into();
        assert_eq!(err.code(), codes::SUBPROCESS_FAILED);
        assert!(err.to_string().contains("key not found"));

        let err: cosign_errors::Error = ChainError::Timeout {
            command: "gaiad tx broadcast".into(),
            after: Duration::from_secs(1),
        }
        .into();
        assert_eq!(err.code(), codes::TIMEOUT);

        let err: cosign_errors::Error = ChainError::Unparsable("no txhash".into()).into();
        assert_eq!(err.code(), codes::UNPARSABLE_RESULT);
    }
}
