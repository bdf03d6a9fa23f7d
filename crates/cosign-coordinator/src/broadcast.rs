//! Broadcast coordinator
//!
//! Checks run in a fixed order: no older version may still be pending, then
//! the signature count must reach the threshold. Only then is anything
//! downloaded, aggregated and submitted. The coordinator does not judge the
//! on-chain result; what happens to the version afterwards is decided by the
//! [`CleanupPolicy`].

use crate::Coordinator;
use cosign_chain::{AggregateRequest, Broadcaster};
use cosign_errors::{Error, Result};
use cosign_store::BlobStore;
use cosign_types::{SignMetadata, TxFile, TxVersion};
use tracing::{info, warn};

/// What to do with a version after its transaction was submitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CleanupPolicy {
    /// Remove the version whatever the result code, so a possibly failed
    /// transaction is never broadcast twice
    #[default]
    Always,
    /// Keep the version for a retry when the result code is non-zero
    OnSuccess,
}

/// Inputs of a broadcast
#[derive(Debug, Clone)]
pub struct BroadcastRequest {
    pub version: TxVersion,
    /// Local name of the multisig key used for aggregation
    pub multisig_key: String,
    /// Node to submit to
    pub node: Option<String>,
    /// Signatures required
    pub threshold: usize,
    pub cleanup: CleanupPolicy,
}

/// Result of a broadcast
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastOutcome {
    pub code: u32,
    pub txhash: String,
    /// Whether the version was removed from the store
    pub removed: bool,
}

impl<S: BlobStore> Coordinator<S> {
    pub async fn broadcast<B>(
        &self,
        request: &BroadcastRequest,
        broadcaster: &B,
    ) -> Result<BroadcastOutcome>
    where
        B: Broadcaster + ?Sized,
    {
        let version = &request.version;
        let node = request
            .node
            .as_deref()
            .filter(|n| !n.is_empty())
            .ok_or_else(|| {
                Error::Config(format!(
                    "no node configured for chain {}; pass --node",
                    version.key().chain()
                ))
            })?;
        if request.multisig_key.is_empty() {
            return Err(Error::Config(format!(
                "no local multisig key name for {}; set local_name or pass --key",
                version.key().key()
            )));
        }

        let inspector = self.inspector();
        let versions = inspector.list_versions(version.key()).await?;
        if let Some(&pending) = versions.range(..version.index()).next() {
            return Err(Error::OutOfOrderBroadcast {
                requested: version.index(),
                pending,
            });
        }

        let files = inspector.list_files(version).await?;
        let signers: Vec<&str> = files
            .iter()
            .filter_map(|file| match file {
                TxFile::Signature(name) => Some(name.as_str()),
                _ => None,
            })
            .collect();
        if signers.len() < request.threshold {
            return Err(Error::InsufficientSignatures {
                required: request.threshold,
                actual: signers.len(),
            });
        }

        let payload = self.fetch(version, &TxFile::Unsigned).await?;
        let metadata_bytes = self.fetch(version, &TxFile::SignData).await?;
        let metadata = SignMetadata::from_json(&metadata_bytes).map_err(|e| {
            Error::CorruptMetadata {
                path: version.path(&TxFile::SignData),
                reason: e.to_string(),
            }
        })?;
        let mut signatures = Vec::with_capacity(signers.len());
        for signer in &signers {
            let signature = self
                .fetch(version, &TxFile::Signature(signer.to_string()))
                .await?;
            signatures.push((signer.to_string(), signature));
        }

        let signed = broadcaster
            .aggregate(AggregateRequest {
                payload: &payload,
                multisig_key: &request.multisig_key,
                signatures: &signatures,
                metadata: &metadata,
                node: Some(node),
            })
            .await?;
        info!(%version, signatures = signatures.len(), "aggregated signatures");

        let result = broadcaster.submit(&signed, node).await?;
        info!(%version, code = result.code, txhash = %result.txhash, "submitted transaction");

        let remove = match request.cleanup {
            CleanupPolicy::Always => true,
            CleanupPolicy::OnSuccess => result.is_success(),
        };
        if remove {
            let paths: Vec<String> = files.iter().map(|file| version.path(file)).collect();
            // already submitted: the error must carry the hash
            if let Err(failure) = self.try_remove_all(&paths).await {
                return Err(Error::CleanupAfterBroadcast {
                    code: result.code,
                    txhash: result.txhash,
                    prefix: version.prefix(),
                    removed: failure.removed,
                    remaining: failure.remaining,
                    source: Box::new(failure.source),
                });
            }
            info!(%version, "removed broadcast version");
        } else {
            warn!(%version, code = result.code, "transaction failed, keeping version for retry");
        }

        Ok(BroadcastOutcome {
            code: result.code,
            txhash: result.txhash,
            removed: remove,
        })
    }
}
