//! Publish coordinator
//!
//! Creates a new version holding an unsigned payload and its signing
//! metadata. Versions under one chain/key pair are a dense sequence starting
//! at 0; `additional` appends the next one and `force` rewrites version 0.

use crate::Coordinator;
use cosign_chain::AccountQuery;
use cosign_errors::{Error, Result};
use cosign_store::BlobStore;
use cosign_types::{SignMetadata, TxFile, TxKey, TxVersion};
use tracing::{info, warn};

/// How to treat transactions already published under the same chain/key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConflictPolicy {
    /// Refuse when anything exists
    #[default]
    None,
    /// Overwrite version 0
    Force,
    /// Queue after the highest existing version
    Additional,
}

impl ConflictPolicy {
    pub fn from_flags(force: bool, additional: bool) -> Result<Self> {
        match (force, additional) {
            (true, true) => Err(Error::InputConflict(
                "cannot specify both --force and --additional".to_string(),
            )),
            (true, false) => Ok(ConflictPolicy::Force),
            (false, true) => Ok(ConflictPolicy::Additional),
            (false, false) => Ok(ConflictPolicy::None),
        }
    }
}

/// Inputs of a publish
#[derive(Debug, Clone)]
pub struct PublishRequest {
    pub key: TxKey,
    pub chain_id: String,
    pub payload: Vec<u8>,
    /// Multisig address, used when querying the node
    pub address: String,
    /// Pinned account number
    pub account: Option<u64>,
    /// Pinned sequence
    pub sequence: Option<u64>,
    /// Node to query when account or sequence is not pinned
    pub node: Option<String>,
    pub policy: ConflictPolicy,
    pub description: String,
}

/// What a publish wrote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    pub version: TxVersion,
    pub metadata: SignMetadata,
}

impl<S: BlobStore> Coordinator<S> {
    pub async fn publish<A>(&self, request: &PublishRequest, accounts: &A) -> Result<Published>
    where
        A: AccountQuery + ?Sized,
    {
        let (account, sequence) = self.resolve_numbers(request, accounts).await?;

        let key = &request.key;
        let existing = self.inspector().list_versions(key).await?;
        let index = match (request.policy, existing.last()) {
            (ConflictPolicy::None, Some(_)) => {
                return Err(Error::AlreadyExists {
                    prefix: key.prefix(),
                })
            }
            (ConflictPolicy::Force | ConflictPolicy::Additional, None) => {
                return Err(Error::NothingToModify {
                    prefix: key.prefix(),
                })
            }
            (ConflictPolicy::Additional, Some(&highest)) => highest + 1,
            (ConflictPolicy::None | ConflictPolicy::Force, _) => 0,
        };

        // the queued transactions ahead of this one will consume sequences
        let sequence = match request.sequence {
            Some(_) => sequence,
            None => sequence.saturating_add(index),
        };

        let version = key.version(index);
        if request.policy == ConflictPolicy::Force {
            let stale: Vec<String> = self
                .inspector()
                .list_files(&version)
                .await?
                .iter()
                .map(|file| version.path(file))
                .collect();
            info!(%version, count = stale.len(), "overwriting existing version");
            self.remove_all(&version.prefix(), &stale).await?;
        }

        let metadata = SignMetadata::new(account, sequence, request.chain_id.clone())
            .with_description(request.description.clone());
        let encoded = metadata.to_json().map_err(|e| Error::CorruptMetadata {
            path: version.path(&TxFile::SignData),
            reason: e.to_string(),
        })?;

        self.store()
            .put(&version.path(&TxFile::Unsigned), request.payload.clone())
            .await?;
        // a payload without metadata reads as "not yet signable"
        self.store()
            .put(&version.path(&TxFile::SignData), encoded)
            .await?;

        info!(%version, account, sequence, "published transaction");
        Ok(Published { version, metadata })
    }

    async fn resolve_numbers<A>(&self, request: &PublishRequest, accounts: &A) -> Result<(u64, u64)>
    where
        A: AccountQuery + ?Sized,
    {
        if let (Some(account), Some(sequence)) = (request.account, request.sequence) {
            return Ok((account, sequence));
        }

        let node = match request.node.as_deref().filter(|n| !n.is_empty()) {
            Some(node) => node,
            None => {
                warn!("no account/sequence given and no node to query");
                return Err(Error::InsufficientContext(
                    "if --account and --sequence are not provided, a node must be specified \
                     in the config or with --node"
                        .to_string(),
                ));
            }
        };

        let queried = accounts.account(&request.address, node).await?;
        Ok((
            request.account.unwrap_or(queried.account_number),
            request.sequence.unwrap_or(queried.sequence),
        ))
    }
}
