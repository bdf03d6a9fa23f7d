//! Transaction lifecycle coordinators for cosign.
//!
//! A transaction moves through the shared store in four steps: it is
//! published as an unsigned payload plus signing metadata, each co-signer adds
//! a signature artifact, and once the threshold is met any party aggregates
//! and broadcasts it, after which the version is removed. Every operation
//! re-derives state from a fresh listing; nothing is cached between runs.

pub mod broadcast;
pub mod delete;
pub mod inspector;
pub mod publish;
pub mod sign;

#[cfg(test)]
pub(crate) mod testing;

use cosign_errors::{Error, Result};
use cosign_store::BlobStore;
use cosign_types::{PathError, TimeoutConfig};
use std::time::Duration;
use tracing::debug;

pub use broadcast::{BroadcastOutcome, BroadcastRequest, CleanupPolicy};
pub use delete::DeleteOutcome;
pub use inspector::{Inspector, Listing, VersionContents};
pub use publish::{ConflictPolicy, PublishRequest, Published};
pub use sign::{SignBundle, SignRequest};

/// Bounds on store polling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    /// Limit for a deleted object to disappear
    pub delete_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self::from(&TimeoutConfig::default())
    }
}

impl From<&TimeoutConfig> for Settings {
    fn from(timeouts: &TimeoutConfig) -> Self {
        Self {
            delete_timeout: timeouts.delete(),
            poll_interval: timeouts.poll_interval(),
        }
    }
}

/// Entry point for the lifecycle operations on one store
pub struct Coordinator<S> {
    store: S,
    settings: Settings,
}

impl<S: BlobStore> Coordinator<S> {
    pub fn new(store: S, settings: Settings) -> Self {
        Self { store, settings }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn inspector(&self) -> Inspector<'_, S> {
        Inspector::new(&self.store)
    }

    /// Delete `paths` one at a time, confirming each is gone before the next.
    ///
    /// A failure after at least one confirmed removal is reported as
    /// [`Error::PartialCleanup`] so the operator can see what is left.
    pub(crate) async fn remove_all(&self, prefix: &str, paths: &[String]) -> Result<()> {
        self.try_remove_all(paths).await.map_err(|failure| {
            if failure.removed.is_empty() {
                return failure.source;
            }
            Error::PartialCleanup {
                prefix: prefix.to_string(),
                removed: failure.removed,
                remaining: failure.remaining,
                source: Box::new(failure.source),
            }
        })
    }

    pub(crate) async fn try_remove_all(
        &self,
        paths: &[String],
    ) -> std::result::Result<(), CleanupFailure> {
        let mut removed = Vec::with_capacity(paths.len());
        for (i, path) in paths.iter().enumerate() {
            if let Err(source) = self.remove_one(path).await {
                return Err(CleanupFailure {
                    removed,
                    remaining: paths[i..].to_vec(),
                    source,
                });
            }
            removed.push(path.clone());
        }
        Ok(())
    }

    async fn remove_one(&self, path: &str) -> Result<()> {
        debug!(path, "deleting object");
        self.store.delete(path).await?;
        self.store
            .wait_until_absent(path, self.settings.delete_timeout, self.settings.poll_interval)
            .await?;
        Ok(())
    }
}

/// Where a sequence of deletions stopped
#[derive(Debug)]
pub(crate) struct CleanupFailure {
    pub removed: Vec<String>,
    pub remaining: Vec<String>,
    pub source: Error,
}

/// Store keys that do not fit the path scheme
pub(crate) fn classification(err: PathError) -> Error {
    Error::Classification(err.to_string())
}
