//! Blob store gateway for cosign.
//!
//! Co-signers exchange transactions through a flat object namespace keyed by
//! slash-delimited paths. The store offers no transactions and no locks, and
//! listings may lag writes; callers re-derive state from a fresh listing on
//! every invocation.

pub mod fs;
pub mod mem;
pub mod s3;

use async_trait::async_trait;
use cosign_types::{Config, StoreBackend};
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::debug;

pub use fs::FsStore;
pub use mem::MemStore;
pub use s3::S3Store;

/// Boxed transport error
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Store error types
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("backend error while {context}: {source}")]
    Backend {
        context: String,
        #[source]
        source: BoxError,
    },

    #[error("{path} still present after {after:?}")]
    Timeout { path: String, after: Duration },
}

impl StoreError {
    pub fn backend(context: impl Into<String>, source: impl Into<BoxError>) -> Self {
        StoreError::Backend {
            context: context.into(),
            source: source.into(),
        }
    }
}

impl From<StoreError> for cosign_errors::Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidKey(key) => {
                cosign_errors::Error::Classification(format!("invalid store key {key:?}"))
            }
            StoreError::Backend { context, source } => cosign_errors::Error::store(context, source),
            StoreError::Timeout { path, after } => cosign_errors::Error::Timeout {
                operation: format!("waiting for {path} to disappear"),
                after,
            },
        }
    }
}

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Flat object store addressed by slash-delimited keys
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Fetch an object, `None` if it does not exist
    async fn get(&self, path: &str) -> Result<Option<Vec<u8>>>;

    /// Create or overwrite an object
    async fn put(&self, path: &str, data: Vec<u8>) -> Result<()>;

    /// Every key in the store
    async fn list_all(&self) -> Result<Vec<String>>;

    /// Keys starting with `prefix`
    async fn list_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .list_all()
            .await?
            .into_iter()
            .filter(|key| key.starts_with(prefix))
            .collect())
    }

    /// Remove an object. Removing a missing object is not an error.
    async fn delete(&self, path: &str) -> Result<()>;

    async fn exists(&self, path: &str) -> Result<bool> {
        Ok(self.get(path).await?.is_some())
    }

    /// Poll until `path` is gone, giving up after `timeout`
    async fn wait_until_absent(
        &self,
        path: &str,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if !self.exists(path).await? {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(StoreError::Timeout {
                    path: path.to_string(),
                    after: timeout,
                });
            }
            debug!(path, "object still present, polling again");
            tokio::time::sleep(poll_interval).await;
        }
    }
}

#[async_trait]
impl BlobStore for Box<dyn BlobStore> {
    async fn get(&self, path: &str) -> Result<Option<Vec<u8>>> {
        (**self).get(path).await
    }

    async fn put(&self, path: &str, data: Vec<u8>) -> Result<()> {
        (**self).put(path, data).await
    }

    async fn list_all(&self) -> Result<Vec<String>> {
        (**self).list_all().await
    }

    async fn list_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        (**self).list_prefix(prefix).await
    }

    async fn delete(&self, path: &str) -> Result<()> {
        (**self).delete(path).await
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        (**self).exists(path).await
    }

    async fn wait_until_absent(
        &self,
        path: &str,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Result<()> {
        (**self).wait_until_absent(path, timeout, poll_interval).await
    }
}

/// Open the backend selected in the configuration
pub async fn open(config: &Config) -> Result<Box<dyn BlobStore>> {
    match config.store.backend {
        StoreBackend::Fs => {
            let root = config
                .store
                .path
                .clone()
                .ok_or_else(|| StoreError::backend("opening fs store", "store.path is not set"))?;
            Ok(Box::new(FsStore::new(root)))
        }
        StoreBackend::S3 => Ok(Box::new(S3Store::connect(&config.aws).await?)),
    }
}
