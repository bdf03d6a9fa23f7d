//! Test doubles for the store and the chain services

use async_trait::async_trait;
use cosign_chain::{AccountNumbers, AccountQuery, AggregateRequest, Broadcaster, Signer, TxResult};
use cosign_errors::{Error, Result};
use cosign_store::{BlobStore, MemStore, StoreError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Put a small object at each key
pub async fn seed(store: &impl BlobStore, keys: &[&str]) {
    for key in keys {
        store.put(key, b"x".to_vec()).await.unwrap();
    }
}

/// Store wrapper that counts calls and injects failures
pub struct FlakyStore {
    inner: MemStore,
    fail_listing: bool,
    /// Deletions succeed this many times, then fail
    deletes_before_failure: Option<usize>,
    pub deletes: AtomicUsize,
    pub waits: AtomicUsize,
    pub puts: AtomicUsize,
}

impl FlakyStore {
    pub fn new(inner: MemStore) -> Self {
        Self {
            inner,
            fail_listing: false,
            deletes_before_failure: None,
            deletes: AtomicUsize::new(0),
            waits: AtomicUsize::new(0),
            puts: AtomicUsize::new(0),
        }
    }

    pub fn fail_listing(mut self) -> Self {
        self.fail_listing = true;
        self
    }

    pub fn fail_deletes_after(mut self, successes: usize) -> Self {
        self.deletes_before_failure = Some(successes);
        self
    }

    pub fn inner(&self) -> &MemStore {
        &self.inner
    }
}

#[async_trait]
impl BlobStore for FlakyStore {
    async fn get(&self, path: &str) -> cosign_store::Result<Option<Vec<u8>>> {
        self.inner.get(path).await
    }

    async fn put(&self, path: &str, data: Vec<u8>) -> cosign_store::Result<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.inner.put(path, data).await
    }

    async fn list_all(&self) -> cosign_store::Result<Vec<String>> {
        if self.fail_listing {
            return Err(StoreError::backend("listing bucket", "connection refused"));
        }
        self.inner.list_all().await
    }

    async fn delete(&self, path: &str) -> cosign_store::Result<()> {
        let done = self.deletes.fetch_add(1, Ordering::SeqCst);
        if self.deletes_before_failure.is_some_and(|n| done >= n) {
            return Err(StoreError::backend(format!("deleting {path}"), "access denied"));
        }
        self.inner.delete(path).await
    }

    async fn wait_until_absent(
        &self,
        path: &str,
        timeout: Duration,
        poll_interval: Duration,
    ) -> cosign_store::Result<()> {
        self.waits.fetch_add(1, Ordering::SeqCst);
        self.inner.wait_until_absent(path, timeout, poll_interval).await
    }
}

/// Scripted chain client recording what it was asked to do
pub struct MockChain {
    pub account: Option<AccountNumbers>,
    pub result: TxResult,
    pub fail_submit: bool,
    pub signed_by: Mutex<Vec<String>>,
    pub aggregated: Mutex<Vec<Vec<String>>>,
    pub submitted_to: Mutex<Vec<String>>,
    pub account_queries: AtomicUsize,
}

impl Default for MockChain {
    fn default() -> Self {
        Self {
            account: Some(AccountNumbers {
                account_number: 5,
                sequence: 12,
            }),
            result: TxResult {
                code: 0,
                txhash: "ABCDEF".to_string(),
            },
            fail_submit: false,
            signed_by: Mutex::new(Vec::new()),
            aggregated: Mutex::new(Vec::new()),
            submitted_to: Mutex::new(Vec::new()),
            account_queries: AtomicUsize::new(0),
        }
    }
}

impl MockChain {
    pub fn with_code(code: u32) -> Self {
        Self {
            result: TxResult {
                code,
                txhash: "FAILED".to_string(),
            },
            ..Self::default()
        }
    }
}

#[async_trait]
impl Signer for MockChain {
    async fn sign(&self, request: cosign_chain::SignRequest<'_>) -> Result<Vec<u8>> {
        self.signed_by.lock().unwrap().push(request.from.to_string());
        Ok(format!("sig:{}:{}", request.from, request.metadata.sequence).into_bytes())
    }
}

#[async_trait]
impl Broadcaster for MockChain {
    async fn aggregate(&self, request: AggregateRequest<'_>) -> Result<Vec<u8>> {
        let signers = request.signatures.iter().map(|(name, _)| name.clone()).collect();
        self.aggregated.lock().unwrap().push(signers);
        Ok(b"signed".to_vec())
    }

    async fn submit(&self, _signed: &[u8], node: &str) -> Result<TxResult> {
        self.submitted_to.lock().unwrap().push(node.to_string());
        if self.fail_submit {
            return Err(Error::SubprocessFailed {
                command: "simd tx broadcast".to_string(),
                output: "connection refused".to_string(),
                source: None,
            });
        }
        Ok(self.result.clone())
    }
}

#[async_trait]
impl AccountQuery for MockChain {
    async fn account(&self, _address: &str, _node: &str) -> Result<AccountNumbers> {
        self.account_queries.fetch_add(1, Ordering::SeqCst);
        self.account
            .ok_or_else(|| Error::UnparsableResult("account not found".to_string()))
    }
}
