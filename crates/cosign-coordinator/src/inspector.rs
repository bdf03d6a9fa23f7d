//! Directory inspector
//!
//! Reconstructs transaction state from prefix listings. An empty listing is
//! the normal "nothing published yet" state; only a failed listing is an
//! error.

use crate::classification;
use cosign_errors::Result;
use cosign_store::BlobStore;
use cosign_types::{Placement, TxFile, TxKey, TxPath, TxVersion};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// What one version holds
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionContents {
    pub has_payload: bool,
    pub has_metadata: bool,
    /// Names of the signers whose artifacts are present, sorted
    pub signers: Vec<String>,
}

impl VersionContents {
    pub fn from_files<'a>(files: impl IntoIterator<Item = &'a TxFile>) -> Self {
        let mut contents = Self::default();
        for file in files {
            match file {
                TxFile::Unsigned => contents.has_payload = true,
                TxFile::SignData => contents.has_metadata = true,
                TxFile::Signature(name) => contents.signers.push(name.clone()),
            }
        }
        contents.signers.sort();
        contents
    }

    pub fn signature_count(&self) -> usize {
        self.signers.len()
    }

    /// Both the payload and its metadata are present
    pub fn is_signable(&self) -> bool {
        self.has_payload && self.has_metadata
    }
}

/// Everything in the store, grouped by version
#[derive(Debug, Default)]
pub struct Listing {
    pub versions: BTreeMap<TxVersion, VersionContents>,
    /// Keys that do not fit `<chain>/<key>/<version>/<file>`
    pub unrecognized: Vec<String>,
}

/// Read-only view over a store
pub struct Inspector<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: BlobStore + ?Sized> Inspector<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Version indices present under `key`
    pub async fn list_versions(&self, key: &TxKey) -> Result<BTreeSet<u64>> {
        let prefix = key.prefix();
        let mut versions = BTreeSet::new();

        for object in self.store.list_prefix(&prefix).await? {
            match key.placement(&object).map_err(classification)? {
                Placement::Version(index) => {
                    versions.insert(index);
                }
                Placement::Loose => warn!(path = %object, "ignoring object outside any version"),
                Placement::Marker => {}
            }
        }

        debug!(%key, ?versions, "listed versions");
        Ok(versions)
    }

    /// Files present in `version`
    pub async fn list_files(&self, version: &TxVersion) -> Result<BTreeSet<TxFile>> {
        let mut files = BTreeSet::new();
        for object in self.store.list_prefix(&version.prefix()).await? {
            if let Some(file) = version.file_of(&object).map_err(classification)? {
                files.insert(file);
            }
        }
        debug!(%version, count = files.len(), "listed files");
        Ok(files)
    }

    pub async fn version_contents(&self, version: &TxVersion) -> Result<VersionContents> {
        let files = self.list_files(version).await?;
        Ok(VersionContents::from_files(&files))
    }

    /// Every version in the store. Keys that do not fit the layout are
    /// collected rather than rejected, since this is a diagnostic view.
    pub async fn list_everything(&self) -> Result<Listing> {
        let mut listing = Listing::default();
        for object in self.store.list_all().await? {
            match TxPath::parse(&object) {
                Ok(Some(path)) => {
                    let contents = listing.versions.entry(path.version).or_default();
                    match path.file {
                        TxFile::Unsigned => contents.has_payload = true,
                        TxFile::SignData => contents.has_metadata = true,
                        TxFile::Signature(name) => contents.signers.push(name),
                    }
                }
                Ok(None) => {}
                Err(_) => listing.unrecognized.push(object),
            }
        }
        for contents in listing.versions.values_mut() {
            contents.signers.sort();
        }
        Ok(listing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{seed, FlakyStore};
    use cosign_errors::{codes, Error};
    use cosign_store::MemStore;

    fn key() -> TxKey {
        TxKey::new("cosmoshub", "val").unwrap()
    }

    #[tokio::test]
    async fn test_empty_store_is_not_an_error() {
        let store = MemStore::new();
        let inspector = Inspector::new(&store);
        assert!(inspector.list_versions(&key()).await.unwrap().is_empty());
        assert!(inspector
            .list_files(&key().version(0))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_versions_are_component_exact() {
        let store = MemStore::new();
        seed(
            &store,
            &[
                "cosmoshub/val/0/unsigned",
                "cosmoshub/val/2/unsigned",
                "cosmoshub/val/10/alice",
                "cosmoshub/val2/7/unsigned",
                "cosmoshub/val/",
                "cosmoshub/val/readme",
            ],
        )
        .await;

        let inspector = Inspector::new(&store);
        let versions = inspector.list_versions(&key()).await.unwrap();
        assert_eq!(versions.into_iter().collect::<Vec<_>>(), vec![0, 2, 10]);

        let files = inspector.list_files(&key().version(1)).await.unwrap();
        assert!(files.is_empty(), "version 1 must not see version 10");
    }

    #[tokio::test]
    async fn test_files_are_classified() {
        let store = MemStore::new();
        seed(
            &store,
            &[
                "cosmoshub/val/3/unsigned",
                "cosmoshub/val/3/signdata",
                "cosmoshub/val/3/bob",
                "cosmoshub/val/3/alice",
                "cosmoshub/val/3/",
            ],
        )
        .await;

        let contents = Inspector::new(&store)
            .version_contents(&key().version(3))
            .await
            .unwrap();
        assert!(contents.is_signable());
        assert_eq!(contents.signers, vec!["alice", "bob"]);
        assert_eq!(contents.signature_count(), 2);
    }

    #[tokio::test]
    async fn test_bad_layout_is_a_classification_error() {
        let store = MemStore::new();
        seed(&store, &["cosmoshub/val/v1/unsigned"]).await;
        let err = Inspector::new(&store)
            .list_versions(&key())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Classification(_)));

        let store = MemStore::new();
        seed(&store, &["cosmoshub/val/0/extra/alice"]).await;
        let err = Inspector::new(&store)
            .list_files(&key().version(0))
            .await
            .unwrap_err();
        assert_eq!(err.code(), codes::INVALID_DATA);
    }

    #[tokio::test]
    async fn test_listing_failure_is_store_unavailable() {
        let store = FlakyStore::new(MemStore::new()).fail_listing();
        let err = Inspector::new(&store)
            .list_versions(&key())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::StoreUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_list_everything() {
        let store = MemStore::new();
        seed(
            &store,
            &[
                "cosmoshub/val/0/unsigned",
                "cosmoshub/val/0/signdata",
                "osmosis/val/1/carol",
                "stray-file",
                "osmosis/",
            ],
        )
        .await;

        let listing = Inspector::new(&store).list_everything().await.unwrap();
        assert_eq!(listing.versions.len(), 2);
        assert_eq!(listing.unrecognized, vec!["stray-file".to_string()]);

        let osmo = TxKey::new("osmosis", "val").unwrap().version(1);
        assert_eq!(listing.versions[&osmo].signers, vec!["carol"]);
        assert!(!listing.versions[&osmo].is_signable());
    }
}
