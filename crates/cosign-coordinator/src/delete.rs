//! Delete coordinator

use crate::Coordinator;
use cosign_errors::Result;
use cosign_store::BlobStore;
use cosign_types::TxVersion;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The version held no files
    NothingToDelete,
    /// Paths removed, each confirmed absent
    Removed(Vec<String>),
}

impl<S: BlobStore> Coordinator<S> {
    /// Remove every file of `version`, with no ordering or threshold checks
    pub async fn delete(&self, version: &TxVersion) -> Result<DeleteOutcome> {
        let files = self.inspector().list_files(version).await?;
        if files.is_empty() {
            info!(%version, "nothing to delete");
            return Ok(DeleteOutcome::NothingToDelete);
        }

        let paths: Vec<String> = files.iter().map(|file| version.path(file)).collect();
        self.remove_all(&version.prefix(), &paths).await?;
        info!(%version, count = paths.len(), "deleted version");
        Ok(DeleteOutcome::Removed(paths))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{seed, FlakyStore};
    use crate::Settings;
    use cosign_errors::Error;
    use cosign_store::MemStore;
    use cosign_types::TxKey;
    use std::sync::atomic::Ordering;

    fn version(index: u64) -> TxVersion {
        TxKey::new("osmosis", "val").unwrap().version(index)
    }

    #[tokio::test]
    async fn test_empty_version_touches_nothing() {
        let c = Coordinator::new(FlakyStore::new(MemStore::new()), Settings::default());
        assert_eq!(
            c.delete(&version(0)).await.unwrap(),
            DeleteOutcome::NothingToDelete
        );
        assert_eq!(c.store().deletes.load(Ordering::SeqCst), 0);
        assert_eq!(c.store().waits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_deletes_only_the_requested_version() {
        let c = Coordinator::new(MemStore::new(), Settings::default());
        seed(
            c.store(),
            &[
                "osmosis/val/1/unsigned",
                "osmosis/val/1/signdata",
                "osmosis/val/1/alice",
                "osmosis/val/10/unsigned",
            ],
        )
        .await;

        let outcome = c.delete(&version(1)).await.unwrap();
        assert_eq!(
            outcome,
            DeleteOutcome::Removed(vec![
                "osmosis/val/1/unsigned".to_string(),
                "osmosis/val/1/signdata".to_string(),
                "osmosis/val/1/alice".to_string(),
            ])
        );
        assert_eq!(
            c.store().list_all().await.unwrap(),
            vec!["osmosis/val/10/unsigned".to_string()]
        );
    }

    #[tokio::test]
    async fn test_first_failure_is_reported_as_is() {
        let store = FlakyStore::new(MemStore::new()).fail_deletes_after(0);
        seed(&store, &["osmosis/val/0/unsigned"]).await;
        let c = Coordinator::new(store, Settings::default());

        let err = c.delete(&version(0)).await.unwrap_err();
        assert!(matches!(err, Error::StoreUnavailable { .. }));
    }
}
