//! Raw store access and address conversion

use crate::cli::{RawAction, RawCmd};
use crate::handler::{tx_key, Session};
use cosign_errors::{Error, Result};
use cosign_log::{info, warn};
use cosign_store::BlobStore;
use cosign_types::convert_prefix;
use std::path::Path;

pub(crate) fn bech32(address: &str, prefix: &str) -> Result<()> {
    let converted =
        convert_prefix(address, prefix).map_err(|e| Error::Classification(e.to_string()))?;
    println!("{converted}");
    Ok(())
}

/// `rel` names a file below the download directory
fn is_safe_relative(rel: &str) -> bool {
    !rel.is_empty()
        && rel
            .split('/')
            .all(|segment| !segment.is_empty() && segment != "." && segment != "..")
}

impl<S: BlobStore> Session<S> {
    pub(crate) async fn handle_raw(&self, cmd: RawCmd) -> Result<()> {
        let store = self.coordinator.store();
        match cmd.action {
            RawAction::Bech32 { address, prefix } => bech32(&address, &prefix),
            RawAction::Cat { target } => {
                let prefix = tx_key(&target)?.prefix();
                let objects = store.list_prefix(&prefix).await?;
                if objects.is_empty() {
                    println!("no files in {prefix}");
                }
                for object in objects.iter().filter(|o| !o.ends_with('/')) {
                    let Some(data) = store.get(object).await? else {
                        continue;
                    };
                    println!("\n|------------| {object} |------------|\n");
                    println!("{}", String::from_utf8_lossy(&data));
                }
                Ok(())
            }
            RawAction::Up { local, remote } => {
                let data = tokio::fs::read(&local).await?;
                store.put(&remote, data).await?;
                info!(local = %local.display(), %remote, "uploaded");
                Ok(())
            }
            RawAction::Down { remote, local } => {
                if remote.ends_with('/') {
                    return self.download_dir(&remote, &local).await;
                }
                let data = store
                    .get(&remote)
                    .await?
                    .ok_or_else(|| Error::VersionNotFound {
                        path: remote.clone(),
                    })?;
                tokio::fs::write(&local, data).await?;
                info!(%remote, local = %local.display(), "downloaded");
                Ok(())
            }
            RawAction::Mkdir { dir } => {
                if !dir.ends_with('/') {
                    return Err(Error::InputConflict(
                        "directory paths must end with '/'".to_string(),
                    ));
                }
                store.put(&dir, Vec::new()).await?;
                Ok(())
            }
            RawAction::Delete { path } => {
                let settings = self.coordinator.settings();
                store.delete(&path).await?;
                store
                    .wait_until_absent(&path, settings.delete_timeout, settings.poll_interval)
                    .await?;
                println!("deleted {path}");
                Ok(())
            }
        }
    }

    async fn download_dir(&self, remote: &str, local: &Path) -> Result<()> {
        let store = self.coordinator.store();
        tokio::fs::create_dir_all(local).await?;
        for object in store.list_prefix(remote).await? {
            let rel = &object[remote.len()..];
            if rel.is_empty() || rel.ends_with('/') {
                continue;
            }
            if !is_safe_relative(rel) {
                warn!(%object, "skipping object that would land outside the target directory");
                continue;
            }
            let Some(data) = store.get(&object).await? else {
                continue;
            };
            let dest = local.join(rel);
            if let Some(parent) = dest.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&dest, data).await?;
            println!("{}", dest.display());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cosign_store::MemStore;
    use cosign_types::Config;
    use tempfile::TempDir;

    fn session() -> Session<MemStore> {
        Session::new(Config::default(), MemStore::new(), None)
    }

    async fn raw(session: &Session<MemStore>, action: RawAction) -> Result<()> {
        session.handle_raw(RawCmd { action }).await
    }

    #[test]
    fn test_safe_relative_paths() {
        assert!(is_safe_relative("0/unsigned"));
        assert!(!is_safe_relative("../etc/passwd"));
        assert!(!is_safe_relative("a//b"));
        assert!(!is_safe_relative("./a"));
        assert!(!is_safe_relative(""));
    }

    #[test]
    fn test_bech32_rejects_garbage() {
        assert!(matches!(
            bech32("not-an-address", "osmo"),
            Err(Error::Classification(_))
        ));
    }

    #[tokio::test]
    async fn test_up_and_down_directory() {
        let session = session();
        let dir = TempDir::new().unwrap();
        let local = dir.path().join("unsigned.json");
        std::fs::write(&local, b"{}").unwrap();

        for remote in ["osmosis/val/0/unsigned", "osmosis/val/0/alice"] {
            raw(
                &session,
                RawAction::Up {
                    local: local.clone(),
                    remote: remote.to_string(),
                },
            )
            .await
            .unwrap();
        }
        raw(
            &session,
            RawAction::Mkdir {
                dir: "osmosis/val/empty/".to_string(),
            },
        )
        .await
        .unwrap();

        let out = dir.path().join("download");
        raw(
            &session,
            RawAction::Down {
                remote: "osmosis/val/".to_string(),
                local: out.clone(),
            },
        )
        .await
        .unwrap();
        assert_eq!(std::fs::read(out.join("0/unsigned")).unwrap(), b"{}");
        assert_eq!(std::fs::read(out.join("0/alice")).unwrap(), b"{}");
        assert!(!out.join("empty").exists());
    }

    #[tokio::test]
    async fn test_down_missing_object() {
        let session = session();
        let dir = TempDir::new().unwrap();
        let err = raw(
            &session,
            RawAction::Down {
                remote: "osmosis/val/0/unsigned".to_string(),
                local: dir.path().join("x"),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::VersionNotFound { .. }));
    }

    #[tokio::test]
    async fn test_mkdir_needs_trailing_slash() {
        let session = session();
        let err = raw(
            &session,
            RawAction::Mkdir {
                dir: "osmosis".to_string(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::InputConflict(_)));
        assert!(session.coordinator().store().is_empty());
    }

    #[tokio::test]
    async fn test_delete_object() {
        let session = session();
        session
            .coordinator()
            .store()
            .put("stray", b"x".to_vec())
            .await
            .unwrap();
        raw(
            &session,
            RawAction::Delete {
                path: "stray".to_string(),
            },
        )
        .await
        .unwrap();
        assert!(session.coordinator().store().is_empty());
    }
}
