//! Filesystem-backed blob store
//!
//! Maps keys onto a directory tree, typically on a mount every co-signer can
//! reach. Keys ending in `/` are directory markers and list as such while the
//! directory is empty.

use crate::{BlobStore, Result, StoreError};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Suffix of in-flight writes, hidden from listings
const PARTIAL_SUFFIX: &str = ".cosign-partial";

pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a key below the root, rejecting anything that could escape it
    fn resolve(&self, key: &str) -> Result<PathBuf> {
        let relative = key.strip_suffix('/').unwrap_or(key);
        if relative
            .split('/')
            .any(|segment| segment.is_empty() || segment == "." || segment == "..")
        {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        let path = Path::new(relative);
        if !path.components().all(|c| matches!(c, Component::Normal(_))) {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(path))
    }

    /// Remove empty directories from `dir` upwards, stopping at the root
    async fn prune(&self, mut dir: PathBuf) {
        while dir != self.root && dir.starts_with(&self.root) {
            if fs::remove_dir(&dir).await.is_err() {
                break;
            }
            match dir.parent() {
                Some(parent) => dir = parent.to_path_buf(),
                None => break,
            }
        }
    }
}

fn io_error(context: String) -> impl FnOnce(std::io::Error) -> StoreError {
    move |e| StoreError::backend(context, e)
}

#[async_trait]
impl BlobStore for FsStore {
    async fn get(&self, path: &str) -> Result<Option<Vec<u8>>> {
        let file = self.resolve(path)?;
        if path.ends_with('/') {
            return Ok(fs::metadata(&file)
                .await
                .ok()
                .filter(|m| m.is_dir())
                .map(|_| Vec::new()));
        }
        match fs::read(&file).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            // a directory is not an object
            Err(_) if file.is_dir() => Ok(None),
            Err(e) => Err(StoreError::backend(format!("reading {path}"), e)),
        }
    }

    async fn put(&self, path: &str, data: Vec<u8>) -> Result<()> {
        let file = self.resolve(path)?;
        if path.ends_with('/') {
            debug!(path, "creating directory marker");
            return fs::create_dir_all(&file)
                .await
                .map_err(io_error(format!("creating {path}")));
        }

        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(io_error(format!("creating parent of {path}")))?;
        }

        let mut partial = file.clone().into_os_string();
        partial.push(PARTIAL_SUFFIX);
        let partial = PathBuf::from(partial);
        fs::write(&partial, &data)
            .await
            .map_err(io_error(format!("writing {path}")))?;
        fs::rename(&partial, &file)
            .await
            .map_err(io_error(format!("writing {path}")))?;
        debug!(path, bytes = data.len(), "stored object");
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut pending = vec![(self.root.clone(), String::new())];

        while let Some((dir, prefix)) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == ErrorKind::NotFound && prefix.is_empty() => continue,
                Err(e) => return Err(StoreError::backend("listing store", e)),
            };

            let mut empty = true;
            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(io_error("listing store".to_string()))?
            {
                empty = false;
                let name = entry.file_name().to_string_lossy().into_owned();
                if name.ends_with(PARTIAL_SUFFIX) {
                    continue;
                }
                let file_type = entry
                    .file_type()
                    .await
                    .map_err(io_error("listing store".to_string()))?;
                if file_type.is_dir() {
                    pending.push((entry.path(), format!("{prefix}{name}/")));
                } else {
                    keys.push(format!("{prefix}{name}"));
                }
            }
            if empty && !prefix.is_empty() {
                keys.push(prefix);
            }
        }

        keys.sort();
        Ok(keys)
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let file = self.resolve(path)?;
        let removed = if path.ends_with('/') {
            // markers only vanish once nothing is left under them
            fs::remove_dir(&file).await
        } else {
            fs::remove_file(&file).await
        };
        match removed {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(_) if path.ends_with('/') => return Ok(()),
            Err(e) => return Err(StoreError::backend(format!("deleting {path}"), e)),
        }
        debug!(path, "deleted object");

        if let Some(parent) = file.parent() {
            self.prune(parent.to_path_buf()).await;
        }
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        let file = self.resolve(path)?;
        match fs::metadata(&file).await {
            Ok(meta) => Ok(meta.is_dir() == path.ends_with('/')),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::backend(format!("checking {path}"), e)),
        }
    }
}
