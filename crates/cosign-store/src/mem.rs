//! In-memory blob store

use crate::{BlobStore, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

/// In-process object map, ordered by key
#[derive(Debug, Default)]
pub struct MemStore {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn objects(&self) -> MutexGuard<'_, BTreeMap<String, Vec<u8>>> {
        self.objects.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn len(&self) -> usize {
        self.objects().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects().is_empty()
    }
}

#[async_trait]
impl BlobStore for MemStore {
    async fn get(&self, path: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.objects().get(path).cloned())
    }

    async fn put(&self, path: &str, data: Vec<u8>) -> Result<()> {
        self.objects().insert(path.to_string(), data);
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<String>> {
        Ok(self.objects().keys().cloned().collect())
    }

    async fn list_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .objects()
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.objects().remove(path);
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        Ok(self.objects().contains_key(path))
    }
}
