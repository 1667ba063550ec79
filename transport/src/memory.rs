//! In-process transporter backed by a shared map.
//!
//! Useful as a local backend and as the test double for the monitor and
//! shipper crates. Clones share the same underlying store, so a handle held
//! by a component under test and a handle held by the test itself observe
//! the same objects.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::trace;

use crate::{FileInfo, FileTransporter, Result, TransportError, TransporterFactory};

#[derive(Debug, Clone)]
struct StoredObject {
    data: Vec<u8>,
    mod_time: DateTime<Utc>,
}

/// In-memory [`FileTransporter`] implementation.
///
/// Paths are plain strings with `/` separators; there are no directory
/// objects, so [`FileInfo::is_dir`] is always `false` and listing a prefix
/// returns every object stored beneath it.
#[derive(Debug, Clone, Default)]
pub struct MemoryTransporter {
    objects: Arc<RwLock<BTreeMap<String, StoredObject>>>,
}

impl MemoryTransporter {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an object with an explicit modification time.
    pub async fn put(&self, path: &str, data: Vec<u8>, mod_time: DateTime<Utc>) {
        let mut objects = self.objects.write().await;
        objects.insert(path.to_string(), StoredObject { data, mod_time });
    }

    /// Updates the modification time of an existing object.
    ///
    /// Returns `false` if the object does not exist.
    pub async fn touch(&self, path: &str, mod_time: DateTime<Utc>) -> bool {
        let mut objects = self.objects.write().await;
        match objects.get_mut(path) {
            Some(obj) => {
                obj.mod_time = mod_time;
                true
            }
            None => false,
        }
    }

    /// Removes an object, returning whether it existed.
    pub async fn remove(&self, path: &str) -> bool {
        self.objects.write().await.remove(path).is_some()
    }

    /// Returns whether an object exists.
    pub async fn contains(&self, path: &str) -> bool {
        self.objects.read().await.contains_key(path)
    }

    /// Returns the raw bytes of an object, if present.
    pub async fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.objects.read().await.get(path).map(|o| o.data.clone())
    }

    /// Returns all stored paths, in order.
    pub async fn paths(&self) -> Vec<String> {
        self.objects.read().await.keys().cloned().collect()
    }
}

/// Matches `key` against `prefix`, treating the prefix as a directory.
fn under_prefix(key: &str, prefix: &str) -> bool {
    if prefix.is_empty() || prefix == "/" {
        return true;
    }
    if let Some(stripped) = prefix.strip_suffix('/') {
        return key == stripped || key.starts_with(prefix);
    }
    key == prefix || key.starts_with(&format!("{prefix}/"))
}

fn base_name(path: &str) -> String {
    path.rsplit('/').next().unwrap_or(path).to_string()
}

#[async_trait]
impl FileTransporter for MemoryTransporter {
    async fn upload(&self, local: &Path, remote: &str) -> Result<()> {
        let data = std::fs::read(local)?;
        trace!(remote, bytes = data.len(), "Storing object");
        self.put(remote, data, Utc::now()).await;
        Ok(())
    }

    async fn download(&self, remote: &str, local: &Path) -> Result<()> {
        let objects = self.objects.read().await;
        let obj = objects
            .get(remote)
            .ok_or_else(|| TransportError::NotFound(remote.to_string()))?;
        std::fs::write(local, &obj.data)?;
        Ok(())
    }

    async fn list(&self, remote: &str) -> Result<Vec<FileInfo>> {
        let objects = self.objects.read().await;
        Ok(objects
            .iter()
            .filter(|(key, _)| under_prefix(key, remote))
            .map(|(key, obj)| FileInfo {
                name: base_name(key),
                path: key.clone(),
                size: obj.data.len() as u64,
                mod_time: obj.mod_time,
                is_dir: false,
            })
            .collect())
    }

    async fn delete(&self, remote: &str) -> Result<()> {
        if self.remove(remote).await {
            Ok(())
        } else {
            Err(TransportError::NotFound(remote.to_string()))
        }
    }

    async fn last_modified(&self, remote: &str) -> Result<DateTime<Utc>> {
        let objects = self.objects.read().await;
        objects
            .get(remote)
            .map(|o| o.mod_time)
            .ok_or_else(|| TransportError::NotFound(remote.to_string()))
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl TransporterFactory for MemoryTransporter {
    async fn connect(&self) -> Result<Box<dyn FileTransporter>> {
        Ok(Box::new(self.clone()))
    }
}
