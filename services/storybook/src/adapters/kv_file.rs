//! services/storybook/src/adapters/kv_file.rs
//!
//! A `KeyValueStore` persisted as one JSON object on disk. Writes go to a sibling
//! temporary file that is then renamed over the original.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use storybook_core::ports::{KeyValueStore, PortError, PortResult};
use tokio::sync::Mutex;
use tracing::debug;

pub struct FileKeyValueStore {
    path: PathBuf,
    /// Serialises read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl FileKeyValueStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> PortResult<BTreeMap<String, String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) if raw.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| {
                PortError::Unexpected(format!("{} is not a JSON object: {}", self.path.display(), e))
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(PortError::Unavailable(e.to_string())),
        }
    }

    async fn write_all(&self, entries: &BTreeMap<String, String>) -> PortResult<()> {
        let raw = serde_json::to_string_pretty(entries)
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| PortError::Unavailable(e.to_string()))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, raw)
            .await
            .map_err(|e| PortError::Unavailable(e.to_string()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| PortError::Unavailable(e.to_string()))?;
        debug!(path = %self.path.display(), keys = entries.len(), "Key-value store written.");
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn get(&self, key: &str) -> PortResult<Option<String>> {
        Ok(self.read_all().await?.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> PortResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.read_all().await?;
        entries.insert(key.to_string(), value.to_string());
        self.write_all(&entries).await
    }

    async fn remove(&self, key: &str) -> PortResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.read_all().await?;
        if entries.remove(key).is_none() {
            return Ok(());
        }
        self.write_all(&entries).await
    }
}
