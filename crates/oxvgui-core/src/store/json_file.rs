//! Key-value store persisted as a single JSON object on disk.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::Mutex;

use super::KeyValueStore;
use crate::{Error, Result, TRACING_TARGET_STORE};

/// Store keeping every key in one JSON file.
///
/// Writes go to a sibling temporary file that is then renamed over the
/// original, so a crash never leaves a half-written file behind. A missing
/// file reads as an empty store.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: Arc<PathBuf>,
    // Serializes read-modify-write cycles between clones.
    write_lock: Arc<Mutex<()>>,
}

impl JsonFileStore {
    /// Creates a store backed by `path`. The file is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Arc::new(path.into()),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Returns the backing file path.
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<Map<String, Value>> {
        let bytes = match tokio::fs::read(self.path.as_path()).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Map::new()),
            Err(err) => return Err(Error::storage(self.path.as_path(), err)),
        };

        match serde_json::from_slice::<Value>(&bytes)? {
            Value::Object(map) => Ok(map),
            _ => Err(Error::storage(
                self.path.as_path(),
                std::io::Error::new(ErrorKind::InvalidData, "expected a JSON object"),
            )),
        }
    }

    async fn write_all(&self, map: &Map<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::storage(parent, e))?;
        }

        let bytes = serde_json::to_vec_pretty(map)?;
        let temp = self.path.with_extension("json.tmp");

        tokio::fs::write(&temp, bytes)
            .await
            .map_err(|e| Error::storage(&temp, e))?;
        tokio::fs::rename(&temp, self.path.as_path())
            .await
            .map_err(|e| Error::storage(self.path.as_path(), e))?;

        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let value = self.read_all().await?.remove(key);
        tracing::debug!(
            target: TRACING_TARGET_STORE,
            key = %key,
            path = %self.path.display(),
            found = value.is_some(),
            "Read value from file store"
        );
        Ok(value)
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let mut map = self.read_all().await?;
        map.insert(key.to_owned(), value);
        self.write_all(&map).await?;

        tracing::debug!(
            target: TRACING_TARGET_STORE,
            key = %key,
            path = %self.path.display(),
            "Wrote value to file store"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn test_missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("state.json"));
        assert!(store.get("settings").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_values_survive_a_new_store_instance() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");

        let store = JsonFileStore::new(&path);
        store.set("settings", json!({ "gzip": false })).await.unwrap();
        store.set("last-seen-version", json!("0.1.0")).await.unwrap();

        let reopened = JsonFileStore::new(&path);
        assert_eq!(
            reopened.get("settings").await.unwrap(),
            Some(json!({ "gzip": false }))
        );
        assert_eq!(
            reopened.get("last-seen-version").await.unwrap(),
            Some(json!("0.1.0"))
        );
    }

    #[tokio::test]
    async fn test_non_object_file_is_a_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        tokio::fs::write(&path, b"[1, 2, 3]").await.unwrap();

        let store = JsonFileStore::new(&path);
        let err = store.get("settings").await.unwrap_err();
        assert!(matches!(err, Error::Storage { .. }));
    }
}
