//! In-memory key-value store.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::KeyValueStore;
use crate::{Result, TRACING_TARGET_STORE};

/// Volatile store backed by a shared map.
///
/// Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: Arc<RwLock<HashMap<String, serde_json::Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>> {
        let value = self.values.read().await.get(key).cloned();
        tracing::trace!(
            target: TRACING_TARGET_STORE,
            key = %key,
            found = value.is_some(),
            "Read value from memory store"
        );
        Ok(value)
    }

    async fn set(&self, key: &str, value: serde_json::Value) -> Result<()> {
        self.values.write().await.insert(key.to_owned(), value);
        tracing::trace!(
            target: TRACING_TARGET_STORE,
            key = %key,
            "Wrote value to memory store"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert!(store.get("settings").await.unwrap().is_none());

        store.set("settings", json!({ "pretty": true })).await.unwrap();
        assert_eq!(
            store.get("settings").await.unwrap(),
            Some(json!({ "pretty": true }))
        );

        store.set("settings", json!(null)).await.unwrap();
        assert_eq!(store.get("settings").await.unwrap(), Some(json!(null)));
    }

    #[tokio::test]
    async fn test_memory_store_clones_share_state() {
        let store = MemoryStore::new();
        let clone = store.clone();
        clone.set("last-seen-version", json!("1.0.0")).await.unwrap();
        assert_eq!(
            store.get("last-seen-version").await.unwrap(),
            Some(json!("1.0.0"))
        );
    }
}
