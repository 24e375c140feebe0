//! In-process namespace store.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::errors::StorageError;
use crate::domain::ports::KeyValueStorePort;

/// Store that lives only as long as the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<HashMap<String, serde_json::Value>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStorePort for MemoryStore {
    async fn read(&self, namespace: &str) -> Result<Option<serde_json::Value>, StorageError> {
        Ok(self.data.read().await.get(namespace).cloned())
    }

    async fn write(&self, namespace: &str, value: serde_json::Value) -> Result<(), StorageError> {
        self.data.write().await.insert(namespace.to_string(), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_missing_namespace() {
        let store = MemoryStore::new();
        assert!(store.read("absent").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_write_replaces_namespace() {
        let store = MemoryStore::new();
        store.write("ns", serde_json::json!({"a": 1})).await.unwrap();
        store.write("ns", serde_json::json!({"b": 2})).await.unwrap();

        let value = store.read("ns").await.unwrap().unwrap();
        assert_eq!(value, serde_json::json!({"b": 2}));
    }
}
