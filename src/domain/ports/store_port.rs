//! Persistent key/value store port definition.

use async_trait::async_trait;

use crate::domain::errors::StorageError;

/// Port for the persistent namespace store backing the result cache.
///
/// Each namespace holds one JSON object. Implementations must be safe to
/// share across tasks; they are not required to serialize writers.
#[async_trait]
pub trait KeyValueStorePort: Send + Sync {
    /// Reads the object stored under `namespace`, if any.
    async fn read(&self, namespace: &str) -> Result<Option<serde_json::Value>, StorageError>;

    /// Replaces the object stored under `namespace`.
    async fn write(&self, namespace: &str, value: serde_json::Value) -> Result<(), StorageError>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::RwLock;

    /// In-memory store that can inject failures and latency.
    #[derive(Default)]
    pub struct MockStore {
        data: Arc<RwLock<HashMap<String, serde_json::Value>>>,
        fail_reads: AtomicBool,
        fail_writes: AtomicBool,
        write_count: AtomicUsize,
        latency: Option<Duration>,
    }

    impl MockStore {
        /// Creates empty mock store.
        pub fn new() -> Self {
            Self::default()
        }

        /// Creates a store that sleeps before every read and write.
        pub fn with_latency(latency: Duration) -> Self {
            Self {
                latency: Some(latency),
                ..Self::default()
            }
        }

        /// Makes subsequent reads fail.
        pub fn set_fail_reads(&self, value: bool) {
            self.fail_reads.store(value, Ordering::SeqCst);
        }

        /// Makes subsequent writes fail.
        pub fn set_fail_writes(&self, value: bool) {
            self.fail_writes.store(value, Ordering::SeqCst);
        }

        /// Number of successful writes.
        pub fn write_count(&self) -> usize {
            self.write_count.load(Ordering::SeqCst)
        }

        /// Returns the raw object stored under `namespace`.
        pub async fn raw(&self, namespace: &str) -> Option<serde_json::Value> {
            self.data.read().await.get(namespace).cloned()
        }

        async fn delay(&self) {
            if let Some(latency) = self.latency {
                tokio::time::sleep(latency).await;
            }
        }
    }

    #[async_trait]
    impl KeyValueStorePort for MockStore {
        async fn read(&self, namespace: &str) -> Result<Option<serde_json::Value>, StorageError> {
            self.delay().await;
            if self.fail_reads.load(Ordering::SeqCst) {
                return Err(StorageError::ReadFailed("mock read failure".to_string()));
            }
            Ok(self.data.read().await.get(namespace).cloned())
        }

        async fn write(
            &self,
            namespace: &str,
            value: serde_json::Value,
        ) -> Result<(), StorageError> {
            self.delay().await;
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(StorageError::WriteFailed("mock write failure".to_string()));
            }
            self.data.write().await.insert(namespace.to_string(), value);
            self.write_count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }
}
