//! File-backed namespace store.
//!
//! All namespaces share one JSON object on disk, the way a browser
//! extension's local storage area does.

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::domain::errors::StorageError;
use crate::domain::ports::KeyValueStorePort;

const STORE_FILE_NAME: &str = "store.json";

/// Namespace store persisted to a single JSON file.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    file_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Creates a store backed by `path`. The file is created on first write.
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            file_lock: Mutex::new(()),
        }
    }

    /// Creates a store in the default data directory.
    #[must_use]
    pub fn default_location() -> Self {
        Self::new(default_store_path())
    }

    /// Returns the backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load_all(&self) -> Result<serde_json::Map<String, serde_json::Value>, StorageError> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(serde_json::Map::new());
            }
            Err(e) => {
                return Err(StorageError::ReadFailed(format!(
                    "{}: {e}",
                    self.path.display()
                )));
            }
        };

        match serde_json::from_str::<serde_json::Value>(&content) {
            Ok(serde_json::Value::Object(map)) => Ok(map),
            Ok(_) | Err(_) => {
                warn!(path = %self.path.display(), "Store file is corrupt, treating it as empty");
                Ok(serde_json::Map::new())
            }
        }
    }
}

#[async_trait]
impl KeyValueStorePort for JsonFileStore {
    async fn read(&self, namespace: &str) -> Result<Option<serde_json::Value>, StorageError> {
        let _guard = self.file_lock.lock().await;
        let mut all = self.load_all().await?;
        Ok(all.remove(namespace))
    }

    async fn write(&self, namespace: &str, value: serde_json::Value) -> Result<(), StorageError> {
        let _guard = self.file_lock.lock().await;
        let mut all = self.load_all().await?;
        all.insert(namespace.to_string(), value);
        let content = serde_json::to_vec(&serde_json::Value::Object(all))?;

        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_atomically(&path, &content))
            .await
            .map_err(|e| StorageError::WriteFailed(format!("write task panicked: {e}")))?
            .map_err(|e| StorageError::WriteFailed(format!("{}: {e}", self.path.display())))?;

        debug!(path = %self.path.display(), namespace = %namespace, "Wrote store namespace");
        Ok(())
    }
}

fn write_atomically(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| std::io::Error::other("Invalid path"))?;
    std::fs::create_dir_all(parent)?;
    let mut temp_file = tempfile::NamedTempFile::new_in(parent)?;
    temp_file.write_all(content)?;
    temp_file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Returns the default store file path.
fn default_store_path() -> PathBuf {
    directories::ProjectDirs::from("com", "linuxmobile", "quip").map_or_else(
        || std::env::temp_dir().join("quip").join(STORE_FILE_NAME),
        |dirs| dirs.data_dir().join(STORE_FILE_NAME),
    )
}
