//! Persistent store error types.

use thiserror::Error;

/// Persistent store error variants.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to read from store: {0}")]
    ReadFailed(String),

    #[error("failed to write to store: {0}")]
    WriteFailed(String),

    #[error("failed to (de)serialize stored value: {0}")]
    Serialization(#[from] serde_json::Error),
}
