//! Domain error types.

mod detection_error;
mod storage_error;

pub use detection_error::DetectionError;
pub use storage_error::StorageError;
