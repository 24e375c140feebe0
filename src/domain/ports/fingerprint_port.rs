//! Content fingerprinting port definition.

use async_trait::async_trait;

use crate::domain::entities::{Fingerprint, ImageElement};
use crate::domain::errors::DetectionError;

/// Port for deriving a stable content fingerprint from an image.
///
/// Identical content must always yield the same fingerprint.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FingerprintPort: Send + Sync {
    /// Fingerprints the image referenced by `image`.
    async fn fingerprint(&self, image: &ImageElement) -> Result<Fingerprint, DetectionError>;
}
