//! Content fingerprinting adapters.

mod perceptual;
mod url;

pub use perceptual::{PerceptualFingerprinter, fingerprint_bytes, gradient_hasher};
pub use url::UrlFingerprinter;

use std::sync::Arc;

use crate::domain::entities::FingerprintStrategy;
use crate::domain::errors::DetectionError;
use crate::domain::ports::FingerprintPort;

/// Builds the fingerprinter for the session's strategy.
///
/// # Errors
/// Returns error if the HTTP client for perceptual hashing cannot be created.
pub fn fingerprinter_for(
    strategy: FingerprintStrategy,
    timeout_secs: u64,
) -> Result<Arc<dyn FingerprintPort>, DetectionError> {
    Ok(match strategy {
        FingerprintStrategy::Phash => Arc::new(PerceptualFingerprinter::new(timeout_secs)?),
        FingerprintStrategy::Url => Arc::new(UrlFingerprinter),
    })
}
