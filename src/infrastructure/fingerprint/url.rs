//! URL-keyed fingerprints.

use async_trait::async_trait;

use crate::domain::entities::{Fingerprint, ImageElement};
use crate::domain::errors::DetectionError;
use crate::domain::ports::FingerprintPort;

/// Uses the image URL, without its fragment, as the fingerprint.
#[derive(Debug, Clone, Copy, Default)]
pub struct UrlFingerprinter;

#[async_trait]
impl FingerprintPort for UrlFingerprinter {
    async fn fingerprint(&self, image: &ImageElement) -> Result<Fingerprint, DetectionError> {
        let mut url = reqwest::Url::parse(image.src.trim())
            .map_err(|e| DetectionError::fingerprint(format!("invalid image URL: {e}")))?;
        url.set_fragment(None);
        Ok(Fingerprint::url(url.as_str()))
    }
}
