//! Perceptual (gradient) hashing of downloaded image bytes.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use image_hasher::{HashAlg, Hasher, HasherConfig};
use tracing::{debug, warn};

use crate::domain::entities::{Fingerprint, ImageElement};
use crate::domain::errors::DetectionError;
use crate::domain::ports::FingerprintPort;

/// Images larger than this are not downloaded.
const MAX_IMAGE_BYTES: usize = 20 * 1024 * 1024;

/// Builds the 64-bit gradient hasher whose output the oracle indexes.
#[must_use]
pub fn gradient_hasher() -> Hasher {
    HasherConfig::new().hash_alg(HashAlg::Gradient).to_hasher()
}

/// Decodes `bytes` and returns its perceptual fingerprint.
///
/// # Errors
/// Returns error if the bytes are not a decodable image.
pub fn fingerprint_bytes(hasher: &Hasher, bytes: &[u8]) -> Result<Fingerprint, DetectionError> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| DetectionError::fingerprint(format!("image decode failed: {e}")))?;
    Ok(Fingerprint::phash(hasher.hash_image(&img).to_base64()))
}

/// Downloads images and fingerprints them by perceptual hash.
pub struct PerceptualFingerprinter {
    http_client: reqwest::Client,
    hasher: Arc<Hasher>,
}

impl std::fmt::Debug for PerceptualFingerprinter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PerceptualFingerprinter").finish_non_exhaustive()
    }
}

impl PerceptualFingerprinter {
    /// Creates a fingerprinter whose downloads time out after `timeout_secs`.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn new(timeout_secs: u64) -> Result<Self, DetectionError> {
        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| {
                DetectionError::fingerprint(format!("Failed to create HTTP client: {e}"))
            })?;
        Ok(Self {
            http_client,
            hasher: Arc::new(gradient_hasher()),
        })
    }

    /// Downloads image bytes from a URL.
    async fn download(&self, url: &str) -> Result<Bytes, DetectionError> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| DetectionError::fingerprint(format!("Request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(DetectionError::fingerprint(format!(
                "HTTP {}: {}",
                response.status(),
                response.status().canonical_reason().unwrap_or("Unknown")
            )));
        }

        if response
            .content_length()
            .is_some_and(|len| len > MAX_IMAGE_BYTES as u64)
        {
            return Err(DetectionError::fingerprint("image too large to fingerprint"));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| DetectionError::fingerprint(format!("Failed to read body: {e}")))?;

        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(DetectionError::fingerprint("image too large to fingerprint"));
        }
        Ok(bytes)
    }
}

#[async_trait]
impl FingerprintPort for PerceptualFingerprinter {
    async fn fingerprint(&self, image: &ImageElement) -> Result<Fingerprint, DetectionError> {
        debug!(element = %image.id, url = %image.src, "Downloading image for hashing");
        let bytes = self.download(&image.src).await?;

        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || fingerprint_bytes(&hasher, &bytes))
            .await
            .map_err(|e| {
                warn!(element = %image.id, error = %e, "Hash task panicked");
                DetectionError::fingerprint(format!("Hash task panicked: {e}"))
            })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::imageops::FilterType;
    use image::{DynamicImage, GrayImage, ImageFormat, Luma, Rgb, RgbImage};
    use image_hasher::ImageHash;
    use std::io::Cursor;

    fn horizontal_ramp() -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::from_fn(90, 80, |x, _| {
            Luma([u8::try_from(x * 2).unwrap()])
        }))
    }

    fn textured_rgb() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(97, 61, |x, y| {
            let v = u8::try_from((x * 7 + y * 13) % 251).unwrap();
            Rgb([v, v.wrapping_mul(3), 255 - v])
        }))
    }

    fn encode_png(img: &DynamicImage) -> Vec<u8> {
        let mut bytes = Cursor::new(Vec::new());
        img.write_to(&mut bytes, ImageFormat::Png).unwrap();
        bytes.into_inner()
    }

    fn reference_hash(img: &DynamicImage) -> String {
        HasherConfig::new()
            .hash_alg(HashAlg::Gradient)
            .to_hasher()
            .hash_image(img)
            .to_base64()
    }

    #[test]
    fn test_matches_gradient_hasher_output() {
        let img = textured_rgb();
        let png = encode_png(&img);

        let fingerprint = fingerprint_bytes(&gradient_hasher(), &png).unwrap();

        assert_eq!(fingerprint.as_str(), reference_hash(&img));
        assert!(!fingerprint.as_str().ends_with('='));
    }

    #[test]
    fn test_fingerprint_bytes_is_deterministic() {
        let hasher = gradient_hasher();
        let png = encode_png(&horizontal_ramp());

        let a = fingerprint_bytes(&hasher, &png).unwrap();
        let b = fingerprint_bytes(&hasher, &png).unwrap();

        assert_eq!(a, b);
        assert_eq!(a.cache_key(), format!("phash:{}", reference_hash(&horizontal_ramp())));
    }

    #[test]
    fn test_hamming_distance_agrees_with_hash_dist() {
        let hasher = gradient_hasher();
        let ramp = horizontal_ramp();
        let textured = textured_rgb();

        let a = fingerprint_bytes(&hasher, &encode_png(&ramp)).unwrap();
        let b = fingerprint_bytes(&hasher, &encode_png(&textured)).unwrap();

        let expected = ImageHash::<Box<[u8]>>::from_base64(a.as_str())
            .unwrap()
            .dist(&ImageHash::<Box<[u8]>>::from_base64(b.as_str()).unwrap());
        assert_eq!(a.hamming_distance(&b), Some(expected));
    }

    #[test]
    fn test_resized_copy_is_perceptually_close() {
        let hasher = gradient_hasher();
        let original = horizontal_ramp();
        let resized = original.resize_exact(180, 160, FilterType::Nearest);

        let a = fingerprint_bytes(&hasher, &encode_png(&original)).unwrap();
        let b = fingerprint_bytes(&hasher, &encode_png(&resized)).unwrap();

        assert!(a.hamming_distance(&b).unwrap() <= 4);
    }

    #[test]
    fn test_undecodable_bytes() {
        let result = fingerprint_bytes(&gradient_hasher(), b"definitely not an image");
        assert!(matches!(result, Err(DetectionError::Fingerprint { .. })));
    }
}
