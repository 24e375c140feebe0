//! Content fingerprints used as cache keys and oracle query parameters.

use base64::{Engine as _, engine::general_purpose};
use serde::{Deserialize, Serialize};

/// How a fingerprint was derived.
///
/// A session uses exactly one strategy; the cache key carries the strategy as
/// a prefix so URL-keyed and hash-keyed verdicts never share a key.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum FingerprintStrategy {
    /// Perceptual hash of the decoded image bytes.
    #[default]
    Phash,
    /// The image URL itself.
    Url,
}

impl FingerprintStrategy {
    /// Returns the stable prefix used in cache keys.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Phash => "phash",
            Self::Url => "url",
        }
    }
}

impl std::fmt::Display for FingerprintStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable identifier of an image's content.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    strategy: FingerprintStrategy,
    value: String,
}

impl Fingerprint {
    /// Creates a fingerprint of the given strategy.
    #[must_use]
    pub fn new(strategy: FingerprintStrategy, value: impl Into<String>) -> Self {
        Self {
            strategy,
            value: value.into(),
        }
    }

    /// Creates a perceptual-hash fingerprint from its base64 encoding.
    #[must_use]
    pub fn phash(value: impl Into<String>) -> Self {
        Self::new(FingerprintStrategy::Phash, value)
    }

    /// Creates a URL fingerprint.
    #[must_use]
    pub fn url(url: impl Into<String>) -> Self {
        Self::new(FingerprintStrategy::Url, url)
    }

    /// Returns how this fingerprint was derived.
    #[must_use]
    pub const fn strategy(&self) -> FingerprintStrategy {
        self.strategy
    }

    /// Returns the raw value sent to the oracle.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Returns the key under which verdicts for this content are cached.
    #[must_use]
    pub fn cache_key(&self) -> String {
        format!("{}:{}", self.strategy, self.value)
    }

    /// Number of differing bits between two perceptual hashes.
    ///
    /// Values are unpadded standard base64, as `image_hasher` encodes them.
    /// Returns `None` unless both are decodable perceptual hashes of equal
    /// length.
    #[must_use]
    pub fn hamming_distance(&self, other: &Self) -> Option<u32> {
        if self.strategy != FingerprintStrategy::Phash
            || other.strategy != FingerprintStrategy::Phash
        {
            return None;
        }
        let a = general_purpose::STANDARD_NO_PAD.decode(&self.value).ok()?;
        let b = general_purpose::STANDARD_NO_PAD.decode(&other.value).ok()?;
        if a.len() != b.len() {
            return None;
        }
        Some(a.iter().zip(&b).map(|(x, y)| (x ^ y).count_ones()).sum())
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.cache_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_is_namespaced_by_strategy() {
        let by_hash = Fingerprint::phash("abc");
        let by_url = Fingerprint::url("abc");
        assert_eq!(by_hash.cache_key(), "phash:abc");
        assert_eq!(by_url.cache_key(), "url:abc");
        assert_ne!(by_hash.cache_key(), by_url.cache_key());
    }

    #[test]
    fn test_hamming_distance() {
        let a = Fingerprint::phash(general_purpose::STANDARD_NO_PAD.encode([0b1111_0000u8, 0xFF]));
        let b = Fingerprint::phash(general_purpose::STANDARD_NO_PAD.encode([0b1111_1111u8, 0xFF]));
        assert_eq!(a.hamming_distance(&b), Some(4));
        assert_eq!(a.hamming_distance(&a), Some(0));
    }

    #[test]
    fn test_hamming_distance_rejects_mismatched_inputs() {
        let a = Fingerprint::phash(general_purpose::STANDARD_NO_PAD.encode([1u8, 2]));
        let short = Fingerprint::phash(general_purpose::STANDARD_NO_PAD.encode([1u8]));
        let url = Fingerprint::url("https://example.com/a.png");
        assert_eq!(a.hamming_distance(&short), None);
        assert_eq!(a.hamming_distance(&url), None);
    }
}
