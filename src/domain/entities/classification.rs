//! Classification verdicts and cached results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which class the oracle favoured for an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    /// Likely AI-generated.
    Ai,
    /// Likely a real photograph or drawing.
    Real,
}

impl Classification {
    /// Returns true for [`Classification::Ai`].
    #[must_use]
    pub const fn is_ai(self) -> bool {
        matches!(self, Self::Ai)
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ai => write!(f, "AI"),
            Self::Real => write!(f, "REAL"),
        }
    }
}

/// Raw class probabilities returned by the oracle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OracleScores {
    /// Probability that the image is AI-generated.
    pub p_ai: f64,
    /// Probability that the image is real.
    pub p_real: f64,
}

impl OracleScores {
    /// Creates scores from the two class probabilities.
    #[must_use]
    pub const fn new(p_ai: f64, p_real: f64) -> Self {
        Self { p_ai, p_real }
    }

    /// Returns true when both probabilities are finite and within `[0, 1]`.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        [self.p_ai, self.p_real]
            .iter()
            .all(|p| p.is_finite() && (0.0..=1.0).contains(p))
    }

    /// Reduces the scores to a verdict.
    ///
    /// `AI` wins only on a strict majority; a tie is `REAL`.
    #[must_use]
    pub fn verdict(&self) -> Verdict {
        if self.p_ai > self.p_real {
            Verdict::new(Classification::Ai, self.p_ai)
        } else {
            Verdict::new(Classification::Real, self.p_real)
        }
    }
}

/// A classification with the probability mass of the winning class.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verdict {
    /// Winning class.
    pub classification: Classification,
    /// Probability of the winning class, in `[0, 1]`.
    pub confidence: f64,
}

impl Verdict {
    /// Creates a verdict, clamping confidence into `[0, 1]`.
    #[must_use]
    pub fn new(classification: Classification, confidence: f64) -> Self {
        Self {
            classification,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({:.1}%)", self.classification, self.confidence * 100.0)
    }
}

/// A verdict stored in the result cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Content fingerprint the verdict belongs to.
    pub key: String,
    /// Winning class.
    pub classification: Classification,
    /// Probability of the winning class.
    pub confidence: f64,
    /// When the verdict was written.
    pub recorded_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Returns the cached verdict.
    #[must_use]
    pub fn verdict(&self) -> Verdict {
        Verdict::new(self.classification, self.confidence)
    }

    /// Returns true while `now - recorded_at <= ttl`.
    #[must_use]
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: chrono::Duration) -> bool {
        now.signed_duration_since(self.recorded_at) <= ttl
    }
}
