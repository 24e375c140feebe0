//! Classification oracle port definition.

use async_trait::async_trait;

use crate::domain::entities::{Fingerprint, OracleScores};
use crate::domain::errors::DetectionError;

/// Port for the remote service that scores images.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClassificationOraclePort: Send + Sync {
    /// Scores the image identified by `fingerprint`.
    ///
    /// A reply carrying an `error` field is a failure, never a score.
    async fn classify(&self, fingerprint: &Fingerprint) -> Result<OracleScores, DetectionError>;
}
