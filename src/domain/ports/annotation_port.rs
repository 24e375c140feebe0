//! Annotation sink port definition.

use tracing::warn;

use crate::domain::entities::{ImageElement, Verdict};
use crate::domain::errors::DetectionError;

/// Port receiving the outcome of every processed image.
pub trait AnnotationPort: Send + Sync {
    /// Applies the overlay for a classified image.
    fn annotate(&self, image: &ImageElement, verdict: &Verdict);

    /// Records that `image` could not be classified.
    fn report_failure(&self, image: &ImageElement, error: &DetectionError) {
        warn!(element = %image.id, src = %image.src, error = %error, "Image detection failed");
    }
}
