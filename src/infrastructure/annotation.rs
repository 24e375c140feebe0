//! Terminal rendering of verdicts.

use std::io::Write;

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::domain::entities::{ImageElement, Verdict};
use crate::domain::errors::DetectionError;
use crate::domain::ports::AnnotationPort;

/// Smallest rendered width and height that receives the AI marker.
pub const MIN_OVERLAY_DIMENSION: u32 = 200;

/// Returns true if `image` is large enough to carry the AI marker.
///
/// Zero means the dimension is unknown, which never disqualifies an image.
#[must_use]
pub const fn overlay_eligible(image: &ImageElement) -> bool {
    (image.width == 0 || image.width >= MIN_OVERLAY_DIMENSION)
        && (image.height == 0 || image.height >= MIN_OVERLAY_DIMENSION)
}

/// Writes one line per verdict to a sink, `stdout` by default.
pub struct ConsoleAnnotator {
    out: Mutex<Box<dyn Write + Send>>,
}

impl Default for ConsoleAnnotator {
    fn default() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }
}

impl ConsoleAnnotator {
    /// Creates an annotator writing to `out`.
    #[must_use]
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    fn emit(&self, line: &str) {
        let mut out = self.out.lock();
        if let Err(e) = writeln!(out, "{line}").and_then(|()| out.flush()) {
            warn!(error = %e, "Failed to write annotation");
        }
    }
}

impl AnnotationPort for ConsoleAnnotator {
    fn annotate(&self, image: &ImageElement, verdict: &Verdict) {
        info!(
            element = %image.id,
            src = %image.src,
            classification = %verdict.classification,
            confidence = verdict.confidence,
            "Image classified"
        );

        let marker = if !verdict.classification.is_ai() {
            "     "
        } else if overlay_eligible(image) {
            "[AI] "
        } else {
            " ai  "
        };
        self.emit(&format!("{marker}{:<14} {}", verdict.to_string(), image.src));
    }

    fn report_failure(&self, image: &ImageElement, error: &DetectionError) {
        warn!(element = %image.id, src = %image.src, error = %error, "Image detection failed");
        self.emit(&format!(" ??  {error} {}", image.src));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::Classification;
    use std::sync::Arc;
    use test_case::test_case;

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuf {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock()).into_owned()
        }
    }

    #[test_case(0, 0, true ; "unknown")]
    #[test_case(200, 200, true ; "at_threshold")]
    #[test_case(640, 480, true ; "large")]
    #[test_case(199, 800, false ; "narrow")]
    #[test_case(800, 48, false ; "short")]
    fn test_overlay_eligible(width: u32, height: u32, expected: bool) {
        let image = ImageElement::new(1, "https://a.test/x.png").with_dimensions(width, height);
        assert_eq!(overlay_eligible(&image), expected);
    }

    #[test]
    fn test_ai_marker_only_on_large_images() {
        let buf = SharedBuf::default();
        let annotator = ConsoleAnnotator::new(Box::new(buf.clone()));
        let ai = Verdict::new(Classification::Ai, 0.91);

        annotator.annotate(
            &ImageElement::new(1, "https://a.test/big.png").with_dimensions(400, 300),
            &ai,
        );
        annotator.annotate(
            &ImageElement::new(2, "https://a.test/icon.png").with_dimensions(32, 32),
            &ai,
        );

        let output = buf.contents();
        let lines: Vec<_> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("[AI]"));
        assert!(!lines[1].contains("[AI]"));
        assert!(lines[1].ends_with("icon.png"));
    }

    #[test]
    fn test_failure_is_written() {
        let buf = SharedBuf::default();
        let annotator = ConsoleAnnotator::new(Box::new(buf.clone()));

        annotator.report_failure(
            &ImageElement::new(3, "https://a.test/gone.png"),
            &DetectionError::network("connection refused"),
        );

        assert!(buf.contents().contains("connection refused"));
    }
}
