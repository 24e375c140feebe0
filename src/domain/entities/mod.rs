//! Domain entity definitions.

mod classification;
mod document;
mod fingerprint;

pub use classification::{CacheEntry, Classification, OracleScores, Verdict};
pub use document::{DocumentEvent, DomNode, ElementId, ImageElement, ImageSourceKind};
pub use fingerprint::{Fingerprint, FingerprintStrategy};
