mod annotation_port;
mod clock_port;
mod document_port;
mod fingerprint_port;
mod oracle_port;
mod store_port;

pub use annotation_port::AnnotationPort;
pub use clock_port::{ClockPort, SystemClock};
pub use document_port::DocumentPort;
pub use fingerprint_port::FingerprintPort;
pub use oracle_port::ClassificationOraclePort;
pub use store_port::KeyValueStorePort;
