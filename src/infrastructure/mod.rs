//! Infrastructure layer with external service adapters.

/// Terminal annotation sink.
pub mod annotation;
/// Application configuration.
pub mod config;
/// Static document source.
pub mod document;
/// Image fingerprinting adapters.
pub mod fingerprint;
/// Classification oracle client.
pub mod oracle;
/// Persistent key/value store adapters.
pub mod storage;

pub use annotation::{ConsoleAnnotator, MIN_OVERLAY_DIMENSION};
pub use config::{AppConfig, CliArgs, Command, LogLevel, StorageManager};
pub use document::StaticDocument;
pub use fingerprint::{PerceptualFingerprinter, UrlFingerprinter, fingerprinter_for};
pub use oracle::HttpOracleClient;
pub use storage::{JsonFileStore, MemoryStore};
