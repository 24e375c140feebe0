//! Quip - flags likely AI-generated images.
//!
//! Images observed in a document are fingerprinted, looked up in a bounded,
//! expiring result cache and, on a miss, classified by a remote oracle. Each
//! element is processed at most once per document.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Application layer containing the detection services.
pub mod application;
/// Domain layer containing entities, errors, and port definitions.
pub mod domain;
/// Infrastructure layer containing adapters for external services.
pub mod infrastructure;

/// Current version of the application.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name.
pub const NAME: &str = "quip";
