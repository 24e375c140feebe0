//! Application layer with the detection services.

/// Cache, dispatcher and watcher services.
pub mod services;

pub use services::{
    CachePolicy, DetectionDispatcher, DetectionStats, DispatchOutcome, ExpiringBoundedCache,
    IncrementalWatcher, WatcherConfig,
};
