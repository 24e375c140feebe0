//! Application services.

pub mod detection_dispatcher;
pub mod incremental_watcher;
pub mod result_cache;

pub use detection_dispatcher::{
    DetectionDispatcher, DetectionStats, DispatchOutcome, VerdictSource,
};
pub use incremental_watcher::{
    DEFAULT_RESCAN_DEBOUNCE_MS, IncrementalWatcher, WatcherConfig, WatcherError, WatcherState,
};
pub use result_cache::{
    CACHE_NAMESPACE, CachePolicy, CacheStats, DEFAULT_MAX_ENTRIES, DEFAULT_TTL_DAYS,
    ExpiringBoundedCache,
};
