//! Application configuration.

use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::args::CliArgs;
use crate::application::services::{
    CachePolicy, DEFAULT_MAX_ENTRIES, DEFAULT_RESCAN_DEBOUNCE_MS, DEFAULT_TTL_DAYS,
    WatcherConfig,
};
use crate::domain::entities::FingerprintStrategy;
use crate::infrastructure::oracle::{DEFAULT_ORACLE_URL, DEFAULT_TIMEOUT_SECS};

pub(crate) const APP_NAME: &str = "quip";
pub(crate) const APP_QUALIFIER: &str = "com";
pub(crate) const APP_ORGANIZATION: &str = "linuxmobile";

/// Log level configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trace => write!(f, "trace"),
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Application configuration, read from `config.toml` and overridden by CLI flags.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Configuration file path.
    #[serde(skip)]
    pub config: Option<PathBuf>,

    /// Log file path.
    #[serde(skip)]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Result cache settings.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Classification oracle settings.
    #[serde(default)]
    pub oracle: OracleConfig,

    /// Detection settings.
    #[serde(default)]
    pub detection: DetectionConfig,

    /// Document watcher settings.
    #[serde(default)]
    pub watcher: WatcherSettings,
}

/// Result cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of stored verdicts.
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// Days before a verdict expires.
    #[serde(default = "default_ttl_days")]
    pub ttl_days: i64,

    /// Store file; defaults to the platform data directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            ttl_days: DEFAULT_TTL_DAYS,
            path: None,
        }
    }
}

impl CacheConfig {
    /// Returns the eviction and expiry policy.
    ///
    /// A `ttl_days` below one or beyond what a duration can hold falls back
    /// to the default.
    #[must_use]
    pub fn policy(&self) -> CachePolicy {
        let ttl = chrono::Duration::try_days(self.ttl_days)
            .filter(|_| self.ttl_days >= 1)
            .unwrap_or_else(|| {
                warn!(
                    ttl_days = self.ttl_days,
                    default = DEFAULT_TTL_DAYS,
                    "Invalid cache ttl_days, using default"
                );
                chrono::Duration::days(DEFAULT_TTL_DAYS)
            });
        CachePolicy::new(self.max_entries, ttl)
    }
}

/// Oracle configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    /// Base URL of the classification service.
    #[serde(default = "default_oracle_url")]
    pub base_url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            base_url: default_oracle_url(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Detection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Whether images are classified at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// How images are fingerprinted.
    #[serde(default)]
    pub fingerprint: FingerprintStrategy,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            fingerprint: FingerprintStrategy::default(),
        }
    }
}

/// Watcher configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatcherSettings {
    /// Quiet period after the last scroll before rescanning.
    #[serde(default = "default_rescan_debounce_ms")]
    pub rescan_debounce_ms: u64,
}

impl Default for WatcherSettings {
    fn default() -> Self {
        Self {
            rescan_debounce_ms: DEFAULT_RESCAN_DEBOUNCE_MS,
        }
    }
}

impl WatcherSettings {
    /// Converts to the watcher's runtime settings.
    #[must_use]
    pub const fn watcher_config(&self) -> WatcherConfig {
        WatcherConfig {
            rescan_debounce: Duration::from_millis(self.rescan_debounce_ms),
        }
    }
}

const fn default_max_entries() -> usize {
    DEFAULT_MAX_ENTRIES
}

const fn default_ttl_days() -> i64 {
    DEFAULT_TTL_DAYS
}

fn default_oracle_url() -> String {
    DEFAULT_ORACLE_URL.to_string()
}

const fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

const fn default_rescan_debounce_ms() -> u64 {
    DEFAULT_RESCAN_DEBOUNCE_MS
}

const fn default_true() -> bool {
    true
}

impl AppConfig {
    /// Merges CLI arguments into the configuration.
    pub fn merge_with_args(&mut self, args: &CliArgs) {
        if let Some(config_path) = &args.config {
            self.config = Some(config_path.clone());
        }
        if let Some(log_path) = &args.log_path {
            self.log_path = Some(log_path.clone());
        }
        if let Some(log_level) = args.log_level {
            self.log_level = log_level;
        }
        if let Some(oracle_url) = &args.oracle_url {
            self.oracle.base_url.clone_from(oracle_url);
        }
        if let Some(fingerprint) = args.fingerprint {
            self.detection.fingerprint = fingerprint;
        }
        if args.disable_detection {
            self.detection.enabled = false;
        }
    }

    /// Returns default log file path.
    #[must_use]
    pub fn default_log_path() -> Option<PathBuf> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.data_dir().join("quip.log"))
    }

    /// Returns effective log path.
    #[must_use]
    pub fn effective_log_path(&self) -> Option<PathBuf> {
        self.log_path.clone().or_else(Self::default_log_path)
    }
}
