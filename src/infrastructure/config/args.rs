//! Command-line interface.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use super::app_config::LogLevel;
use crate::domain::entities::FingerprintStrategy;

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(
    name = "quip",
    version,
    about = "Flags AI-generated images by asking a classification service",
    long_about = None
)]
pub struct CliArgs {
    /// Configuration file path.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log file path.
    #[arg(long, value_name = "PATH")]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Classification service base URL.
    #[arg(long, value_name = "URL", env = "QUIP_ORACLE_URL")]
    pub oracle_url: Option<String>,

    /// How images are fingerprinted.
    #[arg(long, value_enum)]
    pub fingerprint: Option<FingerprintStrategy>,

    /// Skip classification entirely.
    #[arg(long)]
    pub disable_detection: bool,

    /// Action to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands of `quip`.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Classify the images at the given URLs.
    Scan {
        /// Image URLs, in document order.
        #[arg(required = true, value_name = "URL")]
        urls: Vec<String>,
    },
    /// Drop expired entries and compact the result cache.
    Prune,
    /// Show the number of cached verdicts.
    Stats,
}
