//! Classification oracle HTTP adapter.

mod client;
mod dto;

pub use client::{DEFAULT_ORACLE_URL, DEFAULT_TIMEOUT_SECS, HttpOracleClient};
pub use dto::OracleResponse;
