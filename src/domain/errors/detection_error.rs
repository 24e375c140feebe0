//! Per-element detection error types.

use thiserror::Error;

/// Failures that leave a single element unannotated.
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum DetectionError {
    #[error("oracle unreachable: {message}")]
    Network { message: String },

    #[error("malformed oracle response: {message}")]
    MalformedResponse { message: String },

    #[error("failed to fingerprint image: {message}")]
    Fingerprint { message: String },
}

impl DetectionError {
    /// Creates network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Creates malformed response error.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            message: message.into(),
        }
    }

    /// Creates fingerprint error.
    #[must_use]
    pub fn fingerprint(message: impl Into<String>) -> Self {
        Self::Fingerprint {
            message: message.into(),
        }
    }

    /// Returns whether error is network related.
    #[must_use]
    pub const fn is_network_error(&self) -> bool {
        matches!(self, Self::Network { .. })
    }
}
