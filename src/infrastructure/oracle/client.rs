//! HTTP client for the classification oracle.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};

use super::dto::OracleResponse;
use crate::domain::entities::{Fingerprint, FingerprintStrategy, OracleScores};
use crate::domain::errors::DetectionError;
use crate::domain::ports::ClassificationOraclePort;

/// Default oracle base URL.
pub const DEFAULT_ORACLE_URL: &str = "http://localhost:5050";

/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

const USER_AGENT: &str = concat!("quip/", env!("CARGO_PKG_VERSION"));

/// Oracle client speaking `GET /results?phash=` and `GET /check?url=`.
pub struct HttpOracleClient {
    client: Client,
    base_url: String,
}

impl std::fmt::Debug for HttpOracleClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpOracleClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl HttpOracleClient {
    /// Creates client with custom base URL and timeout.
    ///
    /// # Errors
    /// Returns error if HTTP client creation fails.
    pub fn with_base_url(
        base_url: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, DetectionError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| DetectionError::network(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Returns the endpoint and query parameter for a fingerprint.
    fn endpoint(&self, fingerprint: &Fingerprint) -> (String, &'static str) {
        match fingerprint.strategy() {
            FingerprintStrategy::Phash => (format!("{}/results", self.base_url), "phash"),
            FingerprintStrategy::Url => (format!("{}/check", self.base_url), "url"),
        }
    }

    async fn handle_error_response(status: StatusCode, response: reqwest::Response) -> DetectionError {
        let detail = match response.json::<OracleResponse>().await {
            Ok(OracleResponse {
                error: Some(message),
                ..
            }) => message,
            _ => status
                .canonical_reason()
                .unwrap_or("Unknown")
                .to_string(),
        };
        DetectionError::network(format!("HTTP {status}: {detail}"))
    }
}

#[async_trait]
impl ClassificationOraclePort for HttpOracleClient {
    async fn classify(&self, fingerprint: &Fingerprint) -> Result<OracleScores, DetectionError> {
        let (url, param) = self.endpoint(fingerprint);

        debug!(fingerprint = %fingerprint, "Querying classification oracle");

        let response = self
            .client
            .get(&url)
            .query(&[(param, fingerprint.as_str())])
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to reach classification oracle");
                if e.is_timeout() {
                    DetectionError::network("request timed out")
                } else if e.is_connect() {
                    DetectionError::network("failed to connect to oracle")
                } else {
                    DetectionError::network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::handle_error_response(status, response).await);
        }

        let body: OracleResponse = response.json().await.map_err(|e| {
            warn!(error = %e, "Failed to parse oracle response");
            DetectionError::malformed(format!("failed to parse response: {e}"))
        })?;

        let scores = OracleScores::try_from(body)?;
        debug!(
            fingerprint = %fingerprint,
            p_ai = scores.p_ai,
            p_real = scores.p_real,
            "Oracle scored image"
        );
        Ok(scores)
    }
}
