//! Oracle wire format.

use serde::Deserialize;

use crate::domain::entities::OracleScores;
use crate::domain::errors::DetectionError;

/// Body returned by the oracle: scores, or an `error` message.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OracleResponse {
    /// Probability that the image is AI-generated.
    #[serde(default)]
    pub p_ai: Option<f64>,
    /// Probability that the image is real.
    #[serde(default)]
    pub p_real: Option<f64>,
    /// Failure reported by the oracle.
    #[serde(default)]
    pub error: Option<String>,
}

impl TryFrom<OracleResponse> for OracleScores {
    type Error = DetectionError;

    fn try_from(response: OracleResponse) -> Result<Self, Self::Error> {
        if let Some(error) = response.error {
            return Err(DetectionError::malformed(format!("oracle error: {error}")));
        }

        let (Some(p_ai), Some(p_real)) = (response.p_ai, response.p_real) else {
            return Err(DetectionError::malformed("missing p_ai or p_real"));
        };

        let scores = Self::new(p_ai, p_real);
        if !scores.is_valid() {
            return Err(DetectionError::malformed(format!(
                "probabilities out of range: p_ai={p_ai}, p_real={p_real}"
            )));
        }
        Ok(scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> Result<OracleScores, DetectionError> {
        let response: OracleResponse = serde_json::from_str(body).unwrap();
        OracleScores::try_from(response)
    }

    #[test]
    fn test_scores_response() {
        let scores = parse(r#"{"p_ai": 0.8, "p_real": 0.2}"#).unwrap();
        assert!((scores.p_ai - 0.8).abs() < f64::EPSILON);
        assert!((scores.p_real - 0.2).abs() < f64::EPSILON);
    }

    #[test]
    fn test_error_field_wins_over_scores() {
        let result = parse(r#"{"p_ai": 0.8, "p_real": 0.2, "error": "bad phash"}"#);
        assert!(matches!(result, Err(DetectionError::MalformedResponse { .. })));
    }

    #[test]
    fn test_error_only_response() {
        let err = parse(r#"{"error": "bad phash"}"#).unwrap_err();
        assert!(err.to_string().contains("bad phash"));
    }

    #[test]
    fn test_missing_fields() {
        assert!(parse(r#"{"p_ai": 0.8}"#).is_err());
        assert!(parse("{}").is_err());
    }

    #[test]
    fn test_out_of_range_scores() {
        assert!(parse(r#"{"p_ai": 1.8, "p_real": 0.2}"#).is_err());
    }
}
