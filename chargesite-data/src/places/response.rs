//! Places nearby-search response types.

use chargesite_core::ProviderError;
use serde::Deserialize;
use serde::de::IgnoredAny;

/// Nearby-search response. Only the result count matters, so the result
/// bodies are skipped during decoding.
#[derive(Debug, Deserialize)]
pub struct NearbySearchResponse {
    /// Status code.
    ///
    /// Common values:
    /// - `"OK"` - at least one result
    /// - `"ZERO_RESULTS"` - the search succeeded with nothing found
    /// - `"OVER_QUERY_LIMIT"`, `"REQUEST_DENIED"`, `"INVALID_REQUEST"` -
    ///   the search failed
    pub status: String,
    /// Matched places.
    #[serde(default)]
    pub results: Vec<IgnoredAny>,
    /// Detail accompanying a failure status.
    pub error_message: Option<String>,
}

impl NearbySearchResponse {
    /// Check if the response indicates success.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        matches!(self.status.as_str(), "OK" | "ZERO_RESULTS")
    }

    /// Number of returned places.
    ///
    /// # Errors
    /// Returns [`ProviderError::Service`] when the status is a failure.
    pub fn count(self) -> Result<u32, ProviderError> {
        if !self.is_ok() {
            return Err(ProviderError::Service {
                code: self.status,
                message: self.error_message.unwrap_or_default(),
            });
        }
        Ok(u32::try_from(self.results.len()).unwrap_or(u32::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn ok_counts_results() {
        let json = r#"{
            "status": "OK",
            "results": [ { "name": "A" }, { "name": "B", "types": ["school"] } ]
        }"#;
        let response: NearbySearchResponse = serde_json::from_str(json).expect("should deserialise");
        assert_eq!(response.count().expect("ok status"), 2);
    }

    #[rstest]
    fn zero_results_is_success() {
        let json = r#"{ "status": "ZERO_RESULTS", "results": [] }"#;
        let response: NearbySearchResponse = serde_json::from_str(json).expect("should deserialise");
        assert_eq!(response.count().expect("zero results is ok"), 0);
    }

    #[rstest]
    #[case("REQUEST_DENIED")]
    #[case("OVER_QUERY_LIMIT")]
    #[case("INVALID_REQUEST")]
    fn failure_statuses_are_service_errors(#[case] status: &str) {
        let json = format!(
            r#"{{ "status": "{status}", "results": [], "error_message": "denied" }}"#
        );
        let response: NearbySearchResponse =
            serde_json::from_str(&json).expect("should deserialise");
        match response.count().expect_err("failure status") {
            ProviderError::Service { code, message } => {
                assert_eq!(code, status);
                assert_eq!(message, "denied");
            }
            other => panic!("expected Service, got {other:?}"),
        }
    }
}
