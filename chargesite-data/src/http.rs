//! HTTP plumbing shared by the provider adapters.

use std::time::Duration;

use chargesite_core::ProviderError;
use reqwest::{Client, StatusCode};
use thiserror::Error;

/// Default user agent for provider requests.
pub const DEFAULT_USER_AGENT: &str = "chargesite-engine/0.1";

/// Error type for provider construction failures.
#[derive(Debug, Error)]
pub enum ProviderBuildError {
    /// Failed to build the HTTP client.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
    /// The configured base URL does not parse.
    #[error("invalid base URL {url}: {source}")]
    BaseUrl {
        /// Offending URL.
        url: String,
        /// Parser error.
        #[source]
        source: url::ParseError,
    },
}

/// Build a client with the same user agent and timeouts for every call.
pub(crate) fn build_client(
    user_agent: &str,
    timeout: Duration,
) -> Result<Client, ProviderBuildError> {
    Client::builder()
        .user_agent(user_agent)
        .connect_timeout(timeout)
        .timeout(timeout)
        .build()
        .map_err(ProviderBuildError::HttpClient)
}

/// Map a response status onto the retry-relevant error classes.
///
/// A `408 Request Timeout` is reported as [`ProviderError::Timeout`] so it
/// retries like a client-side timeout.
pub(crate) fn classify_status(
    url: &str,
    status: StatusCode,
    message: String,
    timeout: Duration,
) -> ProviderError {
    if status == StatusCode::REQUEST_TIMEOUT {
        return ProviderError::Timeout {
            url: url.to_owned(),
            timeout_secs: timeout.as_secs(),
        };
    }
    if status == StatusCode::TOO_MANY_REQUESTS {
        return ProviderError::RateLimited {
            url: url.to_owned(),
        };
    }
    if status.is_server_error() {
        return ProviderError::Server {
            url: url.to_owned(),
            status: status.as_u16(),
        };
    }
    ProviderError::Http {
        url: url.to_owned(),
        status: status.as_u16(),
        message,
    }
}

/// Convert a reqwest error into a [`ProviderError`].
///
/// `url` is the endpoint to report; callers pass a form without secrets.
pub(crate) fn convert_reqwest_error(
    error: &reqwest::Error,
    url: &str,
    timeout: Duration,
) -> ProviderError {
    if error.is_timeout() {
        return ProviderError::Timeout {
            url: url.to_owned(),
            timeout_secs: timeout.as_secs(),
        };
    }

    if let Some(status) = error.status() {
        return classify_status(url, status, error.to_string(), timeout);
    }

    if error.is_decode() {
        return ProviderError::Parse {
            message: error.to_string(),
        };
    }

    ProviderError::Network {
        url: url.to_owned(),
        message: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const TIMEOUT: Duration = Duration::from_secs(30);

    #[rstest]
    #[case(StatusCode::TOO_MANY_REQUESTS, true)]
    #[case(StatusCode::REQUEST_TIMEOUT, true)]
    #[case(StatusCode::INTERNAL_SERVER_ERROR, true)]
    #[case(StatusCode::BAD_GATEWAY, true)]
    #[case(StatusCode::SERVICE_UNAVAILABLE, true)]
    #[case(StatusCode::BAD_REQUEST, false)]
    #[case(StatusCode::FORBIDDEN, false)]
    #[case(StatusCode::NOT_FOUND, false)]
    fn status_classification_drives_retry(#[case] status: StatusCode, #[case] transient: bool) {
        let err = classify_status("http://example.com", status, String::new(), TIMEOUT);
        assert_eq!(err.is_transient(), transient, "{status} classified as {err:?}");
    }

    #[rstest]
    fn rate_limit_is_distinct_from_server_errors() {
        let err = classify_status(
            "http://example.com",
            StatusCode::TOO_MANY_REQUESTS,
            String::new(),
            TIMEOUT,
        );
        assert!(matches!(err, ProviderError::RateLimited { .. }));
    }

    #[rstest]
    fn request_timeout_status_reports_configured_timeout() {
        let err = classify_status(
            "http://example.com",
            StatusCode::REQUEST_TIMEOUT,
            String::new(),
            TIMEOUT,
        );
        match err {
            ProviderError::Timeout { url, timeout_secs } => {
                assert_eq!(url, "http://example.com");
                assert_eq!(timeout_secs, 30);
            }
            other => panic!("expected Timeout, got {other:?}"),
        }
    }

    #[rstest]
    fn client_errors_keep_status_and_message() {
        let err = classify_status(
            "http://example.com",
            StatusCode::BAD_REQUEST,
            "bad query".to_owned(),
            TIMEOUT,
        );
        match err {
            ProviderError::Http {
                status, message, ..
            } => {
                assert_eq!(status, 400);
                assert_eq!(message, "bad query");
            }
            other => panic!("expected Http, got {other:?}"),
        }
    }

    #[rstest]
    fn client_builds_with_defaults() {
        build_client(DEFAULT_USER_AGENT, Duration::from_secs(5)).expect("client should build");
    }
}
