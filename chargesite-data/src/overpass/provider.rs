//! HTTP [`ElementSource`] backed by the Overpass API.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chargesite_core::{ElementSource, OsmElement, ProviderError, TargetPoint};
use log::debug;
use reqwest::Client;
use tokio_util::sync::CancellationToken;

use super::query::{QUERY_TIMEOUT_SECS, build_query};
use super::response::{OverpassElement, OverpassResponse};
use crate::http::{DEFAULT_USER_AGENT, ProviderBuildError, build_client, convert_reqwest_error};
use crate::retry::RetryPolicy;

/// Public Overpass interpreter endpoint.
pub const DEFAULT_OVERPASS_URL: &str = "https://overpass-api.de/api/interpreter";

/// Default per-call timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for [`OverpassProvider`].
#[derive(Debug, Clone)]
pub struct OverpassConfig {
    /// Interpreter endpoint.
    pub base_url: String,
    /// Per-call timeout, independent of retry backoff.
    pub timeout: Duration,
    /// User agent string for requests.
    pub user_agent: String,
    /// Retry policy for transient failures.
    pub retry: RetryPolicy,
}

impl Default for OverpassConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OVERPASS_URL.to_owned(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            retry: RetryPolicy::default(),
        }
    }
}

impl OverpassConfig {
    /// Create a configuration for the given interpreter endpoint.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Set the per-call timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent string.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the retry policy.
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Fallback element source issuing one Overpass query per request.
///
/// Transient failures (HTTP 429, 5xx, timeouts) are retried according to
/// [`OverpassConfig::retry`]; anything else fails immediately.
///
/// # Example
///
/// ```no_run
/// use chargesite_core::{ElementSource, TargetPoint};
/// use chargesite_data::overpass::OverpassProvider;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
/// let provider = OverpassProvider::new("https://overpass-api.de/api/interpreter")?;
/// let point = TargetPoint::new(52.52, 13.405)?;
/// let elements = provider
///     .fetch_elements(point, 1_000.0, &CancellationToken::new())
///     .await?;
/// println!("{} elements", elements.len());
/// # Ok(())
/// # }
/// ```
pub struct OverpassProvider {
    client: Client,
    config: OverpassConfig,
}

impl fmt::Debug for OverpassProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OverpassProvider")
            .field("client", &self.client)
            .field("config", &self.config)
            .finish()
    }
}

impl OverpassProvider {
    /// Create a provider with default configuration.
    ///
    /// # Errors
    /// Returns an error if the HTTP client fails to build.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ProviderBuildError> {
        Self::with_config(OverpassConfig::new(base_url))
    }

    /// Create a provider with explicit configuration.
    ///
    /// # Errors
    /// Returns an error if the HTTP client fails to build.
    pub fn with_config(config: OverpassConfig) -> Result<Self, ProviderBuildError> {
        let client = build_client(&config.user_agent, config.timeout)?;
        Ok(Self { client, config })
    }

    /// Configuration in use.
    #[must_use]
    pub const fn config(&self) -> &OverpassConfig {
        &self.config
    }

    /// Issue one attempt of `query`.
    async fn fetch_once(&self, query: &str) -> Result<Vec<OsmElement>, ProviderError> {
        let url = self.config.base_url.as_str();
        let response = self
            .client
            .post(url)
            .form(&[("data", query)])
            .send()
            .await
            .map_err(|err| convert_reqwest_error(&err, url, self.config.timeout))?
            .error_for_status()
            .map_err(|err| convert_reqwest_error(&err, url, self.config.timeout))?;

        let body: OverpassResponse = response
            .json()
            .await
            .map_err(|err| convert_reqwest_error(&err, url, self.config.timeout))?;

        self.convert_response(body)
    }

    /// Convert a decoded response into elements, surfacing runtime remarks.
    fn convert_response(&self, response: OverpassResponse) -> Result<Vec<OsmElement>, ProviderError> {
        if let Some(remark) = response.runtime_error() {
            if remark.contains("timed out") {
                return Err(ProviderError::Timeout {
                    url: self.config.base_url.clone(),
                    timeout_secs: QUERY_TIMEOUT_SECS,
                });
            }
            return Err(ProviderError::Service {
                code: "runtime error".to_owned(),
                message: remark.to_owned(),
            });
        }
        Ok(response
            .elements
            .into_iter()
            .filter_map(OverpassElement::into_element)
            .collect())
    }
}

#[async_trait]
impl ElementSource for OverpassProvider {
    async fn fetch_elements(
        &self,
        point: TargetPoint,
        radius_meters: f64,
        cancel: &CancellationToken,
    ) -> Result<Vec<OsmElement>, ProviderError> {
        let query = build_query(point, radius_meters);
        debug!(
            "querying {} for {radius_meters} m around ({}, {})",
            self.config.base_url,
            point.lat(),
            point.lon()
        );
        let elements = self
            .config
            .retry
            .run(cancel, || self.fetch_once(&query))
            .await?;
        debug!("overpass returned {} elements", elements.len());
        Ok(elements)
    }
}
