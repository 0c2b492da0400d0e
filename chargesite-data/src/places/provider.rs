//! HTTP [`PoiCountSource`] backed by a Places nearby-search endpoint.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chargesite_core::{PoiCategory, PoiCountSource, PoiCounts, ProviderError, TargetPoint};
use futures_util::future::try_join_all;
use log::{debug, warn};
use reqwest::Client;
use tokio_util::sync::CancellationToken;
use url::Url;

use super::response::NearbySearchResponse;
use crate::http::{DEFAULT_USER_AGENT, ProviderBuildError, build_client, convert_reqwest_error};

/// Public nearby-search endpoint.
pub const DEFAULT_PLACES_URL: &str = "https://maps.googleapis.com/maps/api/place/nearbysearch/json";

/// Default per-call timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// How a POI category is expressed as a nearby-search filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchFilter {
    /// Filter on a place type.
    Type(&'static str),
    /// Free-text keyword search.
    Keyword(&'static str),
}

impl SearchFilter {
    /// Filter for `category`.
    #[must_use]
    pub const fn for_category(category: PoiCategory) -> Self {
        match category {
            PoiCategory::Mall => Self::Type("shopping_mall"),
            PoiCategory::Supermarket => Self::Type("supermarket"),
            PoiCategory::Office => Self::Keyword("office"),
            PoiCategory::School => Self::Type("school"),
            PoiCategory::Hospital => Self::Type("hospital"),
            PoiCategory::Entertainment => Self::Type("movie_theater"),
        }
    }

    const fn query_pair(self) -> (&'static str, &'static str) {
        match self {
            Self::Type(value) => ("type", value),
            Self::Keyword(value) => ("keyword", value),
        }
    }
}

/// Configuration for [`PlacesProvider`].
#[derive(Clone)]
pub struct PlacesConfig {
    /// Nearby-search endpoint.
    pub base_url: String,
    /// API key. Without one the provider is always unavailable.
    pub api_key: Option<String>,
    /// Per-call timeout.
    pub timeout: Duration,
    /// User agent string for requests.
    pub user_agent: String,
}

impl fmt::Debug for PlacesConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlacesConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl Default for PlacesConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_PLACES_URL.to_owned(),
            api_key: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }
}

impl PlacesConfig {
    /// Create a configuration for the given endpoint.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Set the API key. Blank keys are treated as absent.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        let key = api_key.into();
        self.api_key = (!key.trim().is_empty()).then_some(key);
        self
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
}

/// Best-effort POI counts from one nearby search per category.
///
/// All six searches must succeed for counts to be returned; any failure
/// makes the whole enrichment unavailable. Failures are logged, never
/// raised.
pub struct PlacesProvider {
    client: Client,
    config: PlacesConfig,
    endpoint: Url,
}

impl fmt::Debug for PlacesProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlacesProvider")
            .field("client", &self.client)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl PlacesProvider {
    /// Create a provider for `base_url` without an API key.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the HTTP client fails to
    /// build.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ProviderBuildError> {
        Self::with_config(PlacesConfig::new(base_url))
    }

    /// Create a provider with explicit configuration.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the HTTP client fails to
    /// build.
    pub fn with_config(config: PlacesConfig) -> Result<Self, ProviderBuildError> {
        let endpoint =
            Url::parse(&config.base_url).map_err(|source| ProviderBuildError::BaseUrl {
                url: config.base_url.clone(),
                source,
            })?;
        let client = build_client(&config.user_agent, config.timeout)?;
        Ok(Self {
            client,
            config,
            endpoint,
        })
    }

    /// Configuration in use.
    #[must_use]
    pub const fn config(&self) -> &PlacesConfig {
        &self.config
    }

    /// Nearby-search URL for one category.
    fn search_url(
        &self,
        category: PoiCategory,
        point: TargetPoint,
        radius_meters: f64,
        api_key: &str,
    ) -> Url {
        let (filter_key, filter_value) = SearchFilter::for_category(category).query_pair();
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("location", &format!("{},{}", point.lat(), point.lon()))
            .append_pair("radius", &format!("{radius_meters:.0}"))
            .append_pair(filter_key, filter_value)
            .append_pair("key", api_key);
        url
    }

    /// Count places for one category.
    async fn fetch_count(
        &self,
        category: PoiCategory,
        point: TargetPoint,
        radius_meters: f64,
        api_key: &str,
    ) -> Result<(PoiCategory, u32), ProviderError> {
        let url = self.search_url(category, point, radius_meters, api_key);
        // Errors report the bare endpoint so the key never reaches logs.
        let endpoint = self.config.base_url.as_str();
        let timeout = self.config.timeout;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| convert_reqwest_error(&err.without_url(), endpoint, timeout))?
            .error_for_status()
            .map_err(|err| convert_reqwest_error(&err.without_url(), endpoint, timeout))?;

        let body: NearbySearchResponse = response
            .json()
            .await
            .map_err(|err| convert_reqwest_error(&err.without_url(), endpoint, timeout))?;

        let count = body.count()?;
        debug!("places reported {count} for {category}");
        Ok((category, count))
    }
}

#[async_trait]
impl PoiCountSource for PlacesProvider {
    async fn try_fetch_poi_counts(
        &self,
        point: TargetPoint,
        radius_meters: f64,
        cancel: &CancellationToken,
    ) -> Option<PoiCounts> {
        let Some(api_key) = self.config.api_key.as_deref() else {
            debug!("places enrichment disabled: no API key configured");
            return None;
        };

        let searches = PoiCategory::ALL
            .map(|category| self.fetch_count(category, point, radius_meters, api_key));
        collect_all_or_nothing(searches, cancel).await
    }
}

/// Await every category search; any failure or cancellation discards the
/// whole set.
async fn collect_all_or_nothing<F>(
    searches: impl IntoIterator<Item = F>,
    cancel: &CancellationToken,
) -> Option<PoiCounts>
where
    F: Future<Output = Result<(PoiCategory, u32), ProviderError>>,
{
    let outcome = tokio::select! {
        biased;
        () = cancel.cancelled() => {
            debug!("places enrichment cancelled");
            return None;
        }
        outcome = try_join_all(searches) => outcome,
    };

    match outcome {
        Ok(counts) => Some(counts.into_iter().collect()),
        Err(err) => {
            warn!("places enrichment unavailable: {err}");
            None
        }
    }
}
