//! Spatial data provider seams.
//!
//! [`ElementSource`] is the authoritative fallback source: its failure aborts
//! the request. [`PoiCountSource`] is best-effort enrichment and never
//! reports an error, only unavailability.

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::aggregate::{PoiCounts, RawFeatureSnapshot, aggregate, catchment_area_square_meters};
use crate::osm::OsmElement;
use crate::request::{Polygon, TargetPoint};

/// Errors raised by spatial data providers.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The upstream asked us to slow down (HTTP 429).
    #[error("rate limited by {url}")]
    RateLimited {
        /// Request URL.
        url: String,
    },
    /// The upstream failed with a 5xx status.
    #[error("server error {status} from {url}")]
    Server {
        /// Request URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },
    /// The request exceeded its per-call timeout.
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout {
        /// Request URL.
        url: String,
        /// Configured timeout in seconds.
        timeout_secs: u64,
    },
    /// The upstream rejected the request with a non-retryable status.
    #[error("HTTP {status} from {url}: {message}")]
    Http {
        /// Request URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Error description.
        message: String,
    },
    /// The connection failed before a response arrived.
    #[error("network error contacting {url}: {message}")]
    Network {
        /// Request URL.
        url: String,
        /// Error description.
        message: String,
    },
    /// The response body could not be decoded.
    #[error("failed to parse provider response: {message}")]
    Parse {
        /// Decoder message.
        message: String,
    },
    /// The service answered with an error status in its payload.
    #[error("provider reported {code}: {message}")]
    Service {
        /// Service status code.
        code: String,
        /// Service message.
        message: String,
    },
    /// The caller cancelled the request.
    #[error("provider call cancelled")]
    Cancelled,
    /// Every retry attempt failed.
    #[error("provider failed after {attempts} attempts")]
    Exhausted {
        /// Number of attempts made.
        attempts: u32,
        /// Error from the final attempt.
        #[source]
        last: Box<ProviderError>,
    },
}

impl ProviderError {
    /// Whether the failure is worth retrying: rate limiting, server errors
    /// and timeouts.
    ///
    /// # Examples
    /// ```
    /// use chargesite_core::ProviderError;
    ///
    /// assert!(ProviderError::Server { url: "u".into(), status: 503 }.is_transient());
    /// assert!(!ProviderError::Cancelled.is_transient());
    /// ```
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::Server { .. } | Self::Timeout { .. }
        )
    }
}

/// Fallback provider returning raw elements around a point.
#[async_trait]
pub trait ElementSource: Send + Sync {
    /// Fetch every element within `radius_meters` of `point`.
    ///
    /// Implementations retry transient failures themselves and return
    /// [`ProviderError::Cancelled`] promptly once `cancel` fires.
    async fn fetch_elements(
        &self,
        point: TargetPoint,
        radius_meters: f64,
        cancel: &CancellationToken,
    ) -> Result<Vec<OsmElement>, ProviderError>;
}

/// Optional enrichment provider returning POI counts per category.
#[async_trait]
pub trait PoiCountSource: Send + Sync {
    /// Return counts for every category, or `None` when enrichment is
    /// unavailable for any reason. Partial results are never returned.
    async fn try_fetch_poi_counts(
        &self,
        point: TargetPoint,
        radius_meters: f64,
        cancel: &CancellationToken,
    ) -> Option<PoiCounts>;
}

/// Enrichment source that is never available.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEnrichment;

#[async_trait]
impl PoiCountSource for NoEnrichment {
    async fn try_fetch_poi_counts(
        &self,
        _point: TargetPoint,
        _radius_meters: f64,
        _cancel: &CancellationToken,
    ) -> Option<PoiCounts> {
        None
    }
}

/// Fetch elements from `source` and aggregate them into a snapshot.
///
/// # Errors
/// Propagates the source's [`ProviderError`].
pub async fn fetch_snapshot(
    source: &dyn ElementSource,
    polygon: &Polygon,
    point: TargetPoint,
    radius_meters: f64,
    cancel: &CancellationToken,
) -> Result<RawFeatureSnapshot, ProviderError> {
    let elements = source.fetch_elements(point, radius_meters, cancel).await?;
    log::debug!("aggregating {} elements", elements.len());
    let area = catchment_area_square_meters(polygon, radius_meters);
    Ok(aggregate(&elements, point, area))
}
