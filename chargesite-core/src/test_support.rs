//! Deterministic provider doubles and sample inputs for unit and behaviour
//! tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use geo::Coord;
use tokio_util::sync::CancellationToken;

use crate::aggregate::PoiCounts;
use crate::osm::OsmElement;
use crate::provider::{ElementSource, PoiCountSource, ProviderError};
use crate::request::{Polygon, TargetPoint};

/// Latitude of [`sample_point`].
pub const SAMPLE_LAT: f64 = 52.52;
/// Longitude of [`sample_point`].
pub const SAMPLE_LON: f64 = 13.405;
/// Half-width in degrees of the [`sample_polygon`] square.
pub const SAMPLE_HALF_SPAN: f64 = 0.005;

/// A valid target point in central Berlin.
///
/// # Panics
/// Never; the constants are in range.
#[must_use]
#[expect(clippy::expect_used, reason = "sample coordinates are constant and valid")]
pub fn sample_point() -> TargetPoint {
    TargetPoint::new(SAMPLE_LAT, SAMPLE_LON).expect("sample point is valid")
}

/// Closed square ring centred on [`sample_point`].
#[must_use]
pub fn sample_ring() -> Vec<[f64; 2]> {
    let (lon, lat, d) = (SAMPLE_LON, SAMPLE_LAT, SAMPLE_HALF_SPAN);
    vec![
        [lon - d, lat - d],
        [lon + d, lat - d],
        [lon + d, lat + d],
        [lon - d, lat + d],
        [lon - d, lat - d],
    ]
}

/// [`sample_ring`] as a validated polygon.
///
/// # Panics
/// Never; the ring is closed and in range.
#[must_use]
#[expect(clippy::expect_used, reason = "sample ring is constant and valid")]
pub fn sample_polygon() -> Polygon {
    let ring = sample_ring()
        .into_iter()
        .map(|[x, y]| Coord { x, y })
        .collect();
    Polygon::new(ring).expect("sample polygon is valid")
}

#[derive(Debug, Clone)]
enum StubResponse {
    Elements(Vec<OsmElement>),
    ServerError(u16),
    Pending,
}

/// Stub [`ElementSource`] returning a pre-configured response.
#[derive(Debug)]
pub struct StubElementSource {
    response: StubResponse,
    calls: AtomicUsize,
}

impl StubElementSource {
    fn new(response: StubResponse) -> Self {
        Self {
            response,
            calls: AtomicUsize::new(0),
        }
    }

    /// Return `elements` on every call.
    #[must_use]
    pub fn with_elements(elements: Vec<OsmElement>) -> Self {
        Self::new(StubResponse::Elements(elements))
    }

    /// Fail every call with HTTP 503.
    #[must_use]
    pub fn failing() -> Self {
        Self::new(StubResponse::ServerError(503))
    }

    /// Never answer; resolve only once the caller cancels.
    #[must_use]
    pub fn pending() -> Self {
        Self::new(StubResponse::Pending)
    }

    /// Number of calls received so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ElementSource for StubElementSource {
    async fn fetch_elements(
        &self,
        _point: TargetPoint,
        _radius_meters: f64,
        cancel: &CancellationToken,
    ) -> Result<Vec<OsmElement>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.response {
            StubResponse::Elements(elements) => Ok(elements.clone()),
            StubResponse::ServerError(status) => Err(ProviderError::Server {
                url: "stub://elements".to_owned(),
                status: *status,
            }),
            StubResponse::Pending => {
                cancel.cancelled().await;
                Err(ProviderError::Cancelled)
            }
        }
    }
}

/// Stub [`PoiCountSource`] returning fixed counts or unavailability.
#[derive(Debug, Clone, Default)]
pub struct StubPoiCountSource {
    counts: Option<PoiCounts>,
}

impl StubPoiCountSource {
    /// Always return `counts`.
    #[must_use]
    pub fn available(counts: PoiCounts) -> Self {
        Self {
            counts: Some(counts),
        }
    }

    /// Always report unavailability.
    #[must_use]
    pub fn unavailable() -> Self {
        Self { counts: None }
    }
}

#[async_trait]
impl PoiCountSource for StubPoiCountSource {
    async fn try_fetch_poi_counts(
        &self,
        _point: TargetPoint,
        _radius_meters: f64,
        _cancel: &CancellationToken,
    ) -> Option<PoiCounts> {
        self.counts.clone()
    }
}
