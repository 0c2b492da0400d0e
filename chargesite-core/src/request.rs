//! Request types accepted by the scoring pipeline.
//!
//! Constructors validate eagerly and return [`ValidationError`] naming the
//! offending field; nothing is silently coerced.

use geo::Coord;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::weights::WeightOverrides;

/// Minimum number of ring positions, including the closing repeat.
pub const MIN_RING_POINTS: usize = 4;

/// Errors raised while validating caller input.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// The polygon ring is malformed.
    #[error("{field}: {reason}")]
    InvalidPolygon {
        /// Name of the offending field.
        field: String,
        /// Short description of the defect.
        reason: &'static str,
    },
    /// A latitude or longitude is non-finite or out of range.
    #[error("{field}: coordinate {value} is out of range")]
    InvalidCoordinate {
        /// Name of the offending field.
        field: String,
        /// Value that failed validation.
        value: f64,
    },
    /// The search radius is non-finite or not positive.
    #[error("{field}: radius {value} must be a positive number of metres")]
    InvalidRadius {
        /// Name of the offending field.
        field: &'static str,
        /// Value that failed validation.
        value: f64,
    },
}

impl ValidationError {
    /// Name of the input field that failed validation.
    #[must_use]
    pub fn field(&self) -> &str {
        match self {
            Self::InvalidPolygon { field, .. } | Self::InvalidCoordinate { field, .. } => {
                field.as_str()
            }
            Self::InvalidRadius { field, .. } => *field,
        }
    }
}

fn check_latitude(field: impl FnOnce() -> String, lat: f64) -> Result<(), ValidationError> {
    if lat.is_finite() && (-90.0..=90.0).contains(&lat) {
        Ok(())
    } else {
        Err(ValidationError::InvalidCoordinate {
            field: field(),
            value: lat,
        })
    }
}

fn check_longitude(field: impl FnOnce() -> String, lon: f64) -> Result<(), ValidationError> {
    if lon.is_finite() && (-180.0..=180.0).contains(&lon) {
        Ok(())
    } else {
        Err(ValidationError::InvalidCoordinate {
            field: field(),
            value: lon,
        })
    }
}

/// Close an open ring by repeating its first vertex.
///
/// This is a producer-side helper for callers that collect vertices from a
/// drawing surface; [`Polygon::new`] itself rejects open rings.
///
/// # Examples
/// ```
/// use geo::Coord;
/// use chargesite_core::request::close_ring;
///
/// let ring = close_ring(vec![
///     Coord { x: 0.0, y: 0.0 },
///     Coord { x: 1.0, y: 0.0 },
///     Coord { x: 1.0, y: 1.0 },
/// ]);
/// assert_eq!(ring.len(), 4);
/// assert_eq!(ring.first(), ring.last());
/// ```
#[must_use]
pub fn close_ring(mut ring: Vec<Coord<f64>>) -> Vec<Coord<f64>> {
    if let (Some(first), Some(last)) = (ring.first().copied(), ring.last().copied())
        && first != last
    {
        ring.push(first);
    }
    ring
}

/// A closed catchment ring of `(lon, lat)` positions.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    ring: Vec<Coord<f64>>,
}

impl Polygon {
    /// Validate and construct a polygon.
    ///
    /// # Errors
    /// Returns [`ValidationError::InvalidPolygon`] when the ring has fewer
    /// than [`MIN_RING_POINTS`] positions or is not closed, and
    /// [`ValidationError::InvalidCoordinate`] for any out-of-range vertex.
    pub fn new(ring: Vec<Coord<f64>>) -> Result<Self, ValidationError> {
        if ring.len() < MIN_RING_POINTS {
            return Err(ValidationError::InvalidPolygon {
                field: "polygon".to_owned(),
                reason: "ring must contain at least 4 positions",
            });
        }
        for (index, vertex) in ring.iter().enumerate() {
            check_longitude(|| format!("polygon[{index}].lon"), vertex.x)?;
            check_latitude(|| format!("polygon[{index}].lat"), vertex.y)?;
        }
        if ring.first() != ring.last() {
            return Err(ValidationError::InvalidPolygon {
                field: "polygon".to_owned(),
                reason: "ring is not closed (first position must equal last)",
            });
        }
        Ok(Self { ring })
    }

    /// Ring positions, including the closing repeat.
    #[must_use]
    pub fn ring(&self) -> &[Coord<f64>] {
        &self.ring
    }
}

/// The candidate charging location.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetPoint {
    lat: f64,
    lon: f64,
}

impl TargetPoint {
    /// Validate and construct a target point.
    ///
    /// # Errors
    /// Returns [`ValidationError::InvalidCoordinate`] naming `point.lat` or
    /// `point.lon` when a component is non-finite or out of range.
    pub fn new(lat: f64, lon: f64) -> Result<Self, ValidationError> {
        check_latitude(|| "point.lat".to_owned(), lat)?;
        check_longitude(|| "point.lon".to_owned(), lon)?;
        Ok(Self { lat, lon })
    }

    /// Latitude in degrees.
    #[must_use]
    pub const fn lat(&self) -> f64 {
        self.lat
    }

    /// Longitude in degrees.
    #[must_use]
    pub const fn lon(&self) -> f64 {
        self.lon
    }

    /// Position as a WGS84 coordinate (`x = lon`, `y = lat`).
    #[must_use]
    pub const fn coord(&self) -> Coord<f64> {
        Coord {
            x: self.lon,
            y: self.lat,
        }
    }
}

/// Point as it appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointInput {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
}

/// Unvalidated scoring request as submitted by a caller.
///
/// `polygon` holds `[lon, lat]` pairs in ring order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteRequest {
    /// Catchment ring positions.
    pub polygon: Vec<[f64; 2]>,
    /// Candidate location.
    pub point: PointInput,
    /// Optional search radius override in metres.
    #[serde(default, rename = "radiusMeters")]
    pub radius_meters: Option<f64>,
    /// Optional partial weight overrides.
    #[serde(default)]
    pub weights: Option<WeightOverrides>,
}

/// Request whose shape and ranges have been checked.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRequest {
    /// Catchment polygon.
    pub polygon: Polygon,
    /// Candidate location.
    pub point: TargetPoint,
    /// Search radius in metres.
    pub radius_meters: f64,
    /// Caller-supplied weight overrides (possibly empty).
    pub weights: WeightOverrides,
}

impl SiteRequest {
    /// Validate the request, substituting `default_radius_meters` when the
    /// caller did not supply a radius.
    ///
    /// # Errors
    /// Returns the first [`ValidationError`] encountered.
    pub fn validate(self, default_radius_meters: f64) -> Result<ValidatedRequest, ValidationError> {
        let ring = self
            .polygon
            .iter()
            .map(|[lon, lat]| Coord { x: *lon, y: *lat })
            .collect();
        let polygon = Polygon::new(ring)?;
        let point = TargetPoint::new(self.point.lat, self.point.lon)?;
        let radius_meters = self.radius_meters.unwrap_or(default_radius_meters);
        if !(radius_meters.is_finite() && radius_meters > 0.0) {
            return Err(ValidationError::InvalidRadius {
                field: "radiusMeters",
                value: radius_meters,
            });
        }
        Ok(ValidatedRequest {
            polygon,
            point,
            radius_meters,
            weights: self.weights.unwrap_or_default(),
        })
    }
}
