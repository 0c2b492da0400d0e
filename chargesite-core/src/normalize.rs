//! Min–max normalisation of raw proxies into `0..=100` component scores.

use std::collections::BTreeMap;
use std::fmt;

use log::warn;
use serde::{Deserialize, Serialize};

/// Keys for the six normalised features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureKey {
    /// Demography proxy.
    Demography,
    /// Weighted road density.
    Traffic,
    /// POI aggregate score.
    Poi,
    /// Competition gravity.
    Competition,
    /// Grid infrastructure signal.
    Grid,
    /// Distance to the nearest major road.
    Accessibility,
}

impl FeatureKey {
    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Demography => "demography",
            Self::Traffic => "traffic",
            Self::Poi => "poi",
            Self::Competition => "competition",
            Self::Grid => "grid",
            Self::Accessibility => "accessibility",
        }
    }
}

impl fmt::Display for FeatureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inclusive `(low, high)` bounds for linear scaling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizationRange {
    /// Raw value mapped to `0`.
    pub low: f64,
    /// Raw value mapped to `100`.
    pub high: f64,
}

impl NormalizationRange {
    /// Range used when a feature has no usable bounds.
    pub const IDENTITY: Self = Self {
        low: 0.0,
        high: 100.0,
    };

    /// Construct a range.
    #[must_use]
    pub const fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    /// Whether the bounds are finite and not collapsed onto each other.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        self.low.is_finite() && self.high.is_finite() && (self.high - self.low).abs() > f64::EPSILON
    }
}

/// Per-feature normalisation bounds.
pub type NormalizationTable = BTreeMap<FeatureKey, NormalizationRange>;

/// Shipped normalisation bounds.
#[must_use]
pub fn default_normalization() -> NormalizationTable {
    [
        (FeatureKey::Demography, NormalizationRange::new(0.0, 60.0)),
        (FeatureKey::Traffic, NormalizationRange::new(0.0, 20.0)),
        (FeatureKey::Poi, NormalizationRange::new(0.0, 40.0)),
        (FeatureKey::Competition, NormalizationRange::new(0.0, 0.5)),
        (FeatureKey::Grid, NormalizationRange::new(0.0, 30.0)),
        (FeatureKey::Accessibility, NormalizationRange::new(0.0, 2_000.0)),
    ]
    .into_iter()
    .collect()
}

/// Round to two decimal places.
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Resolve the range for `key`, substituting [`NormalizationRange::IDENTITY`]
/// when it is missing or degenerate.
#[must_use]
pub fn range_for(table: &NormalizationTable, key: FeatureKey) -> NormalizationRange {
    match table.get(&key) {
        Some(range) if range.is_usable() => *range,
        Some(range) => {
            warn!(
                "degenerate normalization range ({}, {}) for {key}; using identity range",
                range.low, range.high
            );
            NormalizationRange::IDENTITY
        }
        None => {
            warn!("no normalization range configured for {key}; using identity range");
            NormalizationRange::IDENTITY
        }
    }
}

/// Scale `value` linearly into `0..=100`, clamping outside the bounds and
/// rounding to two decimals. `NaN` maps to `0`.
///
/// # Examples
/// ```
/// use chargesite_core::normalize::{FeatureKey, default_normalization, normalize};
///
/// let table = default_normalization();
/// assert_eq!(normalize(&table, FeatureKey::Traffic, 10.0), 50.0);
/// assert_eq!(normalize(&table, FeatureKey::Traffic, 99.0), 100.0);
/// ```
#[must_use]
pub fn normalize(table: &NormalizationTable, key: FeatureKey, value: f64) -> f64 {
    scale(range_for(table, key), value)
}

/// `100 − normalize(value)`, for features where smaller raw values are
/// better.
#[must_use]
pub fn normalize_inverse(table: &NormalizationTable, key: FeatureKey, value: f64) -> f64 {
    round2(100.0 - normalize(table, key, value))
}

fn scale(range: NormalizationRange, value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    let unit = ((value - range.low) / (range.high - range.low)).clamp(0.0, 1.0);
    round2(unit * 100.0)
}
