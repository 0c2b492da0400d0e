//! Weight vectors and override resolution.

use log::warn;
use serde::{Deserialize, Serialize};

/// Six non-negative component weights.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightVector {
    /// Weight of the demography component.
    pub demography: f64,
    /// Weight of the traffic (road density) component.
    pub traffic: f64,
    /// Weight of the POI attractiveness component.
    pub poi: f64,
    /// Weight of the inverted competition component.
    pub competition: f64,
    /// Weight of the grid proximity component.
    pub grid: f64,
    /// Weight of the accessibility component.
    pub accessibility: f64,
}

impl Default for WeightVector {
    fn default() -> Self {
        Self {
            demography: 0.20,
            traffic: 0.20,
            poi: 0.20,
            competition: 0.15,
            grid: 0.10,
            accessibility: 0.15,
        }
    }
}

impl WeightVector {
    /// Weights in contribution order.
    #[must_use]
    pub const fn as_array(&self) -> [f64; 6] {
        [
            self.demography,
            self.traffic,
            self.poi,
            self.competition,
            self.grid,
            self.accessibility,
        ]
    }

    /// Sum of all six weights.
    #[must_use]
    pub fn sum(&self) -> f64 {
        self.as_array().iter().sum()
    }

    fn scaled(&self, divisor: f64) -> Self {
        Self {
            demography: self.demography / divisor,
            traffic: self.traffic / divisor,
            poi: self.poi / divisor,
            competition: self.competition / divisor,
            grid: self.grid / divisor,
            accessibility: self.accessibility / divisor,
        }
    }

    fn equal() -> Self {
        let share = 1.0 / 6.0;
        Self {
            demography: share,
            traffic: share,
            poi: share,
            competition: share,
            grid: share,
            accessibility: share,
        }
    }
}

/// Caller-supplied partial weight overrides.
///
/// Any subset of fields may be present; absent fields keep the configured
/// default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightOverrides {
    /// Override for the demography weight.
    #[serde(default)]
    pub demography: Option<f64>,
    /// Override for the traffic weight.
    #[serde(default)]
    pub traffic: Option<f64>,
    /// Override for the POI weight.
    #[serde(default)]
    pub poi: Option<f64>,
    /// Override for the competition weight.
    #[serde(default)]
    pub competition: Option<f64>,
    /// Override for the grid weight.
    #[serde(default)]
    pub grid: Option<f64>,
    /// Override for the accessibility weight.
    #[serde(default, alias = "access")]
    pub accessibility: Option<f64>,
}

impl WeightOverrides {
    /// Report whether no override is present.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.demography.is_none()
            && self.traffic.is_none()
            && self.poi.is_none()
            && self.competition.is_none()
            && self.grid.is_none()
            && self.accessibility.is_none()
    }
}

/// Outcome of weight resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedWeights {
    /// Normalised weights summing to one.
    pub weights: WeightVector,
    /// Whether the overrides were discarded in favour of the defaults.
    pub reverted_to_defaults: bool,
}

fn apply_override(name: &str, default: f64, value: Option<f64>) -> f64 {
    match value {
        Some(v) if v.is_finite() && v >= 0.0 => v,
        Some(v) => {
            warn!("discarding invalid {name} weight override {v}; keeping default {default}");
            default
        }
        None => default,
    }
}

/// Apply `overrides` on top of `defaults` and normalise the result to sum
/// to one.
///
/// When the overridden vector sums to zero or less, the overrides are
/// discarded and the defaults are normalised instead.
///
/// # Examples
/// ```
/// use chargesite_core::weights::{WeightOverrides, WeightVector, resolve_weights};
///
/// let overrides = WeightOverrides { poi: Some(1.0), ..WeightOverrides::default() };
/// let resolved = resolve_weights(&WeightVector::default(), &overrides);
/// assert!((resolved.weights.sum() - 1.0).abs() < 1e-9);
/// assert!(!resolved.reverted_to_defaults);
/// ```
#[must_use]
pub fn resolve_weights(defaults: &WeightVector, overrides: &WeightOverrides) -> ResolvedWeights {
    let merged = WeightVector {
        demography: apply_override("demography", defaults.demography, overrides.demography),
        traffic: apply_override("traffic", defaults.traffic, overrides.traffic),
        poi: apply_override("poi", defaults.poi, overrides.poi),
        competition: apply_override("competition", defaults.competition, overrides.competition),
        grid: apply_override("grid", defaults.grid, overrides.grid),
        accessibility: apply_override(
            "accessibility",
            defaults.accessibility,
            overrides.accessibility,
        ),
    };

    let sum = merged.sum();
    if sum > 0.0 && sum.is_finite() {
        return ResolvedWeights {
            weights: merged.scaled(sum),
            reverted_to_defaults: false,
        };
    }

    warn!("weight overrides sum to {sum}; reverting to configured defaults");
    let default_sum = defaults.sum();
    let weights = if default_sum > 0.0 && default_sum.is_finite() {
        defaults.scaled(default_sum)
    } else {
        warn!("configured default weights sum to {default_sum}; using equal weights");
        WeightVector::equal()
    };
    ResolvedWeights {
        weights,
        reverted_to_defaults: true,
    }
}
