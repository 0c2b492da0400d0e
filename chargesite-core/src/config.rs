//! Read-only scoring configuration.
//!
//! Every section is `#[serde(default)]`, so a partial JSON document only
//! overrides the fields it names.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::normalize::{NormalizationTable, default_normalization};
use crate::weights::WeightVector;

/// Errors raised while loading or validating a [`ScoringConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The document was not valid JSON for this schema.
    #[error("failed to parse scoring configuration: {0}")]
    Parse(#[from] serde_json::Error),
    /// A field holds an unusable value.
    #[error("invalid scoring configuration field `{field}`: {reason}")]
    Invalid {
        /// Dotted path of the offending field.
        field: String,
        /// Why the value was rejected.
        reason: String,
    },
}

/// Score deductions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Penalties {
    /// Deducted when normalised competition exceeds the threshold.
    pub high_competition: f64,
    /// Deducted when enrichment was unavailable.
    pub fallback_uncertainty: f64,
}

impl Default for Penalties {
    fn default() -> Self {
        Self {
            high_competition: 10.0,
            fallback_uncertainty: 3.0,
        }
    }
}

/// Score additions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bonuses {
    /// Added when free parking was detected nearby.
    pub free_parking: f64,
}

impl Default for Bonuses {
    fn default() -> Self {
        Self { free_parking: 5.0 }
    }
}

/// Coefficients of the linear demand model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictionModel {
    /// Sessions per day before any component adjustment.
    pub base_sessions: f64,
    /// Sessions added at a traffic score of 100.
    pub traffic: f64,
    /// Sessions added at a POI score of 100.
    pub poi: f64,
    /// Sessions removed at a competition score of 100.
    pub competition: f64,
    /// Sessions added at a demography score of 100.
    pub demography: f64,
    /// Energy delivered per session, in kWh.
    pub avg_kwh_per_session: f64,
    /// Peak demand factor applied to daily kWh / 10.
    pub peak_kw_factor: f64,
}

impl Default for PredictionModel {
    fn default() -> Self {
        Self {
            base_sessions: 4.0,
            traffic: 10.0,
            poi: 8.0,
            competition: 6.0,
            demography: 6.0,
            avg_kwh_per_session: 22.0,
            peak_kw_factor: 1.5,
        }
    }
}

/// Rule thresholds and neutral defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Normalised competition above which the penalty applies.
    pub high_competition_normalized: f64,
    /// High-power station count at which a warning is raised.
    pub high_competition_station_count: u32,
    /// Accessibility score used when no major road was found.
    pub neutral_accessibility_score: f64,
    /// Floor of the predicted sessions per day.
    pub minimum_sessions: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            high_competition_normalized: 75.0,
            high_competition_station_count: 4,
            neutral_accessibility_score: 40.0,
            minimum_sessions: 1.5,
        }
    }
}

/// Complete scoring configuration.
///
/// # Examples
/// ```
/// use chargesite_core::ScoringConfig;
///
/// let config = ScoringConfig::from_json_str(r#"{ "penalties": { "high_competition": 12 } }"#)?;
/// assert_eq!(config.penalties.high_competition, 12.0);
/// assert_eq!(config.penalties.fallback_uncertainty, 3.0);
/// # Ok::<(), chargesite_core::ConfigError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Search radius used when a request omits one.
    pub default_radius_meters: f64,
    /// Default component weights.
    pub weights: WeightVector,
    /// Per-feature normalisation bounds.
    pub normalization: NormalizationTable,
    /// Score deductions.
    pub penalties: Penalties,
    /// Score additions.
    pub bonuses: Bonuses,
    /// Demand model coefficients.
    pub prediction: PredictionModel,
    /// Rule thresholds.
    pub thresholds: Thresholds,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            default_radius_meters: 1_000.0,
            weights: WeightVector::default(),
            normalization: default_normalization(),
            penalties: Penalties::default(),
            bonuses: Bonuses::default(),
            prediction: PredictionModel::default(),
            thresholds: Thresholds::default(),
        }
    }
}

impl ScoringConfig {
    /// Parse and validate a JSON configuration document.
    ///
    /// # Errors
    /// Returns [`ConfigError::Parse`] for malformed JSON and
    /// [`ConfigError::Invalid`] when [`ScoringConfig::validate`] fails.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every value is usable.
    ///
    /// Degenerate normalisation ranges are accepted here; they are recovered
    /// at lookup time.
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.default_radius_meters.is_finite() && self.default_radius_meters > 0.0) {
            return Err(invalid("default_radius_meters", "must be a positive number"));
        }

        let weights = [
            ("weights.demography", self.weights.demography),
            ("weights.traffic", self.weights.traffic),
            ("weights.poi", self.weights.poi),
            ("weights.competition", self.weights.competition),
            ("weights.grid", self.weights.grid),
            ("weights.accessibility", self.weights.accessibility),
        ];
        let amounts = [
            ("penalties.high_competition", self.penalties.high_competition),
            (
                "penalties.fallback_uncertainty",
                self.penalties.fallback_uncertainty,
            ),
            ("bonuses.free_parking", self.bonuses.free_parking),
        ];
        if let Some((field, _)) = weights
            .iter()
            .chain(amounts.iter())
            .find(|(_, value)| !(value.is_finite() && *value >= 0.0))
        {
            return Err(invalid(field, "must be a finite, non-negative number"));
        }

        if let Some((key, _)) = self
            .normalization
            .iter()
            .find(|(_, range)| !(range.low.is_finite() && range.high.is_finite()))
        {
            return Err(invalid(
                &format!("normalization.{key}"),
                "bounds must be finite",
            ));
        }

        let model = &self.prediction;
        let coefficients = [
            ("prediction.base_sessions", model.base_sessions),
            ("prediction.traffic", model.traffic),
            ("prediction.poi", model.poi),
            ("prediction.competition", model.competition),
            ("prediction.demography", model.demography),
            ("prediction.avg_kwh_per_session", model.avg_kwh_per_session),
            ("prediction.peak_kw_factor", model.peak_kw_factor),
            (
                "thresholds.high_competition_normalized",
                self.thresholds.high_competition_normalized,
            ),
            (
                "thresholds.neutral_accessibility_score",
                self.thresholds.neutral_accessibility_score,
            ),
            ("thresholds.minimum_sessions", self.thresholds.minimum_sessions),
        ];
        if let Some((field, _)) = coefficients.iter().find(|(_, value)| !value.is_finite()) {
            return Err(invalid(field, "must be finite"));
        }
        Ok(())
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field: field.to_owned(),
        reason: reason.to_owned(),
    }
}
