//! Scoring Engine: weighted composite score, penalties, bonuses and demand
//! prediction.

use serde::Serialize;

use crate::config::ScoringConfig;
use crate::features::{ComponentScores, Extraction};
use crate::normalize::round2;
use crate::weights::{WeightOverrides, resolve_weights};

/// Contribution label for the demography term.
pub const LABEL_DEMOGRAPHY: &str = "demography";
/// Contribution label for the traffic term.
pub const LABEL_TRAFFIC: &str = "traffic";
/// Contribution label for the POI term.
pub const LABEL_POI: &str = "poi";
/// Contribution label for the inverted competition term.
pub const LABEL_COMPETITION: &str = "competition";
/// Contribution label for the grid term.
pub const LABEL_GRID: &str = "grid";
/// Contribution label for the accessibility term.
pub const LABEL_ACCESSIBILITY: &str = "accessibility";
/// Contribution label for the high-competition penalty.
pub const LABEL_PENALTY_HIGH_COMPETITION: &str = "penalty_high_competition";
/// Contribution label for the fallback-uncertainty penalty.
pub const LABEL_PENALTY_FALLBACK: &str = "penalty_fallback_uncertainty";
/// Contribution label for the free-parking bonus.
pub const LABEL_BONUS_FREE_PARKING: &str = "bonus_free_parking";

/// One signed term of the score decomposition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Contribution {
    /// Term label.
    pub feature: &'static str,
    /// Signed contribution, rounded to two decimals.
    pub contribution: f64,
}

/// Linear demand estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DemandPrediction {
    /// Charging sessions per day.
    pub sessions_per_day: f64,
    /// Energy delivered per day, in kWh.
    pub kwh_per_day: f64,
    /// Estimated peak power, in kW.
    pub peak_kw: f64,
}

/// Final scoring output for one request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreResult {
    /// Feasibility score within `0..=100`.
    pub score: f64,
    /// Demand prediction.
    pub prediction: DemandPrediction,
    /// Ordered contribution list.
    pub explain: Vec<Contribution>,
    /// Component scores passed through from extraction.
    pub components: ComponentScores,
    /// Warnings passed through from extraction.
    pub warnings: Vec<String>,
}

/// Combines component scores into the final result.
#[derive(Debug, Clone, Copy)]
pub struct ScoringEngine<'a> {
    config: &'a ScoringConfig,
}

impl<'a> ScoringEngine<'a> {
    /// Create an engine reading `config`.
    #[must_use]
    pub const fn new(config: &'a ScoringConfig) -> Self {
        Self { config }
    }

    /// Score an extraction with optional weight overrides.
    ///
    /// # Examples
    /// ```
    /// use chargesite_core::{FeatureEngine, RawFeatureSnapshot, ScoringConfig, ScoringEngine};
    /// use chargesite_core::weights::WeightOverrides;
    ///
    /// let config = ScoringConfig::default();
    /// let extraction = FeatureEngine::new(&config).assemble(&RawFeatureSnapshot::default(), None);
    /// let result = ScoringEngine::new(&config).score(&extraction, &WeightOverrides::default());
    /// assert!((0.0..=100.0).contains(&result.score));
    /// ```
    #[must_use]
    pub fn score(&self, extraction: &Extraction, overrides: &WeightOverrides) -> ScoreResult {
        let weights = resolve_weights(&self.config.weights, overrides).weights;
        let components = &extraction.components;

        let weighted = [
            (LABEL_DEMOGRAPHY, weights.demography * components.demography),
            (LABEL_TRAFFIC, weights.traffic * components.traffic),
            (LABEL_POI, weights.poi * components.poi),
            (
                LABEL_COMPETITION,
                weights.competition * (100.0 - components.competition),
            ),
            (LABEL_GRID, weights.grid * components.grid_proxy),
            (
                LABEL_ACCESSIBILITY,
                weights.accessibility * components.accessibility,
            ),
        ];
        let penalties = &self.config.penalties;
        let adjustments = [
            (
                extraction.competition_normalized
                    > self.config.thresholds.high_competition_normalized,
                LABEL_PENALTY_HIGH_COMPETITION,
                -penalties.high_competition,
            ),
            (
                extraction.used_fallback,
                LABEL_PENALTY_FALLBACK,
                -penalties.fallback_uncertainty,
            ),
            (
                extraction.free_parking,
                LABEL_BONUS_FREE_PARKING,
                self.config.bonuses.free_parking,
            ),
        ];

        let explain: Vec<Contribution> = weighted
            .into_iter()
            .chain(
                adjustments
                    .into_iter()
                    .filter(|(applies, _, _)| *applies)
                    .map(|(_, label, amount)| (label, amount)),
            )
            .map(|(feature, value)| Contribution {
                feature,
                contribution: round2(value),
            })
            .collect();
        let total: f64 = explain.iter().map(|entry| entry.contribution).sum();

        ScoreResult {
            score: clamp_score(total),
            prediction: self.predict(components),
            explain,
            components: *components,
            warnings: extraction.warnings.clone(),
        }
    }

    /// Linear demand model, independent of the clamped score.
    #[must_use]
    pub fn predict(&self, components: &ComponentScores) -> DemandPrediction {
        let model = &self.config.prediction;
        let raw_sessions = model.base_sessions
            + model.traffic * (components.traffic / 100.0)
            + model.poi * (components.poi / 100.0)
            - model.competition * (components.competition / 100.0)
            + model.demography * (components.demography / 100.0);
        let sessions = raw_sessions.max(self.config.thresholds.minimum_sessions);
        let kwh = sessions * model.avg_kwh_per_session;
        let peak_kw = model.peak_kw_factor * kwh / 10.0;
        DemandPrediction {
            sessions_per_day: round2(sessions),
            kwh_per_day: round2(kwh),
            peak_kw: round2(peak_kw),
        }
    }
}

fn clamp_score(total: f64) -> f64 {
    if total.is_finite() {
        round2(total.clamp(0.0, 100.0))
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    use crate::features::RawDiagnostics;

    #[fixture]
    fn config() -> ScoringConfig {
        ScoringConfig::default()
    }

    fn extraction(components: ComponentScores) -> Extraction {
        Extraction {
            components,
            raw: RawDiagnostics::new(),
            warnings: Vec::new(),
            used_fallback: false,
            free_parking: false,
            competition_raw: 0.0,
            competition_normalized: components.competition,
            poi_score: 0.0,
        }
    }

    fn uniform(value: f64) -> ComponentScores {
        ComponentScores {
            demography: value,
            traffic: value,
            poi: value,
            competition: value,
            grid_proxy: value,
            accessibility: value,
        }
    }

    fn entry<'r>(result: &'r ScoreResult, label: &str) -> Option<&'r Contribution> {
        result.explain.iter().find(|c| c.feature == label)
    }

    #[rstest]
    fn contributions_follow_fixed_order(config: ScoringConfig) {
        let result = ScoringEngine::new(&config).score(&extraction(uniform(50.0)), &WeightOverrides::default());
        let labels: Vec<_> = result.explain.iter().map(|c| c.feature).collect();
        assert_eq!(labels, vec![
            LABEL_DEMOGRAPHY,
            LABEL_TRAFFIC,
            LABEL_POI,
            LABEL_COMPETITION,
            LABEL_GRID,
            LABEL_ACCESSIBILITY,
        ]);
        assert!((result.score - 50.0).abs() < 1e-9);
    }

    #[rstest]
    fn competition_is_inverted(config: ScoringConfig) {
        let components = ComponentScores {
            competition: 20.0,
            ..uniform(0.0)
        };
        let result = ScoringEngine::new(&config).score(&extraction(components), &WeightOverrides::default());
        let competition = entry(&result, LABEL_COMPETITION).expect("competition entry");
        assert!((competition.contribution - 12.0).abs() < 1e-9);
    }

    #[rstest]
    fn high_competition_penalty_applies_above_threshold(config: ScoringConfig) {
        let components = ComponentScores {
            competition: 80.0,
            ..uniform(50.0)
        };
        let result = ScoringEngine::new(&config).score(&extraction(components), &WeightOverrides::default());
        let penalty = entry(&result, LABEL_PENALTY_HIGH_COMPETITION).expect("penalty entry");
        assert!((penalty.contribution + 10.0).abs() < f64::EPSILON);
    }

    #[rstest]
    fn threshold_itself_is_not_penalised(config: ScoringConfig) {
        let components = ComponentScores {
            competition: 75.0,
            ..uniform(50.0)
        };
        let result = ScoringEngine::new(&config).score(&extraction(components), &WeightOverrides::default());
        assert!(entry(&result, LABEL_PENALTY_HIGH_COMPETITION).is_none());
    }

    #[rstest]
    fn fallback_and_parking_adjust_score(config: ScoringConfig) {
        let mut input = extraction(uniform(50.0));
        input.used_fallback = true;
        input.free_parking = true;
        let result = ScoringEngine::new(&config).score(&input, &WeightOverrides::default());
        let fallback = entry(&result, LABEL_PENALTY_FALLBACK).expect("fallback entry");
        let bonus = entry(&result, LABEL_BONUS_FREE_PARKING).expect("bonus entry");
        assert!((fallback.contribution + 3.0).abs() < f64::EPSILON);
        assert!((bonus.contribution - 5.0).abs() < f64::EPSILON);
        assert!((result.score - 52.0).abs() < 1e-9);
    }

    #[rstest]
    fn score_is_clamped(config: ScoringConfig) {
        let components = ComponentScores {
            competition: 100.0,
            ..uniform(0.0)
        };
        let mut input = extraction(components);
        input.used_fallback = true;
        let result = ScoringEngine::new(&config).score(&input, &WeightOverrides::default());
        assert!(result.score.abs() < f64::EPSILON);
        let sum: f64 = result.explain.iter().map(|c| c.contribution).sum();
        assert!(sum < 0.0);
    }

    #[rstest]
    fn zero_overrides_revert_to_defaults(config: ScoringConfig) {
        let zero = WeightOverrides {
            demography: Some(0.0),
            traffic: Some(0.0),
            poi: Some(0.0),
            competition: Some(0.0),
            grid: Some(0.0),
            accessibility: Some(0.0),
        };
        let input = extraction(uniform(40.0));
        let engine = ScoringEngine::new(&config);
        assert_eq!(
            engine.score(&input, &zero),
            engine.score(&input, &WeightOverrides::default())
        );
    }

    #[rstest]
    #[case::floor(ComponentScores { competition: 100.0, ..uniform(0.0) }, 1.5)]
    #[case::neutral(ComponentScores { competition: 0.0, ..uniform(50.0) }, 16.0)]
    fn predicts_demand(
        config: ScoringConfig,
        #[case] components: ComponentScores,
        #[case] sessions: f64,
    ) {
        let prediction = ScoringEngine::new(&config).predict(&components);
        assert!((prediction.sessions_per_day - sessions).abs() < 1e-9);
        assert!((prediction.kwh_per_day - round2(sessions * 22.0)).abs() < 1e-9);
        assert!((prediction.peak_kw - round2(1.5 * sessions * 22.0 / 10.0)).abs() < 1e-9);
    }

    #[rstest]
    fn result_serialises_camel_case(config: ScoringConfig) {
        let result = ScoringEngine::new(&config).score(&extraction(uniform(10.0)), &WeightOverrides::default());
        let json = serde_json::to_value(&result).expect("serialise");
        assert!(json["prediction"]["sessionsPerDay"].is_number());
        assert!(json["components"]["gridProxy"].is_number());
        assert_eq!(json["explain"][0]["feature"], "demography");
    }
}
