//! Feature Engine: provider orchestration, POI merging and normalisation.

use std::collections::BTreeMap;

use log::{debug, info};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::aggregate::{PoiCounts, RawFeatureSnapshot};
use crate::config::ScoringConfig;
use crate::normalize::{FeatureKey, normalize, normalize_inverse};
use crate::provider::{ElementSource, PoiCountSource, ProviderError, fetch_snapshot};
use crate::request::{Polygon, TargetPoint};
use crate::tables::PoiCategory;

/// Warning recorded when enrichment was unavailable.
pub const WARNING_FALLBACK_USED: &str = "fallback used";
/// Warning recorded when no primary, secondary, trunk or motorway road was found.
pub const WARNING_NO_MAJOR_ROAD: &str = "no major road detected";
/// Warning recorded when many high-power stations are nearby.
pub const WARNING_HIGH_COMPETITION: &str = "high density of competition";
/// Warning recorded when free parking was detected.
pub const WARNING_FREE_PARKING: &str = "nearby free parking detected";

/// The six normalised component scores, each within `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentScores {
    /// Demography proxy score.
    pub demography: f64,
    /// Road density score.
    pub traffic: f64,
    /// POI attractiveness score.
    pub poi: f64,
    /// Competition pressure score; higher means more competition.
    pub competition: f64,
    /// Grid infrastructure score.
    pub grid_proxy: f64,
    /// Accessibility score; higher means closer to a major road.
    pub accessibility: f64,
}

impl ComponentScores {
    /// Scores in contribution order.
    #[must_use]
    pub const fn as_array(&self) -> [f64; 6] {
        [
            self.demography,
            self.traffic,
            self.poi,
            self.competition,
            self.grid_proxy,
            self.accessibility,
        ]
    }
}

/// Where the merged POI counts came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoiSource {
    /// Enrichment counts replaced the fallback counts they covered.
    Enrichment,
    /// Enrichment was unavailable; fallback counts stand.
    Fallback,
}

/// Outcome of merging fallback and enrichment POI counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedPoiCounts {
    /// Counts used for the POI score.
    pub counts: PoiCounts,
    /// Which stage supplied the counts.
    pub source: PoiSource,
}

impl MergedPoiCounts {
    /// Merge enrichment counts over fallback counts.
    ///
    /// Enrichment is all-or-nothing: `None` keeps the fallback counts
    /// untouched. `Some` overwrites only the categories it contains.
    ///
    /// # Examples
    /// ```
    /// use chargesite_core::features::{MergedPoiCounts, PoiSource};
    /// use chargesite_core::tables::PoiCategory;
    /// use chargesite_core::aggregate::PoiCounts;
    ///
    /// let fallback = PoiCounts::from([(PoiCategory::Mall, 1), (PoiCategory::Office, 4)]);
    /// let enrichment = PoiCounts::from([(PoiCategory::Mall, 3)]);
    /// let merged = MergedPoiCounts::merge(&fallback, Some(enrichment));
    /// assert_eq!(merged.counts[&PoiCategory::Mall], 3);
    /// assert_eq!(merged.counts[&PoiCategory::Office], 4);
    /// assert_eq!(merged.source, PoiSource::Enrichment);
    /// ```
    #[must_use]
    pub fn merge(fallback: &PoiCounts, enrichment: Option<PoiCounts>) -> Self {
        match enrichment {
            Some(enriched) => {
                let mut counts = fallback.clone();
                counts.extend(enriched);
                Self {
                    counts,
                    source: PoiSource::Enrichment,
                }
            }
            None => Self {
                counts: fallback.clone(),
                source: PoiSource::Fallback,
            },
        }
    }

    /// Whether the fallback counts were used unchanged.
    #[must_use]
    pub fn used_fallback(&self) -> bool {
        self.source == PoiSource::Fallback
    }
}

/// POI aggregate score: `Σ dwell_weight(c) × sqrt(count[c])`.
#[must_use]
pub fn poi_aggregate_score(counts: &PoiCounts) -> f64 {
    counts
        .iter()
        .map(|(category, count)| category.dwell_weight() * f64::from(*count).sqrt())
        .sum()
}

/// Raw proxies keyed by stable diagnostic names. Non-finite values are
/// stored as `None`.
pub type RawDiagnostics = BTreeMap<String, Option<f64>>;

/// Result of feature extraction for one request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Extraction {
    /// Normalised component scores.
    pub components: ComponentScores,
    /// Raw proxies for diagnostics.
    pub raw: RawDiagnostics,
    /// Human-readable warnings in emission order.
    pub warnings: Vec<String>,
    /// Whether enrichment was unavailable.
    pub used_fallback: bool,
    /// Whether free parking was detected.
    pub free_parking: bool,
    /// Raw competition gravity.
    pub competition_raw: f64,
    /// Normalised competition score.
    pub competition_normalized: f64,
    /// POI aggregate score before normalisation.
    pub poi_score: f64,
}

/// Derives component scores from provider data.
#[derive(Debug, Clone, Copy)]
pub struct FeatureEngine<'a> {
    config: &'a ScoringConfig,
}

impl<'a> FeatureEngine<'a> {
    /// Create an engine reading `config`.
    #[must_use]
    pub const fn new(config: &'a ScoringConfig) -> Self {
        Self { config }
    }

    /// Query both providers concurrently and assemble the extraction.
    ///
    /// The fallback source is authoritative; its failure fails the call.
    /// Enrichment unavailability is recorded as a warning.
    ///
    /// # Errors
    /// Returns the fallback source's [`ProviderError`], or
    /// [`ProviderError::Cancelled`] once `cancel` fires.
    pub async fn extract(
        &self,
        elements: &dyn ElementSource,
        enrichment: &dyn PoiCountSource,
        polygon: &Polygon,
        point: TargetPoint,
        radius_meters: f64,
        cancel: &CancellationToken,
    ) -> Result<Extraction, ProviderError> {
        let fetch = async {
            tokio::join!(
                fetch_snapshot(elements, polygon, point, radius_meters, cancel),
                enrichment.try_fetch_poi_counts(point, radius_meters, cancel),
            )
        };
        let (snapshot, enriched) = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(ProviderError::Cancelled),
            pair = fetch => pair,
        };
        let snapshot = snapshot?;
        if cancel.is_cancelled() {
            return Err(ProviderError::Cancelled);
        }
        if enriched.is_none() {
            info!("enrichment unavailable; using fallback POI counts");
        }
        Ok(self.assemble(&snapshot, enriched))
    }

    /// Turn a snapshot and optional enrichment counts into an extraction.
    ///
    /// Pure: identical inputs give identical output.
    #[must_use]
    pub fn assemble(&self, snapshot: &RawFeatureSnapshot, enrichment: Option<PoiCounts>) -> Extraction {
        let table = &self.config.normalization;
        let thresholds = &self.config.thresholds;
        let mut warnings = Vec::new();

        let merged = MergedPoiCounts::merge(&snapshot.poi_counts, enrichment);
        if merged.used_fallback() {
            warnings.push(WARNING_FALLBACK_USED.to_owned());
        }
        let poi_score = poi_aggregate_score(&merged.counts);

        let accessibility = if snapshot.accessibility_meters.is_finite() {
            normalize_inverse(table, FeatureKey::Accessibility, snapshot.accessibility_meters)
        } else {
            warnings.push(WARNING_NO_MAJOR_ROAD.to_owned());
            neutral_score(thresholds.neutral_accessibility_score)
        };
        let competition = normalize(table, FeatureKey::Competition, snapshot.competition_gravity);
        let components = ComponentScores {
            demography: normalize(table, FeatureKey::Demography, snapshot.demography_proxy),
            traffic: normalize(table, FeatureKey::Traffic, snapshot.road_density),
            poi: normalize(table, FeatureKey::Poi, poi_score),
            competition,
            grid_proxy: normalize(table, FeatureKey::Grid, snapshot.grid_proxy),
            accessibility,
        };

        if snapshot.high_competition_stations >= thresholds.high_competition_station_count {
            warnings.push(WARNING_HIGH_COMPETITION.to_owned());
        }
        if snapshot.free_parking {
            warnings.push(WARNING_FREE_PARKING.to_owned());
        }
        debug!("extracted components {components:?}");

        Extraction {
            components,
            raw: raw_diagnostics(snapshot, &merged.counts, poi_score),
            warnings,
            used_fallback: merged.used_fallback(),
            free_parking: snapshot.free_parking,
            competition_raw: snapshot.competition_gravity,
            competition_normalized: competition,
            poi_score,
        }
    }
}

fn neutral_score(configured: f64) -> f64 {
    if configured.is_finite() {
        configured.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

fn raw_diagnostics(snapshot: &RawFeatureSnapshot, counts: &PoiCounts, poi_score: f64) -> RawDiagnostics {
    let finite = |value: f64| value.is_finite().then_some(value);
    let mut raw: RawDiagnostics = PoiCategory::ALL
        .iter()
        .map(|category| {
            let count = counts.get(category).copied().unwrap_or(0);
            (format!("poi.{category}"), Some(f64::from(count)))
        })
        .collect();
    let scalars = [
        ("poiScore", poi_score),
        ("poiDwellScore", snapshot.poi_dwell_score),
        ("roadDensity", snapshot.road_density),
        ("competitionGravity", snapshot.competition_gravity),
        ("demographyProxy", snapshot.demography_proxy),
        ("gridProxy", snapshot.grid_proxy),
        ("accessibilityMeters", snapshot.accessibility_meters),
        ("residentialDensity", snapshot.residential_density),
        ("freeParkingBonus", if snapshot.free_parking { 1.0 } else { 0.0 }),
        (
            "highCompetitionStations",
            f64::from(snapshot.high_competition_stations),
        ),
        ("chargingStations", f64::from(snapshot.charging_stations)),
        ("areaSquareMeters", snapshot.area_square_meters),
    ];
    raw.extend(
        scalars
            .into_iter()
            .map(|(key, value)| (key.to_owned(), finite(value))),
    );
    raw
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{
        StubElementSource, StubPoiCountSource, sample_point, sample_polygon,
    };
    use rstest::{fixture, rstest};

    #[fixture]
    fn config() -> ScoringConfig {
        ScoringConfig::default()
    }

    fn snapshot_with_road(accessibility_meters: f64) -> RawFeatureSnapshot {
        RawFeatureSnapshot {
            accessibility_meters,
            ..RawFeatureSnapshot::default()
        }
    }

    #[rstest]
    fn missing_enrichment_marks_fallback(config: ScoringConfig) {
        let extraction = FeatureEngine::new(&config).assemble(&snapshot_with_road(100.0), None);
        assert!(extraction.used_fallback);
        assert_eq!(extraction.warnings, vec![WARNING_FALLBACK_USED.to_owned()]);
    }

    #[rstest]
    fn enrichment_overrides_returned_categories(config: ScoringConfig) {
        let snapshot = RawFeatureSnapshot {
            poi_counts: PoiCounts::from([(PoiCategory::Mall, 1), (PoiCategory::School, 4)]),
            ..snapshot_with_road(100.0)
        };
        let enrichment = PoiCounts::from([(PoiCategory::Mall, 4)]);
        let extraction = FeatureEngine::new(&config).assemble(&snapshot, Some(enrichment));

        assert!(!extraction.used_fallback);
        let expected = 6.0 * 2.0 + 3.5 * 2.0;
        assert!((extraction.poi_score - expected).abs() < 1e-9);
        assert_eq!(extraction.raw["poi.mall"], Some(4.0));
        assert_eq!(extraction.raw["poi.school"], Some(4.0));
        assert_eq!(extraction.raw["poi.hospital"], Some(0.0));
    }

    #[rstest]
    fn missing_major_road_uses_neutral_accessibility(config: ScoringConfig) {
        let extraction = FeatureEngine::new(&config)
            .assemble(&RawFeatureSnapshot::default(), Some(PoiCounts::new()));
        assert!((extraction.components.accessibility - 40.0).abs() < f64::EPSILON);
        assert!(extraction.warnings.contains(&WARNING_NO_MAJOR_ROAD.to_owned()));
        assert_eq!(extraction.raw["accessibilityMeters"], None);
    }

    #[rstest]
    fn accessibility_is_inverted_distance(config: ScoringConfig) {
        let extraction =
            FeatureEngine::new(&config).assemble(&snapshot_with_road(500.0), Some(PoiCounts::new()));
        assert!((extraction.components.accessibility - 75.0).abs() < 1e-9);
        assert!(extraction.warnings.is_empty());
    }

    #[rstest]
    fn emits_competition_and_parking_warnings(config: ScoringConfig) {
        let snapshot = RawFeatureSnapshot {
            free_parking: true,
            high_competition_stations: 4,
            competition_gravity: 0.4,
            ..snapshot_with_road(100.0)
        };
        let extraction = FeatureEngine::new(&config).assemble(&snapshot, Some(PoiCounts::new()));
        assert_eq!(extraction.warnings, vec![
            WARNING_HIGH_COMPETITION.to_owned(),
            WARNING_FREE_PARKING.to_owned(),
        ]);
        assert!((extraction.competition_normalized - 80.0).abs() < 1e-9);
        assert!((extraction.competition_raw - 0.4).abs() < f64::EPSILON);
        assert!(extraction.free_parking);
    }

    #[rstest]
    fn assemble_is_deterministic(config: ScoringConfig) {
        let snapshot = RawFeatureSnapshot {
            road_density: 7.3,
            demography_proxy: 21.0,
            ..snapshot_with_road(321.0)
        };
        let engine = FeatureEngine::new(&config);
        assert_eq!(engine.assemble(&snapshot, None), engine.assemble(&snapshot, None));
    }

    #[tokio::test]
    async fn extract_fails_when_fallback_fails() {
        let config = ScoringConfig::default();
        let result = FeatureEngine::new(&config)
            .extract(
                &StubElementSource::failing(),
                &StubPoiCountSource::unavailable(),
                &sample_polygon(),
                sample_point(),
                500.0,
                &CancellationToken::new(),
            )
            .await;
        assert!(matches!(result, Err(ProviderError::Server { .. })));
    }

    #[tokio::test]
    async fn extract_honours_cancellation() {
        let config = ScoringConfig::default();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = FeatureEngine::new(&config)
            .extract(
                &StubElementSource::with_elements(Vec::new()),
                &StubPoiCountSource::unavailable(),
                &sample_polygon(),
                sample_point(),
                500.0,
                &cancel,
            )
            .await;
        assert!(matches!(result, Err(ProviderError::Cancelled)));
    }

    #[tokio::test]
    async fn extract_merges_enrichment() {
        let config = ScoringConfig::default();
        let enrichment = StubPoiCountSource::available(PoiCounts::from([(
            PoiCategory::Hospital,
            9,
        )]));
        let extraction = FeatureEngine::new(&config)
            .extract(
                &StubElementSource::with_elements(Vec::new()),
                &enrichment,
                &sample_polygon(),
                sample_point(),
                500.0,
                &CancellationToken::new(),
            )
            .await
            .expect("stubs succeed");
        assert!(!extraction.used_fallback);
        assert!((extraction.poi_score - 15.0).abs() < 1e-9);
    }
}
