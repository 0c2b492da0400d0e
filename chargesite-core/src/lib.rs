//! Core domain rules for EV charging site feasibility scoring.
//!
//! A scoring request carries a catchment polygon and a candidate point. The
//! pipeline aggregates spatial provider data into raw proxies
//! ([`RawFeatureSnapshot`]), normalises them into six component scores
//! ([`FeatureEngine`]), and combines those into a weighted score with an
//! explanation and demand prediction ([`ScoringEngine`]).
//!
//! Network access lives behind the [`ElementSource`] and [`PoiCountSource`]
//! traits; HTTP implementations are provided by `chargesite-data`.

pub mod aggregate;
pub mod config;
pub mod features;
pub mod geometry;
pub mod normalize;
pub mod osm;
pub mod pipeline;
pub mod provider;
pub mod request;
pub mod scoring;
pub mod tables;
pub mod weights;

#[doc(hidden)]
pub mod test_support;

pub use aggregate::{PoiCounts, RawFeatureSnapshot};
pub use config::{ConfigError, ScoringConfig};
pub use features::{ComponentScores, Extraction, FeatureEngine};
pub use normalize::{FeatureKey, NormalizationRange};
pub use osm::{ElementKind, OsmElement};
pub use pipeline::{PipelineError, SiteScorer};
pub use provider::{ElementSource, NoEnrichment, PoiCountSource, ProviderError};
pub use request::{Polygon, SiteRequest, TargetPoint, ValidatedRequest, ValidationError};
pub use scoring::{Contribution, DemandPrediction, ScoreResult, ScoringEngine};
pub use tables::PoiCategory;
pub use weights::{WeightOverrides, WeightVector};
