//! Facade crate for the EV charging site scoring engine.
//!
//! This crate re-exports the core domain types and exposes the HTTP provider
//! adapters behind the `http` feature flag.

#![forbid(unsafe_code)]

pub use chargesite_core::{
    ComponentScores, ConfigError, Contribution, DemandPrediction, ElementSource, Extraction,
    FeatureEngine, NoEnrichment, OsmElement, PipelineError, PoiCategory, PoiCountSource,
    PoiCounts, ProviderError, RawFeatureSnapshot, ScoreResult, ScoringConfig, ScoringEngine,
    SiteRequest, SiteScorer, TargetPoint, ValidatedRequest, ValidationError, WeightOverrides,
    WeightVector,
};

#[cfg(feature = "http")]
pub use chargesite_data::{
    OverpassConfig, OverpassProvider, PlacesConfig, PlacesProvider, ProviderBuildError,
    RetryPolicy,
};
