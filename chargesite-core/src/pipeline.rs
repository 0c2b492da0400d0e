//! End-to-end scoring pipeline.
//!
//! `SiteRequest` → validation → concurrent provider calls → Feature Engine →
//! Scoring Engine → [`ScoreResult`].

use std::fmt;

use log::debug;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::config::ScoringConfig;
use crate::features::FeatureEngine;
use crate::provider::{ElementSource, PoiCountSource, ProviderError};
use crate::request::{SiteRequest, ValidatedRequest, ValidationError};
use crate::scoring::{ScoreResult, ScoringEngine};

/// Errors returned by [`SiteScorer::evaluate`].
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The request failed validation.
    #[error("invalid request: {0}")]
    Validation(#[from] ValidationError),
    /// The fallback provider failed.
    #[error("spatial data provider failed")]
    Provider(#[source] ProviderError),
    /// The request was cancelled before completion.
    #[error("request cancelled")]
    Cancelled,
}

impl From<ProviderError> for PipelineError {
    fn from(error: ProviderError) -> Self {
        match error {
            ProviderError::Cancelled => Self::Cancelled,
            other => Self::Provider(other),
        }
    }
}

/// Scores candidate sites against read-only configuration and two providers.
///
/// # Examples
/// ```
/// use async_trait::async_trait;
/// use chargesite_core::{
///     ElementSource, NoEnrichment, OsmElement, ProviderError, ScoringConfig, SiteRequest,
///     SiteScorer, TargetPoint,
/// };
/// use tokio_util::sync::CancellationToken;
///
/// struct EmptySource;
///
/// #[async_trait]
/// impl ElementSource for EmptySource {
///     async fn fetch_elements(
///         &self,
///         _point: TargetPoint,
///         _radius_meters: f64,
///         _cancel: &CancellationToken,
///     ) -> Result<Vec<OsmElement>, ProviderError> {
///         Ok(Vec::new())
///     }
/// }
///
/// let scorer = SiteScorer::new(ScoringConfig::default(), EmptySource, NoEnrichment);
/// let request: SiteRequest = serde_json::from_str(
///     r#"{
///         "polygon": [[13.40, 52.51], [13.41, 52.51], [13.41, 52.53], [13.40, 52.51]],
///         "point": { "lat": 52.52, "lon": 13.405 }
///     }"#,
/// )?;
/// let runtime = tokio::runtime::Builder::new_current_thread().build()?;
/// let result = runtime.block_on(scorer.evaluate(request, &CancellationToken::new()))?;
/// assert!(result.warnings.iter().any(|w| w == "fallback used"));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct SiteScorer {
    config: ScoringConfig,
    elements: Box<dyn ElementSource>,
    enrichment: Box<dyn PoiCountSource>,
}

impl fmt::Debug for SiteScorer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SiteScorer")
            .field("config", &self.config)
            .field("elements", &"<dyn ElementSource>")
            .field("enrichment", &"<dyn PoiCountSource>")
            .finish()
    }
}

impl SiteScorer {
    /// Assemble a scorer from configuration and providers.
    #[must_use]
    pub fn new(
        config: ScoringConfig,
        elements: impl ElementSource + 'static,
        enrichment: impl PoiCountSource + 'static,
    ) -> Self {
        Self {
            config,
            elements: Box::new(elements),
            enrichment: Box::new(enrichment),
        }
    }

    /// Configuration in use.
    #[must_use]
    pub const fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Validate and score `request`.
    ///
    /// # Errors
    /// Returns [`PipelineError::Validation`] before any provider call when
    /// the request is malformed, [`PipelineError::Provider`] when the
    /// fallback provider fails, and [`PipelineError::Cancelled`] once
    /// `cancel` fires.
    pub async fn evaluate(
        &self,
        request: SiteRequest,
        cancel: &CancellationToken,
    ) -> Result<ScoreResult, PipelineError> {
        let validated = request.validate(self.config.default_radius_meters)?;
        self.evaluate_validated(&validated, cancel).await
    }

    /// Score an already validated request.
    ///
    /// # Errors
    /// As [`SiteScorer::evaluate`], minus validation.
    pub async fn evaluate_validated(
        &self,
        request: &ValidatedRequest,
        cancel: &CancellationToken,
    ) -> Result<ScoreResult, PipelineError> {
        debug!(
            "scoring site at ({}, {}) within {} m",
            request.point.lat(),
            request.point.lon(),
            request.radius_meters
        );
        let extraction = FeatureEngine::new(&self.config)
            .extract(
                self.elements.as_ref(),
                self.enrichment.as_ref(),
                &request.polygon,
                request.point,
                request.radius_meters,
                cancel,
            )
            .await?;
        Ok(ScoringEngine::new(&self.config).score(&extraction, &request.weights))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::PoiCounts;
    use crate::request::PointInput;
    use crate::test_support::{StubElementSource, StubPoiCountSource, sample_ring};
    use rstest::{fixture, rstest};

    #[fixture]
    fn request() -> SiteRequest {
        SiteRequest {
            polygon: sample_ring(),
            point: PointInput {
                lat: 52.52,
                lon: 13.405,
            },
            radius_meters: None,
            weights: None,
        }
    }

    #[rstest]
    #[tokio::test]
    async fn invalid_request_never_reaches_providers(mut request: SiteRequest) {
        request.point.lat = 120.0;
        let source = StubElementSource::with_elements(Vec::new());
        let scorer = SiteScorer::new(ScoringConfig::default(), source, StubPoiCountSource::unavailable());
        let err = scorer
            .evaluate(request, &CancellationToken::new())
            .await
            .expect_err("latitude out of range");
        match err {
            PipelineError::Validation(inner) => assert_eq!(inner.field(), "point.lat"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[rstest]
    #[tokio::test]
    async fn provider_failure_is_fatal(request: SiteRequest) {
        let scorer = SiteScorer::new(
            ScoringConfig::default(),
            StubElementSource::failing(),
            StubPoiCountSource::available(PoiCounts::new()),
        );
        let err = scorer
            .evaluate(request, &CancellationToken::new())
            .await
            .expect_err("fallback failure aborts");
        assert!(matches!(err, PipelineError::Provider(_)));
    }

    #[rstest]
    #[tokio::test]
    async fn cancellation_aborts_pending_request(request: SiteRequest) {
        let scorer = SiteScorer::new(
            ScoringConfig::default(),
            StubElementSource::pending(),
            StubPoiCountSource::unavailable(),
        );
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        let (result, ()) = tokio::join!(scorer.evaluate(request, &cancel), async move {
            trigger.cancel();
        });
        assert!(matches!(result, Err(PipelineError::Cancelled)));
    }

    #[rstest]
    #[tokio::test]
    async fn successful_request_scores_in_range(request: SiteRequest) {
        let scorer = SiteScorer::new(
            ScoringConfig::default(),
            StubElementSource::with_elements(Vec::new()),
            StubPoiCountSource::available(PoiCounts::new()),
        );
        let result = scorer
            .evaluate(request, &CancellationToken::new())
            .await
            .expect("stubs succeed");
        assert!((0.0..=100.0).contains(&result.score));
        assert_eq!(result.explain.len(), 6);
    }
}
