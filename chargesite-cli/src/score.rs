//! Score command implementation for the chargesite CLI.

use std::fmt;
use std::io::{BufReader, Read, Write};
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use chargesite_core::{ScoreResult, ScoringConfig, SiteRequest, SiteScorer, ValidatedRequest};
use chargesite_data::{OverpassConfig, OverpassProvider, PlacesConfig, PlacesProvider};
use clap::Parser;
use log::{debug, warn};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::fs::{file_is_file, open_utf8_file};
use crate::{
    ARG_SCORE_OVERPASS_URL, ARG_SCORE_PLACES_API_KEY, ARG_SCORE_PLACES_URL, ARG_SCORE_REQUEST,
    ARG_SCORE_SCORING_CONFIG, ARG_SCORE_TIMEOUT_SECS, CliError, ENV_SCORE_REQUEST,
};

/// CLI arguments for the `score` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Score a candidate charging site. The request is a JSON file \
                 holding the catchment polygon, the target point and optional \
                 radius and weight overrides. Spatial data comes from an \
                 Overpass endpoint, optionally enriched with Places counts \
                 when an API key is configured.",
    about = "Score a candidate charging site"
)]
#[ortho_config(prefix = "CHARGESITE")]
pub(crate) struct ScoreArgs {
    /// Path to a JSON file containing a site request.
    #[arg(value_name = "path")]
    #[serde(default)]
    pub(crate) request_path: Option<Utf8PathBuf>,
    /// Path to a JSON scoring configuration overriding the shipped defaults.
    #[arg(long = ARG_SCORE_SCORING_CONFIG, value_name = "path")]
    #[serde(default)]
    pub(crate) scoring_config: Option<Utf8PathBuf>,
    /// Overpass interpreter endpoint.
    #[arg(long = ARG_SCORE_OVERPASS_URL, value_name = "url")]
    #[serde(default)]
    pub(crate) overpass_url: Option<String>,
    /// Places nearby-search endpoint.
    #[arg(long = ARG_SCORE_PLACES_URL, value_name = "url")]
    #[serde(default)]
    pub(crate) places_url: Option<String>,
    /// Places API key. Enrichment is skipped without one.
    #[arg(long = ARG_SCORE_PLACES_API_KEY, value_name = "key")]
    #[serde(default)]
    pub(crate) places_api_key: Option<String>,
    /// Per-call provider timeout in seconds.
    #[arg(long = ARG_SCORE_TIMEOUT_SECS, value_name = "seconds")]
    #[serde(default)]
    pub(crate) timeout_secs: Option<u64>,
}

impl ScoreArgs {
    pub(crate) fn into_config(self) -> Result<ScoreConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        ScoreConfig::try_from(merged)
    }
}

/// Resolved `score` command configuration.
#[derive(Clone, PartialEq, Eq)]
pub(crate) struct ScoreConfig {
    /// Path to the JSON request file.
    pub(crate) request_path: Utf8PathBuf,
    /// Optional scoring configuration file.
    pub(crate) scoring_config: Option<Utf8PathBuf>,
    /// Overpass interpreter endpoint.
    pub(crate) overpass_url: String,
    /// Places nearby-search endpoint.
    pub(crate) places_url: String,
    /// Places API key.
    pub(crate) places_api_key: Option<String>,
    /// Per-call timeout override.
    pub(crate) timeout: Option<Duration>,
}

impl fmt::Debug for ScoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScoreConfig")
            .field("request_path", &self.request_path)
            .field("scoring_config", &self.scoring_config)
            .field("overpass_url", &self.overpass_url)
            .field("places_url", &self.places_url)
            .field(
                "places_api_key",
                &self.places_api_key.as_ref().map(|_| "<redacted>"),
            )
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ScoreConfig {
    pub(crate) fn validate_sources(&self) -> Result<(), CliError> {
        Self::require_existing(&self.request_path, ARG_SCORE_REQUEST)?;
        if let Some(path) = &self.scoring_config {
            Self::require_existing(path, ARG_SCORE_SCORING_CONFIG)?;
        }
        Ok(())
    }

    fn require_existing(path: &Utf8Path, field: &'static str) -> Result<(), CliError> {
        match file_is_file(path) {
            Ok(true) => Ok(()),
            Ok(false) => Err(CliError::SourcePathNotFile {
                field,
                path: path.to_path_buf(),
            }),
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
                Err(CliError::MissingSourceFile {
                    field,
                    path: path.to_path_buf(),
                })
            }
            Err(source) => Err(CliError::InspectSourcePath {
                field,
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Overpass provider configuration honouring the timeout override.
    pub(crate) fn overpass_config(&self) -> OverpassConfig {
        let config = OverpassConfig::new(self.overpass_url.clone());
        match self.timeout {
            Some(timeout) => config.with_timeout(timeout),
            None => config,
        }
    }

    /// Places provider configuration honouring the timeout override.
    pub(crate) fn places_config(&self) -> PlacesConfig {
        let mut config = PlacesConfig::new(self.places_url.clone());
        if let Some(key) = &self.places_api_key {
            config = config.with_api_key(key.clone());
        }
        match self.timeout {
            Some(timeout) => config.with_timeout(timeout),
            None => config,
        }
    }
}

impl TryFrom<ScoreArgs> for ScoreConfig {
    type Error = CliError;

    fn try_from(args: ScoreArgs) -> Result<Self, Self::Error> {
        let request_path = args.request_path.ok_or(CliError::MissingArgument {
            field: ARG_SCORE_REQUEST,
            env: ENV_SCORE_REQUEST,
        })?;
        let overpass_url = args
            .overpass_url
            .unwrap_or_else(|| OverpassConfig::default().base_url);
        let places_url = args
            .places_url
            .unwrap_or_else(|| PlacesConfig::default().base_url);

        Ok(Self {
            request_path,
            scoring_config: args.scoring_config,
            overpass_url,
            places_url,
            places_api_key: args.places_api_key,
            timeout: args.timeout_secs.map(Duration::from_secs),
        })
    }
}

/// Builds the scoring pipeline for the current invocation.
pub(crate) trait ScorerBuilder {
    fn build(&self, config: &ScoreConfig, scoring: ScoringConfig)
    -> Result<SiteScorer, CliError>;
}

pub(crate) struct DefaultScorerBuilder;

impl ScorerBuilder for DefaultScorerBuilder {
    fn build(
        &self,
        config: &ScoreConfig,
        scoring: ScoringConfig,
    ) -> Result<SiteScorer, CliError> {
        let overpass = OverpassProvider::with_config(config.overpass_config()).map_err(
            |source| CliError::BuildProvider {
                provider: "overpass",
                base_url: config.overpass_url.clone(),
                source,
            },
        )?;
        let places = PlacesProvider::with_config(config.places_config()).map_err(|source| {
            CliError::BuildProvider {
                provider: "places",
                base_url: config.places_url.clone(),
                source,
            }
        })?;
        Ok(SiteScorer::new(scoring, overpass, places))
    }
}

pub(crate) fn run_score(args: ScoreArgs) -> Result<(), CliError> {
    let mut stdout = std::io::stdout().lock();
    run_score_with(args, &DefaultScorerBuilder, &mut stdout)
}

pub(crate) fn run_score_with(
    args: ScoreArgs,
    builder: &dyn ScorerBuilder,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let result = execute_score(args, builder)?;
    write_score_result(writer, &result)
}

fn execute_score(args: ScoreArgs, builder: &dyn ScorerBuilder) -> Result<ScoreResult, CliError> {
    let config = resolve_score_config(args)?;
    let scoring = load_scoring_config(config.scoring_config.as_deref())?;
    let request = load_site_request(&config.request_path)?
        .validate(scoring.default_radius_meters)
        .map_err(|source| CliError::InvalidSiteRequest {
            path: config.request_path.clone(),
            source,
        })?;
    let scorer = builder.build(&config, scoring)?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;
    runtime.block_on(evaluate_until_interrupted(&scorer, &request))
}

/// Run the pipeline, cancelling it cleanly on Ctrl-C.
async fn evaluate_until_interrupted(
    scorer: &SiteScorer,
    request: &ValidatedRequest,
) -> Result<ScoreResult, CliError> {
    let cancel = CancellationToken::new();
    let evaluation = scorer.evaluate_validated(request, &cancel);
    tokio::pin!(evaluation);
    let outcome = tokio::select! {
        outcome = &mut evaluation => outcome,
        Ok(()) = tokio::signal::ctrl_c() => {
            warn!("interrupt received; cancelling site scoring");
            cancel.cancel();
            evaluation.await
        }
    };
    outcome.map_err(CliError::Score)
}

fn resolve_score_config(args: ScoreArgs) -> Result<ScoreConfig, CliError> {
    let config = args.into_config()?;
    config.validate_sources()?;
    debug!("resolved score configuration: {config:?}");
    Ok(config)
}

/// Loads the scoring configuration, falling back to the shipped defaults.
pub(crate) fn load_scoring_config(path: Option<&Utf8Path>) -> Result<ScoringConfig, CliError> {
    let Some(path) = path else {
        return Ok(ScoringConfig::default());
    };
    let read_error = |source| CliError::ReadScoringConfig {
        path: path.to_path_buf(),
        source,
    };
    let mut contents = String::new();
    open_utf8_file(path)
        .map_err(read_error)?
        .read_to_string(&mut contents)
        .map_err(read_error)?;
    ScoringConfig::from_json_str(&contents).map_err(|source| CliError::InvalidScoringConfig {
        path: path.to_path_buf(),
        source,
    })
}

/// Loads a JSON-encoded [`SiteRequest`] from disk.
pub(crate) fn load_site_request(path: &Utf8Path) -> Result<SiteRequest, CliError> {
    let file = open_utf8_file(path).map_err(|source| CliError::OpenSiteRequest {
        path: path.to_path_buf(),
        source,
    })?;
    let reader = BufReader::new(file);
    serde_json::from_reader(reader).map_err(|source| CliError::ParseSiteRequest {
        path: path.to_path_buf(),
        source,
    })
}

fn write_score_result(writer: &mut dyn Write, result: &ScoreResult) -> Result<(), CliError> {
    let payload = serde_json::to_string_pretty(result).map_err(CliError::SerialiseScoreResult)?;
    writer
        .write_all(payload.as_bytes())
        .map_err(CliError::WriteScoreOutput)?;
    writer
        .write_all(b"\n")
        .map_err(CliError::WriteScoreOutput)?;
    Ok(())
}

#[cfg(test)]
pub(crate) fn config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<ScoreConfig, CliError> {
    let merged = ScoreArgs::merge_from_layers(layers).map_err(CliError::from)?;
    ScoreConfig::try_from(merged)
}
