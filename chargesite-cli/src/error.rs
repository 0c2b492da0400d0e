//! Error types emitted by the chargesite CLI.
//!
//! Keep this error type reasonably small, as many CLI helpers return
//! `Result<_, CliError>` and the workspace enables `clippy::result_large_err`.

use std::sync::Arc;

use camino::Utf8PathBuf;
use chargesite_core::{ConfigError, PipelineError, ValidationError};
use chargesite_data::ProviderBuildError;
use thiserror::Error;

/// Errors emitted by the chargesite CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        /// Argument name.
        field: &'static str,
        /// Environment variable that can supply it.
        env: &'static str,
    },
    /// A referenced input path does not exist on disk.
    #[error("{field} path {path:?} does not exist")]
    MissingSourceFile {
        /// Argument name.
        field: &'static str,
        /// Offending path.
        path: Utf8PathBuf,
    },
    /// A referenced input path exists but is not a file.
    #[error("{field} path {path:?} exists but is not a file")]
    SourcePathNotFile {
        /// Argument name.
        field: &'static str,
        /// Offending path.
        path: Utf8PathBuf,
    },
    /// A referenced input path could not be inspected due to an IO error.
    #[error("failed to inspect {field} path {path:?}: {source}")]
    InspectSourcePath {
        /// Argument name.
        field: &'static str,
        /// Offending path.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
    /// Opening the site request file failed.
    #[error("failed to open site request at {path:?}: {source}")]
    OpenSiteRequest {
        /// Request path.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
    /// Site request JSON could not be decoded.
    #[error("failed to parse site request JSON at {path:?}: {source}")]
    ParseSiteRequest {
        /// Request path.
        path: Utf8PathBuf,
        /// Decoder error.
        #[source]
        source: serde_json::Error,
    },
    /// The site request failed validation.
    #[error("site request in {path:?} failed validation: {source}")]
    InvalidSiteRequest {
        /// Request path.
        path: Utf8PathBuf,
        /// Validation failure naming the offending field.
        #[source]
        source: ValidationError,
    },
    /// Reading the scoring configuration file failed.
    #[error("failed to read scoring configuration at {path:?}: {source}")]
    ReadScoringConfig {
        /// Configuration path.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
    /// The scoring configuration did not parse or validate.
    #[error("invalid scoring configuration at {path:?}: {source}")]
    InvalidScoringConfig {
        /// Configuration path.
        path: Utf8PathBuf,
        /// Parse or validation failure.
        #[source]
        source: ConfigError,
    },
    /// Constructing a spatial data provider failed.
    #[error("failed to build {provider} provider for {base_url:?}: {source}")]
    BuildProvider {
        /// Provider name.
        provider: &'static str,
        /// Configured endpoint.
        base_url: String,
        /// Construction failure.
        #[source]
        source: ProviderBuildError,
    },
    /// Building the async runtime failed.
    #[error("failed to start async runtime: {0}")]
    Runtime(#[source] std::io::Error),
    /// The scoring pipeline failed.
    #[error("scoring failed: {0}")]
    Score(#[source] PipelineError),
    /// Serialising the score result failed.
    #[error("failed to serialise score result: {0}")]
    SerialiseScoreResult(#[source] serde_json::Error),
    /// Writing the score output failed.
    #[error("failed to write score output: {0}")]
    WriteScoreOutput(#[source] std::io::Error),
}
