//! Command-line interface for scoring EV charging sites.
#![forbid(unsafe_code)]

use clap::{Parser, Subcommand};

mod error;
mod fs;
mod score;

pub use error::CliError;

use score::{ScoreArgs, run_score};

pub(crate) const ARG_SCORE_REQUEST: &str = "request-path";
pub(crate) const ARG_SCORE_SCORING_CONFIG: &str = "scoring-config";
pub(crate) const ARG_SCORE_OVERPASS_URL: &str = "overpass-url";
pub(crate) const ARG_SCORE_PLACES_URL: &str = "places-url";
pub(crate) const ARG_SCORE_PLACES_API_KEY: &str = "places-api-key";
pub(crate) const ARG_SCORE_TIMEOUT_SECS: &str = "timeout-secs";
pub(crate) const ENV_SCORE_REQUEST: &str = "CHARGESITE_CMDS_SCORE_REQUEST_PATH";

/// Run the chargesite CLI with the current process arguments and environment.
///
/// # Errors
/// Returns a [`CliError`] describing the first failure: argument parsing,
/// configuration layering, input loading, provider construction, scoring or
/// output.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    match cli.command {
        Command::Score(args) => run_score(args),
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "chargesite",
    about = "Feasibility scoring for EV charging site candidates",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Score a candidate site described by a JSON request.
    Score(ScoreArgs),
}

#[cfg(test)]
mod tests;
