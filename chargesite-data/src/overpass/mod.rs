//! Overpass API adapter: the authoritative fallback element source.
//!
//! [`OverpassProvider`] turns a point and radius into one Overpass QL query
//! ([`build_query`]), posts it to an interpreter endpoint, and converts the
//! JSON answer into [`chargesite_core::OsmElement`] values. Transient
//! failures are retried with [`crate::RetryPolicy`]; exhaustion surfaces as
//! [`chargesite_core::ProviderError::Exhausted`] and aborts the scoring
//! request.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use chargesite_data::RetryPolicy;
//! use chargesite_data::overpass::{OverpassConfig, OverpassProvider};
//!
//! let config = OverpassConfig::new("https://overpass.kumi.systems/api/interpreter")
//!     .with_timeout(Duration::from_secs(20))
//!     .with_retry(RetryPolicy::new(5, Duration::from_secs(1)));
//! let provider = OverpassProvider::with_config(config)?;
//! # Ok::<(), chargesite_data::ProviderBuildError>(())
//! ```

mod provider;
mod query;
mod response;
mod rings;

pub use provider::{DEFAULT_OVERPASS_URL, OverpassConfig, OverpassProvider};
pub use query::{QUERY_TIMEOUT_SECS, build_query};
pub use response::{LatLon, OverpassElement, OverpassMember, OverpassResponse};
