//! HTTP provider adapters for the charging site scoring pipeline.
//!
//! - [`overpass`] implements [`chargesite_core::ElementSource`], the
//!   authoritative fallback whose failure aborts a request.
//! - [`places`] implements [`chargesite_core::PoiCountSource`], best-effort
//!   enrichment that degrades to "unavailable".
//! - [`RetryPolicy`] wraps fallible provider calls in bounded exponential
//!   backoff.
//!
//! No scoring rules live here; adapters only translate between wire formats
//! and the core element model.

mod http;
pub mod overpass;
pub mod places;
pub mod retry;

pub use http::{DEFAULT_USER_AGENT, ProviderBuildError};
pub use overpass::{OverpassConfig, OverpassProvider};
pub use places::{PlacesConfig, PlacesProvider};
pub use retry::RetryPolicy;
