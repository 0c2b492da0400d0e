//! Places nearby-search adapter: optional POI-count enrichment.
//!
//! One search runs per [`chargesite_core::PoiCategory`]; the count is the
//! number of returned places. Missing keys, HTTP failures and non-success
//! statuses all collapse into "unavailable", and the scoring pipeline falls
//! back to counts aggregated from Overpass elements.

mod provider;
mod response;

pub use provider::{DEFAULT_PLACES_URL, PlacesConfig, PlacesProvider, SearchFilter};
pub use response::NearbySearchResponse;
