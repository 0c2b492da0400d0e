//! Overpass QL construction.

use chargesite_core::TargetPoint;

/// Server-side timeout embedded in every query, in seconds.
pub const QUERY_TIMEOUT_SECS: u64 = 25;

/// Element filters selected around the target point.
///
/// Covers the POI keys, charging and parking amenities, roads, land use,
/// settlement places and grid infrastructure read during aggregation.
/// `nwr` relations come back with member geometry, so land-use
/// multipolygons contribute their area.
const SELECTORS: [&str; 9] = [
    "nwr[\"amenity\"]",
    "nwr[\"shop\"]",
    "nwr[\"office\"]",
    "nwr[\"leisure\"]",
    "nwr[\"tourism\"]",
    "way[\"highway\"]",
    "nwr[\"landuse\"]",
    "nwr[\"place\"]",
    "nwr[\"power\"]",
];

/// Build a single `around:` query returning JSON with inline way geometry.
///
/// # Examples
/// ```
/// use chargesite_core::TargetPoint;
/// use chargesite_data::overpass::build_query;
///
/// let point = TargetPoint::new(52.52, 13.405)?;
/// let query = build_query(point, 750.0);
/// assert!(query.contains("around:750,52.5200000,13.4050000"));
/// assert!(query.trim_end().ends_with("out geom;"));
/// # Ok::<(), chargesite_core::ValidationError>(())
/// ```
#[must_use]
pub fn build_query(point: TargetPoint, radius_meters: f64) -> String {
    let around = format!(
        "(around:{radius_meters:.0},{lat:.7},{lon:.7})",
        lat = point.lat(),
        lon = point.lon()
    );
    let body: String = SELECTORS
        .iter()
        .map(|selector| format!("  {selector}{around};\n"))
        .collect();
    format!("[out:json][timeout:{QUERY_TIMEOUT_SECS}];\n(\n{body});\nout geom;\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chargesite_core::test_support::sample_point;
    use rstest::rstest;

    #[rstest]
    fn query_selects_every_feature_family() {
        let query = build_query(sample_point(), 1_000.0);
        for key in [
            "amenity", "shop", "office", "leisure", "tourism", "highway", "landuse", "place",
            "power",
        ] {
            assert!(query.contains(&format!("[\"{key}\"]")), "missing {key}");
        }
    }

    #[rstest]
    fn query_requests_json_and_geometry() {
        let query = build_query(sample_point(), 1_000.0);
        assert!(query.starts_with("[out:json][timeout:25];"));
        assert!(query.contains("out geom;"));
    }

    #[rstest]
    #[case(1_000.0, "around:1000,")]
    #[case(499.6, "around:500,")]
    fn radius_is_rounded_to_whole_metres(#[case] radius: f64, #[case] expected: &str) {
        assert!(build_query(sample_point(), radius).contains(expected));
    }
}
