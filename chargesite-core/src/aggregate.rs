//! Single-pass aggregation of provider elements into raw feature proxies.
//!
//! The scan is a fold: each element is absorbed into an [`Accumulator`]
//! exactly once and the accumulator is consumed into an immutable
//! [`RawFeatureSnapshot`].

use std::collections::BTreeMap;

use geo::Coord;

use crate::geometry::{
    circle_area_square_meters, distance_meters, distance_to_polyline_meters,
    polygon_area_square_meters, polyline_length_meters,
};
use crate::osm::OsmElement;
use crate::request::{Polygon, TargetPoint};
use crate::tables::{
    MOTORWAY_CLASSES, POI_RULES, PRIMARY_CLASSES, PoiCategory, SETTLED_LANDUSE, highway_weight,
    place_signal, power_signal,
};

/// POI counts keyed by category.
pub type PoiCounts = BTreeMap<PoiCategory, u32>;

/// Power assumed per plug when a station advertises only its capacity.
pub const KW_PER_PLUG: f64 = 22.0;
/// Power assumed for stations without any usable power tag.
pub const DEFAULT_STATION_KW: f64 = 50.0;
/// Stations at or above this estimated power count as high competition.
pub const HIGH_POWER_KW: f64 = 150.0;
/// Distance offset in the competition gravity denominator, in metres.
pub const GRAVITY_OFFSET_METERS: f64 = 75.0;
/// Distance-decay exponent of the competition gravity model.
pub const GRAVITY_EXPONENT: f64 = 1.2;
/// Multiplier applied to residential density in the demography proxy.
pub const RESIDENTIAL_DEMOGRAPHY_FACTOR: f64 = 80.0;

/// Flat set of raw proxies derived from one provider result set.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFeatureSnapshot {
    /// POI counts per category.
    pub poi_counts: PoiCounts,
    /// Sum of per-match dwell weights.
    pub poi_dwell_score: f64,
    /// Weighted road kilometres per square kilometre.
    pub road_density: f64,
    /// Distance-decayed sum of competing station power.
    pub competition_gravity: f64,
    /// Settlement signal plus scaled residential density.
    pub demography_proxy: f64,
    /// Sum of power infrastructure signals.
    pub grid_proxy: f64,
    /// Distance to the nearest major road; `NaN` when none was found.
    pub accessibility_meters: f64,
    /// Residential and commercial land share of the catchment, `0..=1`
    /// for non-overlapping land use.
    pub residential_density: f64,
    /// Whether free parking was detected.
    pub free_parking: bool,
    /// Number of stations estimated at or above [`HIGH_POWER_KW`].
    pub high_competition_stations: u32,
    /// Number of charging stations seen.
    pub charging_stations: u32,
    /// Catchment area used for density calculations.
    pub area_square_meters: f64,
}

impl Default for RawFeatureSnapshot {
    fn default() -> Self {
        Self {
            poi_counts: PoiCounts::new(),
            poi_dwell_score: 0.0,
            road_density: 0.0,
            competition_gravity: 0.0,
            demography_proxy: 0.0,
            grid_proxy: 0.0,
            accessibility_meters: f64::NAN,
            residential_density: 0.0,
            free_parking: false,
            high_competition_stations: 0,
            charging_stations: 0,
            area_square_meters: 0.0,
        }
    }
}

/// Catchment area in square metres, falling back to a circle of
/// `radius_meters` when the polygon is degenerate.
#[must_use]
pub fn catchment_area_square_meters(polygon: &Polygon, radius_meters: f64) -> f64 {
    let area = polygon_area_square_meters(polygon.ring());
    if area > 0.0 && area.is_finite() {
        area
    } else {
        circle_area_square_meters(radius_meters)
    }
}

/// Aggregate `elements` around `target` into a snapshot.
///
/// `area_square_meters` must be positive; use
/// [`catchment_area_square_meters`] to obtain it.
///
/// # Examples
/// ```
/// use geo::Coord;
/// use chargesite_core::aggregate::aggregate;
/// use chargesite_core::osm::OsmElement;
/// use chargesite_core::request::TargetPoint;
///
/// let target = TargetPoint::new(52.5, 13.4)?;
/// let elements = [OsmElement::node(1, Coord { x: 13.401, y: 52.5 }, [("shop", "mall")])];
/// let snapshot = aggregate(&elements, target, 1.0e6);
/// assert!((snapshot.poi_dwell_score - 6.0).abs() < 1e-9);
/// # Ok::<(), chargesite_core::ValidationError>(())
/// ```
#[must_use]
pub fn aggregate<'a, I>(elements: I, target: TargetPoint, area_square_meters: f64) -> RawFeatureSnapshot
where
    I: IntoIterator<Item = &'a OsmElement>,
{
    elements
        .into_iter()
        .fold(Accumulator::new(target.coord()), Accumulator::absorb)
        .finish(area_square_meters)
}

/// Running totals of the aggregation scan.
#[derive(Debug, Clone)]
struct Accumulator {
    target: Coord<f64>,
    poi_counts: PoiCounts,
    dwell_score: f64,
    free_parking: bool,
    competition_gravity: f64,
    high_competition_stations: u32,
    charging_stations: u32,
    weighted_road_meters: f64,
    min_primary_meters: f64,
    min_motorway_meters: f64,
    residential_area: f64,
    settlement_signal: f64,
    grid_signal: f64,
}

impl Accumulator {
    fn new(target: Coord<f64>) -> Self {
        Self {
            target,
            poi_counts: PoiCounts::new(),
            dwell_score: 0.0,
            free_parking: false,
            competition_gravity: 0.0,
            high_competition_stations: 0,
            charging_stations: 0,
            weighted_road_meters: 0.0,
            min_primary_meters: f64::INFINITY,
            min_motorway_meters: f64::INFINITY,
            residential_area: 0.0,
            settlement_signal: 0.0,
            grid_signal: 0.0,
        }
    }

    fn absorb(mut self, element: &OsmElement) -> Self {
        self.count_pois(element);
        self.detect_free_parking(element);
        self.add_competition(element);
        self.add_road(element);
        self.add_land_use(element);
        self.add_grid(element);
        self
    }

    fn count_pois(&mut self, element: &OsmElement) {
        for rule in POI_RULES.iter().filter(|rule| rule.matches(element)) {
            *self.poi_counts.entry(rule.category).or_insert(0) += 1;
            self.dwell_score += rule.category.dwell_weight();
        }
    }

    fn detect_free_parking(&mut self, element: &OsmElement) {
        if self.free_parking || !element.has_tag("amenity", "parking") {
            return;
        }
        self.free_parking = match element.tag("fee") {
            Some(fee) => fee == "no",
            None => element.has_tag("access", "customers"),
        };
    }

    fn add_competition(&mut self, element: &OsmElement) {
        if !element.has_tag("amenity", "charging_station") {
            return;
        }
        let Some(position) = element.anchor() else {
            return;
        };
        self.charging_stations += 1;
        let power_kw = estimate_station_power_kw(element);
        let distance = distance_meters(self.target, position);
        self.competition_gravity +=
            power_kw / (distance + GRAVITY_OFFSET_METERS).powf(GRAVITY_EXPONENT);
        if power_kw >= HIGH_POWER_KW {
            self.high_competition_stations += 1;
        }
    }

    fn add_road(&mut self, element: &OsmElement) {
        let Some(class) = element.tag("highway") else {
            return;
        };
        let length = polyline_length_meters(&element.geometry);
        self.weighted_road_meters += length * highway_weight(class);

        let is_primary = PRIMARY_CLASSES.contains(&class);
        let is_motorway = MOTORWAY_CLASSES.contains(&class);
        if !is_primary && !is_motorway {
            return;
        }
        let line: Vec<Coord<f64>> = element.vertices().collect();
        let nearest = distance_to_polyline_meters(self.target, &line);
        if is_primary {
            self.min_primary_meters = self.min_primary_meters.min(nearest);
        }
        if is_motorway {
            self.min_motorway_meters = self.min_motorway_meters.min(nearest);
        }
    }

    fn add_land_use(&mut self, element: &OsmElement) {
        if let Some(landuse) = element.tag("landuse")
            && SETTLED_LANDUSE.contains(&landuse)
        {
            self.residential_area += element.area_square_meters();
        }
        if let Some(place) = element.tag("place") {
            self.settlement_signal += place_signal(place);
        }
    }

    fn add_grid(&mut self, element: &OsmElement) {
        if let Some(power) = element.tag("power") {
            self.grid_signal += power_signal(power);
        }
    }

    fn finish(self, area_square_meters: f64) -> RawFeatureSnapshot {
        let area_km2 = area_square_meters / 1.0e6;
        let road_density = Some(self.weighted_road_meters / 1_000.0 / area_km2)
            .filter(|density| density.is_finite())
            .unwrap_or(0.0);
        let residential_density = Some(self.residential_area / area_square_meters)
            .filter(|density| density.is_finite())
            .unwrap_or(0.0);
        let nearest_major = self.min_primary_meters.min(self.min_motorway_meters);
        let accessibility_meters = if nearest_major.is_finite() {
            nearest_major
        } else {
            f64::NAN
        };

        RawFeatureSnapshot {
            poi_counts: self.poi_counts,
            poi_dwell_score: self.dwell_score,
            road_density,
            competition_gravity: self.competition_gravity,
            demography_proxy: self.settlement_signal
                + residential_density * RESIDENTIAL_DEMOGRAPHY_FACTOR,
            grid_proxy: self.grid_signal,
            accessibility_meters,
            residential_density,
            free_parking: self.free_parking,
            high_competition_stations: self.high_competition_stations,
            charging_stations: self.charging_stations,
            area_square_meters,
        }
    }
}

/// Estimate a charging station's power in kW from its tags.
///
/// Priority: plug `capacity` × [`KW_PER_PLUG`], then the largest advertised
/// socket or station output, then [`DEFAULT_STATION_KW`].
#[must_use]
pub fn estimate_station_power_kw(element: &OsmElement) -> f64 {
    if let Some(plugs) = element
        .tag("capacity")
        .and_then(|raw| raw.trim().parse::<f64>().ok())
        .filter(|plugs| plugs.is_finite() && *plugs > 0.0)
    {
        return plugs * KW_PER_PLUG;
    }

    element
        .tags
        .iter()
        .filter(|(key, _)| is_output_key(key))
        .filter_map(|(_, value)| parse_power_kw(value))
        .fold(None, |best: Option<f64>, kw| Some(best.map_or(kw, |b| b.max(kw))))
        .unwrap_or(DEFAULT_STATION_KW)
}

fn is_output_key(key: &str) -> bool {
    (key.starts_with("socket:") && key.ends_with(":output"))
        || matches!(key, "charging_station:output" | "maxpower" | "max_output")
}

/// Parse power values such as `"22 kW"`, `"150kW"`, `"50000 W"` or `"50"`.
///
/// Bare numbers are read as kW. Multiple values separated by `;` yield the
/// largest.
#[must_use]
pub fn parse_power_kw(raw: &str) -> Option<f64> {
    raw.split(';')
        .filter_map(parse_single_power_kw)
        .fold(None, |best: Option<f64>, kw| Some(best.map_or(kw, |b| b.max(kw))))
}

fn parse_single_power_kw(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    let split_at = trimmed
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(trimmed.len());
    let (number, unit) = trimmed.split_at(split_at);
    let value: f64 = number.parse().ok()?;
    let scale = match unit.trim().to_ascii_lowercase().as_str() {
        "" | "kw" => 1.0,
        "w" => 1.0e-3,
        "mw" => 1.0e3,
        _ => return None,
    };
    Some(value * scale).filter(|kw| kw.is_finite() && *kw > 0.0)
}
