//! Overpass API JSON response types.
//!
//! See: <https://wiki.openstreetmap.org/wiki/Overpass_API/Output_Formats#JSON>

use std::collections::HashMap;

use chargesite_core::{ElementKind, OsmElement};
use geo::Coord;
use serde::Deserialize;

use super::rings::join_rings;

/// Top-level Overpass response.
#[derive(Debug, Deserialize)]
pub struct OverpassResponse {
    /// Matched elements.
    #[serde(default)]
    pub elements: Vec<OverpassElement>,
    /// Server remark, set when the query failed at runtime.
    pub remark: Option<String>,
}

impl OverpassResponse {
    /// The runtime error reported in `remark`, if any.
    ///
    /// Overpass answers HTTP 200 with a partial result when a query runs out
    /// of time or memory.
    #[must_use]
    pub fn runtime_error(&self) -> Option<&str> {
        self.remark
            .as_deref()
            .filter(|remark| remark.contains("runtime error"))
    }
}

/// A latitude/longitude pair as Overpass encodes it.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LatLon {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
}

impl From<LatLon> for Coord<f64> {
    fn from(value: LatLon) -> Self {
        Self {
            x: value.lon,
            y: value.lat,
        }
    }
}

/// One element of an Overpass response.
#[derive(Debug, Deserialize)]
pub struct OverpassElement {
    /// `node`, `way` or `relation`.
    #[serde(rename = "type")]
    pub element_type: String,
    /// OSM identifier.
    pub id: i64,
    /// Node latitude.
    pub lat: Option<f64>,
    /// Node longitude.
    pub lon: Option<f64>,
    /// Centre point emitted by `out center`.
    pub center: Option<LatLon>,
    /// Inline way geometry emitted by `out geom`. Vertices outside the
    /// query bounds arrive as `null`.
    #[serde(default)]
    pub geometry: Vec<Option<LatLon>>,
    /// Relation members; `out geom` inlines each way member's geometry.
    #[serde(default)]
    pub members: Vec<OverpassMember>,
    /// OSM tags.
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

/// One member of a relation.
#[derive(Debug, Deserialize)]
pub struct OverpassMember {
    /// Member element type.
    #[serde(rename = "type")]
    pub member_type: String,
    /// Member role, such as `outer` or `inner`.
    #[serde(default)]
    pub role: String,
    /// Inline member geometry.
    #[serde(default)]
    pub geometry: Vec<Option<LatLon>>,
}

impl OverpassElement {
    /// Convert into the provider-neutral element model.
    ///
    /// Returns `None` for unknown element types.
    #[must_use]
    pub fn into_element(self) -> Option<OsmElement> {
        let kind = match self.element_type.as_str() {
            "node" => ElementKind::Node,
            "way" => ElementKind::Way,
            "relation" => ElementKind::Relation,
            _ => return None,
        };
        let position = match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Some(Coord { x: lon, y: lat }),
            _ => self.center.map(Coord::from),
        };
        let geometry = decode_line(self.geometry);
        let (outer_rings, inner_rings) = decode_rings(self.members);
        Some(OsmElement {
            kind,
            id: self.id,
            position,
            geometry,
            outer_rings,
            inner_rings,
            tags: self.tags,
        })
    }
}

fn decode_line(points: Vec<Option<LatLon>>) -> Vec<Coord<f64>> {
    points.into_iter().flatten().map(Coord::from).collect()
}

/// Assemble outer and inner rings from way members. An empty role counts as
/// outer.
fn decode_rings(members: Vec<OverpassMember>) -> (Vec<Vec<Coord<f64>>>, Vec<Vec<Coord<f64>>>) {
    let mut outer = Vec::new();
    let mut inner = Vec::new();
    for member in members.into_iter().filter(|m| m.member_type == "way") {
        match member.role.as_str() {
            "outer" | "" => outer.push(decode_line(member.geometry)),
            "inner" => inner.push(decode_line(member.geometry)),
            _ => {}
        }
    }
    (join_rings(outer), join_rings(inner))
}
