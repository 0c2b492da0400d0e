//! OpenStreetMap-style elements returned by spatial data providers.

use std::collections::HashMap;

use geo::Coord;

use crate::geometry::polygon_area_square_meters;

/// Free-form OSM key/value tags.
pub type Tags = HashMap<String, String>;

/// OSM element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    /// A single positioned node.
    Node,
    /// An ordered list of nodes forming a line or closed area.
    Way,
    /// A grouping of other elements.
    Relation,
}

/// A raw element from a spatial query.
///
/// Coordinates are WGS84 with `x = longitude` and `y = latitude`. Ways carry
/// their inline `geometry`; nodes and centre-resolved ways carry a
/// `position`. Multipolygon relations carry assembled `outer_rings` and
/// `inner_rings`.
#[derive(Debug, Clone, PartialEq)]
pub struct OsmElement {
    /// Element type.
    pub kind: ElementKind,
    /// Provider-assigned identifier.
    pub id: i64,
    /// Point position or way centre, when known.
    pub position: Option<Coord<f64>>,
    /// Inline line geometry, empty for nodes.
    pub geometry: Vec<Coord<f64>>,
    /// Closed outer boundaries of a multipolygon relation.
    pub outer_rings: Vec<Vec<Coord<f64>>>,
    /// Holes cut out of the outer boundaries.
    pub inner_rings: Vec<Vec<Coord<f64>>>,
    /// OSM tags.
    pub tags: Tags,
}

impl OsmElement {
    /// Construct a positioned node.
    ///
    /// # Examples
    /// ```
    /// use geo::Coord;
    /// use chargesite_core::osm::OsmElement;
    ///
    /// let node = OsmElement::node(1, Coord { x: 13.4, y: 52.5 }, [("amenity", "parking")]);
    /// assert_eq!(node.tag("amenity"), Some("parking"));
    /// ```
    #[must_use]
    pub fn node<'a>(
        id: i64,
        position: Coord<f64>,
        tags: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Self {
        Self {
            kind: ElementKind::Node,
            id,
            position: Some(position),
            geometry: Vec::new(),
            outer_rings: Vec::new(),
            inner_rings: Vec::new(),
            tags: collect_tags(tags),
        }
    }

    /// Construct a way from its vertex list.
    #[must_use]
    pub fn way<'a>(
        id: i64,
        geometry: Vec<Coord<f64>>,
        tags: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Self {
        Self {
            kind: ElementKind::Way,
            id,
            position: None,
            geometry,
            outer_rings: Vec::new(),
            inner_rings: Vec::new(),
            tags: collect_tags(tags),
        }
    }

    /// Construct a multipolygon relation from assembled rings.
    #[must_use]
    pub fn multipolygon<'a>(
        id: i64,
        outer_rings: Vec<Vec<Coord<f64>>>,
        inner_rings: Vec<Vec<Coord<f64>>>,
        tags: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Self {
        Self {
            kind: ElementKind::Relation,
            id,
            position: None,
            geometry: Vec::new(),
            outer_rings,
            inner_rings,
            tags: collect_tags(tags),
        }
    }

    /// Enclosed area in square metres.
    ///
    /// Multipolygons count their outer rings minus their holes; anything else
    /// treats `geometry` as a ring.
    #[must_use]
    pub fn area_square_meters(&self) -> f64 {
        if self.outer_rings.is_empty() {
            return polygon_area_square_meters(&self.geometry);
        }
        let ring_sum = |rings: &[Vec<Coord<f64>>]| -> f64 {
            rings.iter().map(|ring| polygon_area_square_meters(ring)).sum()
        };
        (ring_sum(&self.outer_rings) - ring_sum(&self.inner_rings)).max(0.0)
    }

    /// Look up a tag value.
    #[must_use]
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// Whether the element carries `key=value`.
    #[must_use]
    pub fn has_tag(&self, key: &str, value: &str) -> bool {
        self.tag(key) == Some(value)
    }

    /// Representative position: the explicit position, else the first
    /// geometry vertex.
    #[must_use]
    pub fn anchor(&self) -> Option<Coord<f64>> {
        self.position.or_else(|| self.geometry.first().copied())
    }

    /// Vertices to measure distances against: the geometry when present,
    /// else the anchor.
    pub fn vertices(&self) -> impl Iterator<Item = Coord<f64>> + '_ {
        let fallback = if self.geometry.is_empty() {
            self.position
        } else {
            None
        };
        self.geometry.iter().copied().chain(fallback)
    }
}

fn collect_tags<'a>(tags: impl IntoIterator<Item = (&'a str, &'a str)>) -> Tags {
    tags.into_iter()
        .map(|(key, value)| (key.to_owned(), value.to_owned()))
        .collect()
}
