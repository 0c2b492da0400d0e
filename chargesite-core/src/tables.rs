//! Immutable lookup tables used during aggregation.
//!
//! Every table documents what a lookup miss returns.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::osm::OsmElement;

/// POI categories that drive the attractiveness score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoiCategory {
    /// Shopping malls and department stores.
    Mall,
    /// Supermarkets.
    Supermarket,
    /// Offices of any kind.
    Office,
    /// Schools, colleges and universities.
    School,
    /// Hospitals and clinics.
    Hospital,
    /// Cinemas, theatres and similar venues.
    Entertainment,
}

impl PoiCategory {
    /// Every category, in reporting order.
    pub const ALL: [Self; 6] = [
        Self::Mall,
        Self::Supermarket,
        Self::Office,
        Self::School,
        Self::Hospital,
        Self::Entertainment,
    ];

    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mall => "mall",
            Self::Supermarket => "supermarket",
            Self::Office => "office",
            Self::School => "school",
            Self::Hospital => "hospital",
            Self::Entertainment => "entertainment",
        }
    }

    /// Dwell weight from [`DWELL_WEIGHTS`], or [`DEFAULT_DWELL_WEIGHT`] on a
    /// miss.
    #[must_use]
    pub fn dwell_weight(self) -> f64 {
        DWELL_WEIGHTS
            .iter()
            .find(|(category, _)| *category == self)
            .map_or(DEFAULT_DWELL_WEIGHT, |(_, weight)| *weight)
    }
}

impl fmt::Display for PoiCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dwell weight applied to categories missing from [`DWELL_WEIGHTS`].
pub const DEFAULT_DWELL_WEIGHT: f64 = 2.0;

/// Per-category dwell weights.
pub const DWELL_WEIGHTS: &[(PoiCategory, f64)] = &[
    (PoiCategory::Mall, 6.0),
    (PoiCategory::Supermarket, 4.5),
    (PoiCategory::Office, 3.0),
    (PoiCategory::School, 3.5),
    (PoiCategory::Hospital, 5.0),
    (PoiCategory::Entertainment, 4.0),
];

/// A tag predicate mapping an element onto a POI category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoiRule {
    /// Category counted on a match.
    pub category: PoiCategory,
    /// Tag key to inspect.
    pub key: &'static str,
    /// Required value, or `None` to match on key presence only.
    pub value: Option<&'static str>,
}

impl PoiRule {
    const fn exact(category: PoiCategory, key: &'static str, value: &'static str) -> Self {
        Self {
            category,
            key,
            value: Some(value),
        }
    }

    const fn any(category: PoiCategory, key: &'static str) -> Self {
        Self {
            category,
            key,
            value: None,
        }
    }

    /// Whether `element` satisfies this rule.
    #[must_use]
    pub fn matches(&self, element: &OsmElement) -> bool {
        match (self.value, element.tag(self.key)) {
            (_, None) => false,
            (None, Some(_)) => true,
            (Some(expected), Some(actual)) => expected == actual,
        }
    }
}

/// POI matching rules. Elements matching no rule are not counted.
pub const POI_RULES: &[PoiRule] = &[
    PoiRule::exact(PoiCategory::Mall, "shop", "mall"),
    PoiRule::exact(PoiCategory::Mall, "shop", "department_store"),
    PoiRule::exact(PoiCategory::Supermarket, "shop", "supermarket"),
    PoiRule::any(PoiCategory::Office, "office"),
    PoiRule::exact(PoiCategory::School, "amenity", "school"),
    PoiRule::exact(PoiCategory::School, "amenity", "college"),
    PoiRule::exact(PoiCategory::School, "amenity", "university"),
    PoiRule::exact(PoiCategory::Hospital, "amenity", "hospital"),
    PoiRule::exact(PoiCategory::Hospital, "amenity", "clinic"),
    PoiRule::exact(PoiCategory::Entertainment, "amenity", "cinema"),
    PoiRule::exact(PoiCategory::Entertainment, "amenity", "theatre"),
    PoiRule::exact(PoiCategory::Entertainment, "leisure", "sports_centre"),
    PoiRule::exact(PoiCategory::Entertainment, "tourism", "attraction"),
];

/// Road class weights for weighted road length. Unknown classes weigh `0.0`.
pub const HIGHWAY_WEIGHTS: &[(&str, f64)] = &[
    ("motorway", 1.0),
    ("trunk", 0.9),
    ("motorway_link", 0.8),
    ("primary", 0.8),
    ("trunk_link", 0.7),
    ("primary_link", 0.6),
    ("secondary", 0.6),
    ("secondary_link", 0.5),
    ("tertiary", 0.5),
    ("tertiary_link", 0.4),
    ("unclassified", 0.35),
    ("residential", 0.3),
    ("living_street", 0.25),
    ("service", 0.2),
];

/// Weight for a `highway=*` class, `0.0` when the class is not listed.
#[must_use]
pub fn highway_weight(class: &str) -> f64 {
    lookup(HIGHWAY_WEIGHTS, class)
}

/// Road classes counted as "primary/secondary" for accessibility.
pub const PRIMARY_CLASSES: &[&str] = &["primary", "secondary"];

/// Road classes counted as "motorway/trunk" for accessibility.
pub const MOTORWAY_CLASSES: &[&str] = &["motorway", "trunk"];

/// Settlement signal per `place=*` value. Unlisted values contribute `0.0`.
pub const PLACE_SIGNALS: &[(&str, f64)] = &[
    ("city", 6.0),
    ("town", 4.0),
    ("village", 2.0),
    ("hamlet", 1.0),
];

/// Settlement signal for a `place=*` value.
#[must_use]
pub fn place_signal(place: &str) -> f64 {
    lookup(PLACE_SIGNALS, place)
}

/// Grid signal per `power=*` value. Unlisted values contribute `0.0`.
pub const POWER_SIGNALS: &[(&str, f64)] = &[
    ("substation", 3.0),
    ("transformer", 3.0),
    ("line", 1.0),
    ("minor_line", 0.5),
];

/// Grid signal for a `power=*` value.
#[must_use]
pub fn power_signal(power: &str) -> f64 {
    lookup(POWER_SIGNALS, power)
}

/// `landuse=*` values whose area counts towards residential density.
pub const SETTLED_LANDUSE: &[&str] = &["residential", "commercial"];

fn lookup(table: &[(&str, f64)], key: &str) -> f64 {
    table
        .iter()
        .find(|(candidate, _)| *candidate == key)
        .map_or(0.0, |(_, value)| *value)
}
