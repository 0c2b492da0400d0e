//! Spherical-approximation geometry helpers.
//!
//! Coordinates are WGS84 [`Coord`] values with `x = longitude` and
//! `y = latitude`, both in degrees. The maths assumes a spherical Earth, which
//! is accurate enough for catchment-sized areas.

use geo::Coord;

/// Mean Earth radius used by every helper in this module.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Great-circle distance between two coordinates, in metres.
///
/// # Examples
/// ```
/// use geo::Coord;
/// use chargesite_core::geometry::distance_meters;
///
/// let a = Coord { x: 0.0, y: 0.0 };
/// let b = Coord { x: 0.0, y: 1.0 };
/// let d = distance_meters(a, b);
/// assert!((d - 111_194.9).abs() < 1.0);
/// ```
#[must_use]
pub fn distance_meters(a: Coord<f64>, b: Coord<f64>) -> f64 {
    let lat1 = a.y.to_radians();
    let lat2 = b.y.to_radians();
    let d_lat = (b.y - a.y).to_radians();
    let d_lon = (b.x - a.x).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).max(0.0).sqrt());
    (EARTH_RADIUS_METERS * c).max(0.0)
}

/// Length of a polyline in metres, summing consecutive great-circle segments.
#[must_use]
pub fn polyline_length_meters(points: &[Coord<f64>]) -> f64 {
    points
        .windows(2)
        .map(|pair| match pair {
            [a, b] => distance_meters(*a, *b),
            _ => 0.0,
        })
        .sum()
}

/// Shortest distance in metres from `point` to a polyline.
///
/// Each segment is searched on an equirectangular plane centred on `point`;
/// the closest point found is then measured with [`distance_meters`]. A single
/// vertex is measured directly and an empty line is infinitely far away.
#[must_use]
pub fn distance_to_polyline_meters(point: Coord<f64>, line: &[Coord<f64>]) -> f64 {
    match line {
        [] => f64::INFINITY,
        [only] => distance_meters(point, *only),
        _ => line
            .windows(2)
            .map(|pair| match pair {
                [a, b] => distance_to_segment_meters(point, *a, *b),
                _ => f64::INFINITY,
            })
            .fold(f64::INFINITY, f64::min),
    }
}

fn distance_to_segment_meters(point: Coord<f64>, a: Coord<f64>, b: Coord<f64>) -> f64 {
    let cos_lat = point.y.to_radians().cos();
    let (ax, ay) = ((a.x - point.x) * cos_lat, a.y - point.y);
    let (dx, dy) = ((b.x - a.x) * cos_lat, b.y - a.y);
    let length_sq = dx * dx + dy * dy;
    let t = if length_sq > 0.0 {
        (-(ax * dx + ay * dy) / length_sq).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let closest = Coord {
        x: a.x + t * (b.x - a.x),
        y: a.y + t * (b.y - a.y),
    };
    distance_meters(point, closest)
}

/// Planar area of a ring in square metres.
///
/// Vertices are projected onto a local equirectangular plane anchored at the
/// first vertex before the shoelace formula is applied. Rings with fewer than
/// three vertices yield `0.0`; callers substitute [`circle_area_square_meters`]
/// when a radius is known.
#[must_use]
pub fn polygon_area_square_meters(ring: &[Coord<f64>]) -> f64 {
    let Some(origin) = ring.first().copied() else {
        return 0.0;
    };
    if ring.len() < 3 {
        return 0.0;
    }

    let cos_lat = origin.y.to_radians().cos();
    let project = |c: &Coord<f64>| Coord {
        x: (c.x - origin.x).to_radians() * EARTH_RADIUS_METERS * cos_lat,
        y: (c.y - origin.y).to_radians() * EARTH_RADIUS_METERS,
    };

    let projected: Vec<Coord<f64>> = ring.iter().map(project).collect();
    let twice_area: f64 = projected
        .iter()
        .zip(projected.iter().cycle().skip(1))
        .map(|(p, q)| p.x * q.y - q.x * p.y)
        .sum();
    (twice_area / 2.0).abs()
}

/// Area of a circle with the given radius, in square metres.
#[must_use]
pub fn circle_area_square_meters(radius_meters: f64) -> f64 {
    std::f64::consts::PI * radius_meters * radius_meters
}

/// Even–odd ray-casting containment test.
///
/// The ring is treated as a list of `(lon, lat)` edges; whether the ring is
/// explicitly closed does not matter.
#[must_use]
pub fn point_in_polygon(point: Coord<f64>, ring: &[Coord<f64>]) -> bool {
    let Some(last) = ring.last().copied() else {
        return false;
    };
    let mut inside = false;
    let mut previous = last;
    for current in ring.iter().copied() {
        let crosses = (current.y > point.y) != (previous.y > point.y);
        if crosses {
            let x_at_y =
                (previous.x - current.x) * (point.y - current.y) / (previous.y - current.y)
                    + current.x;
            if point.x < x_at_y {
                inside = !inside;
            }
        }
        previous = current;
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    fn assert_close(actual: f64, expected: f64, tolerance: f64) {
        let delta = (actual - expected).abs();
        assert!(
            delta <= tolerance,
            "expected {expected}, got {actual} (|Δ| = {delta})"
        );
    }

    /// Roughly 1 km × 1 km square near the equator.
    #[fixture]
    fn square_ring() -> Vec<Coord<f64>> {
        let deg = 1_000.0 / (EARTH_RADIUS_METERS * std::f64::consts::PI / 180.0);
        vec![
            Coord { x: 0.0, y: 0.0 },
            Coord { x: deg, y: 0.0 },
            Coord { x: deg, y: deg },
            Coord { x: 0.0, y: deg },
            Coord { x: 0.0, y: 0.0 },
        ]
    }

    #[rstest]
    fn distance_to_self_is_zero() {
        let p = Coord { x: 13.4, y: 52.5 };
        assert_close(distance_meters(p, p), 0.0, 1e-9);
    }

    #[rstest]
    fn distance_is_symmetric() {
        let a = Coord { x: 13.4, y: 52.5 };
        let b = Coord { x: 2.35, y: 48.85 };
        assert_close(distance_meters(a, b), distance_meters(b, a), 1e-6);
        assert_close(distance_meters(a, b), 877_000.0, 5_000.0);
    }

    #[rstest]
    fn square_area_is_about_one_square_kilometre(square_ring: Vec<Coord<f64>>) {
        assert_close(polygon_area_square_meters(&square_ring), 1.0e6, 1.0e3);
    }

    #[rstest]
    fn area_ignores_winding_direction(square_ring: Vec<Coord<f64>>) {
        let reversed: Vec<_> = square_ring.iter().rev().copied().collect();
        assert_close(
            polygon_area_square_meters(&reversed),
            polygon_area_square_meters(&square_ring),
            1e-6,
        );
    }

    #[rstest]
    #[case::empty(vec![])]
    #[case::single(vec![Coord { x: 1.0, y: 1.0 }])]
    #[case::segment(vec![Coord { x: 1.0, y: 1.0 }, Coord { x: 2.0, y: 2.0 }])]
    fn degenerate_rings_have_zero_area(#[case] ring: Vec<Coord<f64>>) {
        assert_close(polygon_area_square_meters(&ring), 0.0, 0.0);
    }

    #[rstest]
    fn circle_area_matches_formula() {
        assert_close(circle_area_square_meters(1_000.0), 3_141_592.653_589_793, 1e-6);
    }

    #[rstest]
    fn polyline_length_sums_segments() {
        let points = [
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 0.0, y: 1.0 },
            Coord { x: 0.0, y: 2.0 },
        ];
        assert_close(
            polyline_length_meters(&points),
            2.0 * distance_meters(points[0], points[1]),
            1e-6,
        );
        assert_close(polyline_length_meters(&points[..1]), 0.0, 0.0);
    }

    #[rstest]
    fn polyline_distance_reaches_between_vertices() {
        let north = 10.0 / (EARTH_RADIUS_METERS * std::f64::consts::PI / 180.0);
        let line = [
            Coord { x: -0.01, y: north },
            Coord { x: 0.01, y: north },
        ];
        let origin = Coord { x: 0.0, y: 0.0 };
        assert_close(distance_to_polyline_meters(origin, &line), 10.0, 1e-3);
    }

    #[rstest]
    fn polyline_distance_clamps_to_segment_ends() {
        let line = [Coord { x: 0.0, y: 1.0 }, Coord { x: 0.0, y: 2.0 }];
        let origin = Coord { x: 0.0, y: 0.0 };
        assert_close(
            distance_to_polyline_meters(origin, &line),
            distance_meters(origin, Coord { x: 0.0, y: 1.0 }),
            1e-6,
        );
        assert_close(
            distance_to_polyline_meters(origin, &line[..1]),
            distance_meters(origin, Coord { x: 0.0, y: 1.0 }),
            1e-6,
        );
        assert!(distance_to_polyline_meters(origin, &[]).is_infinite());
    }

    #[rstest]
    #[case::centre(Coord { x: 0.004, y: 0.004 }, true)]
    #[case::outside_east(Coord { x: 0.02, y: 0.004 }, false)]
    #[case::outside_south(Coord { x: 0.004, y: -0.001 }, false)]
    fn point_in_polygon_uses_even_odd_rule(
        square_ring: Vec<Coord<f64>>,
        #[case] point: Coord<f64>,
        #[case] expected: bool,
    ) {
        assert_eq!(point_in_polygon(point, &square_ring), expected);
    }

    #[rstest]
    fn point_in_concave_polygon() {
        // U-shaped ring: the notch between the arms is outside.
        let ring = [
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 3.0, y: 0.0 },
            Coord { x: 3.0, y: 3.0 },
            Coord { x: 2.0, y: 3.0 },
            Coord { x: 2.0, y: 1.0 },
            Coord { x: 1.0, y: 1.0 },
            Coord { x: 1.0, y: 3.0 },
            Coord { x: 0.0, y: 3.0 },
        ];
        assert!(point_in_polygon(Coord { x: 0.5, y: 2.0 }, &ring));
        assert!(!point_in_polygon(Coord { x: 1.5, y: 2.0 }, &ring));
        assert!(!point_in_polygon(Coord { x: 0.5, y: 0.5 }, &[]));
    }
}
