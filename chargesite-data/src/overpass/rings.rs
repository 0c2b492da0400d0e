//! Multipolygon ring assembly from relation member fragments.

use geo::Coord;

/// Join way fragments sharing end points into rings.
///
/// Fragments may be stored in either direction. A chain that cannot be closed
/// is kept as it stands, since the area routine closes rings implicitly.
/// Chains with fewer than three vertices are dropped.
pub(crate) fn join_rings(mut fragments: Vec<Vec<Coord<f64>>>) -> Vec<Vec<Coord<f64>>> {
    fragments.reverse();
    let mut rings = Vec::new();
    while let Some(mut ring) = fragments.pop() {
        while !is_closed(&ring) {
            let Some(end) = ring.last().copied() else {
                break;
            };
            let Some(index) = fragments
                .iter()
                .position(|f| f.first() == Some(&end) || f.last() == Some(&end))
            else {
                break;
            };
            let mut next = fragments.swap_remove(index);
            if next.first() != Some(&end) {
                next.reverse();
            }
            ring.extend(next.into_iter().skip(1));
        }
        if ring.len() >= 3 {
            rings.push(ring);
        }
    }
    rings
}

fn is_closed(ring: &[Coord<f64>]) -> bool {
    ring.len() >= 2 && ring.first() == ring.last()
}
