//! Boustrophedon ordering of grid points.

use crate::models::GridPoint;
use crate::spatial::planar_distance;
use geo::Coord;
use std::collections::BTreeMap;

/// Unit vectors along and across the flight rows.
fn row_axes(rotation_angle: f64) -> (Coord<f64>, Coord<f64>) {
    let (sin, cos) = rotation_angle.to_radians().sin_cos();
    (Coord { x: cos, y: sin }, Coord { x: -sin, y: cos })
}

fn dot(a: Coord<f64>, b: Coord<f64>) -> f64 {
    a.x * b.x + a.y * b.y
}

/// Group points by row, sort rows across the flight direction and points
/// along it. Every returned row ascends along the row axis.
fn sorted_rows(points: Vec<GridPoint>, rotation_angle: f64) -> Vec<Vec<GridPoint>> {
    let (along, across) = row_axes(rotation_angle);

    let mut by_row: BTreeMap<usize, Vec<GridPoint>> = BTreeMap::new();
    for point in points {
        by_row.entry(point.row).or_default().push(point);
    }

    let mut rows: Vec<(f64, usize, Vec<GridPoint>)> = by_row
        .into_iter()
        .map(|(index, mut row)| {
            row.sort_by(|a, b| {
                dot(a.planar, along)
                    .total_cmp(&dot(b.planar, along))
                    .then(a.seq.cmp(&b.seq))
            });
            let centroid = row.iter().map(|p| dot(p.planar, across)).sum::<f64>() / row.len() as f64;
            (centroid, index, row)
        })
        .collect();
    rows.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
    rows.into_iter().map(|(_, _, row)| row).collect()
}

/// Serpentine path over the grid rows.
///
/// Rows are flown in order across the flight direction with alternating
/// direction. Without a take-off point the first row is flown ascending.
/// With one, the row nearest the take-off point (first or last) is oriented
/// so that the path touches it at the end closest to the take-off point.
pub fn boustrophedon(
    points: Vec<GridPoint>,
    rotation_angle: f64,
    take_off: Option<Coord<f64>>,
) -> Vec<GridPoint> {
    let rows = sorted_rows(points, rotation_angle);
    let Some((first_row, last_row)) = rows.first().zip(rows.last()) else {
        return Vec::new();
    };

    let first_ascending = match take_off {
        None => true,
        Some(origin) => {
            let ends = |row: &[GridPoint]| {
                let lo = planar_distance(origin, row[0].planar);
                let hi = planar_distance(origin, row[row.len() - 1].planar);
                (lo, hi)
            };
            let (first_lo, first_hi) = ends(first_row);
            let (last_lo, last_hi) = ends(last_row);
            if first_lo.min(first_hi) <= last_lo.min(last_hi) {
                // Start the first row at its end nearest the take-off point.
                first_lo <= first_hi
            } else {
                // Finish the last row nearest the take-off point; the whole
                // path is reversed afterwards.
                let last_ascending = last_hi <= last_lo;
                let last_is_odd = (rows.len() - 1) % 2 == 1;
                last_ascending != last_is_odd
            }
        }
    };

    rows.into_iter()
        .enumerate()
        .flat_map(|(index, mut row)| {
            let ascending = first_ascending == (index % 2 == 0);
            if !ascending {
                row.reverse();
            }
            row
        })
        .collect()
}

/// Reverse `path` when its first point is strictly farther from the take-off
/// point than its last. Equidistant paths keep their order.
pub fn apply_take_off_reversal(mut path: Vec<GridPoint>, take_off: Coord<f64>) -> Vec<GridPoint> {
    if let (Some(first), Some(last)) = (path.first(), path.last()) {
        let to_first = planar_distance(take_off, first.planar);
        let to_last = planar_distance(take_off, last.planar);
        if to_first > to_last {
            tracing::debug!(
                "reversing path: start {:.1} m, end {:.1} m from take-off",
                to_first,
                to_last
            );
            path.reverse();
        }
    }
    path
}

/// Full ordering: serpentine rows, then take-off reversal. The position of a
/// point in the returned vector is its flight sequence index.
pub fn order_path(
    points: Vec<GridPoint>,
    rotation_angle: f64,
    take_off: Option<Coord<f64>>,
) -> Vec<GridPoint> {
    let path = boustrophedon(points, rotation_angle, take_off);
    match take_off {
        Some(origin) => apply_take_off_reversal(path, origin),
        None => path,
    }
}
