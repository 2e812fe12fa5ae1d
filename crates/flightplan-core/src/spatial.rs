//! Spatial math: local projection, grid-frame rotation and polygon checks.

use crate::error::{FlightPlanError, Result};
use geo::{Area, Coord, LineString, Polygon};

pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Calculate distance between two points in meters using Haversine formula.
///
/// # Arguments
/// * `lat1`, `lon1` - First point coordinates in decimal degrees
/// * `lat2`, `lon2` - Second point coordinates in decimal degrees
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();
    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Meters per degree of latitude at a given latitude (WGS84 approximation).
pub fn meters_per_deg_lat(lat_deg: f64) -> f64 {
    let lat_rad = lat_deg.to_radians();
    111_132.954 - 559.822 * (2.0 * lat_rad).cos() + 1.175 * (4.0 * lat_rad).cos()
        - 0.0023 * (6.0 * lat_rad).cos()
}

/// Meters per degree of longitude at a given latitude (WGS84 approximation).
pub fn meters_per_deg_lon(lat_deg: f64) -> f64 {
    let lat_rad = lat_deg.to_radians();
    111_412.84 * lat_rad.cos() - 93.5 * (3.0 * lat_rad).cos() + 0.118 * (5.0 * lat_rad).cos()
}

/// Initial bearing from point 1 to point 2 in degrees, within (-180, 180].
/// 0 = north, 90 = east.
pub fn bearing_deg(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let delta_lambda = (lon2 - lon1).to_radians();

    let x = delta_lambda.sin() * phi2.cos();
    let y = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * delta_lambda.cos();

    normalize_heading(x.atan2(y).to_degrees())
}

/// Wrap a heading into (-180, 180].
pub fn normalize_heading(deg: f64) -> f64 {
    let wrapped = deg.rem_euclid(360.0);
    if wrapped > 180.0 {
        wrapped - 360.0
    } else {
        wrapped
    }
}

/// Equirectangular tangent-plane projection around a reference point.
///
/// Accurate to well under a metre across the few kilometres a survey AOI
/// spans, which is all the grid spacing math needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalProjection {
    pub origin_lon: f64,
    pub origin_lat: f64,
    meters_lon: f64,
    meters_lat: f64,
}

impl LocalProjection {
    pub fn new(origin_lon: f64, origin_lat: f64) -> Self {
        Self {
            origin_lon,
            origin_lat,
            meters_lon: meters_per_deg_lon(origin_lat).max(1e-9),
            meters_lat: meters_per_deg_lat(origin_lat).max(1e-9),
        }
    }

    /// Geographic (lon, lat) to planar metres (east, north).
    pub fn to_planar(&self, lon: f64, lat: f64) -> Coord<f64> {
        Coord {
            x: (lon - self.origin_lon) * self.meters_lon,
            y: (lat - self.origin_lat) * self.meters_lat,
        }
    }

    /// Planar metres back to geographic (lon, lat).
    pub fn to_geographic(&self, coord: Coord<f64>) -> (f64, f64) {
        (
            self.origin_lon + coord.x / self.meters_lon,
            self.origin_lat + coord.y / self.meters_lat,
        )
    }

    pub fn project_polygon(&self, polygon: &Polygon<f64>) -> Polygon<f64> {
        let project_ring = |ring: &LineString<f64>| -> LineString<f64> {
            ring.coords()
                .map(|c| self.to_planar(c.x, c.y))
                .collect::<Vec<_>>()
                .into()
        };
        Polygon::new(
            project_ring(polygon.exterior()),
            polygon.interiors().iter().map(project_ring).collect(),
        )
    }
}

/// Rotate `point` counter-clockwise by `angle_deg` about `center`.
pub fn rotate_about(point: Coord<f64>, center: Coord<f64>, angle_deg: f64) -> Coord<f64> {
    let (sin, cos) = angle_deg.to_radians().sin_cos();
    let dx = point.x - center.x;
    let dy = point.y - center.y;
    Coord {
        x: center.x + dx * cos - dy * sin,
        y: center.y + dx * sin + dy * cos,
    }
}

/// Inverse of [`rotate_about`].
pub fn unrotate_about(point: Coord<f64>, center: Coord<f64>, angle_deg: f64) -> Coord<f64> {
    rotate_about(point, center, -angle_deg)
}

pub fn rotate_polygon_about(polygon: &Polygon<f64>, center: Coord<f64>, angle_deg: f64) -> Polygon<f64> {
    let rotate_ring = |ring: &LineString<f64>| -> LineString<f64> {
        ring.coords()
            .map(|c| rotate_about(*c, center, angle_deg))
            .collect::<Vec<_>>()
            .into()
    };
    Polygon::new(
        rotate_ring(polygon.exterior()),
        polygon.interiors().iter().map(rotate_ring).collect(),
    )
}

pub(crate) fn segments_intersect_2d(
    a1: (f64, f64),
    a2: (f64, f64),
    b1: (f64, f64),
    b2: (f64, f64),
) -> bool {
    // Epsilon in projected metres; absorbs floating-point error from projection.
    const EPS_M: f64 = 1e-6;

    fn orient(p: (f64, f64), q: (f64, f64), r: (f64, f64)) -> f64 {
        (q.0 - p.0) * (r.1 - p.1) - (q.1 - p.1) * (r.0 - p.0)
    }

    fn within(a: f64, b: f64, value: f64) -> bool {
        let min = a.min(b) - EPS_M;
        let max = a.max(b) + EPS_M;
        value >= min && value <= max
    }

    fn on_segment(p: (f64, f64), q: (f64, f64), r: (f64, f64)) -> bool {
        within(p.0, q.0, r.0) && within(p.1, q.1, r.1)
    }

    let o1 = orient(a1, a2, b1);
    let o2 = orient(a1, a2, b2);
    let o3 = orient(b1, b2, a1);
    let o4 = orient(b1, b2, a2);

    if o1.abs() <= EPS_M && on_segment(a1, a2, b1) {
        return true;
    }
    if o2.abs() <= EPS_M && on_segment(a1, a2, b2) {
        return true;
    }
    if o3.abs() <= EPS_M && on_segment(b1, b2, a1) {
        return true;
    }
    if o4.abs() <= EPS_M && on_segment(b1, b2, a2) {
        return true;
    }

    let a_crosses = (o1 > EPS_M && o2 < -EPS_M) || (o1 < -EPS_M && o2 > EPS_M);
    let b_crosses = (o3 > EPS_M && o4 < -EPS_M) || (o3 < -EPS_M && o4 > EPS_M);
    a_crosses && b_crosses
}

/// Reject polygons the grid builder cannot work with.
///
/// `planar` must already be projected to metres so the area and
/// intersection tolerances are meaningful.
pub fn validate_polygon(planar: &Polygon<f64>, label: &str) -> Result<()> {
    let ring: Vec<Coord<f64>> = planar.exterior().coords().copied().collect();
    if ring.iter().any(|c| !c.x.is_finite() || !c.y.is_finite()) {
        return Err(FlightPlanError::invalid_geometry(format!(
            "{label} has non-finite coordinates"
        )));
    }
    // geo closes rings, so a triangle has four coordinates.
    let edges: Vec<(Coord<f64>, Coord<f64>)> = ring
        .windows(2)
        .map(|pair| (pair[0], pair[1]))
        .filter(|(a, b)| (a.x - b.x).abs() > 1e-9 || (a.y - b.y).abs() > 1e-9)
        .collect();
    if edges.len() < 3 {
        return Err(FlightPlanError::invalid_geometry(format!(
            "{label} needs at least 3 distinct vertices"
        )));
    }
    if planar.unsigned_area() <= 1e-6 {
        return Err(FlightPlanError::invalid_geometry(format!(
            "{label} has zero area"
        )));
    }

    let n = edges.len();
    for i in 0..n {
        for j in (i + 1)..n {
            // Adjacent edges share a vertex by construction.
            if j == i + 1 || (i == 0 && j == n - 1) {
                continue;
            }
            let (a1, a2) = edges[i];
            let (b1, b2) = edges[j];
            if segments_intersect_2d((a1.x, a1.y), (a2.x, a2.y), (b1.x, b1.y), (b2.x, b2.y)) {
                return Err(FlightPlanError::invalid_geometry(format!(
                    "{label} is self-intersecting (edges {i} and {j})"
                )));
            }
        }
    }
    Ok(())
}

/// X coordinates where the horizontal line `y` crosses the polygon edges,
/// sorted ascending. Uses the half-open rule so shared vertices count once.
pub fn horizontal_crossings(polygon: &Polygon<f64>, y: f64) -> Vec<f64> {
    let mut xs = Vec::new();
    let mut push_ring = |ring: &LineString<f64>| {
        for line in ring.lines() {
            let (p, q) = (line.start, line.end);
            if (p.y > y) != (q.y > y) {
                xs.push(p.x + (y - p.y) * (q.x - p.x) / (q.y - p.y));
            }
        }
    };
    push_ring(polygon.exterior());
    for interior in polygon.interiors() {
        push_ring(interior);
    }
    xs.sort_by(|a, b| a.total_cmp(b));
    xs
}

pub fn planar_distance(a: Coord<f64>, b: Coord<f64>) -> f64 {
    (a.x - b.x).hypot(a.y - b.y)
}
