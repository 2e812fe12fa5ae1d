//! Survey grid construction.
//!
//! The lattice is laid out axis-aligned in a rotated "grid frame" and then
//! transformed back, so spacing never has to be re-derived per angle.

use crate::error::{FlightPlanError, Result};
use crate::models::{GridPoint, GridPointKind};
use crate::spatial::{
    horizontal_crossings, rotate_about, rotate_polygon_about, unrotate_about, validate_polygon,
    LocalProjection,
};
use geo::{BoundingRect, Centroid, Contains, Coord, Polygon};

/// Lattice points closer than this fraction of the in-row spacing to a
/// boundary crossing are replaced by the crossing.
const BOUNDARY_MERGE_RATIO: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSpacing {
    /// Distance between consecutive points along a row (m)
    pub point_spacing: f64,
    /// Distance between rows (m)
    pub row_spacing: f64,
    /// Row direction, degrees counter-clockwise from east
    pub rotation_angle: f64,
}

/// Clipped survey grid. Rows are indexed consecutively in the order they were
/// laid out; points within a row ascend along the row axis.
#[derive(Debug, Clone)]
pub struct SurveyGrid {
    pub projection: LocalProjection,
    /// AOI centroid in planar metres; rotation pivot
    pub center: Coord<f64>,
    /// Normalised to [0, 360)
    pub rotation_angle: f64,
    pub spacing: GridSpacing,
    pub rows: Vec<Vec<GridPoint>>,
    /// Points removed because they fell inside a no-fly zone
    pub excluded_by_no_fly: usize,
}

impl SurveyGrid {
    pub fn to_grid_frame(&self, planar: Coord<f64>) -> Coord<f64> {
        unrotate_about(planar, self.center, self.rotation_angle)
    }

    pub fn from_grid_frame(&self, grid: Coord<f64>) -> Coord<f64> {
        rotate_about(grid, self.center, self.rotation_angle)
    }

    pub fn points(&self) -> Vec<GridPoint> {
        self.rows.iter().flatten().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.rows.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Build the clipped grid for `aoi` (geographic lon/lat) minus `no_fly_zones`.
pub fn build_grid(
    aoi: &Polygon<f64>,
    no_fly_zones: &[Polygon<f64>],
    spacing: GridSpacing,
) -> Result<SurveyGrid> {
    if !(spacing.point_spacing > 0.0) || !(spacing.row_spacing > 0.0) {
        return Err(FlightPlanError::invalid_parameter(
            "grid spacing must be positive",
        ));
    }
    let rotation_angle = if spacing.rotation_angle.is_finite() {
        spacing.rotation_angle.rem_euclid(360.0)
    } else {
        return Err(FlightPlanError::invalid_parameter(
            "rotation_angle must be finite",
        ));
    };

    let geo_centroid = aoi
        .centroid()
        .ok_or_else(|| FlightPlanError::invalid_geometry("project area is empty"))?;
    let projection = LocalProjection::new(geo_centroid.x(), geo_centroid.y());
    let planar = projection.project_polygon(aoi);
    validate_polygon(&planar, "project area")?;

    let center = planar
        .centroid()
        .map(|p| p.0)
        .ok_or_else(|| FlightPlanError::invalid_geometry("project area has no centroid"))?;

    let mut grid = SurveyGrid {
        projection,
        center,
        rotation_angle,
        spacing,
        rows: Vec::new(),
        excluded_by_no_fly: 0,
    };

    let rotated = rotate_polygon_about(&planar, center, -rotation_angle);
    let bounds = rotated
        .bounding_rect()
        .ok_or_else(|| FlightPlanError::invalid_geometry("project area has no extent"))?;
    let width = bounds.width();
    let height = bounds.height();

    if width < spacing.point_spacing && height < spacing.row_spacing {
        tracing::debug!(
            "project area ({:.1} x {:.1} m) smaller than one spacing unit; using its centre",
            width,
            height
        );
        grid.rows.push(vec![grid_point(&grid, center, 0, 0, GridPointKind::Lattice)]);
    } else {
        grid.rows = lay_out_rows(&grid, &rotated, bounds.min(), width, height);
    }

    let zones = project_no_fly_zones(&projection, no_fly_zones)?;
    if !zones.is_empty() {
        let before = grid.len();
        for row in &mut grid.rows {
            row.retain(|point| !zones.iter().any(|zone| zone.contains(&point.planar)));
        }
        grid.rows.retain(|row| !row.is_empty());
        grid.excluded_by_no_fly = before - grid.len();
    }

    tracing::debug!(
        "grid built: {} rows, {} points, {} excluded by no-fly zones",
        grid.rows.len(),
        grid.len(),
        grid.excluded_by_no_fly
    );
    Ok(grid)
}

/// Lay the lattice over the rotated bounding box and clip it row by row.
fn lay_out_rows(
    grid: &SurveyGrid,
    rotated: &Polygon<f64>,
    min: Coord<f64>,
    width: f64,
    height: f64,
) -> Vec<Vec<GridPoint>> {
    let GridSpacing {
        point_spacing,
        row_spacing,
        ..
    } = grid.spacing;

    // Centre the lattice inside the box so coverage is symmetric.
    let row_count = (height / row_spacing).floor() as i64;
    let row_offset = (height - row_count as f64 * row_spacing) / 2.0;
    let col_count = (width / point_spacing).floor() as i64;
    let col_offset = (width - col_count as f64 * point_spacing) / 2.0;
    let merge_distance = point_spacing * BOUNDARY_MERGE_RATIO;

    let mut rows = Vec::new();
    for k in 0..=row_count {
        let y = min.y + row_offset + k as f64 * row_spacing;
        let crossings = horizontal_crossings(rotated, y);
        if crossings.len() < 2 {
            continue;
        }

        // Crossings pair up into the parts of the row inside the area. A
        // concave area yields several parts; `seq` skips a value between
        // them so the gap is never flown as one line.
        let row_index = rows.len();
        let mut row: Vec<GridPoint> = Vec::new();
        let mut seq = 0;
        for part in crossings.chunks_exact(2) {
            let (enter, exit) = (part[0], part[1]);
            let mut xs: Vec<(f64, GridPointKind)> = vec![(enter, GridPointKind::Boundary)];
            // One spacing of margin either side of the box.
            for j in -1..=col_count + 1 {
                let x = min.x + col_offset + j as f64 * point_spacing;
                if x - enter > merge_distance && exit - x > merge_distance {
                    xs.push((x, GridPointKind::Lattice));
                }
            }
            if exit - enter > merge_distance {
                xs.push((exit, GridPointKind::Boundary));
            }

            for (x, kind) in xs {
                let planar = grid.from_grid_frame(Coord { x, y });
                row.push(grid_point(grid, planar, row_index, seq, kind));
                seq += 1;
            }
            seq += 1;
        }
        rows.push(row);
    }
    rows
}

fn grid_point(
    grid: &SurveyGrid,
    planar: Coord<f64>,
    row: usize,
    seq: usize,
    kind: GridPointKind,
) -> GridPoint {
    let (lon, lat) = grid.projection.to_geographic(planar);
    GridPoint {
        planar,
        lon,
        lat,
        row,
        seq,
        kind,
    }
}

fn project_no_fly_zones(
    projection: &LocalProjection,
    zones: &[Polygon<f64>],
) -> Result<Vec<Polygon<f64>>> {
    zones
        .iter()
        .enumerate()
        .map(|(idx, zone)| {
            let planar = projection.project_polygon(zone);
            validate_polygon(&planar, &format!("no-fly zone {idx}"))?;
            Ok(planar)
        })
        .collect()
}
