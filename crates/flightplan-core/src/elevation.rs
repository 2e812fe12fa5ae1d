//! Terrain sampling and altitude assignment.

use crate::error::{FlightPlanError, Result};
use crate::models::{HeightMode, TerrainStatus, Waypath, Waypoint, Wayline};
use crate::spatial::haversine_distance;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;

/// Elevation read for one position. `elevation` is `None` only for
/// [`TerrainStatus::Flat`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerrainSample {
    pub elevation: Option<f64>,
    pub status: TerrainStatus,
}

impl TerrainSample {
    pub fn flat() -> Self {
        Self {
            elevation: None,
            status: TerrainStatus::Flat,
        }
    }
}

/// Default limit of the no-data search, in pixels from the sampled one.
pub const NEAREST_VALID_RADIUS_PX: usize = 256;

/// `GTModelTypeGeoKey` in the GeoTIFF key directory.
const GT_MODEL_TYPE_KEY: u32 = 1024;
const MODEL_TYPE_GEOGRAPHIC: u32 = 2;

/// Model type declared by a GeoTIFF key directory: a 4-value header
/// followed by (key, location, count, value) entries.
fn model_type(keys: &[u32]) -> Option<u32> {
    keys.get(4..)?
        .chunks_exact(4)
        .find(|entry| entry[0] == GT_MODEL_TYPE_KEY && entry[1] == 0)
        .map(|entry| entry[3])
}

/// Anything that can report ground elevation at a geographic position.
pub trait TerrainSource {
    fn sample(&self, lon: f64, lat: f64) -> TerrainSample;
}

/// Placement of a north-up raster in geographic coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    /// Longitude of the west edge of column 0
    pub origin_lon: f64,
    /// Latitude of the north edge of row 0
    pub origin_lat: f64,
    /// Degrees per column
    pub pixel_width: f64,
    /// Degrees per row, positive going south
    pub pixel_height: f64,
}

/// Single-band elevation raster held in memory.
#[derive(Debug, Clone)]
pub struct ElevationRaster {
    transform: GeoTransform,
    rows: usize,
    cols: usize,
    elevations_m: Vec<f64>,
    nodata: Option<f64>,
    has_valid: bool,
    search_radius: usize,
}

impl ElevationRaster {
    pub fn new(
        transform: GeoTransform,
        cols: usize,
        rows: usize,
        elevations_m: Vec<f64>,
        nodata: Option<f64>,
    ) -> Result<Self> {
        if rows == 0 || cols == 0 || elevations_m.len() != rows * cols {
            return Err(FlightPlanError::Terrain(format!(
                "raster of {cols}x{rows} pixels has {} values",
                elevations_m.len()
            )));
        }
        if !(transform.pixel_width > 0.0) || !(transform.pixel_height > 0.0) {
            return Err(FlightPlanError::Terrain(
                "raster pixel size must be positive".into(),
            ));
        }
        let mut raster = Self {
            transform,
            rows,
            cols,
            elevations_m,
            nodata,
            has_valid: false,
            search_radius: NEAREST_VALID_RADIUS_PX,
        };
        raster.has_valid = (0..rows * cols).any(|idx| raster.is_valid(raster.elevations_m[idx]));
        if !raster.has_valid {
            tracing::warn!("DEM contains no valid elevation; terrain will be treated as flat");
        }
        Ok(raster)
    }

    /// Load a GeoTIFF in a geographic (lon/lat) CRS using its pixel scale
    /// and tie point tags.
    pub fn from_geotiff(path: &Path) -> Result<Self> {
        let terrain_err = |err: tiff::TiffError| {
            FlightPlanError::Terrain(format!("cannot read DEM {}: {err}", path.display()))
        };
        let file = File::open(path).map_err(|err| {
            FlightPlanError::Terrain(format!("cannot open DEM {}: {err}", path.display()))
        })?;
        let mut decoder = Decoder::new(BufReader::new(file)).map_err(terrain_err)?;

        let (cols, rows) = decoder.dimensions().map_err(terrain_err)?;
        let scale = decoder
            .get_tag_f64_vec(Tag::ModelPixelScaleTag)
            .map_err(terrain_err)?;
        let tie = decoder
            .get_tag_f64_vec(Tag::ModelTiepointTag)
            .map_err(terrain_err)?;
        if scale.len() < 2 || tie.len() < 6 {
            return Err(FlightPlanError::Terrain(format!(
                "DEM {} lacks a usable georeference",
                path.display()
            )));
        }
        if let Some(keys) = decoder.find_tag(Tag::GeoKeyDirectoryTag).map_err(terrain_err)? {
            let keys = keys.into_u32_vec().map_err(terrain_err)?;
            match model_type(&keys) {
                Some(MODEL_TYPE_GEOGRAPHIC) | None => {}
                Some(other) => {
                    return Err(FlightPlanError::Terrain(format!(
                        "DEM {} uses model type {other}; only geographic (lon/lat) rasters are supported",
                        path.display()
                    )))
                }
            }
        }
        let nodata = match decoder.find_tag(Tag::GdalNodata).map_err(terrain_err)? {
            Some(value) => {
                let text = value.into_string().map_err(terrain_err)?;
                text.trim_matches(char::from(0)).trim().parse::<f64>().ok()
            }
            None => None,
        };

        // Tie point (i, j) in raster space maps to (x, y) in model space.
        let transform = GeoTransform {
            origin_lon: tie[3] - tie[0] * scale[0],
            origin_lat: tie[4] + tie[1] * scale[1],
            pixel_width: scale[0],
            pixel_height: scale[1],
        };

        // Projected rasters without a key directory still give themselves
        // away through model coordinates far outside lon/lat range.
        let (east, south) = (
            transform.origin_lon + cols as f64 * transform.pixel_width,
            transform.origin_lat - rows as f64 * transform.pixel_height,
        );
        if transform.origin_lon < -180.0 || east > 360.0 || south < -90.0 || transform.origin_lat > 90.0 {
            return Err(FlightPlanError::Terrain(format!(
                "DEM {} extent is not in degrees; reproject it to lon/lat",
                path.display()
            )));
        }

        let elevations_m = decoded_to_f64(decoder.read_image().map_err(terrain_err)?);
        tracing::info!(
            "loaded DEM {} ({}x{} px, nodata {:?})",
            path.display(),
            cols,
            rows,
            nodata
        );
        Self::new(transform, cols as usize, rows as usize, elevations_m, nodata)
    }

    /// Limit how far (in pixels) a no-data sample looks for a valid
    /// neighbour before the position is treated as flat.
    pub fn with_search_radius(mut self, radius_px: usize) -> Self {
        self.search_radius = radius_px;
        self
    }

    pub fn transform(&self) -> GeoTransform {
        self.transform
    }

    fn is_valid(&self, value: f64) -> bool {
        value.is_finite() && self.nodata.map_or(true, |nd| value != nd)
    }

    fn value_at(&self, row: usize, col: usize) -> Option<f64> {
        let value = *self.elevations_m.get(row * self.cols + col)?;
        self.is_valid(value).then_some(value)
    }

    /// Closest valid pixel by expanding square rings around (row, col), up to
    /// the search radius.
    fn nearest_valid(&self, row: usize, col: usize) -> Option<f64> {
        if !self.has_valid {
            return None;
        }
        let max_radius = self.rows.max(self.cols).min(self.search_radius);
        for radius in 1..=max_radius {
            let r = radius as i64;
            let mut best: Option<(i64, f64)> = None;
            for dr in -r..=r {
                for dc in -r..=r {
                    if dr.abs() != r && dc.abs() != r {
                        continue;
                    }
                    let (rr, cc) = (row as i64 + dr, col as i64 + dc);
                    if rr < 0 || cc < 0 || rr >= self.rows as i64 || cc >= self.cols as i64 {
                        continue;
                    }
                    if let Some(value) = self.value_at(rr as usize, cc as usize) {
                        let dist2 = dr * dr + dc * dc;
                        if best.map_or(true, |(d, _)| dist2 < d) {
                            best = Some((dist2, value));
                        }
                    }
                }
            }
            if let Some((_, value)) = best {
                return Some(value);
            }
        }
        None
    }
}

impl TerrainSource for ElevationRaster {
    fn sample(&self, lon: f64, lat: f64) -> TerrainSample {
        if !lon.is_finite() || !lat.is_finite() {
            return TerrainSample::flat();
        }
        let t = &self.transform;
        let x = ((lon - t.origin_lon) / t.pixel_width).floor();
        let y = ((t.origin_lat - lat) / t.pixel_height).floor();

        let outside = x < 0.0 || y < 0.0 || x >= self.cols as f64 || y >= self.rows as f64;
        let col = x.clamp(0.0, (self.cols - 1) as f64) as usize;
        let row = y.clamp(0.0, (self.rows - 1) as f64) as usize;

        if let Some(elevation) = self.value_at(row, col) {
            let status = if outside {
                TerrainStatus::Clamped
            } else {
                TerrainStatus::Sampled
            };
            return TerrainSample {
                elevation: Some(elevation),
                status,
            };
        }
        match self.nearest_valid(row, col) {
            Some(elevation) => TerrainSample {
                elevation: Some(elevation),
                status: TerrainStatus::NearestValid,
            },
            None => TerrainSample::flat(),
        }
    }
}

#[allow(unreachable_patterns)]
fn decoded_to_f64(result: DecodingResult) -> Vec<f64> {
    match result {
        DecodingResult::U8(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U16(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U64(v) => v.into_iter().map(|x| x as f64).collect(),
        DecodingResult::I8(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I16(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I64(v) => v.into_iter().map(|x| x as f64).collect(),
        DecodingResult::F32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::F64(v) => v,
        _ => Vec::new(),
    }
}

// ========== ALTITUDE ASSIGNMENT ==========

/// Converts a terrain sample and an AGL request into a mission altitude.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AltitudeModel {
    pub mode: HeightMode,
    /// Ground elevation at the first waypoint, for relative heights
    pub base_elevation: Option<f64>,
}

impl AltitudeModel {
    pub fn altitude(&self, altitude_agl: f64, sample: &TerrainSample) -> f64 {
        match (sample.elevation, self.mode) {
            (None, _) => altitude_agl,
            (Some(elevation), HeightMode::Absolute) => elevation + altitude_agl,
            (Some(elevation), HeightMode::RelativeToTakeoff) => {
                altitude_agl + (elevation - self.base_elevation.unwrap_or(elevation))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ElevationReport {
    pub sampled: usize,
    pub clamped: usize,
    pub nearest_valid: usize,
    pub flat: usize,
    pub base_elevation: Option<f64>,
}

impl ElevationReport {
    pub fn degraded(&self) -> usize {
        self.clamped + self.nearest_valid + self.flat
    }

    fn record(&mut self, status: TerrainStatus) {
        match status {
            TerrainStatus::Sampled => self.sampled += 1,
            TerrainStatus::Clamped => self.clamped += 1,
            TerrainStatus::NearestValid => self.nearest_valid += 1,
            TerrainStatus::Flat => self.flat += 1,
        }
    }
}

/// Set every waypoint's altitude from `terrain`. Altitudes are always derived
/// from `altitude_agl`, so running this twice gives the same result.
pub fn integrate_elevation(
    path: &mut Waypath,
    terrain: &dyn TerrainSource,
    mode: HeightMode,
) -> ElevationReport {
    let mut waypoints = path.waypoints_mut();
    let samples: Vec<TerrainSample> = waypoints
        .iter()
        .map(|wp| terrain.sample(wp.lon, wp.lat))
        .collect();

    let mut report = ElevationReport {
        base_elevation: samples.iter().find_map(|s| s.elevation),
        ..ElevationReport::default()
    };
    let model = AltitudeModel {
        mode,
        base_elevation: report.base_elevation,
    };

    for (waypoint, sample) in waypoints.iter_mut().zip(&samples) {
        if sample.status.is_degraded() {
            tracing::warn!(
                "waypoint {} at ({:.6}, {:.6}): terrain {:?}",
                waypoint.sequence_index,
                waypoint.lon,
                waypoint.lat,
                sample.status
            );
        }
        waypoint.altitude = Some(model.altitude(waypoint.altitude_agl, sample));
        waypoint.terrain = Some(sample.status);
        report.record(sample.status);
    }

    tracing::info!(
        "terrain integrated: {} sampled, {} clamped, {} nearest-valid, {} flat",
        report.sampled,
        report.clamped,
        report.nearest_valid,
        report.flat
    );
    report
}

/// Without terrain every altitude is the requested AGL.
pub fn assign_flat_altitude(path: &mut Waypath) {
    for waypoint in path.waypoints_mut() {
        waypoint.altitude = Some(waypoint.altitude_agl);
        waypoint.terrain = None;
    }
}

// ========== TERRAIN FOLLOWING ==========

/// Indices of the profile points to keep so that linear interpolation between
/// them stays within `threshold` metres of every dropped point's altitude.
/// `profile` is (distance along, altitude).
pub fn simplify_profile(profile: &[(f64, f64)], threshold: f64) -> Vec<usize> {
    if profile.len() <= 2 {
        return (0..profile.len()).collect();
    }
    let mut keep = vec![false; profile.len()];
    keep[0] = true;
    keep[profile.len() - 1] = true;

    let mut stack = vec![(0usize, profile.len() - 1)];
    while let Some((first, last)) = stack.pop() {
        let (d0, a0) = profile[first];
        let (d1, a1) = profile[last];
        let mut worst: Option<(usize, f64)> = None;
        for (i, &(d, a)) in profile.iter().enumerate().take(last).skip(first + 1) {
            let t = if d1 > d0 { (d - d0) / (d1 - d0) } else { 0.0 };
            let deviation = (a - (a0 + t * (a1 - a0))).abs();
            if worst.map_or(true, |(_, w)| deviation > w) {
                worst = Some((i, deviation));
            }
        }
        if let Some((i, deviation)) = worst {
            if deviation > threshold {
                keep[i] = true;
                stack.push((first, i));
                stack.push((i, last));
            }
        }
    }
    keep.iter()
        .enumerate()
        .filter_map(|(i, &k)| k.then_some(i))
        .collect()
}

/// Split waylines wherever the terrain under them departs from a straight
/// climb by more than `threshold` metres. Split points are flown through.
/// Point-mode paths are returned unchanged.
pub fn follow_terrain(
    path: Waypath,
    terrain: &dyn TerrainSource,
    model: AltitudeModel,
    sample_spacing_m: f64,
    threshold: f64,
) -> Waypath {
    let lines = match path {
        Waypath::Lines(lines) => lines,
        points => return points,
    };
    let spacing = sample_spacing_m.max(1.0);
    let before = lines.len();

    let mut out = Vec::with_capacity(lines.len());
    for line in lines {
        split_wayline(line, terrain, model, spacing, threshold, &mut out);
    }
    if out.len() != before {
        tracing::info!("terrain following split {} waylines into {}", before, out.len());
    }
    Waypath::Lines(out)
}

fn split_wayline(
    line: Wayline,
    terrain: &dyn TerrainSource,
    model: AltitudeModel,
    spacing: f64,
    threshold: f64,
    out: &mut Vec<Wayline>,
) {
    let (start, end) = (&line.start, &line.end);
    let length = haversine_distance(start.lat, start.lon, end.lat, end.lon);
    let steps = (length / spacing).ceil() as usize;
    if steps < 2 || start.altitude.is_none() || end.altitude.is_none() {
        out.push(line);
        return;
    }

    let mut positions = Vec::with_capacity(steps + 1);
    let mut profile = Vec::with_capacity(steps + 1);
    for k in 0..=steps {
        let t = k as f64 / steps as f64;
        let lon = start.lon + t * (end.lon - start.lon);
        let lat = start.lat + t * (end.lat - start.lat);
        let sample = terrain.sample(lon, lat);
        let altitude = match k {
            0 => start.altitude.unwrap_or(start.altitude_agl),
            k if k == steps => end.altitude.unwrap_or(end.altitude_agl),
            _ => model.altitude(start.altitude_agl, &sample),
        };
        positions.push((lon, lat, sample.status));
        profile.push((t * length, altitude));
    }

    let keep = simplify_profile(&profile, threshold);
    if keep.len() <= 2 {
        out.push(line);
        return;
    }

    let split_point = |idx: usize| -> Waypoint {
        let (lon, lat, status) = positions[idx];
        let mut waypoint = line.start.clone();
        waypoint.lon = lon;
        waypoint.lat = lat;
        waypoint.altitude = Some(profile[idx].1);
        waypoint.terrain = Some(status);
        waypoint.speed = line.speed;
        waypoint.actions.clear();
        waypoint
    };

    let last = keep.len() - 1;
    for (n, pair) in keep.windows(2).enumerate() {
        let segment_start = if n == 0 { line.start.clone() } else { split_point(pair[0]) };
        let segment_end = if n + 1 == last { line.end.clone() } else { split_point(pair[1]) };
        out.push(Wayline {
            row: line.row,
            start: segment_start,
            end: segment_end,
            speed: line.speed,
            actions: line.actions.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Action;

    /// 4x3 raster, 0.001 degree pixels, north-west corner at (10, 50).
    fn raster(values: Vec<f64>) -> ElevationRaster {
        let transform = GeoTransform {
            origin_lon: 10.0,
            origin_lat: 50.0,
            pixel_width: 0.001,
            pixel_height: 0.001,
        };
        ElevationRaster::new(transform, 4, 3, values, Some(-9999.0)).unwrap()
    }

    fn waypoint(lon: f64, lat: f64) -> Waypoint {
        Waypoint {
            lon,
            lat,
            altitude_agl: 100.0,
            altitude: None,
            heading: 0.0,
            gimbal_angle: -90.0,
            speed: 5.0,
            actions: vec![Action::TakePhoto],
            sequence_index: 0,
            row: 0,
            terrain: None,
        }
    }

    #[test]
    fn samples_pixel_containing_position() {
        let dem = raster((0..12).map(f64::from).collect());
        // Row 1, column 2.
        let sample = dem.sample(10.0025, 49.9985);
        assert_eq!(sample.elevation, Some(6.0));
        assert_eq!(sample.status, TerrainStatus::Sampled);
    }

    #[test]
    fn outside_positions_clamp_to_edge() {
        let dem = raster((0..12).map(f64::from).collect());
        let sample = dem.sample(9.5, 51.0);
        assert_eq!(sample.elevation, Some(0.0));
        assert_eq!(sample.status, TerrainStatus::Clamped);
        let sample = dem.sample(11.0, 49.0);
        assert_eq!(sample.elevation, Some(11.0));
    }

    #[test]
    fn nodata_falls_back_to_nearest_valid() {
        let mut values = vec![-9999.0; 12];
        values[11] = 42.0;
        let dem = raster(values);
        let sample = dem.sample(10.0005, 49.9995);
        assert_eq!(sample.elevation, Some(42.0));
        assert_eq!(sample.status, TerrainStatus::NearestValid);
    }

    #[test]
    fn nearest_valid_search_stops_at_radius() {
        let mut values = vec![-9999.0; 12];
        values[11] = 42.0;
        let dem = raster(values).with_search_radius(2);
        assert_eq!(dem.sample(10.0005, 49.9995), TerrainSample::flat());
        // Within reach of the valid corner pixel.
        let near = dem.sample(10.0015, 49.9985);
        assert_eq!(near.elevation, Some(42.0));
        assert_eq!(near.status, TerrainStatus::NearestValid);
    }

    #[test]
    fn key_directory_model_type() {
        assert_eq!(model_type(&[1, 1, 0, 2, 1024, 0, 1, 2, 1025, 0, 1, 1]), Some(2));
        assert_eq!(model_type(&[1, 1, 0, 1, 1024, 0, 1, 1]), Some(1));
        assert_eq!(model_type(&[1, 1, 0, 1, 3072, 0, 1, 32645]), None);
        assert_eq!(model_type(&[1, 1]), None);
    }

    #[test]
    fn all_nodata_is_flat() {
        let dem = raster(vec![-9999.0; 12]);
        let mut path = Waypath::Points(vec![waypoint(10.001, 49.999)]);
        let report = integrate_elevation(&mut path, &dem, HeightMode::Absolute);
        assert_eq!(report.flat, 1);
        assert_eq!(path.waypoints()[0].altitude, Some(100.0));
        assert_eq!(path.waypoints()[0].terrain, Some(TerrainStatus::Flat));
    }

    #[test]
    fn rejects_mismatched_raster() {
        let transform = GeoTransform {
            origin_lon: 0.0,
            origin_lat: 0.0,
            pixel_width: 1.0,
            pixel_height: 1.0,
        };
        assert!(ElevationRaster::new(transform, 2, 2, vec![1.0; 3], None).is_err());
    }

    #[test]
    fn height_modes() {
        let dem = raster((0..12).map(|v| f64::from(v) * 10.0).collect());
        let points = vec![waypoint(10.0005, 49.9995), waypoint(10.0035, 49.9975)];

        let mut absolute = Waypath::Points(points.clone());
        integrate_elevation(&mut absolute, &dem, HeightMode::Absolute);
        let alts: Vec<Option<f64>> = absolute.waypoints().iter().map(|w| w.altitude).collect();
        assert_eq!(alts, vec![Some(100.0), Some(210.0)]);

        let mut relative = Waypath::Points(points);
        let report = integrate_elevation(&mut relative, &dem, HeightMode::RelativeToTakeoff);
        assert_eq!(report.base_elevation, Some(0.0));
        let alts: Vec<Option<f64>> = relative.waypoints().iter().map(|w| w.altitude).collect();
        assert_eq!(alts, vec![Some(100.0), Some(210.0)]);
    }

    #[test]
    fn integration_is_idempotent() {
        let dem = raster((0..12).map(f64::from).collect());
        let mut path = Waypath::Points(vec![waypoint(10.0015, 49.9985), waypoint(10.0025, 49.9995)]);
        integrate_elevation(&mut path, &dem, HeightMode::Absolute);
        let first: Vec<Option<f64>> = path.waypoints().iter().map(|w| w.altitude).collect();
        integrate_elevation(&mut path, &dem, HeightMode::Absolute);
        let second: Vec<Option<f64>> = path.waypoints().iter().map(|w| w.altitude).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn simplify_keeps_peaks() {
        let profile = vec![(0.0, 0.0), (1.0, 9.0), (2.0, 20.0), (3.0, 9.5), (4.0, 0.0)];
        assert_eq!(simplify_profile(&profile, 5.0), vec![0, 2, 4]);
        assert_eq!(simplify_profile(&profile, 50.0), vec![0, 4]);
    }

    #[test]
    fn follow_terrain_splits_over_ridge() {
        // A ridge in column 2 only.
        let mut values = vec![0.0; 12];
        for row in 0..3 {
            values[row * 4 + 2] = 50.0;
        }
        let dem = raster(values);
        let mut start = waypoint(10.0002, 49.9985);
        let mut end = waypoint(10.0038, 49.9985);
        start.actions = vec![Action::StartTimedPhoto { interval_s: 2.0 }];
        end.actions = vec![Action::StopTimedPhoto];
        let mut path = Waypath::Lines(vec![Wayline {
            row: 0,
            start,
            end,
            speed: 5.0,
            actions: vec![Action::StartTimedPhoto { interval_s: 2.0 }],
        }]);
        let report = integrate_elevation(&mut path, &dem, HeightMode::Absolute);
        let model = AltitudeModel {
            mode: HeightMode::Absolute,
            base_elevation: report.base_elevation,
        };
        let Waypath::Lines(lines) = follow_terrain(path, &dem, model, 10.0, 5.0) else {
            panic!("expected line mode");
        };
        assert!(lines.len() > 1);
        assert!(lines.iter().any(|l| l.end.altitude == Some(150.0)));
        assert_eq!(lines[0].start.actions, vec![Action::StartTimedPhoto { interval_s: 2.0 }]);
        assert_eq!(lines.last().unwrap().end.actions, vec![Action::StopTimedPhoto]);
        for pair in lines.windows(2) {
            assert_eq!(pair[0].end.lon, pair[1].start.lon);
            assert!(pair[0].end.actions.is_empty());
            assert_eq!(pair[0].end.speed, 5.0);
        }
    }
}
