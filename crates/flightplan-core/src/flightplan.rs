//! End-to-end flight plan generation.

use crate::elevation::{
    assign_flat_altitude, follow_terrain, integrate_elevation, AltitudeModel, ElevationRaster,
    ElevationReport, TerrainSource,
};
use crate::error::{FlightPlanError, Result};
use crate::geojson::{parse_area_of_interest, parse_polygons, waypath_to_feature_collection};
use crate::grid::{build_grid, GridSpacing};
use crate::models::{FlightPlanOptions, HeightMode, Waypath};
use crate::ordering::order_path;
use crate::parameters::{calculate_parameters, DerivedSpacing};
use crate::profile::DroneProfile;
use crate::waypoints::{assemble_waypath, renumber, AssemblySettings};
use crate::wpml::{build_placemarks, write_atomically, write_mission, MissionSettings, Placemark};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// DJI WPML mission archive
    Kmz,
    /// Waypoint FeatureCollection
    GeoJson,
}

impl OutputFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("kmz") => Ok(OutputFormat::Kmz),
            Some("geojson") | Some("json") => Ok(OutputFormat::GeoJson),
            _ => Err(FlightPlanError::invalid_parameter(format!(
                "outfile {} must end in .kmz, .geojson or .json",
                path.display()
            ))),
        }
    }
}

/// Everything a planning run produced.
#[derive(Debug, Clone)]
pub struct FlightPlan {
    pub spacing: DerivedSpacing,
    pub waypath: Waypath,
    /// Height reference the altitudes are expressed in
    pub height_mode: HeightMode,
    pub excluded_by_no_fly: usize,
    /// Present when a terrain source was used
    pub elevation: Option<ElevationReport>,
    pub outfile: Option<PathBuf>,
}

impl FlightPlan {
    pub fn to_geojson(&self) -> serde_json::Value {
        waypath_to_feature_collection(&self.waypath)
    }

    pub fn placemarks(&self) -> Result<Vec<Placemark>> {
        build_placemarks(&self.waypath)
    }

    pub fn mission_settings(&self) -> MissionSettings {
        MissionSettings::new(self.height_mode, self.spacing.ground_speed, self.spacing.agl)
    }
}

/// Inputs that are validated before any geometry work.
struct Prepared {
    spacing: DerivedSpacing,
    output: Option<(PathBuf, OutputFormat)>,
}

fn prepare(options: &FlightPlanOptions, profile: &DroneProfile) -> Result<Prepared> {
    let spacing = calculate_parameters(
        options.forward_overlap,
        options.side_overlap,
        options.agl,
        options.gsd,
        options.image_interval,
        profile,
    )?;
    if let Some([lon, lat]) = options.take_off_point {
        if !lon.is_finite() || !lat.is_finite() || lat.abs() > 90.0 || lon.abs() > 180.0 {
            return Err(FlightPlanError::invalid_parameter(format!(
                "take_off_point ({lon}, {lat}) is not a valid position"
            )));
        }
    }
    if !(options.terrain_follow_threshold > 0.0) {
        return Err(FlightPlanError::invalid_parameter(
            "terrain_follow_threshold must be positive",
        ));
    }
    let output = match &options.outfile {
        Some(path) => Some((path.clone(), OutputFormat::from_path(path)?)),
        None => None,
    };
    Ok(Prepared { spacing, output })
}

/// Generate a flight plan, loading the DEM named in `options` if any.
pub fn create_flightplan(options: &FlightPlanOptions, profile: &DroneProfile) -> Result<FlightPlan> {
    let prepared = prepare(options, profile)?;
    let raster = options
        .dem
        .as_deref()
        .map(ElevationRaster::from_geotiff)
        .transpose()?;
    run(options, profile, prepared, raster.as_ref().map(|r| r as &dyn TerrainSource))
}

/// Generate a flight plan against an already loaded terrain source. The
/// `dem` option is ignored.
pub fn create_flightplan_with_terrain(
    options: &FlightPlanOptions,
    profile: &DroneProfile,
    terrain: Option<&dyn TerrainSource>,
) -> Result<FlightPlan> {
    let prepared = prepare(options, profile)?;
    run(options, profile, prepared, terrain)
}

fn run(
    options: &FlightPlanOptions,
    profile: &DroneProfile,
    prepared: Prepared,
    terrain: Option<&dyn TerrainSource>,
) -> Result<FlightPlan> {
    let Prepared { spacing, output } = prepared;

    let aoi = parse_area_of_interest(&options.project_area)?;
    let no_fly_zones = match &options.no_fly_zones {
        Some(value) => parse_polygons(value)?,
        None => Vec::new(),
    };

    let grid = build_grid(
        &aoi,
        &no_fly_zones,
        GridSpacing {
            point_spacing: spacing.forward_spacing,
            row_spacing: spacing.side_spacing,
            rotation_angle: options.rotation_angle,
        },
    )?;
    let take_off = options
        .take_off_point
        .map(|[lon, lat]| grid.projection.to_planar(lon, lat));
    let ordered = order_path(grid.points(), grid.rotation_angle, take_off);

    let settings = AssemblySettings::new(spacing.agl, spacing.ground_speed, spacing.image_interval, profile)
        .with_modes(options.generate_each_points, options.generate_3d);
    let mut waypath = assemble_waypath(&ordered, &settings)?;

    let (height_mode, elevation) = match terrain {
        Some(terrain) => {
            let report = integrate_elevation(&mut waypath, terrain, options.height_mode);
            if matches!(waypath, Waypath::Lines(_)) {
                let model = AltitudeModel {
                    mode: options.height_mode,
                    base_elevation: report.base_elevation,
                };
                waypath = follow_terrain(
                    waypath,
                    terrain,
                    model,
                    spacing.forward_spacing,
                    options.terrain_follow_threshold,
                );
                renumber(&mut waypath);
            }
            (options.height_mode, Some(report))
        }
        None => {
            assign_flat_altitude(&mut waypath);
            (HeightMode::RelativeToTakeoff, None)
        }
    };

    let plan = FlightPlan {
        spacing,
        waypath,
        height_mode,
        excluded_by_no_fly: grid.excluded_by_no_fly,
        elevation,
        outfile: output.as_ref().map(|(path, _)| path.clone()),
    };

    if let Some((path, format)) = &output {
        match format {
            OutputFormat::Kmz => write_mission(&plan.waypath, &plan.mission_settings(), path)?,
            OutputFormat::GeoJson => {
                let bytes = serde_json::to_vec_pretty(&plan.to_geojson())?;
                write_atomically(path, &bytes)?;
                tracing::info!("waypoints written to {}", path.display());
            }
        }
    }

    tracing::info!(
        "flight plan ready: {} waypoints, agl {:.1} m, speed {:.2} m/s",
        plan.waypath.waypoints().len(),
        plan.spacing.agl,
        plan.spacing.ground_speed
    );
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_format_follows_extension() {
        assert_eq!(OutputFormat::from_path(Path::new("a/mission.KMZ")).unwrap(), OutputFormat::Kmz);
        assert_eq!(OutputFormat::from_path(Path::new("wp.geojson")).unwrap(), OutputFormat::GeoJson);
        assert!(OutputFormat::from_path(Path::new("wp.txt")).is_err());
    }

    #[test]
    fn parameters_are_checked_before_geometry() {
        // Broken geometry must not mask the parameter error.
        let mut options = FlightPlanOptions::new(serde_json::json!({"type": "Point", "coordinates": [0.0, 0.0]}));
        options.agl = Some(100.0);
        options.forward_overlap = 100.0;
        assert!(matches!(
            create_flightplan(&options, &DroneProfile::default()),
            Err(FlightPlanError::InvalidParameter(_))
        ));
    }
}
