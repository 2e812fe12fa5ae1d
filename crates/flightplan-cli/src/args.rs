//! Command line arguments and their mapping onto planner options.

use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};
use flightplan_core::{DroneProfile, FlightPlanOptions, HeightMode};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum HeightModeArg {
    /// Terrain elevation + AGL
    Absolute,
    /// Relative to the take-off point
    RelativeToTakeoff,
}

impl From<HeightModeArg> for HeightMode {
    fn from(arg: HeightModeArg) -> Self {
        match arg {
            HeightModeArg::Absolute => HeightMode::Absolute,
            HeightModeArg::RelativeToTakeoff => HeightMode::RelativeToTakeoff,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct PlanArgs {
    /// GeoJSON file with the project area polygon
    #[arg(long)]
    pub project_geojson: PathBuf,

    /// Altitude above ground level in metres
    #[arg(long)]
    pub agl: Option<f64>,

    /// Ground sampling distance in cm/px (overrides --agl)
    #[arg(long)]
    pub gsd: Option<f64>,

    /// Forward overlap percentage
    #[arg(long, default_value_t = 70.0)]
    pub forward_overlap: f64,

    /// Side overlap percentage
    #[arg(long, default_value_t = 70.0)]
    pub side_overlap: f64,

    /// Row direction in degrees counter-clockwise from east
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    pub rotation_angle: f64,

    /// Seconds between photos
    #[arg(long, default_value_t = 2)]
    pub image_interval: u32,

    /// Stop and shoot at every grid point instead of flying waylines
    #[arg(long)]
    pub generate_each_points: bool,

    /// Add oblique and lateral shots for 3D reconstruction
    #[arg(long)]
    pub generate_3d: bool,

    /// GeoJSON file with no-fly zone polygons
    #[arg(long)]
    pub no_fly_zones: Option<PathBuf>,

    /// Take-off point as "lon,lat"
    #[arg(long, allow_hyphen_values = true)]
    pub take_off_point: Option<String>,

    /// GeoTIFF elevation model
    #[arg(long)]
    pub dem: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = HeightModeArg::Absolute)]
    pub height_mode: HeightModeArg,

    /// Altitude deviation (m) that splits a wayline when following terrain
    #[arg(long, default_value_t = 5.0)]
    pub terrain_follow_threshold: f64,

    /// Drone profile JSON; defaults come from FLIGHTPLAN_* variables
    #[arg(long)]
    pub profile: Option<PathBuf>,

    /// Output file (.kmz mission or .geojson waypoints)
    #[arg(long)]
    pub outfile: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct InspectArgs {
    /// KMZ mission to read
    pub mission: PathBuf,

    /// Print every placemark as JSON
    #[arg(long)]
    pub json: bool,
}

fn read_json(path: &Path) -> Result<serde_json::Value> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("{} is not valid JSON", path.display()))
}

pub fn parse_take_off_point(text: &str) -> Result<[f64; 2]> {
    let parts: Vec<&str> = text.split(',').map(str::trim).collect();
    let [lon, lat] = parts.as_slice() else {
        bail!("take-off point must be \"lon,lat\", got {text:?}");
    };
    let lon: f64 = lon.parse().with_context(|| format!("invalid longitude {lon:?}"))?;
    let lat: f64 = lat.parse().with_context(|| format!("invalid latitude {lat:?}"))?;
    Ok([lon, lat])
}

/// Profile from a JSON file, or from the environment when none is given.
pub fn load_profile(path: Option<&Path>) -> Result<DroneProfile> {
    match path {
        Some(path) => {
            let value = read_json(path)?;
            serde_json::from_value(value)
                .with_context(|| format!("{} is not a drone profile", path.display()))
        }
        None => Ok(DroneProfile::from_env()),
    }
}

impl PlanArgs {
    pub fn to_options(&self) -> Result<FlightPlanOptions> {
        let mut options = FlightPlanOptions::new(read_json(&self.project_geojson)?);
        options.agl = self.agl;
        options.gsd = self.gsd;
        options.forward_overlap = self.forward_overlap;
        options.side_overlap = self.side_overlap;
        options.rotation_angle = self.rotation_angle;
        options.image_interval = self.image_interval;
        options.generate_each_points = self.generate_each_points;
        options.generate_3d = self.generate_3d;
        options.no_fly_zones = self.no_fly_zones.as_deref().map(read_json).transpose()?;
        options.take_off_point = self
            .take_off_point
            .as_deref()
            .map(parse_take_off_point)
            .transpose()?;
        options.dem = self.dem.clone();
        options.height_mode = self.height_mode.into();
        options.terrain_follow_threshold = self.terrain_follow_threshold;
        options.outfile = Some(self.outfile.clone());
        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        plan: PlanArgs,
    }

    #[test]
    fn take_off_point_parsing() {
        assert_eq!(parse_take_off_point("85.3, 27.7").unwrap(), [85.3, 27.7]);
        assert_eq!(parse_take_off_point("-1.5,-2").unwrap(), [-1.5, -2.0]);
        assert!(parse_take_off_point("85.3").is_err());
        assert!(parse_take_off_point("a,b").is_err());
    }

    #[test]
    fn plan_args_map_onto_options() {
        let dir = std::env::temp_dir().join(format!("flightplan-cli-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let aoi = dir.join("aoi.geojson");
        std::fs::write(
            &aoi,
            r#"{"type": "Polygon", "coordinates": [[[0,0],[0.001,0],[0.001,0.001],[0,0]]]}"#,
        )
        .unwrap();

        let harness = Harness::parse_from([
            "flightplan",
            "--project-geojson",
            aoi.to_str().unwrap(),
            "--agl",
            "80",
            "--rotation-angle",
            "-30",
            "--generate-3d",
            "--take-off-point",
            "0.0005,-0.0001",
            "--height-mode",
            "relative-to-takeoff",
            "--outfile",
            "out.kmz",
        ]);
        let options = harness.plan.to_options().unwrap();
        assert_eq!(options.agl, Some(80.0));
        assert_eq!(options.rotation_angle, -30.0);
        assert!(options.generate_3d);
        assert!(!options.generate_each_points);
        assert_eq!(options.take_off_point, Some([0.0005, -0.0001]));
        assert_eq!(options.height_mode, HeightMode::RelativeToTakeoff);
        assert_eq!(options.forward_overlap, 70.0);
        assert_eq!(options.outfile, Some(PathBuf::from("out.kmz")));
        assert_eq!(options.project_area["type"], "Polygon");
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn profile_file_overrides_defaults() {
        let path = std::env::temp_dir().join(format!("flightplan-profile-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"max_speed_mps": 8.0}"#).unwrap();
        let profile = load_profile(Some(&path)).unwrap();
        assert_eq!(profile.max_speed_mps, 8.0);
        assert_eq!(profile.vertical_fov, 0.71);
        std::fs::remove_file(&path).unwrap();
    }
}
