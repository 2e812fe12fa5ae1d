//! Core data models for flight plan generation.

use geo::Coord;
use serde::{Deserialize, Serialize};

// ========== GRID ==========

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridPointKind {
    /// Regular lattice position
    Lattice,
    /// Synthesized where a row crosses the AOI boundary
    Boundary,
}

/// A sample position produced by the grid builder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridPoint {
    /// Planar position in metres (local projection around the AOI centroid)
    pub planar: Coord<f64>,
    pub lon: f64,
    pub lat: f64,
    pub row: usize,
    /// Position within the row, ascending along the row axis. Consecutive
    /// values mean the points are joined inside the area; a gap marks a
    /// part of the row outside it.
    pub seq: usize,
    pub kind: GridPointKind,
}

// ========== WAYPOINTS ==========

/// Camera/aircraft action executed at a placemark. Order within a list is
/// execution order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Single shutter trigger
    TakePhoto,
    /// Point the gimbal. `pitch` in degrees, -90 is nadir.
    GimbalRotate { pitch: f64 },
    /// Hold position
    Hover { seconds: f64 },
    /// Repeat the shutter every `interval_s` seconds until stopped
    StartTimedPhoto { interval_s: f64 },
    StopTimedPhoto,
    /// Yaw the aircraft before transiting to the next row
    Turn { heading: f64 },
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::TakePhoto => "take_photo",
            Action::GimbalRotate { .. } => "gimbal_rotate",
            Action::Hover { .. } => "hover",
            Action::StartTimedPhoto { .. } => "start_timed_photo",
            Action::StopTimedPhoto => "stop_timed_photo",
            Action::Turn { .. } => "turn",
        }
    }
}

/// How a waypoint's altitude was obtained from the terrain source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerrainStatus {
    /// Read directly from a valid pixel
    Sampled,
    /// Outside the raster; nearest edge pixel used
    Clamped,
    /// No-data pixel; nearest valid pixel used
    NearestValid,
    /// No usable terrain at all; flat ground assumed
    Flat,
}

impl TerrainStatus {
    pub fn is_degraded(&self) -> bool {
        !matches!(self, TerrainStatus::Sampled)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Waypoint {
    pub lon: f64,
    pub lat: f64,
    /// Requested height above ground (m)
    pub altitude_agl: f64,
    /// Altitude written to the mission. Unset until terrain integration or
    /// flat assignment.
    #[serde(default)]
    pub altitude: Option<f64>,
    /// Degrees, 0 = north, within (-180, 180]
    pub heading: f64,
    /// Degrees. -90 nadir, -45 oblique, 45 marks the lateral shot.
    pub gimbal_angle: f64,
    /// m/s; 0 means stop at this point
    pub speed: f64,
    #[serde(default)]
    pub actions: Vec<Action>,
    pub sequence_index: usize,
    pub row: usize,
    #[serde(default)]
    pub terrain: Option<TerrainStatus>,
}

impl Waypoint {
    /// Name of the action that characterises this point.
    pub fn primary_action(&self) -> &'static str {
        self.actions
            .iter()
            .rev()
            .find(|action| !matches!(action, Action::GimbalRotate { .. } | Action::Hover { .. }))
            .or_else(|| self.actions.last())
            .map(Action::name)
            .unwrap_or("none")
    }
}

/// Straight segment flown at constant speed while photographing on a timer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wayline {
    pub row: usize,
    pub start: Waypoint,
    pub end: Waypoint,
    pub speed: f64,
    /// Actions active along the segment
    pub actions: Vec<Action>,
}

/// Ordered output of the waypoint assembler.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", content = "items", rename_all = "snake_case")]
pub enum Waypath {
    Points(Vec<Waypoint>),
    Lines(Vec<Wayline>),
}

impl Waypath {
    pub fn is_empty(&self) -> bool {
        match self {
            Waypath::Points(points) => points.is_empty(),
            Waypath::Lines(lines) => lines.is_empty(),
        }
    }

    /// Every waypoint in flight order. Line endpoints shared by consecutive
    /// waylines appear twice.
    pub fn waypoints(&self) -> Vec<&Waypoint> {
        match self {
            Waypath::Points(points) => points.iter().collect(),
            Waypath::Lines(lines) => lines.iter().flat_map(|l| [&l.start, &l.end]).collect(),
        }
    }

    pub fn waypoints_mut(&mut self) -> Vec<&mut Waypoint> {
        match self {
            Waypath::Points(points) => points.iter_mut().collect(),
            Waypath::Lines(lines) => lines
                .iter_mut()
                .flat_map(|l| [&mut l.start, &mut l.end])
                .collect(),
        }
    }
}

// ========== OPTIONS ==========

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeightMode {
    /// Terrain elevation + AGL
    #[default]
    Absolute,
    /// AGL adjusted by the terrain difference to the first waypoint
    RelativeToTakeoff,
}

fn default_image_interval() -> u32 {
    2
}

fn default_overlap() -> f64 {
    70.0
}

fn default_terrain_follow_threshold() -> f64 {
    5.0
}

/// Recognised options of the public entry point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlightPlanOptions {
    /// GeoJSON geometry, Feature or FeatureCollection
    pub project_area: serde_json::Value,
    #[serde(default)]
    pub agl: Option<f64>,
    #[serde(default)]
    pub gsd: Option<f64>,
    #[serde(default = "default_overlap")]
    pub forward_overlap: f64,
    #[serde(default = "default_overlap")]
    pub side_overlap: f64,
    #[serde(default)]
    pub rotation_angle: f64,
    #[serde(default)]
    pub generate_each_points: bool,
    #[serde(default)]
    pub generate_3d: bool,
    #[serde(default)]
    pub no_fly_zones: Option<serde_json::Value>,
    /// [longitude, latitude]
    #[serde(default)]
    pub take_off_point: Option<[f64; 2]>,
    #[serde(default = "default_image_interval")]
    pub image_interval: u32,
    /// Path to a GeoTIFF DEM
    #[serde(default)]
    pub dem: Option<std::path::PathBuf>,
    #[serde(default)]
    pub outfile: Option<std::path::PathBuf>,
    #[serde(default)]
    pub height_mode: HeightMode,
    #[serde(default = "default_terrain_follow_threshold")]
    pub terrain_follow_threshold: f64,
}

impl FlightPlanOptions {
    pub fn new(project_area: serde_json::Value) -> Self {
        Self {
            project_area,
            agl: None,
            gsd: None,
            forward_overlap: default_overlap(),
            side_overlap: default_overlap(),
            rotation_angle: 0.0,
            generate_each_points: false,
            generate_3d: false,
            no_fly_zones: None,
            take_off_point: None,
            image_interval: default_image_interval(),
            dem: None,
            outfile: None,
            height_mode: HeightMode::default(),
            terrain_follow_threshold: default_terrain_follow_threshold(),
        }
    }
}
