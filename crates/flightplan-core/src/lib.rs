pub mod elevation;
pub mod error;
pub mod flightplan;
pub mod geojson;
pub mod grid;
pub mod models;
pub mod ordering;
pub mod parameters;
pub mod profile;
pub mod spatial;
pub mod waypoints;
pub mod wpml;

pub use elevation::{
    assign_flat_altitude, follow_terrain, integrate_elevation, AltitudeModel, ElevationRaster,
    ElevationReport, GeoTransform, TerrainSample, TerrainSource,
};
pub use error::{FlightPlanError, Result};
pub use flightplan::{create_flightplan, create_flightplan_with_terrain, FlightPlan, OutputFormat};
pub use grid::{build_grid, GridSpacing, SurveyGrid};
pub use models::{
    Action, FlightPlanOptions, GridPoint, GridPointKind, HeightMode, TerrainStatus, Waypath,
    Waypoint, Wayline,
};
pub use ordering::order_path;
pub use parameters::{calculate_parameters, DerivedSpacing};
pub use profile::DroneProfile;
pub use spatial::haversine_distance;
pub use waypoints::{assemble_waypath, AssemblySettings};
pub use wpml::{
    build_placemarks, decode_mission, encode_mission, read_mission, write_mission,
    MissionSettings, Placemark, TurnMode,
};
