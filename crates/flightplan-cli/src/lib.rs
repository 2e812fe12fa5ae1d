//! Flightplan CLI - command line driver for survey flight plan generation.
//!
//! Subcommands:
//! - plan: generate a KMZ mission or GeoJSON waypoint file from an AOI
//! - inspect: summarise the placemarks of an existing KMZ mission

pub mod args;
pub mod inspect;

pub use args::{load_profile, HeightModeArg, InspectArgs, PlanArgs};
pub use inspect::{summarize, MissionSummary};
