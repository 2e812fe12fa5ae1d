//! Waypoint assembly: ordered grid points to a flyable waypath.

use crate::error::{FlightPlanError, Result};
use crate::models::{Action, GridPoint, Waypath, Waypoint, Wayline};
use crate::profile::DroneProfile;
use crate::spatial::{bearing_deg, haversine_distance, normalize_heading};

pub const NADIR_PITCH: f64 = -90.0;
pub const OBLIQUE_PITCH: f64 = -45.0;
/// Marker angle of the lateral shot of a 3D set.
pub const LATERAL_ANGLE: f64 = 45.0;
/// Yaw offset applied to the aircraft for the lateral shot.
pub const LATERAL_YAW_OFFSET: f64 = 45.0;

/// Positions closer than this are treated as the same place when computing
/// headings (m).
const SAME_POSITION_M: f64 = 0.01;

/// What the assembler needs to know about the flight.
#[derive(Debug, Clone, Copy)]
pub struct AssemblySettings {
    pub altitude_agl: f64,
    pub ground_speed: f64,
    pub image_interval: u32,
    pub gimbal_settle_secs: f64,
    pub each_points: bool,
    pub three_d: bool,
}

impl AssemblySettings {
    pub fn new(altitude_agl: f64, ground_speed: f64, image_interval: u32, profile: &DroneProfile) -> Self {
        Self {
            altitude_agl,
            ground_speed,
            image_interval,
            gimbal_settle_secs: profile.gimbal_settle_secs,
            each_points: false,
            three_d: false,
        }
    }

    pub fn with_modes(mut self, each_points: bool, three_d: bool) -> Self {
        self.each_points = each_points;
        self.three_d = three_d;
        self
    }
}

/// Gimbal pitch actually commanded for a marker angle. The lateral shot keeps
/// the oblique pitch and yaws the aircraft instead.
pub fn physical_pitch(gimbal_angle: f64) -> f64 {
    if gimbal_angle > 0.0 {
        OBLIQUE_PITCH
    } else {
        gimbal_angle
    }
}

/// Heading from each position towards the next distinct one. The last
/// position inherits the heading it was approached with; a lone position
/// faces north.
pub fn path_headings(positions: &[(f64, f64)]) -> Vec<f64> {
    (0..positions.len())
        .map(|i| {
            let here = positions[i];
            if let Some(next) = positions[i + 1..].iter().find(|&&p| distance(here, p) > SAME_POSITION_M) {
                return heading_between(here, *next);
            }
            positions[..i]
                .iter()
                .rev()
                .find(|&&p| distance(p, here) > SAME_POSITION_M)
                .map(|prev| heading_between(*prev, here))
                .unwrap_or(0.0)
        })
        .collect()
}

fn distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    haversine_distance(a.1, a.0, b.1, b.0)
}

fn heading_between(from: (f64, f64), to: (f64, f64)) -> f64 {
    normalize_heading(bearing_deg(from.1, from.0, to.1, to.0))
}

/// Build the waypath for `ordered` grid points. Fails with `EmptyPath` when
/// nothing is left to fly.
pub fn assemble_waypath(ordered: &[GridPoint], settings: &AssemblySettings) -> Result<Waypath> {
    if ordered.is_empty() {
        return Err(FlightPlanError::EmptyPath(
            "no grid points remain inside the project area".into(),
        ));
    }

    let mut path = if settings.each_points {
        Waypath::Points(assemble_points(ordered, settings))
    } else {
        Waypath::Lines(assemble_lines(ordered, settings))
    };
    renumber(&mut path);

    tracing::debug!(
        "assembled {} waypoints ({} mode, 3d={})",
        path.waypoints().len(),
        if settings.each_points { "point" } else { "line" },
        settings.three_d
    );
    Ok(path)
}

/// Assign consecutive sequence indices in flight order.
pub fn renumber(path: &mut Waypath) {
    for (index, waypoint) in path.waypoints_mut().into_iter().enumerate() {
        waypoint.sequence_index = index;
    }
}

fn base_waypoint(point: &GridPoint, settings: &AssemblySettings, heading: f64, gimbal_angle: f64) -> Waypoint {
    Waypoint {
        lon: point.lon,
        lat: point.lat,
        altitude_agl: settings.altitude_agl,
        altitude: None,
        heading,
        gimbal_angle,
        speed: settings.ground_speed,
        actions: Vec::new(),
        sequence_index: 0,
        row: point.row,
        terrain: None,
    }
}

// ========== POINT MODE ==========

fn assemble_points(ordered: &[GridPoint], settings: &AssemblySettings) -> Vec<Waypoint> {
    let positions: Vec<(f64, f64)> = ordered.iter().map(|p| (p.lon, p.lat)).collect();
    let headings = path_headings(&positions);

    let mut waypoints = Vec::with_capacity(ordered.len() * if settings.three_d { 3 } else { 1 });
    for (point, heading) in ordered.iter().zip(headings) {
        if settings.three_d {
            waypoints.push(base_waypoint(point, settings, heading, NADIR_PITCH));
            waypoints.push(base_waypoint(point, settings, heading, OBLIQUE_PITCH));
            waypoints.push(base_waypoint(
                point,
                settings,
                normalize_heading(heading + LATERAL_YAW_OFFSET),
                LATERAL_ANGLE,
            ));
        } else {
            waypoints.push(base_waypoint(point, settings, heading, NADIR_PITCH));
        }
    }

    // Gimbal moves and in-place yaw changes need a settle before the shutter.
    let mut previous: Option<(f64, f64, (f64, f64))> = None;
    for waypoint in &mut waypoints {
        let pitch = physical_pitch(waypoint.gimbal_angle);
        let here = (waypoint.lon, waypoint.lat);
        let pitch_changed = previous.map_or(true, |(p, _, _)| p != pitch);
        let yawed_in_place = previous
            .is_some_and(|(_, h, at)| h != waypoint.heading && distance(at, here) <= SAME_POSITION_M);
        if pitch_changed {
            waypoint.actions.push(Action::GimbalRotate { pitch });
        }
        if pitch_changed || yawed_in_place {
            waypoint.actions.push(Action::Hover {
                seconds: settings.gimbal_settle_secs,
            });
        }
        waypoint.actions.push(Action::TakePhoto);
        previous = Some((pitch, waypoint.heading, here));
    }
    waypoints
}

// ========== LINE MODE ==========

/// Split the ordered points into straight runs: consecutive points of one row
/// that were also neighbours before no-fly clipping.
fn straight_runs(ordered: &[GridPoint]) -> Vec<&[GridPoint]> {
    let mut runs = Vec::new();
    let mut start = 0;
    for i in 1..=ordered.len() {
        let breaks = i == ordered.len() || {
            let (a, b) = (&ordered[i - 1], &ordered[i]);
            a.row != b.row || a.seq.abs_diff(b.seq) != 1
        };
        if breaks {
            runs.push(&ordered[start..i]);
            start = i;
        }
    }
    runs
}

fn assemble_lines(ordered: &[GridPoint], settings: &AssemblySettings) -> Vec<Wayline> {
    let interval = f64::from(settings.image_interval);
    let passes: &[f64] = if settings.three_d {
        &[NADIR_PITCH, OBLIQUE_PITCH, LATERAL_ANGLE]
    } else {
        &[NADIR_PITCH]
    };

    let mut lines: Vec<Wayline> = Vec::new();
    for run in straight_runs(ordered) {
        let (first, last) = (&run[0], &run[run.len() - 1]);
        for (pass, &gimbal_angle) in passes.iter().enumerate() {
            // 3D passes shuttle back and forth along the run.
            let (from, to) = if pass % 2 == 0 { (first, last) } else { (last, first) };
            let mut heading = heading_between((from.lon, from.lat), (to.lon, to.lat));
            if distance((from.lon, from.lat), (to.lon, to.lat)) <= SAME_POSITION_M {
                heading = lines.last().map(|l| l.end.heading).unwrap_or(0.0);
            }
            if gimbal_angle == LATERAL_ANGLE {
                heading = normalize_heading(heading + LATERAL_YAW_OFFSET);
            }

            let mut start = base_waypoint(from, settings, heading, gimbal_angle);
            let mut end = base_waypoint(to, settings, heading, gimbal_angle);
            start.speed = 0.0;
            end.speed = 0.0;

            let pitch = physical_pitch(gimbal_angle);
            let pitch_changed = lines
                .last()
                .map(|l| physical_pitch(l.start.gimbal_angle) != pitch)
                .unwrap_or(true);
            if pitch_changed {
                start.actions.push(Action::GimbalRotate { pitch });
                start.actions.push(Action::Hover {
                    seconds: settings.gimbal_settle_secs,
                });
            }

            let single = run.len() == 1;
            let segment_actions = if single {
                start.actions.push(Action::TakePhoto);
                vec![Action::TakePhoto]
            } else {
                start.actions.push(Action::StartTimedPhoto { interval_s: interval });
                end.actions.push(Action::StopTimedPhoto);
                vec![Action::StartTimedPhoto { interval_s: interval }]
            };

            lines.push(Wayline {
                row: from.row,
                start,
                end,
                speed: settings.ground_speed,
                actions: segment_actions,
            });
        }
    }

    // A row end faces the next line's start; before transiting it yaws to the
    // heading that line is flown on.
    for i in 0..lines.len().saturating_sub(1) {
        let here = (lines[i].end.lon, lines[i].end.lat);
        let next_start = (lines[i + 1].start.lon, lines[i + 1].start.lat);
        if distance(here, next_start) > SAME_POSITION_M {
            let mut bearing = heading_between(here, next_start);
            if lines[i].end.gimbal_angle == LATERAL_ANGLE {
                bearing = normalize_heading(bearing + LATERAL_YAW_OFFSET);
            }
            lines[i].end.heading = bearing;
        }
        let next_heading = lines[i + 1].start.heading;
        if lines[i].end.heading != next_heading {
            lines[i].end.actions.push(Action::Turn {
                heading: next_heading,
            });
        }
    }
    lines
}
