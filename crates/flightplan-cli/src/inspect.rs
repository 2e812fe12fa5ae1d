//! Summaries of decoded missions.

use flightplan_core::{Placemark, TurnMode};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissionSummary {
    pub placemarks: usize,
    pub stops: usize,
    pub min_height: f64,
    pub max_height: f64,
    /// Length of the flown polyline (m)
    pub path_length_m: f64,
    pub actions: BTreeMap<String, usize>,
}

pub fn summarize(placemarks: &[Placemark]) -> MissionSummary {
    let mut actions: BTreeMap<String, usize> = BTreeMap::new();
    for action in placemarks.iter().flat_map(|p| &p.actions) {
        *actions.entry(action.name().to_string()).or_default() += 1;
    }
    let heights = placemarks.iter().map(|p| p.height);
    let path_length_m = placemarks
        .windows(2)
        .map(|pair| {
            flightplan_core::haversine_distance(pair[0].lat, pair[0].lon, pair[1].lat, pair[1].lon)
        })
        .sum();

    MissionSummary {
        placemarks: placemarks.len(),
        stops: placemarks
            .iter()
            .filter(|p| p.turn_mode == TurnMode::Stop)
            .count(),
        min_height: heights.clone().fold(f64::INFINITY, f64::min),
        max_height: heights.fold(f64::NEG_INFINITY, f64::max),
        path_length_m,
        actions,
    }
}

impl fmt::Display for MissionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "placemarks:  {} ({} stops)", self.placemarks, self.stops)?;
        if self.placemarks > 0 {
            writeln!(f, "height:      {:.1} - {:.1} m", self.min_height, self.max_height)?;
        }
        writeln!(f, "path length: {:.0} m", self.path_length_m)?;
        for (name, count) in &self.actions {
            writeln!(f, "  {name:<18} {count}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flightplan_core::Action;

    fn placemark(index: usize, lon: f64, height: f64, turn_mode: TurnMode, actions: Vec<Action>) -> Placemark {
        Placemark {
            index,
            lon,
            lat: 0.0,
            height,
            heading: 90.0,
            gimbal_pitch: -90.0,
            speed: 5.0,
            turn_mode,
            actions,
        }
    }

    #[test]
    fn summary_counts_actions_and_stops() {
        let placemarks = vec![
            placemark(0, 0.0, 50.0, TurnMode::Stop, vec![Action::StartTimedPhoto { interval_s: 2.0 }]),
            placemark(1, 0.001, 55.0, TurnMode::PassThrough, Vec::new()),
            placemark(2, 0.002, 52.0, TurnMode::Stop, vec![Action::StopTimedPhoto, Action::Turn { heading: 0.0 }]),
        ];
        let summary = summarize(&placemarks);
        assert_eq!(summary.placemarks, 3);
        assert_eq!(summary.stops, 2);
        assert_eq!(summary.min_height, 50.0);
        assert_eq!(summary.max_height, 55.0);
        assert!((summary.path_length_m - 222.4).abs() < 1.0);
        assert_eq!(summary.actions.get("turn"), Some(&1));
        assert_eq!(summary.actions.get("start_timed_photo"), Some(&1));
        assert!(summary.to_string().contains("placemarks:  3 (2 stops)"));
    }
}
