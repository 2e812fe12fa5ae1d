//! Physical constants of the aircraft and camera.

use crate::error::{FlightPlanError, Result};
use serde::{Deserialize, Serialize};
use std::env;

/// Camera and controller constants injected into the parameter calculator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DroneProfile {
    /// Vertical field of view expressed as footprint height / altitude
    pub vertical_fov: f64,
    /// Horizontal field of view expressed as footprint width / altitude
    pub horizontal_fov: f64,
    /// Metres of AGL per cm/px of GSD
    pub gsd_to_agl: f64,
    /// Controller-imposed maximum ground speed (m/s)
    pub max_speed_mps: f64,
    /// Margin kept below the maximum speed (m/s)
    pub speed_safety_buffer_mps: f64,
    /// Hover after a gimbal move before the shutter fires (s)
    pub gimbal_settle_secs: f64,
}

impl Default for DroneProfile {
    fn default() -> Self {
        Self {
            vertical_fov: 0.71,
            horizontal_fov: 1.26,
            gsd_to_agl: 29.7,
            max_speed_mps: 12.0,
            speed_safety_buffer_mps: 0.5,
            gimbal_settle_secs: 1.0,
        }
    }
}

impl DroneProfile {
    /// Defaults overridden by `FLIGHTPLAN_*` environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            vertical_fov: env_f64("FLIGHTPLAN_VERTICAL_FOV").unwrap_or(defaults.vertical_fov),
            horizontal_fov: env_f64("FLIGHTPLAN_HORIZONTAL_FOV")
                .unwrap_or(defaults.horizontal_fov),
            gsd_to_agl: env_f64("FLIGHTPLAN_GSD_TO_AGL").unwrap_or(defaults.gsd_to_agl),
            max_speed_mps: env_f64("FLIGHTPLAN_MAX_SPEED_MPS").unwrap_or(defaults.max_speed_mps),
            speed_safety_buffer_mps: env_f64("FLIGHTPLAN_SPEED_BUFFER_MPS")
                .unwrap_or(defaults.speed_safety_buffer_mps),
            gimbal_settle_secs: env_f64("FLIGHTPLAN_GIMBAL_SETTLE_SECS")
                .unwrap_or(defaults.gimbal_settle_secs),
        }
    }

    /// Highest ground speed the planner will ever assign.
    pub fn speed_cap_mps(&self) -> f64 {
        self.max_speed_mps - self.speed_safety_buffer_mps
    }

    /// Reject profiles that would derive a zero footprint or a zero speed.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("vertical_fov", self.vertical_fov),
            ("horizontal_fov", self.horizontal_fov),
            ("gsd_to_agl", self.gsd_to_agl),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(FlightPlanError::invalid_parameter(format!(
                    "drone profile {name} must be positive, got {value}"
                )));
            }
        }
        let cap = self.speed_cap_mps();
        if !cap.is_finite() || cap <= 0.0 {
            return Err(FlightPlanError::invalid_parameter(format!(
                "drone profile max_speed_mps ({}) must exceed speed_safety_buffer_mps ({})",
                self.max_speed_mps, self.speed_safety_buffer_mps
            )));
        }
        if !self.gimbal_settle_secs.is_finite() || self.gimbal_settle_secs < 0.0 {
            return Err(FlightPlanError::invalid_parameter(format!(
                "drone profile gimbal_settle_secs must not be negative, got {}",
                self.gimbal_settle_secs
            )));
        }
        Ok(())
    }
}

fn env_f64(key: &str) -> Option<f64> {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|value| value.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speed_cap_subtracts_buffer() {
        let profile = DroneProfile::default();
        assert!((profile.speed_cap_mps() - 11.5).abs() < 1e-9);
    }

    #[test]
    fn default_profile_is_valid() {
        assert!(DroneProfile::default().validate().is_ok());
    }

    #[test]
    fn buffer_at_or_above_max_speed_is_rejected() {
        let profile = DroneProfile {
            max_speed_mps: 0.5,
            speed_safety_buffer_mps: 0.5,
            ..DroneProfile::default()
        };
        assert!(matches!(profile.validate(), Err(FlightPlanError::InvalidParameter(_))));
    }

    #[test]
    fn non_positive_field_of_view_is_rejected() {
        for (vertical_fov, horizontal_fov) in [(0.0, 1.26), (0.71, -1.0), (f64::NAN, 1.26)] {
            let profile = DroneProfile {
                vertical_fov,
                horizontal_fov,
                ..DroneProfile::default()
            };
            assert!(matches!(profile.validate(), Err(FlightPlanError::InvalidParameter(_))));
        }
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let profile: DroneProfile = serde_json::from_str(r#"{"max_speed_mps": 15.0}"#).unwrap();
        assert_eq!(profile.max_speed_mps, 15.0);
        assert_eq!(profile.vertical_fov, DroneProfile::default().vertical_fov);
    }
}
