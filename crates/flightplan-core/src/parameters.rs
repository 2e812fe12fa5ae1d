//! Photo footprint, spacing and ground speed derivation.

use crate::error::{FlightPlanError, Result};
use crate::profile::DroneProfile;
use serde::{Deserialize, Serialize};

/// Spacing and speed derived once per run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedSpacing {
    /// Altitude above ground actually flown (m)
    pub agl: f64,
    /// Ground sampling distance (cm/px)
    pub gsd: f64,
    pub forward_photo_height: f64,
    pub side_photo_width: f64,
    /// Distance between consecutive photos along a flight row (m)
    pub forward_spacing: f64,
    /// Distance between adjacent flight rows (m)
    pub side_spacing: f64,
    /// Capped ground speed (m/s)
    pub ground_speed: f64,
    /// Seconds between shutter triggers
    pub image_interval: u32,
}

/// Resolve AGL from GSD (or the reverse).
///
/// GSD wins when both are given, matching how the camera footprint is
/// specified by survey operators.
pub fn resolve_agl(
    agl: Option<f64>,
    gsd: Option<f64>,
    profile: &DroneProfile,
) -> Result<(f64, f64)> {
    if profile.gsd_to_agl <= 0.0 || !profile.gsd_to_agl.is_finite() {
        return Err(FlightPlanError::invalid_parameter(
            "drone profile gsd_to_agl must be positive",
        ));
    }
    match (agl, gsd) {
        (_, Some(gsd)) => {
            if !gsd.is_finite() || gsd <= 0.0 {
                return Err(FlightPlanError::invalid_parameter(format!(
                    "gsd must be positive, got {gsd}"
                )));
            }
            if agl.is_some() {
                tracing::debug!("both agl and gsd supplied; deriving agl from gsd {}", gsd);
            }
            Ok((gsd * profile.gsd_to_agl, gsd))
        }
        (Some(agl), None) => {
            if !agl.is_finite() || agl <= 0.0 {
                return Err(FlightPlanError::invalid_parameter(format!(
                    "agl must be positive, got {agl}"
                )));
            }
            Ok((agl, agl / profile.gsd_to_agl))
        }
        (None, None) => Err(FlightPlanError::invalid_parameter(
            "either agl or gsd must be supplied",
        )),
    }
}

pub fn calculate_parameters(
    forward_overlap: f64,
    side_overlap: f64,
    agl: Option<f64>,
    gsd: Option<f64>,
    image_interval: u32,
    profile: &DroneProfile,
) -> Result<DerivedSpacing> {
    profile.validate()?;
    check_overlap("forward_overlap", forward_overlap)?;
    check_overlap("side_overlap", side_overlap)?;
    if image_interval == 0 {
        return Err(FlightPlanError::invalid_parameter(
            "image_interval must be at least 1 second",
        ));
    }
    let (agl, gsd) = resolve_agl(agl, gsd, profile)?;

    let forward_photo_height = agl * profile.vertical_fov;
    let side_photo_width = agl * profile.horizontal_fov;
    let forward_spacing = forward_photo_height * (1.0 - forward_overlap / 100.0);
    let side_spacing = side_photo_width * (1.0 - side_overlap / 100.0);
    if !(forward_spacing > 0.0) || !(side_spacing > 0.0) {
        return Err(FlightPlanError::invalid_parameter(format!(
            "derived spacing must be positive (forward {forward_spacing}, side {side_spacing})"
        )));
    }

    let raw_speed = forward_spacing / image_interval as f64;
    let cap = profile.speed_cap_mps();
    let ground_speed = raw_speed.min(cap);
    if raw_speed > cap {
        tracing::debug!(
            "ground speed {:.2} m/s capped to {:.2} m/s",
            raw_speed,
            ground_speed
        );
    }

    Ok(DerivedSpacing {
        agl,
        gsd,
        forward_photo_height,
        side_photo_width,
        forward_spacing,
        side_spacing,
        ground_speed,
        image_interval,
    })
}

fn check_overlap(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || !(0.0..100.0).contains(&value) {
        return Err(FlightPlanError::invalid_parameter(format!(
            "{name} must be within [0, 100), got {value}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_parameters_from_camera_sheet() {
        // AGL 115 m at 75/75 overlap: ~20.4 m forward, ~36.2 m side.
        let spacing =
            calculate_parameters(75.0, 75.0, Some(115.0), None, 2, &DroneProfile::default())
                .unwrap();
        assert!((spacing.forward_photo_height - 81.65).abs() < 1e-9);
        assert!((spacing.forward_spacing - 20.4125).abs() < 1e-9);
        assert!((spacing.side_spacing - 36.225).abs() < 1e-9);
        assert!((spacing.ground_speed - 10.20625).abs() < 1e-9);
    }

    #[test]
    fn ground_speed_is_capped() {
        let spacing =
            calculate_parameters(10.0, 10.0, Some(120.0), None, 1, &DroneProfile::default())
                .unwrap();
        assert!((spacing.ground_speed - 11.5).abs() < 1e-9);
    }

    #[test]
    fn gsd_resolves_agl() {
        let profile = DroneProfile::default();
        let spacing = calculate_parameters(70.0, 70.0, None, Some(2.0), 2, &profile).unwrap();
        assert!((spacing.agl - 59.4).abs() < 1e-9);
        assert!((spacing.gsd - 2.0).abs() < 1e-9);
    }

    #[test]
    fn rejects_full_overlap() {
        let err = calculate_parameters(100.0, 70.0, Some(50.0), None, 2, &DroneProfile::default())
            .unwrap_err();
        assert!(matches!(err, FlightPlanError::InvalidParameter(_)));
    }

    #[test]
    fn rejects_non_positive_inputs() {
        let profile = DroneProfile::default();
        assert!(calculate_parameters(70.0, 70.0, Some(0.0), None, 2, &profile).is_err());
        assert!(calculate_parameters(70.0, 70.0, None, Some(-1.0), 2, &profile).is_err());
        assert!(calculate_parameters(70.0, 70.0, None, None, 2, &profile).is_err());
        assert!(calculate_parameters(70.0, 70.0, Some(50.0), None, 0, &profile).is_err());
        assert!(calculate_parameters(-5.0, 70.0, Some(50.0), None, 2, &profile).is_err());
    }

    #[test]
    fn profile_without_speed_headroom_is_rejected() {
        let profile = DroneProfile {
            max_speed_mps: 0.5,
            speed_safety_buffer_mps: 0.5,
            ..DroneProfile::default()
        };
        let err = calculate_parameters(75.0, 75.0, Some(50.0), None, 2, &profile).unwrap_err();
        assert!(matches!(err, FlightPlanError::InvalidParameter(_)));
    }
}
