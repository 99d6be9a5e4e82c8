//! # Geodetic conversion
//!
//! Latitude, longitude and altitude of a satellite from its TEME position vector.
//!
//! The Earth is modelled as a **sphere** of radius [`EARTH_MEAN_RADIUS`] (6371 km):
//!
//! ```text
//! lat = atan2(z, sqrt(x² + y²))
//! lon = atan2(y, x)
//! alt = |r| − 6371 km
//! ```
//!
//! This ignores the flattening of the WGS-84 ellipsoid (up to ~21 km in altitude and ~0.19° in
//! latitude), which is acceptable for ground-track display but not for geolocation.
//!
//! ## Frames
//!
//! * [`GeodeticFrame::Inertial`] (default) applies the formulas to the TEME vector as is, so the
//!   longitude is measured from the mean equinox, not from Greenwich.
//! * [`GeodeticFrame::EarthFixed`] first rotates the vector by the Greenwich mean sidereal time
//!   of the sample epoch, which yields geographic longitudes.
use hifitime::Epoch;
use nalgebra::{Rotation3, Vector3};
use serde::{Deserialize, Serialize};

use crate::constants::{Degree, Kilometer, EARTH_MEAN_RADIUS};
use crate::time::{epoch_to_jd, gmst, jd_to_mjd};

/// Frame in which the spherical coordinates are taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeodeticFrame {
    /// TEME axes, longitude counted from the mean equinox
    #[default]
    Inertial,
    /// Earth-fixed axes, longitude counted from Greenwich
    EarthFixed,
}

/// Spherical-Earth position of a satellite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeodeticPoint {
    /// Latitude in degrees, in [-90, 90], rounded to 6 decimals
    pub latitude: Degree,
    /// Longitude in degrees, in [-180, 180], rounded to 6 decimals
    pub longitude: Degree,
    /// Height above the 6371 km mean sphere (km), rounded to 2 decimals
    pub altitude: Kilometer,
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

impl GeodeticPoint {
    /// Convert a TEME position (km) with the spherical-Earth formulas.
    ///
    /// A non-finite input yields non-finite coordinates; propagation failures are expected to be
    /// filtered out before reaching this function.
    pub fn from_inertial(position: &Vector3<f64>) -> Self {
        let (x, y, z) = (position.x, position.y, position.z);
        let rho = x.hypot(y);

        GeodeticPoint {
            latitude: round_to(z.atan2(rho).to_degrees(), 6),
            longitude: round_to(y.atan2(x).to_degrees(), 6),
            altitude: round_to(position.norm() - EARTH_MEAN_RADIUS, 2),
        }
    }

    /// Convert a TEME position observed at `epoch` in the requested frame.
    ///
    /// Arguments
    /// -----------------
    /// * `position`: TEME position vector (km)
    /// * `epoch`: UTC instant of the position, used by [`GeodeticFrame::EarthFixed`] only
    /// * `frame`: frame of the spherical coordinates
    pub fn from_teme(position: &Vector3<f64>, epoch: Epoch, frame: GeodeticFrame) -> Self {
        match frame {
            GeodeticFrame::Inertial => Self::from_inertial(position),
            GeodeticFrame::EarthFixed => {
                let (jd, fr) = epoch_to_jd(epoch);
                let theta = gmst(jd_to_mjd(jd) + fr);
                let earth_fixed = Rotation3::from_axis_angle(&Vector3::z_axis(), -theta) * position;
                Self::from_inertial(&earth_fixed)
            }
        }
    }
}

#[cfg(test)]
mod geodetic_test {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_on_axis_points() {
        let p = GeodeticPoint::from_inertial(&Vector3::new(7000.0, 0.0, 0.0));
        assert_eq!(p.latitude, 0.0);
        assert_eq!(p.longitude, 0.0);
        assert_eq!(p.altitude, 629.0);

        let p = GeodeticPoint::from_inertial(&Vector3::new(0.0, 0.0, -6500.0));
        assert_eq!(p.latitude, -90.0);
        assert_eq!(p.altitude, 129.0);

        let p = GeodeticPoint::from_inertial(&Vector3::new(-7000.0, 0.0, 0.0));
        assert_eq!(p.longitude, 180.0);
    }

    #[test]
    fn test_rounding() {
        let p = GeodeticPoint::from_inertial(&Vector3::new(7022.46529266, -1400.08296755, 0.03995155));
        assert_abs_diff_eq!(p.latitude, 0.000320, epsilon = 1e-12);
        assert_abs_diff_eq!(p.longitude, -11.275331, epsilon = 1e-12);
        assert_abs_diff_eq!(p.altitude, 789.67, epsilon = 1e-12);
    }

    #[test]
    fn test_earth_fixed_rotates_longitude_only() {
        let r = Vector3::new(4083.902, -993.632, 5243.604);
        let epoch = Epoch::from_gregorian_utc(2008, 9, 20, 12, 25, 40, 104_192_000);
        let inertial = GeodeticPoint::from_teme(&r, epoch, GeodeticFrame::Inertial);
        let fixed = GeodeticPoint::from_teme(&r, epoch, GeodeticFrame::EarthFixed);

        assert_eq!(inertial, GeodeticPoint::from_inertial(&r));
        assert_abs_diff_eq!(inertial.latitude, fixed.latitude, epsilon = 2e-6);
        assert_abs_diff_eq!(inertial.altitude, fixed.altitude, epsilon = 0.02);

        let (jd, fr) = epoch_to_jd(epoch);
        let theta = gmst(jd_to_mjd(jd) + fr).to_degrees();
        let shift = (inertial.longitude - fixed.longitude - theta).rem_euclid(360.0);
        assert!(shift < 1e-5 || shift > 360.0 - 1e-5, "{shift}");
    }
}
