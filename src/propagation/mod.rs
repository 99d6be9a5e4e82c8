//! # SGP4 orbit propagation
//!
//! Analytic propagation of TLE mean elements with the SGP4 model (near-Earth) and its SDP4
//! extension (deep space, orbital period ≥ 225 min).
//!
//! ## Overview
//!
//! * [`Sgp4`] performs the one-time initialization of an [`OrbitalElementSet`](crate::tle::OrbitalElementSet)
//!   (un-Kozai mean motion, drag and oblateness coefficients, lunar-solar and resonance terms)
//!   and then propagates to any number of epochs through `&self`.
//! * [`propagate`] is the one-shot form: initialize, propagate once, drop.
//! * Results are [`StateVector`]s in the **TEME** frame (true equator, mean equinox), position
//!   in km and velocity in km/s.
//!
//! Failures never panic and never produce NaN: they are reported as a [`PropagationError`]
//! (`DegenerateOrbit`, `BadElements`, `Decayed`) so callers can skip the offending sample.
//!
//! ## References
//! * Hoots, F. R. & Roehrich, R. L. (1980), *Spacetrack Report No. 3*.
//! * Vallado, D. A., Crawford, P., Hujsak, R. & Kelso, T. S. (2006), *Revisiting Spacetrack
//!   Report #3*, AIAA 2006-6753.
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{JulianDate, Kilometer};
use crate::tle::OrbitalElementSet;

mod deep_space;
mod sgp4;

pub use sgp4::Sgp4;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropagationError {
    #[error("degenerate orbit: eccentricity outside [0, 1) or semi-major axis below one Earth radius")]
    DegenerateOrbit,
    #[error("unusable orbital elements")]
    BadElements,
    /// Perigee or osculating radius below one Earth radius.
    ///
    /// A reentering satellite under strong drag usually fails first with
    /// [`PropagationError::DegenerateOrbit`]: its mean eccentricity drops below −0.001 before the
    /// perigee check is reached. Callers looking for reentry should match both variants.
    #[error("satellite has decayed: perigee or radius below the Earth's surface")]
    Decayed,
}

/// Earth gravity field used by SGP4.
///
/// TLEs are fitted with WGS72, which is the only model that reproduces published ephemerides.
/// WGS84 is kept for callers that mix SGP4 output with WGS84 products.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GravityModel {
    #[default]
    Wgs72,
    Wgs84,
}

/// Gravity constants in the canonical SGP4 units (Earth radii, minutes).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GravityConstants {
    /// Gravitational parameter (km³/s²)
    pub mu: f64,
    /// Equatorial radius (km)
    pub radius: Kilometer,
    /// sqrt(mu) in Earth radii^1.5 per minute
    pub xke: f64,
    pub j2: f64,
    pub j3: f64,
    pub j4: f64,
    pub j3oj2: f64,
}

impl GravityModel {
    pub fn constants(self) -> GravityConstants {
        let (mu, radius, j2, j3, j4) = match self {
            GravityModel::Wgs72 => (
                398_600.8,
                6_378.135,
                0.001082616,
                -0.00000253881,
                -0.00000165597,
            ),
            GravityModel::Wgs84 => (
                398_600.5,
                6_378.137,
                0.00108262998905,
                -0.00000253215306,
                -0.00000161098761,
            ),
        };
        GravityConstants {
            mu,
            radius,
            xke: 60.0 / (radius * radius * radius / mu).sqrt(),
            j2,
            j3,
            j4,
            j3oj2: j3 / j2,
        }
    }
}

/// Position and velocity of a satellite in the TEME inertial frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateVector {
    /// Position (km)
    pub position: Vector3<f64>,
    /// Velocity (km/s)
    pub velocity: Vector3<f64>,
}

/// Propagate an element set to an absolute epoch given as a Julian date split.
///
/// This is the one-shot form of [`Sgp4::new`] followed by [`Sgp4::propagate`]; when the same
/// element set is propagated to many epochs, build the [`Sgp4`] once instead.
///
/// Arguments
/// -----------------
/// * `elements`: decoded TLE
/// * `jd`: integer part of the Julian date (usually a half-integer, 0h UTC)
/// * `fr`: fraction of day added to `jd`
///
/// Return
/// ----------
/// * the TEME [`StateVector`], or the [`PropagationError`] describing why the orbit cannot be
///   evaluated at that epoch
pub fn propagate(
    elements: &OrbitalElementSet,
    jd: JulianDate,
    fr: f64,
) -> Result<StateVector, PropagationError> {
    Sgp4::new(elements)?.propagate(jd, fr)
}

#[cfg(test)]
mod propagation_test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_wgs72_constants() {
        let k = GravityModel::Wgs72.constants();
        assert_relative_eq!(k.xke, 0.07436691613317342, epsilon = 1e-15);
        assert_relative_eq!(k.j3oj2, -0.00000253881 / 0.001082616);
        assert_eq!(GravityModel::default(), GravityModel::Wgs72);
    }

    #[test]
    fn test_one_shot_matches_initialized_propagator() {
        let tle = OrbitalElementSet::from_lines(
            "VANGUARD 1",
            "1 00005U 58002B   00179.78495062  .00000023  00000-0  28098-4 0  4753",
            "2 00005  34.2682 348.7242 1859667 331.7664  19.3264 10.82419157413667",
        )
        .unwrap();

        let sgp4 = Sgp4::new(&tle).unwrap();
        let (jd, fr) = tle.epoch_jd;
        let one_shot = propagate(&tle, jd, fr + 0.5).unwrap();
        let reused = sgp4.propagate(jd, fr + 0.5).unwrap();
        assert_eq!(one_shot, reused);
    }
}
