use super::constants::DPI;

/// Maximum number of Newton-Raphson iterations for Kepler's equation
pub(crate) const KEPLER_MAX_ITER: usize = 10;

/// Convergence threshold on the Newton-Raphson correction (radians)
pub(crate) const KEPLER_TOLERANCE: f64 = 1e-12;

/// Largest Newton-Raphson step allowed in one iteration (radians)
const KEPLER_MAX_STEP: f64 = 0.95;

/// Reduce an angle to the principal interval [0, 2π).
pub(crate) fn principal_angle(a: f64) -> f64 {
    a.rem_euclid(DPI)
}

/// Truncated remainder of an angle by 2π, keeping the sign of the input.
///
/// SGP4 reduces its secular angles with a C-style `fmod`, which is what `%` does on floats;
/// the short-period terms were fitted with that convention, so [`principal_angle`] must not be
/// used in its place.
pub(crate) fn fmod2p(a: f64) -> f64 {
    a % DPI
}

/// Solve the modified Kepler equation used by SGP4.
///
/// The equation is written on the argument of latitude plus eccentric anomaly `E + ω`,
/// with the eccentricity vector split in its two components:
///
/// ```text
/// U = (E + ω) − a_xN·sin(E + ω) + a_yN·cos(E + ω)
/// ```
///
/// Arguments
/// -----------------
/// * `u`: mean longitude minus node, `(xl − Ω) mod 2π`
/// * `axn`: `e·cos ω`
/// * `ayn`: `e·sin ω` (with the long-period J3 correction already added)
///
/// Return
/// ----------
/// * `E + ω` in radians. Iteration stops after [`KEPLER_MAX_ITER`] steps even if the
///   correction is still above [`KEPLER_TOLERANCE`]; steps are clamped to ±0.95 rad so the
///   first guesses on eccentric orbits cannot overshoot.
pub(crate) fn solve_kepler_sgp4(u: f64, axn: f64, ayn: f64) -> f64 {
    let mut eo1 = u;

    for _ in 0..KEPLER_MAX_ITER {
        let (sin_eo1, cos_eo1) = eo1.sin_cos();
        let denom = 1.0 - cos_eo1 * axn - sin_eo1 * ayn;
        let delta = ((u - ayn * cos_eo1 + axn * sin_eo1 - eo1) / denom)
            .clamp(-KEPLER_MAX_STEP, KEPLER_MAX_STEP);
        eo1 += delta;
        if delta.abs() < KEPLER_TOLERANCE {
            break;
        }
    }

    eo1
}
