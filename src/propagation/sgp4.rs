use std::f64::consts::PI;

use nalgebra::Vector3;
use tracing::trace;

use crate::constants::{JulianDate, DPI, JD_1950, MINUTES_PER_DAY, RADEG};
use crate::kepler::{fmod2p, solve_kepler_sgp4};
use crate::time::{gmst, jd_to_mjd, minutes_between};
use crate::tle::OrbitalElementSet;

use super::deep_space::{DeepSpace, MeanState, PerturbedElements};
use super::{GravityConstants, GravityModel, PropagationError, StateVector};

/// Orbital period above which the deep-space terms are switched on (minutes)
const DEEP_SPACE_PERIOD: f64 = 225.0;

const X2O3: f64 = 2.0 / 3.0;

/// Guard used in place of `1 + cos i` for retrograde equatorial orbits
const TEMP4: f64 = 1.5e-12;

/// Mean elements at epoch in SGP4 units (radians, radians per minute).
#[derive(Debug, Clone, Copy)]
pub(super) struct MeanElements {
    pub ecco: f64,
    pub inclo: f64,
    pub nodeo: f64,
    pub argpo: f64,
    pub mo: f64,
    /// Brouwer mean motion, recovered from the Kozai value published in the TLE
    pub no_unkozai: f64,
    pub bstar: f64,
}

/// Secular rates from the zonal harmonics (radians per minute).
#[derive(Debug, Clone, Copy)]
pub(super) struct SecularRates {
    pub mdot: f64,
    pub argpdot: f64,
    pub nodedot: f64,
}

/// Drag and zonal coefficients of the near-Earth model.
#[derive(Debug, Clone, Copy, Default)]
struct NearEarthTerms {
    /// Simplified drag model (perigee below 220 km or deep space)
    isimp: bool,
    aycof: f64,
    con41: f64,
    cc1: f64,
    cc4: f64,
    cc5: f64,
    d2: f64,
    d3: f64,
    d4: f64,
    delmo: f64,
    eta: f64,
    omgcof: f64,
    sinmao: f64,
    t2cof: f64,
    t3cof: f64,
    t4cof: f64,
    t5cof: f64,
    x1mth2: f64,
    x7thm1: f64,
    xlcof: f64,
    xmcof: f64,
    nodecf: f64,
}

/// Long-period J3 coefficients `(xlcof, aycof)` for a given inclination.
fn j3_coefficients(j3oj2: f64, sini: f64, cosi: f64) -> (f64, f64) {
    let denom = if (cosi + 1.0).abs() > TEMP4 {
        1.0 + cosi
    } else {
        TEMP4
    };
    (
        -0.25 * j3oj2 * sini * (3.0 + 5.0 * cosi) / denom,
        -0.5 * j3oj2 * sini,
    )
}

/// An initialized SGP4 propagator for one element set.
///
/// All the epoch-dependent coefficients are computed once in [`Sgp4::new`]; propagation only
/// reads them, so an `Sgp4` can be shared between threads and queried in any order.
///
/// Example
/// -----------------
/// ```rust
/// use terrasat::tle::OrbitalElementSet;
/// use terrasat::propagation::Sgp4;
///
/// let tle = OrbitalElementSet::from_lines(
///     "VANGUARD 1",
///     "1 00005U 58002B   00179.78495062  .00000023  00000-0  28098-4 0  4753",
///     "2 00005  34.2682 348.7242 1859667 331.7664  19.3264 10.82419157413667",
/// ).unwrap();
///
/// let sgp4 = Sgp4::new(&tle).unwrap();
/// let state = sgp4.propagate_minutes(360.0).unwrap();
/// assert!((state.position.norm() - 8831.6).abs() < 0.1);
/// ```
#[derive(Debug, Clone)]
pub struct Sgp4 {
    gravity: GravityConstants,
    epoch_jd: (JulianDate, f64),
    elements: MeanElements,
    rates: SecularRates,
    terms: NearEarthTerms,
    deep_space: Option<DeepSpace>,
}

impl Sgp4 {
    /// Initialize SGP4 with the WGS72 gravity model.
    pub fn new(elements: &OrbitalElementSet) -> Result<Self, PropagationError> {
        Self::with_gravity(elements, GravityModel::Wgs72)
    }

    /// Initialize SGP4 for an element set.
    ///
    /// Arguments
    /// -----------------
    /// * `elements`: decoded TLE
    /// * `model`: gravity constants to use
    ///
    /// Return
    /// ----------
    /// * `BadElements` if a field is not finite or the mean motion is not positive,
    /// * `DegenerateOrbit` if the eccentricity is outside [0, 1) or the semi-major axis does
    ///   not exceed one Earth radius,
    /// * the initialized propagator otherwise.
    pub fn with_gravity(
        elements: &OrbitalElementSet,
        model: GravityModel,
    ) -> Result<Self, PropagationError> {
        let gravity = model.constants();
        let GravityConstants {
            radius,
            xke,
            j2,
            j3oj2,
            j4,
            ..
        } = gravity;

        let raw = [
            elements.bstar,
            elements.eccentricity,
            elements.inclination,
            elements.right_ascension,
            elements.argument_of_perigee,
            elements.mean_anomaly,
            elements.mean_motion,
            elements.epoch_jd.0,
            elements.epoch_jd.1,
        ];
        if raw.iter().any(|x| !x.is_finite()) || elements.mean_motion <= 0.0 {
            return Err(PropagationError::BadElements);
        }

        let ecco = elements.eccentricity;
        if !(0.0..1.0).contains(&ecco) {
            return Err(PropagationError::DegenerateOrbit);
        }

        let inclo = elements.inclination * RADEG;
        let nodeo = elements.right_ascension * RADEG;
        let argpo = elements.argument_of_perigee * RADEG;
        let mo = elements.mean_anomaly * RADEG;
        let bstar = elements.bstar;
        let no_kozai = elements.mean_motion * DPI / MINUTES_PER_DAY;
        let (jd, fr) = elements.epoch_jd;

        // Recover the Brouwer mean motion and semi-major axis from the Kozai mean motion
        let eccsq = ecco * ecco;
        let omeosq = 1.0 - eccsq;
        let rteosq = omeosq.sqrt();
        let (sinio, cosio) = inclo.sin_cos();
        let cosio2 = cosio * cosio;

        let ak = (xke / no_kozai).powf(X2O3);
        let d1 = 0.75 * j2 * (3.0 * cosio2 - 1.0) / (rteosq * omeosq);
        let del = d1 / (ak * ak);
        let adel = ak * (1.0 - del * del - del * (1.0 / 3.0 + 134.0 * del * del / 81.0));
        let del = d1 / (adel * adel);
        let no = no_kozai / (1.0 + del);

        let ao = (xke / no).powf(X2O3);
        if !(ao > 1.0) {
            return Err(PropagationError::DegenerateOrbit);
        }

        let po = ao * omeosq;
        let con42 = 1.0 - 5.0 * cosio2;
        let con41 = -con42 - cosio2 - cosio2;
        let posq = po * po;
        let rp = ao * (1.0 - ecco);
        let gsto = gmst(jd_to_mjd(jd) + fr);

        // Atmospheric density parameters, lowered for perigees below 156 km
        let ss = 78.0 / radius + 1.0;
        let qzms2t = ((120.0 - 78.0) / radius).powi(4);
        let mut isimp = rp < 220.0 / radius + 1.0;
        let mut sfour = ss;
        let mut qzms24 = qzms2t;
        let perige = (rp - 1.0) * radius;
        if perige < 156.0 {
            sfour = if perige < 98.0 { 20.0 } else { perige - 78.0 };
            qzms24 = ((120.0 - sfour) / radius).powi(4);
            sfour = sfour / radius + 1.0;
        }

        let pinvsq = 1.0 / posq;
        let tsi = 1.0 / (ao - sfour);
        let eta = ao * ecco * tsi;
        let etasq = eta * eta;
        let eeta = ecco * eta;
        let psisq = (1.0 - etasq).abs();
        let coef = qzms24 * tsi.powi(4);
        let coef1 = coef / psisq.powf(3.5);
        let cc2 = coef1
            * no
            * (ao * (1.0 + 1.5 * etasq + eeta * (4.0 + etasq))
                + 0.375 * j2 * tsi / psisq * con41 * (8.0 + 3.0 * etasq * (8.0 + etasq)));
        let cc1 = bstar * cc2;
        let cc3 = if ecco > 1.0e-4 {
            -2.0 * coef * tsi * j3oj2 * no * sinio / ecco
        } else {
            0.0
        };
        let x1mth2 = 1.0 - cosio2;
        let cc4 = 2.0
            * no
            * coef1
            * ao
            * omeosq
            * (eta * (2.0 + 0.5 * etasq) + ecco * (0.5 + 2.0 * etasq)
                - j2 * tsi / (ao * psisq)
                    * (-3.0 * con41 * (1.0 - 2.0 * eeta + etasq * (1.5 - 0.5 * eeta))
                        + 0.75 * x1mth2 * (2.0 * etasq - eeta * (1.0 + etasq)) * (2.0 * argpo).cos()));
        let cc5 = 2.0 * coef1 * ao * omeosq * (1.0 + 2.75 * (etasq + eeta) + eeta * etasq);

        // Secular rates from J2 and J4
        let cosio4 = cosio2 * cosio2;
        let temp1 = 1.5 * j2 * pinvsq * no;
        let temp2 = 0.5 * temp1 * j2 * pinvsq;
        let temp3 = -0.46875 * j4 * pinvsq * pinvsq * no;
        let mdot = no
            + 0.5 * temp1 * rteosq * con41
            + 0.0625 * temp2 * rteosq * (13.0 - 78.0 * cosio2 + 137.0 * cosio4);
        let argpdot = -0.5 * temp1 * con42
            + 0.0625 * temp2 * (7.0 - 114.0 * cosio2 + 395.0 * cosio4)
            + temp3 * (3.0 - 36.0 * cosio2 + 49.0 * cosio4);
        let xhdot1 = -temp1 * cosio;
        let nodedot =
            xhdot1 + (0.5 * temp2 * (4.0 - 19.0 * cosio2) + 2.0 * temp3 * (3.0 - 7.0 * cosio2)) * cosio;

        let (xlcof, aycof) = j3_coefficients(j3oj2, sinio, cosio);
        let mut terms = NearEarthTerms {
            isimp,
            aycof,
            con41,
            cc1,
            cc4,
            cc5,
            delmo: (1.0 + eta * mo.cos()).powi(3),
            eta,
            omgcof: bstar * cc3 * argpo.cos(),
            sinmao: mo.sin(),
            t2cof: 1.5 * cc1,
            x1mth2,
            x7thm1: 7.0 * cosio2 - 1.0,
            xlcof,
            xmcof: if ecco > 1.0e-4 {
                -X2O3 * coef * bstar / eeta
            } else {
                0.0
            },
            nodecf: 3.5 * omeosq * xhdot1 * cc1,
            ..NearEarthTerms::default()
        };

        let mean = MeanElements {
            ecco,
            inclo,
            nodeo,
            argpo,
            mo,
            no_unkozai: no,
            bstar,
        };
        let rates = SecularRates {
            mdot,
            argpdot,
            nodedot,
        };

        let deep_space = if DPI / no >= DEEP_SPACE_PERIOD {
            isimp = true;
            Some(DeepSpace::new(&mean, &rates, jd + fr - JD_1950, gsto, xke))
        } else {
            None
        };
        terms.isimp = isimp;

        if !isimp {
            let cc1sq = cc1 * cc1;
            terms.d2 = 4.0 * ao * tsi * cc1sq;
            let temp = terms.d2 * tsi * cc1 / 3.0;
            terms.d3 = (17.0 * ao + sfour) * temp;
            terms.d4 = 0.5 * temp * ao * tsi * (221.0 * ao + 31.0 * sfour) * cc1;
            terms.t3cof = terms.d2 + 2.0 * cc1sq;
            terms.t4cof = 0.25 * (3.0 * terms.d3 + cc1 * (12.0 * terms.d2 + 10.0 * cc1sq));
            terms.t5cof = 0.2
                * (3.0 * terms.d4
                    + 12.0 * cc1 * terms.d3
                    + 6.0 * terms.d2 * terms.d2
                    + 15.0 * cc1sq * (2.0 * terms.d2 + cc1sq));
        }

        trace!(
            catalog_number = %elements.catalog_number,
            deep_space = deep_space.is_some(),
            simplified_drag = isimp,
            "initialized SGP4"
        );

        Ok(Sgp4 {
            gravity,
            epoch_jd: (jd, fr),
            elements: mean,
            rates,
            terms,
            deep_space,
        })
    }

    /// Epoch of the element set as a Julian date split.
    pub fn epoch_jd(&self) -> (JulianDate, f64) {
        self.epoch_jd
    }

    /// Whether the lunar-solar (SDP4) terms are active for this orbit.
    pub fn is_deep_space(&self) -> bool {
        self.deep_space.is_some()
    }

    /// Propagate to an absolute epoch given as a Julian date split.
    pub fn propagate(&self, jd: JulianDate, fr: f64) -> Result<StateVector, PropagationError> {
        self.propagate_minutes(minutes_between(self.epoch_jd, (jd, fr)))
    }

    /// Propagate to `tsince` minutes from the element set epoch (negative values go backward).
    ///
    /// Return
    /// ----------
    /// * the TEME state vector, or
    /// * `DegenerateOrbit` when the mean or perturbed eccentricity leaves [0, 1) or the
    ///   semilatus rectum becomes negative,
    /// * `Decayed` when the perigee or the osculating radius falls below one Earth radius. The
    ///   eccentricity check runs first, so a decaying orbit may be reported as `DegenerateOrbit`.
    pub fn propagate_minutes(&self, tsince: f64) -> Result<StateVector, PropagationError> {
        let GravityConstants {
            radius, xke, j2, ..
        } = self.gravity;
        let NearEarthTerms {
            isimp,
            mut aycof,
            mut con41,
            cc1,
            cc4,
            cc5,
            d2,
            d3,
            d4,
            delmo,
            eta,
            omgcof,
            sinmao,
            t2cof,
            t3cof,
            t4cof,
            t5cof,
            mut x1mth2,
            mut x7thm1,
            mut xlcof,
            xmcof,
            nodecf,
        } = self.terms;
        let MeanElements {
            ecco,
            inclo,
            nodeo,
            argpo,
            mo,
            no_unkozai: no,
            bstar,
        } = self.elements;
        let t = tsince;

        // Secular gravity and atmospheric drag
        let xmdf = mo + self.rates.mdot * t;
        let argpdf = argpo + self.rates.argpdot * t;
        let nodedf = nodeo + self.rates.nodedot * t;
        let t2 = t * t;
        let mut argpm = argpdf;
        let mut mm = xmdf;
        let nodem = nodedf + nodecf * t2;
        let mut tempa = 1.0 - cc1 * t;
        let mut tempe = bstar * cc4 * t;
        let mut templ = t2cof * t2;

        if !isimp {
            let delomg = omgcof * t;
            let delm = xmcof * ((1.0 + eta * xmdf.cos()).powi(3) - delmo);
            let temp = delomg + delm;
            mm = xmdf + temp;
            argpm = argpdf - temp;
            let t3 = t2 * t;
            let t4 = t3 * t;
            tempa -= d2 * t2 + d3 * t3 + d4 * t4;
            tempe += bstar * cc5 * (mm.sin() - sinmao);
            templ += t3cof * t3 + t4 * (t4cof + t * t5cof);
        }

        let mut state = MeanState {
            em: ecco,
            inclm: inclo,
            nodem,
            argpm,
            mm,
            nm: no,
        };
        if let Some(deep_space) = &self.deep_space {
            deep_space.secular(t, &mut state);
        }

        if !(state.nm > 0.0) {
            return Err(PropagationError::DegenerateOrbit);
        }

        let am = (xke / state.nm).powf(X2O3) * tempa * tempa;
        let nm = xke / am.powf(1.5);
        let mut em = state.em - tempe;

        if !(-0.001..1.0).contains(&em) {
            return Err(PropagationError::DegenerateOrbit);
        }
        em = em.max(1.0e-6);
        if am * (1.0 - em) < 1.0 {
            return Err(PropagationError::Decayed);
        }

        let mm = state.mm + no * templ;
        let xlm = fmod2p(mm + state.argpm + state.nodem);
        let nodem = fmod2p(state.nodem);
        let argpm = fmod2p(state.argpm);
        let mm = fmod2p(xlm - argpm - nodem);

        let mut p = PerturbedElements {
            ep: em,
            inclp: state.inclm,
            nodep: nodem,
            argpp: argpm,
            mp: mm,
        };

        // Lunar-solar periodics
        if let Some(deep_space) = &self.deep_space {
            deep_space.periodics(t, &mut p);
            if p.inclp < 0.0 {
                p.inclp = -p.inclp;
                p.nodep += PI;
                p.argpp -= PI;
            }
            if !(0.0..=1.0).contains(&p.ep) {
                return Err(PropagationError::DegenerateOrbit);
            }
        }
        let (sinip, cosip) = p.inclp.sin_cos();
        if self.deep_space.is_some() {
            (xlcof, aycof) = j3_coefficients(self.gravity.j3oj2, sinip, cosip);
            let cosisq = cosip * cosip;
            con41 = 3.0 * cosisq - 1.0;
            x1mth2 = 1.0 - cosisq;
            x7thm1 = 7.0 * cosisq - 1.0;
        }

        // Long-period periodics and Kepler's equation
        let axnl = p.ep * p.argpp.cos();
        let temp = 1.0 / (am * (1.0 - p.ep * p.ep));
        let aynl = p.ep * p.argpp.sin() + temp * aycof;
        let xl = p.mp + p.argpp + p.nodep + temp * xlcof * axnl;

        let u = fmod2p(xl - p.nodep);
        let eo1 = solve_kepler_sgp4(u, axnl, aynl);
        let (sineo1, coseo1) = eo1.sin_cos();

        // Short-period preliminary quantities
        let ecose = axnl * coseo1 + aynl * sineo1;
        let esine = axnl * sineo1 - aynl * coseo1;
        let el2 = axnl * axnl + aynl * aynl;
        let pl = am * (1.0 - el2);
        if !(pl >= 0.0) {
            return Err(PropagationError::DegenerateOrbit);
        }

        let rl = am * (1.0 - ecose);
        let rdotl = am.sqrt() * esine / rl;
        let rvdotl = pl.sqrt() / rl;
        let betal = (1.0 - el2).sqrt();
        let temp = esine / (1.0 + betal);
        let sinu = am / rl * (sineo1 - aynl - axnl * temp);
        let cosu = am / rl * (coseo1 - axnl + aynl * temp);
        let su = sinu.atan2(cosu);
        let sin2u = (cosu + cosu) * sinu;
        let cos2u = 1.0 - 2.0 * sinu * sinu;
        let temp = 1.0 / pl;
        let temp1 = 0.5 * j2 * temp;
        let temp2 = temp1 * temp;

        // Short-period periodics
        let mrt = rl * (1.0 - 1.5 * temp2 * betal * con41) + 0.5 * temp1 * x1mth2 * cos2u;
        let su = su - 0.25 * temp2 * x7thm1 * sin2u;
        let xnode = p.nodep + 1.5 * temp2 * cosip * sin2u;
        let xinc = p.inclp + 1.5 * temp2 * cosip * sinip * cos2u;
        let mvt = rdotl - nm * temp1 * x1mth2 * sin2u / xke;
        let rvdot = rvdotl + nm * temp1 * (x1mth2 * cos2u + 1.5 * con41) / xke;

        if mrt < 1.0 {
            return Err(PropagationError::Decayed);
        }

        // Orientation vectors
        let (sinsu, cossu) = su.sin_cos();
        let (snod, cnod) = xnode.sin_cos();
        let (sini, cosi) = xinc.sin_cos();
        let xmx = -snod * cosi;
        let xmy = cnod * cosi;
        let ux = Vector3::new(xmx * sinsu + cnod * cossu, xmy * sinsu + snod * cossu, sini * sinsu);
        let vx = Vector3::new(xmx * cossu - cnod * sinsu, xmy * cossu - snod * sinsu, sini * cossu);

        let vkmpersec = radius * xke / 60.0;
        let position = ux * (mrt * radius);
        let velocity = (ux * mvt + vx * rvdot) * vkmpersec;

        if !(position.iter().all(|x| x.is_finite()) && velocity.iter().all(|x| x.is_finite())) {
            return Err(PropagationError::DegenerateOrbit);
        }

        Ok(StateVector { position, velocity })
    }
}
