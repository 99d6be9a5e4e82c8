//! Deep-space (SDP4) terms: lunar-solar perturbations and geopotential resonances.
//!
//! Orbits with a period of 225 minutes or more feel the Sun and the Moon strongly enough that
//! SGP4 adds three groups of corrections:
//!
//! * secular drifts of e, i, Ω, ω and M caused by both third bodies,
//! * long-period periodic terms, re-evaluated at every propagation time,
//! * a numerically integrated resonance for 24 h (geosynchronous) and 12 h (Molniya-type)
//!   orbits, where the Earth's tesseral harmonics commensurate with the mean motion.
//!
//! The resonance integrator always restarts from epoch with a fixed 720 min step, so a
//! propagation is a pure function of the initialized terms and the requested time.
use std::f64::consts::PI;

use crate::constants::DPI;
use crate::kepler::fmod2p;

use super::sgp4::{MeanElements, SecularRates};

const ZES: f64 = 0.01675;
const ZEL: f64 = 0.05490;
const ZNS: f64 = 1.19459e-5;
const ZNL: f64 = 1.5835218e-4;
const C1SS: f64 = 2.9864797e-6;
const C1L: f64 = 4.7968065e-7;
const ZSINIS: f64 = 0.39785416;
const ZCOSIS: f64 = 0.91744867;
const ZCOSGS: f64 = 0.1945905;
const ZSINGS: f64 = -0.98088458;

/// Earth rotation rate (rad/min)
const RPTIM: f64 = 4.37526908801129966e-3;

/// Below this inclination (or above π minus it) the node terms are dropped (radians, 3°)
const SMALL_INCLINATION: f64 = 5.2359877e-2;

/// Below this perturbed inclination the periodics are applied through the Lyddane form
const LYDDANE_INCLINATION: f64 = 0.2;

const RESONANCE_STEP: f64 = 720.0;
const RESONANCE_STEP2: f64 = 259_200.0;

const Q22: f64 = 1.7891679e-6;
const Q31: f64 = 2.1460748e-6;
const Q33: f64 = 2.2123015e-7;
const ROOT22: f64 = 1.7891679e-6;
const ROOT32: f64 = 3.7393792e-7;
const ROOT44: f64 = 7.3636953e-9;
const ROOT52: f64 = 1.1428639e-7;
const ROOT54: f64 = 2.1765803e-9;
const FASX2: f64 = 0.13130908;
const FASX4: f64 = 2.8843198;
const FASX6: f64 = 0.37448087;
const G22: f64 = 5.7686396;
const G32: f64 = 0.95240898;
const G44: f64 = 1.8014998;
const G52: f64 = 1.0508330;
const G54: f64 = 4.4108898;

/// Mean elements after secular (and, for deep space, resonance) updates at time `t`.
#[derive(Debug, Clone, Copy)]
pub(super) struct MeanState {
    pub em: f64,
    pub inclm: f64,
    pub nodem: f64,
    pub argpm: f64,
    pub mm: f64,
    pub nm: f64,
}

/// Elements handed to the short-period terms, after the lunar-solar periodics.
#[derive(Debug, Clone, Copy)]
pub(super) struct PerturbedElements {
    pub ep: f64,
    pub inclp: f64,
    pub nodep: f64,
    pub argpp: f64,
    pub mp: f64,
}

/// Direction cosines of a perturbing body's orbit in the equatorial frame.
#[derive(Clone, Copy)]
struct BodyOrientation {
    cos_g: f64,
    sin_g: f64,
    cos_i: f64,
    sin_i: f64,
    cos_h: f64,
    sin_h: f64,
}

/// Satellite orbit quantities shared by the solar and lunar expansions.
#[derive(Clone, Copy)]
struct OrbitGeometry {
    em: f64,
    emsq: f64,
    betasq: f64,
    rtemsq: f64,
    sinim: f64,
    cosim: f64,
    sinomm: f64,
    cosomm: f64,
    xnoi: f64,
}

/// Expansion of the third-body disturbing function for one perturbing body.
#[derive(Debug, Clone, Copy)]
struct ThirdBodyTerms {
    s1: f64,
    s2: f64,
    s3: f64,
    s4: f64,
    s5: f64,
    s6: f64,
    s7: f64,
    z1: f64,
    z2: f64,
    z3: f64,
    z11: f64,
    z12: f64,
    z13: f64,
    z21: f64,
    z22: f64,
    z23: f64,
    z31: f64,
    z32: f64,
    z33: f64,
}

impl ThirdBodyTerms {
    fn new(body: &BodyOrientation, cc: f64, orbit: &OrbitGeometry) -> Self {
        let BodyOrientation {
            cos_g,
            sin_g,
            cos_i,
            sin_i,
            cos_h,
            sin_h,
        } = *body;
        let OrbitGeometry {
            em,
            emsq,
            betasq,
            rtemsq,
            sinim,
            cosim,
            sinomm,
            cosomm,
            xnoi,
        } = *orbit;

        let a1 = cos_g * cos_h + sin_g * cos_i * sin_h;
        let a3 = -sin_g * cos_h + cos_g * cos_i * sin_h;
        let a7 = -cos_g * sin_h + sin_g * cos_i * cos_h;
        let a8 = sin_g * sin_i;
        let a9 = sin_g * sin_h + cos_g * cos_i * cos_h;
        let a10 = cos_g * sin_i;
        let a2 = cosim * a7 + sinim * a8;
        let a4 = cosim * a9 + sinim * a10;
        let a5 = -sinim * a7 + cosim * a8;
        let a6 = -sinim * a9 + cosim * a10;

        let x1 = a1 * cosomm + a2 * sinomm;
        let x2 = a3 * cosomm + a4 * sinomm;
        let x3 = -a1 * sinomm + a2 * cosomm;
        let x4 = -a3 * sinomm + a4 * cosomm;
        let x5 = a5 * sinomm;
        let x6 = a6 * sinomm;
        let x7 = a5 * cosomm;
        let x8 = a6 * cosomm;

        let z31 = 12.0 * x1 * x1 - 3.0 * x3 * x3;
        let z32 = 24.0 * x1 * x2 - 6.0 * x3 * x4;
        let z33 = 12.0 * x2 * x2 - 3.0 * x4 * x4;
        let z1 = 3.0 * (a1 * a1 + a2 * a2) + z31 * emsq;
        let z2 = 6.0 * (a1 * a3 + a2 * a4) + z32 * emsq;
        let z3 = 3.0 * (a3 * a3 + a4 * a4) + z33 * emsq;
        let z11 = -6.0 * a1 * a5 + emsq * (-24.0 * x1 * x7 - 6.0 * x3 * x5);
        let z12 = -6.0 * (a1 * a6 + a3 * a5)
            + emsq * (-24.0 * (x2 * x7 + x1 * x8) - 6.0 * (x3 * x6 + x4 * x5));
        let z13 = -6.0 * a3 * a6 + emsq * (-24.0 * x2 * x8 - 6.0 * x4 * x6);
        let z21 = 6.0 * a2 * a5 + emsq * (24.0 * x1 * x5 - 6.0 * x3 * x7);
        let z22 = 6.0 * (a4 * a5 + a2 * a6)
            + emsq * (24.0 * (x2 * x5 + x1 * x6) - 6.0 * (x4 * x7 + x3 * x8));
        let z23 = 6.0 * a4 * a6 + emsq * (24.0 * x2 * x6 - 6.0 * x4 * x8);

        let s3 = cc * xnoi;
        let s4 = s3 * rtemsq;

        ThirdBodyTerms {
            s1: -15.0 * em * s4,
            s2: -0.5 * s3 / rtemsq,
            s3,
            s4,
            s5: x1 * x3 + x2 * x4,
            s6: x2 * x3 + x1 * x4,
            s7: x2 * x4 - x1 * x3,
            z1: z1 + z1 + betasq * z31,
            z2: z2 + z2 + betasq * z32,
            z3: z3 + z3 + betasq * z33,
            z11,
            z12,
            z13,
            z21,
            z22,
            z23,
            z31,
            z32,
            z33,
        }
    }

    /// Secular rates `(de, di, dm, dω_raw, dΩ_raw)` induced by this body, `n` being the body's
    /// mean motion. The two angular rates still have to be combined with the inclination terms.
    fn secular_rates(&self, n: f64, emsq: f64) -> (f64, f64, f64, f64, f64) {
        (
            self.s1 * n * self.s5,
            self.s2 * n * (self.z11 + self.z13),
            -n * self.s3 * (self.z1 + self.z3 - 14.0 - 6.0 * emsq),
            self.s4 * n * (self.z31 + self.z33 - 6.0),
            -n * self.s2 * (self.z21 + self.z23),
        )
    }
}

/// Offsets produced by one body's long-period periodics at a given time.
#[derive(Debug, Default, Clone, Copy)]
struct PeriodicOffsets {
    e: f64,
    i: f64,
    l: f64,
    gh: f64,
    h: f64,
}

impl std::ops::Add for PeriodicOffsets {
    type Output = PeriodicOffsets;

    fn add(self, rhs: Self) -> Self {
        PeriodicOffsets {
            e: self.e + rhs.e,
            i: self.i + rhs.i,
            l: self.l + rhs.l,
            gh: self.gh + rhs.gh,
            h: self.h + rhs.h,
        }
    }
}

/// Long-period periodic coefficients of one perturbing body.
#[derive(Debug, Clone, Copy)]
struct PeriodicTerms {
    /// Mean anomaly of the body at epoch (rad)
    zmo: f64,
    /// Mean motion of the body (rad/min)
    zn: f64,
    /// Eccentricity of the body's apparent orbit
    ze: f64,
    e2: f64,
    e3: f64,
    i2: f64,
    i3: f64,
    l2: f64,
    l3: f64,
    l4: f64,
    gh2: f64,
    gh3: f64,
    gh4: f64,
    h2: f64,
    h3: f64,
}

impl PeriodicTerms {
    fn new(t: &ThirdBodyTerms, emsq: f64, zmo: f64, zn: f64, ze: f64) -> Self {
        PeriodicTerms {
            zmo,
            zn,
            ze,
            e2: 2.0 * t.s1 * t.s6,
            e3: 2.0 * t.s1 * t.s7,
            i2: 2.0 * t.s2 * t.z12,
            i3: 2.0 * t.s2 * (t.z13 - t.z11),
            l2: -2.0 * t.s3 * t.z2,
            l3: -2.0 * t.s3 * (t.z3 - t.z1),
            l4: -2.0 * t.s3 * (-21.0 - 9.0 * emsq) * ze,
            gh2: 2.0 * t.s4 * t.z32,
            gh3: 2.0 * t.s4 * (t.z33 - t.z31),
            gh4: -18.0 * t.s4 * ze,
            h2: -2.0 * t.s2 * t.z22,
            h3: -2.0 * t.s2 * (t.z23 - t.z21),
        }
    }

    fn offsets(&self, t: f64) -> PeriodicOffsets {
        let zm = self.zmo + self.zn * t;
        let zf = zm + 2.0 * self.ze * zm.sin();
        let (sinzf, coszf) = zf.sin_cos();
        let f2 = 0.5 * sinzf * sinzf - 0.25;
        let f3 = -0.5 * sinzf * coszf;

        PeriodicOffsets {
            e: self.e2 * f2 + self.e3 * f3,
            i: self.i2 * f2 + self.i3 * f3,
            l: self.l2 * f2 + self.l3 * f3 + self.l4 * sinzf,
            gh: self.gh2 * f2 + self.gh3 * f3 + self.gh4 * sinzf,
            h: self.h2 * f2 + self.h3 * f3,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum ResonanceTerms {
    /// One-day period, geosynchronous resonance
    Synchronous { del1: f64, del2: f64, del3: f64 },
    /// Half-day period, eccentric (Molniya-type) resonance
    HalfDay {
        d2201: f64,
        d2211: f64,
        d3210: f64,
        d3222: f64,
        d4410: f64,
        d4422: f64,
        d5220: f64,
        d5232: f64,
        d5421: f64,
        d5433: f64,
    },
}

#[derive(Debug, Clone, Copy)]
struct Resonance {
    terms: ResonanceTerms,
    xlamo: f64,
    xfact: f64,
}

impl Resonance {
    /// Derivatives `(ṅ, λ̇, n̈)` of the resonance integrator at state `(xli, xni)`.
    fn derivatives(&self, xli: f64, xni: f64, xomi: f64) -> (f64, f64, f64) {
        let xldot = xni + self.xfact;
        let (xndt, xnddt) = match self.terms {
            ResonanceTerms::Synchronous { del1, del2, del3 } => (
                del1 * (xli - FASX2).sin()
                    + del2 * (2.0 * (xli - FASX4)).sin()
                    + del3 * (3.0 * (xli - FASX6)).sin(),
                del1 * (xli - FASX2).cos()
                    + 2.0 * del2 * (2.0 * (xli - FASX4)).cos()
                    + 3.0 * del3 * (3.0 * (xli - FASX6)).cos(),
            ),
            ResonanceTerms::HalfDay {
                d2201,
                d2211,
                d3210,
                d3222,
                d4410,
                d4422,
                d5220,
                d5232,
                d5421,
                d5433,
            } => {
                let x2omi = xomi + xomi;
                let x2li = xli + xli;
                (
                    d2201 * (x2omi + xli - G22).sin()
                        + d2211 * (xli - G22).sin()
                        + d3210 * (xomi + xli - G32).sin()
                        + d3222 * (-xomi + xli - G32).sin()
                        + d4410 * (x2omi + x2li - G44).sin()
                        + d4422 * (x2li - G44).sin()
                        + d5220 * (xomi + xli - G52).sin()
                        + d5232 * (-xomi + xli - G52).sin()
                        + d5421 * (xomi + x2li - G54).sin()
                        + d5433 * (-xomi + x2li - G54).sin(),
                    d2201 * (x2omi + xli - G22).cos()
                        + d2211 * (xli - G22).cos()
                        + d3210 * (xomi + xli - G32).cos()
                        + d3222 * (-xomi + xli - G32).cos()
                        + d5220 * (xomi + xli - G52).cos()
                        + d5232 * (-xomi + xli - G52).cos()
                        + 2.0
                            * (d4410 * (x2omi + x2li - G44).cos()
                                + d4422 * (x2li - G44).cos()
                                + d5421 * (xomi + x2li - G54).cos()
                                + d5433 * (-xomi + x2li - G54).cos()),
                )
            }
        };
        (xndt, xldot, xnddt * xldot)
    }
}

/// Deep-space terms computed once at initialization.
#[derive(Debug, Clone)]
pub(super) struct DeepSpace {
    solar: PeriodicTerms,
    lunar: PeriodicTerms,
    dedt: f64,
    didt: f64,
    dmdt: f64,
    dnodt: f64,
    domdt: f64,
    gsto: f64,
    no: f64,
    argpo: f64,
    argpdot: f64,
    resonance: Option<Resonance>,
}

impl DeepSpace {
    /// Initialize the lunar-solar and resonance terms.
    ///
    /// Arguments
    /// -----------------
    /// * `elements`: mean elements at epoch, mean motion already un-Kozai'd
    /// * `rates`: secular rates of M, ω and Ω from the zonal harmonics
    /// * `epoch`: days since 1949-12-31 00:00 UT
    /// * `gsto`: Greenwich sidereal angle at epoch (rad)
    /// * `xke`: gravity constant of the selected model
    pub(super) fn new(
        elements: &MeanElements,
        rates: &SecularRates,
        epoch: f64,
        gsto: f64,
        xke: f64,
    ) -> Self {
        let MeanElements {
            ecco,
            inclo,
            nodeo,
            argpo,
            no_unkozai: no,
            ..
        } = *elements;

        let (snodm, cnodm) = nodeo.sin_cos();
        let (sinomm, cosomm) = argpo.sin_cos();
        let (sinim, cosim) = inclo.sin_cos();
        let emsq = ecco * ecco;
        let betasq = 1.0 - emsq;
        let orbit = OrbitGeometry {
            em: ecco,
            emsq,
            betasq,
            rtemsq: betasq.sqrt(),
            sinim,
            cosim,
            sinomm,
            cosomm,
            xnoi: 1.0 / no,
        };

        // Lunar orbit orientation at epoch
        let day = epoch + 18_261.5;
        let xnodce = fmod2p(4.5236020 - 9.2422029e-4 * day);
        let (stem, ctem) = xnodce.sin_cos();
        let zcosil = 0.91375164 - 0.03568096 * ctem;
        let zsinil = (1.0 - zcosil * zcosil).sqrt();
        let zsinhl = 0.089683511 * stem / zsinil;
        let zcoshl = (1.0 - zsinhl * zsinhl).sqrt();
        let gam = 5.8351514 + 0.0019443680 * day;
        let zx = (0.39785416 * stem / zsinil).atan2(zcoshl * ctem + 0.91744867 * zsinhl * stem);
        let (zsingl, zcosgl) = (gam + zx - xnodce).sin_cos();

        let sun = BodyOrientation {
            cos_g: ZCOSGS,
            sin_g: ZSINGS,
            cos_i: ZCOSIS,
            sin_i: ZSINIS,
            cos_h: cnodm,
            sin_h: snodm,
        };
        let moon = BodyOrientation {
            cos_g: zcosgl,
            sin_g: zsingl,
            cos_i: zcosil,
            sin_i: zsinil,
            cos_h: zcoshl * cnodm + zsinhl * snodm,
            sin_h: snodm * zcoshl - cnodm * zsinhl,
        };
        let solar_terms = ThirdBodyTerms::new(&sun, C1SS, &orbit);
        let lunar_terms = ThirdBodyTerms::new(&moon, C1L, &orbit);

        let zmol = fmod2p(4.7199672 + 0.22997150 * day - gam);
        let zmos = fmod2p(6.2565837 + 0.017201977 * day);
        let solar = PeriodicTerms::new(&solar_terms, emsq, zmos, ZNS, ZES);
        let lunar = PeriodicTerms::new(&lunar_terms, emsq, zmol, ZNL, ZEL);

        // Secular lunar-solar rates
        let (ses, sis, sls, sghs, shs) = solar_terms.secular_rates(ZNS, emsq);
        let (sel, sil, sll, sghl, shl) = lunar_terms.secular_rates(ZNL, emsq);
        let near_equatorial = !(SMALL_INCLINATION..=PI - SMALL_INCLINATION).contains(&inclo);
        let (shs, shl) = if near_equatorial || sinim == 0.0 {
            (0.0, 0.0)
        } else {
            (shs / sinim, shl / sinim)
        };
        let dedt = ses + sel;
        let didt = sis + sil;
        let dmdt = sls + sll;
        let domdt = sghs - cosim * shs + sghl - cosim * shl;
        let dnodt = shs + shl;

        let resonance = Self::resonance(elements, rates, &orbit, gsto, xke, dmdt, domdt, dnodt);

        DeepSpace {
            solar,
            lunar,
            dedt,
            didt,
            dmdt,
            dnodt,
            domdt,
            gsto,
            no,
            argpo,
            argpdot: rates.argpdot,
            resonance,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn resonance(
        elements: &MeanElements,
        rates: &SecularRates,
        orbit: &OrbitGeometry,
        gsto: f64,
        xke: f64,
        dmdt: f64,
        domdt: f64,
        dnodt: f64,
    ) -> Option<Resonance> {
        let nm = elements.no_unkozai;
        let em = elements.ecco;
        let synchronous = nm > 0.0034906585 && nm < 0.0052359877;
        let half_day = (8.26e-3..=9.24e-3).contains(&nm) && em >= 0.5;
        if !synchronous && !half_day {
            return None;
        }

        let OrbitGeometry {
            emsq, sinim, cosim, ..
        } = *orbit;
        let theta = fmod2p(gsto);
        let aonv = (nm / xke).powf(2.0 / 3.0);
        let no = elements.no_unkozai;

        if half_day {
            let cosisq = cosim * cosim;
            let eoc = em * emsq;
            let g201 = -0.306 - (em - 0.64) * 0.440;

            let (g211, g310, g322, g410, g422, g520);
            if em <= 0.65 {
                g211 = 3.616 - 13.2470 * em + 16.2900 * emsq;
                g310 = -19.302 + 117.3900 * em - 228.4190 * emsq + 156.5910 * eoc;
                g322 = -18.9068 + 109.7927 * em - 214.6334 * emsq + 146.5816 * eoc;
                g410 = -41.122 + 242.6940 * em - 471.0940 * emsq + 313.9530 * eoc;
                g422 = -146.407 + 841.8800 * em - 1629.014 * emsq + 1083.4350 * eoc;
                g520 = -532.114 + 3017.977 * em - 5740.032 * emsq + 3708.2760 * eoc;
            } else {
                g211 = -72.099 + 331.819 * em - 508.738 * emsq + 266.724 * eoc;
                g310 = -346.844 + 1582.851 * em - 2415.925 * emsq + 1246.113 * eoc;
                g322 = -342.585 + 1554.908 * em - 2366.899 * emsq + 1215.972 * eoc;
                g410 = -1052.797 + 4758.686 * em - 7193.992 * emsq + 3651.957 * eoc;
                g422 = -3581.690 + 16178.110 * em - 24462.770 * emsq + 12422.520 * eoc;
                g520 = if em > 0.715 {
                    -5149.66 + 29936.92 * em - 54087.36 * emsq + 31324.56 * eoc
                } else {
                    1464.74 - 4664.75 * em + 3763.64 * emsq
                };
            }

            let (g533, g521, g532) = if em < 0.7 {
                (
                    -919.22770 + 4988.61 * em - 9064.77 * emsq + 5542.21 * eoc,
                    -822.71072 + 4568.6173 * em - 8491.4146 * emsq + 5337.524 * eoc,
                    -853.66600 + 4690.25 * em - 8624.77 * emsq + 5341.4 * eoc,
                )
            } else {
                (
                    -37995.78 + 161616.52 * em - 229838.2 * emsq + 109377.94 * eoc,
                    -51752.104 + 218913.95 * em - 309468.16 * emsq + 146349.42 * eoc,
                    -40023.88 + 170470.89 * em - 242699.48 * emsq + 115605.82 * eoc,
                )
            };

            let sini2 = sinim * sinim;
            let f220 = 0.75 * (1.0 + 2.0 * cosim + cosisq);
            let f221 = 1.5 * sini2;
            let f321 = 1.875 * sinim * (1.0 - 2.0 * cosim - 3.0 * cosisq);
            let f322 = -1.875 * sinim * (1.0 + 2.0 * cosim - 3.0 * cosisq);
            let f441 = 35.0 * sini2 * f220;
            let f442 = 39.3750 * sini2 * sini2;
            let f522 = 9.84375
                * sinim
                * (sini2 * (1.0 - 2.0 * cosim - 5.0 * cosisq)
                    + 0.33333333 * (-2.0 + 4.0 * cosim + 6.0 * cosisq));
            let f523 = sinim
                * (4.92187512 * sini2 * (-2.0 - 4.0 * cosim + 10.0 * cosisq)
                    + 6.56250012 * (1.0 + 2.0 * cosim - 3.0 * cosisq));
            let f542 = 29.53125
                * sinim
                * (2.0 - 8.0 * cosim + cosisq * (-12.0 + 8.0 * cosim + 10.0 * cosisq));
            let f543 = 29.53125
                * sinim
                * (-2.0 - 8.0 * cosim + cosisq * (12.0 + 8.0 * cosim - 10.0 * cosisq));

            let xno2 = nm * nm;
            let ainv2 = aonv * aonv;
            let mut temp1 = 3.0 * xno2 * ainv2;
            let mut temp = temp1 * ROOT22;
            let d2201 = temp * f220 * g201;
            let d2211 = temp * f221 * g211;
            temp1 *= aonv;
            temp = temp1 * ROOT32;
            let d3210 = temp * f321 * g310;
            let d3222 = temp * f322 * g322;
            temp1 *= aonv;
            temp = 2.0 * temp1 * ROOT44;
            let d4410 = temp * f441 * g410;
            let d4422 = temp * f442 * g422;
            temp1 *= aonv;
            temp = temp1 * ROOT52;
            let d5220 = temp * f522 * g520;
            let d5232 = temp * f523 * g532;
            temp = 2.0 * temp1 * ROOT54;
            let d5421 = temp * f542 * g521;
            let d5433 = temp * f543 * g533;

            Some(Resonance {
                terms: ResonanceTerms::HalfDay {
                    d2201,
                    d2211,
                    d3210,
                    d3222,
                    d4410,
                    d4422,
                    d5220,
                    d5232,
                    d5421,
                    d5433,
                },
                xlamo: fmod2p(elements.mo + elements.nodeo + elements.nodeo - theta - theta),
                xfact: rates.mdot + dmdt + 2.0 * (rates.nodedot + dnodt - RPTIM) - no,
            })
        } else {
            let g200 = 1.0 + emsq * (-2.5 + 0.8125 * emsq);
            let g310 = 1.0 + 2.0 * emsq;
            let g300 = 1.0 + emsq * (-6.0 + 6.60937 * emsq);
            let f220 = 0.75 * (1.0 + cosim) * (1.0 + cosim);
            let f311 = 0.9375 * sinim * sinim * (1.0 + 3.0 * cosim) - 0.75 * (1.0 + cosim);
            let f330 = 1.875 * (1.0 + cosim).powi(3);
            let del1 = 3.0 * nm * nm * aonv * aonv;
            let xpidot = rates.argpdot + rates.nodedot;

            Some(Resonance {
                terms: ResonanceTerms::Synchronous {
                    del1: del1 * f311 * g310 * Q31 * aonv,
                    del2: 2.0 * del1 * f220 * g200 * Q22,
                    del3: 3.0 * del1 * f330 * g300 * Q33 * aonv,
                },
                xlamo: fmod2p(elements.mo + elements.nodeo + elements.argpo - theta),
                xfact: rates.mdot + xpidot - RPTIM + dmdt + domdt + dnodt - no,
            })
        }
    }

    /// Apply the lunar-solar secular drifts and the resonance integration at `t` minutes.
    pub(super) fn secular(&self, t: f64, state: &mut MeanState) {
        state.em += self.dedt * t;
        state.inclm += self.didt * t;
        state.argpm += self.domdt * t;
        state.nodem += self.dnodt * t;
        state.mm += self.dmdt * t;

        let Some(resonance) = self.resonance else {
            return;
        };

        let theta = fmod2p(self.gsto + t * RPTIM);
        let delt = if t > 0.0 {
            RESONANCE_STEP
        } else {
            -RESONANCE_STEP
        };

        let mut atime = 0.0;
        let mut xli = resonance.xlamo;
        let mut xni = self.no;
        let (xndt, xldot, xnddt, ft) = loop {
            let xomi = self.argpo + self.argpdot * atime;
            let (xndt, xldot, xnddt) = resonance.derivatives(xli, xni, xomi);
            if (t - atime).abs() < RESONANCE_STEP {
                break (xndt, xldot, xnddt, t - atime);
            }
            xli += xldot * delt + xndt * RESONANCE_STEP2;
            xni += xndt * delt + xnddt * RESONANCE_STEP2;
            atime += delt;
        };

        state.nm = xni + xndt * ft + xnddt * ft * ft * 0.5;
        let xl = xli + xldot * ft + xndt * ft * ft * 0.5;
        state.mm = match resonance.terms {
            ResonanceTerms::Synchronous { .. } => xl - state.nodem - state.argpm + theta,
            ResonanceTerms::HalfDay { .. } => xl - 2.0 * state.nodem + 2.0 * theta,
        };
    }

    /// Apply the lunar-solar long-period periodics at `t` minutes.
    pub(super) fn periodics(&self, t: f64, p: &mut PerturbedElements) {
        let PeriodicOffsets { e, i, l, gh, h } = self.solar.offsets(t) + self.lunar.offsets(t);

        p.inclp += i;
        p.ep += e;
        let (sinip, cosip) = p.inclp.sin_cos();

        if p.inclp >= LYDDANE_INCLINATION {
            let ph = h / sinip;
            p.argpp += gh - cosip * ph;
            p.nodep += ph;
            p.mp += l;
        } else {
            let (sinop, cosop) = p.nodep.sin_cos();
            let alfdp = sinip * sinop + (h * cosop + i * cosip * sinop);
            let betdp = sinip * cosop + (-h * sinop + i * cosip * cosop);

            let xnoh = fmod2p(p.nodep);
            let xls = p.mp + p.argpp + l + gh + (cosip - i * sinip) * xnoh;
            let mut nodep = alfdp.atan2(betdp);
            if (xnoh - nodep).abs() > PI {
                if nodep < xnoh {
                    nodep += DPI;
                } else {
                    nodep -= DPI;
                }
            }

            p.nodep = nodep;
            p.mp += l;
            p.argpp = xls - p.mp - cosip * nodep;
        }
    }
}
