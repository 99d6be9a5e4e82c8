//! # Orbit tracks
//!
//! Sample the ground track of a satellite over a time window.
//!
//! A track is built by stepping a [`hifitime::TimeSeries`] from `start` (inclusive) to
//! `start + duration` (exclusive), propagating the element set with SGP4 at every epoch and
//! converting the TEME position to a [`GeodeticPoint`].
//!
//! Samples where SGP4 fails (decayed satellite, degenerate orbit) are **skipped**: the track only
//! holds successful samples, in chronological order, and [`OrbitTrack::skipped`] reports how many
//! epochs were dropped. With the defaults (1 day, 10 min) a healthy orbit yields 144 points.
//!
//! ```rust
//! use hifitime::Epoch;
//! use terrasat::tle::OrbitalElementSet;
//! use terrasat::track::{sample_with, TrackParams};
//!
//! let tle = OrbitalElementSet::from_lines(
//!     "ISS (ZARYA)",
//!     "1 25544U 98067A   08264.51782528 -.00002182  00000-0 -11606-4 0  2927",
//!     "2 25544  51.6416 247.4627 0006703 130.5360 325.0288 15.72125391563537",
//! ).unwrap();
//!
//! let track = sample_with(&tle, tle.epoch(), &TrackParams::default());
//! assert_eq!(track.len(), 144);
//! ```
use std::fmt;

use hifitime::{Duration, Epoch, TimeSeries};
use rayon::prelude::*;
use serde::{Serialize, Serializer};
use tracing::{debug, instrument};

use crate::constants::{
    Minutes, DEFAULT_TRACK_DURATION_MIN, DEFAULT_TRACK_STEP_MIN, MAX_TRACK_SAMPLES,
};
use crate::geodetic::{GeodeticFrame, GeodeticPoint};
use crate::propagation::{GravityModel, Sgp4};
use crate::terrasat_errors::TerrasatError;
use crate::time::epoch_to_jd;
use crate::tle::OrbitalElementSet;
use crate::validation::{ge0, gt0};

/// Sampling window and conversion options of an orbit track.
///
/// Built through [`TrackParams::builder`], which guarantees a strictly positive step, a
/// non-negative duration and at most [`MAX_TRACK_SAMPLES`] epochs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackParams {
    duration: Duration,
    step: Duration,
    frame: GeodeticFrame,
    gravity: GravityModel,
}

impl TrackParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> TrackParamsBuilder {
        TrackParamsBuilder::new()
    }

    /// Length of the sampling window.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Interval between two samples.
    pub fn step(&self) -> Duration {
        self.step
    }

    pub fn frame(&self) -> GeodeticFrame {
        self.frame
    }

    pub fn gravity(&self) -> GravityModel {
        self.gravity
    }

    /// Number of epochs in the window, i.e. the track length when no sample fails.
    pub fn nominal_samples(&self) -> usize {
        let duration = self.duration.total_nanoseconds();
        let step = self.step.total_nanoseconds();
        if duration <= 0 || step <= 0 {
            return 0;
        }
        usize::try_from((duration + step - 1) / step).unwrap_or(usize::MAX)
    }
}

impl Default for TrackParams {
    fn default() -> Self {
        TrackParams {
            duration: Duration::from_seconds(DEFAULT_TRACK_DURATION_MIN * 60.0),
            step: Duration::from_seconds(DEFAULT_TRACK_STEP_MIN * 60.0),
            frame: GeodeticFrame::default(),
            gravity: GravityModel::default(),
        }
    }
}

/// Window length handed to the builder, kept as given until [`TrackParamsBuilder::build`].
#[derive(Debug, Clone, Copy, PartialEq)]
enum Span {
    Exact(Duration),
    Minutes(Minutes),
}

impl Span {
    /// The span as a non-negative duration, `None` if it is negative or not finite.
    fn to_duration(self) -> Option<Duration> {
        match self {
            Span::Exact(d) => (d.total_nanoseconds() >= 0).then_some(d),
            Span::Minutes(m) => ge0(m).then(|| Duration::from_seconds(m * 60.0)),
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Span::Exact(d) => write!(f, "{d}"),
            Span::Minutes(m) => write!(f, "{m} min"),
        }
    }
}

/// Builder for [`TrackParams`], with validation.
#[derive(Debug, Clone)]
pub struct TrackParamsBuilder {
    duration: Span,
    step: Span,
    frame: GeodeticFrame,
    gravity: GravityModel,
}

impl Default for TrackParamsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackParamsBuilder {
    pub fn new() -> Self {
        Self {
            duration: Span::Minutes(DEFAULT_TRACK_DURATION_MIN),
            step: Span::Minutes(DEFAULT_TRACK_STEP_MIN),
            frame: GeodeticFrame::default(),
            gravity: GravityModel::default(),
        }
    }

    pub fn duration(mut self, v: Duration) -> Self {
        self.duration = Span::Exact(v);
        self
    }
    pub fn duration_minutes(mut self, v: Minutes) -> Self {
        self.duration = Span::Minutes(v);
        self
    }
    pub fn step(mut self, v: Duration) -> Self {
        self.step = Span::Exact(v);
        self
    }
    pub fn step_minutes(mut self, v: Minutes) -> Self {
        self.step = Span::Minutes(v);
        self
    }
    pub fn frame(mut self, v: GeodeticFrame) -> Self {
        self.frame = v;
        self
    }
    pub fn gravity(mut self, v: GravityModel) -> Self {
        self.gravity = v;
        self
    }

    /// Validate and produce the [`TrackParams`].
    ///
    /// Validation rules
    /// -----------------
    /// * `step > 0` (at least one nanosecond) – a null step would never leave the start epoch.
    /// * `duration >= 0` – a null duration gives an empty track.
    /// * minute values are finite.
    /// * the window holds at most [`MAX_TRACK_SAMPLES`] epochs.
    pub fn build(self) -> Result<TrackParams, TerrasatError> {
        let step = match self.step {
            Span::Minutes(m) if !gt0(m) => None,
            span => span.to_duration(),
        }
        .filter(|d| d.total_nanoseconds() > 0)
        .ok_or_else(|| {
            TerrasatError::InvalidParameter(format!(
                "track step must be finite and at least one nanosecond, got {}",
                self.step
            ))
        })?;
        let duration = self.duration.to_duration().ok_or_else(|| {
            TerrasatError::InvalidParameter(format!(
                "track duration must be finite and non-negative, got {}",
                self.duration
            ))
        })?;

        let params = TrackParams {
            duration,
            step,
            frame: self.frame,
            gravity: self.gravity,
        };
        if params.nominal_samples() > MAX_TRACK_SAMPLES {
            return Err(TerrasatError::InvalidParameter(format!(
                "track window of {duration} every {step} exceeds {MAX_TRACK_SAMPLES} samples"
            )));
        }
        Ok(params)
    }
}

impl fmt::Display for TrackParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let duration_min = self.duration.to_seconds() / 60.0;
        let step_min = self.step.to_seconds() / 60.0;

        if f.alternate() {
            const PARAM_COL: usize = 36;
            writeln!(f, "Orbit Track Parameters")?;
            writeln!(f, "----------------------")?;

            macro_rules! line {
                ($fmt:expr, $val:expr, $comment:expr) => {{
                    let s = format!($fmt, $val);
                    let pad = if s.len() < PARAM_COL {
                        " ".repeat(PARAM_COL - s.len())
                    } else {
                        " ".to_string()
                    };
                    writeln!(f, "  {}{}# {}", s, pad, $comment)
                }};
            }

            line!("duration = {:.1} min", duration_min, "Sampling window")?;
            line!("step     = {:.1} min", step_min, "Interval between samples")?;
            line!("samples  = {}", self.nominal_samples(), "Nominal track length")?;
            line!("frame    = {:?}", self.frame, "Geodetic frame")?;
            line!("gravity  = {:?}", self.gravity, "SGP4 gravity model")?;
            Ok(())
        } else {
            write!(
                f,
                "TrackParams(duration={duration_min:.1}min, step={step_min:.1}min, frame={:?}, gravity={:?})",
                self.frame, self.gravity
            )
        }
    }
}

fn serialize_epoch<S: Serializer>(epoch: &Epoch, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(epoch)
}

/// One successful sample of an orbit track.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrackPoint {
    /// UTC epoch of the sample
    #[serde(serialize_with = "serialize_epoch")]
    pub epoch: Epoch,
    #[serde(flatten)]
    pub position: GeodeticPoint,
}

/// Ground track of one satellite, in chronological order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrbitTrack {
    pub name: String,
    pub catalog_number: String,
    pub points: Vec<TrackPoint>,
    /// Number of epochs where propagation failed and no point was recorded
    pub skipped: usize,
}

impl OrbitTrack {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TrackPoint> {
        self.points.iter()
    }
}

impl<'a> IntoIterator for &'a OrbitTrack {
    type Item = &'a TrackPoint;
    type IntoIter = std::slice::Iter<'a, TrackPoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

/// Sample a track over `[start, start + duration)` every `step`, in the inertial frame with
/// WGS72 gravity.
///
/// Return
/// ----------
/// * the track, or `InvalidParameter` if `step` is not strictly positive or `duration` is
///   negative
pub fn sample(
    elements: &OrbitalElementSet,
    start: Epoch,
    duration: Duration,
    step: Duration,
) -> Result<OrbitTrack, TerrasatError> {
    let params = TrackParams::builder()
        .duration(duration)
        .step(step)
        .build()?;
    Ok(sample_with(elements, start, &params))
}

/// Sample a track with validated parameters.
///
/// The element set is initialized once. If the initialization itself fails, the track is empty
/// and every epoch of the window is counted as skipped.
#[instrument(level = "debug", skip_all, fields(satellite = %elements.name))]
pub fn sample_with(elements: &OrbitalElementSet, start: Epoch, params: &TrackParams) -> OrbitTrack {
    let epochs = TimeSeries::exclusive(start, start + params.duration, params.step);

    let mut track = OrbitTrack {
        name: elements.name.clone(),
        catalog_number: elements.catalog_number.clone(),
        points: Vec::with_capacity(params.nominal_samples()),
        skipped: 0,
    };

    let sgp4 = match Sgp4::with_gravity(elements, params.gravity) {
        Ok(sgp4) => sgp4,
        Err(err) => {
            track.skipped = epochs.count();
            debug!(error = %err, skipped = track.skipped, "element set rejected by SGP4");
            return track;
        }
    };

    for epoch in epochs {
        let (jd, fr) = epoch_to_jd(epoch);
        match sgp4.propagate(jd, fr) {
            Ok(state) => track.points.push(TrackPoint {
                epoch,
                position: GeodeticPoint::from_teme(&state.position, epoch, params.frame),
            }),
            Err(err) => {
                debug!(%epoch, error = %err, "skipping track sample");
                track.skipped += 1;
            }
        }
    }

    track
}

/// Sample the tracks of several satellites in parallel, one track per element set, in input
/// order.
#[instrument(level = "debug", skip_all, fields(satellites = elements.len()))]
pub fn sample_constellation(
    elements: &[OrbitalElementSet],
    start: Epoch,
    params: &TrackParams,
) -> Vec<OrbitTrack> {
    elements
        .par_iter()
        .map(|set| sample_with(set, start, params))
        .collect()
}

#[cfg(test)]
mod track_test {
    use super::*;
    use hifitime::Unit;

    fn iss() -> OrbitalElementSet {
        OrbitalElementSet::from_lines(
            "ISS (ZARYA)",
            "1 25544U 98067A   08264.51782528 -.00002182  00000-0 -11606-4 0  2927",
            "2 25544  51.6416 247.4627 0006703 130.5360 325.0288 15.72125391563537",
        )
        .unwrap()
    }

    #[test]
    fn test_default_params() {
        let params = TrackParams::default();
        assert_eq!(params.nominal_samples(), 144);
        assert_eq!(params.frame(), GeodeticFrame::Inertial);
        assert_eq!(params.gravity(), GravityModel::Wgs72);
        assert_eq!(TrackParams::builder().build().unwrap(), params);
    }

    #[test]
    fn test_builder_rejects_bad_window() {
        for step in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                TrackParams::builder().step_minutes(step).build(),
                Err(TerrasatError::InvalidParameter(_))
            ));
        }
        assert!(matches!(
            TrackParams::builder().duration_minutes(-5.0).build(),
            Err(TerrasatError::InvalidParameter(_))
        ));
        let empty = TrackParams::builder().duration_minutes(0.0).build().unwrap();
        assert_eq!(empty.nominal_samples(), 0);
    }

    #[test]
    fn test_builder_caps_sample_count() {
        let err = TrackParams::builder()
            .duration_minutes(1440.0)
            .step_minutes(1e-9)
            .build()
            .unwrap_err();
        assert!(matches!(err, TerrasatError::InvalidParameter(_)));

        assert!(TrackParams::builder()
            .duration(Duration::MAX)
            .step(Duration::from_total_nanoseconds(1))
            .build()
            .is_err());

        let at_limit = TrackParams::builder()
            .duration(Duration::from_seconds(MAX_TRACK_SAMPLES as f64))
            .step(Duration::from_seconds(1.0))
            .build()
            .unwrap();
        assert_eq!(at_limit.nominal_samples(), MAX_TRACK_SAMPLES);

        assert!(TrackParams::builder()
            .duration(Duration::from_seconds(MAX_TRACK_SAMPLES as f64 + 1.0))
            .step(Duration::from_seconds(1.0))
            .build()
            .is_err());
    }

    #[test]
    fn test_builder_keeps_exact_durations() {
        let duration = Duration::from_total_nanoseconds(86_400_000_000_007);
        let step = Duration::from_total_nanoseconds(600_000_000_001);
        let params = TrackParams::builder()
            .duration(duration)
            .step(step)
            .build()
            .unwrap();
        assert_eq!(params.duration(), duration);
        assert_eq!(params.step(), step);

        assert!(TrackParams::builder()
            .step(Duration::from_total_nanoseconds(0))
            .build()
            .is_err());
        assert!(TrackParams::builder()
            .duration(Duration::from_total_nanoseconds(-1))
            .build()
            .is_err());
    }

    #[test]
    fn test_nominal_samples_rounds_up() {
        let params = TrackParams::builder()
            .duration_minutes(95.0)
            .step_minutes(10.0)
            .build()
            .unwrap();
        assert_eq!(params.nominal_samples(), 10);
    }

    #[test]
    fn test_display() {
        let params = TrackParams::default();
        assert_eq!(
            format!("{params}"),
            "TrackParams(duration=1440.0min, step=10.0min, frame=Inertial, gravity=Wgs72)"
        );
        let table = format!("{params:#}");
        assert!(table.starts_with("Orbit Track Parameters"));
        assert!(table.contains("samples  = 144"));
    }

    #[test]
    fn test_one_day_track() {
        let tle = iss();
        let track = sample(&tle, tle.epoch(), Unit::Day * 1, Unit::Minute * 10).unwrap();

        assert_eq!(track.len(), 144);
        assert_eq!(track.skipped, 0);
        assert_eq!(track.name, "ISS (ZARYA)");
        assert!(track
            .points
            .windows(2)
            .all(|w| w[0].epoch < w[1].epoch));
        for p in &track {
            assert!((-90.0..=90.0).contains(&p.position.latitude));
            assert!((-180.0..=180.0).contains(&p.position.longitude));
            assert!((300.0..500.0).contains(&p.position.altitude));
        }
    }

    #[test]
    fn test_uninitializable_elements_give_empty_track() {
        let mut tle = iss();
        tle.mean_motion = -1.0;
        let track = sample_with(&tle, tle.epoch(), &TrackParams::default());
        assert!(track.is_empty());
        assert_eq!(track.skipped, 144);
    }

    #[test]
    fn test_decayed_samples_are_skipped() {
        let mut tle = iss();
        tle.bstar = 0.01;
        let params = TrackParams::builder()
            .duration_minutes(20.0 * 1440.0)
            .step_minutes(1440.0)
            .build()
            .unwrap();
        let track = sample_with(&tle, tle.epoch(), &params);

        assert_eq!(track.len() + track.skipped, 20);
        assert!(track.skipped > 0);
        assert!(!track.is_empty());
    }
}
