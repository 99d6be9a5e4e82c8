//! # Terrasat
//!
//! Two independent pipelines over satellite data:
//!
//! * **Orbit tracks**: parse Two-Line Element sets ([`tle`]), propagate them with SGP4/SDP4
//!   ([`propagation`]), convert the TEME positions to geodetic coordinates ([`geodetic`]) and
//!   sample ground tracks over a time window ([`track`]).
//! * **Land cover**: tile RGB imagery into patches ([`imagery`]), classify every patch
//!   ([`classification`]) and aggregate the labels into a percentage distribution
//!   ([`aggregate`]).
//!
//! Parameters of both pipelines can be read from a TOML file ([`config`]). Diagnostics are
//! emitted through [`tracing`]; install a subscriber to see them.
pub mod aggregate;
pub mod classification;
pub mod config;
pub mod constants;
pub mod geodetic;
pub mod imagery;
mod kepler;
pub mod propagation;
pub mod terrasat_errors;
pub mod time;
pub mod tle;
pub mod track;
mod validation;

pub use aggregate::{aggregate, ClassDistribution, ClassShare};
pub use classification::{classify_image, Classifier, LandCoverClasses, PatchClassifier};
pub use config::TerrasatConfig;
pub use geodetic::{GeodeticFrame, GeodeticPoint};
pub use imagery::{tile, ImagePatch, PatchSize};
pub use propagation::{propagate, GravityModel, PropagationError, Sgp4, StateVector};
pub use terrasat_errors::TerrasatError;
pub use tle::{parse_tle_catalog, OrbitalElementSet, TleParseError};
pub use track::{sample, OrbitTrack, TrackParams, TrackPoint};
