//! # Constants and type definitions for terrasat
//!
//! This module centralizes the **physical constants**, **conversion factors**, and **common type
//! aliases** used by both pipelines of the crate.
//!
//! ## Overview
//!
//! - Time and angle conversions (degrees ↔ radians, days ↔ minutes, JD ↔ MJD)
//! - Earth radius used by the spherical geodetic conversion
//! - Default sampling and tiling parameters
//! - Core type aliases used across the crate
//!
//! The gravity-field constants consumed by SGP4 (WGS72 / WGS84) live in
//! [`crate::propagation::GravityModel`], since they only make sense together.

// -------------------------------------------------------------------------------------------------
// Physical constants and unit conversions
// -------------------------------------------------------------------------------------------------

/// 2π, useful for trigonometric conversions
pub const DPI: f64 = 2. * std::f64::consts::PI;

/// Number of seconds in a Julian day
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Number of minutes in a Julian day
pub const MINUTES_PER_DAY: f64 = 1_440.0;

/// MJD epoch of J2000.0 (2000-01-01 12:00:00 TT)
pub const T2000: f64 = 51544.5;

/// Conversion factor between Julian Date and Modified Julian Date
pub const JDTOMJD: f64 = 2400000.5;

/// Julian Date of 1949-12-31 00:00 UT, origin of the SGP4 "days since 1950" epoch
pub const JD_1950: f64 = 2_433_281.5;

/// Degrees → radians
pub const RADEG: f64 = std::f64::consts::PI / 180.0;

/// Mean spherical Earth radius in kilometers, reference for geodetic altitude
pub const EARTH_MEAN_RADIUS: f64 = 6_371.0;

// -------------------------------------------------------------------------------------------------
// Defaults
// -------------------------------------------------------------------------------------------------

/// Default orbit track span, in minutes (one day)
pub const DEFAULT_TRACK_DURATION_MIN: f64 = MINUTES_PER_DAY;

/// Default orbit track sampling step, in minutes
pub const DEFAULT_TRACK_STEP_MIN: f64 = 10.0;

/// Largest number of epochs a single orbit track may sample (one per second over ~11.6 days)
pub const MAX_TRACK_SAMPLES: usize = 1_000_000;

/// Default square patch edge, in pixels
pub const DEFAULT_PATCH_EDGE: usize = 64;

/// Canonical land-cover categories, in declaration order
pub const DEFAULT_LAND_COVER_CLASSES: [&str; 6] = [
    "Urban",
    "Water bodies",
    "Forest",
    "Agricultural land",
    "Barren land",
    "Cloud cover",
];

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Angle in degrees
pub type Degree = f64;
/// Angle in radians
pub type Radian = f64;
/// Distance in kilometers
pub type Kilometer = f64;
/// Time offset in minutes
pub type Minutes = f64;
/// Julian Date (days)
pub type JulianDate = f64;
/// Modified Julian Date (days)
pub type MJD = f64;
