//! # Two-line element sets
//!
//! Fixed-width decoding of NORAD two-line element sets (TLE) into an [`OrbitalElementSet`].
//!
//! ## Overview
//!
//! ```text
//! ISS (ZARYA)
//! 1 25544U 98067A   08264.51782528 -.00002182  00000-0 -11606-4 0  2927
//! 2 25544  51.6416 247.4627 0006703 130.5360 325.0288 15.72125391563537
//! ```
//!
//! Each data line carries 68 columns of fields followed by a modulo-10 checksum in column 69.
//! Angles are stored in degrees, eccentricity and the drag terms use an implied leading decimal
//! point, and the epoch is a two-digit year followed by a fractional day of year.
//!
//! Parsing is strict on structure (length, line number, checksum, catalog number agreement) and
//! never performs I/O: callers hand in the text they fetched themselves.
//!
//! See also
//! ------------
//! * [`crate::propagation::Sgp4`] – consumes the decoded mean elements.
//! * [`parse_tle_catalog`] – splits a multi-satellite catalog into element sets.
use hifitime::Epoch;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::constants::{Degree, JulianDate};
use crate::time::{day_of_year_to_jd, jd_to_epoch};

/// Minimum number of columns in a TLE data line (68 data columns + checksum)
pub const TLE_LINE_LENGTH: usize = 69;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TleParseError {
    #[error("Line {line} is too short: {len} columns, expected at least 69")]
    TooShortLine { line: u8, len: usize },
    #[error("Line {0} contains non-ASCII characters")]
    NonAsciiLine(u8),
    #[error("Line {line} starts with {found:?}, expected {expected:?}")]
    WrongLineNumber { line: u8, expected: char, found: char },
    #[error("Checksum mismatch on line {line}: column 69 reads {expected}, computed {computed}")]
    ChecksumMismatch { line: u8, expected: u8, computed: u8 },
    #[error("Invalid {field} field: {value:?}")]
    InvalidField { field: &'static str, value: String },
    #[error("Catalog numbers differ between lines: {0} and {1}")]
    CatalogNumberMismatch(String, String),
}

/// Decoded orbital elements of a single satellite, together with the raw lines they come from.
///
/// The values are the *mean* elements as published: they are only meaningful when fed to the
/// SGP4 model, not to a plain two-body propagator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrbitalElementSet {
    /// Free-form display name, not unique
    pub name: String,
    pub line1: String,
    pub line2: String,

    /// NORAD catalog number (kept as text to accept Alpha-5 designations)
    pub catalog_number: String,
    pub classification: char,
    pub international_designator: String,

    /// Full four-digit epoch year
    pub epoch_year: i32,
    /// Fractional day of year, 1.0 being January 1st at 0h UTC
    pub epoch_day: f64,
    /// Epoch as a Julian date split `(day, fraction)`
    pub epoch_jd: (JulianDate, f64),

    /// First derivative of mean motion / 2 (rev/day²)
    pub mean_motion_dot: f64,
    /// Second derivative of mean motion / 6 (rev/day³)
    pub mean_motion_ddot: f64,
    /// B* drag term (1 / Earth radii)
    pub bstar: f64,
    pub element_set_number: u32,

    pub inclination: Degree,
    pub right_ascension: Degree,
    pub eccentricity: f64,
    pub argument_of_perigee: Degree,
    pub mean_anomaly: Degree,
    /// Mean motion (rev/day)
    pub mean_motion: f64,
    pub revolution_number: u32,
}

/// Compute the modulo-10 checksum of a TLE line.
///
/// Digits count for their value, a minus sign counts for one, every other character counts for
/// zero. Only the first 68 columns are summed.
pub fn tle_checksum(line: &str) -> u8 {
    let sum: u32 = line
        .bytes()
        .take(TLE_LINE_LENGTH - 1)
        .map(|b| match b {
            b'0'..=b'9' => (b - b'0') as u32,
            b'-' => 1,
            _ => 0,
        })
        .sum();
    (sum % 10) as u8
}

/// Parse a number written with an implied leading decimal point and a signed exponent.
///
/// `" 28098-4"` is `0.28098e-4`, `"-11606-4"` is `-0.11606e-4`, `" 00000-0"` is zero.
fn parse_implied_exponent(field: &'static str, raw: &str) -> Result<f64, TleParseError> {
    let invalid = || TleParseError::InvalidField {
        field,
        value: raw.to_string(),
    };

    let s = raw.trim();
    if s.is_empty() {
        return Ok(0.0);
    }

    let (sign, rest) = match s.as_bytes()[0] {
        b'-' => (-1.0, &s[1..]),
        b'+' => (1.0, &s[1..]),
        _ => (1.0, s),
    };
    if rest.len() < 2 {
        return Err(invalid());
    }

    let (mantissa, exponent) = rest.split_at(rest.len() - 2);
    let mantissa = mantissa.trim();
    if !mantissa.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let mantissa = if mantissa.is_empty() {
        0.0
    } else {
        format!("0.{mantissa}").parse::<f64>().map_err(|_| invalid())?
    };
    let exponent = exponent.trim().parse::<i32>().map_err(|_| invalid())?;

    Ok(sign * mantissa * 10f64.powi(exponent))
}

fn parse_f64(field: &'static str, raw: &str) -> Result<f64, TleParseError> {
    let value = raw
        .trim()
        .parse::<f64>()
        .map_err(|_| TleParseError::InvalidField {
            field,
            value: raw.to_string(),
        })?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(TleParseError::InvalidField {
            field,
            value: raw.to_string(),
        })
    }
}

fn parse_u32(field: &'static str, raw: &str) -> Result<u32, TleParseError> {
    let s = raw.trim();
    if s.is_empty() {
        return Ok(0);
    }
    s.parse::<u32>().map_err(|_| TleParseError::InvalidField {
        field,
        value: raw.to_string(),
    })
}

/// Length, character set, line number and checksum checks shared by both lines.
fn validate_line(line: &str, number: u8) -> Result<(), TleParseError> {
    if !line.is_ascii() {
        return Err(TleParseError::NonAsciiLine(number));
    }
    if line.len() < TLE_LINE_LENGTH {
        return Err(TleParseError::TooShortLine {
            line: number,
            len: line.len(),
        });
    }

    let expected_tag = (b'0' + number) as char;
    let found = line.as_bytes()[0] as char;
    if found != expected_tag {
        return Err(TleParseError::WrongLineNumber {
            line: number,
            expected: expected_tag,
            found,
        });
    }

    let check_col = line.as_bytes()[TLE_LINE_LENGTH - 1];
    if !check_col.is_ascii_digit() {
        return Err(TleParseError::InvalidField {
            field: "checksum",
            value: (check_col as char).to_string(),
        });
    }
    let expected = check_col - b'0';
    let computed = tle_checksum(line);
    if expected != computed {
        return Err(TleParseError::ChecksumMismatch {
            line: number,
            expected,
            computed,
        });
    }
    Ok(())
}

impl OrbitalElementSet {
    /// Decode a two-line element set.
    ///
    /// Arguments
    /// -----------------
    /// * `name`: display name of the satellite, stored as given (trimmed)
    /// * `line1`, `line2`: the two data lines; trailing whitespace is ignored
    ///
    /// Return
    /// ----------
    /// * the decoded element set, or the first structural / field error encountered
    pub fn from_lines(name: &str, line1: &str, line2: &str) -> Result<Self, TleParseError> {
        let line1 = line1.trim_end();
        let line2 = line2.trim_end();

        validate_line(line1, 1)?;
        validate_line(line2, 2)?;

        let catalog_number = line1[2..7].trim().to_string();
        let catalog_number_2 = line2[2..7].trim();
        if catalog_number != catalog_number_2 {
            return Err(TleParseError::CatalogNumberMismatch(
                catalog_number,
                catalog_number_2.to_string(),
            ));
        }

        let two_digit_year = parse_u32("epoch year", &line1[18..20])? as i32;
        let epoch_year = if two_digit_year < 57 {
            2000 + two_digit_year
        } else {
            1900 + two_digit_year
        };
        let epoch_day = parse_f64("epoch day", &line1[20..32])?;
        if !(1.0..367.0).contains(&epoch_day) {
            return Err(TleParseError::InvalidField {
                field: "epoch day",
                value: line1[20..32].to_string(),
            });
        }

        let eccentricity_raw = line2[26..33].trim();
        if eccentricity_raw.is_empty() || !eccentricity_raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(TleParseError::InvalidField {
                field: "eccentricity",
                value: line2[26..33].to_string(),
            });
        }
        let eccentricity = parse_f64("eccentricity", &format!("0.{eccentricity_raw}"))?;

        Ok(OrbitalElementSet {
            name: name.trim().to_string(),
            line1: line1.to_string(),
            line2: line2.to_string(),
            catalog_number,
            classification: line1.as_bytes()[7] as char,
            international_designator: line1[9..17].trim().to_string(),
            epoch_year,
            epoch_day,
            epoch_jd: day_of_year_to_jd(epoch_year, epoch_day),
            mean_motion_dot: parse_f64("mean motion derivative", &line1[33..43])?,
            mean_motion_ddot: parse_implied_exponent("mean motion second derivative", &line1[44..52])?,
            bstar: parse_implied_exponent("bstar", &line1[53..61])?,
            element_set_number: parse_u32("element set number", &line1[64..68])?,
            inclination: parse_f64("inclination", &line2[8..16])?,
            right_ascension: parse_f64("right ascension", &line2[17..25])?,
            eccentricity,
            argument_of_perigee: parse_f64("argument of perigee", &line2[34..42])?,
            mean_anomaly: parse_f64("mean anomaly", &line2[43..51])?,
            mean_motion: parse_f64("mean motion", &line2[52..63])?,
            revolution_number: parse_u32("revolution number", &line2[63..68])?,
        })
    }

    /// Epoch of the element set as a UTC [`Epoch`].
    pub fn epoch(&self) -> Epoch {
        jd_to_epoch(self.epoch_jd.0, self.epoch_jd.1)
    }

    /// Nominal orbital period in minutes, from the published mean motion.
    pub fn period_minutes(&self) -> f64 {
        crate::constants::MINUTES_PER_DAY / self.mean_motion
    }
}

/// Split a three-line catalog (name, line 1, line 2) into element sets.
///
/// Blank lines are dropped first; the remaining lines are consumed three at a time. A block that
/// fails to decode (short line, bad checksum, ...) is skipped and counted, and a trailing
/// incomplete block is counted as skipped too.
///
/// Return
/// ----------
/// * the decoded element sets in catalog order, and the number of skipped blocks
pub fn parse_tle_catalog(text: &str) -> (Vec<OrbitalElementSet>, usize) {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    let mut sets = Vec::with_capacity(lines.len() / 3);
    let mut skipped = 0;

    for block in lines.chunks(3) {
        match block {
            [name, line1, line2] => match OrbitalElementSet::from_lines(name, line1, line2) {
                Ok(set) => sets.push(set),
                Err(err) => {
                    debug!(satellite = %name, error = %err, "skipping catalog entry");
                    skipped += 1;
                }
            },
            _ => {
                debug!(lines = block.len(), "skipping incomplete trailing catalog entry");
                skipped += 1;
            }
        }
    }

    (sets, skipped)
}

#[cfg(test)]
mod tle_test {
    use super::*;
    use approx::assert_relative_eq;

    const VANGUARD_L1: &str =
        "1 00005U 58002B   00179.78495062  .00000023  00000-0  28098-4 0  4753";
    const VANGUARD_L2: &str =
        "2 00005  34.2682 348.7242 1859667 331.7664  19.3264 10.82419157413667";

    const ISS_L1: &str = "1 25544U 98067A   08264.51782528 -.00002182  00000-0 -11606-4 0  2927";
    const ISS_L2: &str = "2 25544  51.6416 247.4627 0006703 130.5360 325.0288 15.72125391563537";

    #[test]
    fn test_checksum() {
        assert_eq!(tle_checksum(VANGUARD_L1), 3);
        assert_eq!(tle_checksum(VANGUARD_L2), 7);
        assert_eq!(tle_checksum(ISS_L1), 7);
        assert_eq!(tle_checksum(ISS_L2), 7);
    }

    #[test]
    fn test_parse_vanguard() {
        let tle = OrbitalElementSet::from_lines("VANGUARD 1", VANGUARD_L1, VANGUARD_L2).unwrap();

        assert_eq!(tle.name, "VANGUARD 1");
        assert_eq!(tle.catalog_number, "00005");
        assert_eq!(tle.classification, 'U');
        assert_eq!(tle.international_designator, "58002B");
        assert_eq!(tle.epoch_year, 2000);
        assert_relative_eq!(tle.epoch_day, 179.78495062);
        assert_eq!(tle.epoch_jd.0, 2451722.5);
        assert_relative_eq!(tle.epoch_jd.1, 0.78495062, epsilon = 1e-12);
        assert_relative_eq!(tle.mean_motion_dot, 0.00000023);
        assert_eq!(tle.mean_motion_ddot, 0.0);
        assert_relative_eq!(tle.bstar, 0.28098e-4, epsilon = 1e-15);
        assert_eq!(tle.element_set_number, 475);
        assert_relative_eq!(tle.inclination, 34.2682);
        assert_relative_eq!(tle.right_ascension, 348.7242);
        assert_relative_eq!(tle.eccentricity, 0.1859667);
        assert_relative_eq!(tle.argument_of_perigee, 331.7664);
        assert_relative_eq!(tle.mean_anomaly, 19.3264);
        assert_relative_eq!(tle.mean_motion, 10.82419157);
        assert_eq!(tle.revolution_number, 41366);
    }

    #[test]
    fn test_parse_negative_drag_and_old_epoch() {
        let tle = OrbitalElementSet::from_lines("ISS (ZARYA)", ISS_L1, ISS_L2).unwrap();
        assert_eq!(tle.epoch_year, 2008);
        assert_relative_eq!(tle.mean_motion_dot, -0.00002182);
        assert_relative_eq!(tle.bstar, -0.11606e-4, epsilon = 1e-15);
        assert_relative_eq!(tle.period_minutes(), 1440.0 / 15.72125391, epsilon = 1e-9);
    }

    #[test]
    fn test_implied_exponent() {
        assert_eq!(parse_implied_exponent("bstar", " 00000-0"), Ok(0.0));
        assert_eq!(parse_implied_exponent("bstar", "        "), Ok(0.0));
        assert_relative_eq!(
            parse_implied_exponent("bstar", " 12345+1").unwrap(),
            1.2345,
            epsilon = 1e-15
        );
        assert!(parse_implied_exponent("bstar", " 1a345-1").is_err());
        assert!(parse_implied_exponent("bstar", "-").is_err());
    }

    #[test]
    fn test_short_line_rejected() {
        let err = OrbitalElementSet::from_lines("X", &VANGUARD_L1[..60], VANGUARD_L2).unwrap_err();
        assert_eq!(err, TleParseError::TooShortLine { line: 1, len: 60 });
    }

    #[test]
    fn test_checksum_mismatch_rejected() {
        let corrupted = VANGUARD_L2.replace("34.2682", "34.2683");
        let err = OrbitalElementSet::from_lines("X", VANGUARD_L1, &corrupted).unwrap_err();
        assert_eq!(
            err,
            TleParseError::ChecksumMismatch {
                line: 2,
                expected: 7,
                computed: 8
            }
        );
    }

    #[test]
    fn test_swapped_lines_rejected() {
        let err = OrbitalElementSet::from_lines("X", VANGUARD_L2, VANGUARD_L1).unwrap_err();
        assert_eq!(
            err,
            TleParseError::WrongLineNumber {
                line: 1,
                expected: '1',
                found: '2'
            }
        );
    }

    #[test]
    fn test_catalog_number_mismatch() {
        let err = OrbitalElementSet::from_lines("X", VANGUARD_L1, ISS_L2).unwrap_err();
        assert_eq!(
            err,
            TleParseError::CatalogNumberMismatch("00005".into(), "25544".into())
        );
    }

    #[test]
    fn test_parse_catalog_skips_bad_entries() {
        let catalog = format!(
            "VANGUARD 1\n{VANGUARD_L1}\n{VANGUARD_L2}\n\nBROKEN\n{}\n{ISS_L2}\nISS (ZARYA)  \r\n{ISS_L1}\r\n{ISS_L2}\r\nDANGLING\n{ISS_L1}\n",
            &ISS_L1[..50]
        );
        let (sets, skipped) = parse_tle_catalog(&catalog);

        assert_eq!(skipped, 2);
        let names: Vec<&str> = sets.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["VANGUARD 1", "ISS (ZARYA)"]);
    }
}
