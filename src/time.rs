use hifitime::Epoch;

use crate::constants::{JulianDate, DPI, JDTOMJD, MINUTES_PER_DAY, MJD, T2000};
use crate::kepler::principal_angle;

/// Julian date of a Gregorian calendar instant, split into a day part and a fraction of day.
///
/// The day part lands on a half-integer (0h UT), the fraction carries the time of day. Keeping
/// both halves separate preserves the sub-millisecond resolution SGP4 needs, which a single
/// `f64` around 2.4e6 days cannot hold.
///
/// Valid for years 1900 to 2100 (no Gregorian century correction).
///
/// Arguments
/// -----------------
/// * `year`, `month`, `day`: calendar date
/// * `hour`, `minute`: time of day
/// * `second`: seconds of minute, possibly fractional
///
/// Return
/// ----------
/// * `(jd, fr)` such that `jd + fr` is the Julian date
pub fn jday(year: i32, month: u8, day: u8, hour: u8, minute: u8, second: f64) -> (JulianDate, f64) {
    let y = year as f64;
    let m = month as f64;

    let jd = 367.0 * y - (7.0 * (y + ((m + 9.0) / 12.0).floor()) * 0.25).floor()
        + (275.0 * m / 9.0).floor()
        + day as f64
        + 1_721_013.5;
    let fr = (second + minute as f64 * 60.0 + hour as f64 * 3600.0) / 86_400.0;

    (jd, fr)
}

/// Julian date split of a TLE epoch given as year and fractional day of year.
///
/// Day-of-year 1.0 is January 1st at 0h. The fraction of the day is carried over untouched, so
/// no precision is lost in calendar round trips.
pub fn day_of_year_to_jd(year: i32, day_of_year: f64) -> (JulianDate, f64) {
    let (jan1, _) = jday(year, 1, 1, 0, 0, 0.0);
    let whole = day_of_year.floor();
    (jan1 + whole - 1.0, day_of_year - whole)
}

/// Julian date split of a [`Epoch`], read in the UTC time scale.
///
/// The calendar fields are extracted first and fed to [`jday`], which keeps the integer and
/// fractional parts apart instead of going through a single Julian date float.
pub fn epoch_to_jd(epoch: Epoch) -> (JulianDate, f64) {
    let (year, month, day, hour, minute, second, nanos) = epoch.to_gregorian_utc();
    jday(
        year,
        month,
        day,
        hour,
        minute,
        second as f64 + nanos as f64 * 1e-9,
    )
}

/// Build a UTC [`Epoch`] from a Julian date split.
pub fn jd_to_epoch(jd: JulianDate, fr: f64) -> Epoch {
    Epoch::from_jde_utc(jd + fr)
}

/// Minutes elapsed between a reference Julian date split and another one.
///
/// Integer and fractional parts are differenced separately to avoid catastrophic cancellation.
pub fn minutes_between(reference: (JulianDate, f64), target: (JulianDate, f64)) -> f64 {
    (target.0 - reference.0) * MINUTES_PER_DAY + (target.1 - reference.1) * MINUTES_PER_DAY
}

/// Transformation from julian date (JD) to modified julian date (MJD)
pub fn jd_to_mjd(jd: JulianDate) -> MJD {
    jd - JDTOMJD
}

/// Compute the Greenwich Mean Sidereal Time (GMST) in radians
/// for a given Modified Julian Date (UT1 time scale).
///
/// This function implements the IAU 1982 polynomial formula
/// for the mean sidereal time at 0h UT1, plus the fractional-day
/// correction term due to Earth's rotation rate.
///
/// # Arguments
/// * `tjm` - Modified Julian Date (MJD, UT1 time scale)
///
/// # Returns
/// * GMST angle in radians, normalized to the interval [0, 2π).
///
/// # Details
/// The GMST is computed in two steps:
/// 1. Use a cubic polynomial (coefficients C0–C3) to get GMST at 0h UT1
///    in seconds for the given date.
/// 2. Add the contribution of Earth's rotation during the fractional day
///    using the factor `RAP`, which converts solar days to sidereal days.
///
/// UTC is used in place of UT1 throughout the crate; the |UT1 - UTC| < 0.9 s
/// difference is far below the resolution of the spherical geodetic conversion.
pub fn gmst(tjm: MJD) -> f64 {
    // Polynomial coefficients for GMST at 0h UT1 (in seconds)
    const C0: f64 = 24110.54841;
    const C1: f64 = 8640184.812866;
    const C2: f64 = 9.3104e-2;
    const C3: f64 = -6.2e-6;

    // Ratio of sidereal day to solar day
    const RAP: f64 = 1.00273790934;

    let itjm = tjm.floor();
    let t = (itjm - T2000) / 36525.0;

    let gmst0 = (((C3 * t + C2) * t + C1) * t + C0) * DPI / 86400.0;

    let h = (tjm - itjm) * DPI;
    principal_angle(gmst0 + h * RAP)
}

#[cfg(test)]
mod time_test {
    use super::*;
    use approx::assert_relative_eq;
    use hifitime::TimeScale;

    #[test]
    fn test_jday() {
        assert_eq!(jday(2000, 1, 1, 12, 0, 0.0), (2451544.5, 0.5));
        assert_eq!(jday(2021, 1, 1, 0, 0, 0.0), (2459215.5, 0.0));
    }

    #[test]
    fn test_day_of_year_to_jd() {
        let (jd, fr) = day_of_year_to_jd(2000, 179.78495062);
        assert_eq!(jd, 2451722.5);
        assert_relative_eq!(fr, 0.78495062, epsilon = 1e-12);

        let (jd, fr) = day_of_year_to_jd(2021, 1.0);
        assert_eq!((jd, fr), (2459215.5, 0.0));
    }

    #[test]
    fn test_epoch_to_jd() {
        let epoch = Epoch::from_gregorian(2021, 1, 1, 6, 0, 0, 0, TimeScale::UTC);
        let (jd, fr) = epoch_to_jd(epoch);
        assert_eq!(jd, 2459215.5);
        assert_relative_eq!(fr, 0.25, epsilon = 1e-15);

        let back = jd_to_epoch(jd, fr);
        assert_relative_eq!(
            back.to_jde_utc_days(),
            epoch.to_jde_utc_days(),
            epsilon = 1e-8
        );
    }

    #[test]
    fn test_minutes_between() {
        let reference = (2451722.5, 0.78495062);
        assert_eq!(minutes_between(reference, reference), 0.0);
        let later = (2451723.5, 0.03495062);
        assert_relative_eq!(minutes_between(reference, later), 360.0, epsilon = 1e-8);
    }

    #[test]
    fn test_jd_to_mjd() {
        assert_eq!(jd_to_mjd(2459215.5), 59215.0);
    }

    #[test]
    fn test_gmst() {
        let tut = 57028.478514610404;
        let res_gmst = gmst(tut);
        assert_relative_eq!(res_gmst, 4.851925725092499, epsilon = 1e-9);

        let tut = T2000;
        let res_gmst = gmst(tut);
        assert_relative_eq!(res_gmst, 4.894961212789145, epsilon = 1e-9);
    }
}
