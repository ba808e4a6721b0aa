use hifitime::Epoch;
use nalgebra::{Rotation3, Vector3};

use crate::constants::{Degree, GpsSeconds, GPS_SECONDS_MAX, MJD, RADEG, T2000};
use crate::impact_errors::ImpactError;

/// Source of the apparent geocentric direction of the Sun.
pub trait SolarEphemeris {
    /// Right ascension and declination of the Sun (degrees, J2000 equatorial axes) at `gps`.
    ///
    /// Errors
    /// ----------
    /// * [`ImpactError::EphemerisLookupMiss`] when the ephemeris cannot answer for this epoch.
    fn sun_direction(&self, gps: GpsSeconds) -> Result<(Degree, Degree), ImpactError>;
}

/// Epoch of a GPS time given in seconds since 1980-01-06.
///
/// Errors
/// ----------
/// * [`ImpactError::InvalidEpoch`] for non-finite times or `|gps| > GPS_SECONDS_MAX`.
pub fn gps_epoch(gps: GpsSeconds) -> Result<Epoch, ImpactError> {
    if !gps.is_finite() || gps.abs() > GPS_SECONDS_MAX {
        return Err(ImpactError::InvalidEpoch(gps));
    }
    Ok(Epoch::from_gpst_seconds(gps))
}

/// Compute the mean obliquity of the ecliptic at a given epoch (IAU 1976 model), in degrees.
///
/// Arguments
/// ---------
/// * `mjd_tt`: Modified Julian Date (TT scale).
///
/// Formula
/// -------
/// ```text
/// ε(t) = ε₀ + ε₁·T + ε₂·T² + ε₃·T³,   T = (mjd - T2000) / 36525
/// ```
/// evaluated with Horner's method, coefficients in arcseconds.
pub fn mean_obliquity(mjd_tt: MJD) -> Degree {
    let ob0 = (23.0 * 3600.0 + 26.0 * 60.0) + 21.448;
    let ob1 = -46.815;
    let ob2 = -0.0006;
    let ob3 = 0.00181;

    let t = (mjd_tt - T2000) / 36525.0;

    (((ob3 * t + ob2) * t + ob1) * t + ob0) / 3600.0
}

/// Rotation taking vectors on the mean equator and equinox of date back to J2000 axes
/// (IAU 1976 precession).
///
/// Formula
/// -------
/// ```text
/// ζ(T) = (0.6406161 + 0.0000839·T + 0.0000050·T²) · T  [deg]
/// z(T) = (0.6406161 + 0.0003041·T + 0.0000051·T²) · T  [deg]
/// θ(T) = (0.5567530 − 0.0001185·T − 0.0000116·T²) · T  [deg]
/// r_J2000 = Rz(−ζ) · Ry(θ) · Rz(−z) · r_date
/// ```
/// with `Rk(α)` the active rotation of angle `α` about axis `k`.
pub fn precession_to_j2000(mjd_tt: MJD) -> Rotation3<f64> {
    let t = (mjd_tt - T2000) / 36525.0;

    let zeta = ((0.0000050 * t + 0.0000839) * t + 0.6406161) * t * RADEG;
    let z = ((0.0000051 * t + 0.0003041) * t + 0.6406161) * t * RADEG;
    let theta = ((-0.0000116 * t - 0.0001185) * t + 0.5567530) * t * RADEG;

    Rotation3::from_axis_angle(&Vector3::z_axis(), -zeta)
        * Rotation3::from_axis_angle(&Vector3::y_axis(), theta)
        * Rotation3::from_axis_angle(&Vector3::z_axis(), -z)
}

/// Analytic solar ephemeris with roughly 0.01° accuracy between 1950 and 2050.
///
/// Uses the low-precision formulae of the *Astronomical Almanac*, which give the direction
/// on the mean equator and equinox of date; the result is then precessed to J2000 axes
/// with [`precession_to_j2000`], the axes of the attitude quaternions:
///
/// ```text
/// n = JD(TT) − 2451545.0
/// L = 280.460° + 0.9856474°·n          (mean longitude)
/// g = 357.528° + 0.9856003°·n          (mean anomaly)
/// λ = L + 1.915°·sin g + 0.020°·sin 2g (ecliptic longitude)
/// α = atan2(cos ε·sin λ, cos λ),  δ = asin(sin ε·sin λ)
/// ```
///
/// GPS seconds are converted to TT through [`hifitime`], which handles the GPS/TAI offset.
#[derive(Debug, Clone, Copy, Default)]
pub struct LowPrecisionSun;

impl LowPrecisionSun {
    /// Ecliptic longitude of the Sun (degrees) at a TT Modified Julian Date.
    pub fn ecliptic_longitude(mjd_tt: MJD) -> Degree {
        let n = mjd_tt - T2000;
        let mean_longitude = 280.460 + 0.9856474 * n;
        let mean_anomaly = (357.528 + 0.9856003 * n) * RADEG;
        (mean_longitude + 1.915 * mean_anomaly.sin() + 0.020 * (2.0 * mean_anomaly).sin())
            .rem_euclid(360.0)
    }
}

impl SolarEphemeris for LowPrecisionSun {
    fn sun_direction(&self, gps: GpsSeconds) -> Result<(Degree, Degree), ImpactError> {
        let mjd_tt = gps_epoch(gps)
            .map_err(|_| ImpactError::EphemerisLookupMiss(gps))?
            .to_mjd_tt_days();

        let lambda = Self::ecliptic_longitude(mjd_tt) * RADEG;
        let eps = mean_obliquity(mjd_tt) * RADEG;

        let of_date = Vector3::new(
            lambda.cos(),
            eps.cos() * lambda.sin(),
            eps.sin() * lambda.sin(),
        );
        let r = precession_to_j2000(mjd_tt) * of_date;

        let ra = r.y.atan2(r.x) / RADEG;
        let dec = r.z.clamp(-1.0, 1.0).asin() / RADEG;
        Ok((ra.rem_euclid(360.0), dec))
    }
}

/// Ephemeris returning the same Sun direction for every epoch.
///
/// Useful when the caller already resolved the Sun position with an external ephemeris,
/// and in tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedSun {
    pub ra: Degree,
    pub dec: Degree,
}

impl SolarEphemeris for FixedSun {
    fn sun_direction(&self, _gps: GpsSeconds) -> Result<(Degree, Degree), ImpactError> {
        Ok((self.ra, self.dec))
    }
}

#[cfg(test)]
mod ephemeris_test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mean_obliquity_j2000() {
        assert_relative_eq!(mean_obliquity(T2000), 23.439291111111, epsilon = 1e-9);
    }

    #[test]
    fn test_sun_at_j2000() {
        let gps = Epoch::from_gregorian_utc_at_noon(2000, 1, 1).to_gpst_seconds();
        let (ra, dec) = LowPrecisionSun.sun_direction(gps).unwrap();
        assert_relative_eq!(ra, 281.29, epsilon = 0.05);
        assert_relative_eq!(dec, -23.03, epsilon = 0.05);
    }

    #[test]
    fn test_precession_identity_at_j2000() {
        let p = precession_to_j2000(T2000);
        assert_relative_eq!(*p.matrix(), nalgebra::Matrix3::identity(), epsilon = 1e-15);
    }

    #[test]
    fn test_precession_of_equinox_2016() {
        // the 2016 equinox of date seen on J2000 axes
        let mjd = 57467.1875;
        let r = precession_to_j2000(mjd) * Vector3::x();
        let ra = r.y.atan2(r.x) / RADEG;
        let dec = r.z.asin() / RADEG;
        assert_relative_eq!(ra, -0.2078, epsilon = 2e-3);
        assert_relative_eq!(dec, -0.0903, epsilon = 2e-3);
        assert_relative_eq!(r.norm(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_sun_near_equinox() {
        // March equinox 2016 (2016-03-20 04:30 UTC): RA = Dec = 0 of date, offset on J2000 axes
        let gps = Epoch::from_gregorian_utc_hms(2016, 3, 20, 4, 30, 0).to_gpst_seconds();
        let (ra, dec) = LowPrecisionSun.sun_direction(gps).unwrap();
        assert_relative_eq!(ra, 359.79, epsilon = 0.02);
        assert_relative_eq!(dec, -0.09, epsilon = 0.02);
    }

    #[test]
    fn test_non_finite_epoch() {
        assert!(matches!(
            LowPrecisionSun.sun_direction(f64::NAN),
            Err(ImpactError::EphemerisLookupMiss(_))
        ));
        assert!(matches!(
            LowPrecisionSun.sun_direction(1e300),
            Err(ImpactError::EphemerisLookupMiss(_))
        ));
    }

    #[test]
    fn test_gps_epoch_bounds() {
        assert!(gps_epoch(1_000_000_000.0).is_ok());
        assert!(gps_epoch(-GPS_SECONDS_MAX).is_ok());
        for gps in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY, 2.0 * GPS_SECONDS_MAX] {
            assert!(matches!(gps_epoch(gps), Err(ImpactError::InvalidEpoch(_))), "{gps}");
        }
    }
}
