//! # Reference-frame transformations
//!
//! Impact directions are sampled in the **spacecraft body frame** (SC). To compare events
//! with micrometeoroid population models they are rotated into Sun-referenced frames:
//!
//! ```text
//!  SC  --(attitude q_sc→eci)-->  ECI  --(q_eci→sun)-->  Sun  --(lon ↦ −lon)-->  Micro
//! ```
//!
//! - **SC**: body-fixed frame of the spacecraft.
//! - **ECI**: Earth-centered inertial (equatorial) frame.
//! - **Sun**: ECI rotated so that +x points towards the Sun.
//! - **Micro**: Sun frame with longitudes negated, the convention of micrometeoroid
//!   population models (direction of orbital motion at −90°, anti-Earth at +90°).
//!
//! Every rotation is a unit-quaternion conjugation `v' = q v q⁻¹`; the inverse path applies
//! the conjugate quaternions in reverse order, so `sun_to_sc(sc_to_sun(x)) == x` up to
//! floating-point error.
//!
//! ## Derived frames on a sample set
//!
//! The Sun and Micro columns of a [`SampleSet`](crate::samples::SampleSet) are **write-once**:
//! [`FrameTransform::sc_to_sun`] and [`FrameTransform::sun_to_micro`] compute them on first
//! use and return the cached values afterwards. Requesting the Micro frame of a set whose
//! Sun frame has not been computed fails with
//! [`ImpactError::MissingPrecondition`](crate::impact_errors::ImpactError::MissingPrecondition).
//!
//! ## See also
//! ------------
//! * [`attitude`] – Attitude series and the [`AttitudeSource`](attitude::AttitudeSource) seam.
//! * [`ephemeris`] – Solar ephemeris and the [`SolarEphemeris`](ephemeris::SolarEphemeris) seam.

pub mod attitude;
pub mod ephemeris;

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use nalgebra::{Quaternion, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::constants::{Degree, GpsSeconds, EPS, RADEG};
use crate::impact_errors::ImpactError;
use crate::samples::SampleSet;

use self::attitude::AttitudeSource;
use self::ephemeris::SolarEphemeris;

/// Angular frames in which sample directions can be expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Frame {
    Spacecraft,
    Sun,
    Micro,
}

impl Frame {
    pub const ALL: [Frame; 3] = [Frame::Spacecraft, Frame::Sun, Frame::Micro];
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Frame::Spacecraft => "spacecraft",
            Frame::Sun => "sun",
            Frame::Micro => "micro",
        };
        write!(f, "{name}")
    }
}

impl FromStr for Frame {
    type Err = ImpactError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sc" | "spacecraft" => Ok(Frame::Spacecraft),
            "sun" => Ok(Frame::Sun),
            "micro" => Ok(Frame::Micro),
            other => Err(ImpactError::InvalidParameter(format!("unknown frame: {other}"))),
        }
    }
}

/// A direction on the sky as latitude/longitude in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkyPosition {
    pub lat: Degree,
    pub lon: Degree,
}

impl SkyPosition {
    pub fn new(lat: Degree, lon: Degree) -> Self {
        SkyPosition { lat, lon }
    }

    /// Unit vector `(cos φ cos λ, cos φ sin λ, sin φ)`.
    pub fn to_unit_vector(&self) -> Vector3<f64> {
        let (lat, lon) = (self.lat * RADEG, self.lon * RADEG);
        Vector3::new(lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin())
    }

    /// Latitude/longitude of a (not necessarily unit) vector, longitude in (−180, 180].
    pub fn from_vector(v: &Vector3<f64>) -> Self {
        let lon = v.y.atan2(v.x) / RADEG;
        let lat = v.z.atan2((v.x * v.x + v.y * v.y).sqrt()) / RADEG;
        SkyPosition { lat, lon }
    }
}

/// Rotate every position by `q` (`v' = q v q⁻¹`).
fn rotate_positions(q: &UnitQuaternion<f64>, positions: &[SkyPosition]) -> Vec<SkyPosition> {
    positions
        .iter()
        .map(|p| SkyPosition::from_vector(&(q * p.to_unit_vector())))
        .collect()
}

/// Quaternion pipeline between the SC, ECI, Sun and Micro frames.
///
/// The transform owns its two external collaborators: an attitude source (SC → ECI) and a
/// solar ephemeris (ECI → Sun). It holds no per-sample state and can be shared between
/// analyses.
#[derive(Debug, Clone)]
pub struct FrameTransform<A, E> {
    attitude: A,
    ephemeris: E,
}

impl<A: AttitudeSource, E: SolarEphemeris> FrameTransform<A, E> {
    pub fn new(attitude: A, ephemeris: E) -> Self {
        FrameTransform {
            attitude,
            ephemeris,
        }
    }

    pub fn attitude(&self) -> &A {
        &self.attitude
    }

    pub fn ephemeris(&self) -> &E {
        &self.ephemeris
    }

    /// Rotation quaternion from ECI to the Sun frame at `gps`.
    ///
    /// With `ŝ` the unit vector towards the Sun (from the ephemeris RA/Dec), the quaternion is
    ///
    /// ```text
    /// q = normalize(1 + x̂·ŝ, ŝ × x̂)
    /// ```
    ///
    /// the minimal rotation that brings `ŝ` onto `+x` (so the Sun frame's +x axis points
    /// sunward; the conjugate carries `+x` onto `ŝ`).
    ///
    /// When the Sun lies along `−x` the construction has zero norm; a half-turn about the
    /// ECI `+z` axis is returned instead, which also maps `ŝ` onto `+x`.
    pub fn eci_to_sun_rotation(&self, gps: GpsSeconds) -> Result<UnitQuaternion<f64>, ImpactError> {
        let (ra, dec) = self.ephemeris.sun_direction(gps)?;
        let sun = SkyPosition::new(dec, ra).to_unit_vector();
        let x = Vector3::x();

        let axis = sun.cross(&x);
        let q = Quaternion::new(1.0 + x.dot(&sun), axis.x, axis.y, axis.z);

        Ok(UnitQuaternion::try_new(q, EPS).unwrap_or_else(|| {
            warn!(gps, ra, dec, "Sun antiparallel to ECI +x, using a half-turn about +z");
            UnitQuaternion::from_axis_angle(&Vector3::z_axis(), PI)
        }))
    }

    /// Rotate SC-frame directions into ECI with the attitude nearest to `gps`.
    pub fn sc_to_eci(
        &self,
        gps: GpsSeconds,
        positions: &[SkyPosition],
    ) -> Result<Vec<SkyPosition>, ImpactError> {
        let q = self.attitude.nearest_quaternion(gps)?;
        Ok(rotate_positions(&q, positions))
    }

    /// Rotate ECI directions back into the SC frame (inverse of [`Self::sc_to_eci`]).
    pub fn eci_to_sc(
        &self,
        gps: GpsSeconds,
        positions: &[SkyPosition],
    ) -> Result<Vec<SkyPosition>, ImpactError> {
        let q = self.attitude.nearest_quaternion(gps)?;
        Ok(rotate_positions(&q.inverse(), positions))
    }

    /// Composite SC → Sun rotation: the attitude rotation first, then ECI → Sun.
    fn sc_to_sun_rotation(&self, gps: GpsSeconds) -> Result<UnitQuaternion<f64>, ImpactError> {
        let q_sc_eci = self.attitude.nearest_quaternion(gps)?;
        let q_eci_sun = self.eci_to_sun_rotation(gps)?;
        Ok(q_eci_sun * q_sc_eci)
    }

    /// Convert SC-frame directions observed at `gps` into the Sun frame.
    pub fn sc_to_sun_positions(
        &self,
        gps: GpsSeconds,
        positions: &[SkyPosition],
    ) -> Result<Vec<SkyPosition>, ImpactError> {
        let q = self.sc_to_sun_rotation(gps)?;
        Ok(rotate_positions(&q, positions))
    }

    /// Convert Sun-frame directions at `gps` back into the SC frame.
    ///
    /// Applies the conjugate of the ECI → Sun rotation, then the conjugate of the attitude.
    pub fn sun_to_sc_positions(
        &self,
        gps: GpsSeconds,
        positions: &[SkyPosition],
    ) -> Result<Vec<SkyPosition>, ImpactError> {
        let q = self.sc_to_sun_rotation(gps)?;
        Ok(rotate_positions(&q.inverse(), positions))
    }

    /// Sun-frame directions of every sample of `set`, computed once and cached on the set.
    pub fn sc_to_sun<'a>(&self, set: &'a SampleSet) -> Result<&'a [SkyPosition], ImpactError> {
        set.sun_frame_or_try_init(|| {
            let positions = self.sc_to_sun_positions(set.gps(), &set.sc_positions())?;
            debug!(gps = set.gps(), samples = positions.len(), "SC → Sun frame computed");
            Ok(positions)
        })
    }

    /// SC-frame directions recovered from the Sun frame of `set`.
    ///
    /// Errors
    /// ----------
    /// * [`ImpactError::MissingPrecondition`] if the Sun frame has not been computed.
    pub fn sun_to_sc(&self, set: &SampleSet) -> Result<Vec<SkyPosition>, ImpactError> {
        let sun = set.positions(Frame::Sun)?;
        self.sun_to_sc_positions(set.gps(), &sun)
    }

    /// Micro-frame directions of `set`, computed once from the Sun frame and cached.
    ///
    /// Errors
    /// ----------
    /// * [`ImpactError::MissingPrecondition`] if the Sun frame has not been computed.
    pub fn sun_to_micro<'a>(&self, set: &'a SampleSet) -> Result<&'a [SkyPosition], ImpactError> {
        let sun = set.positions(Frame::Sun)?;
        set.micro_frame_or_try_init(|| Ok(sun_to_micro_positions(&sun)))
    }
}

/// Micro frame from Sun frame: longitude negated, latitude unchanged.
pub fn sun_to_micro_positions(sun: &[SkyPosition]) -> Vec<SkyPosition> {
    sun.iter().map(|p| SkyPosition::new(p.lat, -p.lon)).collect()
}

#[cfg(test)]
mod frames_test {
    use super::attitude::AttitudeSeries;
    use super::ephemeris::FixedSun;
    use super::*;
    use approx::assert_relative_eq;

    fn identity_attitude() -> AttitudeSeries {
        AttitudeSeries::from_quaternions(vec![(0.0, Quaternion::identity())]).unwrap()
    }

    #[test]
    fn test_sky_position_vector_round_trip() {
        let p = SkyPosition::new(-33.0, 147.0);
        let back = SkyPosition::from_vector(&p.to_unit_vector());
        assert_relative_eq!(back.lat, p.lat, epsilon = 1e-12);
        assert_relative_eq!(back.lon, p.lon, epsilon = 1e-12);
    }

    #[test]
    fn test_sun_lands_on_x_axis() {
        let sun = FixedSun {
            ra: 123.0,
            dec: 17.5,
        };
        let transform = FrameTransform::new(identity_attitude(), sun);
        let q = transform.eci_to_sun_rotation(0.0).unwrap();
        assert_relative_eq!(q.quaternion().norm(), 1.0, epsilon = 1e-9);

        let s = SkyPosition::new(17.5, 123.0).to_unit_vector();
        assert_relative_eq!(q * s, Vector3::x(), epsilon = 1e-12);
    }

    #[test]
    fn test_sun_antiparallel_guard() {
        let transform = FrameTransform::new(identity_attitude(), FixedSun { ra: 180.0, dec: 0.0 });
        let q = transform.eci_to_sun_rotation(0.0).unwrap();
        assert_relative_eq!(q.quaternion().norm(), 1.0, epsilon = 1e-9);
        assert_relative_eq!(q * (-Vector3::x()), Vector3::x(), epsilon = 1e-12);
    }

    #[test]
    fn test_sun_on_x_axis_is_identity() {
        let transform = FrameTransform::new(identity_attitude(), FixedSun { ra: 0.0, dec: 0.0 });
        let q = transform.eci_to_sun_rotation(0.0).unwrap();
        assert_relative_eq!(q.angle(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_sc_eci_inverse() {
        let attitude = AttitudeSeries::from_quaternions(vec![(
            0.0,
            Quaternion::new(0.3, -0.2, 0.9, 0.1),
        )])
        .unwrap();
        let transform = FrameTransform::new(attitude, FixedSun { ra: 0.0, dec: 0.0 });
        let positions = vec![SkyPosition::new(12.0, -170.0), SkyPosition::new(-80.0, 5.0)];
        let eci = transform.sc_to_eci(0.0, &positions).unwrap();
        let back = transform.eci_to_sc(0.0, &eci).unwrap();
        for (a, b) in positions.iter().zip(back.iter()) {
            assert_relative_eq!(a.lat, b.lat, epsilon = 1e-9);
            assert_relative_eq!(a.lon, b.lon, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_micro_negates_longitude() {
        let micro = sun_to_micro_positions(&[SkyPosition::new(10.0, 135.0), SkyPosition::new(-5.0, -20.0)]);
        assert_eq!(micro[0], SkyPosition::new(10.0, -135.0));
        assert_eq!(micro[1], SkyPosition::new(-5.0, 20.0));
    }

    #[test]
    fn test_frame_from_str() {
        assert_eq!("SC".parse::<Frame>().unwrap(), Frame::Spacecraft);
        assert_eq!("micro".parse::<Frame>().unwrap(), Frame::Micro);
        assert!("galactic".parse::<Frame>().is_err());
    }
}
