//! # Constants and type definitions for impact localization
//!
//! This module centralizes the **angular conversion factors**, the **sky-area constant**
//! used by credible-region estimation and the **type aliases** shared by the frame,
//! sky-region and face-unfolding modules.
//!
//! ## Overview
//!
//! - Unit conversions (degrees ↔ radians)
//! - Full-sphere solid angle in square degrees
//! - Time reference points used by the solar ephemeris
//! - Core type aliases (`Degree`, `Radian`, `Meter`, `GpsSeconds`, …)

// -------------------------------------------------------------------------------------------------
// Unit conversions and reference values
// -------------------------------------------------------------------------------------------------

/// 2π, useful for trigonometric conversions
pub const DPI: f64 = 2. * std::f64::consts::PI;

/// Degrees → radians
pub const RADEG: f64 = std::f64::consts::PI / 180.0;

/// Numerical epsilon used for floating-point comparisons
pub const EPS: f64 = 1e-12;

/// Solid angle of the full celestial sphere in square degrees (4π sr, rounded)
pub const SKY_AREA_DEG2: f64 = 41253.0;

/// Largest GPS time magnitude (seconds, about 317 000 years) accepted when building epochs
pub const GPS_SECONDS_MAX: f64 = 1e13;

/// MJD epoch of J2000.0 (2000-01-01 12:00:00 TT)
pub const T2000: f64 = 51544.5;

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Angle in degrees
pub type Degree = f64;
/// Angle in radians
pub type Radian = f64;
/// Distance in meters
pub type Meter = f64;
/// Seconds since the GPS epoch (1980-01-06T00:00:00 UTC)
pub type GpsSeconds = f64;
/// Solid angle in square degrees
pub type SquareDegree = f64;
/// Modified Julian Date (days)
pub type MJD = f64;
