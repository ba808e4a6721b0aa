//! # Equal-area spherical pixelization (HEALPix, RING scheme)
//!
//! Sky-region estimation needs a deterministic, equal-area partition of the sphere. This
//! module provides the [`EqualAreaProjection`] contract and its HEALPix implementation in the
//! **RING** ordering: pixels are numbered ring by ring from the north pole to the south pole,
//! each ring ordered by increasing longitude.
//!
//! For a resolution parameter `nside` the sphere holds `12·nside²` pixels of identical area.
//!
//! ## Conventions
//!
//! - Angles are exchanged in **degrees** as `(longitude, latitude)`.
//! - Internally the colatitude θ = 90° − lat is handled through `z = cos θ = sin(lat)`.
//! - The three latitude zones are the north polar cap (`z > 2/3`), the equatorial belt and
//!   the south polar cap (`z < −2/3`).

use std::f64::consts::{FRAC_PI_2, PI};

use crate::constants::{Degree, DPI, RADEG};
use crate::impact_errors::ImpactError;

/// Largest resolution of the HEALPix scheme (`2^29`), keeping pixel indices within 64 bits.
pub const NSIDE_MAX: u32 = 1 << 29;

/// Capability used by the sky-region estimator to bin angular samples.
///
/// Implementations must be deterministic: the same `(lon, lat)` always maps to the same pixel,
/// and `angle_to_pixel` returns an index in `[0, pixel_count())`.
pub trait EqualAreaProjection {
    /// Pixel index containing the direction `(lon, lat)` (degrees).
    fn angle_to_pixel(&self, lon: Degree, lat: Degree) -> usize;

    /// Direction `(lon, lat)` (degrees) of the pixel centre, with `lon ∈ [0, 360)`.
    fn pixel_to_angle(&self, pixel: usize) -> (Degree, Degree);

    /// Total number of pixels on the sphere.
    fn pixel_count(&self) -> usize;
}

/// HEALPix tessellation with RING pixel ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Healpix {
    nside: u32,
}

impl Healpix {
    /// Build a tessellation; any `nside` in `1..=NSIDE_MAX` is valid in RING ordering.
    ///
    /// Errors
    /// ----------
    /// * [`ImpactError::InvalidParameter`] for `nside` outside `1..=NSIDE_MAX`.
    pub fn new(nside: u32) -> Result<Self, ImpactError> {
        if !(1..=NSIDE_MAX).contains(&nside) {
            return Err(ImpactError::InvalidParameter(format!(
                "nside must be in 1..={NSIDE_MAX}, got {nside}"
            )));
        }
        Ok(Healpix { nside })
    }

    pub fn nside(&self) -> u32 {
        self.nside
    }

    /// Number of pixels in both polar caps together: `2·nside·(nside − 1)` per cap.
    fn ncap(&self) -> i64 {
        let n = self.nside as i64;
        2 * n * (n - 1)
    }

    fn npix(&self) -> i64 {
        let n = self.nside as i64;
        12 * n * n
    }

    /// Ring-scheme pixel from `z = cos θ` and longitude `phi` (radians).
    fn zphi_to_pixel(&self, z: f64, phi: f64) -> i64 {
        let n = self.nside as i64;
        let nf = self.nside as f64;
        let za = z.abs();
        // phi in units of π/2, in [0, 4)
        let tt = phi.rem_euclid(DPI) / FRAC_PI_2;

        if za <= 2.0 / 3.0 {
            let temp1 = nf * (0.5 + tt);
            let temp2 = nf * z * 0.75;
            let jp = (temp1 - temp2) as i64;
            let jm = (temp1 + temp2) as i64;

            // ring number counted from z = 2/3, in 1..=2n+1
            let ir = n + 1 + jp - jm;
            let kshift = 1 - (ir & 1);

            let ip = (jp + jm - n + kshift + 1) / 2;
            let ip = ip.rem_euclid(4 * n);

            self.ncap() + (ir - 1) * 4 * n + ip
        } else {
            let tp = tt - tt.floor();
            let tmp = nf * (3.0 * (1.0 - za)).sqrt();

            let jp = (tp * tmp) as i64;
            let jm = ((1.0 - tp) * tmp) as i64;

            // ring number counted from the closest pole
            let ir = jp + jm + 1;
            let ip = ((tt * ir as f64) as i64).rem_euclid(4 * ir);

            if z > 0.0 {
                2 * ir * (ir - 1) + ip
            } else {
                self.npix() - 2 * ir * (ir + 1) + ip
            }
        }
    }

    /// `(z, phi)` of the centre of a ring-scheme pixel.
    fn pixel_to_zphi(&self, pixel: i64) -> (f64, f64) {
        let n = self.nside as i64;
        let nf = self.nside as f64;
        let ncap = self.ncap();
        let npix = self.npix();
        let fact2 = 4.0 / npix as f64;

        if pixel < ncap {
            // north polar cap
            let iring = (1 + isqrt(1 + 2 * pixel)) >> 1;
            let iphi = pixel + 1 - 2 * iring * (iring - 1);
            let z = 1.0 - (iring * iring) as f64 * fact2;
            let phi = (iphi as f64 - 0.5) * FRAC_PI_2 / iring as f64;
            (z, phi)
        } else if pixel < npix - ncap {
            // equatorial belt
            let fact1 = 2.0 * nf * fact2;
            let ip = pixel - ncap;
            let iring = ip / (4 * n) + n;
            let iphi = ip % (4 * n) + 1;
            let fodd = if (iring + n) & 1 != 0 { 1.0 } else { 0.5 };
            let z = (2 * n - iring) as f64 * fact1;
            let phi = (iphi as f64 - fodd) * PI / (2.0 * nf);
            (z, phi)
        } else {
            // south polar cap
            let ip = npix - pixel;
            let iring = (1 + isqrt(2 * ip - 1)) >> 1;
            let iphi = 4 * iring + 1 - (ip - 2 * iring * (iring - 1));
            let z = -1.0 + (iring * iring) as f64 * fact2;
            let phi = (iphi as f64 - 0.5) * FRAC_PI_2 / iring as f64;
            (z, phi)
        }
    }
}

impl EqualAreaProjection for Healpix {
    fn angle_to_pixel(&self, lon: Degree, lat: Degree) -> usize {
        let z = (lat * RADEG).sin().clamp(-1.0, 1.0);
        self.zphi_to_pixel(z, lon * RADEG) as usize
    }

    fn pixel_to_angle(&self, pixel: usize) -> (Degree, Degree) {
        let (z, phi) = self.pixel_to_zphi(pixel as i64);
        let lat = z.clamp(-1.0, 1.0).asin() / RADEG;
        let lon = phi / RADEG;
        (lon, lat)
    }

    fn pixel_count(&self) -> usize {
        self.npix() as usize
    }
}

/// Integer square root, exact for the pixel ranges used here.
fn isqrt(v: i64) -> i64 {
    let mut r = (v as f64).sqrt() as i64;
    while r * r > v {
        r -= 1;
    }
    while (r + 1) * (r + 1) <= v {
        r += 1;
    }
    r
}

#[cfg(test)]
mod healpix_test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_pixel_count() {
        assert_eq!(Healpix::new(1).unwrap().pixel_count(), 12);
        assert_eq!(Healpix::new(32).unwrap().pixel_count(), 12_288);
    }

    #[test]
    fn test_nside_bounds() {
        assert!(matches!(Healpix::new(0), Err(ImpactError::InvalidParameter(_))));
        assert!(matches!(
            Healpix::new(NSIDE_MAX + 1),
            Err(ImpactError::InvalidParameter(_))
        ));
        assert!(matches!(Healpix::new(u32::MAX), Err(ImpactError::InvalidParameter(_))));

        // the largest resolution still indexes the sphere without overflow
        let hp = Healpix::new(NSIDE_MAX).unwrap();
        assert_eq!(hp.pixel_count() as u64, 12 * (NSIDE_MAX as u64).pow(2));
        assert!(hp.angle_to_pixel(0.0, -90.0) >= hp.pixel_count() - 4);
    }

    #[test]
    fn test_poles_and_first_pixels() {
        let hp = Healpix::new(32).unwrap();
        // the north pole sits in the first ring, the south pole in the last one
        assert!(hp.angle_to_pixel(0.0, 90.0) < 4);
        assert!(hp.angle_to_pixel(0.0, -90.0) >= hp.pixel_count() - 4);

        let (lon, lat) = hp.pixel_to_angle(0);
        assert_relative_eq!(lon, 45.0, epsilon = 1e-10);
        assert!(lat > 88.0);
    }

    #[test]
    fn test_pixel_centres_round_trip() {
        for nside in [1, 2, 3, 4, 8, 32] {
            let hp = Healpix::new(nside).unwrap();
            for pix in 0..hp.pixel_count() {
                let (lon, lat) = hp.pixel_to_angle(pix);
                assert!((0.0..360.0).contains(&lon), "lon {lon} out of range");
                assert_eq!(hp.angle_to_pixel(lon, lat), pix, "nside {nside}, pixel {pix}");
            }
        }
    }

    #[test]
    fn test_longitude_wrapping() {
        let hp = Healpix::new(16).unwrap();
        assert_eq!(hp.angle_to_pixel(-90.0, 10.0), hp.angle_to_pixel(270.0, 10.0));
        assert_eq!(hp.angle_to_pixel(-180.0, -45.0), hp.angle_to_pixel(180.0, -45.0));
    }

    #[test]
    fn test_ring_ordering_by_latitude() {
        let hp = Healpix::new(8).unwrap();
        let north = hp.angle_to_pixel(10.0, 60.0);
        let equator = hp.angle_to_pixel(10.0, 0.0);
        let south = hp.angle_to_pixel(10.0, -60.0);
        assert!(north < equator && equator < south);
    }

    #[test]
    fn test_isqrt() {
        assert_eq!(isqrt(0), 0);
        assert_eq!(isqrt(15), 3);
        assert_eq!(isqrt(16), 4);
        assert_eq!(isqrt(1_000_001), 1000);
    }
}
