//! # Credible sky regions
//!
//! Turns a cloud of angular samples into a compact localization summary: a centroid, a
//! credible-region area and a density map over an equal-area pixelization of the sphere.
//!
//! ## Algorithm
//!
//! 1. Every sample `(lat, lon)` is assigned a pixel through the [`EqualAreaProjection`]
//!    (HEALPix RING by default) and the pixel occupancy is counted.
//! 2. The cumulative distribution runs over the **pixel index order** of the projection (not
//!    over sorted densities): `cdf[i] = Σ_{j ≤ i} counts[j] / N`.
//! 3. The lower, median and upper pixels are those whose cumulative fraction is nearest to
//!    `(1 − c)/2`, `0.5` and `1 − (1 − c)/2`; ties resolve to the first pixel in index order.
//! 4. `area = 41253 deg² × (upper − lower) / npix`; the centroid is the centre of the median
//!    pixel with its longitude wrapped into `[−180, 180)`.
//!
//! The resulting [`SkyRegion`] is an immutable value; recomputing with another credible level
//! or resolution produces a new region that replaces the previous one on the sample set.

use serde::Serialize;
use tracing::debug;

use crate::constants::{SquareDegree, SKY_AREA_DEG2};
use crate::frames::{Frame, SkyPosition};
use crate::healpix::{EqualAreaProjection, Healpix};
use crate::impact_errors::ImpactError;
use crate::samples::SampleSet;

/// Localization summary of a sample cloud in one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkyRegion {
    pub frame: Frame,
    /// Centre of the median pixel, longitude in `[−180, 180)`.
    pub centroid: SkyPosition,
    /// Credible-region area in square degrees, within `[0, 41253]`.
    pub area: SquareDegree,
    /// Pixel occupancy divided by the number of samples.
    pub density: Vec<f64>,
    pub lower_pixel: usize,
    pub median_pixel: usize,
    pub upper_pixel: usize,
    pub credible_level: f64,
    /// Number of pixels of the projection the region was computed on.
    pub pixel_count: usize,
}

/// Index of the value nearest to `target`, the first one winning ties.
fn nearest_index(cdf: &[f64], target: f64) -> usize {
    cdf.iter()
        .enumerate()
        .fold((0, f64::INFINITY), |(best, best_dist), (i, c)| {
            let dist = (c - target).abs();
            if dist < best_dist {
                (i, dist)
            } else {
                (best, best_dist)
            }
        })
        .0
}

/// Wrap a longitude into `[−180, 180)`.
fn wrap_longitude(lon: f64) -> f64 {
    (lon + 180.0).rem_euclid(360.0) - 180.0
}

/// Credible-region estimator over an equal-area projection.
#[derive(Debug, Clone)]
pub struct SkyRegionEstimator<P = Healpix> {
    projection: P,
    credible_level: f64,
}

impl SkyRegionEstimator<Healpix> {
    /// Estimator over a HEALPix RING grid with `12·nside²` pixels.
    pub fn healpix(nside: u32, credible_level: f64) -> Result<Self, ImpactError> {
        Self::new(Healpix::new(nside)?, credible_level)
    }
}

impl<P: EqualAreaProjection> SkyRegionEstimator<P> {
    /// Errors
    /// ----------
    /// * [`ImpactError::InvalidParameter`] unless `0 < credible_level < 1`.
    pub fn new(projection: P, credible_level: f64) -> Result<Self, ImpactError> {
        if !(credible_level > 0.0 && credible_level < 1.0) {
            return Err(ImpactError::InvalidParameter(format!(
                "credible level must be in (0, 1), got {credible_level}"
            )));
        }
        Ok(SkyRegionEstimator {
            projection,
            credible_level,
        })
    }

    pub fn projection(&self) -> &P {
        &self.projection
    }

    pub fn credible_level(&self) -> f64 {
        self.credible_level
    }

    /// Pixel occupancy of a set of directions.
    pub fn pixel_counts(&self, positions: &[SkyPosition]) -> Vec<u64> {
        let mut counts = vec![0u64; self.projection.pixel_count()];
        for p in positions {
            let pixel = self.projection.angle_to_pixel(p.lon, p.lat);
            if let Some(c) = counts.get_mut(pixel) {
                *c += 1;
            }
        }
        counts
    }

    /// Credible region of a set of directions expressed in `frame`.
    ///
    /// Arguments
    /// -----------------
    /// * `positions`: angular samples (degrees).
    /// * `frame`: frame the samples are expressed in, recorded on the result.
    ///
    /// Return
    /// ----------
    /// * The [`SkyRegion`], or [`ImpactError::EmptyInput`] when `positions` is empty.
    pub fn estimate(&self, positions: &[SkyPosition], frame: Frame) -> Result<SkyRegion, ImpactError> {
        if positions.is_empty() {
            return Err(ImpactError::EmptyInput(format!(
                "no samples to locate in the {frame} frame"
            )));
        }
        let n = positions.len() as f64;
        let npix = self.projection.pixel_count();
        let counts = self.pixel_counts(positions);

        let cdf: Vec<f64> = counts
            .iter()
            .scan(0u64, |acc, c| {
                *acc += c;
                Some(*acc as f64 / n)
            })
            .collect();

        let tail = (1.0 - self.credible_level) / 2.0;
        let lower_pixel = nearest_index(&cdf, tail);
        let upper_pixel = nearest_index(&cdf, 1.0 - tail);
        let median_pixel = nearest_index(&cdf, 0.5);

        let area = SKY_AREA_DEG2 * upper_pixel.saturating_sub(lower_pixel) as f64 / npix as f64;
        let (lon_c, lat_c) = self.projection.pixel_to_angle(median_pixel);

        debug!(
            %frame,
            samples = positions.len(),
            area_deg2 = area,
            lat_c,
            lon_c,
            "sky region estimated"
        );

        Ok(SkyRegion {
            frame,
            centroid: SkyPosition::new(lat_c, wrap_longitude(lon_c)),
            area,
            density: counts.iter().map(|&c| c as f64 / n).collect(),
            lower_pixel,
            median_pixel,
            upper_pixel,
            credible_level: self.credible_level,
            pixel_count: npix,
        })
    }

    /// Compute the sky region of every frame available on `set` and store them on it.
    ///
    /// The SC region is always computed; the Sun and Micro regions only when those frames
    /// have been derived. Previously stored regions of the same frames are replaced.
    pub fn find_sky_angles(&self, set: &mut SampleSet) -> Result<(), ImpactError> {
        for frame in Frame::ALL {
            if !set.has_frame(frame) {
                continue;
            }
            let region = self.estimate(&set.positions(frame)?, frame)?;
            set.set_sky_region(region);
        }
        Ok(())
    }
}

#[cfg(test)]
mod sky_region_test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_nearest_index_first_wins() {
        let cdf = [0.0, 0.25, 0.25, 0.75, 1.0];
        assert_eq!(nearest_index(&cdf, 0.25), 1);
        assert_eq!(nearest_index(&cdf, 0.5), 1);
        assert_eq!(nearest_index(&cdf, 0.9), 4);
    }

    #[test]
    fn test_wrap_longitude() {
        assert_eq!(wrap_longitude(0.0), 0.0);
        assert_eq!(wrap_longitude(180.0), -180.0);
        assert_eq!(wrap_longitude(270.0), -90.0);
        assert_eq!(wrap_longitude(359.0), -1.0);
    }

    #[test]
    fn test_invalid_credible_level() {
        assert!(SkyRegionEstimator::healpix(32, 0.0).is_err());
        assert!(SkyRegionEstimator::healpix(32, 1.0).is_err());
        assert!(SkyRegionEstimator::healpix(32, f64::NAN).is_err());
    }

    #[test]
    fn test_invalid_nside() {
        assert!(SkyRegionEstimator::healpix(0, 0.68).is_err());
        assert!(SkyRegionEstimator::healpix(crate::healpix::NSIDE_MAX + 1, 0.68).is_err());
    }

    #[test]
    fn test_empty_input() {
        let estimator = SkyRegionEstimator::healpix(8, 0.68).unwrap();
        assert!(matches!(
            estimator.estimate(&[], Frame::Sun),
            Err(ImpactError::EmptyInput(_))
        ));
    }

    #[test]
    fn test_single_pixel_cloud() {
        let estimator = SkyRegionEstimator::healpix(16, 0.9).unwrap();
        let positions = vec![SkyPosition::new(20.0, 200.0); 50];
        let region = estimator.estimate(&positions, Frame::Spacecraft).unwrap();
        let pixel = estimator.projection().angle_to_pixel(200.0, 20.0);

        // the cdf is 0 up to the occupied pixel and 1 from it on: the lower bound and the
        // median (tie between 0 and 1) stay on pixel 0
        assert_eq!(region.lower_pixel, 0);
        assert_eq!(region.median_pixel, 0);
        assert_eq!(region.upper_pixel, pixel);
        assert_relative_eq!(
            region.area,
            SKY_AREA_DEG2 * pixel as f64 / 3072.0,
            epsilon = 1e-9
        );
        assert_relative_eq!(region.density[pixel], 1.0);
        assert!(region.centroid.lon >= -180.0 && region.centroid.lon < 180.0);
    }

    #[test]
    fn test_two_clusters_area() {
        let estimator = SkyRegionEstimator::healpix(4, 0.5).unwrap();
        let mut positions = vec![SkyPosition::new(80.0, 10.0); 5];
        positions.extend(vec![SkyPosition::new(-80.0, 10.0); 15]);
        let region = estimator.estimate(&positions, Frame::Micro).unwrap();

        let north = estimator.projection().angle_to_pixel(10.0, 80.0);
        let south = estimator.projection().angle_to_pixel(10.0, -80.0);
        // cdf jumps to 0.25 at the northern pixel and to 1 at the southern one
        assert_eq!(region.lower_pixel, north);
        assert_eq!(region.median_pixel, north);
        assert_eq!(region.upper_pixel, south);
        assert_relative_eq!(
            region.area,
            SKY_AREA_DEG2 * (south - north) as f64 / 192.0,
            epsilon = 1e-9
        );
        assert_eq!(region.pixel_count, 192);
        assert_eq!(region.frame, Frame::Micro);
    }
}
