#![allow(dead_code)]

use approx::assert_relative_eq;
use nalgebra::{Quaternion, Vector3};
use rand::rngs::StdRng;
use rand::Rng;

use impact_locator::frames::SkyPosition;
use impact_locator::samples::{ImpactSample, SampleSet};
use impact_locator::spacecraft::Face;

/// Direction drawn uniformly on the sphere.
pub fn uniform_direction(rng: &mut StdRng) -> SkyPosition {
    let z: f64 = rng.random_range(-1.0..1.0);
    let lon: f64 = rng.random_range(-180.0..180.0);
    SkyPosition::new(z.asin().to_degrees(), lon)
}

/// Random (non-normalized) quaternion with a comfortably large norm.
pub fn random_quaternion(rng: &mut StdRng) -> Quaternion<f64> {
    Quaternion::new(
        rng.random_range(0.5..1.0),
        rng.random_range(-1.0..1.0),
        rng.random_range(-1.0..1.0),
        rng.random_range(-1.0..1.0),
    )
}

/// `n` draws with uniform directions on the given face, local coordinates at the origin.
pub fn uniform_sample_set(rng: &mut StdRng, n: usize, gps: f64, face: Face) -> SampleSet {
    let samples = (0..n)
        .map(|_| {
            ImpactSample::new(
                rng.random_range(1.0..10.0),
                face,
                Vector3::zeros(),
                uniform_direction(rng),
            )
        })
        .collect();
    SampleSet::new(gps - 1000.0, gps, 1, samples)
}

/// Compare two directions, longitudes modulo 360°.
pub fn assert_direction_close(a: &SkyPosition, b: &SkyPosition, epsilon: f64) {
    assert_relative_eq!(a.lat, b.lat, epsilon = epsilon);
    // longitude is ill-defined at the poles
    if a.lat.abs() < 89.9 {
        let dlon = (a.lon - b.lon + 180.0).rem_euclid(360.0) - 180.0;
        assert!(dlon.abs() < epsilon, "lon {} vs {}", a.lon, b.lon);
    }
}
