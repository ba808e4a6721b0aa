//! Micrometeoroid impact localization on an octagonal-prism spacecraft.
//!
//! Posterior draws of an impact ([`samples::SampleSet`]) are rotated from the spacecraft
//! body frame into Sun-referenced frames ([`frames`]), summarized as credible sky regions
//! ([`sky_region`]) and mapped onto the spacecraft surface as per-face density maps
//! ([`unfold`]). [`locator::ImpactLocator`] runs the whole pipeline.

pub mod catalog;
pub mod constants;
pub mod frames;
pub mod healpix;
pub mod impact_errors;
pub mod locator;
pub mod params;
pub mod samples;
pub mod sky_region;
pub mod spacecraft;
pub mod unfold;
