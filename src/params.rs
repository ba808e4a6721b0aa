//! # Localization parameters
//!
//! [`LocatorParams`] gathers the tunables of the localization pipeline:
//!
//! - `nside`: HEALPix resolution of the sky-region grid (`12·nside²` pixels),
//! - `credible_level`: probability mass of the credible sky region and of the per-event
//!   credible intervals,
//! - `bins_across_deck`: number of histogram bins spanning the deck width; fixes the common
//!   bin density of every face map,
//! - `face_mode_threshold`: minimum fraction of draws on a face for it to be reported as the
//!   impacted face.
//!
//! ## Example
//!
//! ```rust,no_run
//! use impact_locator::params::LocatorParams;
//!
//! let params = LocatorParams::builder()
//!     .nside(64)
//!     .credible_level(0.9)
//!     .build()
//!     .unwrap();
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::healpix::NSIDE_MAX;
use crate::impact_errors::ImpactError;

/// Configuration of the localization pipeline.
///
/// Notes & Validation
/// -----------------
/// * `1 ≤ nside ≤ NSIDE_MAX` (`2^29`), `bins_across_deck ≥ 1`.
/// * `0 < credible_level < 1`.
/// * `0 ≤ face_mode_threshold ≤ 1`.
///
/// See also
/// -----------------
/// * [`ImpactLocator`](crate::locator::ImpactLocator) – consumes these parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorParams {
    pub nside: u32,
    pub credible_level: f64,
    pub bins_across_deck: usize,
    pub face_mode_threshold: f64,
}

impl LocatorParams {
    pub fn builder() -> LocatorParamsBuilder {
        LocatorParamsBuilder::new()
    }
}

impl Default for LocatorParams {
    fn default() -> Self {
        LocatorParams {
            nside: 32,
            credible_level: 0.68,
            bins_across_deck: 50,
            face_mode_threshold: 0.7,
        }
    }
}

/// Builder for [`LocatorParams`], validated by [`LocatorParamsBuilder::build`].
#[derive(Debug, Clone)]
pub struct LocatorParamsBuilder {
    params: LocatorParams,
}

impl Default for LocatorParamsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LocatorParamsBuilder {
    /// Create a new builder initialized with default values.
    pub fn new() -> Self {
        Self {
            params: LocatorParams::default(),
        }
    }

    pub fn nside(mut self, v: u32) -> Self {
        self.params.nside = v;
        self
    }
    pub fn credible_level(mut self, v: f64) -> Self {
        self.params.credible_level = v;
        self
    }
    pub fn bins_across_deck(mut self, v: usize) -> Self {
        self.params.bins_across_deck = v;
        self
    }
    pub fn face_mode_threshold(mut self, v: f64) -> Self {
        self.params.face_mode_threshold = v;
        self
    }

    /// Validate and return the parameters.
    ///
    /// Errors
    /// ----------
    /// * [`ImpactError::InvalidParameter`] naming the first offending field.
    pub fn build(self) -> Result<LocatorParams, ImpactError> {
        self.params.validate()?;
        Ok(self.params)
    }
}

impl LocatorParams {
    /// Check the invariants listed on [`LocatorParams`]; used for deserialized values too.
    pub fn validate(&self) -> Result<(), ImpactError> {
        if !(1..=NSIDE_MAX).contains(&self.nside) {
            return Err(ImpactError::InvalidParameter(format!(
                "nside must be in 1..={NSIDE_MAX}"
            )));
        }
        if !(self.credible_level > 0.0 && self.credible_level < 1.0) {
            return Err(ImpactError::InvalidParameter(
                "credible_level must be in (0, 1)".into(),
            ));
        }
        if self.bins_across_deck == 0 {
            return Err(ImpactError::InvalidParameter(
                "bins_across_deck must be >= 1".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.face_mode_threshold) {
            return Err(ImpactError::InvalidParameter(
                "face_mode_threshold must be in [0, 1]".into(),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for LocatorParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            writeln!(f, "Impact Localization Parameters")?;
            writeln!(f, "------------------------------")?;
            writeln!(f, "  nside               = {:<10} # HEALPix resolution", self.nside)?;
            writeln!(f, "  credible_level      = {:<10} # credible mass", self.credible_level)?;
            writeln!(f, "  bins_across_deck    = {:<10} # face map resolution", self.bins_across_deck)?;
            write!(f, "  face_mode_threshold = {:<10} # dominant face fraction", self.face_mode_threshold)
        } else {
            write!(
                f,
                "LocatorParams(nside={}, credible_level={}, bins_across_deck={}, face_mode_threshold={})",
                self.nside, self.credible_level, self.bins_across_deck, self.face_mode_threshold
            )
        }
    }
}

#[cfg(test)]
mod params_test {
    use super::*;

    #[test]
    fn test_defaults() {
        let p = LocatorParams::default();
        assert_eq!(p.nside, 32);
        assert_eq!(p.credible_level, 0.68);
        assert_eq!(p.bins_across_deck, 50);
        assert_eq!(p.face_mode_threshold, 0.7);
        assert_eq!(LocatorParams::builder().build().unwrap(), p);
    }

    #[test]
    fn test_builder_validation() {
        assert!(LocatorParams::builder().nside(0).build().is_err());
        assert!(LocatorParams::builder().nside(NSIDE_MAX + 1).build().is_err());
        assert!(LocatorParams::builder().nside(NSIDE_MAX).build().is_ok());
        assert!(LocatorParams::builder().credible_level(1.0).build().is_err());
        assert!(LocatorParams::builder().bins_across_deck(0).build().is_err());
        assert!(LocatorParams::builder().face_mode_threshold(1.5).build().is_err());

        let p = LocatorParams::builder()
            .nside(8)
            .credible_level(0.9)
            .bins_across_deck(20)
            .face_mode_threshold(0.5)
            .build()
            .unwrap();
        assert_eq!(p.nside, 8);
        assert_eq!(p.bins_across_deck, 20);
    }

    #[test]
    fn test_display() {
        let p = LocatorParams::default();
        assert!(format!("{p}").starts_with("LocatorParams(nside=32"));
        assert!(format!("{p:#}").contains("credible_level      = 0.68"));
    }
}
