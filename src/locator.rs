//! # Impact localization pipeline
//!
//! [`ImpactLocator`] wires the spacecraft geometry, the frame transform, the sky-region
//! estimator and the face unfolder together under one set of [`LocatorParams`]:
//!
//! ```text
//!                 ┌──> SC → Sun → Micro ──> sky regions (SC, Sun, Micro)
//!   SampleSet ────┤
//!                 └──> per-face density maps (3D body / flattened layout)
//! ```
//!
//! The locator is read-only: it can be shared across sample sets, and the only state it
//! writes lives on the [`SampleSet`] itself (write-once frames, replaceable sky regions).

use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::constants::{GpsSeconds, SquareDegree};
use crate::frames::attitude::AttitudeSource;
use crate::frames::ephemeris::{gps_epoch, SolarEphemeris};
use crate::frames::{Frame, FrameTransform, SkyPosition};
use crate::healpix::Healpix;
use crate::impact_errors::ImpactError;
use crate::params::LocatorParams;
use crate::samples::{ChainParam, CredibleInterval, SampleSet};
use crate::sky_region::SkyRegionEstimator;
use crate::spacecraft::{Face, SpacecraftGeometry, FACE_COUNT};
use crate::unfold::{FacePatch, FaceUnfolder, FlatFace};

/// Sky regions wider than this are not considered localized.
pub const LOCALIZED_AREA_MAX: SquareDegree = 5000.0;

/// Compact description of one localized impact.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImpactSummary {
    pub gps: GpsSeconds,
    /// UTC calendar date of the impact, `YYYY-MM-DD`.
    pub date: String,
    pub detector: u8,
    pub momentum: CredibleInterval,
    pub face_fractions: [f64; FACE_COUNT],
    /// Face holding more than the configured fraction of the draws.
    pub face: Option<Face>,
    pub sc_area: SquareDegree,
    /// Centroids are only reported for regions smaller than [`LOCALIZED_AREA_MAX`].
    pub sc_centroid: Option<SkyPosition>,
    pub sun_centroid: Option<SkyPosition>,
}

impl fmt::Display for ImpactSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let face = self.face.map_or("-".to_string(), |f| f.label().to_string());
        let angle = |p: Option<SkyPosition>| {
            p.map_or(("-".to_string(), "-".to_string()), |p| {
                (format!("{:.0}", p.lat), format!("{:.0}", p.lon))
            })
        };
        let (sc_lat, sc_lon) = angle(self.sc_centroid);
        let (sun_lat, sun_lon) = angle(self.sun_centroid);
        let area = if self.sc_centroid.is_some() {
            format!("{:.0}", self.sc_area)
        } else {
            "-".to_string()
        };
        write!(
            f,
            "{} | {:.0} | {:.1} (+{:.1} / -{:.1}) | {} | {} | {} | {} | {} | {}",
            self.date,
            self.gps,
            self.momentum.median,
            self.momentum.up - self.momentum.median,
            self.momentum.median - self.momentum.down,
            face,
            area,
            sc_lat,
            sc_lon,
            sun_lat,
            sun_lon
        )
    }
}

/// Façade running the whole localization on sample sets.
#[derive(Debug, Clone)]
pub struct ImpactLocator<A, E> {
    params: LocatorParams,
    transform: FrameTransform<A, E>,
    estimator: SkyRegionEstimator<Healpix>,
    unfolder: FaceUnfolder,
}

impl<A: AttitudeSource, E: SolarEphemeris> ImpactLocator<A, E> {
    /// Arguments
    /// -----------------
    /// * `geometry`: spacecraft body.
    /// * `attitude`: SC → ECI attitude source.
    /// * `ephemeris`: solar ephemeris.
    /// * `params`: validated with [`LocatorParams::validate`].
    pub fn new(
        geometry: SpacecraftGeometry,
        attitude: A,
        ephemeris: E,
        params: LocatorParams,
    ) -> Result<Self, ImpactError> {
        params.validate()?;
        Ok(ImpactLocator {
            estimator: SkyRegionEstimator::healpix(params.nside, params.credible_level)?,
            unfolder: FaceUnfolder::new(geometry, params.bins_across_deck)?,
            transform: FrameTransform::new(attitude, ephemeris),
            params,
        })
    }

    pub fn params(&self) -> &LocatorParams {
        &self.params
    }

    pub fn transform(&self) -> &FrameTransform<A, E> {
        &self.transform
    }

    pub fn estimator(&self) -> &SkyRegionEstimator<Healpix> {
        &self.estimator
    }

    pub fn unfolder(&self) -> &FaceUnfolder {
        &self.unfolder
    }

    /// Derive the Sun and Micro frames of `set` and compute the sky region of every frame.
    pub fn localize(&self, set: &mut SampleSet) -> Result<(), ImpactError> {
        self.transform.sc_to_sun(set)?;
        self.transform.sun_to_micro(set)?;
        self.estimator.find_sky_angles(set)?;
        debug!(gps = set.gps(), detector = set.detector(), "sample set localized");
        Ok(())
    }

    /// Summary of a localized set.
    ///
    /// Errors
    /// ----------
    /// * [`ImpactError::MissingPrecondition`] if [`Self::localize`] has not run on `set`.
    /// * [`ImpactError::EmptyInput`] for an empty set.
    /// * [`ImpactError::InvalidEpoch`] if the event time has no calendar date.
    pub fn summarize(&self, set: &SampleSet) -> Result<ImpactSummary, ImpactError> {
        let sc = set.sky_region(Frame::Spacecraft)?;
        let sun = set.sky_region(Frame::Sun)?;
        let localized = sc.area < LOCALIZED_AREA_MAX;

        Ok(ImpactSummary {
            gps: set.gps(),
            date: utc_date(set.gps())?,
            detector: set.detector(),
            momentum: set.credible_interval(ChainParam::Momentum, self.params.credible_level)?,
            face_fractions: set.face_fractions(),
            face: set.dominant_face(self.params.face_mode_threshold),
            sc_area: sc.area,
            sc_centroid: localized.then_some(sc.centroid),
            sun_centroid: localized.then_some(sun.centroid),
        })
    }

    /// Per-face density maps on the flattened layout.
    pub fn flat_layout(&self, set: &SampleSet) -> Result<Vec<FlatFace>, ImpactError> {
        self.unfolder.flat_layout(set)
    }

    /// Per-face density maps on the 3D body.
    pub fn surface_patches(&self, set: &SampleSet) -> Result<Vec<FacePatch>, ImpactError> {
        self.unfolder.surface_patches(set)
    }
}

/// UTC calendar date of a GPS time.
fn utc_date(gps: GpsSeconds) -> Result<String, ImpactError> {
    let (y, m, d, _, _, _, _) = gps_epoch(gps)?.to_gregorian_utc();
    Ok(format!("{y:04}-{m:02}-{d:02}"))
}
