//! # Posterior samples of one impact
//!
//! A [`SampleSet`] holds the burned-in posterior draws of one detector (GRS) for one data
//! segment, together with the segment metadata and the quantities derived from the draws:
//!
//! - **Sun / Micro frame directions**: absent until computed by
//!   [`FrameTransform`](crate::frames::FrameTransform), then fixed for the lifetime of the set
//!   (write-once cells).
//! - **Sky regions**: one [`SkyRegion`] per frame, replaced wholesale whenever it is
//!   recomputed with another credible level or resolution.
//!
//! Per-draw parameters are addressed through the typed [`ChainParam`] enum rather than by
//! field name. Names coming from configuration or user input can be parsed with
//! [`str::parse`]; unknown names fail with [`ImpactError::InvalidParameter`].

use std::collections::BTreeMap;
use std::str::FromStr;

use itertools::Itertools;
use nalgebra::Vector3;
use once_cell::sync::OnceCell;
use serde::Serialize;

use crate::constants::{GpsSeconds, Meter};
use crate::frames::{Frame, SkyPosition};
use crate::impact_errors::ImpactError;
use crate::sky_region::SkyRegion;
use crate::spacecraft::{Face, FACE_COUNT};

/// One posterior draw.
#[derive(Debug, Clone, PartialEq)]
pub struct ImpactSample {
    /// Total transferred momentum.
    pub momentum: f64,
    /// Face hit by the impact.
    pub face: Face,
    /// Impact position `(rx, ry, rz)` in body coordinates, in meters.
    pub local: Vector3<Meter>,
    /// Impact direction in the spacecraft frame.
    pub sc: SkyPosition,
    pub log_likelihood: f64,
    pub snr: f64,
    /// Impact time offset relative to the segment reference, in seconds.
    pub t0: f64,
}

impl ImpactSample {
    pub fn new(momentum: f64, face: Face, local: Vector3<Meter>, sc: SkyPosition) -> Self {
        ImpactSample {
            momentum,
            face,
            local,
            sc,
            log_likelihood: 0.0,
            snr: 0.0,
            t0: 0.0,
        }
    }

    /// Attach the sampler diagnostics of this draw.
    pub fn with_chain_stats(mut self, log_likelihood: f64, snr: f64, t0: f64) -> Self {
        self.log_likelihood = log_likelihood;
        self.snr = snr;
        self.t0 = t0;
        self
    }

    /// Value of a per-draw parameter.
    pub fn param(&self, param: ChainParam) -> f64 {
        match param {
            ChainParam::LogLikelihood => self.log_likelihood,
            ChainParam::Snr => self.snr,
            ChainParam::T0 => self.t0,
            ChainParam::Momentum => self.momentum,
            ChainParam::Lat => self.sc.lat,
            ChainParam::Lon => self.sc.lon,
            ChainParam::Rx => self.local.x,
            ChainParam::Ry => self.local.y,
            ChainParam::Rz => self.local.z,
            ChainParam::Face => self.face.index() as f64,
        }
    }
}

/// Per-draw parameters of the posterior chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ChainParam {
    LogLikelihood,
    Snr,
    T0,
    Momentum,
    Lat,
    Lon,
    Rx,
    Ry,
    Rz,
    Face,
}

impl FromStr for ChainParam {
    type Err = ImpactError;

    /// Parse the chain column names (`logL`, `snr`, `t0`, `Ptot`, `lat`, `lon`, `rx`, `ry`,
    /// `rz`, `face`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "logL" => Ok(ChainParam::LogLikelihood),
            "snr" => Ok(ChainParam::Snr),
            "t0" => Ok(ChainParam::T0),
            "Ptot" => Ok(ChainParam::Momentum),
            "lat" => Ok(ChainParam::Lat),
            "lon" => Ok(ChainParam::Lon),
            "rx" => Ok(ChainParam::Rx),
            "ry" => Ok(ChainParam::Ry),
            "rz" => Ok(ChainParam::Rz),
            "face" => Ok(ChainParam::Face),
            "segment" | "gps" | "N" | "grs" | "isValid" => Err(ImpactError::InvalidParameter(
                format!("{s} is segment metadata, not a chain parameter"),
            )),
            other => Err(ImpactError::InvalidParameter(format!(
                "unknown chain parameter: {other}"
            ))),
        }
    }
}

/// Equal-tailed credible interval of a parameter, with the sample at the middle rank.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CredibleInterval {
    pub down: f64,
    pub median: f64,
    pub up: f64,
}

/// Posterior draws of one detector for one segment.
#[derive(Debug, Clone)]
pub struct SampleSet {
    segment: GpsSeconds,
    gps: GpsSeconds,
    detector: u8,
    is_valid: bool,
    samples: Vec<ImpactSample>,
    sun_frame: OnceCell<Vec<SkyPosition>>,
    micro_frame: OnceCell<Vec<SkyPosition>>,
    sky_regions: BTreeMap<Frame, SkyRegion>,
}

impl SampleSet {
    /// Build a set from its draws.
    ///
    /// Arguments
    /// -----------------
    /// * `segment`: GPS start time of the data segment.
    /// * `gps`: GPS time of the impact.
    /// * `detector`: index of the gravitational reference sensor (1 or 2).
    /// * `samples`: burned-in posterior draws.
    pub fn new(segment: GpsSeconds, gps: GpsSeconds, detector: u8, samples: Vec<ImpactSample>) -> Self {
        SampleSet {
            segment,
            gps,
            detector,
            is_valid: true,
            samples,
            sun_frame: OnceCell::new(),
            micro_frame: OnceCell::new(),
            sky_regions: BTreeMap::new(),
        }
    }

    /// Set the validity flag resolved from the external veto catalog.
    pub fn with_validity(mut self, is_valid: bool) -> Self {
        self.is_valid = is_valid;
        self
    }

    pub fn segment(&self) -> GpsSeconds {
        self.segment
    }

    pub fn gps(&self) -> GpsSeconds {
        self.gps
    }

    pub fn detector(&self) -> u8 {
        self.detector
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[ImpactSample] {
        &self.samples
    }

    /// Segment start time as an integer label, used to name per-event outputs.
    pub fn filename(&self) -> String {
        format!("{}", self.segment as i64)
    }

    /// Draws that landed on `face`.
    pub fn samples_on(&self, face: Face) -> impl Iterator<Item = &ImpactSample> {
        self.samples.iter().filter(move |s| s.face == face)
    }

    pub fn sc_positions(&self) -> Vec<SkyPosition> {
        self.samples.iter().map(|s| s.sc).collect()
    }

    /// Whether directions in `frame` are available.
    pub fn has_frame(&self, frame: Frame) -> bool {
        match frame {
            Frame::Spacecraft => true,
            Frame::Sun => self.sun_frame.get().is_some(),
            Frame::Micro => self.micro_frame.get().is_some(),
        }
    }

    /// Directions of every draw in `frame`.
    ///
    /// Errors
    /// ----------
    /// * [`ImpactError::MissingPrecondition`] if the Sun or Micro frame has not been computed.
    pub fn positions(&self, frame: Frame) -> Result<Vec<SkyPosition>, ImpactError> {
        match frame {
            Frame::Spacecraft => Ok(self.sc_positions()),
            Frame::Sun => self.sun_frame.get().cloned().ok_or_else(|| {
                ImpactError::MissingPrecondition(
                    "Sun frame requested before the SC → Sun transform".into(),
                )
            }),
            Frame::Micro => self.micro_frame.get().cloned().ok_or_else(|| {
                ImpactError::MissingPrecondition(
                    "Micro frame requested before the Sun → Micro transform".into(),
                )
            }),
        }
    }

    pub(crate) fn sun_frame_or_try_init<F>(&self, init: F) -> Result<&[SkyPosition], ImpactError>
    where
        F: FnOnce() -> Result<Vec<SkyPosition>, ImpactError>,
    {
        self.sun_frame.get_or_try_init(init).map(Vec::as_slice)
    }

    pub(crate) fn micro_frame_or_try_init<F>(&self, init: F) -> Result<&[SkyPosition], ImpactError>
    where
        F: FnOnce() -> Result<Vec<SkyPosition>, ImpactError>,
    {
        self.micro_frame.get_or_try_init(init).map(Vec::as_slice)
    }

    /// Sky region last computed for `frame`.
    ///
    /// Errors
    /// ----------
    /// * [`ImpactError::MissingPrecondition`] if no region has been computed for this frame.
    pub fn sky_region(&self, frame: Frame) -> Result<&SkyRegion, ImpactError> {
        self.sky_regions.get(&frame).ok_or_else(|| {
            ImpactError::MissingPrecondition(format!("no sky region computed for the {frame} frame"))
        })
    }

    /// Store a sky region, replacing any previous region of the same frame.
    pub fn set_sky_region(&mut self, region: SkyRegion) {
        self.sky_regions.insert(region.frame, region);
    }

    /// Every value of a per-draw parameter, in sample order.
    pub fn chain(&self, param: ChainParam) -> Vec<f64> {
        self.samples.iter().map(|s| s.param(param)).collect()
    }

    fn sorted_chain(&self, param: ChainParam) -> Result<Vec<f64>, ImpactError> {
        if self.samples.is_empty() {
            return Err(ImpactError::EmptyInput(format!(
                "no samples to summarize {param:?}"
            )));
        }
        Ok(self
            .chain(param)
            .into_iter()
            .sorted_by(|a, b| a.total_cmp(b))
            .collect())
    }

    /// Median of a parameter; for [`ChainParam::Face`] the most frequent face (smallest on ties).
    pub fn median(&self, param: ChainParam) -> Result<f64, ImpactError> {
        if param == ChainParam::Face {
            return Ok(self.face_mode()?.index() as f64);
        }
        let sorted = self.sorted_chain(param)?;
        let n = sorted.len();
        Ok(if n % 2 == 1 {
            sorted[n / 2]
        } else {
            0.5 * (sorted[n / 2 - 1] + sorted[n / 2])
        })
    }

    /// Population standard deviation of a parameter.
    pub fn std_dev(&self, param: ChainParam) -> Result<f64, ImpactError> {
        if self.samples.is_empty() {
            return Err(ImpactError::EmptyInput(format!(
                "no samples to summarize {param:?}"
            )));
        }
        let values = self.chain(param);
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        Ok(var.sqrt())
    }

    /// Equal-tailed credible interval of a parameter by sample rank.
    ///
    /// With the draws sorted, the bounds are the samples at ranks `⌊N·(1−c)/2⌋` and
    /// `⌊N·(c + (1−c)/2)⌋`, and the median the sample at rank `⌊N/2⌋`, so
    /// `down ≤ median ≤ up` always holds.
    ///
    /// Errors
    /// ----------
    /// * [`ImpactError::InvalidParameter`] unless `0 < credible < 1`.
    /// * [`ImpactError::EmptyInput`] for an empty set.
    pub fn credible_interval(
        &self,
        param: ChainParam,
        credible: f64,
    ) -> Result<CredibleInterval, ImpactError> {
        if !(credible > 0.0 && credible < 1.0) {
            return Err(ImpactError::InvalidParameter(format!(
                "credible level must be in (0, 1), got {credible}"
            )));
        }
        let sorted = self.sorted_chain(param)?;
        let n = sorted.len();
        let tail = (1.0 - credible) / 2.0;
        let rank = |fraction: f64| ((n as f64 * fraction) as usize).min(n - 1);

        Ok(CredibleInterval {
            down: sorted[rank(tail)],
            median: sorted[n / 2],
            up: sorted[rank(credible + tail)],
        })
    }

    /// Fraction of draws on each face, indexed by face.
    pub fn face_fractions(&self) -> [f64; FACE_COUNT] {
        let mut fractions = [0.0; FACE_COUNT];
        if self.samples.is_empty() {
            return fractions;
        }
        for s in &self.samples {
            fractions[s.face.index()] += 1.0;
        }
        let n = self.samples.len() as f64;
        fractions.iter_mut().for_each(|f| *f /= n);
        fractions
    }

    /// Most frequent face (smallest index on ties).
    pub fn face_mode(&self) -> Result<Face, ImpactError> {
        if self.samples.is_empty() {
            return Err(ImpactError::EmptyInput("no samples to find the face mode".into()));
        }
        let fractions = self.face_fractions();
        let best = fractions
            .iter()
            .enumerate()
            .fold(0, |best, (i, f)| if *f > fractions[best] { i } else { best });
        Face::new(best as i64)
    }

    /// The face holding more than `threshold` of the draws, if any.
    pub fn dominant_face(&self, threshold: f64) -> Option<Face> {
        let face = self.face_mode().ok()?;
        (self.face_fractions()[face.index()] > threshold).then_some(face)
    }
}

#[cfg(test)]
mod samples_test {
    use super::*;
    use approx::assert_relative_eq;

    fn sample(momentum: f64, face: i64, lat: f64) -> ImpactSample {
        ImpactSample::new(
            momentum,
            Face::new(face).unwrap(),
            Vector3::new(0.1, 0.2, 0.3),
            SkyPosition::new(lat, 2.0 * lat),
        )
    }

    fn set() -> SampleSet {
        SampleSet::new(
            1_143_962_325.0,
            1_143_963_500.0,
            1,
            vec![
                sample(3.0, 2, 10.0),
                sample(1.0, 2, -10.0),
                sample(2.0, 5, 30.0),
                sample(5.0, 2, 0.0),
            ],
        )
    }

    #[test]
    fn test_chain_param_parsing() {
        assert_eq!("Ptot".parse::<ChainParam>().unwrap(), ChainParam::Momentum);
        assert_eq!("rz".parse::<ChainParam>().unwrap(), ChainParam::Rz);
        assert!(matches!(
            "gps".parse::<ChainParam>(),
            Err(ImpactError::InvalidParameter(_))
        ));
        assert!(matches!(
            "banana".parse::<ChainParam>(),
            Err(ImpactError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_median_and_mode() {
        let s = set();
        assert_relative_eq!(s.median(ChainParam::Momentum).unwrap(), 2.5);
        assert_eq!(s.median(ChainParam::Face).unwrap(), 2.0);
        assert_eq!(s.face_mode().unwrap().index(), 2);
        assert_eq!(s.dominant_face(0.7), Some(Face::new(2).unwrap()));
        assert_eq!(s.dominant_face(0.8), None);
        assert_relative_eq!(s.face_fractions()[5], 0.25);
    }

    #[test]
    fn test_credible_interval() {
        let s = set();
        let ci = s.credible_interval(ChainParam::Momentum, 0.5).unwrap();
        // sorted: 1, 2, 3, 5 → ranks 1, 2, 3
        assert_eq!(ci.down, 2.0);
        assert_eq!(ci.median, 3.0);
        assert_eq!(ci.up, 5.0);
        assert!(s.credible_interval(ChainParam::Momentum, 1.0).is_err());
    }

    #[test]
    fn test_std_dev() {
        let s = set();
        let sd = s.std_dev(ChainParam::Momentum).unwrap();
        // mean 2.75, squared deviations 0.0625 + 3.0625 + 0.5625 + 5.0625
        assert_relative_eq!(sd, (8.75f64 / 4.0).sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_empty_set() {
        let s = SampleSet::new(0.0, 0.0, 2, vec![]);
        assert!(matches!(s.median(ChainParam::Lat), Err(ImpactError::EmptyInput(_))));
        assert!(matches!(s.face_mode(), Err(ImpactError::EmptyInput(_))));
        assert_eq!(s.dominant_face(0.1), None);
        assert_eq!(s.face_fractions(), [0.0; FACE_COUNT]);
    }

    #[test]
    fn test_derived_frames_absent() {
        let s = set();
        assert!(s.has_frame(Frame::Spacecraft));
        assert!(!s.has_frame(Frame::Sun));
        assert!(matches!(
            s.positions(Frame::Micro),
            Err(ImpactError::MissingPrecondition(_))
        ));
        assert!(matches!(
            s.sky_region(Frame::Spacecraft),
            Err(ImpactError::MissingPrecondition(_))
        ));
    }

    #[test]
    fn test_derived_frame_write_once() {
        let s = set();
        let first = s
            .sun_frame_or_try_init(|| Ok(vec![SkyPosition::new(1.0, 1.0); 4]))
            .unwrap()
            .to_vec();
        let second = s
            .sun_frame_or_try_init(|| Ok(vec![SkyPosition::new(9.0, 9.0); 4]))
            .unwrap();
        assert_eq!(first.as_slice(), second);
        assert_eq!(s.filename(), "1143962325");
    }
}
