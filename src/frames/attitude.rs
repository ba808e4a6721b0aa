//! # Spacecraft attitude series
//!
//! The spacecraft orientation is supplied as a time-ordered table of unit quaternions, each
//! rotating **SC-frame** vectors into the **ECI** frame. Lookups pick the record closest in
//! time to the requested epoch; no interpolation is performed and no maximum gap is enforced.
//! The gap of every lookup is reported so callers can judge how stale the attitude is.
//!
//! ## File format
//!
//! [`AttitudeSeries::from_delimited`] (or [`AttitudeSeries::from_path`] for any `std` path)
//! reads headerless delimited text, one record per row:
//!
//! ```text
//! gps_time, qx, qy, qz, qw
//! ```
//!
//! i.e. the vector part first and the scalar part last.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use camino::Utf8Path;
use nalgebra::{Quaternion, UnitQuaternion};
use serde::Deserialize;
use tracing::debug;

use crate::constants::{GpsSeconds, EPS};
use crate::impact_errors::ImpactError;

/// Source of spacecraft attitude (SC → ECI rotation) at a given epoch.
pub trait AttitudeSource {
    /// Unit quaternion rotating SC vectors into ECI, for the record nearest to `gps`.
    ///
    /// Errors
    /// ----------
    /// * [`ImpactError::AttitudeLookupMiss`] when no attitude data is available.
    fn nearest_quaternion(&self, gps: GpsSeconds) -> Result<UnitQuaternion<f64>, ImpactError>;
}

/// One attitude sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttitudeRecord {
    pub gps: GpsSeconds,
    pub sc_to_eci: UnitQuaternion<f64>,
}

/// Raw row of an attitude file: GPS time, vector part, scalar part last.
#[derive(Debug, Deserialize)]
struct AttitudeRow {
    gps: f64,
    qx: f64,
    qy: f64,
    qz: f64,
    qw: f64,
}

impl AttitudeRow {
    fn into_record(self) -> Result<AttitudeRecord, ImpactError> {
        let q = Quaternion::new(self.qw, self.qx, self.qy, self.qz);
        let sc_to_eci =
            UnitQuaternion::try_new(q, EPS).ok_or(ImpactError::InvalidAttitude(self.gps))?;
        Ok(AttitudeRecord {
            gps: self.gps,
            sc_to_eci,
        })
    }
}

/// Time-ordered attitude table with nearest-time lookup.
#[derive(Debug, Clone, Default)]
pub struct AttitudeSeries {
    records: Vec<AttitudeRecord>,
}

impl AttitudeSeries {
    /// Build a series from records in any order; records are sorted by time (stable).
    pub fn new(mut records: Vec<AttitudeRecord>) -> Self {
        records.sort_by(|a, b| a.gps.total_cmp(&b.gps));
        AttitudeSeries { records }
    }

    /// Build a series from raw `(gps, quaternion)` pairs, normalizing every quaternion.
    ///
    /// Errors
    /// ----------
    /// * [`ImpactError::InvalidAttitude`] if a quaternion has (near) zero norm.
    pub fn from_quaternions(
        samples: impl IntoIterator<Item = (GpsSeconds, Quaternion<f64>)>,
    ) -> Result<Self, ImpactError> {
        let records = samples
            .into_iter()
            .map(|(gps, q)| {
                UnitQuaternion::try_new(q, EPS)
                    .map(|sc_to_eci| AttitudeRecord { gps, sc_to_eci })
                    .ok_or(ImpactError::InvalidAttitude(gps))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(records))
    }

    /// Read an attitude series from any reader of headerless delimited text.
    pub fn from_reader<R: Read>(reader: R, delimiter: u8) -> Result<Self, ImpactError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .delimiter(delimiter)
            .trim(csv::Trim::All)
            .comment(Some(b'#'))
            .from_reader(reader);

        let records = csv_reader
            .deserialize::<AttitudeRow>()
            .map(|row| row.map_err(ImpactError::from)?.into_record())
            .collect::<Result<Vec<_>, _>>()?;

        debug!(records = records.len(), "attitude series loaded");
        Ok(Self::new(records))
    }

    /// Read an attitude series from a file on disk.
    pub fn from_delimited(path: &Utf8Path, delimiter: u8) -> Result<Self, ImpactError> {
        let file = File::open(path)?;
        debug!(path = %path, "reading attitude file");
        Self::from_reader(file, delimiter)
    }

    /// Same as [`Self::from_delimited`] for any filesystem path.
    ///
    /// Errors
    /// ----------
    /// * [`ImpactError::Utf8PathError`] if the path is not valid UTF-8.
    pub fn from_path(path: impl AsRef<Path>, delimiter: u8) -> Result<Self, ImpactError> {
        let path = path.as_ref();
        let utf8 = Utf8Path::from_path(path).ok_or_else(|| {
            ImpactError::Utf8PathError(format!("non UTF-8 path: {}", path.display()))
        })?;
        Self::from_delimited(utf8, delimiter)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[AttitudeRecord] {
        &self.records
    }

    /// Record closest in time to `gps`, together with the absolute time gap in seconds.
    ///
    /// Ties between two equally distant records resolve to the earlier one; among records
    /// sharing the same time the first one in the table wins.
    ///
    /// Errors
    /// ----------
    /// * [`ImpactError::AttitudeLookupMiss`] for an empty series or a non-finite `gps`.
    pub fn nearest(&self, gps: GpsSeconds) -> Result<(&AttitudeRecord, f64), ImpactError> {
        if self.records.is_empty() || !gps.is_finite() {
            return Err(ImpactError::AttitudeLookupMiss(gps));
        }

        let idx = self.records.partition_point(|r| r.gps < gps);
        let best = match (idx.checked_sub(1), self.records.get(idx)) {
            (Some(prev), Some(next)) => {
                if (gps - self.records[prev].gps).abs() <= (next.gps - gps).abs() {
                    prev
                } else {
                    idx
                }
            }
            (Some(prev), None) => prev,
            (None, _) => idx,
        };

        let t = self.records[best].gps;
        let first = self.records.partition_point(|r| r.gps < t);
        let record = &self.records[first];
        Ok((record, (record.gps - gps).abs()))
    }
}

impl AttitudeSource for AttitudeSeries {
    fn nearest_quaternion(&self, gps: GpsSeconds) -> Result<UnitQuaternion<f64>, ImpactError> {
        let (record, gap) = self.nearest(gps)?;
        debug!(gps, record_gps = record.gps, gap_s = gap, "nearest attitude record");
        Ok(record.sc_to_eci)
    }
}

#[cfg(test)]
mod attitude_test {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    fn series() -> AttitudeSeries {
        AttitudeSeries::from_quaternions(vec![
            (30.0, Quaternion::new(0.0, 0.0, 0.0, 2.0)),
            (10.0, Quaternion::new(1.0, 0.0, 0.0, 0.0)),
            (20.0, Quaternion::new(1.0, 1.0, 0.0, 0.0)),
        ])
        .unwrap()
    }

    #[test]
    fn test_sorted_and_normalized() {
        let s = series();
        let times: Vec<f64> = s.records().iter().map(|r| r.gps).collect();
        assert_eq!(times, vec![10.0, 20.0, 30.0]);
        for r in s.records() {
            assert_relative_eq!(r.sc_to_eci.quaternion().norm(), 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_nearest_lookup() {
        let s = series();
        assert_eq!(s.nearest(12.0).unwrap().0.gps, 10.0);
        assert_eq!(s.nearest(16.0).unwrap().0.gps, 20.0);
        // halfway between two records: the earlier one
        assert_eq!(s.nearest(15.0).unwrap().0.gps, 10.0);
        // beyond both ends
        let (rec, gap) = s.nearest(1000.0).unwrap();
        assert_eq!(rec.gps, 30.0);
        assert_eq!(gap, 970.0);
        assert_eq!(s.nearest(-5.0).unwrap().0.gps, 10.0);
    }

    #[test]
    fn test_empty_series() {
        let s = AttitudeSeries::default();
        assert_eq!(
            s.nearest_quaternion(42.0),
            Err(ImpactError::AttitudeLookupMiss(42.0))
        );
    }

    #[test]
    fn test_non_finite_time_is_lookup_miss() {
        let s = series();
        for gps in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(
                matches!(s.nearest(gps), Err(ImpactError::AttitudeLookupMiss(_))),
                "{gps}"
            );
            assert!(s.nearest_quaternion(gps).is_err());
        }
    }

    #[test]
    fn test_zero_quaternion_rejected() {
        let res = AttitudeSeries::from_quaternions(vec![(5.0, Quaternion::new(0.0, 0.0, 0.0, 0.0))]);
        assert_eq!(res.unwrap_err(), ImpactError::InvalidAttitude(5.0));
    }

    #[test]
    fn test_from_path() {
        let path = std::env::temp_dir().join(format!("attitude_{}.csv", std::process::id()));
        std::fs::write(&path, "10.0 0.0 0.0 0.0 1.0\n5.0 0.0 0.0 1.0 0.0\n").unwrap();
        let s = AttitudeSeries::from_path(&path, b' ').unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(s.len(), 2);
        assert_eq!(s.records()[0].gps, 5.0);

        let missing = std::env::temp_dir().join("no_such_attitude_file.csv");
        assert!(matches!(
            AttitudeSeries::from_path(&missing, b','),
            Err(ImpactError::IoError(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_path() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let path = Path::new(OsStr::from_bytes(b"attitude_\xff.csv"));
        assert!(matches!(
            AttitudeSeries::from_path(path, b','),
            Err(ImpactError::Utf8PathError(_))
        ));
    }

    #[test]
    fn test_from_reader() {
        let data = "# gps, qx, qy, qz, qw\n\
                    1000.0, 0.0, 0.0, 0.7071067811865476, 0.7071067811865476\n\
                    1001.0, 0.0, 0.0, 0.0, 1.0\n";
        let s = AttitudeSeries::from_reader(data.as_bytes(), b',').unwrap();
        assert_eq!(s.len(), 2);

        // 90° about +z: +x goes to +y
        let q = s.nearest_quaternion(999.0).unwrap();
        let v = q * Vector3::x();
        assert_relative_eq!(v, Vector3::y(), epsilon = 1e-12);
    }

    #[test]
    fn test_from_reader_bad_row() {
        let data = "1000.0, 0.0, 0.0\n";
        let res = AttitudeSeries::from_reader(data.as_bytes(), b',');
        assert!(matches!(res, Err(ImpactError::CsvError(_))));
    }
}
