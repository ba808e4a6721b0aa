use thiserror::Error;

use crate::constants::GpsSeconds;

#[derive(Error, Debug)]
pub enum ImpactError {
    #[error("Face index out of range (expected 0..=9): {0}")]
    InvalidFace(i64),

    #[error("Face chain value is not a face index in 0..=9: {0}")]
    InvalidFaceValue(f64),

    #[error("Degenerate spacecraft geometry: {0}")]
    DegenerateGeometry(String),

    #[error("Precondition not met: {0}")]
    MissingPrecondition(String),

    #[error("Empty input: {0}")]
    EmptyInput(String),

    #[error("No attitude quaternion available for GPS time {0}")]
    AttitudeLookupMiss(GpsSeconds),

    #[error("No solar ephemeris available for GPS time {0}")]
    EphemerisLookupMiss(GpsSeconds),

    #[error("GPS time {0} cannot be converted to an epoch")]
    InvalidEpoch(GpsSeconds),

    #[error("Invalid attitude record at GPS time {0}: quaternion has zero norm")]
    InvalidAttitude(GpsSeconds),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Unable to perform file operation: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Error while reading delimited attitude data: {0}")]
    CsvError(#[from] csv::Error),

    #[error("UTF-8 Path error: {0}")]
    Utf8PathError(String),
}

impl PartialEq for ImpactError {
    fn eq(&self, other: &Self) -> bool {
        use ImpactError::*;
        match (self, other) {
            (InvalidFace(a), InvalidFace(b)) => a == b,
            (InvalidFaceValue(a), InvalidFaceValue(b)) => a == b,
            (DegenerateGeometry(a), DegenerateGeometry(b)) => a == b,
            (MissingPrecondition(a), MissingPrecondition(b)) => a == b,
            (EmptyInput(a), EmptyInput(b)) => a == b,
            (AttitudeLookupMiss(a), AttitudeLookupMiss(b)) => a == b,
            (EphemerisLookupMiss(a), EphemerisLookupMiss(b)) => a == b,
            (InvalidEpoch(a), InvalidEpoch(b)) => a == b,
            (InvalidAttitude(a), InvalidAttitude(b)) => a == b,
            (InvalidParameter(a), InvalidParameter(b)) => a == b,
            (Utf8PathError(a), Utf8PathError(b)) => a == b,

            // not comparable: equal when the variant matches
            (IoError(_), IoError(_)) => true,
            (CsvError(_), CsvError(_)) => true,

            _ => false,
        }
    }
}
