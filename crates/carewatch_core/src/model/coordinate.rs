//! Coordinates and position samples.

use crate::error::MissingDataError;
use serde::{Deserialize, Serialize};

/// Immutable latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinate")]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Deserialize)]
struct RawCoordinate {
    latitude: f64,
    longitude: f64,
}

impl TryFrom<RawCoordinate> for Coordinate {
    type Error = MissingDataError;

    fn try_from(value: RawCoordinate) -> Result<Self, Self::Error> {
        Coordinate::new(value.latitude, value.longitude)
    }
}

impl Coordinate {
    /// Builds a coordinate, rejecting NaN/infinite and out-of-range degrees.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, MissingDataError> {
        Ok(Self {
            latitude: check_degrees("latitude", latitude, 90.0)?,
            longitude: check_degrees("longitude", longitude, 180.0)?,
        })
    }

    /// Builds a coordinate from optional parts, as delivered by stores.
    pub fn from_parts(
        latitude: Option<f64>,
        longitude: Option<f64>,
    ) -> Result<Self, MissingDataError> {
        let latitude = latitude.ok_or(MissingDataError::MissingField("latitude"))?;
        let longitude = longitude.ok_or(MissingDataError::MissingField("longitude"))?;
        Self::new(latitude, longitude)
    }
}

fn check_degrees(field: &'static str, value: f64, limit: f64) -> Result<f64, MissingDataError> {
    if !value.is_finite() {
        return Err(MissingDataError::NonFinite(field));
    }
    if value.abs() > limit {
        return Err(MissingDataError::OutOfRange { field, value });
    }
    Ok(value)
}

/// Location document shape as stored for a patient.
///
/// Every field is optional because the store may hold partial writes; use
/// [`PositionSample::from_record`] to validate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationRecord {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Unix epoch milliseconds. Absent in older documents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_at_ms: Option<i64>,
}

impl LocationRecord {
    pub fn new(latitude: f64, longitude: f64, observed_at_ms: Option<i64>) -> Self {
        Self {
            latitude: Some(latitude),
            longitude: Some(longitude),
            observed_at_ms,
        }
    }
}

/// Most recent observed position of the monitored subject.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionSample {
    pub coordinate: Coordinate,
    /// Unix epoch milliseconds.
    pub observed_at_ms: i64,
}

impl PositionSample {
    pub fn new(coordinate: Coordinate, observed_at_ms: i64) -> Self {
        Self {
            coordinate,
            observed_at_ms,
        }
    }

    /// Validates a store record.
    ///
    /// `received_at_ms` stamps records that carry no observation time.
    pub fn from_record(
        record: &LocationRecord,
        received_at_ms: i64,
    ) -> Result<Self, MissingDataError> {
        let coordinate = Coordinate::from_parts(record.latitude, record.longitude)?;
        Ok(Self::new(
            coordinate,
            record.observed_at_ms.unwrap_or(received_at_ms),
        ))
    }
}
