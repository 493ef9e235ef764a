//! Geofence boundary model and its stored document shape.
//!
//! # Invariants
//! - `radius_meters` is finite and strictly positive.
//! - At most one active fence exists per patient; a newer document replaces
//!   the previous one instead of accumulating.

use crate::error::MissingDataError;
use crate::model::coordinate::Coordinate;
use serde::{Deserialize, Serialize};

/// Circular safe zone around `center`, closed at the radius.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GeofenceRecord", into = "GeofenceRecord")]
pub struct Geofence {
    pub center: Coordinate,
    pub radius_meters: f64,
    /// Unix epoch milliseconds.
    pub defined_at_ms: i64,
}

impl Geofence {
    pub fn new(
        center: Coordinate,
        radius_meters: f64,
        defined_at_ms: i64,
    ) -> Result<Self, MissingDataError> {
        if !radius_meters.is_finite() {
            return Err(MissingDataError::NonFinite("radius"));
        }
        if radius_meters <= 0.0 {
            return Err(MissingDataError::OutOfRange {
                field: "radius",
                value: radius_meters,
            });
        }
        Ok(Self {
            center,
            radius_meters,
            defined_at_ms,
        })
    }

    /// Validates a store record.
    ///
    /// `received_at_ms` stamps records that carry no definition time.
    pub fn from_record(
        record: &GeofenceRecord,
        received_at_ms: i64,
    ) -> Result<Self, MissingDataError> {
        let center = Coordinate::from_parts(record.latitude, record.longitude)?;
        let radius = record.radius.ok_or(MissingDataError::MissingField("radius"))?;
        Self::new(center, radius, record.timestamp.unwrap_or(received_at_ms))
    }
}

/// Stored fence shape: flat center fields plus radius in meters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeofenceRecord {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub radius: Option<f64>,
    /// Unix epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl GeofenceRecord {
    pub fn new(latitude: f64, longitude: f64, radius: f64, timestamp: Option<i64>) -> Self {
        Self {
            latitude: Some(latitude),
            longitude: Some(longitude),
            radius: Some(radius),
            timestamp,
        }
    }
}

impl From<Geofence> for GeofenceRecord {
    fn from(value: Geofence) -> Self {
        Self::new(
            value.center.latitude,
            value.center.longitude,
            value.radius_meters,
            Some(value.defined_at_ms),
        )
    }
}

impl TryFrom<GeofenceRecord> for Geofence {
    type Error = MissingDataError;

    fn try_from(value: GeofenceRecord) -> Result<Self, Self::Error> {
        let timestamp = value
            .timestamp
            .ok_or(MissingDataError::MissingField("timestamp"))?;
        Self::from_record(&value, timestamp)
    }
}

/// Per-patient fence document written by the caretaker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeofenceDocument {
    pub caretaker_id: String,
    pub patient_id: String,
    pub geofence: Geofence,
}

#[cfg(test)]
mod tests {
    use super::{Geofence, GeofenceDocument, GeofenceRecord};
    use crate::error::MissingDataError;
    use crate::model::Coordinate;

    fn center() -> Coordinate {
        Coordinate::new(31.5204, 74.3587).expect("valid center")
    }

    #[test]
    fn rejects_non_positive_radius() {
        let err = Geofence::new(center(), 0.0, 0).unwrap_err();
        assert_eq!(
            err,
            MissingDataError::OutOfRange {
                field: "radius",
                value: 0.0
            }
        );
        assert!(Geofence::new(center(), f64::INFINITY, 0).is_err());
    }

    #[test]
    fn from_record_requires_radius() {
        let record = GeofenceRecord {
            latitude: Some(1.0),
            longitude: Some(1.0),
            radius: None,
            timestamp: None,
        };
        assert_eq!(
            Geofence::from_record(&record, 5).unwrap_err(),
            MissingDataError::MissingField("radius")
        );
    }

    #[test]
    fn document_serializes_with_store_field_names() {
        let document = GeofenceDocument {
            caretaker_id: "caretaker-1".to_string(),
            patient_id: "patient-1".to_string(),
            geofence: Geofence::new(center(), 150.0, 1_700_000_000_000).expect("valid fence"),
        };

        let json = serde_json::to_value(&document).expect("serialize document");
        assert_eq!(json["caretakerId"], "caretaker-1");
        assert_eq!(json["patientId"], "patient-1");
        assert_eq!(json["geofence"]["radius"], 150.0);
        assert_eq!(json["geofence"]["latitude"], 31.5204);
        assert_eq!(json["geofence"]["timestamp"], 1_700_000_000_000_i64);

        let decoded: GeofenceDocument = serde_json::from_value(json).expect("decode document");
        assert_eq!(decoded, document);
    }

    #[test]
    fn deserialize_rejects_negative_radius() {
        let value = serde_json::json!({
            "latitude": 1.0,
            "longitude": 2.0,
            "radius": -5.0,
            "timestamp": 10
        });
        let err = serde_json::from_value::<Geofence>(value).unwrap_err();
        assert!(err.to_string().contains("radius"), "unexpected error: {err}");
    }
}
