//! Domain model for geofence monitoring.
//!
//! # Responsibility
//! - Define validated value types consumed by the evaluator and monitor.
//! - Define the loosely-typed record shapes delivered by external stores and
//!   the conversions that validate them.
//!
//! # Invariants
//! - A `Coordinate` always holds finite, in-range degrees.
//! - A `Geofence` always has a finite radius greater than zero.
//! - Record-to-model conversion is the only place missing data is detected.

pub mod coordinate;
pub mod geofence;
pub mod patient;

pub use coordinate::{Coordinate, LocationRecord, PositionSample};
pub use geofence::{Geofence, GeofenceDocument, GeofenceRecord};
pub use patient::PatientRef;
