//! Caretaker-side geofence authoring rules.
//!
//! # Responsibility
//! - Hold an in-progress fence (center + radius) while it is being edited.
//! - Produce the per-patient fence document on save.
//!
//! # Invariants
//! - The radius always lies on the 50 m grid within [50 m, 2000 m].
//! - A document is only produced with a chosen center and non-blank ids.

use crate::error::MissingDataError;
use crate::model::{Coordinate, Geofence, GeofenceDocument};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const MIN_RADIUS_METERS: f64 = 50.0;
pub const MAX_RADIUS_METERS: f64 = 2_000.0;
pub const RADIUS_STEP_METERS: f64 = 50.0;
pub const DEFAULT_RADIUS_METERS: f64 = 100.0;

/// Fence draft validation errors.
#[derive(Debug, Clone, PartialEq)]
pub enum GeofenceDraftError {
    MissingCenter,
    MissingIdentity(&'static str),
    InvalidFence(MissingDataError),
}

impl Display for GeofenceDraftError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingCenter => write!(f, "select a location for the geofence center"),
            Self::MissingIdentity(field) => write!(f, "{field} must not be empty"),
            Self::InvalidFence(err) => write!(f, "invalid geofence: {err}"),
        }
    }
}

impl Error for GeofenceDraftError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidFence(err) => Some(err),
            Self::MissingCenter | Self::MissingIdentity(_) => None,
        }
    }
}

/// Editable fence before it is saved.
#[derive(Debug, Clone, PartialEq)]
pub struct GeofenceDraft {
    center: Option<Coordinate>,
    radius_meters: f64,
}

impl Default for GeofenceDraft {
    fn default() -> Self {
        Self {
            center: None,
            radius_meters: DEFAULT_RADIUS_METERS,
        }
    }
}

impl GeofenceDraft {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts editing from an existing fence.
    pub fn from_existing(fence: &Geofence) -> Self {
        let mut draft = Self::new();
        draft.center = Some(fence.center);
        draft.set_radius(fence.radius_meters);
        draft
    }

    pub fn center(&self) -> Option<Coordinate> {
        self.center
    }

    pub fn radius_meters(&self) -> f64 {
        self.radius_meters
    }

    pub fn set_center(&mut self, center: Coordinate) {
        self.center = Some(center);
    }

    /// Snaps to the nearest grid step and clamps into range.
    pub fn set_radius(&mut self, meters: f64) {
        if !meters.is_finite() {
            return;
        }
        let snapped = (meters / RADIUS_STEP_METERS).round() * RADIUS_STEP_METERS;
        self.radius_meters = snapped.clamp(MIN_RADIUS_METERS, MAX_RADIUS_METERS);
    }

    pub fn increase_radius(&mut self) {
        self.set_radius(self.radius_meters + RADIUS_STEP_METERS);
    }

    pub fn decrease_radius(&mut self) {
        self.set_radius(self.radius_meters - RADIUS_STEP_METERS);
    }

    /// Builds the document persisted for `patient_id`.
    pub fn build(
        &self,
        caretaker_id: &str,
        patient_id: &str,
        defined_at_ms: i64,
    ) -> Result<GeofenceDocument, GeofenceDraftError> {
        let center = self.center.ok_or(GeofenceDraftError::MissingCenter)?;
        let caretaker_id = non_blank(caretaker_id, "caretaker_id")?;
        let patient_id = non_blank(patient_id, "patient_id")?;
        let geofence = Geofence::new(center, self.radius_meters, defined_at_ms)
            .map_err(GeofenceDraftError::InvalidFence)?;

        Ok(GeofenceDocument {
            caretaker_id,
            patient_id,
            geofence,
        })
    }
}

fn non_blank(value: &str, field: &'static str) -> Result<String, GeofenceDraftError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(GeofenceDraftError::MissingIdentity(field));
    }
    Ok(trimmed.to_string())
}
