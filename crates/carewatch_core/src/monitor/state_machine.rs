//! Containment state machine over the latest position and fence.
//!
//! # Responsibility
//! - Re-evaluate containment whenever a position or fence update arrives.
//! - Emit `Left`/`Entered` exactly once per state change.
//!
//! # Invariants
//! - Initial state is `Inside`; with no fence defined the state stays
//!   `Inside` for every position.
//! - State changes only through evaluation of a validated sample against the
//!   current fence. Rejected records leave every field untouched.
//! - Updates are applied in call order; `observed_at_ms` is never used to
//!   reorder or drop samples.

use crate::error::MissingDataError;
use crate::geo::containment::evaluate;
use crate::model::{Geofence, GeofenceRecord, LocationRecord, PositionSample};
use log::{debug, info};
use serde::Serialize;

/// Whether the subject is within the current fence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainmentState {
    Inside,
    Outside,
}

impl ContainmentState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Inside => "inside",
            Self::Outside => "outside",
        }
    }
}

/// State change emitted by the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// `Outside -> Inside`.
    Entered,
    /// `Inside -> Outside`.
    Left,
}

/// Edge-triggered containment monitor for one session.
#[derive(Debug, Clone)]
pub struct GeofenceMonitor {
    state: ContainmentState,
    last_evaluated: Option<PositionSample>,
    last_boundary: Option<Geofence>,
    last_distance_meters: Option<f64>,
}

impl Default for GeofenceMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl GeofenceMonitor {
    pub fn new() -> Self {
        Self {
            state: ContainmentState::Inside,
            last_evaluated: None,
            last_boundary: None,
            last_distance_meters: None,
        }
    }

    pub fn state(&self) -> ContainmentState {
        self.state
    }

    pub fn last_evaluated(&self) -> Option<&PositionSample> {
        self.last_evaluated.as_ref()
    }

    pub fn last_boundary(&self) -> Option<&Geofence> {
        self.last_boundary.as_ref()
    }

    /// Distance from the fence center at the last evaluation.
    pub fn last_distance_meters(&self) -> Option<f64> {
        self.last_distance_meters
    }

    /// Applies a validated position sample.
    pub fn on_position(&mut self, sample: PositionSample) -> Option<Transition> {
        self.last_evaluated = Some(sample);
        self.reevaluate()
    }

    /// Applies a validated fence, replacing any previous one.
    pub fn on_geofence(&mut self, boundary: Geofence) -> Option<Transition> {
        self.last_boundary = Some(boundary);
        self.reevaluate()
    }

    /// Validates and applies a raw location record.
    ///
    /// On error nothing changes and the caller decides how to report it.
    pub fn apply_location_record(
        &mut self,
        record: &LocationRecord,
        received_at_ms: i64,
    ) -> Result<Option<Transition>, MissingDataError> {
        let sample = PositionSample::from_record(record, received_at_ms)?;
        Ok(self.on_position(sample))
    }

    /// Validates and applies a raw fence record.
    pub fn apply_geofence_record(
        &mut self,
        record: &GeofenceRecord,
        received_at_ms: i64,
    ) -> Result<Option<Transition>, MissingDataError> {
        let boundary = Geofence::from_record(record, received_at_ms)?;
        Ok(self.on_geofence(boundary))
    }

    fn reevaluate(&mut self) -> Option<Transition> {
        let (Some(sample), Some(boundary)) = (&self.last_evaluated, &self.last_boundary) else {
            return None;
        };

        let containment = evaluate(&sample.coordinate, boundary);
        self.last_distance_meters = Some(containment.distance_meters);

        let transition = match (self.state, containment.inside) {
            (ContainmentState::Inside, false) => {
                self.state = ContainmentState::Outside;
                Some(Transition::Left)
            }
            (ContainmentState::Outside, true) => {
                self.state = ContainmentState::Inside;
                Some(Transition::Entered)
            }
            _ => None,
        };

        match transition {
            Some(transition) => info!(
                "event=containment_transition module=monitor status=ok transition={:?} distance_m={:.0} radius_m={:.0}",
                transition, containment.distance_meters, boundary.radius_meters
            ),
            None => debug!(
                "event=containment_evaluated module=monitor status=ok state={} distance_m={:.1}",
                self.state.as_str(),
                containment.distance_meters
            ),
        }
        transition
    }
}
