//! Patient-side location publishing.
//!
//! # Responsibility
//! - Forward device fixes to the shared position store.
//! - Throttle writes by elapsed time and distance moved.
//!
//! # Invariants
//! - The first valid fix is always published.
//! - A fix is counted as published only after the store accepted it.

use crate::error::SourceError;
use crate::geo::haversine_distance_meters;
use crate::model::{LocationRecord, PositionSample};
use log::{debug, warn};
use std::sync::Arc;

const DEFAULT_MIN_INTERVAL_MS: i64 = 10_000;
const DEFAULT_MIN_DISTANCE_METERS: f64 = 10.0;

/// Canonical per-patient location document.
pub trait PositionStore: Send + Sync {
    fn publish(&self, patient_id: &str, record: &LocationRecord) -> Result<(), SourceError>;
}

/// Publish when either threshold is reached since the last published fix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PublishPolicy {
    pub min_interval_ms: i64,
    pub min_distance_meters: f64,
}

impl Default for PublishPolicy {
    fn default() -> Self {
        Self {
            min_interval_ms: DEFAULT_MIN_INTERVAL_MS,
            min_distance_meters: DEFAULT_MIN_DISTANCE_METERS,
        }
    }
}

pub struct LocationPublisher {
    patient_id: String,
    store: Arc<dyn PositionStore>,
    policy: PublishPolicy,
    last_published: Option<PositionSample>,
}

impl LocationPublisher {
    pub fn new(
        patient_id: impl Into<String>,
        store: Arc<dyn PositionStore>,
        policy: PublishPolicy,
    ) -> Self {
        Self {
            patient_id: patient_id.into(),
            store,
            policy,
            last_published: None,
        }
    }

    pub fn last_published(&self) -> Option<&PositionSample> {
        self.last_published.as_ref()
    }

    /// Handles one device fix. Returns `true` when it was written.
    pub fn on_fix(&mut self, fix: PositionSample) -> bool {
        if !self.is_due(&fix) {
            return false;
        }

        let record = LocationRecord::new(
            fix.coordinate.latitude,
            fix.coordinate.longitude,
            Some(fix.observed_at_ms),
        );
        match self.store.publish(&self.patient_id, &record) {
            Ok(()) => {
                debug!("event=position_publish module=publisher status=ok");
                self.last_published = Some(fix);
                true
            }
            Err(err) => {
                warn!("event=position_publish module=publisher status=error error={err}");
                false
            }
        }
    }

    fn is_due(&self, fix: &PositionSample) -> bool {
        let Some(last) = &self.last_published else {
            return true;
        };
        let elapsed = fix.observed_at_ms.saturating_sub(last.observed_at_ms);
        if elapsed >= self.policy.min_interval_ms {
            return true;
        }
        haversine_distance_meters(&last.coordinate, &fix.coordinate)
            >= self.policy.min_distance_meters
    }
}
