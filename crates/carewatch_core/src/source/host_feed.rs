//! In-process source that a host pushes records into.
//!
//! Behaves like a live document listener: the latest record per patient is
//! retained and replayed to new subscribers, and every later push is fanned
//! out to all live subscriptions for that patient.

use crate::error::SourceError;
use crate::model::{GeofenceRecord, LocationRecord, PatientRef};
use crate::publisher::PositionStore;
use crate::source::{
    GeofenceSink, GeofenceSource, PositionSink, PositionSource, SubscriptionHandle, UpdateSink,
};
use log::debug;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

struct Subscriber<T> {
    patient_id: String,
    sink: UpdateSink<T>,
}

struct Topic<T> {
    latest: BTreeMap<String, T>,
    subscribers: BTreeMap<u64, Subscriber<T>>,
}

impl<T> Default for Topic<T> {
    fn default() -> Self {
        Self {
            latest: BTreeMap::new(),
            subscribers: BTreeMap::new(),
        }
    }
}

impl<T: Clone> Topic<T> {
    fn subscribe(&mut self, id: u64, patient_id: &str, sink: UpdateSink<T>) {
        if let Some(latest) = self.latest.get(patient_id) {
            sink.deliver(latest.clone());
        }
        self.subscribers.insert(
            id,
            Subscriber {
                patient_id: patient_id.to_string(),
                sink,
            },
        );
    }

    fn push(&mut self, patient_id: &str, value: T) -> usize {
        self.latest.insert(patient_id.to_string(), value.clone());
        let mut delivered = 0;
        // Subscribers whose session is gone are pruned on the next push.
        self.subscribers.retain(|_, subscriber| {
            if subscriber.patient_id != patient_id {
                return true;
            }
            let alive = subscriber.sink.deliver(value.clone());
            if alive {
                delivered += 1;
            }
            alive
        });
        delivered
    }

    fn count_for(&self, patient_id: &str) -> usize {
        self.subscribers
            .values()
            .filter(|subscriber| subscriber.patient_id == patient_id)
            .count()
    }
}

#[derive(Default)]
struct FeedState {
    next_id: u64,
    positions: Topic<LocationRecord>,
    geofences: Topic<GeofenceRecord>,
}

/// Host-driven implementation of both source contracts.
#[derive(Default)]
pub struct HostFeed {
    state: Mutex<FeedState>,
}

impl HostFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes a location record; returns how many sessions received it.
    pub fn push_position(&self, patient_id: &str, record: LocationRecord) -> usize {
        self.lock().positions.push(patient_id.trim(), record)
    }

    /// Publishes a fence record, replacing the previous one for the patient.
    pub fn push_geofence(&self, patient_id: &str, record: GeofenceRecord) -> usize {
        self.lock().geofences.push(patient_id.trim(), record)
    }

    /// Live `(position, geofence)` subscription counts for a patient.
    pub fn subscriber_counts(&self, patient_id: &str) -> (usize, usize) {
        let state = self.lock();
        (
            state.positions.count_for(patient_id),
            state.geofences.count_for(patient_id),
        )
    }

    fn lock(&self) -> MutexGuard<'_, FeedState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn allocate(
        &self,
        patient: &PatientRef,
    ) -> Result<(MutexGuard<'_, FeedState>, u64), SourceError> {
        if !patient.has_valid_id() {
            return Err(SourceError::InvalidPatientId(patient.patient_id.clone()));
        }
        let mut state = self.lock();
        state.next_id += 1;
        let id = state.next_id;
        Ok((state, id))
    }
}

impl PositionSource for HostFeed {
    fn subscribe(
        &self,
        patient: &PatientRef,
        sink: PositionSink,
    ) -> Result<SubscriptionHandle, SourceError> {
        let (mut state, id) = self.allocate(patient)?;
        state.positions.subscribe(id, &patient.patient_id, sink);
        debug!("event=source_subscribe module=source status=ok stream=position handle={id}");
        Ok(SubscriptionHandle(id))
    }

    fn unsubscribe(&self, handle: SubscriptionHandle) {
        self.lock().positions.subscribers.remove(&handle.0);
    }
}

impl GeofenceSource for HostFeed {
    fn subscribe(
        &self,
        patient: &PatientRef,
        sink: GeofenceSink,
    ) -> Result<SubscriptionHandle, SourceError> {
        let (mut state, id) = self.allocate(patient)?;
        state.geofences.subscribe(id, &patient.patient_id, sink);
        debug!("event=source_subscribe module=source status=ok stream=geofence handle={id}");
        Ok(SubscriptionHandle(id))
    }

    fn unsubscribe(&self, handle: SubscriptionHandle) {
        self.lock().geofences.subscribers.remove(&handle.0);
    }
}

impl PositionStore for HostFeed {
    fn publish(&self, patient_id: &str, record: &LocationRecord) -> Result<(), SourceError> {
        if patient_id.trim().is_empty() {
            return Err(SourceError::PublishFailed("patient id is empty".to_string()));
        }
        self.push_position(patient_id, record.clone());
        Ok(())
    }
}
