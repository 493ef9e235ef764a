//! Typed delivery endpoints over one shared session channel.

use crate::model::{GeofenceRecord, LocationRecord};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::time::{SystemTime, UNIX_EPOCH};

/// One update from either source.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceUpdate {
    Position(LocationRecord),
    Geofence(GeofenceRecord),
}

/// An update stamped with its local receipt time.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceivedUpdate {
    pub update: SourceUpdate,
    /// Unix epoch milliseconds.
    pub received_at_ms: i64,
}

/// Delivery endpoint handed to a source on subscribe.
pub struct UpdateSink<T> {
    tx: Sender<ReceivedUpdate>,
    wrap: fn(T) -> SourceUpdate,
}

pub type PositionSink = UpdateSink<LocationRecord>;
pub type GeofenceSink = UpdateSink<GeofenceRecord>;

impl<T> Clone for UpdateSink<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            wrap: self.wrap,
        }
    }
}

impl<T> UpdateSink<T> {
    /// Queues `value` for the session.
    ///
    /// Returns `false` once the session has been torn down.
    pub fn deliver(&self, value: T) -> bool {
        self.tx
            .send(ReceivedUpdate {
                update: (self.wrap)(value),
                received_at_ms: now_epoch_ms(),
            })
            .is_ok()
    }
}

/// Creates the per-session channel and its two typed sinks.
pub fn update_channel() -> (PositionSink, GeofenceSink, Receiver<ReceivedUpdate>) {
    let (tx, rx) = channel();
    let positions = UpdateSink {
        tx: tx.clone(),
        wrap: SourceUpdate::Position,
    };
    let geofences = UpdateSink {
        tx,
        wrap: SourceUpdate::Geofence,
    };
    (positions, geofences, rx)
}

pub(crate) fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or(0)
}
