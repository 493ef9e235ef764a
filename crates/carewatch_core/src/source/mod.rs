//! Position and geofence source contracts.
//!
//! # Responsibility
//! - Define subscribe/unsubscribe contracts for the two update streams.
//! - Funnel both streams into one per-session channel so updates are applied
//!   in receipt order.
//!
//! # Invariants
//! - A sink whose session ended rejects deliveries instead of buffering them.

pub mod host_feed;
pub mod sink;

pub use host_feed::HostFeed;
pub use sink::{
    update_channel, GeofenceSink, PositionSink, ReceivedUpdate, SourceUpdate, UpdateSink,
};

use crate::error::SourceError;
use crate::model::PatientRef;

/// Opaque id of one live subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionHandle(pub u64);

/// Stream of location records for one patient.
pub trait PositionSource: Send + Sync {
    fn subscribe(
        &self,
        patient: &PatientRef,
        sink: PositionSink,
    ) -> Result<SubscriptionHandle, SourceError>;

    fn unsubscribe(&self, handle: SubscriptionHandle);
}

/// Stream of fence records for one patient.
pub trait GeofenceSource: Send + Sync {
    fn subscribe(
        &self,
        patient: &PatientRef,
        sink: GeofenceSink,
    ) -> Result<SubscriptionHandle, SourceError>;

    fn unsubscribe(&self, handle: SubscriptionHandle);
}
