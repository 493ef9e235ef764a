//! Core monitoring logic for CareWatch.
//! This crate owns the geofence invariants; UI and platform services plug in
//! through the collaborator traits re-exported below.

pub mod alert;
pub mod background;
pub mod config;
pub mod error;
pub mod geo;
pub mod geofence_draft;
pub mod logging;
pub mod model;
pub mod monitor;
pub mod publisher;
pub mod session;
pub mod source;

pub use alert::{
    AlertCycle, AlertDispatcher, AlertPresenter, NotificationSender, RepeatingTimer, ThreadTimer,
    TimerHandle, VirtualTimer,
};
pub use background::{AppLifecycle, AppPhase, BackgroundCollectionController, BackgroundSampler};
pub use config::{ConfigError, MonitorConfig, SamplerConfig, SamplingAccuracy};
pub use error::{
    DispatchError, ErrorCategory, ErrorLedger, MissingDataError, SamplerError, SourceError,
};
pub use geo::{evaluate, haversine_distance_meters, Containment, EARTH_RADIUS_METERS};
pub use geofence_draft::{GeofenceDraft, GeofenceDraftError};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::{
    Coordinate, Geofence, GeofenceDocument, GeofenceRecord, LocationRecord, PatientRef,
    PositionSample,
};
pub use monitor::{ContainmentState, GeofenceMonitor, Transition};
pub use publisher::{LocationPublisher, PositionStore, PublishPolicy};
pub use session::{Collaborators, FenceOverlay, MonitorSession, MonitorSnapshot, SessionError};
pub use source::{
    GeofenceSink, GeofenceSource, HostFeed, PositionSink, PositionSource, SubscriptionHandle,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
