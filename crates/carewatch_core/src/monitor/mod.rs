//! Geofence monitor: edge-triggered containment state machine.

pub mod state_machine;

pub use state_machine::{ContainmentState, GeofenceMonitor, Transition};
