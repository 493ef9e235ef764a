//! Containment evaluator.
//!
//! # Responsibility
//! - Compute great-circle distance with the haversine formula.
//! - Decide whether a position lies inside a fence (closed disk).
//!
//! # Invariants
//! - Pure and deterministic: no I/O, no logging, no clock reads.
//! - A point exactly on the boundary is inside.

use crate::model::{Coordinate, Geofence};

/// Mean Earth radius in meters (spherical model).
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Result of evaluating one position against one fence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Containment {
    pub inside: bool,
    pub distance_meters: f64,
}

/// Great-circle distance between two coordinates in meters.
pub fn haversine_distance_meters(from: &Coordinate, to: &Coordinate) -> f64 {
    let phi_1 = from.latitude.to_radians();
    let phi_2 = to.latitude.to_radians();
    let delta_phi = (to.latitude - from.latitude).to_radians();
    let delta_lambda = (to.longitude - from.longitude).to_radians();

    let a = (delta_phi / 2.0).sin().powi(2)
        + phi_1.cos() * phi_2.cos() * (delta_lambda / 2.0).sin().powi(2);
    // Rounding can push `a` past 1.0 near antipodes.
    let a = a.clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_METERS * c
}

/// Evaluates `position` against `boundary`.
pub fn evaluate(position: &Coordinate, boundary: &Geofence) -> Containment {
    let distance_meters = haversine_distance_meters(position, &boundary.center);
    Containment {
        inside: distance_meters <= boundary.radius_meters,
        distance_meters,
    }
}
