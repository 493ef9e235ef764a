//! Spherical geometry used by containment checks and publish throttling.

pub mod containment;

pub use containment::{evaluate, haversine_distance_meters, Containment, EARTH_RADIUS_METERS};
