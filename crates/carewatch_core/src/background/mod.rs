//! Background location collection tied to the host app lifecycle.

pub mod controller;

pub use controller::{AppLifecycle, AppPhase, BackgroundCollectionController, BackgroundSampler};
