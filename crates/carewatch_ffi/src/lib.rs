//! FRB bridge crate for CareWatch.
//!
//! # Responsibility
//! - Re-export the Flutter-facing API surface from `api`.

pub mod api;
