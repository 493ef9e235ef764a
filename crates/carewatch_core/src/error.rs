//! Error taxonomy for the monitoring core.
//!
//! # Responsibility
//! - Define one error type per external concern (data, sampler, dispatch,
//!   subscription).
//! - Track which error categories were already surfaced in a session.
//!
//! # Invariants
//! - None of these errors escapes a session update handler; they are logged
//!   and degrade to "keep prior state".
//! - Each [`ErrorCategory`] is surfaced at most once per [`ErrorLedger`].

use serde::Serialize;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// A position or boundary update arrived without usable values.
#[derive(Debug, Clone, PartialEq)]
pub enum MissingDataError {
    /// A required field was absent from the record.
    MissingField(&'static str),
    /// A field was present but NaN or infinite.
    NonFinite(&'static str),
    /// A field was finite but outside its valid range.
    OutOfRange { field: &'static str, value: f64 },
}

impl Display for MissingDataError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "missing field `{field}`"),
            Self::NonFinite(field) => write!(f, "field `{field}` is not a finite number"),
            Self::OutOfRange { field, value } => {
                write!(f, "field `{field}` is out of range: {value}")
            }
        }
    }
}

impl Error for MissingDataError {}

/// Background sampler start/stop failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SamplerError {
    /// The platform refused background location access.
    PermissionDenied(String),
    /// The sampler could not be started or stopped for another reason.
    Unavailable(String),
}

impl Display for SamplerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PermissionDenied(details) => {
                write!(f, "background location permission denied: {details}")
            }
            Self::Unavailable(details) => write!(f, "background sampler unavailable: {details}"),
        }
    }
}

impl Error for SamplerError {}

/// Push notification delivery failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchError {
    pub message: String,
}

impl DispatchError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Display for DispatchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "notification dispatch failed: {}", self.message)
    }
}

impl Error for DispatchError {}

/// Position/geofence store failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    InvalidPatientId(String),
    SubscribeFailed { source: &'static str, message: String },
    PublishFailed(String),
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidPatientId(value) => write!(f, "patient id is invalid: `{value}`"),
            Self::SubscribeFailed { source, message } => {
                write!(f, "{source} subscription failed: {message}")
            }
            Self::PublishFailed(message) => write!(f, "position publish failed: {message}"),
        }
    }
}

impl Error for SourceError {}

/// Distinct error kinds surfaced to the user at most once per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    MissingData,
    PermissionDenied,
    SamplerUnavailable,
    Dispatch,
    Subscription,
}

impl ErrorCategory {
    /// Stable id used in log lines and FFI envelopes.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MissingData => "missing_data",
            Self::PermissionDenied => "permission_denied",
            Self::SamplerUnavailable => "sampler_unavailable",
            Self::Dispatch => "dispatch",
            Self::Subscription => "subscription",
        }
    }
}

impl From<&SamplerError> for ErrorCategory {
    fn from(value: &SamplerError) -> Self {
        match value {
            SamplerError::PermissionDenied(_) => Self::PermissionDenied,
            SamplerError::Unavailable(_) => Self::SamplerUnavailable,
        }
    }
}

/// Records surfaced error categories so recurring failures do not spam.
#[derive(Debug, Default, Clone)]
pub struct ErrorLedger {
    surfaced: BTreeSet<ErrorCategory>,
}

impl ErrorLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` only the first time `category` is recorded.
    pub fn record(&mut self, category: ErrorCategory) -> bool {
        self.surfaced.insert(category)
    }

    pub fn contains(&self, category: ErrorCategory) -> bool {
        self.surfaced.contains(&category)
    }

    /// Surfaced categories in stable order.
    pub fn categories(&self) -> Vec<ErrorCategory> {
        self.surfaced.iter().copied().collect()
    }
}
