//! Explicit monitoring context passed to collaborators.

use serde::{Deserialize, Serialize};

/// The monitored patient, as seen by one caretaker session.
///
/// Passed explicitly into sources and alert texts; the core never reads the
/// signed-in user from ambient state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientRef {
    pub patient_id: String,
    pub display_name: String,
}

impl PatientRef {
    pub fn new(patient_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            patient_id: patient_id.into().trim().to_string(),
            display_name: display_name.into().trim().to_string(),
        }
    }

    /// Store document ids are non-empty and contain no path separators.
    pub fn has_valid_id(&self) -> bool {
        !self.patient_id.is_empty() && !self.patient_id.contains('/')
    }
}

#[cfg(test)]
mod tests {
    use super::PatientRef;

    #[test]
    fn trims_and_validates_patient_id() {
        let patient = PatientRef::new("  abc123  ", " Ayesha ");
        assert_eq!(patient.patient_id, "abc123");
        assert_eq!(patient.display_name, "Ayesha");
        assert!(patient.has_valid_id());

        assert!(!PatientRef::new("   ", "x").has_valid_id());
        assert!(!PatientRef::new("users/abc", "x").has_valid_id());
    }
}
