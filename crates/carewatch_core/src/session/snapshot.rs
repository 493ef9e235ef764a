//! Presentation model for the live-location screen.

use crate::error::ErrorCategory;
use crate::model::{Coordinate, Geofence};
use crate::monitor::ContainmentState;
use serde::Serialize;

const INSIDE_MARKER_COLOR: &str = "#3A5A40";
const OUTSIDE_MARKER_COLOR: &str = "#D22B2B";

/// Fence circle styling.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FenceOverlay {
    pub fill_color: &'static str,
    pub stroke_color: &'static str,
    /// `false` on the hidden half of a blink cycle.
    pub visible: bool,
}

/// Everything the UI needs to render one monitoring session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonitorSnapshot {
    pub session_id: String,
    pub patient_id: String,
    pub display_name: String,
    pub state: ContainmentState,
    pub distance_meters: Option<f64>,
    pub position: Option<Coordinate>,
    pub geofence: Option<Geofence>,
    pub status_text: String,
    pub alert_text: Option<String>,
    pub marker_color: &'static str,
    pub fence_overlay: Option<FenceOverlay>,
    pub alert_active: bool,
    pub blink_visible: bool,
    pub background_sampling: bool,
    pub errors: Vec<ErrorCategory>,
}

/// Raw session facts the snapshot is derived from.
pub(crate) struct SnapshotInput<'a> {
    pub session_id: String,
    pub patient_id: &'a str,
    pub display_name: &'a str,
    pub state: ContainmentState,
    pub distance_meters: Option<f64>,
    pub position: Option<Coordinate>,
    pub geofence: Option<Geofence>,
    pub alert_active: bool,
    pub blink_visible: bool,
    pub background_sampling: bool,
    pub errors: Vec<ErrorCategory>,
}

impl MonitorSnapshot {
    pub(crate) fn build(input: SnapshotInput<'_>) -> Self {
        let inside = input.state == ContainmentState::Inside;
        let fence_overlay = input.geofence.map(|_| {
            if inside {
                FenceOverlay {
                    fill_color: "rgba(100, 200, 100, 0.2)",
                    stroke_color: "rgba(100, 200, 100, 0.8)",
                    visible: true,
                }
            } else {
                FenceOverlay {
                    fill_color: "rgba(255, 0, 0, 0.2)",
                    stroke_color: "rgba(255, 0, 0, 0.8)",
                    visible: input.blink_visible,
                }
            }
        });

        Self {
            session_id: input.session_id,
            patient_id: input.patient_id.to_string(),
            display_name: input.display_name.to_string(),
            state: input.state,
            distance_meters: input.distance_meters,
            position: input.position,
            geofence: input.geofence,
            status_text: if inside {
                "Inside Safe Area".to_string()
            } else {
                "OUTSIDE SAFE AREA!".to_string()
            },
            alert_text: (!inside).then(|| {
                format!(
                    "Alert! {} has left the designated area.",
                    input.display_name
                )
            }),
            marker_color: if inside {
                INSIDE_MARKER_COLOR
            } else {
                OUTSIDE_MARKER_COLOR
            },
            fence_overlay,
            alert_active: input.alert_active,
            blink_visible: input.blink_visible,
            background_sampling: input.background_sampling,
            errors: input.errors,
        }
    }
}
