//! Monitoring session: one caretaker watching one patient.
//!
//! # Responsibility
//! - Own the monitor, alert dispatcher and background controller together
//!   with both source subscriptions.
//! - Apply queued updates in receipt order, one at a time.
//! - Release every resource on teardown.
//!
//! # Invariants
//! - Data flows one way: update -> evaluation -> state -> alert side effects.
//! - No update handler returns an error or panics on bad input; failures are
//!   logged and surfaced once per `ErrorCategory`.
//! - Teardown is idempotent and also runs on drop.

pub mod snapshot;

pub use snapshot::{FenceOverlay, MonitorSnapshot};

use crate::alert::{AlertDispatcher, AlertPresenter, NotificationSender, RepeatingTimer};
use crate::background::{AppLifecycle, BackgroundCollectionController, BackgroundSampler};
use crate::config::{ConfigError, MonitorConfig};
use crate::error::{ErrorCategory, ErrorLedger, SourceError};
use crate::model::{LocationRecord, PatientRef};
use crate::monitor::{GeofenceMonitor, Transition};
use crate::source::sink::now_epoch_ms;
use crate::source::{
    update_channel, GeofenceSource, PositionSource, ReceivedUpdate, SourceUpdate,
    SubscriptionHandle,
};
use log::{debug, info, warn};
use snapshot::SnapshotInput;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use uuid::Uuid;

/// External capabilities a session is wired to.
#[derive(Clone)]
pub struct Collaborators {
    pub positions: Arc<dyn PositionSource>,
    pub geofences: Arc<dyn GeofenceSource>,
    pub notifier: Arc<dyn NotificationSender>,
    pub presenter: Arc<dyn AlertPresenter>,
    pub sampler: Arc<dyn BackgroundSampler>,
    pub timer: Arc<dyn RepeatingTimer>,
}

/// Session start failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    Config(ConfigError),
    Source(SourceError),
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
            Self::Source(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SessionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Source(err) => Some(err),
        }
    }
}

impl SessionError {
    /// Category to surface for this failure; config errors are caller bugs.
    pub fn category(&self) -> Option<ErrorCategory> {
        match self {
            Self::Config(_) => None,
            Self::Source(_) => Some(ErrorCategory::Subscription),
        }
    }
}

impl From<ConfigError> for SessionError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<SourceError> for SessionError {
    fn from(value: SourceError) -> Self {
        Self::Source(value)
    }
}

struct Subscriptions {
    position: SubscriptionHandle,
    geofence: SubscriptionHandle,
}

pub struct MonitorSession {
    id: Uuid,
    patient: PatientRef,
    monitor: GeofenceMonitor,
    dispatcher: AlertDispatcher,
    background: BackgroundCollectionController,
    positions: Arc<dyn PositionSource>,
    geofences: Arc<dyn GeofenceSource>,
    subscriptions: Option<Subscriptions>,
    updates: Option<Receiver<ReceivedUpdate>>,
    ledger: ErrorLedger,
}

impl MonitorSession {
    /// Subscribes to both sources and returns a live session.
    ///
    /// Updates already retained by the sources are queued immediately and
    /// applied on the first [`pump`](Self::pump).
    pub fn start(
        patient: PatientRef,
        config: MonitorConfig,
        collaborators: Collaborators,
    ) -> Result<Self, SessionError> {
        config.validate()?;

        let (position_sink, geofence_sink, updates) = update_channel();
        let position = collaborators
            .positions
            .subscribe(&patient, position_sink)
            .map_err(|err| subscribe_failed(&patient, err))?;
        let geofence = match collaborators.geofences.subscribe(&patient, geofence_sink) {
            Ok(handle) => handle,
            Err(err) => {
                collaborators.positions.unsubscribe(position);
                return Err(subscribe_failed(&patient, err));
            }
        };

        let id = Uuid::new_v4();
        info!(
            "event=session_start module=session status=ok session_id={id} patient_id={}",
            patient.patient_id
        );

        Ok(Self {
            id,
            dispatcher: AlertDispatcher::new(
                patient.clone(),
                collaborators.notifier,
                collaborators.presenter,
                collaborators.timer,
                config.blink_interval(),
            ),
            background: BackgroundCollectionController::new(
                collaborators.sampler,
                config.background,
                config.background_updates_position,
            ),
            patient,
            monitor: GeofenceMonitor::new(),
            positions: collaborators.positions,
            geofences: collaborators.geofences,
            subscriptions: Some(Subscriptions { position, geofence }),
            updates: Some(updates),
            ledger: ErrorLedger::new(),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn patient(&self) -> &PatientRef {
        &self.patient
    }

    pub fn monitor(&self) -> &GeofenceMonitor {
        &self.monitor
    }

    pub fn dispatcher(&self) -> &AlertDispatcher {
        &self.dispatcher
    }

    pub fn is_torn_down(&self) -> bool {
        self.updates.is_none()
    }

    /// Error categories surfaced so far, in stable order.
    pub fn surfaced_errors(&self) -> Vec<ErrorCategory> {
        self.ledger.categories()
    }

    /// Applies every queued update in receipt order.
    ///
    /// Returns the transitions produced, in order. No-op after teardown.
    pub fn pump(&mut self) -> Vec<Transition> {
        let pending: Vec<ReceivedUpdate> = match &self.updates {
            Some(updates) => updates.try_iter().collect(),
            None => return Vec::new(),
        };
        pending
            .into_iter()
            .filter_map(|received| self.apply(received))
            .collect()
    }

    /// Lifecycle notifier entry point.
    pub fn on_lifecycle(&mut self, event: AppLifecycle) {
        if self.is_torn_down() {
            return;
        }
        if let Err(err) = self.background.on_lifecycle(event) {
            self.report(ErrorCategory::from(&err), &err);
        }
    }

    /// Delivery point for the background sampling task.
    pub fn on_background_sample(&mut self, record: LocationRecord) -> Option<Transition> {
        if self.is_torn_down() {
            return None;
        }
        let record = self.background.accept_sample(record)?;
        self.apply(ReceivedUpdate {
            update: SourceUpdate::Position(record),
            received_at_ms: now_epoch_ms(),
        })
    }

    pub fn snapshot(&self) -> MonitorSnapshot {
        let cycle = self.dispatcher.cycle();
        MonitorSnapshot::build(SnapshotInput {
            session_id: self.id.to_string(),
            patient_id: &self.patient.patient_id,
            display_name: &self.patient.display_name,
            state: self.monitor.state(),
            distance_meters: self.monitor.last_distance_meters(),
            position: self.monitor.last_evaluated().map(|sample| sample.coordinate),
            geofence: self.monitor.last_boundary().copied(),
            alert_active: cycle.active,
            blink_visible: cycle.blink_phase,
            background_sampling: self.background.is_running(),
            errors: self.ledger.categories(),
        })
    }

    /// Unsubscribes both sources, cancels the blink timer and stops
    /// background sampling. Safe to call more than once.
    pub fn teardown(&mut self) {
        let Some(updates) = self.updates.take() else {
            return;
        };
        drop(updates);

        if let Some(subscriptions) = self.subscriptions.take() {
            self.positions.unsubscribe(subscriptions.position);
            self.geofences.unsubscribe(subscriptions.geofence);
        }
        self.dispatcher.shutdown();
        if let Err(err) = self.background.stop() {
            self.report(ErrorCategory::from(&err), &err);
        }

        info!(
            "event=session_teardown module=session status=ok session_id={}",
            self.id
        );
    }

    fn apply(&mut self, received: ReceivedUpdate) -> Option<Transition> {
        let result = match &received.update {
            SourceUpdate::Position(record) => self
                .monitor
                .apply_location_record(record, received.received_at_ms),
            SourceUpdate::Geofence(record) => self
                .monitor
                .apply_geofence_record(record, received.received_at_ms),
        };

        let transition = match result {
            Ok(transition) => transition?,
            Err(err) => {
                self.report(ErrorCategory::MissingData, &err);
                return None;
            }
        };

        match transition {
            Transition::Left => {
                if let Err(err) = self.dispatcher.on_left() {
                    self.report(ErrorCategory::Dispatch, &err);
                }
            }
            Transition::Entered => self.dispatcher.on_entered(),
        }
        Some(transition)
    }

    fn report(&mut self, category: ErrorCategory, err: &dyn Display) {
        if self.ledger.record(category) {
            warn!(
                "event=session_error module=session status=error session_id={} category={} error={err}",
                self.id,
                category.as_str()
            );
        } else {
            debug!(
                "event=session_error module=session status=repeat session_id={} category={}",
                self.id,
                category.as_str()
            );
        }
    }
}

fn subscribe_failed(patient: &PatientRef, err: SourceError) -> SessionError {
    let err = SessionError::from(err);
    if let Some(category) = err.category() {
        warn!(
            "event=session_start module=session status=error category={} patient_id={} error={err}",
            category.as_str(),
            patient.patient_id
        );
    }
    err
}

impl Drop for MonitorSession {
    fn drop(&mut self) {
        self.teardown();
    }
}
