//! Alert dispatcher.
//!
//! # Responsibility
//! - On departure: show one in-process alert, send one push notification,
//!   start the blink cycle.
//! - On return or teardown: stop the blink cycle and reset visibility.
//!
//! # Invariants
//! - `on_left` while a cycle is active is a no-op.
//! - A cancelled cycle never toggles visibility again, even if the timer
//!   delivers a late tick.

use crate::alert::timer::{RepeatingTimer, TimerHandle};
use crate::error::DispatchError;
use crate::model::PatientRef;
use log::{info, warn};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Blink toggle period.
pub const DEFAULT_BLINK_INTERVAL: Duration = Duration::from_millis(500);

const ALERT_TITLE: &str = "Geofence Alert";
const NOTIFICATION_TITLE: &str = "Patient Alert";

/// Best-effort push notification delivery.
pub trait NotificationSender: Send + Sync {
    fn send(&self, title: &str, body: &str) -> Result<(), DispatchError>;
}

/// One-time, user-facing in-process alert (dialog/banner).
pub trait AlertPresenter: Send + Sync {
    fn show_alert(&self, title: &str, body: &str);
}

/// Presentational alert state, readable by the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertCycle {
    pub active: bool,
    /// `true` when the highlighted fence should currently be drawn.
    pub blink_phase: bool,
}

#[derive(Debug, Default)]
struct BlinkState {
    hidden: AtomicBool,
    toggles: AtomicU64,
}

struct ActiveCycle {
    timer: TimerHandle,
    armed: Arc<AtomicBool>,
}

/// Alert side effects for one monitoring session.
pub struct AlertDispatcher {
    subject: PatientRef,
    notifier: Arc<dyn NotificationSender>,
    presenter: Arc<dyn AlertPresenter>,
    timer: Arc<dyn RepeatingTimer>,
    blink_interval: Duration,
    blink: Arc<BlinkState>,
    cycle: Option<ActiveCycle>,
}

impl AlertDispatcher {
    pub fn new(
        subject: PatientRef,
        notifier: Arc<dyn NotificationSender>,
        presenter: Arc<dyn AlertPresenter>,
        timer: Arc<dyn RepeatingTimer>,
        blink_interval: Duration,
    ) -> Self {
        Self {
            subject,
            notifier,
            presenter,
            timer,
            blink_interval,
            blink: Arc::new(BlinkState::default()),
            cycle: None,
        }
    }

    /// Current alert cycle snapshot.
    pub fn cycle(&self) -> AlertCycle {
        AlertCycle {
            active: self.cycle.is_some(),
            blink_phase: !self.blink.hidden.load(Ordering::Acquire),
        }
    }

    pub fn is_active(&self) -> bool {
        self.cycle.is_some()
    }

    /// Total visibility toggles since creation.
    pub fn blink_toggles(&self) -> u64 {
        self.blink.toggles.load(Ordering::Acquire)
    }

    /// Handles an `Inside -> Outside` transition.
    ///
    /// The visual alert and blink cycle are active when this returns, even
    /// on `Err`; the error only reports push delivery failure.
    pub fn on_left(&mut self) -> Result<(), DispatchError> {
        if self.cycle.is_some() {
            return Ok(());
        }

        self.start_blink();
        self.presenter
            .show_alert(ALERT_TITLE, &alert_body(&self.subject.display_name));
        info!(
            "event=alert_raised module=alert status=ok patient_id={}",
            self.subject.patient_id
        );

        self.notifier
            .send(
                NOTIFICATION_TITLE,
                &notification_body(&self.subject.display_name),
            )
            .inspect_err(|err| {
                warn!("event=notification_send module=alert status=error error={err}");
            })
    }

    /// Handles an `Outside -> Inside` transition.
    pub fn on_entered(&mut self) {
        if self.stop_blink() {
            info!(
                "event=alert_cleared module=alert status=ok patient_id={}",
                self.subject.patient_id
            );
        }
    }

    /// Stops any running blink cycle. Safe to call repeatedly.
    pub fn shutdown(&mut self) {
        self.stop_blink();
    }

    fn start_blink(&mut self) {
        self.blink.hidden.store(false, Ordering::Release);
        let armed = Arc::new(AtomicBool::new(true));
        let tick_armed = Arc::clone(&armed);
        let blink = Arc::clone(&self.blink);
        let timer = self.timer.schedule_repeating(
            self.blink_interval,
            Box::new(move || {
                if tick_armed.load(Ordering::Acquire) {
                    blink.hidden.fetch_xor(true, Ordering::AcqRel);
                    blink.toggles.fetch_add(1, Ordering::AcqRel);
                }
            }),
        );
        self.cycle = Some(ActiveCycle { timer, armed });
    }

    fn stop_blink(&mut self) -> bool {
        let Some(cycle) = self.cycle.take() else {
            return false;
        };
        cycle.armed.store(false, Ordering::Release);
        self.timer.cancel(cycle.timer);
        self.blink.hidden.store(false, Ordering::Release);
        true
    }
}

impl Drop for AlertDispatcher {
    fn drop(&mut self) {
        self.stop_blink();
    }
}

fn alert_body(name: &str) -> String {
    format!("Patient {name} has left the designated area!")
}

fn notification_body(name: &str) -> String {
    format!("Your patient {name} has left the designated area!")
}

#[cfg(test)]
mod tests {
    use super::{AlertDispatcher, AlertPresenter, NotificationSender, DEFAULT_BLINK_INTERVAL};
    use crate::alert::timer::VirtualTimer;
    use crate::error::DispatchError;
    use crate::model::PatientRef;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Default)]
    struct Recorder {
        sent: Mutex<Vec<(String, String)>>,
        shown: Mutex<Vec<(String, String)>>,
        fail_send: bool,
    }

    impl NotificationSender for Recorder {
        fn send(&self, title: &str, body: &str) -> Result<(), DispatchError> {
            self.sent
                .lock()
                .expect("sent lock")
                .push((title.to_string(), body.to_string()));
            if self.fail_send {
                return Err(DispatchError::new("push service offline"));
            }
            Ok(())
        }
    }

    impl AlertPresenter for Recorder {
        fn show_alert(&self, title: &str, body: &str) {
            self.shown
                .lock()
                .expect("shown lock")
                .push((title.to_string(), body.to_string()));
        }
    }

    fn dispatcher(recorder: &Arc<Recorder>, timer: &Arc<VirtualTimer>) -> AlertDispatcher {
        AlertDispatcher::new(
            PatientRef::new("patient-1", "Ayesha"),
            Arc::clone(recorder) as Arc<dyn NotificationSender>,
            Arc::clone(recorder) as Arc<dyn AlertPresenter>,
            Arc::clone(timer) as Arc<dyn crate::alert::RepeatingTimer>,
            DEFAULT_BLINK_INTERVAL,
        )
    }

    #[test]
    fn on_left_alerts_once_and_blinks() {
        let recorder = Arc::new(Recorder::default());
        let timer = Arc::new(VirtualTimer::new());
        let mut dispatcher = dispatcher(&recorder, &timer);

        dispatcher.on_left().expect("send should succeed");
        dispatcher.on_left().expect("repeat is a no-op");

        let sent = recorder.sent.lock().expect("sent lock").clone();
        assert_eq!(
            sent,
            vec![(
                "Patient Alert".to_string(),
                "Your patient Ayesha has left the designated area!".to_string()
            )]
        );
        let shown = recorder.shown.lock().expect("shown lock").clone();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].0, "Geofence Alert");
        assert_eq!(timer.armed_count(), 1);

        assert!(dispatcher.cycle().blink_phase);
        timer.advance(Duration::from_millis(500));
        assert!(!dispatcher.cycle().blink_phase);
        timer.advance(Duration::from_millis(500));
        assert!(dispatcher.cycle().blink_phase);
        assert_eq!(dispatcher.blink_toggles(), 2);
    }

    #[test]
    fn on_entered_stops_blink_and_restores_visibility() {
        let recorder = Arc::new(Recorder::default());
        let timer = Arc::new(VirtualTimer::new());
        let mut dispatcher = dispatcher(&recorder, &timer);

        dispatcher.on_left().expect("send should succeed");
        timer.advance(Duration::from_millis(500));
        assert!(!dispatcher.cycle().blink_phase);

        dispatcher.on_entered();
        let cycle = dispatcher.cycle();
        assert!(!cycle.active);
        assert!(cycle.blink_phase);
        assert_eq!(timer.armed_count(), 0);

        let toggles = dispatcher.blink_toggles();
        timer.advance(Duration::from_secs(2));
        assert_eq!(dispatcher.blink_toggles(), toggles);
    }

    #[test]
    fn push_failure_keeps_visual_alert() {
        let recorder = Arc::new(Recorder {
            fail_send: true,
            ..Recorder::default()
        });
        let timer = Arc::new(VirtualTimer::new());
        let mut dispatcher = dispatcher(&recorder, &timer);

        let err = dispatcher.on_left().expect_err("send failure is reported");
        assert!(err.to_string().contains("offline"));
        assert!(dispatcher.is_active());
        assert_eq!(recorder.shown.lock().expect("shown lock").len(), 1);

        timer.advance(Duration::from_millis(500));
        assert_eq!(dispatcher.blink_toggles(), 1);
    }

    #[test]
    fn dropping_dispatcher_cancels_timer() {
        let recorder = Arc::new(Recorder::default());
        let timer = Arc::new(VirtualTimer::new());
        let mut dispatcher = dispatcher(&recorder, &timer);
        dispatcher.on_left().expect("send should succeed");

        drop(dispatcher);
        assert_eq!(timer.armed_count(), 0);
    }
}
