//! Alert side effects driven by monitor transitions.
//!
//! # Responsibility
//! - Present a one-time alert and send one push notification per departure.
//! - Run the presentational blink cycle while the subject is outside.
//!
//! # Invariants
//! - The blink path never depends on push delivery success.
//! - Every scheduled blink timer is cancelled on return or teardown.

pub mod dispatcher;
pub mod timer;

pub use dispatcher::{
    AlertCycle, AlertDispatcher, AlertPresenter, NotificationSender, DEFAULT_BLINK_INTERVAL,
};
pub use timer::{RepeatingTimer, ThreadTimer, TimerHandle, TimerTick, VirtualTimer};
