//! Background collection controller.
//!
//! # Responsibility
//! - Start the platform background sampler when the app is backgrounded.
//! - Stop it again when the app returns to the foreground.
//!
//! # Invariants
//! - `start` on a running sampler and `stop` on a stopped one are no-ops.
//! - A failed start leaves the controller stopped; the session keeps
//!   monitoring in foreground-only mode.

use crate::config::SamplerConfig;
use crate::error::SamplerError;
use crate::model::LocationRecord;
use log::{debug, info, warn};
use std::sync::Arc;

/// Platform background location task.
pub trait BackgroundSampler: Send + Sync {
    fn start(&self, config: &SamplerConfig) -> Result<(), SamplerError>;
    fn stop(&self) -> Result<(), SamplerError>;
}

/// Host process lifecycle notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppLifecycle {
    /// The app is visible and interactive.
    Active,
    /// Transitional state (incoming call, app switcher). Ignored.
    Inactive,
    Background,
}

/// Foreground/background phase tracked by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppPhase {
    Foreground,
    Background,
}

pub struct BackgroundCollectionController {
    sampler: Arc<dyn BackgroundSampler>,
    config: SamplerConfig,
    forward_samples: bool,
    phase: AppPhase,
    running: bool,
}

impl BackgroundCollectionController {
    pub fn new(
        sampler: Arc<dyn BackgroundSampler>,
        config: SamplerConfig,
        forward_samples: bool,
    ) -> Self {
        Self {
            sampler,
            config,
            forward_samples,
            phase: AppPhase::Foreground,
            running: false,
        }
    }

    pub fn phase(&self) -> AppPhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Applies one lifecycle notification.
    pub fn on_lifecycle(&mut self, event: AppLifecycle) -> Result<(), SamplerError> {
        match event {
            AppLifecycle::Background => {
                self.phase = AppPhase::Background;
                self.start()
            }
            AppLifecycle::Active => {
                self.phase = AppPhase::Foreground;
                self.stop()
            }
            AppLifecycle::Inactive => Ok(()),
        }
    }

    pub fn start(&mut self) -> Result<(), SamplerError> {
        if self.running {
            return Ok(());
        }
        match self.sampler.start(&self.config) {
            Ok(()) => {
                self.running = true;
                info!(
                    "event=background_sampling module=background status=started accuracy={:?} min_distance_m={} min_interval_ms={}",
                    self.config.accuracy, self.config.min_distance_meters, self.config.min_interval_ms
                );
                Ok(())
            }
            Err(err) => {
                warn!("event=background_sampling module=background status=error op=start error={err}");
                Err(err)
            }
        }
    }

    /// Stops sampling. The controller is considered stopped afterwards even
    /// if the platform reported an error.
    pub fn stop(&mut self) -> Result<(), SamplerError> {
        if !self.running {
            return Ok(());
        }
        self.running = false;
        match self.sampler.stop() {
            Ok(()) => {
                info!("event=background_sampling module=background status=stopped");
                Ok(())
            }
            Err(err) => {
                warn!("event=background_sampling module=background status=error op=stop error={err}");
                Err(err)
            }
        }
    }

    /// Filters a sample delivered by the background task.
    ///
    /// Returns the record when background samples should update the monitored
    /// position, `None` when they only keep the OS task alive.
    pub fn accept_sample(&self, record: LocationRecord) -> Option<LocationRecord> {
        if self.forward_samples {
            Some(record)
        } else {
            debug!("event=background_sample module=background status=dropped");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AppLifecycle, AppPhase, BackgroundCollectionController, BackgroundSampler};
    use crate::config::SamplerConfig;
    use crate::error::SamplerError;
    use crate::model::LocationRecord;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct CountingSampler {
        starts: AtomicUsize,
        stops: AtomicUsize,
        deny: AtomicBool,
    }

    impl BackgroundSampler for CountingSampler {
        fn start(&self, _config: &SamplerConfig) -> Result<(), SamplerError> {
            self.starts.fetch_add(1, Ordering::SeqCst);
            if self.deny.load(Ordering::SeqCst) {
                return Err(SamplerError::PermissionDenied("not granted".to_string()));
            }
            Ok(())
        }

        fn stop(&self) -> Result<(), SamplerError> {
            self.stops.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn controller(sampler: &Arc<CountingSampler>, forward: bool) -> BackgroundCollectionController {
        BackgroundCollectionController::new(
            Arc::clone(sampler) as Arc<dyn BackgroundSampler>,
            SamplerConfig::default(),
            forward,
        )
    }

    #[test]
    fn lifecycle_starts_and_stops_sampling() {
        let sampler = Arc::new(CountingSampler::default());
        let mut controller = controller(&sampler, false);

        controller
            .on_lifecycle(AppLifecycle::Background)
            .expect("start should succeed");
        assert_eq!(controller.phase(), AppPhase::Background);
        assert!(controller.is_running());

        controller
            .on_lifecycle(AppLifecycle::Inactive)
            .expect("inactive is ignored");
        assert!(controller.is_running());

        controller
            .on_lifecycle(AppLifecycle::Active)
            .expect("stop should succeed");
        assert_eq!(controller.phase(), AppPhase::Foreground);
        assert!(!controller.is_running());
        assert_eq!(sampler.starts.load(Ordering::SeqCst), 1);
        assert_eq!(sampler.stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn redundant_start_and_stop_are_no_ops() {
        let sampler = Arc::new(CountingSampler::default());
        let mut controller = controller(&sampler, false);

        controller.stop().expect("stop while stopped");
        controller.stop().expect("second stop while stopped");
        controller.start().expect("first start");
        controller.start().expect("second start");
        controller.stop().expect("first stop");
        controller.stop().expect("second stop");

        assert!(!controller.is_running());
        assert_eq!(sampler.starts.load(Ordering::SeqCst), 1);
        assert_eq!(sampler.stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn permission_denied_leaves_controller_stopped() {
        let sampler = Arc::new(CountingSampler::default());
        sampler.deny.store(true, Ordering::SeqCst);
        let mut controller = controller(&sampler, false);

        let err = controller
            .on_lifecycle(AppLifecycle::Background)
            .expect_err("denied start is reported");
        assert!(matches!(err, SamplerError::PermissionDenied(_)));
        assert!(!controller.is_running());
        assert_eq!(controller.phase(), AppPhase::Background);

        controller
            .on_lifecycle(AppLifecycle::Active)
            .expect("stop without running task");
        assert_eq!(sampler.stops.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn forwards_samples_only_when_configured() {
        let sampler = Arc::new(CountingSampler::default());
        let record = LocationRecord::new(1.0, 2.0, Some(3));

        assert_eq!(controller(&sampler, false).accept_sample(record.clone()), None);
        assert_eq!(
            controller(&sampler, true).accept_sample(record.clone()),
            Some(record)
        );
    }
}
