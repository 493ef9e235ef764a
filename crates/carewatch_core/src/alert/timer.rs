//! Cancellable repeating timers.
//!
//! `VirtualTimer` advances only when told to, so blink behavior can be
//! asserted without wall-clock sleeps. `ThreadTimer` is the wall-clock
//! implementation for hosts without their own timer primitive.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Callback run on every timer tick.
pub type TimerTick = Box<dyn FnMut() + Send>;

/// Opaque id of one scheduled repeating timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerHandle(u64);

/// Repeating timer capability injected into the alert dispatcher.
pub trait RepeatingTimer: Send + Sync {
    /// Runs `tick` every `interval` until cancelled. The first tick happens
    /// one full interval after scheduling.
    fn schedule_repeating(&self, interval: Duration, tick: TimerTick) -> TimerHandle;

    /// Stops a timer. Unknown or already-cancelled handles are ignored.
    fn cancel(&self, handle: TimerHandle);
}

struct VirtualEntry {
    interval: Duration,
    next_due: Duration,
    tick: TimerTick,
}

#[derive(Default)]
struct VirtualState {
    now: Duration,
    next_id: u64,
    entries: BTreeMap<u64, VirtualEntry>,
}

/// Deterministic timer driven by [`VirtualTimer::advance`].
///
/// Ticks run while the internal lock is held, so a tick must not call back
/// into the same timer.
#[derive(Default)]
pub struct VirtualTimer {
    state: Mutex<VirtualState>,
}

impl VirtualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Virtual time elapsed since creation.
    pub fn now(&self) -> Duration {
        self.lock().now
    }

    /// Number of timers still scheduled.
    pub fn armed_count(&self) -> usize {
        self.lock().entries.len()
    }

    /// Moves virtual time forward, firing due ticks in time order.
    ///
    /// Returns the number of ticks fired.
    pub fn advance(&self, by: Duration) -> usize {
        let mut state = self.lock();
        let target = state.now + by;
        let mut fired = 0;

        loop {
            let due = state
                .entries
                .iter()
                .filter(|(_, entry)| entry.next_due <= target)
                .min_by_key(|(id, entry)| (entry.next_due, **id))
                .map(|(id, _)| *id);
            let Some(id) = due else {
                break;
            };

            if let Some(entry) = state.entries.get_mut(&id) {
                let due_at = entry.next_due;
                entry.next_due = due_at + entry.interval;
                (entry.tick)();
                state.now = due_at;
                fired += 1;
            }
        }

        state.now = target;
        fired
    }

    fn lock(&self) -> MutexGuard<'_, VirtualState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl RepeatingTimer for VirtualTimer {
    fn schedule_repeating(&self, interval: Duration, tick: TimerTick) -> TimerHandle {
        let mut state = self.lock();
        let interval = interval.max(Duration::from_millis(1));
        state.next_id += 1;
        let id = state.next_id;
        let next_due = state.now + interval;
        state.entries.insert(
            id,
            VirtualEntry {
                interval,
                next_due,
                tick,
            },
        );
        TimerHandle(id)
    }

    fn cancel(&self, handle: TimerHandle) {
        self.lock().entries.remove(&handle.0);
    }
}

/// Wall-clock timer running each schedule on its own thread.
#[derive(Default)]
pub struct ThreadTimer {
    next_id: AtomicU64,
    running: Mutex<BTreeMap<u64, Arc<AtomicBool>>>,
}

impl ThreadTimer {
    pub fn new() -> Self {
        Self::default()
    }

    fn running(&self) -> MutexGuard<'_, BTreeMap<u64, Arc<AtomicBool>>> {
        self.running
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl RepeatingTimer for ThreadTimer {
    fn schedule_repeating(&self, interval: Duration, mut tick: TimerTick) -> TimerHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let cancelled = Arc::new(AtomicBool::new(false));
        self.running().insert(id, Arc::clone(&cancelled));

        let interval = interval.max(Duration::from_millis(1));
        std::thread::spawn(move || loop {
            std::thread::sleep(interval);
            if cancelled.load(Ordering::Acquire) {
                break;
            }
            tick();
        });
        TimerHandle(id)
    }

    fn cancel(&self, handle: TimerHandle) {
        if let Some(flag) = self.running().remove(&handle.0) {
            flag.store(true, Ordering::Release);
        }
    }
}

impl Drop for ThreadTimer {
    fn drop(&mut self) {
        for flag in self.running().values() {
            flag.store(true, Ordering::Release);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{RepeatingTimer, ThreadTimer, VirtualTimer};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn counting_tick(counter: &Arc<AtomicUsize>) -> super::TimerTick {
        let counter = Arc::clone(counter);
        Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn virtual_timer_fires_once_per_elapsed_interval() {
        let timer = VirtualTimer::new();
        let counter = Arc::new(AtomicUsize::new(0));
        timer.schedule_repeating(Duration::from_millis(500), counting_tick(&counter));

        assert_eq!(timer.advance(Duration::from_millis(499)), 0);
        assert_eq!(timer.advance(Duration::from_millis(1)), 1);
        assert_eq!(timer.advance(Duration::from_millis(1_000)), 2);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert_eq!(timer.now(), Duration::from_millis(1_500));
    }

    #[test]
    fn virtual_timer_cancel_stops_ticks_and_ignores_unknown_handles() {
        let timer = VirtualTimer::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let handle = timer.schedule_repeating(Duration::from_millis(100), counting_tick(&counter));
        timer.advance(Duration::from_millis(250));

        timer.cancel(handle);
        timer.cancel(handle);
        assert_eq!(timer.armed_count(), 0);
        assert_eq!(timer.advance(Duration::from_secs(2)), 0);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn virtual_timer_interleaves_multiple_schedules_in_time_order() {
        let timer = VirtualTimer::new();
        let fast = Arc::new(AtomicUsize::new(0));
        let slow = Arc::new(AtomicUsize::new(0));
        timer.schedule_repeating(Duration::from_millis(100), counting_tick(&fast));
        timer.schedule_repeating(Duration::from_millis(300), counting_tick(&slow));

        assert_eq!(timer.advance(Duration::from_millis(600)), 8);
        assert_eq!(fast.load(Ordering::SeqCst), 6);
        assert_eq!(slow.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn thread_timer_stops_after_cancel() {
        let timer = ThreadTimer::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let handle = timer.schedule_repeating(Duration::from_millis(10), counting_tick(&counter));

        std::thread::sleep(Duration::from_millis(80));
        timer.cancel(handle);
        std::thread::sleep(Duration::from_millis(30));
        let after_cancel = counter.load(Ordering::SeqCst);
        assert!(after_cancel >= 1, "timer should have ticked before cancel");

        std::thread::sleep(Duration::from_millis(60));
        assert_eq!(counter.load(Ordering::SeqCst), after_cancel);
    }
}
