//! One-shot break reminder scheduler.
//!
//! A registry of pending timers keyed by [`TimerKey`]. Each `schedule`
//! spawns a task that sleeps until the deadline and then tries to claim
//! its registry slot; `cancel` removes and aborts the slot. Both sides
//! check-and-clear the same slot under one mutex, so the delivery
//! callback runs at most once per key no matter how a cancellation races
//! a firing. Delivery happens outside the lock and never blocks other
//! timers.
//!
//! Timers live only as long as the process: dropping the scheduler
//! aborts whatever is still pending. Reminders are best-effort, never
//! persisted.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;

use crate::clock::Clock;
use crate::storage::EmployeeId;

/// Structurally unique timer identity: the employee plus the break
/// session's store id. Two break starts can never collide on it, even
/// within the same clock tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerKey {
    pub employee_id: EmployeeId,
    pub session_id: i64,
}

/// What the delivery callback receives when a timer fires.
#[derive(Debug, Clone)]
pub struct ReminderPayload {
    pub employee_id: EmployeeId,
    pub break_type: String,
    pub started_at: DateTime<Utc>,
}

/// Callback the scheduler invokes when a timer fires.
pub type DeliveryFn = dyn Fn(ReminderPayload) + Send + Sync;

pub struct ReminderScheduler {
    clock: Arc<dyn Clock>,
    timers: Arc<Mutex<HashMap<TimerKey, JoinHandle<()>>>>,
    on_fire: Arc<DeliveryFn>,
    runtime: tokio::runtime::Handle,
}

/// A panicking delivery callback must not wedge the registry.
fn lock_timers(
    timers: &Mutex<HashMap<TimerKey, JoinHandle<()>>>,
) -> MutexGuard<'_, HashMap<TimerKey, JoinHandle<()>>> {
    timers.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ReminderScheduler {
    /// Create a scheduler delivering through `on_fire`.
    ///
    /// # Panics
    /// Must be created within a Tokio runtime; the runtime handle is
    /// captured here so timers can be scheduled from any thread later.
    pub fn new(clock: Arc<dyn Clock>, on_fire: Arc<DeliveryFn>) -> Self {
        Self {
            clock,
            timers: Arc::new(Mutex::new(HashMap::new())),
            on_fire,
            runtime: tokio::runtime::Handle::current(),
        }
    }

    /// Register a one-shot timer. A `fire_at` already in the past fires
    /// immediately rather than being dropped. Re-scheduling an existing
    /// key replaces (and aborts) the previous timer.
    pub fn schedule(&self, key: TimerKey, fire_at: DateTime<Utc>, payload: ReminderPayload) {
        let delay = (fire_at - self.clock.now()).to_std().unwrap_or_default();
        let timers = Arc::clone(&self.timers);
        let on_fire = Arc::clone(&self.on_fire);

        // Hold the registry lock across spawn + insert: a zero-delay
        // task cannot claim its slot before the slot exists.
        let mut guard = lock_timers(&self.timers);
        let handle = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            let claimed = lock_timers(&timers).remove(&key).is_some();
            if claimed {
                on_fire(payload);
            }
        });
        if let Some(previous) = guard.insert(key, handle) {
            previous.abort();
        }
    }

    /// Remove a pending timer. A key that is absent or has already fired
    /// is a no-op, not an error.
    pub fn cancel(&self, key: TimerKey) {
        if let Some(handle) = lock_timers(&self.timers).remove(&key) {
            handle.abort();
        }
    }

    /// Whether a timer for `key` is still pending.
    pub fn is_pending(&self, key: TimerKey) -> bool {
        lock_timers(&self.timers).contains_key(&key)
    }

    /// Number of timers still pending.
    pub fn pending_count(&self) -> usize {
        lock_timers(&self.timers).len()
    }
}

impl Drop for ReminderScheduler {
    fn drop(&mut self) {
        // Outstanding timers are dropped on shutdown, not persisted.
        for (_, handle) in lock_timers(&self.timers).drain() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn scheduler_with_counter() -> (ReminderScheduler, Arc<AtomicUsize>) {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        let scheduler = ReminderScheduler::new(
            Arc::new(SystemClock),
            Arc::new(move |_payload| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );
        (scheduler, fired)
    }

    fn key(session_id: i64) -> TimerKey {
        TimerKey {
            employee_id: 7,
            session_id,
        }
    }

    fn payload() -> ReminderPayload {
        ReminderPayload {
            employee_id: 7,
            break_type: "toilet".into(),
            started_at: Utc::now(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn timer_fires_once_at_deadline() {
        let (scheduler, fired) = scheduler_with_counter();
        scheduler.schedule(key(1), Utc::now() + chrono::Duration::minutes(15), payload());
        assert!(scheduler.is_pending(key(1)));

        tokio::time::sleep(Duration::from_secs(16 * 60)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!scheduler.is_pending(key(1)));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_before_deadline_suppresses_delivery() {
        let (scheduler, fired) = scheduler_with_counter();
        scheduler.schedule(key(1), Utc::now() + chrono::Duration::minutes(15), payload());
        scheduler.cancel(key(1));

        tokio::time::sleep(Duration::from_secs(16 * 60)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn past_deadline_fires_immediately() {
        let (scheduler, fired) = scheduler_with_counter();
        scheduler.schedule(key(1), Utc::now() - chrono::Duration::minutes(5), payload());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_after_fire_is_a_noop() {
        let (scheduler, fired) = scheduler_with_counter();
        scheduler.schedule(key(1), Utc::now() + chrono::Duration::minutes(1), payload());

        tokio::time::sleep(Duration::from_secs(2 * 60)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        // The break ended after the reminder already fired.
        scheduler.cancel(key(1));
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_unknown_key_is_a_noop() {
        let (scheduler, fired) = scheduler_with_counter();
        scheduler.cancel(key(42));
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn rescheduling_a_key_replaces_the_timer() {
        let (scheduler, fired) = scheduler_with_counter();
        scheduler.schedule(key(1), Utc::now() + chrono::Duration::minutes(5), payload());
        scheduler.schedule(key(1), Utc::now() + chrono::Duration::minutes(30), payload());
        assert_eq!(scheduler.pending_count(), 1);

        tokio::time::sleep(Duration::from_secs(10 * 60)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(25 * 60)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn independent_timers_do_not_block_each_other() {
        let (scheduler, fired) = scheduler_with_counter();
        for session_id in 1..=5 {
            scheduler.schedule(
                key(session_id),
                Utc::now() + chrono::Duration::minutes(session_id as i64),
                payload(),
            );
        }
        assert_eq!(scheduler.pending_count(), 5);

        tokio::time::sleep(Duration::from_secs(6 * 60)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 5);
        assert_eq!(scheduler.pending_count(), 0);
    }
}
