//! Integration tests for reminder delivery semantics.
//!
//! The sink is best-effort: a missing employee row still produces a
//! fallback event, a failing sink is logged and never retried, and a
//! missing sink must not bring the timer task down.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{TimeZone, Utc};
use presensi_core::{Clock, Config, Database, ManualClock, ReminderEvent, Tracker};

const GHOST: i64 = 404;

fn tracker() -> (Tracker, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap(),
    ));
    let db = Database::open_memory().unwrap();
    let tracker = Tracker::new(db, Config::default(), Arc::clone(&clock) as Arc<dyn Clock>).unwrap();
    (tracker, clock)
}

#[tokio::test(start_paused = true)]
async fn missing_employee_still_gets_fallback_event() {
    // GHOST never registered; the attendance row alone drives the break.
    let (tracker, clock) = tracker();
    let events: Arc<Mutex<Vec<ReminderEvent>>> = Arc::new(Mutex::new(Vec::new()));
    let sink_events = Arc::clone(&events);
    tracker.register_reminder_sink(move |event| {
        sink_events.lock().unwrap().push(event);
        Ok(())
    });

    tracker.check_in(GHOST).unwrap();
    clock.set(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap());
    tracker.start_break(GHOST, "merokok").unwrap();

    tokio::time::sleep(Duration::from_secs(11 * 60)).await;

    let events = events.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].employee_id, GHOST);
    assert_eq!(events[0].employee_name, None);
    assert_eq!(events[0].break_type, "merokok");
}

#[tokio::test(start_paused = true)]
async fn failing_sink_is_not_retried() {
    let (tracker, clock) = tracker();
    let attempts = Arc::new(AtomicUsize::new(0));
    let sink_attempts = Arc::clone(&attempts);
    tracker.register_reminder_sink(move |_event| {
        sink_attempts.fetch_add(1, Ordering::SeqCst);
        Err("notification channel down".into())
    });

    tracker.register_employee(GHOST, None, "Ghost").unwrap();
    tracker.check_in(GHOST).unwrap();
    clock.set(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap());
    tracker.start_break(GHOST, "toilet").unwrap();

    tokio::time::sleep(Duration::from_secs(60 * 60)).await;
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
    assert_eq!(tracker.pending_reminders(), 0);

    // The tracker keeps working after the failed delivery.
    clock.set(Utc.with_ymd_and_hms(2024, 3, 1, 13, 30, 0).unwrap());
    let ended = tracker.end_break(GHOST).unwrap();
    assert_eq!(ended.break_type, "toilet");
}

#[tokio::test(start_paused = true)]
async fn firing_without_a_registered_sink_is_harmless() {
    let (tracker, clock) = tracker();
    tracker.register_employee(GHOST, None, "Ghost").unwrap();
    tracker.check_in(GHOST).unwrap();
    clock.set(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap());
    tracker.start_break(GHOST, "sholat").unwrap();

    tokio::time::sleep(Duration::from_secs(16 * 60)).await;
    assert_eq!(tracker.pending_reminders(), 0);

    // A sink registered later sees nothing retroactively.
    let events: Arc<Mutex<Vec<ReminderEvent>>> = Arc::new(Mutex::new(Vec::new()));
    let sink_events = Arc::clone(&events);
    tracker.register_reminder_sink(move |event| {
        sink_events.lock().unwrap().push(event);
        Ok(())
    });
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert!(events.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn reminders_for_different_employees_are_independent() {
    let (tracker, clock) = tracker();
    let events: Arc<Mutex<Vec<ReminderEvent>>> = Arc::new(Mutex::new(Vec::new()));
    let sink_events = Arc::clone(&events);
    tracker.register_reminder_sink(move |event| {
        sink_events.lock().unwrap().push(event);
        Ok(())
    });

    for (id, name) in [(1, "Dina"), (2, "Budi")] {
        tracker.register_employee(id, None, name).unwrap();
        tracker.check_in(id).unwrap();
    }

    clock.set(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap());
    tracker.start_break(1, "merokok").unwrap(); // 10 min
    tracker.start_break(2, "makan").unwrap(); // 60 min

    // Employee 1 ends in time; employee 2 overruns.
    clock.set(Utc.with_ymd_and_hms(2024, 3, 1, 12, 5, 0).unwrap());
    tracker.end_break(1).unwrap();

    tokio::time::sleep(Duration::from_secs(61 * 60)).await;
    let events = events.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].employee_id, 2);
    assert_eq!(events[0].employee_name.as_deref(), Some("Budi"));
    assert_eq!(events[0].break_type, "makan");
}
