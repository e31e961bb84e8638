//! The presence tracker: the facade the conversational layer calls.
//!
//! Owns the record store, the resolved configuration, the clock, and the
//! reminder scheduler, and serializes transitions per employee. Every
//! check-then-mutate sequence runs under that employee's lock, which is
//! what makes the one-record-per-day and one-open-break invariants hold
//! under concurrent handlers; unrelated employees never contend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, NaiveDate, Utc};
use log::warn;

use crate::attendance::{self, CheckInOutcome, CheckOutOutcome};
use crate::breaks::{self, BreakEndOutcome};
use crate::clock::{Clock, SystemClock};
use crate::error::{Result, TransitionError};
use crate::events::ReminderEvent;
use crate::reminder::{ReminderPayload, ReminderScheduler, TimerKey};
use crate::report::{self, AttendanceReport, ExportRow, OverviewRow};
use crate::storage::config::Workday;
use crate::storage::{
    AttendanceDay, BreakSession, Config, Database, Employee, EmployeeId, SystemStats,
};

/// Callback invoked with a structured event when a break reminder fires.
/// Delivery is best-effort: a returned error is logged, never retried.
pub type ReminderSink =
    Box<dyn Fn(ReminderEvent) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>>
        + Send
        + Sync>;

/// A freshly opened break together with its reminder deadline.
#[derive(Debug, Clone)]
pub struct StartedBreak {
    pub session: BreakSession,
    pub remind_at: DateTime<Utc>,
}

pub struct Tracker {
    db: Arc<Mutex<Database>>,
    config: Config,
    workday: Workday,
    clock: Arc<dyn Clock>,
    scheduler: ReminderScheduler,
    locks: Mutex<HashMap<EmployeeId, Arc<Mutex<()>>>>,
    sink: Arc<RwLock<Option<ReminderSink>>>,
}

impl Tracker {
    /// Build a tracker over the given store and configuration.
    ///
    /// The configuration is resolved here, once; transitions can no
    /// longer fail on it. Must be called within a Tokio runtime (the
    /// reminder scheduler captures it).
    ///
    /// # Errors
    /// Returns an error if the configuration fails validation.
    pub fn new(db: Database, config: Config, clock: Arc<dyn Clock>) -> Result<Self> {
        let workday = config.workday()?;
        let db = Arc::new(Mutex::new(db));
        let sink: Arc<RwLock<Option<ReminderSink>>> = Arc::new(RwLock::new(None));

        let delivery = {
            let db = Arc::clone(&db);
            let sink = Arc::clone(&sink);
            let clock = Arc::clone(&clock);
            Arc::new(move |payload: ReminderPayload| {
                deliver_reminder(&db, &sink, clock.now(), payload);
            })
        };
        let scheduler = ReminderScheduler::new(Arc::clone(&clock), delivery);

        Ok(Self {
            db,
            config,
            workday,
            clock,
            scheduler,
            locks: Mutex::new(HashMap::new()),
            sink,
        })
    }

    /// Open the default on-disk store and configuration with the system
    /// clock.
    ///
    /// # Errors
    /// Returns an error if the store cannot be opened or the config
    /// fails validation.
    pub fn open() -> std::result::Result<Self, Box<dyn std::error::Error>> {
        let db = Database::open()?;
        let config = Config::load_or_default();
        Ok(Self::new(db, config, Arc::new(SystemClock))?)
    }

    /// Register the notification sink. Replaces any previous sink.
    pub fn register_reminder_sink<F>(&self, sink: F)
    where
        F: Fn(ReminderEvent) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>>
            + Send
            + Sync
            + 'static,
    {
        *self.sink.write().unwrap() = Some(Box::new(sink));
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Number of reminder timers still pending. Mostly for tests and
    /// diagnostics.
    pub fn pending_reminders(&self) -> usize {
        self.scheduler.pending_count()
    }

    fn employee_lock(&self, employee_id: EmployeeId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap();
        Arc::clone(locks.entry(employee_id).or_default())
    }

    // ── Transitions ──────────────────────────────────────────────────

    /// Record the employee's check-in for today.
    ///
    /// # Errors
    /// `AlreadyCheckedIn` if today's record already has one; store
    /// errors abort with no state change.
    pub fn check_in(&self, employee_id: EmployeeId) -> Result<CheckInOutcome> {
        let lock = self.employee_lock(employee_id);
        let _guard = lock.lock().unwrap();

        let now = self.clock.now();
        let date = now.date_naive();
        let db = self.db.lock().unwrap();
        let existing = db.day_record(employee_id, date)?;
        let outcome = attendance::evaluate_check_in(existing.as_ref(), now, &self.workday)?;
        db.insert_check_in(employee_id, date, outcome.at, outcome.late_minutes)?;
        Ok(outcome)
    }

    /// Record the employee's check-out for today.
    ///
    /// # Errors
    /// `NoCheckInYet` without a prior check-in, `AlreadyCheckedOut` on
    /// repeat.
    pub fn check_out(&self, employee_id: EmployeeId) -> Result<CheckOutOutcome> {
        let lock = self.employee_lock(employee_id);
        let _guard = lock.lock().unwrap();

        let now = self.clock.now();
        let date = now.date_naive();
        let db = self.db.lock().unwrap();
        let existing = db.day_record(employee_id, date)?;
        let day = match existing.as_ref() {
            Some(day) => day,
            None => return Err(TransitionError::NoCheckInYet.into()),
        };
        let outcome = attendance::evaluate_check_out(existing.as_ref(), now, &self.workday)?;
        if !db.set_check_out(
            day.id,
            outcome.at,
            outcome.overtime_minutes,
            outcome.early_leave_minutes,
        )? {
            return Err(TransitionError::AlreadyCheckedOut.into());
        }
        Ok(outcome)
    }

    /// Open a break and register its reminder timer.
    ///
    /// # Errors
    /// `NotCheckedIn` without a check-in today; `BreakAlreadyActive`
    /// while another break is open (and no new timer is registered).
    pub fn start_break(&self, employee_id: EmployeeId, break_type: &str) -> Result<StartedBreak> {
        let lock = self.employee_lock(employee_id);
        let _guard = lock.lock().unwrap();

        let now = self.clock.now();
        let date = now.date_naive();
        let db = self.db.lock().unwrap();
        let day = db.day_record(employee_id, date)?;
        let active = db.active_break(employee_id)?;
        let outcome =
            breaks::evaluate_start(day.as_ref(), active.as_ref(), break_type, now, &self.config)?;
        let attendance_id = match day.as_ref() {
            Some(day) => day.id,
            None => return Err(TransitionError::NotCheckedIn.into()),
        };
        let session_id = db.insert_break(
            employee_id,
            attendance_id,
            &outcome.break_type,
            outcome.started_at,
            outcome.scheduled_minutes,
        )?;
        drop(db);

        self.scheduler.schedule(
            TimerKey {
                employee_id,
                session_id,
            },
            outcome.remind_at,
            ReminderPayload {
                employee_id,
                break_type: outcome.break_type.clone(),
                started_at: outcome.started_at,
            },
        );

        Ok(StartedBreak {
            session: BreakSession {
                id: session_id,
                employee_id,
                attendance_id,
                break_type: outcome.break_type,
                started_at: outcome.started_at,
                ended_at: None,
                scheduled_minutes: outcome.scheduled_minutes,
                actual_minutes: None,
            },
            remind_at: outcome.remind_at,
        })
    }

    /// Close the employee's open break and cancel its reminder. Returns
    /// the closed session's figures so the caller can render a breakdown.
    ///
    /// # Errors
    /// `NoActiveBreak` if nothing is open.
    pub fn end_break(&self, employee_id: EmployeeId) -> Result<BreakEndOutcome> {
        let lock = self.employee_lock(employee_id);
        let _guard = lock.lock().unwrap();

        let now = self.clock.now();
        let db = self.db.lock().unwrap();
        let active = db.active_break(employee_id)?;
        let outcome = breaks::evaluate_end(active.as_ref(), now)?;
        if !db.close_break(outcome.session_id, outcome.ended_at, outcome.actual_minutes)? {
            return Err(TransitionError::NoActiveBreak.into());
        }
        drop(db);

        // Already-fired timers make this a no-op; the registry slot is
        // gone either way, so no duplicate notification is possible.
        self.scheduler.cancel(TimerKey {
            employee_id,
            session_id: outcome.session_id,
        });
        Ok(outcome)
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn get_active_break(&self, employee_id: EmployeeId) -> Result<Option<BreakSession>> {
        Ok(self.db.lock().unwrap().active_break(employee_id)?)
    }

    pub fn get_day_record(
        &self,
        employee_id: EmployeeId,
        date: NaiveDate,
    ) -> Result<Option<AttendanceDay>> {
        Ok(self.db.lock().unwrap().day_record(employee_id, date)?)
    }

    pub fn list_breaks(
        &self,
        employee_id: EmployeeId,
        date: NaiveDate,
    ) -> Result<Vec<BreakSession>> {
        Ok(self.db.lock().unwrap().breaks_for_day(employee_id, date)?)
    }

    /// How often each break type was taken on `date`.
    pub fn break_breakdown(
        &self,
        employee_id: EmployeeId,
        date: NaiveDate,
    ) -> Result<std::collections::BTreeMap<String, u32>> {
        let sessions = self.list_breaks(employee_id, date)?;
        Ok(breaks::breakdown(&sessions))
    }

    /// Today according to the tracker's clock.
    pub fn today(&self) -> NaiveDate {
        self.clock.now().date_naive()
    }

    // ── Employees ────────────────────────────────────────────────────

    /// Create or refresh an employee on interaction.
    pub fn register_employee(
        &self,
        employee_id: EmployeeId,
        username: Option<&str>,
        full_name: &str,
    ) -> Result<()> {
        let now = self.clock.now();
        Ok(self
            .db
            .lock()
            .unwrap()
            .upsert_employee(employee_id, username, full_name, now)?)
    }

    pub fn get_employee(&self, employee_id: EmployeeId) -> Result<Option<Employee>> {
        Ok(self.db.lock().unwrap().get_employee(employee_id)?)
    }

    pub fn list_employees(&self) -> Result<Vec<Employee>> {
        Ok(self.db.lock().unwrap().list_employees()?)
    }

    /// Returns false when the employee does not exist.
    pub fn update_employee(
        &self,
        employee_id: EmployeeId,
        department: Option<&str>,
        position: Option<&str>,
        is_active: Option<bool>,
    ) -> Result<bool> {
        Ok(self
            .db
            .lock()
            .unwrap()
            .update_employee(employee_id, department, position, is_active)?)
    }

    /// Soft delete; attendance history stays.
    pub fn deactivate_employee(&self, employee_id: EmployeeId) -> Result<bool> {
        Ok(self.db.lock().unwrap().deactivate_employee(employee_id)?)
    }

    // ── Reporting ────────────────────────────────────────────────────

    pub fn attendance_report(
        &self,
        employee_id: EmployeeId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<AttendanceReport> {
        let days = self.db.lock().unwrap().attendance_range(employee_id, from, to)?;
        Ok(report::build_report(days))
    }

    pub fn today_overview(&self) -> Result<Vec<OverviewRow>> {
        let rows = self
            .db
            .lock()
            .unwrap()
            .attendance_for_date_all(self.today())?;
        Ok(report::overview_rows(rows))
    }

    pub fn export_rows(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<ExportRow>> {
        let rows = self.db.lock().unwrap().attendance_range_all(from, to)?;
        Ok(report::export_rows(rows))
    }

    pub fn system_stats(&self) -> Result<SystemStats> {
        Ok(self.db.lock().unwrap().system_stats(self.today())?)
    }
}

/// Build the reminder event and hand it to the registered sink. Runs in
/// the timer's task; every failure path is logged and swallowed because
/// reminders are best-effort.
fn deliver_reminder(
    db: &Mutex<Database>,
    sink: &RwLock<Option<ReminderSink>>,
    fired_at: DateTime<Utc>,
    payload: ReminderPayload,
) {
    let employee_name = match db.lock().unwrap().get_employee(payload.employee_id) {
        Ok(Some(employee)) => Some(employee.full_name),
        Ok(None) => None,
        Err(e) => {
            warn!(
                "reminder: employee {} lookup failed: {e}",
                payload.employee_id
            );
            None
        }
    };

    let event = ReminderEvent {
        employee_id: payload.employee_id,
        employee_name,
        break_type: payload.break_type,
        started_at: payload.started_at,
        fired_at,
    };

    match sink.read().unwrap().as_ref() {
        Some(sink) => {
            if let Err(e) = sink(event) {
                warn!("reminder delivery failed: {e}");
            }
        }
        None => warn!(
            "reminder for employee {} fired with no sink registered",
            event.employee_id
        ),
    }
}
