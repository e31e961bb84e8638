//! # Presensi Core Library
//!
//! This library provides the core business logic for Presensi, an
//! employee work-presence tracker driven by a conversational front end.
//! The CLI binary is the reference caller; a chat layer sits on the same
//! surface.
//!
//! ## Architecture
//!
//! - **Attendance state machine**: per (employee, date) check-in/out
//!   ordering with lateness, overtime and early-leave computed at the
//!   transition and stored
//! - **Break state machine**: at most one open break per employee,
//!   scheduled vs. actual duration
//! - **Reminder scheduler**: one-shot timer per break start, cancelled
//!   by break end, at-most-once delivery to the notification sink
//! - **Storage**: SQLite record store and TOML-based configuration
//!
//! ## Key Components
//!
//! - [`Tracker`]: the facade serializing transitions per employee
//! - [`Database`]: employees, attendance days and break sessions
//! - [`Config`]: workday boundaries and break durations
//! - [`ReminderScheduler`]: the pending-timer registry

pub mod attendance;
pub mod breaks;
pub mod clock;
pub mod context;
pub mod error;
pub mod events;
pub mod reminder;
pub mod report;
pub mod storage;
pub mod tracker;

pub use attendance::{CheckInOutcome, CheckOutOutcome, DayState};
pub use breaks::BreakEndOutcome;
pub use clock::{Clock, ManualClock, SystemClock};
pub use context::{EmployeeField, PendingFlow, SessionContext, SessionContextStore};
pub use error::{ConfigError, CoreError, StoreError, TransitionError};
pub use events::ReminderEvent;
pub use reminder::{ReminderPayload, ReminderScheduler, TimerKey};
pub use report::{AttendanceReport, ExportRow, OverviewRow, ReportTotals};
pub use storage::config::Workday;
pub use storage::{
    AttendanceDay, BreakSession, Config, Database, Employee, EmployeeId, SystemStats,
};
pub use tracker::{ReminderSink, StartedBreak, Tracker};
