//! Attendance state machine.
//!
//! Per (employee, date) the day moves through
//!
//! ```text
//! NoCheckIn -> CheckedIn -> CheckedOut
//! ```
//!
//! with `CheckedOut` terminal for the day. The evaluators here are pure:
//! they look at the stored day record and the proposed timestamp and
//! either produce the derived minutes to store or reject the transition.
//! The caller ([`crate::Tracker`]) owns locking and persistence.

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TransitionError;
use crate::storage::config::Workday;
use crate::storage::AttendanceDay;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayState {
    NoCheckIn,
    CheckedIn,
    CheckedOut,
}

impl AttendanceDay {
    /// The day's position in the attendance state machine.
    pub fn state(&self) -> DayState {
        match (&self.check_in, &self.check_out) {
            (None, _) => DayState::NoCheckIn,
            (Some(_), None) => DayState::CheckedIn,
            (Some(_), Some(_)) => DayState::CheckedOut,
        }
    }
}

/// Accepted check-in with its derived minutes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckInOutcome {
    pub at: DateTime<Utc>,
    pub late_minutes: u32,
}

/// Accepted check-out with its derived minutes. At most one of
/// `overtime_minutes`/`early_leave_minutes` is non-zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckOutOutcome {
    pub at: DateTime<Utc>,
    pub overtime_minutes: u32,
    pub early_leave_minutes: u32,
}

/// Whole minutes from `boundary` to `t`, negative when `t` is earlier.
/// Sub-minute remainders truncate toward zero.
fn minutes_after(t: NaiveTime, boundary: NaiveTime) -> i64 {
    (t - boundary).num_minutes()
}

/// Minutes late beyond the tolerance window. Zero at or before
/// `work_start + tolerance`.
pub fn late_minutes(at: NaiveTime, workday: &Workday) -> u32 {
    let late = minutes_after(at, workday.start) - i64::from(workday.tolerance_minutes);
    late.max(0) as u32
}

/// Minutes worked past the scheduled end. Tolerance does not apply.
pub fn overtime_minutes(at: NaiveTime, workday: &Workday) -> u32 {
    minutes_after(at, workday.end).max(0) as u32
}

/// Minutes left early beyond the tolerance window.
pub fn early_leave_minutes(at: NaiveTime, workday: &Workday) -> u32 {
    let early = minutes_after(workday.end, at) - i64::from(workday.tolerance_minutes);
    early.max(0) as u32
}

/// Validate a check-in against today's stored record.
pub fn evaluate_check_in(
    existing: Option<&AttendanceDay>,
    at: DateTime<Utc>,
    workday: &Workday,
) -> Result<CheckInOutcome, TransitionError> {
    if let Some(prior) = existing.and_then(|day| day.check_in) {
        return Err(TransitionError::AlreadyCheckedIn { at: prior });
    }
    Ok(CheckInOutcome {
        at,
        late_minutes: late_minutes(at.time(), workday),
    })
}

/// Validate a check-out against today's stored record.
pub fn evaluate_check_out(
    existing: Option<&AttendanceDay>,
    at: DateTime<Utc>,
    workday: &Workday,
) -> Result<CheckOutOutcome, TransitionError> {
    let day = existing.ok_or(TransitionError::NoCheckInYet)?;
    match day.state() {
        DayState::NoCheckIn => Err(TransitionError::NoCheckInYet),
        DayState::CheckedOut => Err(TransitionError::AlreadyCheckedOut),
        DayState::CheckedIn => Ok(CheckOutOutcome {
            at,
            overtime_minutes: overtime_minutes(at.time(), workday),
            early_leave_minutes: early_leave_minutes(at.time(), workday),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use proptest::prelude::*;

    fn workday() -> Workday {
        Workday {
            start: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            end: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            tolerance_minutes: 15,
        }
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, h, m, 0).unwrap()
    }

    fn day(check_in: Option<DateTime<Utc>>, check_out: Option<DateTime<Utc>>) -> AttendanceDay {
        AttendanceDay {
            id: 1,
            employee_id: 7,
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            check_in,
            check_out,
            status: "normal".into(),
            late_minutes: 0,
            overtime_minutes: 0,
            early_leave_minutes: 0,
        }
    }

    #[test]
    fn late_within_tolerance_is_zero() {
        let wd = workday();
        assert_eq!(late_minutes(at(8, 0).time(), &wd), 0);
        assert_eq!(late_minutes(at(8, 15).time(), &wd), 0);
        assert_eq!(late_minutes(at(7, 30).time(), &wd), 0);
    }

    #[test]
    fn late_beyond_tolerance_counts_excess() {
        let wd = workday();
        assert_eq!(late_minutes(at(8, 20).time(), &wd), 5);
        assert_eq!(late_minutes(at(9, 0).time(), &wd), 45);
    }

    #[test]
    fn overtime_ignores_tolerance() {
        let wd = workday();
        assert_eq!(overtime_minutes(at(17, 0).time(), &wd), 0);
        assert_eq!(overtime_minutes(at(17, 5).time(), &wd), 5);
        assert_eq!(overtime_minutes(at(17, 40).time(), &wd), 40);
    }

    #[test]
    fn early_leave_honors_tolerance() {
        let wd = workday();
        assert_eq!(early_leave_minutes(at(17, 0).time(), &wd), 0);
        assert_eq!(early_leave_minutes(at(16, 50).time(), &wd), 0);
        assert_eq!(early_leave_minutes(at(16, 30).time(), &wd), 15);
    }

    #[test]
    fn check_out_at_work_end_is_all_zero() {
        let out = evaluate_check_out(Some(&day(Some(at(8, 0)), None)), at(17, 0), &workday())
            .unwrap();
        assert_eq!(out.overtime_minutes, 0);
        assert_eq!(out.early_leave_minutes, 0);
    }

    #[test]
    fn first_check_in_accepted() {
        let out = evaluate_check_in(None, at(8, 20), &workday()).unwrap();
        assert_eq!(out.late_minutes, 5);
    }

    #[test]
    fn second_check_in_rejected_with_original_time() {
        let existing = day(Some(at(8, 5)), None);
        let err = evaluate_check_in(Some(&existing), at(9, 0), &workday()).unwrap_err();
        assert_eq!(err, TransitionError::AlreadyCheckedIn { at: at(8, 5) });
    }

    #[test]
    fn check_out_requires_check_in() {
        let err = evaluate_check_out(None, at(17, 0), &workday()).unwrap_err();
        assert_eq!(err, TransitionError::NoCheckInYet);
    }

    #[test]
    fn second_check_out_rejected() {
        let existing = day(Some(at(8, 0)), Some(at(17, 0)));
        let err = evaluate_check_out(Some(&existing), at(18, 0), &workday()).unwrap_err();
        assert_eq!(err, TransitionError::AlreadyCheckedOut);
    }

    #[test]
    fn day_state_progression() {
        assert_eq!(day(None, None).state(), DayState::NoCheckIn);
        assert_eq!(day(Some(at(8, 0)), None).state(), DayState::CheckedIn);
        assert_eq!(
            day(Some(at(8, 0)), Some(at(17, 0))).state(),
            DayState::CheckedOut
        );
    }

    proptest! {
        /// Lateness never decreases as the check-in gets later.
        #[test]
        fn lateness_is_monotonic(a in 0u32..1440, b in 0u32..1440) {
            let wd = workday();
            let (earlier, later) = (a.min(b), a.max(b));
            let t_early = NaiveTime::from_num_seconds_from_midnight_opt(earlier * 60, 0).unwrap();
            let t_late = NaiveTime::from_num_seconds_from_midnight_opt(later * 60, 0).unwrap();
            prop_assert!(late_minutes(t_early, &wd) <= late_minutes(t_late, &wd));
        }

        /// A single check-out never yields both overtime and early-leave.
        #[test]
        fn overtime_and_early_leave_exclusive(minute in 0u32..1440) {
            let wd = workday();
            let t = NaiveTime::from_num_seconds_from_midnight_opt(minute * 60, 0).unwrap();
            let overtime = overtime_minutes(t, &wd);
            let early = early_leave_minutes(t, &wd);
            prop_assert!(overtime == 0 || early == 0);
        }
    }
}
