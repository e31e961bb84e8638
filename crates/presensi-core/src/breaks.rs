//! Break state machine.
//!
//! Per employee the break state cycles
//!
//! ```text
//! Idle -> OnBreak -> Idle
//! ```
//!
//! with no terminal state. The central invariant is that at most one
//! break session per employee is open at any time; the evaluators here
//! check it against the stored state, and the caller holds the
//! per-employee lock across check and mutation so the check-then-insert
//! is atomic.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TransitionError;
use crate::storage::{AttendanceDay, BreakSession, Config};

/// Accepted break start: the resolved schedule for the new session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakStartOutcome {
    pub break_type: String,
    pub started_at: DateTime<Utc>,
    pub scheduled_minutes: u32,
    /// When the reminder timer should fire.
    pub remind_at: DateTime<Utc>,
}

/// Accepted break end, with the duration to store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakEndOutcome {
    pub session_id: i64,
    pub break_type: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    /// Fractional minutes; seconds are preserved, not truncated.
    pub actual_minutes: f64,
}

/// Elapsed break time in minutes as a real number. A 12m30s break is
/// 12.5, not 12.
pub fn actual_minutes(started_at: DateTime<Utc>, ended_at: DateTime<Utc>) -> f64 {
    (ended_at - started_at).num_milliseconds() as f64 / 60_000.0
}

/// Validate a break start against the stored day and any open session.
///
/// An unknown break type is not an error: it resolves to the configured
/// default duration.
pub fn evaluate_start(
    day: Option<&AttendanceDay>,
    active: Option<&BreakSession>,
    break_type: &str,
    at: DateTime<Utc>,
    config: &Config,
) -> Result<BreakStartOutcome, TransitionError> {
    if day.and_then(|d| d.check_in).is_none() {
        return Err(TransitionError::NotCheckedIn);
    }
    if let Some(open) = active {
        return Err(TransitionError::BreakAlreadyActive {
            break_type: open.break_type.clone(),
            since: open.started_at,
        });
    }
    let scheduled_minutes = config.break_minutes(break_type);
    Ok(BreakStartOutcome {
        break_type: break_type.to_string(),
        started_at: at,
        scheduled_minutes,
        remind_at: at + Duration::minutes(i64::from(scheduled_minutes)),
    })
}

/// Validate a break end against the open session.
pub fn evaluate_end(
    active: Option<&BreakSession>,
    at: DateTime<Utc>,
) -> Result<BreakEndOutcome, TransitionError> {
    let open = active.ok_or(TransitionError::NoActiveBreak)?;
    Ok(BreakEndOutcome {
        session_id: open.id,
        break_type: open.break_type.clone(),
        started_at: open.started_at,
        ended_at: at,
        actual_minutes: actual_minutes(open.started_at, at),
    })
}

/// How often each break type was taken on a day. Pure aggregation over
/// the day's sessions; nothing is stored.
pub fn breakdown(sessions: &[BreakSession]) -> BTreeMap<String, u32> {
    let mut counts = BTreeMap::new();
    for session in sessions {
        *counts.entry(session.break_type.clone()).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, h, m, s).unwrap()
    }

    fn checked_in_day() -> AttendanceDay {
        AttendanceDay {
            id: 1,
            employee_id: 7,
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            check_in: Some(at(8, 0, 0)),
            check_out: None,
            status: "normal".into(),
            late_minutes: 0,
            overtime_minutes: 0,
            early_leave_minutes: 0,
        }
    }

    fn open_session(break_type: &str, started_at: DateTime<Utc>) -> BreakSession {
        BreakSession {
            id: 3,
            employee_id: 7,
            attendance_id: 1,
            break_type: break_type.into(),
            started_at,
            ended_at: None,
            scheduled_minutes: 15,
            actual_minutes: None,
        }
    }

    #[test]
    fn start_requires_check_in() {
        let err =
            evaluate_start(None, None, "toilet", at(12, 0, 0), &Config::default()).unwrap_err();
        assert_eq!(err, TransitionError::NotCheckedIn);
    }

    #[test]
    fn start_resolves_scheduled_duration() {
        let day = checked_in_day();
        let out = evaluate_start(Some(&day), None, "makan", at(12, 0, 0), &Config::default())
            .unwrap();
        assert_eq!(out.scheduled_minutes, 60);
        assert_eq!(out.remind_at, at(13, 0, 0));
    }

    #[test]
    fn unknown_type_uses_default_duration() {
        let day = checked_in_day();
        let out = evaluate_start(Some(&day), None, "rapat", at(12, 0, 0), &Config::default())
            .unwrap();
        assert_eq!(out.scheduled_minutes, 30);
        assert_eq!(out.remind_at, at(12, 30, 0));
    }

    #[test]
    fn second_break_rejected_while_one_is_open() {
        let day = checked_in_day();
        let open = open_session("toilet", at(11, 0, 0));
        let err = evaluate_start(
            Some(&day),
            Some(&open),
            "makan",
            at(12, 0, 0),
            &Config::default(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            TransitionError::BreakAlreadyActive {
                break_type: "toilet".into(),
                since: at(11, 0, 0),
            }
        );
    }

    #[test]
    fn end_without_open_break_rejected() {
        let err = evaluate_end(None, at(12, 0, 0)).unwrap_err();
        assert_eq!(err, TransitionError::NoActiveBreak);
    }

    #[test]
    fn end_preserves_fractional_minutes() {
        let open = open_session("toilet", at(12, 0, 0));
        let out = evaluate_end(Some(&open), at(12, 12, 30)).unwrap();
        assert_eq!(out.actual_minutes, 12.5);
    }

    #[test]
    fn zero_length_break_is_zero_minutes() {
        let open = open_session("toilet", at(12, 0, 0));
        let out = evaluate_end(Some(&open), at(12, 0, 0)).unwrap();
        assert_eq!(out.actual_minutes, 0.0);
    }

    #[test]
    fn breakdown_counts_by_type() {
        let sessions = vec![
            open_session("toilet", at(9, 0, 0)),
            open_session("makan", at(12, 0, 0)),
            open_session("toilet", at(15, 0, 0)),
        ];
        let counts = breakdown(&sessions);
        assert_eq!(counts.get("toilet"), Some(&2));
        assert_eq!(counts.get("makan"), Some(&1));
        assert_eq!(counts.get("merokok"), None);
    }
}
