//! Read-only reporting over the record store.
//!
//! Everything here is pure aggregation of stored rows; the derived
//! minute fields were computed at transition time and are only summed,
//! never recomputed.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::AttendanceDay;

/// Per-employee attendance report over a date range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceReport {
    pub days: Vec<AttendanceDay>,
    pub totals: ReportTotals,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportTotals {
    pub days_present: u32,
    pub late_minutes: u64,
    pub overtime_minutes: u64,
    pub early_leave_minutes: u64,
}

pub fn build_report(days: Vec<AttendanceDay>) -> AttendanceReport {
    let mut totals = ReportTotals::default();
    for day in &days {
        if day.check_in.is_some() {
            totals.days_present += 1;
        }
        totals.late_minutes += u64::from(day.late_minutes);
        totals.overtime_minutes += u64::from(day.overtime_minutes);
        totals.early_leave_minutes += u64::from(day.early_leave_minutes);
    }
    AttendanceReport { days, totals }
}

/// One row of the admin "who is in today" overview.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverviewRow {
    pub employee_name: String,
    pub check_in: Option<DateTime<Utc>>,
    pub check_out: Option<DateTime<Utc>>,
    pub status: String,
    pub late_minutes: u32,
    pub overtime_minutes: u32,
}

pub fn overview_rows(rows: Vec<(String, AttendanceDay)>) -> Vec<OverviewRow> {
    rows.into_iter()
        .map(|(employee_name, day)| OverviewRow {
            employee_name,
            check_in: day.check_in,
            check_out: day.check_out,
            status: day.status,
            late_minutes: day.late_minutes,
            overtime_minutes: day.overtime_minutes,
        })
        .collect()
}

/// One serializable row of the period export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportRow {
    pub employee_name: String,
    pub date: NaiveDate,
    pub check_in: Option<DateTime<Utc>>,
    pub check_out: Option<DateTime<Utc>>,
    pub late_minutes: u32,
    pub overtime_minutes: u32,
    pub early_leave_minutes: u32,
}

pub fn export_rows(rows: Vec<(String, AttendanceDay)>) -> Vec<ExportRow> {
    rows.into_iter()
        .map(|(employee_name, day)| ExportRow {
            employee_name,
            date: day.date,
            check_in: day.check_in,
            check_out: day.check_out,
            late_minutes: day.late_minutes,
            overtime_minutes: day.overtime_minutes,
            early_leave_minutes: day.early_leave_minutes,
        })
        .collect()
}
