//! SQLite-based record store.
//!
//! Holds the three entity kinds the state machines operate on:
//! - Employees (soft-deactivated, never hard-deleted)
//! - Attendance days, one row per (employee, date)
//! - Break sessions, at most one open per employee
//!
//! Timestamps are stored as RFC 3339 text, dates as `YYYY-MM-DD`. Every
//! mutation is a single statement, so row updates are atomic without
//! cross-row transactions.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

use super::data_dir;

/// Opaque employee identity key (the chat platform's numeric user id in
/// the original deployment).
pub type EmployeeId = i64;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Employee {
    pub id: EmployeeId,
    pub username: Option<String>,
    pub full_name: String,
    pub department: String,
    pub position: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// One attendance record per (employee, date).
///
/// The derived minute fields are computed once at the triggering
/// transition and stored; they are never recomputed lazily.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceDay {
    pub id: i64,
    pub employee_id: EmployeeId,
    pub date: NaiveDate,
    pub check_in: Option<DateTime<Utc>>,
    pub check_out: Option<DateTime<Utc>>,
    pub status: String,
    pub late_minutes: u32,
    pub overtime_minutes: u32,
    pub early_leave_minutes: u32,
}

/// A single break. `ended_at`/`actual_minutes` are set exactly once when
/// the break closes; the row is immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakSession {
    pub id: i64,
    pub employee_id: EmployeeId,
    pub attendance_id: i64,
    pub break_type: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub scheduled_minutes: u32,
    pub actual_minutes: Option<f64>,
}

impl BreakSession {
    pub fn is_open(&self) -> bool {
        self.ended_at.is_none()
    }
}

/// Aggregate counters for the admin stats view.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SystemStats {
    pub total_employees: u64,
    pub active_employees: u64,
    pub today_attendance: u64,
    pub total_attendance: u64,
    pub today_breaks: u64,
    pub total_breaks: u64,
}

fn parse_ts(col: usize, value: String) -> Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(col, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn parse_date(col: usize, value: String) -> Result<NaiveDate, rusqlite::Error> {
    NaiveDate::parse_from_str(&value, "%Y-%m-%d").map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(col, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn row_to_employee(row: &rusqlite::Row) -> Result<Employee, rusqlite::Error> {
    Ok(Employee {
        id: row.get(0)?,
        username: row.get(1)?,
        full_name: row.get(2)?,
        department: row.get(3)?,
        position: row.get(4)?,
        is_active: row.get::<_, i64>(5)? != 0,
        created_at: parse_ts(6, row.get(6)?)?,
    })
}

fn row_to_attendance(row: &rusqlite::Row) -> Result<AttendanceDay, rusqlite::Error> {
    Ok(AttendanceDay {
        id: row.get(0)?,
        employee_id: row.get(1)?,
        date: parse_date(2, row.get(2)?)?,
        check_in: row
            .get::<_, Option<String>>(3)?
            .map(|s| parse_ts(3, s))
            .transpose()?,
        check_out: row
            .get::<_, Option<String>>(4)?
            .map(|s| parse_ts(4, s))
            .transpose()?,
        status: row.get(5)?,
        late_minutes: row.get(6)?,
        overtime_minutes: row.get(7)?,
        early_leave_minutes: row.get(8)?,
    })
}

fn row_to_break(row: &rusqlite::Row) -> Result<BreakSession, rusqlite::Error> {
    Ok(BreakSession {
        id: row.get(0)?,
        employee_id: row.get(1)?,
        attendance_id: row.get(2)?,
        break_type: row.get(3)?,
        started_at: parse_ts(4, row.get(4)?)?,
        ended_at: row
            .get::<_, Option<String>>(5)?
            .map(|s| parse_ts(5, s))
            .transpose()?,
        scheduled_minutes: row.get(6)?,
        actual_minutes: row.get(7)?,
    })
}

const ATTENDANCE_COLS: &str =
    "id, employee_id, date, check_in, check_out, status, late_minutes, overtime_minutes, early_leave_minutes";
const NAMED_ATTENDANCE_COLS: &str =
    "a.id, a.employee_id, a.date, a.check_in, a.check_out, a.status, a.late_minutes, a.overtime_minutes, a.early_leave_minutes";

fn row_to_named_attendance(row: &rusqlite::Row) -> Result<(String, AttendanceDay), rusqlite::Error> {
    let name: String = row.get(0)?;
    let day = AttendanceDay {
        id: row.get(1)?,
        employee_id: row.get(2)?,
        date: parse_date(3, row.get(3)?)?,
        check_in: row
            .get::<_, Option<String>>(4)?
            .map(|s| parse_ts(4, s))
            .transpose()?,
        check_out: row
            .get::<_, Option<String>>(5)?
            .map(|s| parse_ts(5, s))
            .transpose()?,
        status: row.get(6)?,
        late_minutes: row.get(7)?,
        overtime_minutes: row.get(8)?,
        early_leave_minutes: row.get(9)?,
    };
    Ok((name, day))
}
const BREAK_COLS: &str =
    "id, employee_id, attendance_id, break_type, started_at, ended_at, scheduled_minutes, actual_minutes";
const EMPLOYEE_COLS: &str =
    "id, username, full_name, department, position, is_active, created_at";

/// SQLite record store.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the store at `~/.config/presensi/presensi.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, Box<dyn std::error::Error>> {
        let path = data_dir()?.join("presensi.db");
        let conn = Connection::open(&path).map_err(|source| StoreError::OpenFailed {
            path: path.clone(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory store (used by tests and ephemeral callers).
    pub fn open_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS employees (
                id          INTEGER PRIMARY KEY,
                username    TEXT,
                full_name   TEXT NOT NULL,
                department  TEXT NOT NULL DEFAULT '',
                position    TEXT NOT NULL DEFAULT '',
                is_active   INTEGER NOT NULL DEFAULT 1,
                created_at  TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS attendance (
                id                  INTEGER PRIMARY KEY AUTOINCREMENT,
                employee_id         INTEGER NOT NULL REFERENCES employees(id),
                date                TEXT NOT NULL,
                check_in            TEXT,
                check_out           TEXT,
                status              TEXT NOT NULL DEFAULT 'normal',
                late_minutes        INTEGER NOT NULL DEFAULT 0,
                overtime_minutes    INTEGER NOT NULL DEFAULT 0,
                early_leave_minutes INTEGER NOT NULL DEFAULT 0,
                UNIQUE(employee_id, date)
            );

            CREATE TABLE IF NOT EXISTS breaks (
                id                INTEGER PRIMARY KEY AUTOINCREMENT,
                employee_id       INTEGER NOT NULL REFERENCES employees(id),
                attendance_id     INTEGER NOT NULL REFERENCES attendance(id),
                break_type        TEXT NOT NULL,
                started_at        TEXT NOT NULL,
                ended_at          TEXT,
                scheduled_minutes INTEGER NOT NULL,
                actual_minutes    REAL
            );

            CREATE INDEX IF NOT EXISTS idx_attendance_employee_date
                ON attendance(employee_id, date);
            CREATE INDEX IF NOT EXISTS idx_breaks_employee_open
                ON breaks(employee_id) WHERE ended_at IS NULL;
            CREATE INDEX IF NOT EXISTS idx_breaks_started_at
                ON breaks(started_at);",
        )?;
        Ok(())
    }

    // ── Employees ────────────────────────────────────────────────────

    /// Create the employee on first interaction, or refresh name/username
    /// on a later one. Department, position and activation are left alone
    /// on conflict; admins change those through [`Self::update_employee`].
    pub fn upsert_employee(
        &self,
        id: EmployeeId,
        username: Option<&str>,
        full_name: &str,
        created_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO employees (id, username, full_name, created_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET username = ?2, full_name = ?3",
            params![id, username, full_name, created_at.to_rfc3339()],
        )?;
        Ok(())
    }

    pub fn get_employee(&self, id: EmployeeId) -> Result<Option<Employee>, StoreError> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {EMPLOYEE_COLS} FROM employees WHERE id = ?1"))?;
        Ok(stmt.query_row(params![id], row_to_employee).optional()?)
    }

    pub fn get_employee_by_username(
        &self,
        username: &str,
    ) -> Result<Option<Employee>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {EMPLOYEE_COLS} FROM employees WHERE username = ?1"
        ))?;
        Ok(stmt
            .query_row(params![username], row_to_employee)
            .optional()?)
    }

    pub fn list_employees(&self) -> Result<Vec<Employee>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {EMPLOYEE_COLS} FROM employees ORDER BY full_name"
        ))?;
        let rows = stmt.query_map([], row_to_employee)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Update only the fields that are `Some`. Returns false when the
    /// employee does not exist.
    pub fn update_employee(
        &self,
        id: EmployeeId,
        department: Option<&str>,
        position: Option<&str>,
        is_active: Option<bool>,
    ) -> Result<bool, StoreError> {
        let changed = self.conn.execute(
            "UPDATE employees SET
                department = COALESCE(?2, department),
                position   = COALESCE(?3, position),
                is_active  = COALESCE(?4, is_active)
             WHERE id = ?1",
            params![id, department, position, is_active.map(i64::from)],
        )?;
        Ok(changed > 0)
    }

    /// Soft delete: history stays, the employee just goes inactive.
    pub fn deactivate_employee(&self, id: EmployeeId) -> Result<bool, StoreError> {
        let changed = self
            .conn
            .execute("UPDATE employees SET is_active = 0 WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    // ── Attendance ───────────────────────────────────────────────────

    pub fn day_record(
        &self,
        employee_id: EmployeeId,
        date: NaiveDate,
    ) -> Result<Option<AttendanceDay>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ATTENDANCE_COLS} FROM attendance WHERE employee_id = ?1 AND date = ?2"
        ))?;
        Ok(stmt
            .query_row(
                params![employee_id, date.format("%Y-%m-%d").to_string()],
                row_to_attendance,
            )
            .optional()?)
    }

    /// Create the day record with its check-in. The UNIQUE(employee_id,
    /// date) constraint backs the one-record-per-day invariant.
    pub fn insert_check_in(
        &self,
        employee_id: EmployeeId,
        date: NaiveDate,
        at: DateTime<Utc>,
        late_minutes: u32,
    ) -> Result<i64, StoreError> {
        self.conn.execute(
            "INSERT INTO attendance (employee_id, date, check_in, status, late_minutes)
             VALUES (?1, ?2, ?3, 'normal', ?4)",
            params![
                employee_id,
                date.format("%Y-%m-%d").to_string(),
                at.to_rfc3339(),
                late_minutes
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Set the check-out fields exactly once. The `check_out IS NULL`
    /// guard makes a duplicate check-out a no-op at the row level even if
    /// two callers race past the state check.
    pub fn set_check_out(
        &self,
        attendance_id: i64,
        at: DateTime<Utc>,
        overtime_minutes: u32,
        early_leave_minutes: u32,
    ) -> Result<bool, StoreError> {
        let changed = self.conn.execute(
            "UPDATE attendance
             SET check_out = ?2, overtime_minutes = ?3, early_leave_minutes = ?4
             WHERE id = ?1 AND check_out IS NULL",
            params![
                attendance_id,
                at.to_rfc3339(),
                overtime_minutes,
                early_leave_minutes
            ],
        )?;
        Ok(changed > 0)
    }

    pub fn attendance_range(
        &self,
        employee_id: EmployeeId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AttendanceDay>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ATTENDANCE_COLS} FROM attendance
             WHERE employee_id = ?1 AND date BETWEEN ?2 AND ?3
             ORDER BY date"
        ))?;
        let rows = stmt.query_map(
            params![
                employee_id,
                from.format("%Y-%m-%d").to_string(),
                to.format("%Y-%m-%d").to_string()
            ],
            row_to_attendance,
        )?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// All attendance rows for one date joined with employee names,
    /// ordered by name. Feeds the admin overview.
    pub fn attendance_for_date_all(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<(String, AttendanceDay)>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT e.full_name, {NAMED_ATTENDANCE_COLS} FROM attendance a
             JOIN employees e ON a.employee_id = e.id
             WHERE a.date = ?1
             ORDER BY e.full_name"
        ))?;
        let rows = stmt.query_map(
            params![date.format("%Y-%m-%d").to_string()],
            row_to_named_attendance,
        )?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Attendance rows for a date range joined with employee names,
    /// ordered by date then name. Feeds the period export.
    pub fn attendance_range_all(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<(String, AttendanceDay)>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT e.full_name, {NAMED_ATTENDANCE_COLS} FROM attendance a
             JOIN employees e ON a.employee_id = e.id
             WHERE a.date BETWEEN ?1 AND ?2
             ORDER BY a.date, e.full_name"
        ))?;
        let rows = stmt.query_map(
            params![
                from.format("%Y-%m-%d").to_string(),
                to.format("%Y-%m-%d").to_string()
            ],
            row_to_named_attendance,
        )?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    // ── Breaks ───────────────────────────────────────────────────────

    pub fn insert_break(
        &self,
        employee_id: EmployeeId,
        attendance_id: i64,
        break_type: &str,
        started_at: DateTime<Utc>,
        scheduled_minutes: u32,
    ) -> Result<i64, StoreError> {
        self.conn.execute(
            "INSERT INTO breaks (employee_id, attendance_id, break_type, started_at, scheduled_minutes)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                employee_id,
                attendance_id,
                break_type,
                started_at.to_rfc3339(),
                scheduled_minutes
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// The employee's open break, if any. There is at most one; the
    /// ordering guards against historical data that predates the
    /// invariant.
    pub fn active_break(
        &self,
        employee_id: EmployeeId,
    ) -> Result<Option<BreakSession>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {BREAK_COLS} FROM breaks
             WHERE employee_id = ?1 AND ended_at IS NULL
             ORDER BY started_at DESC, id DESC
             LIMIT 1"
        ))?;
        Ok(stmt
            .query_row(params![employee_id], row_to_break)
            .optional()?)
    }

    /// Close a break exactly once. The `ended_at IS NULL` guard keeps the
    /// row immutable after the first close.
    pub fn close_break(
        &self,
        id: i64,
        ended_at: DateTime<Utc>,
        actual_minutes: f64,
    ) -> Result<bool, StoreError> {
        let changed = self.conn.execute(
            "UPDATE breaks SET ended_at = ?2, actual_minutes = ?3
             WHERE id = ?1 AND ended_at IS NULL",
            params![id, ended_at.to_rfc3339(), actual_minutes],
        )?;
        Ok(changed > 0)
    }

    pub fn get_break(&self, id: i64) -> Result<Option<BreakSession>, StoreError> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {BREAK_COLS} FROM breaks WHERE id = ?1"))?;
        Ok(stmt.query_row(params![id], row_to_break).optional()?)
    }

    /// All of the employee's breaks that started on `date`, in start
    /// order.
    pub fn breaks_for_day(
        &self,
        employee_id: EmployeeId,
        date: NaiveDate,
    ) -> Result<Vec<BreakSession>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {BREAK_COLS} FROM breaks
             WHERE employee_id = ?1 AND date(started_at) = ?2
             ORDER BY started_at"
        ))?;
        let rows = stmt.query_map(
            params![employee_id, date.format("%Y-%m-%d").to_string()],
            row_to_break,
        )?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    // ── Stats ────────────────────────────────────────────────────────

    pub fn system_stats(&self, today: NaiveDate) -> Result<SystemStats, StoreError> {
        let today_str = today.format("%Y-%m-%d").to_string();
        let count = |sql: &str, with_date: bool| -> Result<u64, rusqlite::Error> {
            if with_date {
                self.conn
                    .query_row(sql, params![today_str], |row| row.get(0))
            } else {
                self.conn.query_row(sql, [], |row| row.get(0))
            }
        };
        Ok(SystemStats {
            total_employees: count("SELECT COUNT(*) FROM employees", false)?,
            active_employees: count(
                "SELECT COUNT(*) FROM employees WHERE is_active = 1",
                false,
            )?,
            today_attendance: count("SELECT COUNT(*) FROM attendance WHERE date = ?1", true)?,
            total_attendance: count("SELECT COUNT(*) FROM attendance", false)?,
            today_breaks: count(
                "SELECT COUNT(*) FROM breaks WHERE date(started_at) = ?1",
                true,
            )?,
            total_breaks: count("SELECT COUNT(*) FROM breaks", false)?,
        })
    }
}
