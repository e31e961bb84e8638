use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::EmployeeId;

/// Payload delivered to the registered notification sink when a break
/// reminder fires. This is the one event the core pushes outward; every
/// other transition hands its structured outcome back to the caller
/// directly.
///
/// `employee_name` is `None` when the employee row could not be read at
/// fire time; the sink still receives the event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderEvent {
    pub employee_id: EmployeeId,
    pub employee_name: Option<String>,
    pub break_type: String,
    pub started_at: DateTime<Utc>,
    pub fired_at: DateTime<Utc>,
}
