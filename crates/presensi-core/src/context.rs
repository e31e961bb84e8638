//! Per-employee session context for multi-step input flows.
//!
//! The conversational layer sometimes needs a second message from the
//! same employee (a registration name, a new setting value). Instead of
//! ambient per-user globals, the pending flow lives here with a defined
//! lifecycle: entered when the flow starts, taken on completion, cleared
//! on cancellation.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use crate::storage::EmployeeId;

/// A multi-step flow awaiting the employee's next input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingFlow {
    /// Registration started; waiting for the full name.
    AwaitingRegistrationName,
    /// Admin is editing an employee field; waiting for the new value.
    AwaitingEmployeeField {
        target: EmployeeId,
        field: EmployeeField,
    },
    /// Admin is changing a setting; waiting for the new value.
    AwaitingSettingValue { key: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmployeeField {
    Department,
    Position,
}

#[derive(Debug, Clone)]
pub struct SessionContext {
    pub flow: PendingFlow,
    pub entered_at: DateTime<Utc>,
}

/// Store of in-flight flows, at most one per employee.
#[derive(Debug, Default)]
pub struct SessionContextStore {
    contexts: Mutex<HashMap<EmployeeId, SessionContext>>,
}

impl SessionContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter a flow for the employee, replacing any previous one.
    pub fn enter(&self, employee_id: EmployeeId, flow: PendingFlow, at: DateTime<Utc>) {
        let mut contexts = self.contexts.lock().unwrap();
        contexts.insert(
            employee_id,
            SessionContext {
                flow,
                entered_at: at,
            },
        );
    }

    /// The employee's pending flow, if any.
    pub fn peek(&self, employee_id: EmployeeId) -> Option<SessionContext> {
        self.contexts.lock().unwrap().get(&employee_id).cloned()
    }

    /// Complete the flow: remove and return it so the caller can act on
    /// the follow-up input.
    pub fn complete(&self, employee_id: EmployeeId) -> Option<SessionContext> {
        self.contexts.lock().unwrap().remove(&employee_id)
    }

    /// Abandon the flow, if any.
    pub fn cancel(&self, employee_id: EmployeeId) {
        self.contexts.lock().unwrap().remove(&employee_id);
    }
}
