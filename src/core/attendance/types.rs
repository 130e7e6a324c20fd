use serde::{Deserialize, Serialize};

use super::error::AttendanceError;

pub const CHECKED_IN: &str = "Checked In";
pub const CHECKED_OUT: &str = "Checked Out";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmployeeProfile {
    pub id: String,
    pub full_name: String,
    pub nickname: String,
    pub email: String,
    pub office_email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskEntry {
    #[serde(default)]
    pub task_for: String,
    #[serde(default)]
    pub task_name: String,
    #[serde(default)]
    pub task_details: String,
    #[serde(default)]
    pub my_role: String,
}

impl TaskEntry {
    pub fn trimmed(&self) -> Self {
        Self {
            task_for: self.task_for.trim().to_string(),
            task_name: self.task_name.trim().to_string(),
            task_details: self.task_details.trim().to_string(),
            my_role: self.my_role.trim().to_string(),
        }
    }

    pub fn is_complete(&self) -> bool {
        [
            &self.task_for,
            &self.task_name,
            &self.task_details,
            &self.my_role,
        ]
        .iter()
        .all(|f| !f.trim().is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    CheckIn,
    CheckOut,
}

impl Action {
    pub fn parse(raw: &str) -> Result<Self, AttendanceError> {
        match raw.trim().to_lowercase().as_str() {
            "checkin" => Ok(Self::CheckIn),
            "checkout" => Ok(Self::CheckOut),
            _ => Err(AttendanceError::InvalidAction(raw.trim().to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CheckIn => "checkin",
            Self::CheckOut => "checkout",
        }
    }
}

/// Session state of one (employee, date) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NoRecord,
    CheckedIn,
    CheckedOut,
}

/// One ledger row, by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttendanceRecord {
    pub employee_id: String,
    pub nickname: String,
    pub full_name: String,
    pub employee_email: String,
    pub office_email: String,
    pub date: String,
    pub check_in_time: String,
    pub check_in_status: String,
    pub check_out_time: String,
    pub check_out_status: String,
    pub check_in_ip: String,
    pub check_out_ip: String,
    pub task_for: String,
    pub task_name: String,
    pub task_details: String,
    pub my_role: String,
    /// Worksheet row this record was read from. Only meaningful within the
    /// snapshot it came from; `None` for records not yet written.
    pub ledger_position: Option<usize>,
}

impl AttendanceRecord {
    /// A fresh check-in row: identity, date, check-in fields; everything else blank.
    pub fn check_in(employee: &EmployeeProfile, date: &str, time: &str, ip: &str) -> Self {
        Self {
            employee_id: employee.id.clone(),
            nickname: employee.nickname.clone(),
            full_name: employee.full_name.clone(),
            employee_email: employee.email.clone(),
            office_email: employee.office_email.clone(),
            date: date.to_string(),
            check_in_time: time.to_string(),
            check_in_status: CHECKED_IN.to_string(),
            check_in_ip: ip.to_string(),
            ..Self::default()
        }
    }

    pub fn state(&self) -> SessionState {
        if self.check_out_status.trim() == CHECKED_OUT {
            SessionState::CheckedOut
        } else if self.check_in_status.trim() == CHECKED_IN {
            SessionState::CheckedIn
        } else {
            SessionState::NoRecord
        }
    }

    pub fn with_task(mut self, task: &TaskEntry) -> Self {
        self.task_for = task.task_for.clone();
        self.task_name = task.task_name.clone();
        self.task_details = task.task_details.clone();
        self.my_role = task.my_role.clone();
        self
    }
}
