use super::error::AttendanceError;
use super::ledger::{LedgerColumn, LedgerMutation};
use super::types::{
    Action, AttendanceRecord, CHECKED_OUT, EmployeeProfile, SessionState, TaskEntry,
};
use crate::core::clock::Stamp;

/// Company name that is never registered.
pub const OTHER_COMPANY: &str = "other";

/// Everything a transition needs. Built inside the session lock.
pub struct TransitionInput<'a> {
    pub action: Action,
    pub employee: &'a EmployeeProfile,
    pub stamp: &'a Stamp,
    pub remote_ip: &'a str,
    pub tasks: &'a [TaskEntry],
    pub current: Option<&'a AttendanceRecord>,
}

/// Writes that realize one accepted transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerPlan {
    pub target: SessionState,
    pub mutations: Vec<LedgerMutation>,
    pub companies: Vec<String>,
}

/// Trims every task and rejects the list unless each has all four fields.
pub fn validate_tasks(tasks: &[TaskEntry]) -> Result<Vec<TaskEntry>, AttendanceError> {
    if tasks.is_empty() {
        return Err(AttendanceError::MissingTasks);
    }
    tasks
        .iter()
        .enumerate()
        .map(|(idx, task)| {
            let task = task.trimmed();
            if task.is_complete() {
                Ok(task)
            } else {
                Err(AttendanceError::IncompleteTask { index: idx + 1 })
            }
        })
        .collect()
}

/// Comparison key for company names: trimmed, Unicode lowercase.
pub fn company_key(name: &str) -> String {
    name.trim().to_lowercase()
}

pub fn is_registrable_company(name: &str) -> bool {
    let key = company_key(name);
    !key.is_empty() && key != OTHER_COMPANY
}

pub fn plan(input: TransitionInput<'_>) -> Result<LedgerPlan, AttendanceError> {
    let state = input
        .current
        .map(AttendanceRecord::state)
        .unwrap_or(SessionState::NoRecord);

    match input.action {
        Action::CheckIn => match state {
            SessionState::NoRecord => Ok(LedgerPlan {
                target: SessionState::CheckedIn,
                mutations: vec![LedgerMutation::Append(AttendanceRecord::check_in(
                    input.employee,
                    &input.stamp.date,
                    &input.stamp.time,
                    input.remote_ip,
                ))],
                companies: Vec::new(),
            }),
            SessionState::CheckedIn | SessionState::CheckedOut => {
                Err(AttendanceError::AlreadyCheckedIn)
            }
        },
        Action::CheckOut => match (state, input.current) {
            (SessionState::CheckedIn, Some(current)) => {
                let Some(position) = current.ledger_position else {
                    return Err(AttendanceError::CheckInRequired);
                };
                let tasks = validate_tasks(input.tasks)?;
                Ok(check_out(current, position, &tasks, input.stamp, input.remote_ip))
            }
            (SessionState::CheckedOut, _) => Err(AttendanceError::AlreadyCheckedOut),
            _ => Err(AttendanceError::CheckInRequired),
        },
    }
}

fn check_out(
    current: &AttendanceRecord,
    position: usize,
    tasks: &[TaskEntry],
    stamp: &Stamp,
    remote_ip: &str,
) -> LedgerPlan {
    let mut mutations = Vec::with_capacity(tasks.len());

    // Check-out cells first, then the first task.
    let first = &tasks[0];
    mutations.push(LedgerMutation::UpdateFields {
        position,
        fields: vec![
            (LedgerColumn::CheckOutTime, stamp.time.clone()),
            (LedgerColumn::CheckOutStatus, CHECKED_OUT.to_string()),
            (LedgerColumn::CheckOutIp, remote_ip.to_string()),
            (LedgerColumn::TaskFor, first.task_for.clone()),
            (LedgerColumn::TaskName, first.task_name.clone()),
            (LedgerColumn::TaskDetails, first.task_details.clone()),
            (LedgerColumn::MyRole, first.my_role.clone()),
        ],
    });

    for task in &tasks[1..] {
        let sibling = AttendanceRecord {
            check_out_time: stamp.time.clone(),
            check_out_status: CHECKED_OUT.to_string(),
            check_out_ip: remote_ip.to_string(),
            ledger_position: None,
            ..current.clone()
        }
        .with_task(task);
        mutations.push(LedgerMutation::Append(sibling));
    }

    let mut companies: Vec<String> = Vec::new();
    let mut seen: Vec<String> = Vec::new();
    for task in tasks {
        let name = task.task_for.trim();
        let key = company_key(name);
        if is_registrable_company(name) && !seen.contains(&key) {
            seen.push(key);
            companies.push(name.to_string());
        }
    }

    LedgerPlan {
        target: SessionState::CheckedOut,
        mutations,
        companies,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_task_list_is_missing_tasks() {
        assert!(matches!(validate_tasks(&[]), Err(AttendanceError::MissingTasks)));
    }

    #[test]
    fn incomplete_task_reports_one_based_index() {
        let good = TaskEntry {
            task_for: "Acme".into(),
            task_name: "Deploy".into(),
            task_details: "prod".into(),
            my_role: "ops".into(),
        };
        let bad = TaskEntry {
            my_role: " ".into(),
            ..good.clone()
        };
        assert!(matches!(
            validate_tasks(&[good, bad]),
            Err(AttendanceError::IncompleteTask { index: 2 })
        ));
    }

    #[test]
    fn other_and_blank_companies_are_not_registrable() {
        assert!(is_registrable_company("Acme"));
        assert!(!is_registrable_company(" Other "));
        assert!(!is_registrable_company("OTHER"));
        assert!(!is_registrable_company("  "));
    }

    #[test]
    fn company_key_folds_unicode_case() {
        assert_eq!(company_key(" Élan "), company_key("élan"));
        assert_eq!(company_key("ÖRSTED"), "örsted");
    }
}
