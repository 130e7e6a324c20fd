use std::collections::HashMap;
use tracing::debug;

use crate::core::attendance::{AttendanceError, EmployeeProfile};
use crate::core::store::{DIRECTORY_HEADER, SharedWorksheet, StoreResult, keyed_records};

/// Read access to the employee directory worksheet.
///
/// Every call reads the worksheet again; nothing is memoized.
#[derive(Clone)]
pub struct IdentityResolver {
    sheet: SharedWorksheet,
}

impl IdentityResolver {
    pub fn new(sheet: SharedWorksheet) -> Self {
        Self { sheet }
    }

    /// Directory in worksheet order. Rows without an email are skipped.
    pub async fn list(&self) -> StoreResult<Vec<EmployeeProfile>> {
        let records = keyed_records(self.sheet.as_ref()).await?;
        Ok(records
            .iter()
            .filter_map(profile_from_record)
            .collect())
    }

    pub async fn resolve(&self, email: &str) -> Result<EmployeeProfile, AttendanceError> {
        let key = email.trim().to_lowercase();
        let employees = self
            .list()
            .await
            .map_err(AttendanceError::read("employee directory"))?;
        let mut lookup: HashMap<String, EmployeeProfile> = HashMap::with_capacity(employees.len());
        for employee in employees {
            lookup
                .entry(employee.email.trim().to_lowercase())
                .or_insert(employee);
        }
        debug!("Directory holds {} employees", lookup.len());
        lookup.remove(&key).ok_or(AttendanceError::NotRegistered)
    }

    /// Appends one employee row, laid out to match the worksheet's header.
    pub async fn append(&self, employee: &EmployeeProfile) -> StoreResult<()> {
        let rows = self.sheet.rows().await?;
        let header: Vec<String> = match rows.first() {
            Some(header) => header.iter().map(|h| h.trim().to_string()).collect(),
            None => {
                let header: Vec<String> = DIRECTORY_HEADER.iter().map(|h| h.to_string()).collect();
                self.sheet.append_row(header.clone()).await?;
                header
            }
        };
        let row = header
            .iter()
            .map(|column| match column.as_str() {
                "ID" => employee.id.clone(),
                "Full Name" => employee.full_name.clone(),
                "Nickname" => employee.nickname.clone(),
                "E-mail" => employee.email.clone(),
                "Office mail" => employee.office_email.clone(),
                "Score" => employee.score.map(|s| s.to_string()).unwrap_or_default(),
                _ => String::new(),
            })
            .collect();
        self.sheet.append_row(row).await
    }
}

fn profile_from_record(record: &HashMap<String, String>) -> Option<EmployeeProfile> {
    let field = |name: &str| {
        record
            .get(name)
            .map(|v| v.trim().to_string())
            .unwrap_or_default()
    };
    let email = field("E-mail");
    if email.is_empty() {
        return None;
    }
    Some(EmployeeProfile {
        id: field("ID"),
        full_name: field("Full Name"),
        nickname: field("Nickname"),
        email,
        office_email: field("Office mail"),
        score: field("Score").parse().ok(),
    })
}
