use tracing::{debug, error};

use super::types::AttendanceRecord;
use crate::core::store::{SharedWorksheet, StoreResult};

/// Fixed ledger columns. Ordinals are 1-based worksheet columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerColumn {
    Id = 1,
    Nickname,
    FullName,
    Email,
    OfficeEmail,
    Date,
    CheckInTime,
    CheckInStatus,
    CheckOutTime,
    CheckOutStatus,
    CheckInIp,
    CheckOutIp,
    TaskFor,
    TaskName,
    TaskDetails,
    MyRole,
}

impl LedgerColumn {
    pub const ALL: [LedgerColumn; 16] = [
        Self::Id,
        Self::Nickname,
        Self::FullName,
        Self::Email,
        Self::OfficeEmail,
        Self::Date,
        Self::CheckInTime,
        Self::CheckInStatus,
        Self::CheckOutTime,
        Self::CheckOutStatus,
        Self::CheckInIp,
        Self::CheckOutIp,
        Self::TaskFor,
        Self::TaskName,
        Self::TaskDetails,
        Self::MyRole,
    ];

    pub fn ordinal(self) -> usize {
        self as usize
    }

    pub fn header(self) -> &'static str {
        match self {
            Self::Id => "ID",
            Self::Nickname => "Nickname",
            Self::FullName => "Full Name",
            Self::Email => "E-mail",
            Self::OfficeEmail => "Office mail",
            Self::Date => "Date",
            Self::CheckInTime => "Check-In Time",
            Self::CheckInStatus => "Check-In Status",
            Self::CheckOutTime => "Check-Out Time",
            Self::CheckOutStatus => "Check-Out Status",
            Self::CheckInIp => "Check-In IP",
            Self::CheckOutIp => "Check-Out IP",
            Self::TaskFor => "Task For",
            Self::TaskName => "Task Name",
            Self::TaskDetails => "Task Details",
            Self::MyRole => "My Role",
        }
    }

    fn field(self, record: &AttendanceRecord) -> &str {
        match self {
            Self::Id => &record.employee_id,
            Self::Nickname => &record.nickname,
            Self::FullName => &record.full_name,
            Self::Email => &record.employee_email,
            Self::OfficeEmail => &record.office_email,
            Self::Date => &record.date,
            Self::CheckInTime => &record.check_in_time,
            Self::CheckInStatus => &record.check_in_status,
            Self::CheckOutTime => &record.check_out_time,
            Self::CheckOutStatus => &record.check_out_status,
            Self::CheckInIp => &record.check_in_ip,
            Self::CheckOutIp => &record.check_out_ip,
            Self::TaskFor => &record.task_for,
            Self::TaskName => &record.task_name,
            Self::TaskDetails => &record.task_details,
            Self::MyRole => &record.my_role,
        }
    }

    fn field_mut(self, record: &mut AttendanceRecord) -> &mut String {
        match self {
            Self::Id => &mut record.employee_id,
            Self::Nickname => &mut record.nickname,
            Self::FullName => &mut record.full_name,
            Self::Email => &mut record.employee_email,
            Self::OfficeEmail => &mut record.office_email,
            Self::Date => &mut record.date,
            Self::CheckInTime => &mut record.check_in_time,
            Self::CheckInStatus => &mut record.check_in_status,
            Self::CheckOutTime => &mut record.check_out_time,
            Self::CheckOutStatus => &mut record.check_out_status,
            Self::CheckInIp => &mut record.check_in_ip,
            Self::CheckOutIp => &mut record.check_out_ip,
            Self::TaskFor => &mut record.task_for,
            Self::TaskName => &mut record.task_name,
            Self::TaskDetails => &mut record.task_details,
            Self::MyRole => &mut record.my_role,
        }
    }
}

impl AttendanceRecord {
    pub fn to_row(&self) -> Vec<String> {
        LedgerColumn::ALL
            .iter()
            .map(|c| c.field(self).to_string())
            .collect()
    }

    pub fn from_row(position: usize, cells: &[String]) -> Self {
        let mut record = Self {
            ledger_position: Some(position),
            ..Self::default()
        };
        for column in LedgerColumn::ALL {
            if let Some(value) = cells.get(column.ordinal() - 1) {
                *column.field_mut(&mut record) = value.clone();
            }
        }
        record
    }
}

/// One positional write against the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerMutation {
    Append(AttendanceRecord),
    InsertAt {
        position: usize,
        record: AttendanceRecord,
    },
    UpdateFields {
        position: usize,
        fields: Vec<(LedgerColumn, String)>,
    },
}

/// Typed access to the ledger worksheet. Holds no cache: every snapshot is
/// a fresh read.
#[derive(Clone)]
pub struct LedgerWriter {
    sheet: SharedWorksheet,
}

impl LedgerWriter {
    pub fn new(sheet: SharedWorksheet) -> Self {
        Self { sheet }
    }

    /// Data rows in store order with their worksheet positions (first data row is 2).
    pub async fn snapshot(&self) -> StoreResult<Vec<AttendanceRecord>> {
        let rows = self.sheet.rows().await?;
        Ok(rows
            .iter()
            .enumerate()
            .skip(1)
            .map(|(idx, cells)| AttendanceRecord::from_row(idx + 1, cells))
            .collect())
    }

    pub async fn insert_at(&self, position: usize, record: &AttendanceRecord) -> StoreResult<()> {
        self.sheet.insert_row(position, record.to_row()).await
    }

    pub async fn append(&self, record: &AttendanceRecord) -> StoreResult<()> {
        self.sheet.append_row(record.to_row()).await
    }

    /// Issues one cell write per field, in order. Not atomic.
    pub async fn update_fields(
        &self,
        position: usize,
        fields: &[(LedgerColumn, String)],
    ) -> StoreResult<()> {
        for (column, value) in fields {
            self.sheet
                .update_cell(position, column.ordinal(), value)
                .await?;
        }
        Ok(())
    }

    /// Applies mutations in order and stops at the first failure. Mutations
    /// already applied stay applied.
    pub async fn apply(&self, mutations: &[LedgerMutation]) -> StoreResult<()> {
        for (done, mutation) in mutations.iter().enumerate() {
            let result = match mutation {
                LedgerMutation::Append(record) => self.append(record).await,
                LedgerMutation::InsertAt { position, record } => {
                    self.insert_at(*position, record).await
                }
                LedgerMutation::UpdateFields { position, fields } => {
                    self.update_fields(*position, fields).await
                }
            };
            if let Err(e) = result {
                error!(
                    "Ledger '{}' left partially updated: {} of {} mutations applied before: {}",
                    self.sheet.title(),
                    done,
                    mutations.len(),
                    e
                );
                return Err(e);
            }
            debug!("Applied ledger mutation {}/{}", done + 1, mutations.len());
        }
        Ok(())
    }
}
