//! Row-oriented worksheet storage.
//!
//! A worksheet is an ordered list of rows of string cells. Row 1 is the
//! header; positions handed to and returned from this module are 1-based
//! worksheet rows, matching the addressing of hosted spreadsheets. None of
//! the backends offer transactions: every call is an independent write.

mod memory;
mod sheets;
mod sqlite;

pub use memory::{MemoryWorkbook, MemoryWorksheet};
pub use sheets::SheetsWorkbook;
pub use sqlite::SqliteWorkbook;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::core::config::{SheetsConfig, StoreBackend, StoreConfig};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("worksheet '{0}' not found")]
    MissingWorksheet(String),
    #[error("row {position} is out of range for worksheet '{sheet}'")]
    OutOfRange { sheet: String, position: usize },
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("corrupt row encoding: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("sheets api: {0}")]
    Http(#[from] reqwest::Error),
    #[error("sheets api returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("{0}")]
    Backend(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// The CRUD contract every tabular backend provides.
#[async_trait]
pub trait Worksheet: Send + Sync {
    fn title(&self) -> &str;

    /// All rows in store order, header included.
    async fn rows(&self) -> StoreResult<Vec<Vec<String>>>;

    /// Inserts `cells` so that it becomes row `position`, shifting later rows down.
    async fn insert_row(&self, position: usize, cells: Vec<String>) -> StoreResult<()>;

    async fn append_row(&self, cells: Vec<String>) -> StoreResult<()>;

    /// `column` is 1-based.
    async fn update_cell(&self, position: usize, column: usize, value: &str) -> StoreResult<()>;
}

pub type SharedWorksheet = Arc<dyn Worksheet>;

/// The three worksheets the service reads and writes.
#[derive(Clone)]
pub struct Workbook {
    pub ledger: SharedWorksheet,
    pub directory: SharedWorksheet,
    pub companies: SharedWorksheet,
}

pub const DIRECTORY_HEADER: [&str; 6] = [
    "ID",
    "Full Name",
    "Nickname",
    "E-mail",
    "Office mail",
    "Score",
];
pub const COMPANY_HEADER: [&str; 1] = ["Company Name"];

impl Workbook {
    pub fn open(config: &StoreConfig, sheets: &SheetsConfig) -> anyhow::Result<Self> {
        let workbook = match config.backend {
            StoreBackend::Memory => MemoryWorkbook::named(
                &config.ledger_sheet,
                &config.directory_sheet,
                &config.companies_sheet,
            )
            .workbook(),
            StoreBackend::Sqlite => SqliteWorkbook::open(&config.sqlite_path(), config)?.workbook(),
            StoreBackend::Sheets => SheetsWorkbook::new(sheets, config)?.workbook(),
        };
        tracing::info!(
            "Opened {:?} workbook (ledger='{}', directory='{}', companies='{}')",
            config.backend,
            workbook.ledger.title(),
            workbook.directory.title(),
            workbook.companies.title()
        );
        Ok(workbook)
    }

    /// Writes header rows into empty worksheets.
    pub async fn ensure_headers(&self) -> StoreResult<()> {
        let ledger_header: Vec<&str> = crate::core::attendance::LedgerColumn::ALL
            .iter()
            .map(|c| c.header())
            .collect();
        ensure_header(self.ledger.as_ref(), &ledger_header).await?;
        ensure_header(self.directory.as_ref(), &DIRECTORY_HEADER).await?;
        ensure_header(self.companies.as_ref(), &COMPANY_HEADER).await?;
        Ok(())
    }
}

async fn ensure_header(sheet: &dyn Worksheet, header: &[&str]) -> StoreResult<()> {
    if sheet.rows().await?.is_empty() {
        tracing::info!("Writing header row into empty worksheet '{}'", sheet.title());
        sheet
            .append_row(header.iter().map(|h| h.to_string()).collect())
            .await?;
    }
    Ok(())
}

/// Reads a worksheet as header-keyed records, skipping the header row.
///
/// Header names are trimmed, cell values are not. Short rows yield empty
/// strings for the missing trailing cells.
pub async fn keyed_records(sheet: &dyn Worksheet) -> StoreResult<Vec<HashMap<String, String>>> {
    let rows = sheet.rows().await?;
    let mut iter = rows.into_iter();
    let Some(header) = iter.next() else {
        return Ok(Vec::new());
    };
    Ok(iter
        .map(|row| {
            header
                .iter()
                .enumerate()
                .map(|(i, key)| (key.trim().to_string(), row.get(i).cloned().unwrap_or_default()))
                .collect()
        })
        .collect())
}
