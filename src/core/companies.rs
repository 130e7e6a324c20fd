use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use crate::core::attendance::{company_key, is_registrable_company};
use crate::core::store::{SharedWorksheet, StoreResult};

/// Append-only list of organization names referenced by tasks.
#[derive(Clone)]
pub struct CompanyRegistry {
    sheet: SharedWorksheet,
    write_lock: Arc<Mutex<()>>,
}

impl CompanyRegistry {
    pub fn new(sheet: SharedWorksheet) -> Self {
        Self {
            sheet,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Names in insertion order. Blank cells are skipped.
    pub async fn list(&self) -> StoreResult<Vec<String>> {
        let rows = self.sheet.rows().await?;
        Ok(rows
            .iter()
            .skip(1)
            .filter_map(|row| row.first())
            .map(|name| name.trim())
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Registers `name` unless it is blank, the "other" sentinel, or already
    /// present ignoring case. Returns whether a row was written.
    pub async fn add(&self, name: &str) -> StoreResult<bool> {
        let name = name.trim();
        if !is_registrable_company(name) {
            return Ok(false);
        }
        let _guard = self.write_lock.lock().await;
        let key = company_key(name);
        let existing = self.list().await?;
        if existing.iter().any(|c| company_key(c) == key) {
            return Ok(false);
        }
        self.sheet.append_row(vec![name.to_string()]).await?;
        info!("Registered company '{}'", name);
        Ok(true)
    }
}
