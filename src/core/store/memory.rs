use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::Mutex;

use super::{StoreError, StoreResult, Workbook, Worksheet};

/// In-process worksheet. Used by the `memory` backend and as the test fake.
pub struct MemoryWorksheet {
    title: String,
    rows: Mutex<Vec<Vec<String>>>,
    pub write_calls: AtomicU64,
    fail_reads: AtomicBool,
    /// When set, the write with this zero-based index and every later write fail.
    fail_from_write: Mutex<Option<u64>>,
}

impl MemoryWorksheet {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            rows: Mutex::new(Vec::new()),
            write_calls: AtomicU64::new(0),
            fail_reads: AtomicBool::new(false),
            fail_from_write: Mutex::new(None),
        }
    }

    pub async fn snapshot(&self) -> Vec<Vec<String>> {
        self.rows.lock().await.clone()
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Lets `remaining` more writes succeed, then fails every write after them.
    pub async fn fail_writes_after(&self, remaining: u64) {
        let done = self.write_calls.load(Ordering::SeqCst);
        *self.fail_from_write.lock().await = Some(done + remaining);
    }

    async fn begin_write(&self) -> StoreResult<()> {
        let index = self.write_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(limit) = *self.fail_from_write.lock().await
            && index >= limit
        {
            return Err(StoreError::Backend(format!(
                "injected write failure on '{}'",
                self.title
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Worksheet for MemoryWorksheet {
    fn title(&self) -> &str {
        &self.title
    }

    async fn rows(&self) -> StoreResult<Vec<Vec<String>>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Backend(format!(
                "injected read failure on '{}'",
                self.title
            )));
        }
        Ok(self.rows.lock().await.clone())
    }

    async fn insert_row(&self, position: usize, cells: Vec<String>) -> StoreResult<()> {
        self.begin_write().await?;
        let mut rows = self.rows.lock().await;
        if position == 0 || position > rows.len() + 1 {
            return Err(StoreError::OutOfRange {
                sheet: self.title.clone(),
                position,
            });
        }
        rows.insert(position - 1, cells);
        Ok(())
    }

    async fn append_row(&self, cells: Vec<String>) -> StoreResult<()> {
        self.begin_write().await?;
        self.rows.lock().await.push(cells);
        Ok(())
    }

    async fn update_cell(&self, position: usize, column: usize, value: &str) -> StoreResult<()> {
        self.begin_write().await?;
        let mut rows = self.rows.lock().await;
        let Some(row) = position.checked_sub(1).and_then(|i| rows.get_mut(i)) else {
            return Err(StoreError::OutOfRange {
                sheet: self.title.clone(),
                position,
            });
        };
        if column == 0 {
            return Err(StoreError::Backend("column index is 1-based".to_string()));
        }
        if row.len() < column {
            row.resize(column, String::new());
        }
        row[column - 1] = value.to_string();
        Ok(())
    }
}

#[derive(Clone)]
pub struct MemoryWorkbook {
    pub ledger: Arc<MemoryWorksheet>,
    pub directory: Arc<MemoryWorksheet>,
    pub companies: Arc<MemoryWorksheet>,
}

impl MemoryWorkbook {
    pub fn new() -> Self {
        Self::named("attendance_master", "config_employees", "config_companies")
    }

    pub fn named(ledger: &str, directory: &str, companies: &str) -> Self {
        Self {
            ledger: Arc::new(MemoryWorksheet::new(ledger)),
            directory: Arc::new(MemoryWorksheet::new(directory)),
            companies: Arc::new(MemoryWorksheet::new(companies)),
        }
    }

    pub fn workbook(&self) -> Workbook {
        Workbook {
            ledger: self.ledger.clone(),
            directory: self.directory.clone(),
            companies: self.companies.clone(),
        }
    }
}

impl Default for MemoryWorkbook {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[tokio::test]
    async fn insert_row_shifts_following_rows() {
        let sheet = MemoryWorksheet::new("t");
        sheet.append_row(row(&["h"])).await.unwrap();
        sheet.append_row(row(&["a"])).await.unwrap();
        sheet.insert_row(2, row(&["b"])).await.unwrap();

        assert_eq!(
            sheet.snapshot().await,
            vec![row(&["h"]), row(&["b"]), row(&["a"])]
        );
    }

    #[tokio::test]
    async fn insert_row_rejects_positions_past_the_end() {
        let sheet = MemoryWorksheet::new("t");
        assert!(matches!(
            sheet.insert_row(2, row(&["x"])).await,
            Err(StoreError::OutOfRange { position: 2, .. })
        ));
        assert!(sheet.insert_row(1, row(&["x"])).await.is_ok());
    }

    #[tokio::test]
    async fn update_cell_grows_short_rows() {
        let sheet = MemoryWorksheet::new("t");
        sheet.append_row(row(&["a"])).await.unwrap();
        sheet.update_cell(1, 3, "c").await.unwrap();
        assert_eq!(sheet.snapshot().await, vec![row(&["a", "", "c"])]);
    }

    #[tokio::test]
    async fn update_cell_out_of_range_fails() {
        let sheet = MemoryWorksheet::new("t");
        assert!(sheet.update_cell(1, 1, "x").await.is_err());
        assert!(sheet.update_cell(0, 1, "x").await.is_err());
    }

    #[tokio::test]
    async fn injected_failures_apply_after_threshold() {
        let sheet = MemoryWorksheet::new("t");
        sheet.append_row(row(&["a"])).await.unwrap();
        sheet.fail_writes_after(1).await;
        assert!(sheet.append_row(row(&["b"])).await.is_ok());
        assert!(sheet.append_row(row(&["c"])).await.is_err());
        assert!(sheet.update_cell(1, 1, "z").await.is_err());
        assert_eq!(sheet.snapshot().await.len(), 2);

        sheet.set_fail_reads(true);
        assert!(sheet.rows().await.is_err());
    }
}
