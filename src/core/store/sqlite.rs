use anyhow::Result;
use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use super::{StoreError, StoreResult, Workbook, Worksheet};
use crate::core::config::StoreConfig;

/// Local worksheet persistence: every sheet lives in one table keyed by
/// (sheet, position), with the cells of a row stored as a JSON array.
pub struct SqliteWorkbook {
    db: Arc<Mutex<Connection>>,
    ledger: String,
    directory: String,
    companies: String,
}

impl SqliteWorkbook {
    pub fn open(path: &Path, config: &StoreConfig) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let db = Connection::open(path)?;
        info!("SQLite workbook at {}", path.display());
        Self::init(db, config)
    }

    #[cfg(test)]
    pub fn in_memory(config: &StoreConfig) -> Result<Self> {
        Self::init(Connection::open_in_memory()?, config)
    }

    fn init(db: Connection, config: &StoreConfig) -> Result<Self> {
        db.execute(
            "CREATE TABLE IF NOT EXISTS worksheet_rows (
                sheet TEXT NOT NULL,
                position INTEGER NOT NULL,
                cells TEXT NOT NULL,
                PRIMARY KEY (sheet, position)
            )",
            [],
        )?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            ledger: config.ledger_sheet.clone(),
            directory: config.directory_sheet.clone(),
            companies: config.companies_sheet.clone(),
        })
    }

    fn sheet(&self, title: &str) -> Arc<SqliteWorksheet> {
        Arc::new(SqliteWorksheet {
            db: self.db.clone(),
            title: title.to_string(),
        })
    }

    pub fn workbook(&self) -> Workbook {
        Workbook {
            ledger: self.sheet(&self.ledger),
            directory: self.sheet(&self.directory),
            companies: self.sheet(&self.companies),
        }
    }
}

struct SqliteWorksheet {
    db: Arc<Mutex<Connection>>,
    title: String,
}

#[async_trait]
impl Worksheet for SqliteWorksheet {
    fn title(&self) -> &str {
        &self.title
    }

    async fn rows(&self) -> StoreResult<Vec<Vec<String>>> {
        let db = self.db.lock().await;
        let mut stmt =
            db.prepare("SELECT cells FROM worksheet_rows WHERE sheet = ?1 ORDER BY position")?;
        let encoded = stmt.query_map(params![self.title], |row| row.get::<_, String>(0))?;

        let mut rows = Vec::new();
        for cells in encoded {
            rows.push(serde_json::from_str(&cells?)?);
        }
        Ok(rows)
    }

    async fn insert_row(&self, position: usize, cells: Vec<String>) -> StoreResult<()> {
        let encoded = serde_json::to_string(&cells)?;
        let mut db = self.db.lock().await;
        let tx = db.transaction()?;
        let count: i64 = tx.query_row(
            "SELECT COUNT(*) FROM worksheet_rows WHERE sheet = ?1",
            params![self.title],
            |row| row.get(0),
        )?;
        if position == 0 || position as i64 > count + 1 {
            return Err(StoreError::OutOfRange {
                sheet: self.title.clone(),
                position,
            });
        }
        // Shift through negative positions so the primary key never collides mid-update.
        tx.execute(
            "UPDATE worksheet_rows SET position = -(position + 1) WHERE sheet = ?1 AND position >= ?2",
            params![self.title, position as i64],
        )?;
        tx.execute(
            "UPDATE worksheet_rows SET position = -position WHERE sheet = ?1 AND position < 0",
            params![self.title],
        )?;
        tx.execute(
            "INSERT INTO worksheet_rows (sheet, position, cells) VALUES (?1, ?2, ?3)",
            params![self.title, position as i64, encoded],
        )?;
        tx.commit()?;
        Ok(())
    }

    async fn append_row(&self, cells: Vec<String>) -> StoreResult<()> {
        let encoded = serde_json::to_string(&cells)?;
        let db = self.db.lock().await;
        db.execute(
            "INSERT INTO worksheet_rows (sheet, position, cells)
             VALUES (?1, (SELECT COALESCE(MAX(position), 0) + 1 FROM worksheet_rows WHERE sheet = ?1), ?2)",
            params![self.title, encoded],
        )?;
        Ok(())
    }

    async fn update_cell(&self, position: usize, column: usize, value: &str) -> StoreResult<()> {
        if column == 0 {
            return Err(StoreError::Backend("column index is 1-based".to_string()));
        }
        let db = self.db.lock().await;
        let current: Option<String> = db
            .query_row(
                "SELECT cells FROM worksheet_rows WHERE sheet = ?1 AND position = ?2",
                params![self.title, position as i64],
                |row| row.get(0),
            )
            .optional()?;
        let Some(current) = current else {
            return Err(StoreError::OutOfRange {
                sheet: self.title.clone(),
                position,
            });
        };

        let mut cells: Vec<String> = serde_json::from_str(&current)?;
        if cells.len() < column {
            cells.resize(column, String::new());
        }
        cells[column - 1] = value.to_string();
        db.execute(
            "UPDATE worksheet_rows SET cells = ?1 WHERE sheet = ?2 AND position = ?3",
            params![serde_json::to_string(&cells)?, self.title, position as i64],
        )?;
        Ok(())
    }
}
