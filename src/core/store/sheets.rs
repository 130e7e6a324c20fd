use anyhow::{Result, anyhow};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::debug;

use super::{StoreError, StoreResult, Workbook, Worksheet};
use crate::core::config::{SheetsConfig, StoreConfig};

/// Google Sheets v4 REST adapter.
///
/// The bearer token is provisioned outside this service and handed in
/// through configuration; this adapter never refreshes it.
pub struct SheetsWorkbook {
    api: Arc<SheetsApi>,
    ledger: String,
    directory: String,
    companies: String,
}

struct SheetsApi {
    client: Client,
    base: String,
    token: String,
}

impl SheetsWorkbook {
    pub fn new(sheets: &SheetsConfig, store: &StoreConfig) -> Result<Self> {
        if sheets.spreadsheet_id.trim().is_empty() {
            return Err(anyhow!(
                "sheets backend requires [sheets].spreadsheet_id (or SPREADSHEET_ID)"
            ));
        }
        let token = sheets
            .access_token
            .clone()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                anyhow!("sheets backend requires [sheets].access_token (or SHEETS_ACCESS_TOKEN)")
            })?;
        let client = Client::builder()
            .timeout(Duration::from_secs(sheets.timeout_secs))
            .build()?;

        Ok(Self {
            api: Arc::new(SheetsApi {
                client,
                base: format!(
                    "{}/{}",
                    sheets.api_base.trim_end_matches('/'),
                    sheets.spreadsheet_id.trim()
                ),
                token,
            }),
            ledger: store.ledger_sheet.clone(),
            directory: store.directory_sheet.clone(),
            companies: store.companies_sheet.clone(),
        })
    }

    fn sheet(&self, title: &str) -> Arc<SheetsWorksheet> {
        Arc::new(SheetsWorksheet {
            api: self.api.clone(),
            title: title.to_string(),
            sheet_id: OnceCell::new(),
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

impl SheetsApi {
    fn authed(&self, req: RequestBuilder) -> RequestBuilder {
        req.bearer_auth(&self.token)
    }

    async fn send(&self, req: RequestBuilder) -> StoreResult<Value> {
        let resp = self.authed(req).send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(StoreError::Api {
                status: status.as_u16(),
                body: text,
            });
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }

    fn values_url(&self, range: &str) -> String {
        format!("{}/values/{}", self.base, urlencoding::encode(range))
    }
}

struct SheetsWorksheet {
    api: Arc<SheetsApi>,
    title: String,
    /// Numeric sheet id, needed only for structural edits (row insertion).
    sheet_id: OnceCell<i64>,
}

impl SheetsWorksheet {
    fn range(&self, suffix: &str) -> String {
        format!("'{}'!{}", self.title.replace('\'', "''"), suffix)
    }

    async fn sheet_id(&self) -> StoreResult<i64> {
        self.sheet_id
            .get_or_try_init(|| async {
                let url = format!("{}?fields=sheets.properties", self.api.base);
                let meta = self.api.send(self.api.client.get(url)).await?;
                find_sheet_id(&meta, &self.title)
                    .ok_or_else(|| StoreError::MissingWorksheet(self.title.clone()))
            })
            .await
            .copied()
    }

    async fn write_row(&self, position: usize, cells: Vec<String>) -> StoreResult<()> {
        let range = self.range(&format!("A{}", position));
        let url = format!("{}?valueInputOption=RAW", self.api.values_url(&range));
        self.api
            .send(
                self.api
                    .client
                    .put(url)
                    .json(&json!({ "range": range, "values": [cells] })),
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Worksheet for SheetsWorksheet {
    fn title(&self) -> &str {
        &self.title
    }

    async fn rows(&self) -> StoreResult<Vec<Vec<String>>> {
        let url = self.api.values_url(&self.range("A:ZZ"));
        let body = self.api.send(self.api.client.get(url)).await?;
        Ok(parse_values(&body))
    }

    async fn insert_row(&self, position: usize, cells: Vec<String>) -> StoreResult<()> {
        if position == 0 {
            return Err(StoreError::OutOfRange {
                sheet: self.title.clone(),
                position,
            });
        }
        let sheet_id = self.sheet_id().await?;
        let url = format!("{}:batchUpdate", self.api.base);
        let body = json!({
            "requests": [{
                "insertDimension": {
                    "range": {
                        "sheetId": sheet_id,
                        "dimension": "ROWS",
                        "startIndex": position - 1,
                        "endIndex": position
                    },
                    "inheritFromBefore": false
                }
            }]
        });
        self.api
            .send(self.api.client.post(url).json(&body))
            .await?;
        debug!("Inserted blank row {} into '{}'", position, self.title);
        self.write_row(position, cells).await
    }

    async fn append_row(&self, cells: Vec<String>) -> StoreResult<()> {
        let url = format!(
            "{}:append?valueInputOption=RAW&insertDataOption=INSERT_ROWS",
            self.api.values_url(&self.range("A1"))
        );
        self.api
            .send(self.api.client.post(url).json(&json!({ "values": [cells] })))
            .await?;
        Ok(())
    }

    async fn update_cell(&self, position: usize, column: usize, value: &str) -> StoreResult<()> {
        let Some(letter) = column_letter(column) else {
            return Err(StoreError::Backend(format!("invalid column index {}", column)));
        };
        let range = self.range(&format!("{}{}", letter, position));
        let url = format!("{}?valueInputOption=RAW", self.api.values_url(&range));
        self.api
            .send(
                self.api
                    .client
                    .put(url)
                    .json(&json!({ "range": range, "values": [[value]] })),
            )
            .await?;
        Ok(())
    }
}

/// Converts a 1-based column index into its A1 letter form (1 → A, 27 → AA).
fn column_letter(mut column: usize) -> Option<String> {
    if column == 0 {
        return None;
    }
    let mut letters = Vec::new();
    while column > 0 {
        let rem = (column - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        column = (column - 1) / 26;
    }
    Some(letters.into_iter().rev().collect())
}

/// The values API omits trailing empty cells and may return numbers; every
/// cell is normalized into its string form.
fn parse_values(body: &Value) -> Vec<Vec<String>> {
    body.get("values")
        .and_then(Value::as_array)
        .map(|rows| {
            rows.iter()
                .map(|row| {
                    row.as_array()
                        .map(|cells| cells.iter().map(cell_text).collect())
                        .unwrap_or_default()
                })
                .collect()
        })
        .unwrap_or_default()
}

fn cell_text(cell: &Value) -> String {
    match cell {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn find_sheet_id(meta: &Value, title: &str) -> Option<i64> {
    meta.get("sheets")?
        .as_array()?
        .iter()
        .filter_map(|s| s.get("properties"))
        .find(|p| p.get("title").and_then(Value::as_str) == Some(title))
        .and_then(|p| p.get("sheetId"))
        .and_then(Value::as_i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Json, Router,
        extract::{Path, RawQuery, State},
        http::HeaderMap,
        routing::get,
    };
    use std::sync::Mutex;

    #[test]
    fn column_letters_follow_a1_notation() {
        assert_eq!(column_letter(1).as_deref(), Some("A"));
        assert_eq!(column_letter(16).as_deref(), Some("P"));
        assert_eq!(column_letter(26).as_deref(), Some("Z"));
        assert_eq!(column_letter(27).as_deref(), Some("AA"));
        assert_eq!(column_letter(702).as_deref(), Some("ZZ"));
        assert_eq!(column_letter(0), None);
    }

    #[test]
    fn parse_values_stringifies_cells() {
        let body = json!({ "values": [["ID", "Score"], [7, 3.5], ["x"], []] });
        assert_eq!(
            parse_values(&body),
            vec![
                vec!["ID".to_string(), "Score".to_string()],
                vec!["7".to_string(), "3.5".to_string()],
                vec!["x".to_string()],
                vec![],
            ]
        );
        assert!(parse_values(&json!({ "range": "A1:Z1" })).is_empty());
    }

    #[test]
    fn find_sheet_id_matches_title() {
        let meta = json!({ "sheets": [
            { "properties": { "sheetId": 0, "title": "config_employees" } },
            { "properties": { "sheetId": 913, "title": "attendance_master" } }
        ]});
        assert_eq!(find_sheet_id(&meta, "attendance_master"), Some(913));
        assert_eq!(find_sheet_id(&meta, "missing"), None);
    }

    #[test]
    fn new_requires_spreadsheet_and_token() {
        let mut sheets = SheetsConfig::default();
        assert!(SheetsWorkbook::new(&sheets, &StoreConfig::default()).is_err());
        sheets.spreadsheet_id = "abc".to_string();
        assert!(SheetsWorkbook::new(&sheets, &StoreConfig::default()).is_err());
        sheets.access_token = Some("token".to_string());
        assert!(SheetsWorkbook::new(&sheets, &StoreConfig::default()).is_ok());
    }

    #[derive(Clone, Default)]
    struct Recorded {
        calls: Arc<Mutex<Vec<String>>>,
    }

    fn record(state: &Recorded, line: String) {
        state.calls.lock().unwrap_or_else(|e| e.into_inner()).push(line);
    }

    async fn mock_api() -> Option<(String, Recorded)> {
        let state = Recorded::default();
        let app = Router::new()
            .route(
                "/v4/spreadsheets/{id}/values/{range}",
                get(
                    |State(s): State<Recorded>,
                     Path((_, range)): Path<(String, String)>,
                     headers: HeaderMap| async move {
                        let auth = headers
                            .get("authorization")
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or_default()
                            .to_string();
                        record(&s, format!("GET {} {}", range, auth));
                        Json(json!({ "values": [["ID", "E-mail"], ["1", "a@x.com"]] }))
                    },
                )
                .put(
                    |State(s): State<Recorded>,
                     Path((_, range)): Path<(String, String)>,
                     RawQuery(q): RawQuery,
                     Json(body): Json<Value>| async move {
                        record(
                            &s,
                            format!("PUT {} {} {}", range, q.unwrap_or_default(), body["values"]),
                        );
                        Json(json!({}))
                    },
                ),
            )
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.ok()?;
        let addr = listener.local_addr().ok()?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Some((format!("http://{}/v4/spreadsheets", addr), state))
    }

    fn workbook_for(base: &str) -> Workbook {
        let sheets = SheetsConfig {
            spreadsheet_id: "sheet-1".to_string(),
            access_token: Some("secret-token".to_string()),
            api_base: base.to_string(),
            ..SheetsConfig::default()
        };
        SheetsWorkbook::new(&sheets, &StoreConfig::default())
            .unwrap()
            .workbook()
    }

    #[tokio::test]
    async fn rows_sends_bearer_token_and_quoted_range() {
        let Some((base, state)) = mock_api().await else {
            eprintln!("Skipping sheets adapter test: socket bind not permitted");
            return;
        };
        let wb = workbook_for(&base);
        let rows = wb.directory.rows().await.unwrap();
        assert_eq!(rows[1], vec!["1".to_string(), "a@x.com".to_string()]);

        let calls = state.calls.lock().unwrap().clone();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].starts_with("GET 'config_employees'!A:ZZ"));
        assert!(calls[0].ends_with("Bearer secret-token"));
    }

    #[tokio::test]
    async fn update_cell_targets_a1_address() {
        let Some((base, state)) = mock_api().await else {
            eprintln!("Skipping sheets adapter test: socket bind not permitted");
            return;
        };
        let wb = workbook_for(&base);
        wb.ledger.update_cell(5, 9, "06:00:00 PM").await.unwrap();

        let calls = state.calls.lock().unwrap().clone();
        assert_eq!(
            calls,
            vec!["PUT 'attendance_master'!I5 valueInputOption=RAW [[\"06:00:00 PM\"]]".to_string()]
        );
    }
}
