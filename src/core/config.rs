use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "punchclock.toml";

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ServiceConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub access: AccessConfig,

    #[serde(default)]
    pub clock: ClockConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub sheets: SheetsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory holding `index.html` for `GET /`.
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,

    /// Public identifier injected into the served page.
    #[serde(default)]
    pub client_id: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AccessConfig {
    /// CIDR ranges or single addresses. Absent or empty allows every caller.
    #[serde(default)]
    pub allowed_networks: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClockConfig {
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Sqlite,
    Sheets,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_backend")]
    pub backend: StoreBackend,

    #[serde(default)]
    pub sqlite_path: Option<PathBuf>,

    #[serde(default = "default_ledger_sheet")]
    pub ledger_sheet: String,

    #[serde(default = "default_directory_sheet")]
    pub directory_sheet: String,

    #[serde(default = "default_companies_sheet")]
    pub companies_sheet: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SheetsConfig {
    #[serde(default)]
    pub spreadsheet_id: String,

    #[serde(default)]
    pub access_token: Option<String>,

    #[serde(default = "default_sheets_api_base")]
    pub api_base: String,

    #[serde(default = "default_sheets_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_static_dir() -> PathBuf {
    PathBuf::from("static")
}
fn default_timezone() -> String {
    "Asia/Dhaka".to_string()
}
fn default_backend() -> StoreBackend {
    StoreBackend::Sqlite
}
fn default_ledger_sheet() -> String {
    "attendance_master".to_string()
}
fn default_directory_sheet() -> String {
    "config_employees".to_string()
}
fn default_companies_sheet() -> String {
    "config_companies".to_string()
}
fn default_sheets_api_base() -> String {
    "https://sheets.googleapis.com/v4/spreadsheets".to_string()
}
fn default_sheets_timeout() -> u64 {
    30
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: default_static_dir(),
            client_id: String::new(),
        }
    }
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            sqlite_path: None,
            ledger_sheet: default_ledger_sheet(),
            directory_sheet: default_directory_sheet(),
            companies_sheet: default_companies_sheet(),
        }
    }
}

impl StoreConfig {
    pub fn sqlite_path(&self) -> PathBuf {
        self.sqlite_path
            .clone()
            .unwrap_or_else(|| data_dir().join("punchclock.db"))
    }
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            spreadsheet_id: String::new(),
            access_token: None,
            api_base: default_sheets_api_base(),
            timeout_secs: default_sheets_timeout(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// `$PUNCHCLOCK_DATA_DIR`, falling back to `~/.punchclock`.
pub fn data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("PUNCHCLOCK_DATA_DIR")
        && !dir.trim().is_empty()
    {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".punchclock")
}

pub fn default_config_path() -> PathBuf {
    if let Ok(path) = std::env::var("PUNCHCLOCK_CONFIG")
        && !path.trim().is_empty()
    {
        return PathBuf::from(path);
    }
    data_dir().join(CONFIG_FILE_NAME)
}

impl ServiceConfig {
    /// Loads `path` if it exists, then applies environment overrides.
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let content = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("reading {}", path.display()))?;
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?
        } else {
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Deployment environment overrides. Blank values are ignored.
    pub fn apply_env<F: Fn(&str) -> Option<String>>(&mut self, lookup: F) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("HOST") {
            self.server.host = v;
        }
        if let Some(port) = get("PORT").and_then(|v| v.trim().parse().ok()) {
            self.server.port = port;
        }
        if let Some(v) = get("CLIENT_ID") {
            self.server.client_id = v;
        }
        if let Some(v) = get("TIMEZONE") {
            self.clock.timezone = v;
        }
        if let Some(v) = get("MASTER_SHEET_NAME") {
            self.store.ledger_sheet = v;
        }
        if let Some(v) = get("EMPLOYEE_SHEET_NAME") {
            self.store.directory_sheet = v;
        }
        if let Some(v) = get("COMPANY_SHEET_NAME") {
            self.store.companies_sheet = v;
        }
        if let Some(v) = get("SPREADSHEET_ID") {
            self.sheets.spreadsheet_id = v;
        }
        if let Some(v) = get("SHEETS_ACCESS_TOKEN") {
            self.sheets.access_token = Some(v);
        }
        if let Some(v) = get("PUNCHCLOCK_LOG") {
            self.logging.level = v;
        }
    }
}
