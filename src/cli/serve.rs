use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use crate::core::access::AccessGate;
use crate::core::attendance::AttendanceService;
use crate::core::clock::{SystemClock, parse_timezone};
use crate::core::config::ServiceConfig;
use crate::core::lifecycle::LifecycleManager;
use crate::core::store::Workbook;
use crate::core::terminal::{self, GuideSection};
use crate::interfaces::web::{ApiServer, ApiServerConfig};

pub async fn run_serve(config: ServiceConfig) -> Result<()> {
    terminal::print_banner();

    let tz = parse_timezone(&config.clock.timezone)?;
    let gate = AccessGate::from_config(config.access.allowed_networks.as_deref())
        .context("Invalid [access] allowed_networks")?;
    let workbook = Workbook::open(&config.store, &config.sheets)?;
    workbook
        .ensure_headers()
        .await
        .context("Failed to prepare worksheets")?;

    let service = AttendanceService::new(&workbook, gate.clone(), Arc::new(SystemClock::new(tz)));
    let server = ApiServer::new(ApiServerConfig {
        service,
        host: config.server.host.clone(),
        port: config.server.port,
        static_dir: config.server.static_dir.clone(),
        client_id: config.server.client_id.clone(),
    });

    let mut lifecycle = LifecycleManager::new();
    lifecycle.attach(Arc::new(Mutex::new(server)));
    lifecycle.start().await?;

    let url = format!("http://{}:{}", config.server.host, config.server.port);
    let mut section = GuideSection::new("punchclock")
        .status("Store", &format!("{:?}", config.store.backend))
        .status("Timezone", tz.name());
    if !gate.is_restricted() {
        section = section.warn("No allow-list configured: every caller may record attendance");
    }
    section.blank().text("Press Ctrl+C to stop.").print();
    terminal::print_link("API", &url);
    println!();
    info!("punchclock ready at {}", url);

    tokio::signal::ctrl_c().await?;
    lifecycle.shutdown().await?;
    terminal::print_goodbye();
    Ok(())
}
