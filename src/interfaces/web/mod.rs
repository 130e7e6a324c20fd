mod handlers;
mod router;

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::sync::oneshot;
use tracing::{error, info};

use crate::core::attendance::AttendanceService;
use crate::core::lifecycle::LifecycleComponent;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) service: AttendanceService,
    pub(crate) static_dir: PathBuf,
    pub(crate) client_id: String,
}

pub struct ApiServerConfig {
    pub service: AttendanceService,
    pub host: String,
    pub port: u16,
    pub static_dir: PathBuf,
    pub client_id: String,
}

pub struct ApiServer {
    state: AppState,
    host: String,
    port: u16,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl ApiServer {
    pub fn new(config: ApiServerConfig) -> Self {
        Self {
            state: AppState {
                service: config.service,
                static_dir: config.static_dir,
                client_id: config.client_id,
            },
            host: config.host,
            port: config.port,
            shutdown_tx: None,
        }
    }
}

#[async_trait]
impl LifecycleComponent for ApiServer {
    async fn on_init(&mut self) -> Result<()> {
        info!("API Server Interface initializing...");
        Ok(())
    }

    async fn on_start(&mut self) -> Result<()> {
        let addr = format!("{}:{}", self.host, self.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind API server to {}", addr))?;
        let app = router::build_api_router(self.state.clone());
        let (tx, rx) = oneshot::channel::<()>();
        self.shutdown_tx = Some(tx);

        info!("API Server running at http://{addr}");
        tokio::spawn(async move {
            let served = axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(async {
                rx.await.ok();
            })
            .await;
            if let Err(e) = served {
                error!("API Server crashed: {}", e);
            }
        });
        Ok(())
    }

    async fn on_shutdown(&mut self) -> Result<()> {
        info!("API Server Interface shutting down...");
        if let Some(tx) = self.shutdown_tx.take() {
            tx.send(()).ok();
        }
        Ok(())
    }
}
