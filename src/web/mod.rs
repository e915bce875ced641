//! Web front end for the VitalWatch dashboard.
//!
//! Serves the dashboard page, a JSON API and a WebSocket stream of
//! [`DashboardSnapshot`]s. The web layer is read-only: it observes the
//! presenter through a `watch` channel and never touches the link or the log.

pub mod config;
pub mod handlers;
pub mod router;
pub mod websocket;

// Re-export commonly used items
pub use config::WebConfig;
pub use router::create_app;

use crate::dashboard::DashboardSnapshot;
use crate::error::{MonitorError, Result};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use tracing::info;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// Latest snapshot published by the presenter
    pub snapshots: watch::Receiver<DashboardSnapshot>,
    /// Connected WebSocket clients
    pub clients: Arc<RwLock<websocket::ClientRegistry>>,
    pub config: WebConfig,
}

impl AppState {
    pub fn new(config: WebConfig, snapshots: watch::Receiver<DashboardSnapshot>) -> Self {
        Self {
            snapshots,
            clients: Arc::new(RwLock::new(websocket::ClientRegistry::default())),
            config,
        }
    }

    /// Clone of the most recent snapshot.
    pub fn current(&self) -> DashboardSnapshot {
        self.snapshots.borrow().clone()
    }
}

/// Start the web server and run it until `shutdown` resolves.
pub async fn start_web_server<F>(
    config: WebConfig,
    snapshots: watch::Receiver<DashboardSnapshot>,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = create_app(AppState::new(config.clone(), snapshots)).await?;

    // Parse the bind address
    let addr = config
        .bind_address()
        .parse::<SocketAddr>()
        .map_err(|e| MonitorError::config_error(format!("Invalid bind address: {}", e)))?;

    info!("Starting VitalWatch web server on http://{}", addr);
    info!("Dashboard available at http://{}/", addr);
    info!("API endpoint: http://{}/api/snapshot", addr);
    info!("WebSocket endpoint: ws://{}/ws", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| MonitorError::web_server_error(format!("Failed to bind to address: {}", e)))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| MonitorError::web_server_error(format!("Server error: {}", e)))?;

    info!("Web server stopped");
    Ok(())
}
