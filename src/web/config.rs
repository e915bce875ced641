//! Dashboard server settings, the `[web]` section of the config file.

use crate::error::{MonitorError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_MAX_CLIENTS: usize = 100;

/// File looked up inside `static_path` to replace the built-in page.
pub const INDEX_FILE: &str = "index.html";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    /// Interface the dashboard listens on
    pub host: String,
    pub port: u16,
    /// Send permissive CORS headers so other origins can poll the API
    pub enable_cors: bool,
    /// Directory holding an `index.html` served at `/` instead of the
    /// built-in page. Nothing else in the directory is served.
    pub static_path: Option<String>,
    /// Browsers allowed to stream snapshots at once
    pub max_websocket_connections: usize,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self::new(DEFAULT_HOST, crate::DEFAULT_WEB_PORT)
    }
}

impl WebConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            enable_cors: true,
            static_path: None,
            max_websocket_connections: DEFAULT_MAX_CLIENTS,
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_cors(mut self, enable_cors: bool) -> Self {
        self.enable_cors = enable_cors;
        self
    }

    /// Directory to take a replacement `index.html` from.
    pub fn with_static_path(mut self, path: Option<String>) -> Self {
        self.static_path = path;
        self
    }

    pub fn with_max_websocket_connections(mut self, max: usize) -> Self {
        self.max_websocket_connections = max;
        self
    }

    /// `host:port` as handed to the listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Path of the replacement page, whether or not it exists.
    pub fn index_file(&self) -> Option<PathBuf> {
        self.static_path
            .as_deref()
            .map(|dir| PathBuf::from(dir).join(INDEX_FILE))
    }

    /// Reject a server that could never accept a dashboard client.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(MonitorError::config_error("web.host must not be empty"));
        }
        if self.max_websocket_connections == 0 {
            return Err(MonitorError::config_error(
                "web.max_websocket_connections must be positive",
            ));
        }
        Ok(())
    }
}
