//! Monitor configuration.
//!
//! Defaults reproduce the stock board setup. A TOML file can override any
//! section, and the CLI overrides the file:
//!
//! ```toml
//! [serial]
//! port_matchers = ["Arduino", "USB-SERIAL", "CH340"]
//! baud_rate = 9600
//! settle_delay_ms = 2000
//!
//! [log]
//! path = "vital_log.csv"
//!
//! [dashboard]
//! data_interval_ms = 1000
//! clock_interval_ms = 1000
//! monitor_lines = 100
//!
//! [web]
//! host = "0.0.0.0"
//! port = 8080
//! ```

use crate::error::{MonitorError, Result};
use crate::web::WebConfig;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Sensor keys shown on the dashboard, in display order.
pub const SENSOR_KEYS: [&str; 9] = [
    "TEMP", "HUM", "FLAME", "LIGHT", "SOUND", "SHOCK", "BALL", "REED", "TOUCH",
];

/// USB-serial adapter descriptions that identify the sensor board.
pub const DEFAULT_PORT_MATCHERS: [&str; 3] = ["Arduino", "USB-SERIAL", "CH340"];

/// Serial link settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Case-sensitive substrings matched against port descriptions
    pub port_matchers: Vec<String>,
    /// Open this port directly instead of searching
    pub port: Option<String>,
    /// Line speed
    pub baud_rate: u32,
    /// Time the board needs to reboot after the port is opened
    pub settle_delay_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port_matchers: DEFAULT_PORT_MATCHERS.iter().map(|s| s.to_string()).collect(),
            port: None,
            baud_rate: crate::DEFAULT_BAUD_RATE,
            settle_delay_ms: 2000,
        }
    }
}

impl SerialConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

/// Session log settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// CSV file, relative to the working directory
    pub path: PathBuf,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(crate::DEFAULT_LOG_PATH),
        }
    }
}

/// Presenter settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Period of the data tick (reconnect, drain, update)
    pub data_interval_ms: u64,
    /// Period of the clock tick
    pub clock_interval_ms: u64,
    /// Raw lines kept for the serial monitor pane
    pub monitor_lines: usize,
    /// Sensor keys with a dashboard row
    pub sensors: Vec<String>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            data_interval_ms: crate::DEFAULT_TICK_MS,
            clock_interval_ms: crate::DEFAULT_TICK_MS,
            monitor_lines: 100,
            sensors: SENSOR_KEYS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Complete configuration for a dashboard run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub serial: SerialConfig,
    pub log: LogConfig,
    pub dashboard: DashboardConfig,
    pub web: WebConfig,
}

impl MonitorConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: MonitorConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if given, otherwise use defaults.
    pub fn load_or_default(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => {
                let config = Self::load(path)?;
                tracing::info!("Loaded configuration from {}", path.display());
                Ok(config)
            }
            None => Ok(Self::default()),
        }
    }

    /// Reject settings the dashboard cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.serial.baud_rate == 0 {
            return Err(MonitorError::config_error("baud_rate must be positive"));
        }
        if self.serial.port.is_none() && self.serial.port_matchers.is_empty() {
            return Err(MonitorError::config_error(
                "either serial.port or serial.port_matchers must be set",
            ));
        }
        if self.dashboard.data_interval_ms == 0 || self.dashboard.clock_interval_ms == 0 {
            return Err(MonitorError::config_error("tick intervals must be positive"));
        }
        self.web.validate()
    }

    /// Set the port description matchers.
    pub fn with_port_matchers<I, S>(mut self, matchers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.serial.port_matchers = matchers.into_iter().map(Into::into).collect();
        self
    }

    /// Open a fixed port instead of searching.
    pub fn with_port(mut self, port: Option<String>) -> Self {
        self.serial.port = port;
        self
    }

    /// Set the line speed.
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.serial.baud_rate = baud_rate;
        self
    }

    /// Set the post-open settle delay.
    pub fn with_settle_delay_ms(mut self, delay_ms: u64) -> Self {
        self.serial.settle_delay_ms = delay_ms;
        self
    }

    /// Set the session log path.
    pub fn with_log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log.path = path.into();
        self
    }

    /// Set the data tick period.
    pub fn with_data_interval_ms(mut self, interval_ms: u64) -> Self {
        self.dashboard.data_interval_ms = interval_ms;
        self
    }

    /// Set the web server configuration.
    pub fn with_web(mut self, web: WebConfig) -> Self {
        self.web = web;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_board() {
        let config = MonitorConfig::default();
        assert_eq!(config.serial.baud_rate, 9600);
        assert_eq!(config.serial.settle_delay(), Duration::from_secs(2));
        assert_eq!(config.serial.port_matchers, vec!["Arduino", "USB-SERIAL", "CH340"]);
        assert_eq!(config.log.path, PathBuf::from("vital_log.csv"));
        assert_eq!(config.dashboard.sensors.len(), 9);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: MonitorConfig = toml::from_str(
            r#"
            [serial]
            baud_rate = 115200

            [web]
            port = 9000
            "#,
        )
        .unwrap();
        assert_eq!(config.serial.baud_rate, 115200);
        assert_eq!(config.serial.port_matchers.len(), 3);
        assert_eq!(config.web.port, 9000);
        assert_eq!(config.web.host, "0.0.0.0");
        assert_eq!(config.dashboard.data_interval_ms, 1000);
    }

    #[test]
    fn test_validate_rejects_no_way_to_find_port() {
        let config = MonitorConfig::default().with_port_matchers(Vec::<String>::new());
        assert!(config.validate().is_err());
        assert!(config.with_port(Some("/dev/ttyACM0".into())).validate().is_ok());
    }

    #[test]
    fn test_validate_checks_web_section() {
        let web = WebConfig::default().with_max_websocket_connections(0);
        assert!(MonitorConfig::default().with_web(web).validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_baud() {
        assert!(MonitorConfig::default().with_baud_rate(0).validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vital_watch.toml");
        std::fs::write(&path, "[log]\npath = \"other.csv\"\n").unwrap();

        let config = MonitorConfig::load(&path).unwrap();
        assert_eq!(config.log.path, PathBuf::from("other.csv"));
        assert!(MonitorConfig::load(dir.path().join("missing.toml")).is_err());
    }
}
