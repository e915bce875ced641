//! # VitalWatch - Serial Sensor Dashboard
//!
//! Reads `KEY:VALUE,KEY:VALUE,...` telemetry lines from a serial-connected
//! microcontroller, classifies every sensor as Normal/Warning/Critical, shows
//! the result on a live web dashboard and appends each line to a CSV log.
//!
//! ## Pipeline
//!
//! - **Device locator**: picks the board among the serial ports by description
//! - **Serial link**: non-blocking line reader that closes itself on errors
//! - **Protocol parser**: tolerant `KEY:VALUE` field splitter
//! - **Status evaluator**: table-driven thresholds per sensor key
//! - **Session log**: flushed, append-only CSV rows
//! - **Presenter**: 1-second tick that reconnects, drains, evaluates and logs
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use vital_watch::{
//!     start_web_server, IntervalScheduler, MonitorConfig, Presenter, SessionLog, SystemSerial,
//! };
//! use tokio::sync::watch;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = MonitorConfig::default();
//!     let log = SessionLog::open(&config.log.path)?;
//!     let presenter = Presenter::new(&config, Box::new(SystemSerial::new()), log);
//!
//!     let (tx, rx) = watch::channel(presenter.snapshot());
//!     let scheduler = IntervalScheduler::from_config(&config.dashboard);
//!     tokio::spawn(presenter.run(scheduler, tx, async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     }));
//!
//!     start_web_server(config.web, rx, std::future::pending()).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod dashboard;
pub mod error;
pub mod protocol;
pub mod serial;
pub mod session_log;
pub mod status;
pub mod web;

// Re-export public API
pub use config::{MonitorConfig, SENSOR_KEYS};
pub use dashboard::{
    ConnectionState, DashboardSnapshot, IntervalScheduler, Presenter, Scheduler, SensorState,
    TickKind,
};
pub use error::{MonitorError, Result};
pub use protocol::{parse_line, SensorReading};
pub use serial::{DeviceLocator, PortDescriptor, SerialBackend, SerialLink, SystemSerial};
pub use session_log::{LogRow, SessionLog};
pub use status::{evaluate, Evaluation, StatusLevel, ThresholdTable};
pub use web::{start_web_server, WebConfig};

/// The data and clock tick period in milliseconds
pub const DEFAULT_TICK_MS: u64 = 1000;

/// Line speed of the sensor board
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Session log file, relative to the working directory
pub const DEFAULT_LOG_PATH: &str = "vital_log.csv";

/// The default web server port
pub const DEFAULT_WEB_PORT: u16 = 8080;
