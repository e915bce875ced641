//! Display state owned by the presenter and the snapshots published from it.

use crate::protocol::SensorReading;
use crate::status::{Evaluation, StatusLevel};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Value shown for a sensor before its first reading.
pub const NO_VALUE: &str = "N/A";

/// Format of the clock display, e.g. `Saturday, 09 March 2024 - 02:05:09 PM`.
pub const CLOCK_FORMAT: &str = "%A, %d %B %Y - %I:%M:%S %p";

/// Format of the "last data" display.
pub const LAST_DATA_FORMAT: &str = "%H:%M:%S";

/// Current value and status of one dashboard sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorState {
    pub key: String,
    pub last_value: String,
    pub status: StatusLevel,
    pub color: String,
    pub last_updated: Option<DateTime<Local>>,
}

impl SensorState {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            last_value: NO_VALUE.to_string(),
            status: StatusLevel::Unknown,
            color: StatusLevel::Unknown.color().to_string(),
            last_updated: None,
        }
    }
}

/// Whether the board is reachable, as shown in the banner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connected {
        port: String,
    },
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected { .. })
    }

    pub fn banner(&self) -> &'static str {
        match self {
            Self::Connected { .. } => "Arduino Connected",
            Self::Disconnected => "Arduino Disconnected",
        }
    }

    pub fn banner_color(&self) -> &'static str {
        match self {
            Self::Connected { .. } => "#2ecc71",
            Self::Disconnected => "#e74c3c",
        }
    }
}

/// Mutable dashboard state.
///
/// The sensor set is fixed at construction; readings for other keys are
/// ignored here (they still reach the session log).
#[derive(Debug, Clone)]
pub struct DashboardState {
    sensors: Vec<SensorState>,
    pub connection: ConnectionState,
    pub last_received: Option<DateTime<Local>>,
    pub clock: String,
    monitor: VecDeque<String>,
    monitor_capacity: usize,
    pub lines_received: u64,
}

impl DashboardState {
    pub fn new<I, S>(keys: I, monitor_capacity: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sensors: keys.into_iter().map(SensorState::new).collect(),
            connection: ConnectionState::Disconnected,
            last_received: None,
            clock: String::new(),
            monitor: VecDeque::with_capacity(monitor_capacity),
            monitor_capacity,
            lines_received: 0,
        }
    }

    pub fn sensors(&self) -> &[SensorState] {
        &self.sensors
    }

    pub fn sensor(&self, key: &str) -> Option<&SensorState> {
        self.sensors.iter().find(|s| s.key == key)
    }

    pub fn is_tracked(&self, key: &str) -> bool {
        self.sensor(key).is_some()
    }

    /// Store a reading for a tracked sensor. Returns `false` for unknown keys.
    pub fn apply_reading(
        &mut self,
        reading: &SensorReading,
        evaluation: Evaluation,
        now: DateTime<Local>,
    ) -> bool {
        let Some(sensor) = self.sensors.iter_mut().find(|s| s.key == reading.key) else {
            return false;
        };
        sensor.last_value = reading.raw_value.clone();
        sensor.status = evaluation.level;
        sensor.color = evaluation.color.to_string();
        sensor.last_updated = Some(now);
        true
    }

    /// Record a raw line for the serial monitor, evicting the oldest.
    pub fn push_monitor_line(&mut self, line: &str) {
        if self.monitor_capacity == 0 {
            return;
        }
        if self.monitor.len() == self.monitor_capacity {
            self.monitor.pop_front();
        }
        self.monitor.push_back(line.to_string());
    }

    /// Raw lines, oldest first.
    pub fn monitor_lines(&self) -> impl Iterator<Item = &str> {
        self.monitor.iter().map(String::as_str)
    }

    pub fn last_data_text(&self) -> String {
        match &self.last_received {
            Some(at) => format!("Last data: {}", at.format(LAST_DATA_FORMAT)),
            None => format!("Last data: {}", NO_VALUE),
        }
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        DashboardSnapshot {
            timestamp: chrono::Utc::now().timestamp_millis().max(0) as u64,
            connection: self.connection.clone(),
            banner: self.connection.banner().to_string(),
            banner_color: self.connection.banner_color().to_string(),
            last_received: self.last_received,
            last_data: self.last_data_text(),
            clock: self.clock.clone(),
            sensors: self.sensors.clone(),
            monitor: self.monitor.iter().cloned().collect(),
            lines_received: self.lines_received,
        }
    }
}

/// Point-in-time view of the dashboard, as served to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    /// When the snapshot was taken (Unix timestamp in milliseconds)
    pub timestamp: u64,
    pub connection: ConnectionState,
    pub banner: String,
    pub banner_color: String,
    pub last_received: Option<DateTime<Local>>,
    pub last_data: String,
    pub clock: String,
    pub sensors: Vec<SensorState>,
    /// Most recent raw lines, oldest first
    pub monitor: Vec<String>,
    pub lines_received: u64,
}

impl Default for DashboardSnapshot {
    fn default() -> Self {
        DashboardState::new(crate::config::SENSOR_KEYS, 0).snapshot()
    }
}

impl DashboardSnapshot {
    pub fn sensor(&self, key: &str) -> Option<&SensorState> {
        self.sensors.iter().find(|s| s.key == key)
    }
}
