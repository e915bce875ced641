//! The tick-driven presenter: reconnects, drains the link, evaluates, logs.

use crate::config::MonitorConfig;
use crate::dashboard::scheduler::{Scheduler, TickKind};
use crate::dashboard::state::{ConnectionState, DashboardSnapshot, DashboardState, CLOCK_FORMAT};
use crate::error::Result;
use crate::protocol::parse_line;
use crate::serial::{DeviceLocator, PortDescriptor, SerialBackend, SerialLink};
use crate::session_log::SessionLog;
use crate::status::ThresholdTable;
use chrono::{DateTime, Local};
use std::future::Future;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Upper bound on lines handled in one data tick; the rest wait in the buffer.
pub const MAX_LINES_PER_TICK: usize = 512;

/// What a single data tick did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Non-empty lines taken off the link
    pub lines_processed: usize,
    /// Rows appended to the session log
    pub rows_logged: usize,
    /// Connection state after the tick
    pub connection: ConnectionState,
}

/// Owns the link, the session log and the display state.
pub struct Presenter {
    backend: Box<dyn SerialBackend>,
    locator: DeviceLocator,
    fixed_port: Option<String>,
    baud_rate: u32,
    link: SerialLink,
    log: Option<SessionLog>,
    thresholds: ThresholdTable,
    state: DashboardState,
}

impl Presenter {
    pub fn new(config: &MonitorConfig, backend: Box<dyn SerialBackend>, log: SessionLog) -> Self {
        Self {
            backend,
            locator: DeviceLocator::new(config.serial.port_matchers.iter().cloned()),
            fixed_port: config.serial.port.clone(),
            baud_rate: config.serial.baud_rate,
            link: SerialLink::new(config.serial.settle_delay()),
            log: Some(log),
            thresholds: ThresholdTable::default(),
            state: DashboardState::new(
                config.dashboard.sensors.iter().cloned(),
                config.dashboard.monitor_lines,
            ),
        }
    }

    /// Replace the status rules.
    pub fn with_thresholds(mut self, thresholds: ThresholdTable) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn state(&self) -> &DashboardState {
        &self.state
    }

    pub fn link(&self) -> &SerialLink {
        &self.link
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        self.state.snapshot()
    }

    /// Data tick: reconnect if closed, then drain and process every buffered line.
    pub fn on_data_tick(&mut self, now: DateTime<Local>) -> TickReport {
        let mut report = TickReport::default();

        if self.link.is_closed() {
            self.connect();
        }

        if self.link.is_open() {
            while report.lines_processed < MAX_LINES_PER_TICK {
                match self.link.poll_line() {
                    Ok(Some(line)) if line.is_empty() => continue,
                    Ok(Some(line)) => {
                        if self.process_line(&line, now) {
                            report.rows_logged += 1;
                        }
                        report.lines_processed += 1;
                    }
                    Ok(None) => break,
                    Err(e) => {
                        warn!("Connection lost: {}", e);
                        break;
                    }
                }
            }
        }

        self.refresh_connection();
        report.connection = self.state.connection.clone();
        report
    }

    /// Clock tick: refresh the time display only.
    pub fn on_clock_tick(&mut self, now: DateTime<Local>) {
        self.state.clock = now.format(CLOCK_FORMAT).to_string();
    }

    /// Handle one non-empty line. Returns whether a log row was written.
    ///
    /// Lines with no `KEY:VALUE` fields change no sensor and write no row,
    /// but still count as received data.
    pub fn process_line(&mut self, line: &str, now: DateTime<Local>) -> bool {
        self.state.push_monitor_line(line);
        self.state.last_received = Some(now);
        self.state.lines_received += 1;

        let readings = parse_line(line);
        if readings.is_empty() {
            debug!("Ignoring line without fields: {:?}", line);
            return false;
        }

        for reading in &readings {
            if !self.state.is_tracked(&reading.key) {
                continue;
            }
            let evaluation = self.thresholds.evaluate(&reading.key, &reading.raw_value);
            self.state.apply_reading(reading, evaluation, now);
        }

        let Some(log) = self.log.as_mut() else {
            return false;
        };
        match log.append(&now, &readings) {
            Ok(_) => true,
            Err(e) => {
                error!("Failed to write session log: {}", e);
                false
            }
        }
    }

    /// Close the link and the session log.
    pub fn shutdown(&mut self) -> Result<()> {
        self.link.close();
        self.refresh_connection();
        match self.log.take() {
            Some(log) => log.close(),
            None => Ok(()),
        }
    }

    /// Drive the presenter from `scheduler` until it ends or `shutdown` fires,
    /// publishing a snapshot after every tick. Resources are released on exit.
    pub async fn run<S, F>(
        mut self,
        mut scheduler: S,
        publisher: watch::Sender<DashboardSnapshot>,
        shutdown: F,
    ) -> Result<()>
    where
        S: Scheduler + Send,
        F: Future<Output = ()> + Send,
    {
        tokio::pin!(shutdown);

        loop {
            let tick = tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }
                tick = scheduler.next_tick() => tick,
            };

            match tick {
                Some(TickKind::Data) => {
                    let report = self.on_data_tick(Local::now());
                    if report.lines_processed > 0 {
                        debug!(
                            "Processed {} line(s), logged {} row(s)",
                            report.lines_processed, report.rows_logged
                        );
                    }
                }
                Some(TickKind::Clock) => self.on_clock_tick(Local::now()),
                None => break,
            }

            publisher.send_replace(self.snapshot());
        }

        let result = self.shutdown();
        publisher.send_replace(self.snapshot());
        result
    }

    fn connect(&mut self) {
        let candidates = match &self.fixed_port {
            Some(port) => vec![PortDescriptor::new(port.clone(), "configured port")],
            None => self.locator.candidate_ports(self.backend.as_ref()),
        };

        if candidates.is_empty() {
            debug!("No matching serial device found");
            return;
        }

        for port in candidates {
            match self
                .link
                .try_open(self.backend.as_ref(), &port.name, self.baud_rate)
            {
                Ok(()) => return,
                Err(e) => warn!("{}", e),
            }
        }
    }

    fn refresh_connection(&mut self) {
        let next = match (self.link.is_closed(), self.link.port_name()) {
            (false, Some(port)) => ConnectionState::Connected {
                port: port.to_string(),
            },
            _ => ConnectionState::Disconnected,
        };
        if next != self.state.connection {
            info!("{}", next.banner());
            self.state.connection = next;
        }
    }
}

impl std::fmt::Debug for Presenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Presenter")
            .field("link", &self.link)
            .field("log", &self.log)
            .field("connection", &self.state.connection)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MonitorError;
    use crate::serial::SerialStream;
    use crate::status::StatusLevel;
    use std::io;

    struct NoPorts;

    impl SerialBackend for NoPorts {
        fn available_ports(&self) -> Result<Vec<PortDescriptor>> {
            Ok(Vec::new())
        }

        fn open(&self, port: &str, _baud_rate: u32) -> Result<Box<dyn SerialStream>> {
            Err(MonitorError::link_open_error(port, "absent"))
        }
    }

    struct Silent;

    impl SerialStream for Silent {
        fn bytes_available(&mut self) -> io::Result<usize> {
            Ok(0)
        }

        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Ok(0)
        }
    }

    /// First `failures` opens fail, later ones succeed.
    struct Flaky {
        failures: std::sync::atomic::AtomicUsize,
    }

    impl SerialBackend for Flaky {
        fn available_ports(&self) -> Result<Vec<PortDescriptor>> {
            Ok(vec![
                PortDescriptor::new("/dev/ttyUSB0", "USB-SERIAL CH340"),
                PortDescriptor::new("/dev/ttyACM0", "Arduino Uno"),
            ])
        }

        fn open(&self, port: &str, _baud_rate: u32) -> Result<Box<dyn SerialStream>> {
            use std::sync::atomic::Ordering;
            let left = self.failures.load(Ordering::SeqCst);
            if left > 0 {
                self.failures.store(left - 1, Ordering::SeqCst);
                return Err(MonitorError::link_open_error(port, "busy"));
            }
            Ok(Box::new(Silent))
        }
    }

    fn presenter(backend: Box<dyn SerialBackend>, dir: &tempfile::TempDir) -> Presenter {
        let config = MonitorConfig::default()
            .with_settle_delay_ms(0)
            .with_log_path(dir.path().join("vital_log.csv"));
        let log = SessionLog::open(&config.log.path).unwrap();
        Presenter::new(&config, backend, log)
    }

    #[test]
    fn test_no_device_stays_disconnected() {
        let dir = tempfile::tempdir().unwrap();
        let mut presenter = presenter(Box::new(NoPorts), &dir);
        for _ in 0..3 {
            let report = presenter.on_data_tick(Local::now());
            assert_eq!(report.connection, ConnectionState::Disconnected);
            assert_eq!(report.lines_processed, 0);
        }
    }

    #[test]
    fn test_falls_through_to_next_candidate() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Flaky {
            failures: std::sync::atomic::AtomicUsize::new(1),
        };
        let mut presenter = presenter(Box::new(backend), &dir);
        let report = presenter.on_data_tick(Local::now());
        assert_eq!(
            report.connection,
            ConnectionState::Connected {
                port: "/dev/ttyACM0".into()
            }
        );
    }

    #[test]
    fn test_process_line_updates_and_logs() {
        let dir = tempfile::tempdir().unwrap();
        let mut presenter = presenter(Box::new(NoPorts), &dir);
        assert!(presenter.process_line("TEMP:39,NOISE:1", Local::now()));

        let temp = presenter.state().sensor("TEMP").unwrap();
        assert_eq!(temp.status, StatusLevel::Critical);
        assert!(presenter.state().sensor("NOISE").is_none());

        let content = std::fs::read_to_string(dir.path().join("vital_log.csv")).unwrap();
        assert!(content.trim_end().ends_with(",TEMP:39,NOISE:1"));
    }

    #[test]
    fn test_clock_tick_formats_time() {
        use chrono::TimeZone;
        let dir = tempfile::tempdir().unwrap();
        let mut presenter = presenter(Box::new(NoPorts), &dir);
        let at = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 9).unwrap();
        presenter.on_clock_tick(at);
        assert_eq!(presenter.state().clock, "Saturday, 09 March 2024 - 02:05:09 PM");
        assert!(presenter.state().last_received.is_none());
    }

    #[test]
    fn test_shutdown_is_repeatable() {
        let dir = tempfile::tempdir().unwrap();
        let mut presenter = presenter(Box::new(NoPorts), &dir);
        assert!(presenter.shutdown().is_ok());
        assert!(presenter.shutdown().is_ok());
        assert!(!presenter.process_line("TEMP:20", Local::now()));
    }
}
