//! Error handling for the VitalWatch dashboard crate.

/// A specialized `Result` type for VitalWatch operations.
pub type Result<T> = std::result::Result<T, MonitorError>;

/// The main error type for VitalWatch operations.
///
/// Only `Config`, `WebServer` and startup `Io` failures are fatal. Everything
/// raised while the dashboard is running is absorbed by the tick that hit it.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serial port enumeration failed
    #[error("Failed to enumerate serial ports: {0}")]
    PortEnumeration(String),

    /// A matched port could not be opened
    #[error("Failed to open serial port {port}: {reason}")]
    LinkOpen { port: String, reason: String },

    /// Reading from an open link failed (I/O or UTF-8 decode)
    #[error("Serial read error: {0}")]
    LinkRead(String),

    /// A single sensor value could not be evaluated
    #[error("Cannot evaluate {key}={value}: {reason}")]
    Evaluation {
        key: String,
        value: String,
        reason: String,
    },

    /// Session log write failed
    #[error("Session log error: {0}")]
    LogWrite(String),

    /// Web server error
    #[error("Web server error: {0}")]
    WebServer(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl MonitorError {
    /// Create a new port enumeration error
    pub fn enumeration_error(msg: impl Into<String>) -> Self {
        Self::PortEnumeration(msg.into())
    }

    /// Create a new link open error
    pub fn link_open_error(port: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::LinkOpen {
            port: port.into(),
            reason: reason.into(),
        }
    }

    /// Create a new link read error
    pub fn link_read_error(msg: impl Into<String>) -> Self {
        Self::LinkRead(msg.into())
    }

    /// Create a new evaluation error
    pub fn evaluation_error(
        key: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Evaluation {
            key: key.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a new session log error
    pub fn log_write_error(msg: impl Into<String>) -> Self {
        Self::LogWrite(msg.into())
    }

    /// Create a new web server error
    pub fn web_server_error(msg: impl Into<String>) -> Self {
        Self::WebServer(msg.into())
    }

    /// Create a new configuration error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether the dashboard can keep running after this error.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Config(_) | Self::WebServer(_))
    }
}

impl From<csv::Error> for MonitorError {
    fn from(err: csv::Error) -> Self {
        Self::LogWrite(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_open_message_names_port() {
        let err = MonitorError::link_open_error("/dev/ttyUSB0", "permission denied");
        let msg = err.to_string();
        assert!(msg.contains("/dev/ttyUSB0"));
        assert!(msg.contains("permission denied"));
    }

    #[test]
    fn test_recoverable_kinds() {
        assert!(MonitorError::link_read_error("eof").is_recoverable());
        assert!(MonitorError::enumeration_error("no udev").is_recoverable());
        assert!(MonitorError::log_write_error("disk full").is_recoverable());
        assert!(!MonitorError::config_error("bad baud").is_recoverable());
    }
}
