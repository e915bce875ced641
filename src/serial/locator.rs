//! Heuristic discovery of the sensor board among the visible serial ports.
//!
//! A port is a candidate when its description contains any configured
//! substring (case-sensitive). With several matching adapters attached the
//! first one in enumeration order wins; there is no way to tell them apart.

use crate::error::Result;
use crate::serial::{PortDescriptor, SerialBackend};
use tracing::{debug, warn};

/// Selects candidate ports by description substring.
#[derive(Debug, Clone)]
pub struct DeviceLocator {
    matchers: Vec<String>,
}

impl DeviceLocator {
    pub fn new<I, S>(matchers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            matchers: matchers.into_iter().map(Into::into).collect(),
        }
    }

    pub fn matchers(&self) -> &[String] {
        &self.matchers
    }

    /// Whether a port's description contains any matcher.
    pub fn matches(&self, port: &PortDescriptor) -> bool {
        self.matchers
            .iter()
            .any(|needle| port.description.contains(needle.as_str()))
    }

    /// Enumerate every port, surfacing enumeration errors.
    pub fn list_ports(&self, backend: &dyn SerialBackend) -> Result<Vec<PortDescriptor>> {
        backend.available_ports()
    }

    /// All matching ports in enumeration order. Enumeration failure yields none.
    pub fn candidate_ports(&self, backend: &dyn SerialBackend) -> Vec<PortDescriptor> {
        match backend.available_ports() {
            Ok(ports) => {
                let candidates: Vec<PortDescriptor> =
                    ports.into_iter().filter(|p| self.matches(p)).collect();
                debug!("Found {} candidate serial port(s)", candidates.len());
                candidates
            }
            Err(e) => {
                warn!("{}", e);
                Vec::new()
            }
        }
    }

    /// First matching port, if any.
    pub fn find_candidate_port(&self, backend: &dyn SerialBackend) -> Option<PortDescriptor> {
        self.candidate_ports(backend).into_iter().next()
    }
}

impl Default for DeviceLocator {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_PORT_MATCHERS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MonitorError;
    use crate::serial::SerialStream;

    struct FixedPorts(Result<Vec<PortDescriptor>>);

    impl SerialBackend for FixedPorts {
        fn available_ports(&self) -> Result<Vec<PortDescriptor>> {
            match &self.0 {
                Ok(ports) => Ok(ports.clone()),
                Err(e) => Err(MonitorError::enumeration_error(e.to_string())),
            }
        }

        fn open(&self, port: &str, _baud_rate: u32) -> Result<Box<dyn SerialStream>> {
            Err(MonitorError::link_open_error(port, "not supported"))
        }
    }

    fn ports() -> FixedPorts {
        FixedPorts(Ok(vec![
            PortDescriptor::new("/dev/ttyS0", "n/a"),
            PortDescriptor::new("/dev/ttyUSB0", "USB-SERIAL CH340"),
            PortDescriptor::new("/dev/ttyACM0", "Arduino Uno"),
        ]))
    }

    #[test]
    fn test_first_match_wins() {
        let locator = DeviceLocator::default();
        let port = locator.find_candidate_port(&ports()).unwrap();
        assert_eq!(port.name, "/dev/ttyUSB0");
    }

    #[test]
    fn test_candidates_keep_enumeration_order() {
        let names: Vec<String> = DeviceLocator::default()
            .candidate_ports(&ports())
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["/dev/ttyUSB0", "/dev/ttyACM0"]);
    }

    #[test]
    fn test_matching_is_case_sensitive() {
        let locator = DeviceLocator::new(["arduino"]);
        assert!(locator.find_candidate_port(&ports()).is_none());
    }

    #[test]
    fn test_no_match() {
        let locator = DeviceLocator::new(["FTDI"]);
        assert!(locator.find_candidate_port(&ports()).is_none());
    }

    #[test]
    fn test_enumeration_failure_is_none() {
        let backend = FixedPorts(Err(MonitorError::enumeration_error("udev unavailable")));
        let locator = DeviceLocator::default();
        assert!(locator.find_candidate_port(&backend).is_none());
        assert!(locator.list_ports(&backend).is_err());
    }
}
