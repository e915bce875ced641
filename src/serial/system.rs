//! [`SerialBackend`] backed by the operating system via `serialport`.

use crate::error::{MonitorError, Result};
use crate::serial::{PortDescriptor, SerialBackend, SerialStream};
use serialport::{SerialPort, SerialPortInfo, SerialPortType};
use std::io::{self, Read};
use std::time::Duration;

/// Read timeout for the underlying handle. Reads are only issued for bytes
/// already buffered, so this is never waited out in practice.
const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Real serial ports.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemSerial;

impl SystemSerial {
    pub fn new() -> Self {
        Self
    }
}

/// Build a human-readable description in the spirit of the OS device manager:
/// product and manufacturer strings for USB adapters, the port type otherwise.
fn describe(info: &SerialPortInfo) -> String {
    match &info.port_type {
        SerialPortType::UsbPort(usb) => {
            let parts: Vec<&str> = [usb.product.as_deref(), usb.manufacturer.as_deref()]
                .into_iter()
                .flatten()
                .filter(|s| !s.is_empty())
                .collect();
            if parts.is_empty() {
                format!("USB Serial Device ({:04x}:{:04x})", usb.vid, usb.pid)
            } else {
                parts.join(" - ")
            }
        }
        SerialPortType::PciPort => "PCI Serial Port".to_string(),
        SerialPortType::BluetoothPort => "Bluetooth Serial Port".to_string(),
        SerialPortType::Unknown => "n/a".to_string(),
    }
}

impl SerialBackend for SystemSerial {
    fn available_ports(&self) -> Result<Vec<PortDescriptor>> {
        let ports = serialport::available_ports()
            .map_err(|e| MonitorError::enumeration_error(e.to_string()))?;

        Ok(ports
            .iter()
            .map(|info| PortDescriptor::new(info.port_name.clone(), describe(info)))
            .collect())
    }

    fn open(&self, port: &str, baud_rate: u32) -> Result<Box<dyn SerialStream>> {
        let handle = serialport::new(port, baud_rate)
            .timeout(READ_TIMEOUT)
            .open()
            .map_err(|e| MonitorError::link_open_error(port, e.to_string()))?;

        Ok(Box::new(handle))
    }
}

impl SerialStream for Box<dyn SerialPort> {
    fn bytes_available(&mut self) -> io::Result<usize> {
        self.bytes_to_read()
            .map(|n| n as usize)
            .map_err(io::Error::from)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Read::read(self, buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serialport::UsbPortInfo;

    fn usb(product: Option<&str>, manufacturer: Option<&str>) -> SerialPortInfo {
        SerialPortInfo {
            port_name: "/dev/ttyUSB0".to_string(),
            port_type: SerialPortType::UsbPort(UsbPortInfo {
                vid: 0x1a86,
                pid: 0x7523,
                serial_number: None,
                manufacturer: manufacturer.map(str::to_string),
                product: product.map(str::to_string),
            }),
        }
    }

    #[test]
    fn test_describe_usb_adapter() {
        let info = usb(Some("USB-SERIAL CH340"), Some("wch.cn"));
        assert_eq!(describe(&info), "USB-SERIAL CH340 - wch.cn");
    }

    #[test]
    fn test_describe_usb_without_strings() {
        let info = usb(None, Some(""));
        assert_eq!(describe(&info), "USB Serial Device (1a86:7523)");
    }

    #[test]
    fn test_describe_non_usb() {
        let info = SerialPortInfo {
            port_name: "/dev/ttyS0".to_string(),
            port_type: SerialPortType::Unknown,
        };
        assert_eq!(describe(&info), "n/a");
    }

    #[test]
    fn test_enumeration_does_not_panic() {
        // May legitimately fail on machines without serial support.
        let _ = SystemSerial::new().available_ports();
    }
}
