//! Serial device discovery and the line-oriented link to the sensor board.
//!
//! Hardware access goes through [`SerialBackend`] and [`SerialStream`] so the
//! locator and link can be driven by in-memory fakes in tests.

pub mod link;
pub mod locator;
pub mod system;

pub use link::{LinkState, SerialLink};
pub use locator::DeviceLocator;
pub use system::SystemSerial;

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::io;

/// A serial port visible to the operating system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortDescriptor {
    /// OS identifier used to open the port, e.g. `/dev/ttyUSB0` or `COM3`
    pub name: String,
    /// Human-readable description, e.g. `USB-SERIAL CH340`
    pub description: String,
}

impl PortDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// An open byte stream to a device.
pub trait SerialStream: Send {
    /// Bytes that can be read right now without blocking.
    fn bytes_available(&mut self) -> io::Result<usize>;

    /// Read into `buf`. Only called after [`bytes_available`] reported data.
    ///
    /// [`bytes_available`]: SerialStream::bytes_available
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// Access to the machine's serial ports.
pub trait SerialBackend: Send {
    /// Enumerate the ports currently visible.
    fn available_ports(&self) -> Result<Vec<PortDescriptor>>;

    /// Open `port` at `baud_rate`.
    fn open(&self, port: &str, baud_rate: u32) -> Result<Box<dyn SerialStream>>;
}
