//! Line-oriented serial link with reconnect-friendly failure semantics.
//!
//! The link never retries on its own. Any read or decode failure closes it and
//! the caller decides when to look for the device again.

use crate::error::{MonitorError, Result};
use crate::serial::{SerialBackend, SerialStream};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Largest read issued per call to the stream.
const READ_CHUNK: usize = 1024;

/// Longest line accepted before the buffered bytes are discarded.
const MAX_LINE_BYTES: usize = 4096;

/// Lifecycle of the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkState {
    Closed,
    /// Port is open but the board is still rebooting
    Opening,
    Open,
}

/// An owned connection to the sensor board.
pub struct SerialLink {
    stream: Option<Box<dyn SerialStream>>,
    port: Option<String>,
    ready_at: Option<Instant>,
    settle_delay: Duration,
    buffer: Vec<u8>,
    /// Dropping input until the end of an overlong line
    discarding: bool,
}

impl SerialLink {
    /// Create a closed link. Opening it waits `settle_delay` before lines are read.
    pub fn new(settle_delay: Duration) -> Self {
        Self {
            stream: None,
            port: None,
            ready_at: None,
            settle_delay,
            buffer: Vec::new(),
            discarding: false,
        }
    }

    pub fn state(&self) -> LinkState {
        match (&self.stream, self.ready_at) {
            (None, _) => LinkState::Closed,
            (Some(_), Some(ready_at)) if Instant::now() < ready_at => LinkState::Opening,
            (Some(_), _) => LinkState::Open,
        }
    }

    pub fn is_open(&self) -> bool {
        self.state() == LinkState::Open
    }

    pub fn is_closed(&self) -> bool {
        self.state() == LinkState::Closed
    }

    /// Name of the port currently held, if any.
    pub fn port_name(&self) -> Option<&str> {
        self.port.as_deref()
    }

    /// Open `port`. On failure the link stays closed and the error is returned.
    pub fn try_open(
        &mut self,
        backend: &dyn SerialBackend,
        port: &str,
        baud_rate: u32,
    ) -> Result<()> {
        self.close();

        let stream = backend.open(port, baud_rate)?;
        self.stream = Some(stream);
        self.port = Some(port.to_string());
        self.ready_at = Some(Instant::now() + self.settle_delay);
        info!("Connected to {} at {} baud", port, baud_rate);
        Ok(())
    }

    /// Return the next complete line, if one is buffered.
    ///
    /// Never blocks: only bytes the OS already holds are read. Call in a loop
    /// until it yields `Ok(None)`. Returns `Ok(None)` while not open.
    pub fn poll_line(&mut self) -> Result<Option<String>> {
        if !self.is_open() {
            return Ok(None);
        }

        loop {
            if let Some(line) = self.take_line()? {
                return Ok(Some(line));
            }

            let Some(stream) = self.stream.as_mut() else {
                return Ok(None);
            };

            let available = match stream.bytes_available() {
                Ok(n) => n,
                Err(e) => return Err(self.fail(format!("cannot query input buffer: {}", e))),
            };
            if available == 0 {
                return Ok(None);
            }

            let mut chunk = vec![0u8; available.min(READ_CHUNK)];
            let read = match stream.read(&mut chunk) {
                Ok(n) => n,
                Err(e) => return Err(self.fail(format!("read failed: {}", e))),
            };
            if read == 0 {
                return Ok(None);
            }
            self.buffer.extend_from_slice(&chunk[..read]);

            if self.discarding {
                match self.buffer.iter().position(|&b| b == b'\n') {
                    Some(pos) => {
                        self.buffer.drain(..=pos);
                        self.discarding = false;
                        debug!("Resynchronised after overlong line");
                    }
                    None => self.buffer.clear(),
                }
            }

            if self.buffer.len() > MAX_LINE_BYTES && !self.buffer.contains(&b'\n') {
                warn!(
                    "Discarding {} bytes received without a line terminator",
                    self.buffer.len()
                );
                self.buffer.clear();
                // The tail of this line is still to come.
                self.discarding = true;
            }
        }
    }

    /// Release the handle. Safe to call when already closed.
    pub fn close(&mut self) {
        if self.stream.take().is_some() {
            info!(
                "Closed serial port {}",
                self.port.as_deref().unwrap_or("<unknown>")
            );
        }
        self.port = None;
        self.ready_at = None;
        self.buffer.clear();
        self.discarding = false;
    }

    fn take_line(&mut self) -> Result<Option<String>> {
        let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') else {
            return Ok(None);
        };

        let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
        match String::from_utf8(raw) {
            Ok(text) => {
                let line = text.trim_end().to_string();
                debug!("Received line: {}", line);
                Ok(Some(line))
            }
            Err(e) => Err(self.fail(format!("invalid UTF-8: {}", e))),
        }
    }

    fn fail(&mut self, reason: String) -> MonitorError {
        warn!("Serial error: {}", reason);
        self.close();
        MonitorError::link_read_error(reason)
    }
}

impl std::fmt::Debug for SerialLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialLink")
            .field("state", &self.state())
            .field("port", &self.port)
            .field("buffered", &self.buffer.len())
            .finish()
    }
}
