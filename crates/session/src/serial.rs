//! Serial/Bluetooth SPP transport using the `serialport` crate.
//!
//! Feature-gated behind the `serial` Cargo feature.

use std::io::Write;

use tracing::debug;

use crate::frame::{DEFAULT_MAX_RESPONSE, Expect, read_response, trace_bytes};
use crate::{SessionConfig, SessionError, Transport};

/// Default baud rate for label printers (9600 8N1).
pub const DEFAULT_BAUD: u32 = 9600;

/// A printer attached to a serial port (RS-232, USB-serial, or Bluetooth
/// SPP).
pub struct SerialTransport {
    port: Option<Box<dyn serialport::SerialPort>>,
    config: SessionConfig,
    path: String,
}

impl SerialTransport {
    /// Open `path` at `baud`.
    ///
    /// Serial opens have no separate connect timeout; the port's I/O timeout
    /// is the larger of the configured read and write timeouts.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::SerialError` if the port cannot be opened.
    pub fn open(path: &str, baud: u32, config: SessionConfig) -> Result<Self, SessionError> {
        let timeout = config.timeouts.read.max(config.timeouts.write);
        debug!(path, baud, "opening serial link");
        let port = serialport::new(path, baud)
            .timeout(timeout)
            .open()
            .map_err(|e| SessionError::SerialError(e.to_string()))?;

        Ok(Self {
            port: Some(port),
            config,
            path: path.to_string(),
        })
    }

    /// List available serial port names on the system.
    ///
    /// Built without `libudev`; on Linux enumeration falls back to sysfs.
    pub fn list_ports() -> Vec<String> {
        serialport::available_ports()
            .unwrap_or_default()
            .into_iter()
            .map(|p| p.port_name)
            .collect()
    }

    fn port(&mut self) -> Result<&mut Box<dyn serialport::SerialPort>, SessionError> {
        self.port.as_mut().ok_or(SessionError::NotConnected)
    }
}

impl Transport for SerialTransport {
    fn send_raw(&mut self, data: &[u8]) -> Result<(), SessionError> {
        trace_bytes(self.config.trace_io, "tx", data);
        let port = self.port()?;
        port.write_all(data).map_err(SessionError::WriteFailed)?;
        port.flush().map_err(SessionError::WriteFailed)?;
        Ok(())
    }

    fn query(&mut self, cmd: &[u8], expect: Expect) -> Result<Vec<u8>, SessionError> {
        self.send_raw(cmd)?;
        let timeout = self.config.timeouts.read;
        let trace = self.config.trace_io;
        let response = read_response(self.port()?, expect, timeout, DEFAULT_MAX_RESPONSE)?;
        trace_bytes(trace, "rx", &response);
        Ok(response)
    }

    fn close(&mut self) -> Result<(), SessionError> {
        if self.port.take().is_some() {
            debug!(path = %self.path, "closed serial link");
        }
        Ok(())
    }
}
