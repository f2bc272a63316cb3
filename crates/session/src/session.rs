//! The printer session facade.

use std::time::Duration;

use tracing::debug;

use crate::{
    BarcodeOp, ConnectionTarget, DeviceLabel, DiscoveryCoordinator, DiscoveryHandle, DrawOp,
    LabelDevice, PrintTransaction, PrinterStatus, RasterPageOp, SessionConfig, SessionError,
    SlcsDevice, TextOp, TransportSession,
};

/// One printer, one connection.
///
/// Every operation takes `&mut self`, so transactions, status reads, and
/// discovery on one session are serialized by the borrow checker.
///
/// ```no_run
/// use labelprint_session::{ConnectionTarget, PrinterSession, TextOp};
///
/// let mut session = PrinterSession::default();
/// let name = session.connect(&ConnectionTarget::network("192.0.2.10"))?;
/// println!("connected to {name}");
/// session.print_text(TextOp::new("Hello"))?;
/// session.disconnect()?;
/// # Ok::<(), labelprint_session::SessionError>(())
/// ```
#[derive(Debug)]
pub struct PrinterSession {
    transport: TransportSession,
    discovery: DiscoveryCoordinator,
}

impl PrinterSession {
    /// Session over the given device with default configuration.
    pub fn new(device: impl LabelDevice + 'static) -> Self {
        Self::with_config(device, SessionConfig::default())
    }

    /// Session over the given device.
    pub fn with_config(device: impl LabelDevice + 'static, config: SessionConfig) -> Self {
        Self {
            transport: TransportSession::new(Box::new(device)),
            discovery: DiscoveryCoordinator::new(config.discovery),
        }
    }

    /// Session driving real hardware through [`SlcsDevice`].
    pub fn hardware(config: SessionConfig) -> Self {
        let device = SlcsDevice::new(config.clone());
        Self::with_config(device, config)
    }

    /// Connect and return the printer's name.
    pub fn connect(&mut self, target: &ConnectionTarget) -> Result<DeviceLabel, SessionError> {
        self.transport.connect(target)
    }

    /// Start a network scan. `None` uses the configured default timeout.
    ///
    /// The returned handle resolves exactly once, no later than the timeout
    /// plus the grace period. Does not need a connection.
    pub fn discover_network_printers(
        &mut self,
        timeout: Option<Duration>,
    ) -> Result<DiscoveryHandle, SessionError> {
        let timeout = timeout.unwrap_or_else(|| self.discovery.default_timeout());
        self.discovery
            .begin(self.transport.device_unchecked(), timeout)
    }

    /// Print a line of text.
    pub fn print_text(&mut self, op: TextOp) -> Result<(), SessionError> {
        self.print(&DrawOp::Text(op))
    }

    /// Print a barcode.
    pub fn print_barcode(&mut self, op: BarcodeOp) -> Result<(), SessionError> {
        self.print(&DrawOp::Barcode(op))
    }

    /// Print one page of a PDF or image.
    pub fn print_raster_page(&mut self, op: RasterPageOp) -> Result<(), SessionError> {
        self.print(&DrawOp::RasterPage(op))
    }

    /// Run one print transaction for `op`.
    pub fn print(&mut self, op: &DrawOp) -> Result<(), SessionError> {
        debug!(op = op.kind(), "print requested");
        PrintTransaction::new(op).run(&mut self.transport)
    }

    /// Decoded printer status. Reports `Disconnected` without touching the
    /// device when no connection is open.
    pub fn get_status(&mut self) -> Result<PrinterStatus, SessionError> {
        if !self.transport.is_connected() {
            return Ok(PrinterStatus::disconnected());
        }
        let bytes = self.transport.query_raw_status(false)?;
        Ok(PrinterStatus::decode(true, &bytes))
    }

    /// Raw vendor status bytes (basic: 1 byte, extended: 4 bytes).
    pub fn raw_status(&mut self, extended: bool) -> Result<Vec<u8>, SessionError> {
        self.transport.query_raw_status(extended)
    }

    /// Close the connection. `Ok(false)` when nothing was connected.
    pub fn disconnect(&mut self) -> Result<bool, SessionError> {
        self.transport.disconnect()
    }

    /// Whether the session believes it is connected. Not refreshed by any
    /// liveness check.
    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Name reported by the connected printer.
    pub fn printer_name(&self) -> Option<&DeviceLabel> {
        self.transport.label()
    }
}

impl Default for PrinterSession {
    fn default() -> Self {
        Self::hardware(SessionConfig::default())
    }
}
