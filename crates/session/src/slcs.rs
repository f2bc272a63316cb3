//! [`LabelDevice`] driver speaking the printer's label command language.
//!
//! Draw commands are composed into a host-side buffer while a transaction is
//! open and written to the printer in one piece when it ends, so a failed
//! transaction never reaches the print head. Identification and status
//! queries go straight to the link.

use std::sync::mpsc::Sender;
use std::time::Duration;

use tracing::{debug, warn};

use crate::codec::{
    CLEAR_BUFFER, IDENTIFY, encode_barcode, encode_bitmap, encode_text, print_command,
    status_request,
};
use crate::frame::Expect;
use crate::{
    ConnectionKind, ConnectionTarget, DRAW_OK, DeviceEvent, DrawOp, END_TRANSACTION_OK,
    ERR_BUFFER_OVERFLOW, ERR_NO_TRANSACTION, ERR_RASTER, ERR_WRITE_FAILED, LabelDevice,
    Rasterizer, SessionConfig, SessionError, Transport,
};

/// Upper bound on one composed transaction (4 MiB).
const MAX_TRANSACTION_BYTES: usize = 4 * 1024 * 1024;

/// Real printer driver over a byte [`Transport`].
pub struct SlcsDevice {
    config: SessionConfig,
    link: Option<Box<dyn Transport>>,
    rasterizer: Option<Box<dyn Rasterizer>>,
    /// Commands composed in the open transaction. `None` outside one.
    pending: Option<Vec<u8>>,
}

impl SlcsDevice {
    /// Driver with the given configuration. Raster pages use the bundled
    /// image rasterizer when the `raster` feature is enabled.
    pub fn new(config: SessionConfig) -> Self {
        #[cfg(feature = "raster")]
        let rasterizer: Option<Box<dyn Rasterizer>> = Some(Box::new(crate::ImageRasterizer));
        #[cfg(not(feature = "raster"))]
        let rasterizer: Option<Box<dyn Rasterizer>> = None;

        Self {
            config,
            link: None,
            rasterizer,
            pending: None,
        }
    }

    /// Replace the rasterizer used for raster page ops.
    pub fn with_rasterizer(mut self, rasterizer: impl Rasterizer + 'static) -> Self {
        self.rasterizer = Some(Box::new(rasterizer));
        self
    }

    fn link(&mut self) -> Result<&mut Box<dyn Transport>, SessionError> {
        self.link.as_mut().ok_or(SessionError::NotConnected)
    }

    fn open(&self, target: &ConnectionTarget) -> Result<Box<dyn Transport>, SessionError> {
        match target.kind() {
            #[cfg(feature = "tcp")]
            ConnectionKind::Network => {
                let port = target.port().unwrap_or(crate::DEFAULT_PORT);
                let link = crate::TcpTransport::connect(
                    target.address(),
                    port,
                    target.timeout(),
                    self.config.clone(),
                )?;
                Ok(Box::new(link))
            }
            #[cfg(feature = "serial")]
            ConnectionKind::Serial => {
                let link = crate::SerialTransport::open(
                    target.address(),
                    crate::serial::DEFAULT_BAUD,
                    self.config.clone(),
                )?;
                Ok(Box::new(link))
            }
            #[allow(unreachable_patterns)]
            kind => Err(SessionError::InvalidConfig(format!(
                "{kind:?} transport support is not compiled in"
            ))),
        }
    }

    /// Encode one op into command bytes. Protocol failures come back as
    /// `Err(code)`.
    fn encode(&self, op: &DrawOp) -> Result<Result<Vec<u8>, i32>, SessionError> {
        let encoded = match op {
            DrawOp::Text(text) => encode_text(text),
            DrawOp::Barcode(barcode) => encode_barcode(barcode),
            DrawOp::RasterPage(page) => {
                let Some(rasterizer) = self.rasterizer.as_deref() else {
                    warn!("raster page drawn without a rasterizer");
                    return Ok(Err(ERR_RASTER));
                };
                let bitmap = rasterizer.rasterize(page)?;
                encode_bitmap(&bitmap, page.position, page.compress)
            }
        };
        Ok(encoded.map_err(|e| {
            debug!(op = op.kind(), error = %e, "draw rejected");
            e.code()
        }))
    }
}

impl LabelDevice for SlcsDevice {
    fn connect(&mut self, target: &ConnectionTarget) -> Result<Option<String>, SessionError> {
        if let Some(mut old) = self.link.take() {
            old.close()?;
        }
        self.pending = None;

        let mut link = self.open(target)?;
        let identifier = match link.query(IDENTIFY, Expect::Line) {
            Ok(bytes) => Some(String::from_utf8_lossy(&bytes).trim().to_string()),
            Err(SessionError::ReadTimeout | SessionError::ConnectionClosed) => {
                warn!(%target, "printer did not identify itself");
                None
            }
            Err(e) => return Err(e),
        };
        self.link = Some(link);
        Ok(identifier)
    }

    fn disconnect(&mut self) -> Result<(), SessionError> {
        self.pending = None;
        match self.link.take() {
            Some(mut link) => link.close(),
            None => Ok(()),
        }
    }

    fn clear_buffer(&mut self) -> Result<(), SessionError> {
        self.pending = None;
        self.link()?.send_raw(CLEAR_BUFFER)
    }

    fn begin_transaction(&mut self) -> Result<(), SessionError> {
        self.link()?;
        if self.pending.is_some() {
            debug!("begin inside open transaction, discarding composed commands");
        }
        self.pending = Some(Vec::new());
        Ok(())
    }

    fn draw(&mut self, op: &DrawOp) -> Result<i32, SessionError> {
        if self.pending.is_none() {
            return Ok(ERR_NO_TRANSACTION);
        }
        let bytes = match self.encode(op)? {
            Ok(bytes) => bytes,
            Err(code) => return Ok(code),
        };
        let Some(buffer) = self.pending.as_mut() else {
            return Ok(ERR_NO_TRANSACTION);
        };
        if buffer.len() + bytes.len() > MAX_TRANSACTION_BYTES {
            warn!(
                size = buffer.len() + bytes.len(),
                max = MAX_TRANSACTION_BYTES,
                "transaction buffer overflow"
            );
            return Ok(ERR_BUFFER_OVERFLOW);
        }
        buffer.extend_from_slice(&bytes);
        debug!(op = op.kind(), bytes = bytes.len(), "draw composed");
        Ok(DRAW_OK)
    }

    fn end_transaction(&mut self) -> Result<i32, SessionError> {
        let Some(buffer) = self.pending.take() else {
            return Ok(ERR_NO_TRANSACTION);
        };
        if let Err(e) = self.link()?.send_raw(&buffer) {
            warn!(error = %e, "flushing transaction failed");
            return Ok(ERR_WRITE_FAILED);
        }
        debug!(bytes = buffer.len(), "transaction flushed");
        Ok(END_TRANSACTION_OK)
    }

    fn print(&mut self, copies: u32, sets: u32) -> Result<(), SessionError> {
        self.link()?.send_raw(&print_command(copies, sets))
    }

    fn status(&mut self, extended: bool) -> Result<Vec<u8>, SessionError> {
        let (cmd, len) = status_request(extended);
        match self.link()?.query(cmd, Expect::Bytes(len)) {
            Ok(bytes) => Ok(bytes),
            Err(SessionError::ReadTimeout) => {
                warn!("printer did not answer status request");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    #[cfg_attr(not(feature = "mdns"), allow(unused_variables))]
    fn find_network_printers(
        &mut self,
        timeout: Duration,
        notify: Sender<DeviceEvent>,
    ) -> Result<(), SessionError> {
        #[cfg(feature = "mdns")]
        return crate::mdns::spawn_scan(timeout, notify);

        #[cfg(not(feature = "mdns"))]
        Err(SessionError::Discovery(
            "mDNS support is not compiled in".to_string(),
        ))
    }
}

impl std::fmt::Debug for SlcsDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlcsDevice")
            .field("connected", &self.link.is_some())
            .field("in_transaction", &self.pending.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BarcodeOp, ERR_INVALID_LENGTH, Symbology, TextOp};
    use std::sync::{Arc, Mutex};

    /// In-memory link recording everything written.
    struct Wire {
        written: Arc<Mutex<Vec<u8>>>,
        status: Vec<u8>,
    }

    impl Transport for Wire {
        fn send_raw(&mut self, data: &[u8]) -> Result<(), SessionError> {
            self.written.lock().unwrap().extend_from_slice(data);
            Ok(())
        }
        fn query(&mut self, cmd: &[u8], _: Expect) -> Result<Vec<u8>, SessionError> {
            self.send_raw(cmd)?;
            Ok(self.status.clone())
        }
        fn close(&mut self) -> Result<(), SessionError> {
            Ok(())
        }
    }

    fn attached(status: Vec<u8>) -> (SlcsDevice, Arc<Mutex<Vec<u8>>>) {
        let written = Arc::new(Mutex::new(Vec::new()));
        let mut device = SlcsDevice::new(SessionConfig::default());
        device.link = Some(Box::new(Wire {
            written: Arc::clone(&written),
            status,
        }));
        (device, written)
    }

    #[test]
    fn transaction_is_flushed_on_end() {
        let (mut device, written) = attached(vec![0]);
        device.begin_transaction().unwrap();
        assert_eq!(device.draw(&TextOp::new("Hi").into()).unwrap(), DRAW_OK);
        assert!(written.lock().unwrap().is_empty());

        assert_eq!(device.end_transaction().unwrap(), END_TRANSACTION_OK);
        device.print(1, 1).unwrap();
        let wire = String::from_utf8(written.lock().unwrap().clone()).unwrap();
        assert_eq!(wire, "T0,0,3,1,1,0,0,N,N,L,'Hi'\r\nP1,1\r\n");
    }

    #[test]
    fn clear_buffer_discards_composed_commands() {
        let (mut device, written) = attached(vec![0]);
        device.begin_transaction().unwrap();
        device.draw(&TextOp::new("lost").into()).unwrap();
        device.clear_buffer().unwrap();
        assert_eq!(device.end_transaction().unwrap(), ERR_NO_TRANSACTION);
        assert_eq!(written.lock().unwrap().as_slice(), CLEAR_BUFFER);
    }

    #[test]
    fn draw_outside_transaction() {
        let (mut device, _) = attached(vec![0]);
        assert_eq!(
            device.draw(&TextOp::new("x").into()).unwrap(),
            ERR_NO_TRANSACTION
        );
    }

    #[test]
    fn invalid_barcode_reports_protocol_code() {
        let (mut device, _) = attached(vec![0]);
        device.begin_transaction().unwrap();
        let mut op = BarcodeOp::new("123");
        op.symbology = Symbology::Ean13;
        assert_eq!(device.draw(&op.into()).unwrap(), ERR_INVALID_LENGTH);
    }

    #[test]
    fn status_queries_link() {
        let (mut device, written) = attached(vec![0x24]);
        assert_eq!(device.status(false).unwrap(), vec![0x24]);
        assert_eq!(written.lock().unwrap().as_slice(), b"~S,CHECK\r\n");
    }

    #[test]
    fn operations_without_link_fail() {
        let mut device = SlcsDevice::new(SessionConfig::default());
        assert!(matches!(
            device.clear_buffer(),
            Err(SessionError::NotConnected)
        ));
        assert!(matches!(
            device.status(false),
            Err(SessionError::NotConnected)
        ));
        device.disconnect().unwrap();
    }
}
