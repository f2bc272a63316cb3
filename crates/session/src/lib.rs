//! Label printer session -- connect, discover, print, and read status.
//!
//! Drives one networked (or serial) label/receipt printer through a single
//! owned [`PrinterSession`]: connection lifecycle, bounded network discovery,
//! the clear/begin/draw/end/print transaction with buffer rollback, and
//! status-byte decoding. The API is synchronous (`std::net` and threads);
//! no async runtime is required.
mod addr;
mod codec;
mod config;
mod discovery;
mod draw;
mod error;
mod frame;
#[cfg(feature = "mdns")]
mod mdns;
mod raster;
#[cfg(feature = "serial")]
mod serial;
mod session;
mod slcs;
mod status;
mod target;
#[cfg(feature = "tcp")]
mod tcp;
mod transaction;
mod transport;

pub use addr::{DEFAULT_PORT, resolve_printer_addr};
pub use codec::{
    Alignment, DRAW_OK, END_TRANSACTION_OK, ERR_BUFFER_OVERFLOW, ERR_INVALID_CHARACTER,
    ERR_INVALID_LENGTH, ERR_NO_TRANSACTION, ERR_RASTER, ERR_WRITE_FAILED, ERR_ZERO_DIMENSION,
    EncodeError, FontSize, HriPosition, Symbology,
};
pub use config::{DeviceTimeouts, DiscoveryConfig, SessionConfig};
pub use discovery::{DiscoveryCoordinator, DiscoveryHandle, DiscoveryOutcome};
pub use draw::{BarcodeDims, BarcodeOp, DrawOp, Position, RasterPageOp, TextOp};
pub use error::{ErrorCategory, SessionError};
pub use frame::{Expect, read_response};
#[cfg(feature = "mdns")]
pub use mdns::PDL_SERVICE_TYPE;
#[cfg(feature = "raster")]
pub use raster::ImageRasterizer;
pub use raster::{Bitmap, Rasterizer, binarize};
#[cfg(feature = "serial")]
pub use serial::SerialTransport;
pub use session::PrinterSession;
pub use slcs::SlcsDevice;
pub use status::{PaperState, PrinterStatus};
pub use target::{ConnectionKind, ConnectionTarget, DEFAULT_CONNECT_TIMEOUT, DeviceLabel};
#[cfg(feature = "tcp")]
pub use tcp::TcpTransport;
pub use transaction::PrintTransaction;
pub use transport::TransportSession;

use std::collections::BTreeSet;
use std::sync::mpsc::Sender;
use std::time::Duration;

// ── Traits ──────────────────────────────────────────────────────────────

/// Bidirectional byte link to a printer. All transports implement this.
pub trait Transport: Send {
    /// Send raw bytes to the printer.
    fn send_raw(&mut self, data: &[u8]) -> Result<(), SessionError>;

    /// Send a command and read a response of the given shape.
    fn query(&mut self, cmd: &[u8], expect: Expect) -> Result<Vec<u8>, SessionError>;

    /// Close the link. Further calls fail; closing twice is a no-op.
    fn close(&mut self) -> Result<(), SessionError>;
}

/// The printer SDK surface the session drives.
///
/// Implemented by [`SlcsDevice`] for real hardware; tests and hosts can plug
/// in their own. Only [`TransportSession`] calls `connect`/`disconnect`; the
/// remaining methods are only reached while the session reports connected.
pub trait LabelDevice: Send {
    /// Open the link described by `target` and return the identifier string
    /// the device reports, if any. Interpreting the identifier is the
    /// caller's job.
    fn connect(&mut self, target: &ConnectionTarget) -> Result<Option<String>, SessionError>;

    /// Close the link. Must tolerate being called while already closed.
    fn disconnect(&mut self) -> Result<(), SessionError>;

    /// Discard any pending draw state on the device.
    fn clear_buffer(&mut self) -> Result<(), SessionError>;

    /// Open a transaction bracket.
    fn begin_transaction(&mut self) -> Result<(), SessionError>;

    /// Draw one op into the open transaction. Returns the protocol code
    /// ([`DRAW_OK`] on success).
    fn draw(&mut self, op: &DrawOp) -> Result<i32, SessionError>;

    /// Close the transaction bracket. Returns the protocol code
    /// ([`END_TRANSACTION_OK`] on success).
    fn end_transaction(&mut self) -> Result<i32, SessionError>;

    /// Physically print `copies` of each of `sets` label sets.
    fn print(&mut self, copies: u32, sets: u32) -> Result<(), SessionError>;

    /// Read the vendor status bytes. An empty vector means the device gave
    /// no answer.
    fn status(&mut self, extended: bool) -> Result<Vec<u8>, SessionError>;

    /// Start a network scan lasting about `timeout`. Must not block for the
    /// scan: results are reported later, at most once, on `notify`.
    fn find_network_printers(
        &mut self,
        timeout: Duration,
        notify: Sender<DeviceEvent>,
    ) -> Result<(), SessionError>;
}

impl<D: LabelDevice + ?Sized> LabelDevice for Box<D> {
    fn connect(&mut self, target: &ConnectionTarget) -> Result<Option<String>, SessionError> {
        (**self).connect(target)
    }

    fn disconnect(&mut self) -> Result<(), SessionError> {
        (**self).disconnect()
    }

    fn clear_buffer(&mut self) -> Result<(), SessionError> {
        (**self).clear_buffer()
    }

    fn begin_transaction(&mut self) -> Result<(), SessionError> {
        (**self).begin_transaction()
    }

    fn draw(&mut self, op: &DrawOp) -> Result<i32, SessionError> {
        (**self).draw(op)
    }

    fn end_transaction(&mut self) -> Result<i32, SessionError> {
        (**self).end_transaction()
    }

    fn print(&mut self, copies: u32, sets: u32) -> Result<(), SessionError> {
        (**self).print(copies, sets)
    }

    fn status(&mut self, extended: bool) -> Result<Vec<u8>, SessionError> {
        (**self).status(extended)
    }

    fn find_network_printers(
        &mut self,
        timeout: Duration,
        notify: Sender<DeviceEvent>,
    ) -> Result<(), SessionError> {
        (**self).find_network_printers(timeout, notify)
    }
}

/// Asynchronous notifications from a [`LabelDevice`].
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    /// Result of a network scan. `None` means nothing was found.
    NetworkDeviceSet(Option<BTreeSet<String>>),
}
