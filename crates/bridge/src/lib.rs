//! Host-facing capability boundary for labelprint.
//!
//! A host (mobile plugin shell, FFI wrapper, test harness) owns one
//! [`PrinterBridge`] and calls it with camelCase payloads. Every call
//! returns a typed response or a [`BridgeError`]; panics are caught and
//! reported as `internal_error` instead of unwinding into the host.

mod error;
mod payload;

pub use error::{BridgeError, ErrorCode, NOT_INITIALIZED_MESSAGE};
pub use payload::{
    BarcodeOptions, BridgeContext, ConnectOptions, ConnectResponse, ConnectionType,
    DiscoveryOptions, DiscoveryResult, InitializeResponse, InitializedResponse, PrintTextOptions,
    RasterPageOptions, StatusResponse, SuccessResponse,
};

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;

use labelprint_session::{
    ConnectionTarget, LabelDevice, PrinterSession, SessionConfig, SlcsDevice,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

/// Builds the device a fresh session drives.
pub type DeviceFactory = Box<dyn Fn(&SessionConfig) -> Box<dyn LabelDevice> + Send>;

// ── Helpers ─────────────────────────────────────────────────────────────

fn panic_payload_to_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        return (*msg).to_string();
    }
    if let Some(msg) = payload.downcast_ref::<String>() {
        return msg.clone();
    }
    "unknown panic payload".to_string()
}

/// Run a bridge entrypoint and convert panics into `internal_error`.
fn guard<T, F>(f: F) -> Result<T, BridgeError>
where
    F: FnOnce() -> Result<T, BridgeError>,
{
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => {
            let message = panic_payload_to_message(payload);
            warn!(%message, "bridge call panicked");
            Err(BridgeError::internal(message))
        }
    }
}

fn millis(ms: u64, field: &str) -> Result<Duration, BridgeError> {
    if ms == 0 {
        return Err(BridgeError::new(
            ErrorCode::ValidationError,
            format!("{field} must be greater than zero"),
        ));
    }
    Ok(Duration::from_millis(ms))
}

fn session_config(context: &BridgeContext) -> Result<SessionConfig, BridgeError> {
    let mut config = SessionConfig::default();
    if let Some(ms) = context.read_timeout_ms {
        config.timeouts.read = millis(ms, "readTimeoutMs")?;
    }
    if let Some(ms) = context.write_timeout_ms {
        config.timeouts.write = millis(ms, "writeTimeoutMs")?;
    }
    if let Some(ms) = context.discovery_timeout_ms {
        config.discovery.default_timeout = Duration::from_millis(ms);
    }
    config.trace_io = context.trace_io;
    Ok(config)
}

fn target_for(options: &ConnectOptions) -> Result<ConnectionTarget, BridgeError> {
    let timeout = millis(options.timeout, "timeout")?;
    let target = match options.kind {
        ConnectionType::Network => {
            ConnectionTarget::network(options.address.as_str()).with_port(options.port)
        }
        ConnectionType::Bluetooth | ConnectionType::Usb | ConnectionType::Serial => {
            ConnectionTarget::serial(options.address.as_str())
        }
    };
    Ok(target.with_timeout(timeout))
}

// ── Bridge ──────────────────────────────────────────────────────────────

/// The capability boundary: one optional session plus the factory that
/// builds its device on `initialize`.
pub struct PrinterBridge {
    session: Option<PrinterSession>,
    factory: DeviceFactory,
}

impl PrinterBridge {
    /// Bridge that drives real hardware.
    pub fn new() -> Self {
        Self::with_device_factory(Box::new(|config: &SessionConfig| {
            Box::new(SlcsDevice::new(config.clone())) as Box<dyn LabelDevice>
        }))
    }

    /// Bridge whose sessions drive devices built by `factory`.
    pub fn with_device_factory(factory: DeviceFactory) -> Self {
        Self {
            session: None,
            factory,
        }
    }

    fn session(&mut self) -> Result<&mut PrinterSession, BridgeError> {
        self.session.as_mut().ok_or_else(BridgeError::not_initialized)
    }

    /// Create the session. Calling it again replaces the session and drops
    /// any open connection.
    pub fn initialize(&mut self, context: BridgeContext) -> Result<InitializeResponse, BridgeError> {
        guard(|| {
            let config = session_config(&context)?;
            let device = (self.factory)(&config);
            if self.session.replace(PrinterSession::with_config(device, config)).is_some() {
                info!("bridge re-initialized, previous session dropped");
            } else {
                info!("bridge initialized");
            }
            Ok(SuccessResponse { success: true })
        })
    }

    /// Whether `initialize` has run.
    pub fn is_initialized(&self) -> InitializedResponse {
        InitializedResponse {
            initialized: self.session.is_some(),
        }
    }

    /// Connect to a printer.
    pub fn connect(&mut self, options: ConnectOptions) -> Result<ConnectResponse, BridgeError> {
        guard(|| {
            let session = self.session()?;
            let target = target_for(&options)?;
            let label = session.connect(&target)?;
            Ok(ConnectResponse {
                success: true,
                message: format!("Connected to: {label}"),
                printer_name: label.as_str().to_string(),
            })
        })
    }

    /// Scan the network and wait for the outcome. A scan that times out
    /// reports an empty list.
    pub fn discover_network_printers(
        &mut self,
        options: DiscoveryOptions,
    ) -> Result<DiscoveryResult, BridgeError> {
        guard(|| {
            let session = self.session()?;
            let timeout = options.timeout.map(Duration::from_millis);
            let outcome = session.discover_network_printers(timeout)?.wait();
            if outcome.timed_out() {
                debug!("discovery timed out, reporting no devices");
            }
            Ok(DiscoveryResult {
                success: true,
                devices: outcome.into_devices(),
            })
        })
    }

    /// Print a line of text.
    pub fn print_text(&mut self, options: PrintTextOptions) -> Result<SuccessResponse, BridgeError> {
        guard(|| {
            self.session()?.print_text(options.to_op())?;
            Ok(SuccessResponse { success: true })
        })
    }

    /// Print a barcode.
    pub fn print_barcode(&mut self, options: BarcodeOptions) -> Result<SuccessResponse, BridgeError> {
        guard(|| {
            self.session()?.print_barcode(options.to_op())?;
            Ok(SuccessResponse { success: true })
        })
    }

    /// Print one page of a staged document.
    pub fn print_raster_page(
        &mut self,
        options: RasterPageOptions,
    ) -> Result<SuccessResponse, BridgeError> {
        guard(|| {
            self.session()?.print_raster_page(options.to_op())?;
            Ok(SuccessResponse { success: true })
        })
    }

    /// Decoded printer status.
    pub fn get_status(&mut self) -> Result<StatusResponse, BridgeError> {
        guard(|| Ok(self.session()?.get_status()?.into()))
    }

    /// Close the connection. `success` is `false` when nothing was open.
    pub fn disconnect(&mut self) -> Result<SuccessResponse, BridgeError> {
        guard(|| {
            let success = self.session()?.disconnect()?;
            Ok(SuccessResponse { success })
        })
    }

    /// JSON entrypoint: `method` is the host method name, `payload` its
    /// options object. Returns the response JSON, or the serialized
    /// [`BridgeError`] (`{"code": ..., "message": ...}`).
    pub fn dispatch(&mut self, method: &str, payload: &str) -> String {
        let result = guard(|| match method {
            "initialize" => to_json(self.initialize(parse(payload)?)),
            "isInitialized" => to_json(Ok(self.is_initialized())),
            "connect" => to_json(self.connect(parse(payload)?)),
            "discoverNetworkPrinters" => to_json(self.discover_network_printers(parse(payload)?)),
            "printText" => to_json(self.print_text(parse(payload)?)),
            "printBarcode" => to_json(self.print_barcode(parse(payload)?)),
            "printRasterPage" => to_json(self.print_raster_page(parse(payload)?)),
            "getStatus" => to_json(self.get_status()),
            "disconnect" => to_json(self.disconnect()),
            other => Err(BridgeError::new(
                ErrorCode::ValidationError,
                format!("unknown method: {other}"),
            )),
        });
        result.unwrap_or_else(|err| error_json(&err))
    }
}

impl Default for PrinterBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PrinterBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrinterBridge")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

fn parse<T: DeserializeOwned>(payload: &str) -> Result<T, BridgeError> {
    let payload = if payload.trim().is_empty() { "{}" } else { payload };
    serde_json::from_str(payload)
        .map_err(|e| BridgeError::new(ErrorCode::ValidationError, format!("invalid payload: {e}")))
}

fn to_json<T: Serialize>(result: Result<T, BridgeError>) -> Result<String, BridgeError> {
    serde_json::to_string(&result?)
        .map_err(|e| BridgeError::internal(format!("cannot serialize response: {e}")))
}

fn error_json(err: &BridgeError) -> String {
    serde_json::to_string(err).unwrap_or_else(|_| {
        serde_json::json!({
            "code": ErrorCode::InternalError,
            "message": err.message,
        })
        .to_string()
    })
}
