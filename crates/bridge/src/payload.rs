//! Request and response payloads exchanged with the host.
//!
//! Field names are camelCase on the wire. Every optional request field
//! has the same default the host plugin always used.

use serde::{Deserialize, Serialize};

use labelprint_session::{
    Alignment, BarcodeDims, BarcodeOp, FontSize, PaperState, Position, PrinterStatus,
    RasterPageOp, Symbology, TextOp,
};

/// Session settings supplied on `initialize`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BridgeContext {
    /// Transport read timeout in milliseconds.
    pub read_timeout_ms: Option<u64>,
    /// Transport write timeout in milliseconds.
    pub write_timeout_ms: Option<u64>,
    /// Discovery timeout used when a request omits one.
    pub discovery_timeout_ms: Option<u64>,
    /// Hex-dump transport traffic at trace level.
    pub trace_io: bool,
}

/// How the printer is attached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionType {
    /// TCP to `address:port`.
    #[default]
    Network,
    /// Bluetooth SPP device node.
    Bluetooth,
    /// USB-serial device node.
    Usb,
    /// Any other serial device path.
    Serial,
}

/// `connect` request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectOptions {
    /// IP address, hostname, or device path.
    #[serde(default)]
    pub address: String,
    /// Connection type.
    #[serde(rename = "type", default)]
    pub kind: ConnectionType,
    /// TCP port (network only).
    #[serde(default = "default_port")]
    pub port: u16,
    /// Connect timeout in milliseconds.
    #[serde(default = "default_connect_timeout")]
    pub timeout: u64,
}

fn default_port() -> u16 {
    labelprint_session::DEFAULT_PORT
}

fn default_connect_timeout() -> u64 {
    5000
}

/// `connect` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectResponse {
    /// Always `true`; failures are errors.
    pub success: bool,
    /// Human-readable summary.
    pub message: String,
    /// Identifier the printer reported.
    pub printer_name: String,
}

/// `discoverNetworkPrinters` request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DiscoveryOptions {
    /// Scan duration in milliseconds.
    pub timeout: Option<u64>,
}

/// `discoverNetworkPrinters` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryResult {
    /// Always `true`; a silent scan is an empty list.
    pub success: bool,
    /// Printer addresses.
    pub devices: Vec<String>,
}

/// `printText` request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintTextOptions {
    /// Text to print.
    #[serde(default)]
    pub text: String,
    /// Font size name.
    #[serde(default = "default_font")]
    pub font_size: String,
    /// Alignment name.
    #[serde(default = "default_alignment")]
    pub alignment: String,
    /// Bold text.
    #[serde(default)]
    pub bold: bool,
    /// Horizontal position in dots.
    #[serde(default)]
    pub horizontal_position: u32,
    /// Vertical position in dots.
    #[serde(default)]
    pub vertical_position: u32,
}

fn default_font() -> String {
    "normal".to_string()
}

fn default_alignment() -> String {
    "left".to_string()
}

impl PrintTextOptions {
    /// The draw op, with unknown names mapped to their fallbacks.
    pub fn to_op(&self) -> TextOp {
        let mut op = TextOp::new(self.text.clone());
        op.position = Position::new(self.horizontal_position, self.vertical_position);
        op.font = FontSize::from_name(&self.font_size);
        op.align = Alignment::from_name(&self.alignment);
        op.bold = self.bold;
        op
    }
}

/// `printBarcode` request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BarcodeOptions {
    /// Encoded data.
    #[serde(default)]
    pub data: String,
    /// Symbology name.
    #[serde(default = "default_symbology")]
    pub barcode_type: String,
    /// Narrow bar width in dots.
    #[serde(default = "default_bar_width")]
    pub width: u32,
    /// Bar height in dots.
    #[serde(default = "default_bar_height")]
    pub height: u32,
    /// Horizontal position in dots.
    #[serde(default)]
    pub horizontal_position: u32,
    /// Vertical position in dots.
    #[serde(default)]
    pub vertical_position: u32,
    /// Print the human-readable line.
    #[serde(default)]
    pub hri: bool,
}

fn default_symbology() -> String {
    "CODE128".to_string()
}

fn default_bar_width() -> u32 {
    BarcodeDims::default().narrow
}

fn default_bar_height() -> u32 {
    BarcodeDims::default().height
}

impl BarcodeOptions {
    /// The draw op, with an unknown symbology mapped to CODE128.
    pub fn to_op(&self) -> BarcodeOp {
        let mut op = BarcodeOp::new(self.data.clone());
        op.symbology = Symbology::from_name(&self.barcode_type);
        op.dims = BarcodeDims {
            narrow: self.width,
            height: self.height,
        };
        op.position = Position::new(self.horizontal_position, self.vertical_position);
        op.human_readable = self.hri;
        op
    }
}

/// `printRasterPage` request. The host stages the document bytes.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RasterPageOptions {
    /// Document bytes. The bundled rasterizer decodes PNG, JPEG, and BMP;
    /// PDF pages need a host-supplied `Rasterizer` on the device.
    #[serde(default)]
    pub source: Vec<u8>,
    /// Target width in dots; 0 keeps the source width.
    #[serde(default)]
    pub width: u32,
    /// Horizontal position in dots.
    #[serde(default)]
    pub horizontal_position: u32,
    /// Vertical position in dots.
    #[serde(default)]
    pub vertical_position: u32,
    /// 1-based page number.
    #[serde(default = "default_page")]
    pub page: u32,
    /// Dither grayscale.
    #[serde(default = "default_true")]
    pub dithering: bool,
    /// Compress bitmap rows.
    #[serde(default = "default_true")]
    pub compress: bool,
    /// Brightness level.
    #[serde(default = "default_level")]
    pub level: u32,
}

fn default_page() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

fn default_level() -> u32 {
    1
}

impl RasterPageOptions {
    /// The draw op.
    pub fn to_op(&self) -> RasterPageOp {
        let mut op = RasterPageOp::new(self.source.clone());
        op.position = Position::new(self.horizontal_position, self.vertical_position);
        op.page = self.page;
        op.width = self.width;
        op.dither = self.dithering;
        op.compress = self.compress;
        op.level = self.level;
        op
    }
}

/// `{ success }` response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SuccessResponse {
    /// Whether the call did what was asked. `disconnect` on an idle
    /// session reports `false` without failing.
    pub success: bool,
}

/// `initialize` response.
pub type InitializeResponse = SuccessResponse;

/// `isInitialized` response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InitializedResponse {
    /// Whether `initialize` has run.
    pub initialized: bool,
}

/// `getStatus` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    /// Session connection flag.
    pub connected: bool,
    /// Printer ready.
    pub ready: bool,
    /// `ok`, `out`, `cover_open`, `unknown`, or `disconnected`.
    pub paper_status: PaperState,
    /// Paper out; omitted unless status bytes were read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paper_out: Option<bool>,
    /// Cover open; omitted unless status bytes were read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_open: Option<bool>,
}

impl From<PrinterStatus> for StatusResponse {
    fn from(status: PrinterStatus) -> Self {
        let decoded = !matches!(
            status.paper_state,
            PaperState::Unknown | PaperState::Disconnected
        );
        Self {
            connected: status.connected,
            ready: status.ready,
            paper_status: status.paper_state,
            paper_out: decoded.then_some(status.paper_out),
            cover_open: decoded.then_some(status.cover_open),
        }
    }
}
