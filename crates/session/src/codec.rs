//! Command codec: semantic draw parameters → device protocol codes and
//! wire commands.
//!
//! Callers pass font sizes, alignments, and symbologies as strings (they come
//! straight from a host application). Every string maps onto a closed enum
//! with an explicit fallback arm, so an unrecognized name is never an error:
//!
//! | Parameter  | Fallback  |
//! |------------|-----------|
//! | font size  | medium    |
//! | alignment  | left      |
//! | symbology  | CODE128   |
//!
//! The second half of this module encodes draw ops into the printer's
//! line-oriented label command language. Every command is ASCII, terminated
//! by CR LF; string operands are single-quoted.

use std::fmt;

use crate::draw::{BarcodeOp, Position, TextOp};
use crate::raster::Bitmap;

// ── Protocol codes ──────────────────────────────────────────────────────

/// Draw call accepted.
pub const DRAW_OK: i32 = 0;
/// End-of-transaction succeeded; the only success code for that call.
pub const END_TRANSACTION_OK: i32 = 3;

/// Draw rejected: operand contains a character the command cannot carry.
pub const ERR_INVALID_CHARACTER: i32 = 1;
/// Draw rejected: operand length is invalid for the symbology.
pub const ERR_INVALID_LENGTH: i32 = 2;
/// Draw rejected: a zero width, height, or bar size.
pub const ERR_ZERO_DIMENSION: i32 = 4;
/// Draw rejected: the raster source could not be rendered.
pub const ERR_RASTER: i32 = 5;
/// Draw or end called outside a transaction.
pub const ERR_NO_TRANSACTION: i32 = 6;
/// The transaction buffer exceeded its size limit.
pub const ERR_BUFFER_OVERFLOW: i32 = 7;
/// Flushing the transaction buffer to the printer failed.
pub const ERR_WRITE_FAILED: i32 = 8;

// ── FontSize ────────────────────────────────────────────────────────────

/// Device font size.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum FontSize {
    /// 8 pt device font.
    Small,
    /// 12 pt device font (`"normal"` and `"medium"`).
    Medium,
    /// 20 pt device font.
    Large,
    /// 30 pt device font.
    XLarge,
}

impl FontSize {
    /// Map a host-supplied name (case-insensitive). Unknown names → `Medium`.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "small" => FontSize::Small,
            "normal" | "medium" => FontSize::Medium,
            "large" => FontSize::Large,
            "xlarge" => FontSize::XLarge,
            _ => FontSize::Medium,
        }
    }

    /// Protocol code: the ASCII font selector the printer expects.
    pub fn code(self) -> u8 {
        match self {
            FontSize::Small => b'1',
            FontSize::Medium => b'3',
            FontSize::Large => b'5',
            FontSize::XLarge => b'6',
        }
    }
}

impl fmt::Display for FontSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FontSize::Small => write!(f, "small"),
            FontSize::Medium => write!(f, "medium"),
            FontSize::Large => write!(f, "large"),
            FontSize::XLarge => write!(f, "xlarge"),
        }
    }
}

// ── Alignment ───────────────────────────────────────────────────────────

/// Horizontal text alignment.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Alignment {
    /// Left aligned.
    Left,
    /// Centered.
    Center,
    /// Right aligned.
    Right,
}

impl Alignment {
    /// Map a host-supplied name (case-insensitive). Unknown names → `Left`.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "left" => Alignment::Left,
            "center" => Alignment::Center,
            "right" => Alignment::Right,
            _ => Alignment::Left,
        }
    }

    /// Protocol code.
    pub fn code(self) -> u8 {
        match self {
            Alignment::Left => b'L',
            Alignment::Center => b'C',
            Alignment::Right => b'R',
        }
    }
}

impl fmt::Display for Alignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Alignment::Left => write!(f, "left"),
            Alignment::Center => write!(f, "center"),
            Alignment::Right => write!(f, "right"),
        }
    }
}

// ── Symbology ───────────────────────────────────────────────────────────

/// 1D barcode symbology.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum Symbology {
    /// Code 39.
    Code39,
    /// Code 128.
    Code128,
    /// Interleaved 2 of 5 (`"ITF"`).
    Itf,
    /// Codabar.
    Codabar,
    /// Code 93.
    Code93,
    /// UPC-A.
    UpcA,
    /// UPC-E.
    UpcE,
    /// EAN-13.
    Ean13,
    /// EAN-8.
    Ean8,
}

impl Symbology {
    /// Map a host-supplied name (case-insensitive). Unknown names → `Code128`.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_uppercase().as_str() {
            "CODE39" => Symbology::Code39,
            "CODE93" => Symbology::Code93,
            "CODE128" => Symbology::Code128,
            "CODABAR" => Symbology::Codabar,
            "ITF" => Symbology::Itf,
            "UPC_A" => Symbology::UpcA,
            "UPC_E" => Symbology::UpcE,
            "EAN13" => Symbology::Ean13,
            "EAN8" => Symbology::Ean8,
            _ => Symbology::Code128,
        }
    }

    /// Protocol code for the barcode command's type operand.
    pub fn code(self) -> u8 {
        match self {
            Symbology::Code39 => 0,
            Symbology::Code128 => 1,
            Symbology::Itf => 2,
            Symbology::Codabar => 3,
            Symbology::Code93 => 4,
            Symbology::UpcA => 5,
            Symbology::UpcE => 6,
            Symbology::Ean13 => 7,
            Symbology::Ean8 => 8,
        }
    }

    /// Check `data` against the symbology's character set and length rules.
    fn check(self, data: &str) -> Result<(), EncodeError> {
        let digits_only = || data.bytes().all(|b| b.is_ascii_digit());
        let ok_chars = match self {
            Symbology::Code39 => data
                .bytes()
                .all(|b| b.is_ascii_digit() || b.is_ascii_uppercase() || b" -.$/+%".contains(&b)),
            Symbology::Code93 | Symbology::Code128 => data.bytes().all(|b| (0x20..0x7f).contains(&b)),
            Symbology::Codabar => data
                .bytes()
                .all(|b| b.is_ascii_digit() || b"-$:/.+ABCD".contains(&b)),
            Symbology::Itf
            | Symbology::UpcA
            | Symbology::UpcE
            | Symbology::Ean13
            | Symbology::Ean8 => digits_only(),
        };
        if !ok_chars {
            return Err(EncodeError::InvalidCharacter);
        }

        let len = data.len();
        let ok_len = match self {
            Symbology::Itf => len % 2 == 0,
            Symbology::UpcA => matches!(len, 11 | 12),
            Symbology::UpcE => (6..=8).contains(&len),
            Symbology::Ean13 => matches!(len, 12 | 13),
            Symbology::Ean8 => matches!(len, 7 | 8),
            _ => true,
        };
        if !ok_len {
            return Err(EncodeError::InvalidLength {
                symbology: self,
                len,
            });
        }
        Ok(())
    }
}

impl fmt::Display for Symbology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Symbology::Code39 => "CODE39",
            Symbology::Code128 => "CODE128",
            Symbology::Itf => "ITF",
            Symbology::Codabar => "CODABAR",
            Symbology::Code93 => "CODE93",
            Symbology::UpcA => "UPC_A",
            Symbology::UpcE => "UPC_E",
            Symbology::Ean13 => "EAN13",
            Symbology::Ean8 => "EAN8",
        };
        f.write_str(name)
    }
}

/// Human-readable interpretation placement for barcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HriPosition {
    /// No human-readable line.
    NotPrinted,
    /// Printed below the bars.
    Below,
}

impl HriPosition {
    /// Placement for the host's boolean flag.
    pub fn from_flag(flag: bool) -> Self {
        if flag {
            HriPosition::Below
        } else {
            HriPosition::NotPrinted
        }
    }

    /// Protocol code.
    pub fn code(self) -> u8 {
        match self {
            HriPosition::NotPrinted => 0,
            HriPosition::Below => 1,
        }
    }
}

// ── Encoding ────────────────────────────────────────────────────────────

/// Why a draw op could not be encoded. Each maps to a draw protocol code.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    /// A control character (CR, LF, NUL, ...) in a string operand.
    #[error("operand contains a control character")]
    InvalidCharacter,
    /// Data length is not valid for the symbology.
    #[error("{len} characters is not a valid {symbology} length")]
    InvalidLength {
        /// Symbology being encoded.
        symbology: Symbology,
        /// Offending length.
        len: usize,
    },
    /// A bar size or bitmap dimension of zero.
    #[error("zero dimension")]
    ZeroDimension,
}

impl EncodeError {
    /// Draw protocol code reported for this failure.
    pub fn code(&self) -> i32 {
        match self {
            EncodeError::InvalidCharacter => ERR_INVALID_CHARACTER,
            EncodeError::InvalidLength { .. } => ERR_INVALID_LENGTH,
            EncodeError::ZeroDimension => ERR_ZERO_DIMENSION,
        }
    }
}

const CRLF: &[u8] = b"\r\n";

/// Discard any composed-but-unprinted label in the printer's image buffer.
pub const CLEAR_BUFFER: &[u8] = b"CB\r\n";
/// Ask the printer for its model identifier (one CR/LF-terminated line).
pub const IDENTIFY: &[u8] = b"~S,MODEL\r\n";
/// Basic status request: answered with [`STATUS_LEN`] bytes.
pub const STATUS_REQUEST: &[u8] = b"~S,CHECK\r\n";
/// Extended status request: answered with [`EXTENDED_STATUS_LEN`] bytes.
pub const EXTENDED_STATUS_REQUEST: &[u8] = b"~S,STATUS\r\n";
/// Response length of [`STATUS_REQUEST`].
pub const STATUS_LEN: usize = 1;
/// Response length of [`EXTENDED_STATUS_REQUEST`].
pub const EXTENDED_STATUS_LEN: usize = 4;

/// Status request command and expected response length.
pub fn status_request(extended: bool) -> (&'static [u8], usize) {
    if extended {
        (EXTENDED_STATUS_REQUEST, EXTENDED_STATUS_LEN)
    } else {
        (STATUS_REQUEST, STATUS_LEN)
    }
}

/// Physical print command: `copies` of each of `sets` label sets.
pub fn print_command(copies: u32, sets: u32) -> Vec<u8> {
    format!("P{copies},{sets}\r\n").into_bytes()
}

/// Quote a string operand, escaping `'` and `\`.
fn quote(s: &str) -> Result<String, EncodeError> {
    if s.chars().any(char::is_control) {
        return Err(EncodeError::InvalidCharacter);
    }
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        if c == '\'' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('\'');
    Ok(out)
}

/// Encode a text op:
/// `T x,y,font,hmul,vmul,rspace,rotation,reverse,bold,align,'data'`.
pub fn encode_text(op: &TextOp) -> Result<Vec<u8>, EncodeError> {
    let Position { x, y } = op.position;
    let bold = if op.bold { 'B' } else { 'N' };
    let cmd = format!(
        "T{x},{y},{font},1,1,0,0,N,{bold},{align},{data}",
        font = op.font.code() as char,
        align = op.align.code() as char,
        data = quote(&op.content)?,
    );
    let mut out = cmd.into_bytes();
    out.extend_from_slice(CRLF);
    Ok(out)
}

/// Encode a barcode op:
/// `B1x,y,type,narrow,wide,height,rotation,hri,quiet,'data'`.
pub fn encode_barcode(op: &BarcodeOp) -> Result<Vec<u8>, EncodeError> {
    if op.dims.narrow == 0 || op.dims.height == 0 {
        return Err(EncodeError::ZeroDimension);
    }
    op.symbology.check(&op.data)?;

    let Position { x, y } = op.position;
    let cmd = format!(
        "B1{x},{y},{sym},{narrow},{wide},{height},0,{hri},0,{data}",
        sym = op.symbology.code(),
        narrow = op.dims.narrow,
        wide = op.dims.wide(),
        height = op.dims.height,
        hri = HriPosition::from_flag(op.human_readable).code(),
        data = quote(&op.data)?,
    );
    let mut out = cmd.into_bytes();
    out.extend_from_slice(CRLF);
    Ok(out)
}

/// Encode a 1-bit bitmap.
///
/// Uncompressed: `GWx,y,bytes_per_row,height,` followed by the packed rows.
/// Compressed: `GCx,y,bytes_per_row,height,len,` followed by `len` bytes of
/// run-length data (see [`rle_compress`]).
pub fn encode_bitmap(
    bitmap: &Bitmap,
    position: Position,
    compress: bool,
) -> Result<Vec<u8>, EncodeError> {
    if bitmap.width() == 0 || bitmap.height() == 0 {
        return Err(EncodeError::ZeroDimension);
    }

    let Position { x, y } = position;
    let row_bytes = bitmap.row_bytes();
    let height = bitmap.height();

    let mut out = if compress {
        let packed = rle_compress(bitmap.data());
        let mut out = format!("GC{x},{y},{row_bytes},{height},{},", packed.len()).into_bytes();
        out.extend_from_slice(&packed);
        out
    } else {
        let mut out = format!("GW{x},{y},{row_bytes},{height},").into_bytes();
        out.extend_from_slice(bitmap.data());
        out
    };
    out.extend_from_slice(CRLF);
    Ok(out)
}

/// Run-length encode as `(count, value)` pairs with `count` in `1..=255`.
pub fn rle_compress(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() / 4 + 2);
    let mut iter = data.iter().copied().peekable();
    while let Some(value) = iter.next() {
        let mut count: u8 = 1;
        while count < u8::MAX && iter.peek() == Some(&value) {
            iter.next();
            count += 1;
        }
        out.push(count);
        out.push(value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw::BarcodeDims;

    #[test]
    fn font_size_names_and_fallback() {
        assert_eq!(FontSize::from_name("small"), FontSize::Small);
        assert_eq!(FontSize::from_name("normal"), FontSize::Medium);
        assert_eq!(FontSize::from_name("MEDIUM"), FontSize::Medium);
        assert_eq!(FontSize::from_name("Large"), FontSize::Large);
        assert_eq!(FontSize::from_name("xlarge"), FontSize::XLarge);
        assert_eq!(FontSize::from_name("gigantic"), FontSize::Medium);
        assert_eq!(FontSize::from_name(""), FontSize::Medium);
        assert_eq!(FontSize::from_name("huge").code(), FontSize::Medium.code());
    }

    #[test]
    fn alignment_names_and_fallback() {
        assert_eq!(Alignment::from_name("left"), Alignment::Left);
        assert_eq!(Alignment::from_name("Center"), Alignment::Center);
        assert_eq!(Alignment::from_name("RIGHT"), Alignment::Right);
        assert_eq!(Alignment::from_name("justify"), Alignment::Left);
        assert_eq!(Alignment::from_name("middle").code(), b'L');
    }

    #[test]
    fn symbology_names_and_fallback() {
        let cases = [
            ("CODE39", Symbology::Code39, 0),
            ("code128", Symbology::Code128, 1),
            ("ITF", Symbology::Itf, 2),
            ("CODABAR", Symbology::Codabar, 3),
            ("CODE93", Symbology::Code93, 4),
            ("UPC_A", Symbology::UpcA, 5),
            ("upc_e", Symbology::UpcE, 6),
            ("EAN13", Symbology::Ean13, 7),
            ("EAN8", Symbology::Ean8, 8),
        ];
        for (name, sym, code) in cases {
            assert_eq!(Symbology::from_name(name), sym, "{name}");
            assert_eq!(sym.code(), code, "{name}");
            assert_eq!(Symbology::from_name(&sym.to_string()), sym);
        }
        assert_eq!(Symbology::from_name("QR"), Symbology::Code128);
        assert_eq!(Symbology::from_name("PDF417").code(), 1);
    }

    #[test]
    fn encode_text_command() {
        let mut op = TextOp::new("Hello");
        op.position = Position::new(10, 20);
        op.bold = true;
        op.align = Alignment::Center;
        let bytes = encode_text(&op).unwrap();
        assert_eq!(bytes, b"T10,20,3,1,1,0,0,N,B,C,'Hello'\r\n");
    }

    #[test]
    fn encode_text_escapes_quotes() {
        let bytes = encode_text(&TextOp::new(r"it's a\b")).unwrap();
        assert_eq!(bytes, b"T0,0,3,1,1,0,0,N,N,L,'it\\'s a\\\\b'\r\n".to_vec());
    }

    #[test]
    fn encode_text_rejects_control_characters() {
        let err = encode_text(&TextOp::new("line1\nline2")).unwrap_err();
        assert_eq!(err, EncodeError::InvalidCharacter);
        assert_eq!(err.code(), ERR_INVALID_CHARACTER);
    }

    #[test]
    fn encode_barcode_command() {
        let mut op = BarcodeOp::new("ABC-123");
        op.position = Position::new(5, 6);
        op.human_readable = true;
        let bytes = encode_barcode(&op).unwrap();
        assert_eq!(bytes, b"B15,6,1,2,4,100,0,1,0,'ABC-123'\r\n");
    }

    #[test]
    fn encode_barcode_validates_symbology() {
        let mut op = BarcodeOp::new("12345");
        op.symbology = Symbology::Ean13;
        assert!(matches!(
            encode_barcode(&op),
            Err(EncodeError::InvalidLength { len: 5, .. })
        ));

        op.data = "400638133393".into();
        assert!(encode_barcode(&op).is_ok());

        op.data = "40063813339X".into();
        assert_eq!(encode_barcode(&op), Err(EncodeError::InvalidCharacter));

        let mut op = BarcodeOp::new("123");
        op.symbology = Symbology::Itf;
        assert_eq!(encode_barcode(&op).unwrap_err().code(), ERR_INVALID_LENGTH);

        let mut op = BarcodeOp::new("lower");
        op.symbology = Symbology::Code39;
        assert_eq!(encode_barcode(&op), Err(EncodeError::InvalidCharacter));
    }

    #[test]
    fn encode_barcode_rejects_zero_dims() {
        let mut op = BarcodeOp::new("123");
        op.dims = BarcodeDims {
            narrow: 0,
            height: 100,
        };
        assert_eq!(encode_barcode(&op), Err(EncodeError::ZeroDimension));
    }

    #[test]
    fn encode_bitmap_plain_and_compressed() {
        let bitmap = Bitmap::from_packed(16, 2, vec![0xFF, 0xFF, 0x00, 0x00]).unwrap();

        let plain = encode_bitmap(&bitmap, Position::new(1, 2), false).unwrap();
        let mut expected = b"GW1,2,2,2,".to_vec();
        expected.extend_from_slice(&[0xFF, 0xFF, 0x00, 0x00]);
        expected.extend_from_slice(b"\r\n");
        assert_eq!(plain, expected);

        let packed = encode_bitmap(&bitmap, Position::new(1, 2), true).unwrap();
        let mut expected = b"GC1,2,2,2,4,".to_vec();
        expected.extend_from_slice(&[2, 0xFF, 2, 0x00]);
        expected.extend_from_slice(b"\r\n");
        assert_eq!(packed, expected);
    }

    #[test]
    fn rle_splits_long_runs() {
        let data = vec![0u8; 300];
        assert_eq!(rle_compress(&data), vec![255, 0, 45, 0]);
        assert!(rle_compress(&[]).is_empty());
        assert_eq!(rle_compress(&[1, 2, 2]), vec![1, 1, 2, 2]);
    }

    #[test]
    fn print_and_status_commands() {
        assert_eq!(print_command(1, 1), b"P1,1\r\n");
        assert_eq!(status_request(false), (STATUS_REQUEST, 1));
        assert_eq!(status_request(true), (EXTENDED_STATUS_REQUEST, 4));
    }
}
