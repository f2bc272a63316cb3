//! Draw operations: the values a print transaction puts on the label.
//!
//! Draw ops are constructed per call, consumed by one transaction, and never
//! retained.

use crate::codec::{Alignment, FontSize, Symbology};

/// Dot position on the label, origin top-left.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Position {
    /// Horizontal position in dots.
    pub x: u32,
    /// Vertical position in dots.
    pub y: u32,
}

impl Position {
    /// Create a position from dot coordinates.
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// A line of device-font text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextOp {
    /// Text to print.
    pub content: String,
    /// Where the text starts.
    pub position: Position,
    /// Device font size.
    pub font: FontSize,
    /// Horizontal alignment.
    pub align: Alignment,
    /// Emphasized (bold) text.
    pub bold: bool,
}

impl TextOp {
    /// Text at the origin in the medium font, left-aligned, not bold.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            position: Position::default(),
            font: FontSize::Medium,
            align: Alignment::Left,
            bold: false,
        }
    }
}

/// Bar dimensions of a 1D barcode, in dots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BarcodeDims {
    /// Narrow bar width. The wide bar is always twice this.
    pub narrow: u32,
    /// Bar height.
    pub height: u32,
}

impl BarcodeDims {
    /// Wide bar width (twice the narrow bar).
    pub fn wide(&self) -> u32 {
        self.narrow.saturating_mul(2)
    }
}

impl Default for BarcodeDims {
    fn default() -> Self {
        Self {
            narrow: 2,
            height: 100,
        }
    }
}

/// A 1D barcode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BarcodeOp {
    /// Encoded data.
    pub data: String,
    /// Barcode symbology.
    pub symbology: Symbology,
    /// Bar dimensions.
    pub dims: BarcodeDims,
    /// Where the barcode starts.
    pub position: Position,
    /// Print the human-readable interpretation below the bars.
    pub human_readable: bool,
}

impl BarcodeOp {
    /// CODE128 barcode at the origin, narrow bar 2 dots, height 100 dots,
    /// no human-readable line.
    pub fn new(data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            symbology: Symbology::Code128,
            dims: BarcodeDims::default(),
            position: Position::default(),
            human_readable: false,
        }
    }
}

/// One page of a raster source rendered as a bitmap. PDF sources need a
/// PDF-capable [`Rasterizer`](crate::Rasterizer) on the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterPageOp {
    /// Source document bytes.
    pub source: Vec<u8>,
    /// Where the bitmap starts.
    pub position: Position,
    /// 1-based page number.
    pub page: u32,
    /// Target width in dots; `0` keeps the source width.
    pub width: u32,
    /// Dither grayscale instead of thresholding.
    pub dither: bool,
    /// Run-length compress bitmap rows on the wire.
    pub compress: bool,
    /// Brightness level (0..=100), added before binarization.
    pub level: u32,
}

impl RasterPageOp {
    /// First page at the origin, native width, dithered, compressed, level 1.
    pub fn new(source: Vec<u8>) -> Self {
        Self {
            source,
            position: Position::default(),
            page: 1,
            width: 0,
            dither: true,
            compress: true,
            level: 1,
        }
    }
}

/// A single draw call inside a print transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawOp {
    /// Device-font text.
    Text(TextOp),
    /// 1D barcode.
    Barcode(BarcodeOp),
    /// Rendered raster page.
    RasterPage(RasterPageOp),
}

impl DrawOp {
    /// Short name used in logs and validation messages.
    pub fn kind(&self) -> &'static str {
        match self {
            DrawOp::Text(_) => "text",
            DrawOp::Barcode(_) => "barcode",
            DrawOp::RasterPage(_) => "raster page",
        }
    }

    /// Whether the op carries nothing to draw.
    pub fn payload_is_empty(&self) -> bool {
        match self {
            DrawOp::Text(op) => op.content.is_empty(),
            DrawOp::Barcode(op) => op.data.is_empty(),
            DrawOp::RasterPage(op) => op.source.is_empty(),
        }
    }
}

impl From<TextOp> for DrawOp {
    fn from(op: TextOp) -> Self {
        DrawOp::Text(op)
    }
}

impl From<BarcodeOp> for DrawOp {
    fn from(op: BarcodeOp) -> Self {
        DrawOp::Barcode(op)
    }
}

impl From<RasterPageOp> for DrawOp {
    fn from(op: RasterPageOp) -> Self {
        DrawOp::RasterPage(op)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_payloads_detected() {
        assert!(DrawOp::from(TextOp::new("")).payload_is_empty());
        assert!(DrawOp::from(BarcodeOp::new("")).payload_is_empty());
        assert!(DrawOp::from(RasterPageOp::new(Vec::new())).payload_is_empty());
        assert!(!DrawOp::from(TextOp::new("Hello")).payload_is_empty());
    }

    #[test]
    fn wide_bar_is_twice_narrow() {
        let dims = BarcodeDims {
            narrow: 3,
            height: 80,
        };
        assert_eq!(dims.wide(), 6);
    }

    #[test]
    fn raster_defaults() {
        let op = RasterPageOp::new(vec![1, 2, 3]);
        assert_eq!(op.page, 1);
        assert_eq!(op.width, 0);
        assert!(op.dither);
        assert!(op.compress);
        assert_eq!(op.level, 1);
    }
}
