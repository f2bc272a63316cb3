//! Raster pages: source document bytes → 1-bit printer bitmap.
//!
//! The transaction layer only sees the [`Rasterizer`] trait. The bundled
//! [`ImageRasterizer`] (feature `raster`) handles bitmap image formats; PDF
//! rendering needs a renderer-backed implementation plugged in by the host.

use crate::SessionError;
use crate::draw::RasterPageOp;

/// Packed 1-bit bitmap, MSB = leftmost dot, 1 = black.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Bitmap {
    /// An all-white bitmap.
    pub fn blank(width: u32, height: u32) -> Self {
        let row_bytes = width.div_ceil(8) as usize;
        Self {
            width,
            height,
            data: vec![0; row_bytes * height as usize],
        }
    }

    /// Wrap already packed rows. `data` must hold exactly
    /// `ceil(width / 8) * height` bytes.
    pub fn from_packed(width: u32, height: u32, data: Vec<u8>) -> Result<Self, SessionError> {
        let expected = width.div_ceil(8) as usize * height as usize;
        if data.len() != expected {
            return Err(SessionError::RasterSource(format!(
                "packed bitmap is {} bytes, expected {expected} for {width}x{height}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Width in dots.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in dots.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bytes per packed row.
    pub fn row_bytes(&self) -> usize {
        self.width.div_ceil(8) as usize
    }

    /// Packed rows, top to bottom.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mark the dot at (`x`, `y`) black. Out-of-range dots are ignored.
    pub fn set(&mut self, x: u32, y: u32) {
        if x >= self.width || y >= self.height {
            return;
        }
        let idx = y as usize * self.row_bytes() + (x / 8) as usize;
        self.data[idx] |= 0x80 >> (x % 8);
    }

    /// Whether the dot at (`x`, `y`) is black.
    pub fn get(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        let idx = y as usize * self.row_bytes() + (x / 8) as usize;
        self.data[idx] & (0x80 >> (x % 8)) != 0
    }
}

/// Turns a raster page op into a bitmap.
///
/// Failures (unreadable source, page out of range) are reported as
/// [`SessionError::RasterSource`].
pub trait Rasterizer: Send + Sync {
    /// Render `op.page` of `op.source` at `op.width` dots.
    fn rasterize(&self, op: &RasterPageOp) -> Result<Bitmap, SessionError>;
}

/// 8x8 Bayer threshold matrix (values 0..64).
const BAYER_8X8: [[u8; 8]; 8] = [
    [0, 32, 8, 40, 2, 34, 10, 42],
    [48, 16, 56, 24, 50, 18, 58, 26],
    [12, 44, 4, 36, 14, 46, 6, 38],
    [60, 28, 52, 20, 62, 30, 54, 22],
    [3, 35, 11, 43, 1, 33, 9, 41],
    [51, 19, 59, 27, 49, 17, 57, 25],
    [15, 47, 7, 39, 13, 45, 5, 37],
    [63, 31, 55, 23, 61, 29, 53, 21],
];

/// Whether a dot with `darkness` in `[0, 1]` prints black.
fn should_print(x: u32, y: u32, darkness: f32, dither: bool) -> bool {
    if dither {
        let threshold = (BAYER_8X8[(y % 8) as usize][(x % 8) as usize] as f32 + 0.5) / 64.0;
        darkness > threshold
    } else {
        darkness > 0.5
    }
}

/// Darkness of a luma value after applying the brightness `level` (percent).
fn darkness(luma: u8, level: u32) -> f32 {
    let lightness = luma as f32 / 255.0 + level.min(100) as f32 / 100.0;
    1.0 - lightness.min(1.0)
}

/// Binarize a grayscale buffer (`width * height` luma values, row-major).
pub fn binarize(luma: &[u8], width: u32, height: u32, dither: bool, level: u32) -> Bitmap {
    let mut bitmap = Bitmap::blank(width, height);
    for y in 0..height {
        for x in 0..width {
            let idx = y as usize * width as usize + x as usize;
            let Some(&value) = luma.get(idx) else {
                return bitmap;
            };
            if should_print(x, y, darkness(value, level), dither) {
                bitmap.set(x, y);
            }
        }
    }
    bitmap
}

#[cfg(feature = "raster")]
pub use image_rasterizer::ImageRasterizer;

#[cfg(feature = "raster")]
mod image_rasterizer {
    use image::imageops::FilterType;
    use tracing::debug;

    use super::{Bitmap, Rasterizer, binarize};
    use crate::SessionError;
    use crate::draw::RasterPageOp;

    /// Rasterizer for single-page bitmap formats (PNG, JPEG, BMP, ...).
    #[derive(Debug, Clone, Copy, Default)]
    pub struct ImageRasterizer;

    impl Rasterizer for ImageRasterizer {
        fn rasterize(&self, op: &RasterPageOp) -> Result<Bitmap, SessionError> {
            if op.page != 1 {
                return Err(SessionError::RasterSource(format!(
                    "page {} out of range (image sources have 1 page)",
                    op.page
                )));
            }

            let img = image::load_from_memory(&op.source)
                .map_err(|e| SessionError::RasterSource(e.to_string()))?;

            let img = if op.width > 0 && op.width != img.width() && img.width() > 0 {
                let height = (u64::from(img.height()) * u64::from(op.width)
                    / u64::from(img.width()))
                .max(1);
                let height = u32::try_from(height).map_err(|_| {
                    SessionError::RasterSource(format!("scaled height {height} too large"))
                })?;
                img.resize_exact(op.width, height, FilterType::Triangle)
            } else {
                img
            };

            let gray = img.to_luma_alpha8();
            let (width, height) = gray.dimensions();
            debug!(width, height, dither = op.dither, "rasterizing image page");

            // Composite onto white paper so transparent regions stay blank.
            let luma: Vec<u8> = gray
                .pixels()
                .map(|p| {
                    let [l, a] = p.0;
                    let l = u32::from(l);
                    let a = u32::from(a);
                    ((l * a + 255 * (255 - a)) / 255) as u8
                })
                .collect();

            Ok(binarize(&luma, width, height, op.dither, op.level))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_get_pack_msb_first() {
        let mut bitmap = Bitmap::blank(10, 2);
        assert_eq!(bitmap.row_bytes(), 2);
        bitmap.set(0, 0);
        bitmap.set(9, 1);
        bitmap.set(50, 50);
        assert_eq!(bitmap.data(), &[0x80, 0x00, 0x00, 0x40]);
        assert!(bitmap.get(0, 0));
        assert!(bitmap.get(9, 1));
        assert!(!bitmap.get(1, 0));
    }

    #[test]
    fn from_packed_checks_length() {
        assert!(Bitmap::from_packed(8, 2, vec![0, 0]).is_ok());
        assert!(matches!(
            Bitmap::from_packed(8, 2, vec![0]),
            Err(SessionError::RasterSource(_))
        ));
    }

    #[test]
    fn threshold_binarization() {
        let luma = [0u8, 255, 100, 200];
        let bitmap = binarize(&luma, 4, 1, false, 0);
        assert!(bitmap.get(0, 0));
        assert!(!bitmap.get(1, 0));
        assert!(bitmap.get(2, 0));
        assert!(!bitmap.get(3, 0));
    }

    #[test]
    fn level_lightens_output() {
        let luma = [100u8; 4];
        assert!(binarize(&luma, 4, 1, false, 0).get(0, 0));
        let lighter = binarize(&luma, 4, 1, false, 50);
        assert!((0..4).all(|x| !lighter.get(x, 0)));
    }

    #[test]
    fn dithering_produces_mixed_pattern_for_mid_gray() {
        let luma = vec![128u8; 64];
        let bitmap = binarize(&luma, 8, 8, true, 0);
        let black = (0..8)
            .flat_map(|y| (0..8).map(move |x| (x, y)))
            .filter(|&(x, y)| bitmap.get(x, y))
            .count();
        assert!(black > 16 && black < 48, "black dots: {black}");
    }

    #[cfg(feature = "raster")]
    #[test]
    fn image_rasterizer_rejects_unreadable_source() {
        let op = RasterPageOp::new(b"%PDF-1.7 not an image".to_vec());
        match ImageRasterizer.rasterize(&op).unwrap_err() {
            SessionError::RasterSource(_) => {}
            other => panic!("expected RasterSource, got {other:?}"),
        }
    }

    #[cfg(feature = "raster")]
    #[test]
    fn image_rasterizer_scales_to_width() {
        use std::io::Cursor;

        let img = image::GrayImage::from_pixel(4, 2, image::Luma([0u8]));
        let mut png = Vec::new();
        image::DynamicImage::ImageLuma8(img)
            .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();

        let mut op = RasterPageOp::new(png);
        op.width = 8;
        op.dither = false;
        op.level = 0;
        let bitmap = ImageRasterizer.rasterize(&op).unwrap();
        assert_eq!(bitmap.width(), 8);
        assert_eq!(bitmap.height(), 4);
        assert!(bitmap.get(7, 3));

        op.page = 2;
        assert!(ImageRasterizer.rasterize(&op).is_err());
    }
}
