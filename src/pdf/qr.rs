//! License QR code generation
//!
//! Scanners parse the payload string, so its field order, delimiters and
//! separators must not change.

use std::io::Cursor;
use std::path::Path;
use image::{GrayImage, ImageFormat, Luma};
use qrcode::{Color, EcLevel, QrCode};
use crate::error::{Error, Result};

/// Target image width in pixels, quiet zone included
pub const QR_PIXEL_WIDTH: u32 = 100;

/// Quiet zone around the symbol, in modules
pub const QR_MARGIN_MODULES: usize = 1;

const DARK: Luma<u8> = Luma([0x00]);
const LIGHT: Luma<u8> = Luma([0xFF]);

/// Build the license payload text
///
/// `license:<id>;order:<order>;qty:<quantity>`
pub fn qr_payload(license_id: &str, order_number: &str, licensed_quantity: u32) -> String {
    format!(
        "license:{};order:{};qty:{}",
        license_id, order_number, licensed_quantity
    )
}

/// A rendered license QR code
///
/// Square, 8-bit grayscale, only pure black and pure white pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct QrImage {
    image: GrayImage,
}

impl QrImage {
    /// Side length in pixels
    pub fn size(&self) -> u32 {
        self.image.width()
    }

    /// Row-major pixel bytes, one byte per pixel
    pub fn pixels(&self) -> &[u8] {
        self.image.as_raw()
    }

    /// Encode as PNG
    pub fn to_png(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
        Ok(bytes)
    }

    /// Write as a PNG file
    pub fn save_png(&self, path: &Path) -> Result<()> {
        self.image.save_with_format(path, ImageFormat::Png)?;
        Ok(())
    }
}

/// Render the license payload for these fields as a QR image
pub fn encode(license_id: &str, order_number: &str, licensed_quantity: u32) -> Result<QrImage> {
    let payload = qr_payload(license_id, order_number, licensed_quantity);
    render_payload(&payload)
}

/// Render arbitrary payload text as a QR image
pub fn render_payload(payload: &str) -> Result<QrImage> {
    let code = QrCode::with_error_correction_level(payload.as_bytes(), EcLevel::M)
        .map_err(|e| Error::Encoding(e.to_string()))?;

    let modules = code.width();
    let colors = code.to_colors();
    let total = modules + 2 * QR_MARGIN_MODULES;

    // One pixel per module at minimum when the symbol is larger than the target
    let size = (QR_PIXEL_WIDTH as usize).max(total);

    let image = GrayImage::from_fn(size as u32, size as u32, |px, py| {
        let mx = (px as usize * total / size).checked_sub(QR_MARGIN_MODULES);
        let my = (py as usize * total / size).checked_sub(QR_MARGIN_MODULES);
        match (mx, my) {
            (Some(x), Some(y)) if x < modules && y < modules => {
                if colors[y * modules + x] == Color::Dark {
                    DARK
                } else {
                    LIGHT
                }
            }
            _ => LIGHT,
        }
    });

    tracing::debug!(modules, size, payload_len = payload.len(), "rendered QR code");

    Ok(QrImage { image })
}
