//! QR code encoder

use crate::error::{Error, Result};
use image::{Rgba, RgbaImage};
use qrcode::{Color, EcLevel, QrCode};

/// How a single dark module is painted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleShape {
    /// Filled square covering the whole module
    Square,
    /// Anti-aliased dot inscribed in the module
    Circle,
}

/// QR code encoder
#[derive(Debug, Clone)]
pub struct QrEncoder {
    /// Error correction level
    ecc_level: EcLevel,
    shape: ModuleShape,
    foreground: Rgba<u8>,
    background: Rgba<u8>,
    /// Quiet zone width in modules
    border: u32,
    /// Edge length of one module in pixels
    module_px: u32,
}

impl QrEncoder {
    /// Create a new encoder: high ECC, square black modules on white, 4-module border.
    pub fn new() -> Self {
        Self {
            ecc_level: EcLevel::H,
            shape: ModuleShape::Square,
            foreground: Rgba([0, 0, 0, 255]),
            background: Rgba([255, 255, 255, 255]),
            border: 4,
            module_px: 10,
        }
    }

    /// Paint modules with the given shape
    pub fn with_shape(mut self, shape: ModuleShape) -> Self {
        self.shape = shape;
        self
    }

    /// Set module and background colours (RGB)
    pub fn with_colors(mut self, foreground: [u8; 3], background: [u8; 3]) -> Self {
        let [r, g, b] = foreground;
        self.foreground = Rgba([r, g, b, 255]);
        let [r, g, b] = background;
        self.background = Rgba([r, g, b, 255]);
        self
    }

    /// Set the quiet zone width in modules
    pub fn with_border(mut self, border: u32) -> Self {
        self.border = border;
        self
    }

    /// Set the pixel size of one module (minimum 1)
    pub fn with_module_size(mut self, module_px: u32) -> Self {
        self.module_px = module_px.max(1);
        self
    }

    /// Number of modules across the rendered image, quiet zone included.
    ///
    /// The smallest QR version that fits `data` is used.
    pub fn modules_across(&self, data: &[u8]) -> Result<u32> {
        let code = self.code(data)?;
        Ok(code.width() as u32 + 2 * self.border)
    }

    /// Encode a string into a QR code image
    pub fn encode_string(&self, data: &str) -> Result<RgbaImage> {
        self.encode_bytes(data.as_bytes())
    }

    /// Encode bytes into a QR code image
    pub fn encode_bytes(&self, data: &[u8]) -> Result<RgbaImage> {
        let code = self.code(data)?;
        let width = code.width() as u32;
        let side = (width + 2 * self.border) * self.module_px;
        let mut image = RgbaImage::from_pixel(side, side, self.background);

        for (index, color) in code.to_colors().into_iter().enumerate() {
            if color != Color::Dark {
                continue;
            }
            let x = (index as u32 % width + self.border) * self.module_px;
            let y = (index as u32 / width + self.border) * self.module_px;
            self.paint_module(&mut image, x, y);
        }

        tracing::debug!(
            version = ?code.version(),
            modules = width,
            pixels = side,
            "Rendered QR code"
        );

        Ok(image)
    }

    fn code(&self, data: &[u8]) -> Result<QrCode> {
        QrCode::with_error_correction_level(data, self.ecc_level)
            .map_err(|e| Error::QrEncode(format!("Failed to create QR code: {}", e)))
    }

    fn paint_module(&self, image: &mut RgbaImage, x0: u32, y0: u32) {
        let size = self.module_px;
        match self.shape {
            ModuleShape::Square => {
                for dy in 0..size {
                    for dx in 0..size {
                        image.put_pixel(x0 + dx, y0 + dy, self.foreground);
                    }
                }
            }
            ModuleShape::Circle => {
                let radius = size as f32 / 2.0;
                for dy in 0..size {
                    for dx in 0..size {
                        let coverage = circle_coverage(dx, dy, radius);
                        if coverage > 0.0 {
                            let pixel = blend(self.background, self.foreground, coverage);
                            image.put_pixel(x0 + dx, y0 + dy, pixel);
                        }
                    }
                }
            }
        }
    }
}

impl Default for QrEncoder {
    fn default() -> Self {
        Self::new()
    }
}

const SUBSAMPLES: u32 = 4;

/// Fraction of pixel (dx, dy) inside a circle of `radius` centred in the module.
fn circle_coverage(dx: u32, dy: u32, radius: f32) -> f32 {
    let cx = dx as f32 + 0.5 - radius;
    let cy = dy as f32 + 0.5 - radius;
    let distance = (cx * cx + cy * cy).sqrt();
    if distance <= radius - 1.0 {
        return 1.0;
    }
    if distance >= radius + 1.0 {
        return 0.0;
    }

    let step = 1.0 / SUBSAMPLES as f32;
    let mut inside = 0;
    for sy in 0..SUBSAMPLES {
        for sx in 0..SUBSAMPLES {
            let px = dx as f32 + (sx as f32 + 0.5) * step - radius;
            let py = dy as f32 + (sy as f32 + 0.5) * step - radius;
            if px * px + py * py <= radius * radius {
                inside += 1;
            }
        }
    }
    inside as f32 / (SUBSAMPLES * SUBSAMPLES) as f32
}

fn blend(under: Rgba<u8>, over: Rgba<u8>, amount: f32) -> Rgba<u8> {
    let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * amount).round() as u8;
    Rgba([
        mix(under[0], over[0]),
        mix(under[1], over[1]),
        mix(under[2], over[2]),
        255,
    ])
}
