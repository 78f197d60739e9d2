//! Print styles layered over the raw encoder

use super::{ModuleShape, QrEncoder, QrStyle, cm_to_px};
use crate::error::{Error, Result};
use image::codecs::jpeg::{JpegEncoder, PixelDensity};
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use std::fs::File;
use std::io::{BufWriter, Cursor, Write};
use std::path::Path;

const BORDER: u32 = 4;
const BOX_SIZE: u32 = 25;
const SCALE_FACTOR: u32 = 4;
const JPEG_QUALITY: u8 = 95;
/// Channel value above which a logo pixel counts as background white
const WHITE_THRESHOLD: u8 = 240;

/// Renders and saves QR codes in one of the named [`QrStyle`]s
#[derive(Debug, Clone)]
pub struct QrStyler {
    style: QrStyle,
    logo: Option<RgbaImage>,
    dpi: u16,
}

impl QrStyler {
    /// Create a styler, loading `logo` when the style needs one.
    ///
    /// Fails when the style expects a logo and the file is missing or unreadable.
    pub fn new(style: QrStyle, logo: Option<&Path>, dpi: u16) -> Result<Self> {
        let logo = if style.uses_logo() {
            let path = logo.ok_or_else(|| {
                Error::Config(format!("QR style '{style}' needs a logo path"))
            })?;
            if !path.exists() {
                return Err(Error::Input(format!(
                    "Logo file not found at {}",
                    path.display()
                )));
            }
            Some(image::open(path)?.to_rgba8())
        } else {
            None
        };

        Ok(Self { style, logo, dpi })
    }

    /// Styler that never stamps a logo, whatever the style.
    pub fn without_logo(style: QrStyle, dpi: u16) -> Self {
        Self {
            style,
            logo: None,
            dpi,
        }
    }

    /// Render `content` as a finished image.
    pub fn render(&self, content: &str) -> Result<DynamicImage> {
        match self.style {
            QrStyle::Simple => self.render_simple(content),
            QrStyle::Jignasa => {
                let base = self.render_branded(content, [131, 174, 69], [254, 252, 222])?;
                Ok(DynamicImage::ImageRgba8(base))
            }
            QrStyle::Vishwanath => {
                let base = self.render_branded(content, [212, 223, 73], [37, 89, 46])?;
                let side = cm_to_px(2.0, self.dpi);
                let resized = imageops::resize(&base, side, side, FilterType::Lanczos3);
                Ok(DynamicImage::ImageRgba8(resized))
            }
        }
    }

    /// Render `content` and encode it as PNG bytes for embedding.
    pub fn render_png(&self, content: &str) -> Result<Vec<u8>> {
        let image = self.render(content)?;
        let mut buf = Vec::new();
        image.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
        Ok(buf)
    }

    /// Save an image rendered by this styler in the style's file format.
    ///
    /// JPEG output carries the configured DPI in its density header.
    pub fn save(&self, image: &DynamicImage, path: &Path) -> Result<()> {
        match self.style.extension() {
            "png" => image
                .save_with_format(path, ImageFormat::Png)
                .map_err(|e| Error::Write(format!("{}: {e}", path.display()))),
            _ => {
                let file = File::create(path)
                    .map_err(|e| Error::Write(format!("{}: {e}", path.display())))?;
                let mut writer = BufWriter::new(file);
                let mut encoder = JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY);
                encoder.set_pixel_density(PixelDensity::dpi(self.dpi));
                encoder
                    .encode_image(&image.to_rgb8())
                    .map_err(|e| Error::Write(format!("{}: {e}", path.display())))?;
                writer
                    .flush()
                    .map_err(|e| Error::Write(format!("{}: {e}", path.display())))
            }
        }
    }

    fn render_simple(&self, content: &str) -> Result<DynamicImage> {
        let target = cm_to_px(4.0, self.dpi);
        let probe = QrEncoder::new().with_border(BORDER);
        let modules = probe.modules_across(content.as_bytes())?;
        let box_size = (target / modules).max(1);

        let image = probe
            .with_shape(ModuleShape::Circle)
            .with_module_size(box_size)
            .encode_string(content)?;
        let mut rgb = DynamicImage::ImageRgba8(image).to_rgb8();
        if rgb.width() != target {
            rgb = imageops::resize(&rgb, target, target, FilterType::Nearest);
        }
        Ok(DynamicImage::ImageRgb8(rgb))
    }

    fn render_branded(
        &self,
        content: &str,
        foreground: [u8; 3],
        background: [u8; 3],
    ) -> Result<RgbaImage> {
        let mut base = QrEncoder::new()
            .with_border(BORDER)
            .with_shape(ModuleShape::Circle)
            .with_colors(foreground, background)
            .with_module_size(BOX_SIZE * SCALE_FACTOR)
            .encode_string(content)?;

        if let Some(logo) = &self.logo {
            stamp_logo(&mut base, logo);
        }
        Ok(base)
    }
}

/// Shrink `logo` to a fifth of the code's width, knock out its white
/// background and centre it on `base`.
fn stamp_logo(base: &mut RgbaImage, logo: &RgbaImage) {
    let max_side = (base.width() / 5).max(1);
    let mut logo = if logo.width() > max_side || logo.height() > max_side {
        DynamicImage::ImageRgba8(logo.clone())
            .resize(max_side, max_side, FilterType::Lanczos3)
            .to_rgba8()
    } else {
        logo.clone()
    };

    for pixel in logo.pixels_mut() {
        let Rgba([r, g, b, _]) = *pixel;
        if r > WHITE_THRESHOLD && g > WHITE_THRESHOLD && b > WHITE_THRESHOLD {
            *pixel = Rgba([255, 255, 255, 0]);
        }
    }

    let x = (base.width() - logo.width()) / 2;
    let y = (base.height() - logo.height()) / 2;
    imageops::overlay(base, &logo, i64::from(x), i64::from(y));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn red_logo(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("logo.png");
        let mut logo = RgbaImage::from_pixel(40, 20, Rgba([200, 0, 0, 255]));
        // White border that must be knocked out.
        for x in 0..40 {
            logo.put_pixel(x, 0, Rgba([255, 255, 255, 255]));
        }
        logo.save(&path).unwrap();
        path
    }

    #[test]
    fn simple_style_is_exact_print_size() {
        let styler = QrStyler::new(QrStyle::Simple, None, 300).unwrap();
        let image = styler.render("https://example.com").unwrap();
        assert_eq!((image.width(), image.height()), (472, 472));
    }

    #[test]
    fn missing_logo_is_an_input_error() {
        let result = QrStyler::new(
            QrStyle::Jignasa,
            Some(Path::new("definitely/not/here.png")),
            300,
        );
        assert!(matches!(result, Err(Error::Input(msg)) if msg.contains("Logo file not found")));
    }

    #[test]
    fn vishwanath_is_two_centimetres() {
        let dir = tempfile::tempdir().unwrap();
        let logo = red_logo(dir.path());
        let styler = QrStyler::new(QrStyle::Vishwanath, Some(&logo), 300).unwrap();
        let image = styler.render("v").unwrap();
        assert_eq!((image.width(), image.height()), (236, 236));
    }

    #[test]
    fn logo_is_centred_and_white_is_transparent() {
        let mut base = RgbaImage::from_pixel(500, 500, Rgba([0, 0, 255, 255]));
        let mut logo = RgbaImage::from_pixel(50, 30, Rgba([200, 0, 0, 255]));
        logo.put_pixel(0, 0, Rgba([250, 250, 250, 255]));
        stamp_logo(&mut base, &logo);

        // Small enough to keep its size; top-left lands at (225, 235).
        assert_eq!(*base.get_pixel(250, 250), Rgba([200, 0, 0, 255]));
        assert_eq!(*base.get_pixel(224, 250), Rgba([0, 0, 255, 255]));
        // The near-white corner let the base show through.
        assert_eq!(*base.get_pixel(225, 235), Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn oversized_logo_shrinks_to_a_fifth() {
        let mut base = RgbaImage::from_pixel(500, 500, Rgba([0, 0, 255, 255]));
        let logo = RgbaImage::from_pixel(400, 200, Rgba([200, 0, 0, 255]));
        stamp_logo(&mut base, &logo);

        // 100x50 centred at (200, 225).
        let Rgba([r, _, b, _]) = *base.get_pixel(250, 250);
        assert!(r > 190 && b < 10);
        assert_eq!(*base.get_pixel(195, 250), Rgba([0, 0, 255, 255]));
        assert_eq!(*base.get_pixel(250, 220), Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn saved_formats_follow_style() {
        let dir = tempfile::tempdir().unwrap();
        let styler = QrStyler::without_logo(QrStyle::Simple, 300);
        let image = styler.render("save me").unwrap();
        let path = dir.path().join("code.jpg");
        styler.save(&image, &path).unwrap();
        assert_eq!(image::ImageFormat::from_path(&path).unwrap(), ImageFormat::Jpeg);
        assert_eq!(image::open(&path).unwrap().width(), 472);
    }

    #[test]
    fn png_bytes_decode() {
        let styler = QrStyler::without_logo(QrStyle::Simple, 300);
        let bytes = styler.render_png("bytes").unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.width(), 472);
    }
}
