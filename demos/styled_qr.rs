//! Render a QR code in every style that needs no logo file, plus a custom palette
//!
//! Usage: cargo run --example styled_qr

use qrdoc::qr::ModuleShape;
use qrdoc::{QrEncoder, QrStyle, QrStyler};
use std::path::Path;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let url = "https://example.com/plants/rosa-indica";

    // Print-ready 4 cm code, saved as a 300 DPI JPEG
    let styler = QrStyler::without_logo(QrStyle::Simple, 300);
    let image = styler.render(url)?;
    let path = Path::new("qr_simple.jpg");
    styler.save(&image, path)?;
    println!("✓ {} ({}x{} px)", path.display(), image.width(), image.height());

    // Brand colours without a logo
    let styler = QrStyler::without_logo(QrStyle::Jignasa, 300);
    let image = styler.render(url)?;
    let path = Path::new("qr_jignasa_plain.png");
    styler.save(&image, path)?;
    println!("✓ {}", path.display());

    // The raw encoder with square modules and a custom palette
    let square = QrEncoder::new()
        .with_shape(ModuleShape::Square)
        .with_colors([30, 30, 120], [250, 250, 245])
        .with_module_size(8)
        .encode_string(url)?;
    square.save("qr_square.png")?;
    println!("✓ qr_square.png");

    Ok(())
}
