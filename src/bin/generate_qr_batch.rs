//! Print-batch QR code generator.
//!
//! Creates a batch of `available` QR code rows and writes one PNG sticker
//! per code, encoding `<base-url>/qr/<uuid>` so a phone scan lands on the
//! redirect endpoint. The images are handed to the print shop; the rows
//! wait in the database until an operator associates them with portals.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use image::{GrayImage, Luma};
use qrcode::{Color, QrCode};

use portal_maintenance::{config::ConfigLoader, db, repositories::QrCodeRepository};

/// Quiet-zone width around the symbol, in modules (per the QR spec).
const QUIET_ZONE: u32 = 4;

#[derive(Parser, Debug)]
#[command(name = "generate-qr-batch", about = "Generate a print batch of QR code stickers")]
struct Args {
    /// Number of QR codes to generate
    #[arg(long, default_value_t = 50)]
    count: usize,

    /// Base URL encoded into the stickers (defaults to PORTAL_QR_BASE_URL)
    #[arg(long)]
    base_url: Option<String>,

    /// Output directory for the PNG images
    #[arg(long, default_value = "qr_codes")]
    output: PathBuf,

    /// Approximate image size in pixels
    #[arg(long, default_value_t = 256)]
    size: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.count == 0 {
        anyhow::bail!("count must be greater than 0");
    }

    let loader = ConfigLoader::new();
    let config = loader.load().context("loading configuration")?;

    let base_url = args
        .base_url
        .unwrap_or_else(|| config.qr_base_url.clone());

    let pool = db::init_pool(&config)
        .await
        .context("initializing database connection pool")?;

    std::fs::create_dir_all(&args.output)
        .with_context(|| format!("creating output directory {}", args.output.display()))?;

    println!("Generating {} QR codes into {}", args.count, args.output.display());

    let repo = QrCodeRepository::new(std::sync::Arc::new(pool));
    let ids = repo
        .generate_batch(args.count)
        .await
        .context("inserting QR code batch")?;

    let mut written = 0usize;
    for id in &ids {
        let url = format!("{}/qr/{}", base_url.trim_end_matches('/'), id);
        let path = args.output.join(format!("qr_{}.png", id));
        match write_sticker_png(&url, args.size, &path) {
            Ok(()) => written += 1,
            Err(e) => eprintln!("Failed to render sticker {}: {}", id, e),
        }
    }

    println!(
        "Done: {} rows inserted, {} stickers written to {}",
        ids.len(),
        written,
        args.output.display()
    );
    println!("Print the stickers, stick them on portals, then associate them in the admin area.");

    Ok(())
}

/// Renders the QR symbol for `data` into a grayscale PNG at `path`.
fn write_sticker_png(data: &str, size: u32, path: &Path) -> Result<()> {
    let image = render_sticker(data, size)?;
    image
        .save_with_format(path, image::ImageFormat::Png)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

/// Renders the QR symbol with a quiet zone, scaled up to roughly `size`
/// pixels per side (never below one pixel per module).
fn render_sticker(data: &str, size: u32) -> Result<GrayImage> {
    let code = QrCode::new(data.as_bytes()).context("encoding QR symbol")?;
    let width = code.width() as u32;
    let colors = code.to_colors();

    let modules = width + 2 * QUIET_ZONE;
    let scale = (size / modules).max(1);
    let dim = modules * scale;

    let mut image = GrayImage::from_pixel(dim, dim, Luma([255u8]));
    for (index, color) in colors.iter().enumerate() {
        if *color != Color::Dark {
            continue;
        }
        let module_x = (index as u32 % width + QUIET_ZONE) * scale;
        let module_y = (index as u32 / width + QUIET_ZONE) * scale;
        for dy in 0..scale {
            for dx in 0..scale {
                image.put_pixel(module_x + dx, module_y + dy, Luma([0u8]));
            }
        }
    }

    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_sticker_produces_scaled_symbol_with_dark_modules() {
        let image = render_sticker("http://localhost:8080/qr/test", 256).unwrap();

        assert!(image.width() >= 128);
        assert_eq!(image.width(), image.height());
        assert!(image.pixels().any(|p| p.0[0] == 0));
        assert!(image.pixels().any(|p| p.0[0] == 255));
    }

    #[test]
    fn tiny_size_still_renders_one_pixel_per_module() {
        let image = render_sticker("x", 1).unwrap();
        // 21-module version 1 symbol plus two quiet zones.
        assert_eq!(image.width(), 21 + 2 * QUIET_ZONE);
    }

    #[test]
    fn write_sticker_png_writes_a_png_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("qr_test.png");

        write_sticker_png("http://localhost:8080/qr/test", 64, &path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[1..4], b"PNG");
    }
}
