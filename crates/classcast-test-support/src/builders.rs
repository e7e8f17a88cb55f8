//! Synthetic image builders for testing.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::{DynamicImage, GrayImage, Luma, RgbImage};

/// Builders for small deterministic test images.
pub struct SyntheticImage;

impl SyntheticImage {
    /// Creates a high-contrast checkerboard with 4-pixel cells.
    #[must_use]
    pub fn checkerboard(width: u32, height: u32) -> DynamicImage {
        let img = GrayImage::from_fn(width, height, |x, y| {
            if (x / 4 + y / 4) % 2 == 0 {
                Luma([255u8])
            } else {
                Luma([0u8])
            }
        });
        DynamicImage::ImageLuma8(img)
    }

    /// Creates a uniform gray image.
    #[must_use]
    pub fn uniform_gray(width: u32, height: u32, value: u8) -> DynamicImage {
        let img = GrayImage::from_fn(width, height, |_, _| Luma([value]));
        DynamicImage::ImageLuma8(img)
    }

    /// Creates a uniform RGB color image.
    #[must_use]
    pub fn rgb_uniform(width: u32, height: u32, r: u8, g: u8, b: u8) -> DynamicImage {
        let img = RgbImage::from_fn(width, height, |_, _| image::Rgb([r, g, b]));
        DynamicImage::ImageRgb8(img)
    }
}

/// Encodes an image as an in-memory PNG, e.g. for broker payloads.
///
/// # Errors
///
/// Returns an error if PNG encoding fails.
pub fn png_bytes(image: &DynamicImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .context("Failed to encode PNG")?;
    Ok(bytes)
}

/// Saves an image into `dir` under `name`, inferring the format from the
/// file extension, and returns the full path.
///
/// # Errors
///
/// Returns an error if encoding or writing fails.
pub fn save_into(dir: &Path, name: &str, image: &DynamicImage) -> Result<PathBuf> {
    let path = dir.join(name);
    image
        .save(&path)
        .with_context(|| format!("Failed to save {}", path.display()))?;
    Ok(path)
}
