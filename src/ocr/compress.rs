//! Shrinks images that exceed a provider's upload ceiling.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::ColorType;
use tracing::debug;

use crate::error::{ConvertError, Result};

pub const JPEG_QUALITY: u8 = 85;

/// Aim below the ceiling so JPEG size variance does not push us over it.
const SAFETY_MARGIN: f64 = 0.9;

/// Re-encode `data` as JPEG, downscaled so it fits in `limit` bytes.
///
/// Makes exactly one attempt. Pixel count scales with area, so both sides
/// shrink by `sqrt(target / size)`.
pub fn compress_to_fit(data: &[u8], limit: usize) -> Result<Vec<u8>> {
    let img = image::load_from_memory(data)?;
    let target = limit as f64 * SAFETY_MARGIN;
    let ratio = (target / data.len() as f64).sqrt().min(1.0);

    let (width, height) = (img.width(), img.height());
    let new_width = ((width as f64 * ratio) as u32).max(1);
    let new_height = ((height as f64 * ratio) as u32).max(1);

    let resized = if new_width < width {
        img.resize_exact(new_width, new_height, FilterType::Triangle)
    } else {
        img
    };

    let rgb = resized.to_rgb8();
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY).encode(
        rgb.as_raw(),
        rgb.width(),
        rgb.height(),
        ColorType::Rgb8,
    )?;

    debug!(
        "compressed {}x{} ({} bytes) -> {}x{} ({} bytes)",
        width,
        height,
        data.len(),
        rgb.width(),
        rgb.height(),
        out.len()
    );

    if out.len() > limit {
        return Err(ConvertError::Oversized {
            size: out.len(),
            limit,
        });
    }
    Ok(out)
}

/// Swap the extension of `file_name` for `.jpg`.
pub fn jpeg_file_name(file_name: &str) -> String {
    match file_name.rsplit_once('.') {
        Some((stem, _)) => format!("{}.jpg", stem),
        None => format!("{}.jpg", file_name),
    }
}
