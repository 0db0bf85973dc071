use std::path::Path;

use image::{GrayImage, ImageFormat, Luma};
use ndarray::Array2;

use crate::consts::EPSILON;
use crate::error::Result;

/// Percentile black/white points over the finite pixels of `data`.
///
/// `low_percentile` and `high_percentile` are in [0.0, 1.0]. Returns `None`
/// when the array has no finite pixel.
pub fn percentile_bounds(
    data: &Array2<f32>,
    low_percentile: f32,
    high_percentile: f32,
) -> Option<(f32, f32)> {
    let mut sorted: Vec<f32> = data.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(|a, b| a.total_cmp(b));

    let n = sorted.len();
    let lo_idx = ((n as f32 * low_percentile) as usize).min(n - 1);
    let hi_idx = ((n as f32 * high_percentile) as usize).min(n - 1);
    Some((sorted[lo_idx], sorted[hi_idx]))
}

/// Save an 8-bit grayscale PNG preview of a calibration product.
///
/// Pixels are stretched linearly between the given percentiles; NaN pixels
/// are drawn black.
pub fn save_quicklook(
    data: &Array2<f32>,
    path: &Path,
    low_percentile: f32,
    high_percentile: f32,
) -> Result<()> {
    let (h, w) = data.dim();
    let (black, white) = percentile_bounds(data, low_percentile, high_percentile).unwrap_or((0.0, 1.0));
    let range = white - black;
    let range = if range.abs() < EPSILON { 1.0 } else { range };

    let mut img = GrayImage::new(w as u32, h as u32);
    for row in 0..h {
        for col in 0..w {
            let v = data[[row, col]];
            let level = if v.is_finite() {
                (((v - black) / range).clamp(0.0, 1.0) * 255.0) as u8
            } else {
                0
            };
            img.put_pixel(col as u32, row as u32, Luma([level]));
        }
    }

    img.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}
