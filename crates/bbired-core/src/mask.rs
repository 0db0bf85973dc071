use std::path::{Path, PathBuf};

use ndarray::Array2;
use tracing::info;

use crate::error::{ReductionError, Result};
use crate::frame::TrimSection;
use crate::io::fits::read_fits;

/// Multiplicative bad-pixel mask: `NaN` on defective pixels, `1.0` elsewhere.
#[derive(Clone, Debug)]
pub struct BadPixelMask {
    pub data: Array2<f32>,
    pub source: PathBuf,
}

impl BadPixelMask {
    /// Mask with no bad pixels, used when none is configured.
    pub fn all_good(shape: (usize, usize)) -> Self {
        Self {
            data: Array2::from_elem(shape, 1.0),
            source: PathBuf::new(),
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    pub fn bad_count(&self) -> usize {
        self.data.iter().filter(|v| v.is_nan()).count()
    }

    /// Multiply `data` by the mask, propagating NaN onto defective pixels.
    pub fn apply(&self, data: &Array2<f32>) -> Result<Array2<f32>> {
        if data.dim() != self.data.dim() {
            return Err(ReductionError::ShapeMismatch {
                expected: self.data.dim(),
                got: data.dim(),
            });
        }
        Ok(data * &self.data)
    }
}

/// Convert raw mask values: zero marks a bad pixel.
pub fn mask_from_raw(raw: &Array2<f32>) -> Array2<f32> {
    raw.mapv(|v| if v == 0.0 { f32::NAN } else { 1.0 })
}

/// Read the half-frame mask file and crop it to the trim window.
pub fn load_bad_pixel_mask(path: &Path, trim: &TrimSection) -> Result<BadPixelMask> {
    if !path.is_file() {
        return Err(ReductionError::Configuration(format!(
            "bad-pixel mask {} not found",
            path.display()
        )));
    }
    let (_, raw) = read_fits(path)?;
    let data = mask_from_raw(&trim.apply(&raw, path)?);
    let mask = BadPixelMask {
        data,
        source: path.to_path_buf(),
    };
    info!(path = %path.display(), bad = mask.bad_count(), "Bad-pixel mask loaded");
    Ok(mask)
}
