use std::collections::BTreeMap;

use ndarray::Array2;
use tracing::{debug, info};

use crate::error::Result;
use crate::frame::{FilterId, Frame};
use crate::mask::BadPixelMask;
use crate::stack::{normalize_by_median, trimmed_median_combine};
use crate::stats::nan_median;

/// Read-only calibration products of one observation block.
#[derive(Clone, Debug)]
pub struct MasterCalibrations {
    pub bias: Array2<f32>,
    /// Normalised flats; filters absent here are flat-fielded by 1.0.
    pub flats: BTreeMap<FilterId, Array2<f32>>,
}

impl MasterCalibrations {
    pub fn flat_for(&self, filter: &FilterId) -> Option<&Array2<f32>> {
        self.flats.get(filter)
    }
}

/// Builds the master bias and per-filter master flats.
pub struct MasterCalibrationBuilder<'a> {
    mask: &'a BadPixelMask,
}

impl<'a> MasterCalibrationBuilder<'a> {
    pub fn new(mask: &'a BadPixelMask) -> Self {
        Self { mask }
    }

    /// Trimmed-median combine of the bias frames, multiplied by the mask.
    pub fn master_bias(&self, frames: &[Frame]) -> Result<Array2<f32>> {
        let stack: Vec<&Array2<f32>> = frames.iter().map(|f| &f.data).collect();
        let combined = trimmed_median_combine(&stack, "master bias")?;
        let bias = self.mask.apply(&combined)?;
        info!(
            frames = frames.len(),
            median = nan_median(&bias),
            "Master bias built"
        );
        Ok(bias)
    }

    /// Bias of zeros carrying the mask, used when bias subtraction is off.
    pub fn zero_bias(&self) -> Array2<f32> {
        self.mask.data.mapv(|m| 0.0 * m)
    }

    /// Combine bias-subtracted flats and normalise the result to median 1.0.
    pub fn master_flat(
        &self,
        frames: &[Frame],
        bias: &Array2<f32>,
        filter: &FilterId,
    ) -> Result<Array2<f32>> {
        let what = format!("master flat {filter}");
        let debiased = frames
            .iter()
            .map(|f| subtract_checked(&f.data, bias))
            .collect::<Result<Vec<_>>>()?;
        let stack: Vec<&Array2<f32>> = debiased.iter().collect();
        let combined = trimmed_median_combine(&stack, &what)?;
        debug!(%filter, level = nan_median(&combined), "Flat level before normalisation");
        let flat = normalize_by_median(combined, &what)?;
        info!(%filter, frames = frames.len(), "Master flat built");
        Ok(flat)
    }
}

pub(crate) fn subtract_checked(data: &Array2<f32>, other: &Array2<f32>) -> Result<Array2<f32>> {
    if data.dim() != other.dim() {
        return Err(crate::error::ReductionError::ShapeMismatch {
            expected: other.dim(),
            got: data.dim(),
        });
    }
    Ok(data - other)
}
