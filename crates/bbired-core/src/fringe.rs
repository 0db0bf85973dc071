use ndarray::Array2;
use tracing::info;

use crate::error::{ReductionError, Result};
use crate::frame::{FilterId, Frame};
use crate::stack::{normalize_by_median, trimmed_median_combine};

/// Fringe template and the frames divided by it.
#[derive(Clone, Debug)]
pub struct FringeCorrection {
    pub template: Array2<f32>,
    pub frames: Vec<Frame>,
}

/// Removes the interference pattern of one filter by dividing every frame by
/// a median-normalised combine of the frames themselves.
#[derive(Clone, Debug)]
pub struct FringeCorrector {
    filter: FilterId,
}

impl FringeCorrector {
    pub fn new(filter: FilterId) -> Self {
        Self { filter }
    }

    pub fn filter(&self) -> &FilterId {
        &self.filter
    }

    pub fn applies_to(&self, filter: &FilterId) -> bool {
        &self.filter == filter
    }

    pub fn template(&self, frames: &[Frame]) -> Result<Array2<f32>> {
        let what = format!("fringe template {}", self.filter);
        let stack: Vec<&Array2<f32>> = frames.iter().map(|f| &f.data).collect();
        normalize_by_median(trimmed_median_combine(&stack, &what)?, &what)
    }

    /// `Ok(None)` when there is nothing to correct.
    pub fn correct(&self, frames: &[Frame]) -> Result<Option<FringeCorrection>> {
        if frames.is_empty() {
            return Ok(None);
        }
        let template = self.template(frames)?;
        let corrected = frames
            .iter()
            .map(|f| {
                if f.data.dim() != template.dim() {
                    return Err(ReductionError::ShapeMismatch {
                        expected: template.dim(),
                        got: f.data.dim(),
                    });
                }
                Ok(f.with_data(&f.data / &template))
            })
            .collect::<Result<Vec<_>>>()?;
        info!(filter = %self.filter, frames = corrected.len(), "Fringe pattern removed");
        Ok(Some(FringeCorrection {
            template,
            frames: corrected,
        }))
    }
}
