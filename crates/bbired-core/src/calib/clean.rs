use ndarray::Array2;

use crate::error::{ReductionError, Result};
use crate::frame::Frame;

use super::master::subtract_checked;

/// Bias subtraction and flat-field division: `(raw - bias) / flat`.
pub struct FrameCleaner<'a> {
    bias: &'a Array2<f32>,
}

impl<'a> FrameCleaner<'a> {
    pub fn new(bias: &'a Array2<f32>) -> Self {
        Self { bias }
    }

    /// Clean one frame. `flat = None` divides by a neutral 1.0.
    pub fn clean(&self, frame: &Frame, flat: Option<&Array2<f32>>) -> Result<Frame> {
        let debiased = subtract_checked(&frame.data, self.bias)?;
        let data = match flat {
            Some(flat) => {
                if flat.dim() != debiased.dim() {
                    return Err(ReductionError::ShapeMismatch {
                        expected: flat.dim(),
                        got: debiased.dim(),
                    });
                }
                debiased / flat
            }
            None => debiased,
        };
        Ok(frame.with_data(data))
    }

    pub fn clean_all(&self, frames: &[Frame], flat: Option<&Array2<f32>>) -> Result<Vec<Frame>> {
        frames.iter().map(|f| self.clean(f, flat)).collect()
    }
}
