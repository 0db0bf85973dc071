pub mod median;
pub mod trimmed;

use ndarray::Array2;

use crate::error::{ReductionError, Result};

pub use median::median_stack;
pub use trimmed::trimmed_median_combine;

/// Common shape of a non-empty stack.
pub(crate) fn check_shapes(frames: &[&Array2<f32>]) -> Result<(usize, usize)> {
    let expected = frames[0].dim();
    for frame in frames.iter().skip(1) {
        if frame.dim() != expected {
            return Err(ReductionError::ShapeMismatch {
                expected,
                got: frame.dim(),
            });
        }
    }
    Ok(expected)
}

/// Divide an image by its own NaN-ignoring median so that median becomes 1.0.
pub fn normalize_by_median(data: Array2<f32>, what: &str) -> Result<Array2<f32>> {
    let median = crate::stats::nan_median(&data);
    if !median.is_finite() || median == 0.0 {
        return Err(ReductionError::Degenerate {
            what: what.to_string(),
            reason: format!("median {median} cannot be used for normalisation"),
        });
    }
    Ok(data.mapv(|v| v / median))
}
