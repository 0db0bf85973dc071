use ndarray::Array2;

use crate::error::{ReductionError, Result};
use crate::stats::median_in_place;

use super::check_shapes;

/// Stack frames by computing the plain median at each pixel position.
///
/// No values are rejected; NaN inputs sort last and take part in the median
/// like any other value, so callers should pass NaN-free frames.
pub fn median_stack(frames: &[&Array2<f32>]) -> Result<Array2<f32>> {
    if frames.is_empty() {
        return Err(ReductionError::Combine {
            what: "median stack".into(),
            got: 0,
            needed: 1,
        });
    }
    let (h, w) = check_shapes(frames)?;
    let n = frames.len();

    let mut result = Array2::<f32>::zeros((h, w));
    let mut pixel_values = vec![0.0f32; n];

    for row in 0..h {
        for col in 0..w {
            for (i, frame) in frames.iter().enumerate() {
                pixel_values[i] = frame[[row, col]];
            }
            result[[row, col]] = median_in_place(&mut pixel_values);
        }
    }
    Ok(result)
}
