use ndarray::Array2;

use crate::consts::MIN_TRIMMED_FRAMES;
use crate::error::{ReductionError, Result};
use crate::stats::median_in_place;

use super::check_shapes;

/// Combine frames with a per-pixel min/max-rejected median.
///
/// Per pixel: sort the N stack values (NaN last), discard the single lowest
/// and single highest, and take the median of the finite survivors. A pixel
/// whose survivors are all NaN stays NaN.
///
/// Fewer than three frames leave nothing after trimming and are rejected with
/// [`ReductionError::Combine`]; `what` names the product in that error.
pub fn trimmed_median_combine(frames: &[&Array2<f32>], what: &str) -> Result<Array2<f32>> {
    if frames.len() < MIN_TRIMMED_FRAMES {
        return Err(ReductionError::Combine {
            what: what.to_string(),
            got: frames.len(),
            needed: MIN_TRIMMED_FRAMES,
        });
    }
    let (h, w) = check_shapes(frames)?;
    let n = frames.len();

    let mut result = Array2::<f32>::zeros((h, w));
    let mut pixel_values = vec![0.0f32; n];
    let mut survivors = Vec::with_capacity(n - 2);

    for row in 0..h {
        for col in 0..w {
            for (i, frame) in frames.iter().enumerate() {
                pixel_values[i] = frame[[row, col]];
            }
            pixel_values.sort_unstable_by(nan_last);

            survivors.clear();
            survivors.extend(
                pixel_values[1..n - 1]
                    .iter()
                    .copied()
                    .filter(|v| !v.is_nan()),
            );
            result[[row, col]] = median_in_place(&mut survivors);
        }
    }

    Ok(result)
}

/// Ascending order with NaN after every number.
fn nan_last(a: &f32, b: &f32) -> std::cmp::Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => std::cmp::Ordering::Equal,
        (true, false) => std::cmp::Ordering::Greater,
        (false, true) => std::cmp::Ordering::Less,
        (false, false) => a.total_cmp(b),
    }
}
