use ndarray::Array2;

/// Median of a mutable slice, averaging the two central values for even
/// lengths. Returns NaN for an empty slice.
///
/// Uses `select_nth_unstable` for O(n) median without full sort.
pub fn median_in_place(values: &mut [f32]) -> f32 {
    let n = values.len();
    if n == 0 {
        f32::NAN
    } else if n == 1 {
        values[0]
    } else if n % 2 == 1 {
        let mid = n / 2;
        *values.select_nth_unstable_by(mid, |a, b| a.total_cmp(b)).1
    } else {
        let mid = n / 2;
        values.select_nth_unstable_by(mid, |a, b| a.total_cmp(b));
        let upper = values[mid];
        let lower = values[..mid]
            .iter()
            .copied()
            .fold(f32::NEG_INFINITY, f32::max);
        (lower + upper) / 2.0
    }
}

/// Median over the finite values of an iterator, NaN when there are none.
pub fn nan_median_of(values: impl Iterator<Item = f32>) -> f32 {
    let mut finite: Vec<f32> = values.filter(|v| v.is_finite()).collect();
    median_in_place(&mut finite)
}

/// Median of the finite pixels of an image.
pub fn nan_median(data: &Array2<f32>) -> f32 {
    nan_median_of(data.iter().copied())
}

/// Replace every non-finite pixel with `fill`.
pub fn replace_non_finite(data: &Array2<f32>, fill: f32) -> Array2<f32> {
    data.mapv(|v| if v.is_finite() { v } else { fill })
}

/// Mean and population standard deviation of a slice.
pub fn mean_stddev(values: &[f32]) -> (f64, f64) {
    let n = values.len() as f64;
    if n == 0.0 {
        return (0.0, 0.0);
    }
    let mean = values.iter().map(|&v| v as f64).sum::<f64>() / n;
    let var = values
        .iter()
        .map(|&v| (v as f64 - mean).powi(2))
        .sum::<f64>()
        / n;
    (mean, var.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median_even_and_odd() {
        assert_eq!(median_in_place(&mut [3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median_in_place(&mut [4.0, 1.0, 3.0, 2.0]), 2.5);
        assert!(median_in_place(&mut []).is_nan());
    }

    #[test]
    fn test_nan_median_ignores_nan() {
        let data = Array2::from_shape_vec((2, 2), vec![1.0, f32::NAN, 3.0, 5.0]).unwrap();
        assert_eq!(nan_median(&data), 3.0);
    }

    #[test]
    fn test_mean_stddev() {
        let (mean, std) = mean_stddev(&[0.0, 0.0, 1.0, 1.0]);
        assert!((mean - 0.5).abs() < 1e-9);
        assert!((std - 0.5).abs() < 1e-9);
    }
}
