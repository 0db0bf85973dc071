mod common;

use approx::assert_abs_diff_eq;
use bbired_core::error::ReductionError;
use bbired_core::stack::{median_stack, normalize_by_median, trimmed_median_combine};
use ndarray::Array2;

use common::make_frame;

// ---------------------------------------------------------------------------
// Trimmed median
// ---------------------------------------------------------------------------

#[test]
fn test_single_outlier_is_rejected() {
    let mut frames: Vec<Array2<f32>> = (0..5).map(|_| make_frame(4, 4, 100.0)).collect();
    frames[2][[1, 3]] = 50_000.0;
    let refs: Vec<&Array2<f32>> = frames.iter().collect();

    let result = trimmed_median_combine(&refs, "bias").unwrap();
    assert_abs_diff_eq!(result[[1, 3]], 100.0);
    assert!(result.iter().all(|&v| (v - 100.0).abs() < 1e-6));
}

#[test]
fn test_equals_median_of_inner_values() {
    // Per pixel values 1, 2, 3, 10, 1000: trimmed to 2, 3, 10 -> 3.
    let values = [1.0, 1000.0, 3.0, 2.0, 10.0];
    let frames: Vec<Array2<f32>> = values.iter().map(|&v| make_frame(2, 2, v)).collect();
    let refs: Vec<&Array2<f32>> = frames.iter().collect();
    let result = trimmed_median_combine(&refs, "stack").unwrap();
    assert_abs_diff_eq!(result[[0, 0]], 3.0);

    // Even survivor count averages the central pair: 2, 3, 4, 5 of 1..6.
    let frames: Vec<Array2<f32>> = (1..=6).map(|v| make_frame(2, 2, v as f32)).collect();
    let refs: Vec<&Array2<f32>> = frames.iter().collect();
    let result = trimmed_median_combine(&refs, "stack").unwrap();
    assert_abs_diff_eq!(result[[1, 1]], 3.5);
}

#[test]
fn test_nan_pixels_are_ignored() {
    let mut frames: Vec<Array2<f32>> = (0..4).map(|i| make_frame(2, 2, 10.0 + i as f32)).collect();
    frames[1][[0, 0]] = f32::NAN;
    let refs: Vec<&Array2<f32>> = frames.iter().collect();
    let result = trimmed_median_combine(&refs, "stack").unwrap();
    // Sorted 10, 12, 13, NaN: trimmed to 12, 13.
    assert_abs_diff_eq!(result[[0, 0]], 12.5);

    let nan_frames: Vec<Array2<f32>> = (0..3).map(|_| make_frame(2, 2, f32::NAN)).collect();
    let refs: Vec<&Array2<f32>> = nan_frames.iter().collect();
    let result = trimmed_median_combine(&refs, "stack").unwrap();
    assert!(result.iter().all(|v| v.is_nan()));
}

#[test]
fn test_too_few_frames() {
    let frames: Vec<Array2<f32>> = (0..2).map(|_| make_frame(2, 2, 1.0)).collect();
    let refs: Vec<&Array2<f32>> = frames.iter().collect();
    match trimmed_median_combine(&refs, "master bias") {
        Err(ReductionError::Combine { what, got, needed }) => {
            assert_eq!(what, "master bias");
            assert_eq!(got, 2);
            assert_eq!(needed, 3);
        }
        other => panic!("expected Combine error, got {other:?}"),
    }
    assert!(trimmed_median_combine(&[], "empty").is_err());
}

#[test]
fn test_shape_mismatch() {
    let a = make_frame(2, 2, 1.0);
    let b = make_frame(2, 2, 1.0);
    let c = make_frame(3, 2, 1.0);
    assert!(matches!(
        trimmed_median_combine(&[&a, &b, &c], "stack"),
        Err(ReductionError::ShapeMismatch { expected: (2, 2), got: (3, 2) })
    ));
}

// ---------------------------------------------------------------------------
// Plain median and normalisation
// ---------------------------------------------------------------------------

#[test]
fn test_median_stack_keeps_extremes_out() {
    let frames = [make_frame(3, 3, 1.0), make_frame(3, 3, 5.0), make_frame(3, 3, 100.0)];
    let refs: Vec<&Array2<f32>> = frames.iter().collect();
    let result = median_stack(&refs).unwrap();
    assert!(result.iter().all(|&v| v == 5.0));

    let single = median_stack(&refs[..1]).unwrap();
    assert_eq!(single, frames[0]);
    assert!(median_stack(&[]).is_err());
}

#[test]
fn test_normalize_by_median() {
    let data = Array2::from_shape_vec((1, 4), vec![2.0, 4.0, f32::NAN, 6.0]).unwrap();
    let norm = normalize_by_median(data, "flat").unwrap();
    assert_abs_diff_eq!(norm[[0, 1]], 1.0);
    assert_abs_diff_eq!(norm[[0, 3]], 1.5);
    assert!(norm[[0, 2]].is_nan());

    let zeros = make_frame(2, 2, 0.0);
    assert!(matches!(
        normalize_by_median(zeros, "flat"),
        Err(ReductionError::Degenerate { .. })
    ));
}
