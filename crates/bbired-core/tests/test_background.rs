mod common;

use approx::assert_abs_diff_eq;
use bbired_core::background::{BackgroundEstimator, SkyBackgroundSubtractor};
use bbired_core::error::ReductionError;
use bbired_core::frame::{FilterId, Frame};
use bbired_core::stats::nan_median;
use ndarray::Array2;

use common::make_frame;

// ---------------------------------------------------------------------------
// Estimator
// ---------------------------------------------------------------------------

#[test]
fn test_constant_sky() {
    let data = make_frame(48, 40, 250.0);
    let bg = BackgroundEstimator::new(16, 3).estimate(&data).unwrap();
    assert_eq!(bg.surface.dim(), (48, 40));
    assert!(bg.surface.iter().all(|&v| (v - 250.0).abs() < 1e-3));
    assert_abs_diff_eq!(bg.global_level, 250.0, epsilon = 1e-4);
    assert_abs_diff_eq!(bg.global_rms, 0.0);
}

#[test]
fn test_linear_ramp_is_reproduced() {
    let data = Array2::from_shape_fn((48, 40), |(_, c)| 100.0 + 2.0 * c as f32);
    let bg = BackgroundEstimator::new(16, 1).estimate(&data).unwrap();
    for ((r, c), &v) in bg.surface.indexed_iter() {
        assert_abs_diff_eq!(v, data[[r, c]], epsilon = 1e-2);
    }
}

#[test]
fn test_source_does_not_lift_the_sky() {
    let mut data = make_frame(64, 64, 400.0);
    // Bright compact source filling most of one tile.
    for r in 18..30 {
        for c in 18..30 {
            data[[r, c]] = 20_000.0;
        }
    }
    let bg = BackgroundEstimator::new(16, 3).estimate(&data).unwrap();
    assert_abs_diff_eq!(bg.surface[[24, 24]], 400.0, epsilon = 1.0);
    assert_abs_diff_eq!(bg.global_level, 400.0, epsilon = 1e-3);
}

#[test]
fn test_masked_pixels_are_ignored() {
    let mut data = make_frame(32, 32, 80.0);
    data[[3, 3]] = f32::NAN;
    for c in 0..32 {
        data[[20, c]] = f32::NAN;
    }
    let bg = BackgroundEstimator::new(16, 3).estimate(&data).unwrap();
    assert!(bg.surface.iter().all(|&v| (v - 80.0).abs() < 1e-3));
}

#[test]
fn test_unusable_input() {
    let est = BackgroundEstimator::new(16, 3);
    let empty = Array2::<f32>::zeros((0, 10));
    assert!(matches!(est.estimate(&empty), Err(ReductionError::Degenerate { .. })));

    let nan = make_frame(20, 20, f32::NAN);
    assert!(matches!(est.estimate(&nan), Err(ReductionError::Degenerate { .. })));

    let zero_box = BackgroundEstimator::new(0, 3);
    assert!(matches!(
        zero_box.estimate(&make_frame(4, 4, 1.0)),
        Err(ReductionError::Configuration(_))
    ));
}

// ---------------------------------------------------------------------------
// Subtractor
// ---------------------------------------------------------------------------

fn sky_frames() -> Vec<Frame> {
    [300.0f32, 310.0, 320.0]
        .iter()
        .enumerate()
        .map(|(i, &sky)| {
            let mut data = Array2::from_shape_fn((48, 48), |(r, _)| sky + 0.5 * r as f32);
            data[[10 + 5 * i, 30]] = 5000.0;
            Frame::new(data, format!("sci_{i}.fits"))
        })
        .collect()
}

#[test]
fn test_subtraction_centres_the_sky_on_zero() {
    let frames = sky_frames();
    let sub = SkyBackgroundSubtractor::new(BackgroundEstimator::new(16, 1))
        .subtract(&FilterId::new("Sloan_r"), &frames)
        .unwrap()
        .unwrap();

    assert_eq!(sub.frames.len(), 3);
    let medians: Vec<f32> = sub.frames.iter().map(|f| nan_median(&f.data)).collect();
    assert_abs_diff_eq!(medians[1], 0.0, epsilon = 0.5);
    assert_abs_diff_eq!(medians[0], -10.0, epsilon = 0.5);
    assert_abs_diff_eq!(medians[2], 10.0, epsilon = 0.5);
    assert!(nan_median(&frames[1].data).abs() > 100.0);

    // Sources survive subtraction.
    assert!(sub.frames[0].data[[10, 30]] > 4000.0);
    assert_eq!(sub.frames[2].source, frames[2].source);
    assert_eq!(sub.background.surface.dim(), (48, 48));
}

#[test]
fn test_nothing_to_subtract() {
    let subtractor = SkyBackgroundSubtractor::default();
    assert!(subtractor.subtract(&FilterId::new("Sloan_r"), &[]).unwrap().is_none());
}
