mod common;

use approx::assert_abs_diff_eq;
use bbired_core::error::ReductionError;
use bbired_core::frame::{FilterId, Frame};
use bbired_core::fringe::FringeCorrector;
use bbired_core::stats::nan_median;
use ndarray::Array2;

use common::make_frame;

/// Multiplicative interference pattern with median close to 1.0.
fn fringes(rows: usize, cols: usize) -> Array2<f32> {
    Array2::from_shape_fn((rows, cols), |(r, c)| {
        1.0 + 0.05 * ((r as f32 * 0.7).sin() * (c as f32 * 0.4).cos())
    })
}

fn fringed_frames(levels: &[f32]) -> Vec<Frame> {
    let pattern = fringes(20, 24);
    levels
        .iter()
        .enumerate()
        .map(|(i, &level)| Frame::new(&pattern * level, format!("z_{i}.fits")))
        .collect()
}

#[test]
fn test_fringe_pattern_is_divided_out() {
    let frames = fringed_frames(&[900.0, 1000.0, 1100.0]);
    let corrector = FringeCorrector::new(FilterId::new("Sloan_z"));
    let result = corrector.correct(&frames).unwrap().unwrap();

    assert_abs_diff_eq!(nan_median(&result.template), 1.0, epsilon = 1e-5);
    // Each frame becomes flat at its level times the pattern median.
    let pattern_median = nan_median(&fringes(20, 24));
    for (frame, level) in result.frames.iter().zip([900.0f32, 1000.0, 1100.0]) {
        let expected = level * pattern_median;
        assert!(frame
            .data
            .iter()
            .all(|&v| (v - expected).abs() < 1e-4 * expected));
    }
    assert_eq!(result.frames[1].source, frames[1].source);
}

#[test]
fn test_template_of_flat_frames_is_unity() {
    let frames: Vec<Frame> = (0..4)
        .map(|i| Frame::new(make_frame(6, 6, 50.0 + i as f32), format!("f_{i}.fits")))
        .collect();
    let template = FringeCorrector::new("Sloan_z".into()).template(&frames).unwrap();
    assert!(template.iter().all(|&v| (v - 1.0).abs() < 1e-6));
}

#[test]
fn test_applies_only_to_its_filter() {
    let corrector = FringeCorrector::new(FilterId::new("Sloan_z"));
    assert!(corrector.applies_to(&FilterId::new("Sloan_z")));
    assert!(!corrector.applies_to(&FilterId::new("Sloan_r")));
    assert_eq!(corrector.filter().as_str(), "Sloan_z");
}

#[test]
fn test_nothing_to_correct() {
    let corrector = FringeCorrector::new(FilterId::new("Sloan_z"));
    assert!(corrector.correct(&[]).unwrap().is_none());
}

#[test]
fn test_too_few_frames() {
    let frames = fringed_frames(&[900.0, 1000.0]);
    let corrector = FringeCorrector::new(FilterId::new("Sloan_z"));
    assert!(matches!(
        corrector.correct(&frames),
        Err(ReductionError::Combine { got: 2, .. })
    ));
}
