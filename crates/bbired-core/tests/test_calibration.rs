mod common;

use approx::assert_abs_diff_eq;
use bbired_core::calib::{FrameCleaner, MasterCalibrationBuilder};
use bbired_core::error::ReductionError;
use bbired_core::frame::{FilterId, Frame};
use bbired_core::io::{write_fits, FitsHeader};
use bbired_core::mask::{load_bad_pixel_mask, BadPixelMask};
use bbired_core::stats::nan_median;
use ndarray::Array2;

use common::{frames_of, make_frame, small_trim, vignetting};

fn mask_with_bad(shape: (usize, usize), bad: &[(usize, usize)]) -> BadPixelMask {
    let mut mask = BadPixelMask::all_good(shape);
    for &idx in bad {
        mask.data[idx] = f32::NAN;
    }
    mask
}

// ---------------------------------------------------------------------------
// Bad-pixel mask
// ---------------------------------------------------------------------------

#[test]
fn test_mask_loaded_and_trimmed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bpm.fits");
    let (rows, cols) = common::RAW_SHAPE;
    let mut raw = make_frame(rows, cols, 1.0);
    let trim = small_trim();
    raw[[trim.row_start + 2, trim.col_start + 3]] = 0.0;
    raw[[0, 0]] = 0.0; // outside the trim window
    write_fits(&path, &raw, &FitsHeader::new()).unwrap();

    let mask = load_bad_pixel_mask(&path, &trim).unwrap();
    assert_eq!(mask.shape(), trim.shape());
    assert_eq!(mask.bad_count(), 1);
    assert!(mask.data[[2, 3]].is_nan());
    assert_eq!(mask.data[[0, 0]], 1.0);
}

#[test]
fn test_missing_mask_is_configuration_error() {
    let err = load_bad_pixel_mask(std::path::Path::new("/nonexistent/bpm.fits"), &small_trim());
    assert!(matches!(err, Err(ReductionError::Configuration(_))));
}

// ---------------------------------------------------------------------------
// Master bias
// ---------------------------------------------------------------------------

#[test]
fn test_master_bias_rejects_hot_pixel() {
    let mut data: Vec<Array2<f32>> = (0..5).map(|_| make_frame(6, 6, 100.0)).collect();
    data[0][[3, 3]] = 50_000.0;
    let mask = BadPixelMask::all_good((6, 6));
    let bias = MasterCalibrationBuilder::new(&mask)
        .master_bias(&frames_of(&data))
        .unwrap();
    assert_abs_diff_eq!(bias[[3, 3]], 100.0, epsilon = 1e-3);
}

#[test]
fn test_master_bias_carries_mask() {
    let data: Vec<Array2<f32>> = (0..3)
        .map(|i| Array2::from_shape_fn((5, 5), |(r, c)| 100.0 + (r + c + i) as f32))
        .collect();
    let bad = [(0, 4), (2, 2)];
    let mask = mask_with_bad((5, 5), &bad);
    let builder = MasterCalibrationBuilder::new(&mask);
    let bias = builder.master_bias(&frames_of(&data)).unwrap();

    for ((r, c), &v) in bias.indexed_iter() {
        if bad.contains(&(r, c)) {
            assert!(v.is_nan(), "({r},{c}) should be NaN");
        } else {
            assert_abs_diff_eq!(v, 101.0 + (r + c) as f32, epsilon = 1e-4);
        }
    }

    let zero = builder.zero_bias();
    assert!(zero[[2, 2]].is_nan());
    assert_eq!(zero[[1, 1]], 0.0);
}

#[test]
fn test_master_bias_needs_three_frames() {
    let data: Vec<Array2<f32>> = (0..2).map(|_| make_frame(4, 4, 100.0)).collect();
    let mask = BadPixelMask::all_good((4, 4));
    assert!(matches!(
        MasterCalibrationBuilder::new(&mask).master_bias(&frames_of(&data)),
        Err(ReductionError::Combine { got: 2, .. })
    ));
}

// ---------------------------------------------------------------------------
// Master flat
// ---------------------------------------------------------------------------

#[test]
fn test_master_flat_of_scaled_levels_is_unity() {
    let data: Vec<Array2<f32>> = [0.9f32, 1.0, 1.1]
        .iter()
        .map(|k| make_frame(8, 8, 1000.0 * k))
        .collect();
    let mask = BadPixelMask::all_good((8, 8));
    let bias = make_frame(8, 8, 0.0);
    let flat = MasterCalibrationBuilder::new(&mask)
        .master_flat(&frames_of(&data), &bias, &FilterId::new("Sloan_r"))
        .unwrap();
    assert!(flat.iter().all(|&v| (v - 1.0).abs() < 1e-5));
}

#[test]
fn test_master_flat_median_is_one() {
    let vig = vignetting(16, 20);
    let bias = make_frame(16, 20, 200.0);
    let data: Vec<Array2<f32>> = [8000.0f32, 9000.0, 9500.0, 12000.0]
        .iter()
        .map(|&level| &bias + &(&vig * level))
        .collect();
    let mask = BadPixelMask::all_good((16, 20));
    let flat = MasterCalibrationBuilder::new(&mask)
        .master_flat(&frames_of(&data), &bias, &FilterId::new("Sloan_g"))
        .unwrap();
    assert_abs_diff_eq!(nan_median(&flat), 1.0, epsilon = 1e-5);
    // Shape of the illumination survives normalisation.
    let ratio = flat[[8, 10]] / flat[[0, 0]];
    assert_abs_diff_eq!(ratio, vig[[8, 10]] / vig[[0, 0]], epsilon = 1e-4);
}

// ---------------------------------------------------------------------------
// Cleaner
// ---------------------------------------------------------------------------

#[test]
fn test_cleaner_round_trip() {
    let bias = Array2::from_shape_fn((6, 7), |(r, c)| 300.0 + (r * c) as f32 * 0.5);
    let flat = vignetting(6, 7);
    let signal = Array2::from_shape_fn((6, 7), |(r, c)| 50.0 + (r + 2 * c) as f32);
    let raw = &bias + &(&signal * &flat);

    let cleaner = FrameCleaner::new(&bias);
    let cleaned = cleaner
        .clean(&Frame::new(raw.clone(), "sci.fits"), Some(&flat))
        .unwrap();
    for (a, b) in cleaned.data.iter().zip(signal.iter()) {
        assert_abs_diff_eq!(a, b, epsilon = 1e-3);
    }

    // No flat: bias subtraction only.
    let debiased = cleaner.clean(&Frame::new(raw.clone(), "sci.fits"), None).unwrap();
    assert_abs_diff_eq!(debiased.data[[2, 3]], raw[[2, 3]] - bias[[2, 3]], epsilon = 1e-4);
    assert_eq!(debiased.source, std::path::PathBuf::from("sci.fits"));
}

#[test]
fn test_cleaner_shape_mismatch() {
    let bias = make_frame(4, 4, 0.0);
    let cleaner = FrameCleaner::new(&bias);
    let frame = Frame::new(make_frame(5, 4, 1.0), "x.fits");
    assert!(matches!(
        cleaner.clean(&frame, None),
        Err(ReductionError::ShapeMismatch { .. })
    ));
}
