//! Sky background estimation and subtraction.
//!
//! The sky is measured on a coarse grid of tiles (sigma-clipped mode per
//! tile), the grid is median-filtered to suppress tiles contaminated by
//! bright sources, and a bicubic natural-spline surface through the tile
//! centres is evaluated at every pixel.

pub mod mesh;
pub mod spline;

use ndarray::Array2;
use tracing::info;

use crate::error::{ReductionError, Result};
use crate::frame::{FilterId, Frame};
use crate::pipeline::config::BackgroundConfig;
use crate::stack::median_stack;
use crate::stats::nan_median;

use mesh::{filter_grid, measure_tiles};
use spline::NaturalSpline;

/// Full-resolution sky model.
#[derive(Clone, Debug)]
pub struct Background {
    pub surface: Array2<f32>,
    pub rms: Array2<f32>,
    pub global_level: f32,
    pub global_rms: f32,
}

#[derive(Clone, Debug)]
pub struct BackgroundEstimator {
    box_size: usize,
    filter_size: usize,
}

impl Default for BackgroundEstimator {
    fn default() -> Self {
        Self::from(&BackgroundConfig::default())
    }
}

impl From<&BackgroundConfig> for BackgroundEstimator {
    fn from(cfg: &BackgroundConfig) -> Self {
        Self {
            box_size: cfg.box_size,
            filter_size: cfg.filter_size,
        }
    }
}

impl BackgroundEstimator {
    pub fn new(box_size: usize, filter_size: usize) -> Self {
        Self {
            box_size,
            filter_size,
        }
    }

    pub fn estimate(&self, data: &Array2<f32>) -> Result<Background> {
        if self.box_size == 0 {
            return Err(ReductionError::Configuration(
                "background box size must be positive".into(),
            ));
        }
        let (h, w) = data.dim();
        if h == 0 || w == 0 {
            return Err(ReductionError::Degenerate {
                what: "background".into(),
                reason: "empty image".into(),
            });
        }
        let grid = measure_tiles(data, self.box_size).ok_or_else(|| ReductionError::Degenerate {
            what: "background".into(),
            reason: "no tile has enough finite pixels".into(),
        })?;

        let level = filter_grid(&grid.level, self.filter_size);
        let rms_grid = filter_grid(&grid.rms, self.filter_size);
        let surface = interpolate(&level, &grid.centers_y, &grid.centers_x, (h, w))?;
        let rms = interpolate(&rms_grid, &grid.centers_y, &grid.centers_x, (h, w))?;

        let background = Background {
            surface,
            rms,
            global_level: nan_median(&level),
            global_rms: nan_median(&rms_grid),
        };
        info!(
            tiles_y = level.nrows(),
            tiles_x = level.ncols(),
            level = background.global_level,
            rms = background.global_rms,
            "Background estimated"
        );
        Ok(background)
    }
}

/// Separable spline interpolation of a tile grid to `shape`: columns first,
/// then rows. Pixel `i` is sampled at its centre `i + 0.5`.
fn interpolate(
    grid: &Array2<f32>,
    centers_y: &[f64],
    centers_x: &[f64],
    shape: (usize, usize),
) -> Result<Array2<f32>> {
    let (h, w) = shape;
    let (ny, nx) = grid.dim();
    let bad_knots = || ReductionError::Degenerate {
        what: "background".into(),
        reason: "tile centres are not increasing".into(),
    };

    let mut columns = Array2::<f64>::zeros((h, nx));
    for tx in 0..nx {
        let y: Vec<f64> = (0..ny).map(|ty| grid[[ty, tx]] as f64).collect();
        let spline = NaturalSpline::new(centers_y, &y).ok_or_else(bad_knots)?;
        for row in 0..h {
            columns[[row, tx]] = spline.evaluate(row as f64 + 0.5);
        }
    }

    let mut out = Array2::<f32>::zeros((h, w));
    for row in 0..h {
        let y: Vec<f64> = columns.row(row).to_vec();
        let spline = NaturalSpline::new(centers_x, &y).ok_or_else(bad_knots)?;
        for col in 0..w {
            out[[row, col]] = spline.evaluate(col as f64 + 0.5) as f32;
        }
    }
    Ok(out)
}

/// Sky-subtracted frames of one filter and the background they share.
#[derive(Clone, Debug)]
pub struct SkySubtraction {
    pub background: Background,
    pub frames: Vec<Frame>,
}

/// Estimates one background from the median of a filter's frames and
/// subtracts it from every frame of that filter.
#[derive(Clone, Debug, Default)]
pub struct SkyBackgroundSubtractor {
    estimator: BackgroundEstimator,
}

impl SkyBackgroundSubtractor {
    pub fn new(estimator: BackgroundEstimator) -> Self {
        Self { estimator }
    }

    /// `Ok(None)` when `frames` is empty.
    pub fn subtract(&self, filter: &FilterId, frames: &[Frame]) -> Result<Option<SkySubtraction>> {
        if frames.is_empty() {
            return Ok(None);
        }
        let stack: Vec<&Array2<f32>> = frames.iter().map(|f| &f.data).collect();
        let average = median_stack(&stack)?;
        let background = self.estimator.estimate(&average)?;

        let frames = frames
            .iter()
            .map(|f| {
                if f.data.dim() != background.surface.dim() {
                    return Err(ReductionError::ShapeMismatch {
                        expected: background.surface.dim(),
                        got: f.data.dim(),
                    });
                }
                Ok(f.with_data(&f.data - &background.surface))
            })
            .collect::<Result<Vec<_>>>()?;
        info!(%filter, frames = frames.len(), level = background.global_level, "Sky subtracted");
        Ok(Some(SkySubtraction { background, frames }))
    }
}
