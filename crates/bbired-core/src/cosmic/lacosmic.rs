//! L.A.Cosmic detection and repair (van Dokkum 2001, PASP 113, 1420).
//!
//! Each pass works on a 2x supersampled copy so the Laplacian of a
//! single-pixel hit is not diluted by neighbouring pixels. Hits are selected
//! on Laplacian signal-to-noise and on their contrast against the fine
//! structure of real sources, grown twice into neighbours, and replaced by the
//! median of surrounding good pixels before the next pass.

use ndarray::{Array2, Zip};
use tracing::debug;

use crate::stats::median_in_place;

use super::filters::{dilate3, downsample2, laplacian, median_filter, upsample2};
use super::{CosmicRayError, CosmicRayParams};

/// Noise floor of the 5x5 median used in the error model.
const MIN_NOISE_LEVEL: f32 = 1e-5;

/// Lower clip of the fine-structure image.
const MIN_FINE_STRUCTURE: f32 = 0.01;

/// Initial edge of the replacement window.
const REPLACE_WINDOW: usize = 5;

/// Output of [`detect_and_clean`].
#[derive(Clone, Debug)]
pub struct CosmicRayResult {
    pub cleaned: Array2<f32>,
    /// Every pixel flagged in any pass.
    pub mask: Array2<bool>,
    pub iterations: usize,
}

impl CosmicRayResult {
    pub fn flagged(&self) -> usize {
        self.mask.iter().filter(|&&v| v).count()
    }
}

fn validate(data: &Array2<f32>, params: &CosmicRayParams) -> Result<(), CosmicRayError> {
    let (rows, cols) = data.dim();
    if rows < 3 || cols < 3 {
        return Err(CosmicRayError::DegenerateInput { rows, cols });
    }
    let non_finite = data.iter().filter(|v| !v.is_finite()).count();
    if non_finite > 0 {
        return Err(CosmicRayError::NonFinite { count: non_finite });
    }
    let positive = [
        ("contrast", params.contrast),
        ("cr_threshold", params.cr_threshold),
        ("neighbor_threshold", params.neighbor_threshold),
        ("effective_gain", params.effective_gain),
    ];
    for (name, value) in positive {
        if !(value.is_finite() && value > 0.0) {
            return Err(CosmicRayError::InvalidParameter { name, value });
        }
    }
    if !(params.read_noise.is_finite() && params.read_noise >= 0.0) {
        return Err(CosmicRayError::InvalidParameter {
            name: "read_noise",
            value: params.read_noise,
        });
    }
    Ok(())
}

/// Flag cosmic-ray hits in `data` and replace them.
pub fn detect_and_clean(
    data: &Array2<f32>,
    params: &CosmicRayParams,
) -> Result<CosmicRayResult, CosmicRayError> {
    validate(data, params)?;

    let gain = params.effective_gain;
    let rn2 = params.read_noise * params.read_noise;
    let mut clean = data.clone();
    let mut final_mask = Array2::from_elem(data.dim(), false);
    let mut iterations = 0;

    for pass in 0..params.max_iterations {
        iterations = pass + 1;

        let lap = downsample2(&laplacian(&upsample2(&clean)).mapv(|v| v.max(0.0)));

        let noise = median_filter(&clean, 5)
            .mapv(|v| (gain * v.max(MIN_NOISE_LEVEL) + rn2).sqrt() / gain);

        let mut snr = Zip::from(&lap).and(&noise).map_collect(|&l, &n| l / (2.0 * n));
        let snr_background = median_filter(&snr, 5);
        snr -= &snr_background;

        let med3 = median_filter(&clean, 3);
        let med7 = median_filter(&med3, 7);
        let fine = Zip::from(&med3)
            .and(&med7)
            .and(&noise)
            .map_collect(|&m3, &m7, &n| ((m3 - m7) / n).max(MIN_FINE_STRUCTURE));

        let candidates = snr.mapv(|s| s > params.cr_threshold);
        let mut hits = Zip::from(&candidates)
            .and(&snr)
            .and(&fine)
            .map_collect(|&c, &s, &f| c && s / f > params.contrast);

        hits = Zip::from(&dilate3(&hits))
            .and(&candidates)
            .map_collect(|&d, &c| d && c);
        hits = Zip::from(&dilate3(&hits))
            .and(&snr)
            .map_collect(|&d, &s| d && s > params.neighbor_threshold);

        let mut new_hits = 0usize;
        Zip::from(&mut final_mask).and(&hits).for_each(|f, &h| {
            if h && !*f {
                new_hits += 1;
            }
            *f |= h;
        });
        debug!(pass = iterations, new_hits, "Cosmic-ray pass");

        if new_hits == 0 {
            break;
        }
        clean = replace_masked(&clean, &final_mask);
    }

    Ok(CosmicRayResult {
        cleaned: clean,
        mask: final_mask,
        iterations,
    })
}

/// Replace each masked pixel with the median of unmasked pixels in a square
/// window, widening the window by 2 until at least one good pixel exists.
fn replace_masked(data: &Array2<f32>, mask: &Array2<bool>) -> Array2<f32> {
    let (h, w) = data.dim();
    let max_size = 2 * h.max(w) + 1;
    let mut out = data.clone();
    let mut good = Vec::new();

    for ((row, col), &flagged) in mask.indexed_iter() {
        if !flagged {
            continue;
        }
        let mut size = REPLACE_WINDOW;
        while size <= max_size {
            let half = size / 2;
            let r0 = row.saturating_sub(half);
            let c0 = col.saturating_sub(half);
            let r1 = (row + half).min(h - 1);
            let c1 = (col + half).min(w - 1);
            good.clear();
            for r in r0..=r1 {
                for c in c0..=c1 {
                    if !mask[[r, c]] {
                        good.push(data[[r, c]]);
                    }
                }
            }
            if !good.is_empty() {
                out[[row, col]] = median_in_place(&mut good);
                break;
            }
            size += 2;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_masked_uses_neighbours() {
        let mut data = Array2::from_elem((7, 7), 10.0f32);
        data[[3, 3]] = 1000.0;
        let mut mask = Array2::from_elem((7, 7), false);
        mask[[3, 3]] = true;
        let out = replace_masked(&data, &mask);
        assert_eq!(out[[3, 3]], 10.0);
    }

    #[test]
    fn test_replace_masked_grows_window() {
        let data = Array2::from_shape_fn((9, 9), |(r, c)| (r + c) as f32);
        let mut mask = Array2::from_elem((9, 9), true);
        mask[[0, 0]] = false;
        let out = replace_masked(&data, &mask);
        assert_eq!(out[[8, 8]], 0.0);
    }
}
