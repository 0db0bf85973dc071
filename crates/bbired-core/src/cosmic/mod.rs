//! Cosmic-ray scrubbing of cleaned frames.

pub mod filters;
pub mod lacosmic;

use thiserror::Error;
use tracing::{info, warn};

use crate::consts::{
    CR_MAX_ITERATIONS, DEFAULT_CR_CONTRAST, DEFAULT_CR_NEIGHBOR_THRESHOLD, DEFAULT_CR_THRESHOLD,
    DEFAULT_EFFECTIVE_GAIN, DEFAULT_READ_NOISE,
};
use crate::frame::Frame;
use crate::stats::{nan_median, replace_non_finite};

pub use lacosmic::{detect_and_clean, CosmicRayResult};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CosmicRayParams {
    /// Minimum Laplacian-to-fine-structure contrast of a hit.
    pub contrast: f32,
    /// Laplacian signal-to-noise threshold of a hit.
    pub cr_threshold: f32,
    /// Signal-to-noise threshold for pixels grown onto a hit.
    pub neighbor_threshold: f32,
    /// e-/ADU
    pub effective_gain: f32,
    /// e-
    pub read_noise: f32,
    pub max_iterations: usize,
}

impl Default for CosmicRayParams {
    fn default() -> Self {
        Self {
            contrast: DEFAULT_CR_CONTRAST,
            cr_threshold: DEFAULT_CR_THRESHOLD,
            neighbor_threshold: DEFAULT_CR_NEIGHBOR_THRESHOLD,
            effective_gain: DEFAULT_EFFECTIVE_GAIN,
            read_noise: DEFAULT_READ_NOISE,
            max_iterations: CR_MAX_ITERATIONS,
        }
    }
}

/// Reasons the detector declines a frame.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CosmicRayError {
    #[error("image of {rows}x{cols} pixels is too small for detection")]
    DegenerateInput { rows: usize, cols: usize },

    #[error("{count} non-finite pixel(s) in input")]
    NonFinite { count: usize },

    #[error("invalid parameter {name} = {value}")]
    InvalidParameter { name: &'static str, value: f32 },
}

/// One scrubbed frame and what happened to it.
#[derive(Clone, Debug)]
pub struct ScrubOutcome {
    pub frame: Frame,
    pub flagged: usize,
    /// Set when detection failed; `frame` is then the NaN-substituted input.
    pub failure: Option<CosmicRayError>,
}

/// NaN substitution followed, when enabled, by L.A.Cosmic.
#[derive(Clone, Debug)]
pub struct CosmicRayScrubber {
    params: CosmicRayParams,
    enabled: bool,
}

impl CosmicRayScrubber {
    pub fn new(params: CosmicRayParams, enabled: bool) -> Self {
        Self { params, enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn scrub(&self, frame: &Frame) -> ScrubOutcome {
        let filled = replace_non_finite(&frame.data, nan_median(&frame.data));
        if !self.enabled {
            return ScrubOutcome {
                frame: frame.with_data(filled),
                flagged: 0,
                failure: None,
            };
        }

        match detect_and_clean(&filled, &self.params) {
            Ok(result) => {
                let flagged = result.flagged();
                info!(
                    frame = %frame.source.display(),
                    flagged,
                    iterations = result.iterations,
                    "Cosmic rays removed"
                );
                ScrubOutcome {
                    frame: frame.with_data(result.cleaned),
                    flagged,
                    failure: None,
                }
            }
            Err(e) => {
                warn!(frame = %frame.source.display(), error = %e, "Cosmic-ray detection failed");
                ScrubOutcome {
                    frame: frame.with_data(filled),
                    flagged: 0,
                    failure: Some(e),
                }
            }
        }
    }
}
