use std::path::PathBuf;

use thiserror::Error;

use crate::pipeline::ReductionState;

#[derive(Error, Debug)]
pub enum ReductionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid FITS file {path}: {reason}")]
    InvalidFits { path: PathBuf, reason: String },

    #[error("FITS error on {path}: {source}")]
    Fits {
        path: PathBuf,
        #[source]
        source: fitsio::errors::Error,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Classification error for {branch} frames: {reason}")]
    Classification { branch: String, reason: String },

    #[error("Cannot combine {what}: {got} frame(s) supplied, at least {needed} required")]
    Combine {
        what: String,
        got: usize,
        needed: usize,
    },

    #[error("Degenerate {what}: {reason}")]
    Degenerate { what: String, reason: String },

    #[error("Frame shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        got: (usize, usize),
    },

    #[error("Invalid pipeline transition from {from} to {to}")]
    InvalidTransition {
        from: ReductionState,
        to: ReductionState,
    },

    #[error("Image format error: {0}")]
    ImageError(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, ReductionError>;
