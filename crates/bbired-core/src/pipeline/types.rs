use std::fmt;
use std::path::PathBuf;

use crate::frame::{FilterId, FilterSlot, FrameKind};

use super::config::Observation;

/// Reduction stage, used for progress reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReductionStage {
    Inventory,
    MasterBias,
    MasterFlats,
    Cleaning,
    CosmicRays,
    Fringe,
    Sky,
    Writing,
}

impl fmt::Display for ReductionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inventory => write!(f, "Classifying frames"),
            Self::MasterBias => write!(f, "Building master bias"),
            Self::MasterFlats => write!(f, "Building master flats"),
            Self::Cleaning => write!(f, "Cleaning frames"),
            Self::CosmicRays => write!(f, "Removing cosmic rays"),
            Self::Fringe => write!(f, "Removing fringing"),
            Self::Sky => write!(f, "Subtracting sky"),
            Self::Writing => write!(f, "Writing output"),
        }
    }
}

/// Thread-safe progress reporting for the reduction.
///
/// All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    /// A new stage has started. `total_items` is the number of work items
    /// in this stage (e.g., frame count), if known.
    fn begin_stage(&self, _stage: ReductionStage, _total_items: Option<usize>) {}

    /// `items_done` work items of the current stage have completed.
    fn advance(&self, _items_done: usize) {}

    /// The current stage is finished.
    fn finish_stage(&self) {}
}

/// No-op progress reporter, used when `run_reduction` delegates.
pub(super) struct NoOpReporter;
impl ProgressReporter for NoOpReporter {}

/// Recoverable condition collected during a run.
#[derive(Clone, Debug, PartialEq)]
pub enum PipelineWarning {
    /// Cosmic-ray detection failed; the NaN-substituted frame was kept.
    ArtifactDetectionFailure { frame: PathBuf, reason: String },
    /// One filter was dropped from `stage` onwards.
    PerFilterFailure {
        filter: FilterId,
        stage: ReductionStage,
        reason: String,
    },
    /// A std branch had no matching object name and was skipped.
    Classification { branch: FrameKind, reason: String },
    /// No flat frames for this filter; it was flat-fielded by 1.0.
    NeutralFlat { filter: FilterId },
    /// Frames with an unrecognised observation mode.
    Unclassified { count: usize },
}

impl fmt::Display for PipelineWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ArtifactDetectionFailure { frame, reason } => write!(
                f,
                "cosmic-ray detection failed on {}: {reason}",
                frame.display()
            ),
            Self::PerFilterFailure {
                filter,
                stage,
                reason,
            } => write!(f, "{filter} dropped at '{stage}': {reason}"),
            Self::Classification { branch, reason } => {
                write!(f, "{branch} frames skipped: {reason}")
            }
            Self::NeutralFlat { filter } => {
                write!(f, "no flat frames for {filter}, flat-field of 1.0 used")
            }
            Self::Unclassified { count } => write!(f, "{count} frame(s) not classified"),
        }
    }
}

/// Outcome of a completed run.
#[derive(Clone, Debug)]
pub struct ReductionReport {
    pub observation: Observation,
    pub active_slot: FilterSlot,
    pub filters: Vec<FilterId>,
    pub frames_found: usize,
    pub cosmic_rays_flagged: usize,
    pub written: Vec<PathBuf>,
    pub warnings: Vec<PipelineWarning>,
}
