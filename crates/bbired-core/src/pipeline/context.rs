use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;

use ndarray::Array2;

use crate::background::Background;
use crate::calib::MasterCalibrations;
use crate::error::{ReductionError, Result};
use crate::frame::{FilterId, FrameSet};
use crate::inventory::FrameInventory;
use crate::mask::BadPixelMask;

use super::types::PipelineWarning;

/// Position of a run in the fixed stage order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReductionState {
    Classified,
    MastersBuilt,
    Cleaned,
    Scrubbed,
    FringeCorrected,
    SkySubtracted,
    Persisted,
}

impl ReductionState {
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Classified => Some(Self::MastersBuilt),
            Self::MastersBuilt => Some(Self::Cleaned),
            Self::Cleaned => Some(Self::Scrubbed),
            Self::Scrubbed => Some(Self::FringeCorrected),
            Self::FringeCorrected => Some(Self::SkySubtracted),
            Self::SkySubtracted => Some(Self::Persisted),
            Self::Persisted => None,
        }
    }
}

impl fmt::Display for ReductionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Classified => "classified",
            Self::MastersBuilt => "masters-built",
            Self::Cleaned => "cleaned",
            Self::Scrubbed => "scrubbed",
            Self::FringeCorrected => "fringe-corrected",
            Self::SkySubtracted => "sky-subtracted",
            Self::Persisted => "persisted",
        };
        write!(f, "{name}")
    }
}

/// Everything a run has produced so far. Each stage consumes the context and
/// returns it with its own fragment filled in and the state advanced by one.
#[derive(Clone, Debug)]
pub struct PipelineContext {
    state: ReductionState,
    pub inventory: FrameInventory,
    pub mask: BadPixelMask,
    pub masters: Option<MasterCalibrations>,
    /// Filters dropped after a per-filter failure.
    pub failed_filters: BTreeSet<FilterId>,
    pub cleaned: FrameSet,
    pub scrubbed: FrameSet,
    pub cosmic_rays_flagged: usize,
    pub fringe_free: FrameSet,
    pub fringe_templates: BTreeMap<FilterId, Array2<f32>>,
    pub sky_subtracted: FrameSet,
    pub backgrounds: BTreeMap<FilterId, Background>,
    pub written: Vec<PathBuf>,
    pub warnings: Vec<PipelineWarning>,
}

impl PipelineContext {
    pub fn new(inventory: FrameInventory, mask: BadPixelMask) -> Self {
        Self {
            state: ReductionState::Classified,
            inventory,
            mask,
            masters: None,
            failed_filters: BTreeSet::new(),
            cleaned: FrameSet::new(),
            scrubbed: FrameSet::new(),
            cosmic_rays_flagged: 0,
            fringe_free: FrameSet::new(),
            fringe_templates: BTreeMap::new(),
            sky_subtracted: FrameSet::new(),
            backgrounds: BTreeMap::new(),
            written: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn state(&self) -> ReductionState {
        self.state
    }

    fn advance(mut self, to: ReductionState) -> Result<Self> {
        if self.state.next() != Some(to) {
            return Err(ReductionError::InvalidTransition {
                from: self.state,
                to,
            });
        }
        self.state = to;
        Ok(self)
    }

    pub fn is_usable(&self, filter: &FilterId) -> bool {
        !self.failed_filters.contains(filter)
    }

    pub fn with_masters(
        self,
        masters: MasterCalibrations,
        failed: BTreeSet<FilterId>,
        warnings: Vec<PipelineWarning>,
    ) -> Result<Self> {
        let mut ctx = self.advance(ReductionState::MastersBuilt)?;
        ctx.masters = Some(masters);
        ctx.failed_filters.extend(failed);
        ctx.warnings.extend(warnings);
        Ok(ctx)
    }

    pub fn with_cleaned(self, cleaned: FrameSet, warnings: Vec<PipelineWarning>) -> Result<Self> {
        let mut ctx = self.advance(ReductionState::Cleaned)?;
        ctx.cleaned = cleaned;
        ctx.warnings.extend(warnings);
        Ok(ctx)
    }

    pub fn with_scrubbed(
        self,
        scrubbed: FrameSet,
        flagged: usize,
        warnings: Vec<PipelineWarning>,
    ) -> Result<Self> {
        let mut ctx = self.advance(ReductionState::Scrubbed)?;
        ctx.scrubbed = scrubbed;
        ctx.cosmic_rays_flagged = flagged;
        ctx.warnings.extend(warnings);
        Ok(ctx)
    }

    pub fn with_fringe(
        self,
        fringe_free: FrameSet,
        templates: BTreeMap<FilterId, Array2<f32>>,
        warnings: Vec<PipelineWarning>,
    ) -> Result<Self> {
        let mut ctx = self.advance(ReductionState::FringeCorrected)?;
        ctx.fringe_free = fringe_free;
        ctx.fringe_templates = templates;
        ctx.warnings.extend(warnings);
        Ok(ctx)
    }

    pub fn with_sky(
        self,
        sky_subtracted: FrameSet,
        backgrounds: BTreeMap<FilterId, Background>,
        warnings: Vec<PipelineWarning>,
    ) -> Result<Self> {
        let mut ctx = self.advance(ReductionState::SkySubtracted)?;
        ctx.sky_subtracted = sky_subtracted;
        ctx.backgrounds = backgrounds;
        ctx.warnings.extend(warnings);
        Ok(ctx)
    }

    pub fn with_written(self, written: Vec<PathBuf>, warnings: Vec<PipelineWarning>) -> Result<Self> {
        let mut ctx = self.advance(ReductionState::Persisted)?;
        ctx.written = written;
        ctx.warnings.extend(warnings);
        Ok(ctx)
    }
}
