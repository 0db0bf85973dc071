use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use ndarray::{s, Array2};
use serde::{Deserialize, Serialize};

use crate::consts::{EXPTIME_KEY, OBJECT_KEY, OBSMODE_KEY, OPEN_FILTER};
use crate::error::{ReductionError, Result};
use crate::io::fits::FitsReader;
use crate::io::header::FitsHeader;

/// A single detector frame in physical units (ADU), shape = (rows, cols).
#[derive(Clone, Debug)]
pub struct Frame {
    pub data: Array2<f32>,
    /// Raw file this frame was derived from.
    pub source: PathBuf,
}

impl Frame {
    pub fn new(data: Array2<f32>, source: impl Into<PathBuf>) -> Self {
        Self {
            data,
            source: source.into(),
        }
    }

    /// Same provenance, new pixels.
    pub fn with_data(&self, data: Array2<f32>) -> Self {
        Self {
            data,
            source: self.source.clone(),
        }
    }

    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    pub fn height(&self) -> usize {
        self.data.nrows()
    }
}

/// Useful detector window as half-open row and column ranges.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrimSection {
    pub row_start: usize,
    pub row_end: usize,
    pub col_start: usize,
    pub col_end: usize,
}

impl TrimSection {
    pub fn shape(&self) -> (usize, usize) {
        (
            self.row_end.saturating_sub(self.row_start),
            self.col_end.saturating_sub(self.col_start),
        )
    }

    /// Crop `data` to this window.
    pub fn apply(&self, data: &Array2<f32>, path: &Path) -> Result<Array2<f32>> {
        let (h, w) = data.dim();
        if self.row_end > h
            || self.col_end > w
            || self.row_start >= self.row_end
            || self.col_start >= self.col_end
        {
            return Err(ReductionError::InvalidFits {
                path: path.to_path_buf(),
                reason: format!(
                    "trim window rows {}..{} cols {}..{} does not fit a {}x{} array",
                    self.row_start, self.row_end, self.col_start, self.col_end, h, w
                ),
            });
        }
        Ok(data
            .slice(s![self.row_start..self.row_end, self.col_start..self.col_end])
            .to_owned())
    }
}

/// Filter-wheel slot in the instrument header (`FILTER1`..`FILTER4`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FilterSlot {
    Filter1,
    Filter2,
    Filter3,
    Filter4,
}

impl FilterSlot {
    /// Slots in the order they are checked for active filters.
    pub const PRIORITY: [FilterSlot; 4] = [
        FilterSlot::Filter1,
        FilterSlot::Filter2,
        FilterSlot::Filter3,
        FilterSlot::Filter4,
    ];

    pub fn keyword(self) -> &'static str {
        match self {
            Self::Filter1 => "FILTER1",
            Self::Filter2 => "FILTER2",
            Self::Filter3 => "FILTER3",
            Self::Filter4 => "FILTER4",
        }
    }
}

impl fmt::Display for FilterSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.keyword())
    }
}

/// Name of a filter as recorded in the header.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FilterId(String);

impl FilterId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Empty wheel position.
    pub fn is_open(&self) -> bool {
        self.0.eq_ignore_ascii_case(OPEN_FILTER)
    }
}

impl fmt::Display for FilterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for FilterId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Observation category of a raw frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FrameKind {
    Bias,
    Flat,
    Std,
    Target,
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bias => write!(f, "bias"),
            Self::Flat => write!(f, "flat"),
            Self::Std => write!(f, "std"),
            Self::Target => write!(f, "target"),
        }
    }
}

/// Inventory bucket: bias frames have no filter dimension.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FrameKey {
    Bias,
    Flat(FilterId),
    Std(FilterId),
    Target(FilterId),
}

impl FrameKey {
    pub fn new(kind: FrameKind, filter: FilterId) -> Self {
        match kind {
            FrameKind::Bias => Self::Bias,
            FrameKind::Flat => Self::Flat(filter),
            FrameKind::Std => Self::Std(filter),
            FrameKind::Target => Self::Target(filter),
        }
    }

    pub fn kind(&self) -> FrameKind {
        match self {
            Self::Bias => FrameKind::Bias,
            Self::Flat(_) => FrameKind::Flat,
            Self::Std(_) => FrameKind::Std,
            Self::Target(_) => FrameKind::Target,
        }
    }

    pub fn filter(&self) -> Option<&FilterId> {
        match self {
            Self::Bias => None,
            Self::Flat(f) | Self::Std(f) | Self::Target(f) => Some(f),
        }
    }
}

impl fmt::Display for FrameKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.filter() {
            Some(filter) => write!(f, "{}[{}]", self.kind(), filter),
            None => write!(f, "{}", self.kind()),
        }
    }
}

/// Header-level view of a raw exposure. Pixels are decoded on demand.
pub struct RawFrame {
    reader: FitsReader,
}

impl RawFrame {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            reader: FitsReader::open(path)?,
        })
    }

    pub fn path(&self) -> &Path {
        self.reader.path()
    }

    pub fn header(&self) -> &FitsHeader {
        &self.reader.header
    }

    /// Array shape as (rows, cols).
    pub fn shape(&self) -> (usize, usize) {
        self.reader.shape()
    }

    pub fn bitpix(&self) -> i64 {
        self.reader.bitpix()
    }

    pub fn obs_mode(&self) -> Option<&str> {
        self.header().get_str(OBSMODE_KEY)
    }

    pub fn filter(&self, slot: FilterSlot) -> Option<FilterId> {
        self.header().get_str(slot.keyword()).map(FilterId::from)
    }

    pub fn object(&self) -> Option<&str> {
        self.header().get_str(OBJECT_KEY)
    }

    pub fn exposure_time(&self) -> Option<f64> {
        self.header().get_f64(EXPTIME_KEY)
    }

    /// Decode the full array.
    pub fn read_data(&mut self) -> Result<Array2<f32>> {
        self.reader.read_image()
    }

    /// Decode and crop to the useful detector window.
    pub fn read_trimmed(&mut self, trim: &TrimSection) -> Result<Array2<f32>> {
        let data = self.read_data()?;
        trim.apply(&data, self.path())
    }
}

/// Derived frames per bucket; element `i` corresponds to raw path `i` of the
/// same key in the inventory.
pub type FrameSet = BTreeMap<FrameKey, Vec<Frame>>;
