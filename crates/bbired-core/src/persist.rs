//! Writing reduced frames and calibration products.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::Utc;
use ndarray::Array2;
use tracing::{debug, info};

use crate::consts::{QUICKLOOK_HIGH_PERCENTILE, QUICKLOOK_LOW_PERCENTILE, RDATE_FORMAT};
use crate::error::Result;
use crate::frame::{FilterId, Frame, TrimSection};
use crate::io::header::FitsHeader;
use crate::io::quicklook::save_quicklook;
use crate::io::wcs::refresh_wcs;
use crate::io::{read_header, write_fits};
use crate::pipeline::config::Observation;

/// Reduced-frame products written to the results directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OutputVariant {
    /// Standard-star frames, sky included.
    Std,
    /// Science frames before sky subtraction.
    ScienceSky,
    /// Science frames after sky subtraction.
    ScienceNoSky,
    /// Fringe-corrected science frames, sky included.
    FringeFree,
}

impl OutputVariant {
    pub fn image_type(self) -> &'static str {
        match self {
            Self::Std => "STD",
            _ => "SCIENCE",
        }
    }

    pub fn stage_tag(self) -> &'static str {
        match self {
            Self::Std => "STD",
            Self::ScienceSky | Self::ScienceNoSky => "SCIENCE",
            Self::FringeFree => "FRINGEFREE",
        }
    }

    pub fn sky_tag(self) -> &'static str {
        match self {
            Self::ScienceNoSky => "NOSKY",
            _ => "SKY",
        }
    }
}

impl fmt::Display for OutputVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.stage_tag(), self.sky_tag())
    }
}

pub struct FramePersister {
    observation: Observation,
    results_dir: PathBuf,
    trim: TrimSection,
    bpm_name: String,
    quicklook: bool,
}

impl FramePersister {
    pub fn new(
        observation: Observation,
        results_dir: impl Into<PathBuf>,
        trim: TrimSection,
        bpm_name: impl Into<String>,
    ) -> Self {
        Self {
            observation,
            results_dir: results_dir.into(),
            trim,
            bpm_name: bpm_name.into(),
            quicklook: false,
        }
    }

    /// Also write PNG previews of calibration products.
    pub fn with_quicklook(mut self, enabled: bool) -> Self {
        self.quicklook = enabled;
        self
    }

    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    /// `ADP_<program>_<block>_<filter>_<stage>_<sky>_<raw stem>.fits`
    pub fn output_path(&self, variant: OutputVariant, filter: &FilterId, raw: &Path) -> PathBuf {
        let stem = raw
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("frame");
        self.results_dir.join(format!(
            "ADP_{}_{}_{}_{}_{}_{}.fits",
            self.observation.program,
            self.observation.block,
            filter,
            variant.stage_tag(),
            variant.sky_tag(),
            stem
        ))
    }

    /// Header of a reduced frame: the raw header with refreshed WCS and
    /// reduction stamps.
    pub fn reduced_header(
        &self,
        raw_header: &FitsHeader,
        variant: OutputVariant,
        filter: &FilterId,
    ) -> FitsHeader {
        let mut header = raw_header.clone();
        refresh_wcs(&mut header, raw_header, self.trim.row_start, self.trim.col_start);
        let rdate = Utc::now().format(RDATE_FORMAT).to_string();
        header.set("IMGTYPE", variant.image_type());
        header.set("STATUS", "REDUCED");
        header.set("SSKY", variant.sky_tag());
        header.set("BPMNAME", self.bpm_name.as_str());
        header.set("RDATE", rdate);
        header.set("FILTRO", filter.as_str());
        header
    }

    /// Write every frame of one variant; existing files are replaced.
    pub fn write_variant(
        &self,
        variant: OutputVariant,
        filter: &FilterId,
        frames: &[Frame],
    ) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(&self.results_dir)?;
        let mut written = Vec::with_capacity(frames.len());
        for frame in frames {
            let raw_header = read_header(&frame.source)?;
            let header = self.reduced_header(&raw_header, variant, filter);
            let path = self.output_path(variant, filter, &frame.source);
            write_fits(&path, &frame.data, &header)?;
            debug!(path = %path.display(), "Reduced frame written");
            written.push(path);
        }
        info!(%variant, %filter, files = written.len(), "Variant saved");
        Ok(written)
    }

    /// Write a calibration product as `<name>.fits` (and `<name>.png`).
    pub fn save_master(&self, name: &str, data: &Array2<f32>) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(&self.results_dir)?;
        let mut header = FitsHeader::new();
        header.set("IMGTYPE", name);
        header.set("BPMNAME", self.bpm_name.as_str());
        header.set("RDATE", Utc::now().format(RDATE_FORMAT).to_string());

        let fits_path = self.results_dir.join(format!("{name}.fits"));
        write_fits(&fits_path, data, &header)?;
        let mut written = vec![fits_path];
        if self.quicklook {
            let png_path = self.results_dir.join(format!("{name}.png"));
            save_quicklook(data, &png_path, QUICKLOOK_LOW_PERCENTILE, QUICKLOOK_HIGH_PERCENTILE)?;
            written.push(png_path);
        }
        info!(name, "Calibration product saved");
        Ok(written)
    }
}
