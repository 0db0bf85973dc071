use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::consts::{
    DEFAULT_BACKGROUND_BOX, DEFAULT_BACKGROUND_FILTER, DEFAULT_BIAS_MODE, DEFAULT_BPM_NAME,
    DEFAULT_CR_CONTRAST, DEFAULT_CR_NEIGHBOR_THRESHOLD, DEFAULT_CR_THRESHOLD,
    DEFAULT_EFFECTIVE_GAIN, DEFAULT_FLAT_MODE, DEFAULT_FRINGE_FILTER, DEFAULT_IMAGE_MODE,
    DEFAULT_READ_NOISE, DEFAULT_STD_MARKER, DEFAULT_TRIM_COLS, DEFAULT_TRIM_ROWS,
};
use crate::cosmic::CosmicRayParams;
use crate::frame::{FilterId, TrimSection};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default, alias = "DIRECTORIES")]
    pub directories: DirectoriesConfig,
    #[serde(default, alias = "REDUCTION")]
    pub reduction: ReductionConfig,
    #[serde(default)]
    pub instrument: InstrumentConfig,
    #[serde(default)]
    pub background: BackgroundConfig,
}

/// Observation being reduced: program and block identifiers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Observation {
    pub program: String,
    pub block: String,
}

impl Observation {
    pub fn new(program: impl Into<String>, block: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            block: block.into(),
        }
    }

    /// `<program>_<block>`, the per-observation directory name.
    pub fn dir_name(&self) -> String {
        format!("{}_{}", self.program, self.block)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DirectoriesConfig {
    /// Root holding one `<program>_<block>` directory per observation.
    #[serde(alias = "PATH_DATA")]
    pub path_data: PathBuf,
    /// Bad-pixel mask FITS file. Unset means no defective pixels.
    #[serde(default, alias = "PATH_BPM")]
    pub path_bpm: Option<PathBuf>,
}

impl Default for DirectoriesConfig {
    fn default() -> Self {
        Self {
            path_data: PathBuf::from("."),
            path_bpm: None,
        }
    }
}

impl DirectoriesConfig {
    pub fn observation_dir(&self, obs: &Observation) -> PathBuf {
        self.path_data.join(obs.dir_name())
    }

    pub fn raw_dir(&self, obs: &Observation) -> PathBuf {
        self.observation_dir(obs).join("raw")
    }

    pub fn reduced_dir(&self, obs: &Observation) -> PathBuf {
        self.observation_dir(obs).join("reduced")
    }

    pub fn mask_path(&self) -> Option<&Path> {
        self.path_bpm.as_deref()
    }
}

/// Stage switches and cosmic-ray parameters.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ReductionConfig {
    /// Run the cosmic-ray scrubber; when false only NaN substitution happens.
    #[serde(alias = "no_CRs")]
    pub scrub_cosmic_rays: bool,
    pub contrast: f32,
    pub cr_threshold: f32,
    pub neighbor_threshold: f32,
    /// Build a master bias; otherwise a zero bias carrying the mask is used.
    #[serde(alias = "use_BIAS")]
    pub use_bias: bool,
    /// Build master flats and flat-field with them.
    #[serde(alias = "use_FLAT")]
    pub use_flat: bool,
    /// Reduce standard-star frames.
    #[serde(alias = "use_STD")]
    pub use_std: bool,
    /// Divide science and standard-star frames by the master flat.
    pub apply_flat: bool,
    pub save_std: bool,
    /// Write science frames with the sky still in.
    pub save_sky: bool,
    /// Run fringe correction and write its results.
    pub save_fringing: bool,
    /// Run sky subtraction and write sky-subtracted frames.
    pub save_not_sky: bool,
    pub save_masters: bool,
    pub quicklook: bool,
}

impl Default for ReductionConfig {
    fn default() -> Self {
        Self {
            scrub_cosmic_rays: false,
            contrast: DEFAULT_CR_CONTRAST,
            cr_threshold: DEFAULT_CR_THRESHOLD,
            neighbor_threshold: DEFAULT_CR_NEIGHBOR_THRESHOLD,
            use_bias: true,
            use_flat: true,
            use_std: true,
            apply_flat: true,
            save_std: true,
            save_sky: true,
            save_fringing: true,
            save_not_sky: true,
            save_masters: false,
            quicklook: false,
        }
    }
}

/// Detector and observatory conventions.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct InstrumentConfig {
    pub trim: TrimSection,
    pub bias_mode: String,
    pub flat_mode: String,
    pub image_mode: String,
    pub std_marker: String,
    pub fringe_filter: String,
    pub effective_gain: f32,
    pub read_noise: f32,
    pub bpm_name: String,
}

impl Default for InstrumentConfig {
    fn default() -> Self {
        Self {
            trim: TrimSection {
                row_start: DEFAULT_TRIM_ROWS.0,
                row_end: DEFAULT_TRIM_ROWS.1,
                col_start: DEFAULT_TRIM_COLS.0,
                col_end: DEFAULT_TRIM_COLS.1,
            },
            bias_mode: DEFAULT_BIAS_MODE.into(),
            flat_mode: DEFAULT_FLAT_MODE.into(),
            image_mode: DEFAULT_IMAGE_MODE.into(),
            std_marker: DEFAULT_STD_MARKER.into(),
            fringe_filter: DEFAULT_FRINGE_FILTER.into(),
            effective_gain: DEFAULT_EFFECTIVE_GAIN,
            read_noise: DEFAULT_READ_NOISE,
            bpm_name: DEFAULT_BPM_NAME.into(),
        }
    }
}

impl InstrumentConfig {
    pub fn fringe_filter(&self) -> FilterId {
        FilterId::new(self.fringe_filter.clone())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BackgroundConfig {
    #[serde(default = "default_box_size")]
    pub box_size: usize,
    #[serde(default = "default_filter_size")]
    pub filter_size: usize,
}

fn default_box_size() -> usize {
    DEFAULT_BACKGROUND_BOX
}

fn default_filter_size() -> usize {
    DEFAULT_BACKGROUND_FILTER
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            box_size: DEFAULT_BACKGROUND_BOX,
            filter_size: DEFAULT_BACKGROUND_FILTER,
        }
    }
}

impl PipelineConfig {
    /// Cosmic-ray detector parameters from the reduction and instrument sections.
    pub fn cosmic_ray_params(&self) -> CosmicRayParams {
        CosmicRayParams {
            contrast: self.reduction.contrast,
            cr_threshold: self.reduction.cr_threshold,
            neighbor_threshold: self.reduction.neighbor_threshold,
            effective_gain: self.instrument.effective_gain,
            read_noise: self.instrument.read_noise,
            ..CosmicRayParams::default()
        }
    }
}
