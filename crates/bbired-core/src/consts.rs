/// Filter-wheel value reported for an empty wheel position.
pub const OPEN_FILTER: &str = "OPEN";

/// Header keyword holding the observation mode.
pub const OBSMODE_KEY: &str = "OBSMODE";

/// Header keyword holding the target name.
pub const OBJECT_KEY: &str = "OBJECT";

/// Header keyword holding the exposure time in seconds.
pub const EXPTIME_KEY: &str = "EXPTIME";

/// Observation mode of zero-second bias exposures.
pub const DEFAULT_BIAS_MODE: &str = "OsirisBias";

/// Observation mode of twilight sky flats.
pub const DEFAULT_FLAT_MODE: &str = "OsirisSkyFlat";

/// Observation mode shared by science and standard-star exposures.
pub const DEFAULT_IMAGE_MODE: &str = "OsirisBroadBandImage";

/// Substring of the object name that marks a photometric standard star.
pub const DEFAULT_STD_MARKER: &str = "STD";

/// Filter known to show an interference fringe pattern.
pub const DEFAULT_FRINGE_FILTER: &str = "Sloan_z";

/// Useful detector window, rows then columns, half-open.
pub const DEFAULT_TRIM_ROWS: (usize, usize) = (230, 2026);
pub const DEFAULT_TRIM_COLS: (usize, usize) = (28, 2060);

/// Effective detector gain (e-/ADU) used by the cosmic-ray noise model.
pub const DEFAULT_EFFECTIVE_GAIN: f32 = 1.9;

/// Detector read noise (e-) used by the cosmic-ray noise model.
pub const DEFAULT_READ_NOISE: f32 = 4.3;

/// Default cosmic-ray detection parameters.
pub const DEFAULT_CR_CONTRAST: f32 = 1.5;
pub const DEFAULT_CR_THRESHOLD: f32 = 5.0;
pub const DEFAULT_CR_NEIGHBOR_THRESHOLD: f32 = 5.0;

/// Maximum number of detect-and-replace passes of the cosmic-ray scrubber.
pub const CR_MAX_ITERATIONS: usize = 4;

/// Identifier stamped into BPMNAME.
pub const DEFAULT_BPM_NAME: &str = "BPM_5sig";

/// Background tile edge length in pixels.
pub const DEFAULT_BACKGROUND_BOX: usize = 64;

/// Median filter size applied to the background tile grid.
pub const DEFAULT_BACKGROUND_FILTER: usize = 3;

/// Sigma-clipping threshold for background tile statistics.
pub const BACKGROUND_CLIP_SIGMA: f64 = 3.0;

/// Maximum number of clipping passes per background tile.
pub const BACKGROUND_CLIP_ITERATIONS: usize = 20;

/// Minimum fraction of finite pixels for a background tile to be used.
pub const BACKGROUND_MIN_GOOD_FRACTION: f64 = 0.5;

/// Crowding limit `|mean - median| / sigma` above which the median is used
/// instead of the mode estimate.
pub const BACKGROUND_CROWDING_LIMIT: f64 = 0.3;

/// Minimum frames for the trimmed-median combine (one low and one high value
/// are discarded per pixel).
pub const MIN_TRIMMED_FRAMES: usize = 3;

/// Date format for the RDATE card.
pub const RDATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Percentile bounds for quicklook stretches.
pub const QUICKLOOK_LOW_PERCENTILE: f32 = 0.001;
pub const QUICKLOOK_HIGH_PERCENTILE: f32 = 0.999;

/// Small epsilon to avoid division by zero in floating-point comparisons.
pub const EPSILON: f32 = 1e-10;
