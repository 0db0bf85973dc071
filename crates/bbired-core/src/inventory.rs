//! Raw-frame discovery and classification.
//!
//! A raw directory is scanned once (headers only). The active filter wheel is
//! the first `FILTERn` slot carrying a non-`OPEN` value on some non-bias
//! frame; every recognised frame then lands in exactly one [`FrameKey`]
//! bucket.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{ReductionError, Result};
use crate::frame::{FilterId, FilterSlot, Frame, FrameKey, FrameKind, RawFrame, TrimSection};
use crate::pipeline::config::InstrumentConfig;

/// File extensions treated as FITS frames.
const FITS_EXTENSIONS: [&str; 4] = ["fits", "fit", "fts", "fits.gz"];

/// Header fields of one raw frame relevant to classification.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameRecord {
    pub path: PathBuf,
    pub obs_mode: Option<String>,
    pub filters: [Option<FilterId>; 4],
    pub object: Option<String>,
    pub exposure_time: Option<f64>,
}

impl FrameRecord {
    pub fn from_raw(raw: &RawFrame) -> Self {
        Self {
            path: raw.path().to_path_buf(),
            obs_mode: raw.obs_mode().map(str::to_string),
            filters: FilterSlot::PRIORITY.map(|slot| raw.filter(slot)),
            object: raw.object().map(str::to_string),
            exposure_time: raw.exposure_time(),
        }
    }

    pub fn filter(&self, slot: FilterSlot) -> Option<&FilterId> {
        let idx = FilterSlot::PRIORITY
            .iter()
            .position(|&s| s == slot)
            .unwrap_or(0);
        self.filters[idx].as_ref()
    }

    fn has_mode(&self, mode: &str) -> bool {
        self.obs_mode.as_deref() == Some(mode)
    }
}

/// Observation-mode strings and the standard-star marker used to sort frames.
#[derive(Clone, Debug)]
pub struct ClassificationRules {
    pub bias_mode: String,
    pub flat_mode: String,
    pub image_mode: String,
    pub std_marker: String,
}

impl From<&InstrumentConfig> for ClassificationRules {
    fn from(cfg: &InstrumentConfig) -> Self {
        Self {
            bias_mode: cfg.bias_mode.clone(),
            flat_mode: cfg.flat_mode.clone(),
            image_mode: cfg.image_mode.clone(),
            std_marker: cfg.std_marker.clone(),
        }
    }
}

impl Default for ClassificationRules {
    fn default() -> Self {
        Self::from(&InstrumentConfig::default())
    }
}

/// Raw frames of one observation block sorted into buckets.
#[derive(Clone, Debug)]
pub struct FrameInventory {
    pub active_slot: FilterSlot,
    buckets: BTreeMap<FrameKey, Vec<PathBuf>>,
    records: BTreeMap<PathBuf, FrameRecord>,
    /// Frames whose observation mode or filter value is not recognised.
    pub unclassified: Vec<PathBuf>,
    /// std/target branches for which no object name matched.
    failed_branches: BTreeMap<FrameKind, String>,
}

impl FrameInventory {
    /// Scan `dir` and classify every FITS frame found there.
    pub fn from_directory(dir: &Path, rules: &ClassificationRules) -> Result<Self> {
        let records = scan_directory(dir)?;
        classify(records, rules)
    }

    pub fn keys(&self) -> impl Iterator<Item = &FrameKey> {
        self.buckets.keys()
    }

    /// Paths of a bucket, empty when the key does not exist.
    pub fn paths(&self, key: &FrameKey) -> &[PathBuf] {
        self.buckets.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn contains(&self, key: &FrameKey) -> bool {
        self.buckets.contains_key(key)
    }

    pub fn record(&self, path: &Path) -> Option<&FrameRecord> {
        self.records.get(path)
    }

    /// Distinct values of the active slot, in sorted order.
    pub fn filters(&self) -> Vec<FilterId> {
        let set: BTreeSet<FilterId> = self
            .buckets
            .keys()
            .filter_map(|k| k.filter().cloned())
            .collect();
        set.into_iter().collect()
    }

    /// Keys of one kind, with their paths.
    pub fn buckets_of(&self, kind: FrameKind) -> impl Iterator<Item = (&FrameKey, &[PathBuf])> {
        self.buckets
            .iter()
            .filter(move |(k, _)| k.kind() == kind)
            .map(|(k, v)| (k, v.as_slice()))
    }

    /// Decode and trim every frame of a bucket, in inventory order.
    pub fn load(&self, key: &FrameKey, trim: &TrimSection) -> Result<Vec<Frame>> {
        self.paths(key)
            .iter()
            .map(|path| {
                let mut raw = RawFrame::open(path)?;
                Ok(Frame::new(raw.read_trimmed(trim)?, path.clone()))
            })
            .collect()
    }

    pub fn total_frames(&self) -> usize {
        self.records.len()
    }

    /// The classification failure of a std/target branch, if any.
    pub fn branch_error(&self, kind: FrameKind) -> Option<ReductionError> {
        self.failed_branches
            .get(&kind)
            .map(|reason| ReductionError::Classification {
                branch: kind.to_string(),
                reason: reason.clone(),
            })
    }
}

/// List FITS files in `dir` (sorted by name) and read their headers.
pub fn scan_directory(dir: &Path) -> Result<Vec<FrameRecord>> {
    if !dir.is_dir() {
        return Err(ReductionError::Configuration(format!(
            "raw data directory {} does not exist",
            dir.display()
        )));
    }

    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && is_fits_path(p))
        .collect();
    paths.sort();

    let mut records = Vec::with_capacity(paths.len());
    for path in paths {
        match RawFrame::open(&path) {
            Ok(raw) => records.push(FrameRecord::from_raw(&raw)),
            Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable frame"),
        }
    }

    if records.is_empty() {
        return Err(ReductionError::Configuration(format!(
            "no frames to reduce in {}",
            dir.display()
        )));
    }
    info!(frames = records.len(), dir = %dir.display(), "Data collection is ready");
    Ok(records)
}

fn is_fits_path(path: &Path) -> bool {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    FITS_EXTENSIONS
        .iter()
        .any(|ext| name.ends_with(&format!(".{ext}")))
}

/// First slot, in priority order, with a non-`OPEN` value on a non-bias frame.
pub fn resolve_active_slot(records: &[FrameRecord], rules: &ClassificationRules) -> Result<FilterSlot> {
    FilterSlot::PRIORITY
        .into_iter()
        .find(|&slot| {
            records
                .iter()
                .filter(|r| !r.has_mode(&rules.bias_mode))
                .filter_map(|r| r.filter(slot))
                .any(|f| !f.is_open())
        })
        .ok_or_else(|| {
            ReductionError::Configuration(
                "incompatible filter setup: every filter wheel is OPEN".into(),
            )
        })
}

/// Sort records into buckets. Bias frames ignore the filter dimension;
/// science-mode frames split into std/target by the object-name marker.
pub fn classify(records: Vec<FrameRecord>, rules: &ClassificationRules) -> Result<FrameInventory> {
    if records.is_empty() {
        return Err(ReductionError::Configuration("raw-frame inventory is empty".into()));
    }
    let active_slot = resolve_active_slot(&records, rules)?;
    info!(slot = %active_slot, "Active filter wheel resolved");

    let filter_values: BTreeSet<FilterId> = records
        .iter()
        .filter(|r| !r.has_mode(&rules.bias_mode))
        .filter_map(|r| r.filter(active_slot).cloned())
        .collect();

    let mut buckets: BTreeMap<FrameKey, Vec<PathBuf>> = BTreeMap::new();
    for value in &filter_values {
        for kind in [FrameKind::Flat, FrameKind::Std, FrameKind::Target] {
            buckets.insert(FrameKey::new(kind, value.clone()), Vec::new());
        }
    }
    buckets.insert(FrameKey::Bias, Vec::new());

    let science_objects: BTreeSet<&str> = records
        .iter()
        .filter(|r| r.has_mode(&rules.image_mode))
        .filter_map(|r| r.object.as_deref())
        .collect();
    let std_objects: Vec<&str> = science_objects
        .iter()
        .copied()
        .filter(|o| o.contains(&rules.std_marker))
        .collect();
    let target_objects: Vec<&str> = science_objects
        .iter()
        .copied()
        .filter(|o| !o.contains(&rules.std_marker))
        .collect();

    let mut failed_branches = BTreeMap::new();
    for (kind, names) in [(FrameKind::Std, &std_objects), (FrameKind::Target, &target_objects)] {
        match names.len() {
            0 => {
                let reason = format!(
                    "no {} object name among {:?}",
                    if kind == FrameKind::Std { "standard-star" } else { "science" },
                    science_objects
                );
                warn!(branch = %kind, %reason, "Classification failed");
                failed_branches.insert(kind, reason);
            }
            1 => debug!(branch = %kind, object = names[0], "Object resolved"),
            _ => warn!(branch = %kind, objects = ?names, "Several object names match one branch; all are kept"),
        }
    }

    let mut unclassified = Vec::new();
    for record in &records {
        let key = if record.has_mode(&rules.bias_mode) {
            Some(FrameKey::Bias)
        } else {
            record.filter(active_slot).and_then(|filter| {
                if record.has_mode(&rules.flat_mode) {
                    Some(FrameKey::Flat(filter.clone()))
                } else if record.has_mode(&rules.image_mode) {
                    let object = record.object.as_deref()?;
                    if object.contains(&rules.std_marker) {
                        Some(FrameKey::Std(filter.clone()))
                    } else {
                        Some(FrameKey::Target(filter.clone()))
                    }
                } else {
                    None
                }
            })
        };

        match key.and_then(|k| buckets.get_mut(&k)) {
            Some(bucket) => bucket.push(record.path.clone()),
            None => {
                debug!(path = %record.path.display(), mode = ?record.obs_mode, "Frame not classified");
                unclassified.push(record.path.clone());
            }
        }
    }

    for (key, paths) in &buckets {
        info!(bucket = %key, frames = paths.len(), "Bucket populated");
    }
    if !unclassified.is_empty() {
        warn!(count = unclassified.len(), "Frames left unclassified");
    }

    let records = records.into_iter().map(|r| (r.path.clone(), r)).collect();
    Ok(FrameInventory {
        active_slot,
        buckets,
        records,
        unclassified,
        failed_branches,
    })
}
