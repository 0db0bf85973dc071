#![allow(dead_code)]

use std::path::{Path, PathBuf};

use bbired_core::frame::{Frame, TrimSection};
use bbired_core::io::{write_fits, Card, FitsHeader};
use bbired_core::pipeline::config::{InstrumentConfig, PipelineConfig};
use ndarray::Array2;

/// Raw frame size used by the synthetic observation blocks.
pub const RAW_SHAPE: (usize, usize) = (40, 44);

/// Trim window of the synthetic detector: 32x36 useful pixels.
pub fn small_trim() -> TrimSection {
    TrimSection {
        row_start: 4,
        row_end: 36,
        col_start: 4,
        col_end: 40,
    }
}

/// Defaults with the detector geometry shrunk to the synthetic frames.
pub fn small_config(data_dir: &Path) -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.directories.path_data = data_dir.to_path_buf();
    config.instrument = InstrumentConfig {
        trim: small_trim(),
        ..InstrumentConfig::default()
    };
    config.background.box_size = 16;
    config
}

pub fn make_frame(rows: usize, cols: usize, value: f32) -> Array2<f32> {
    Array2::from_elem((rows, cols), value)
}

/// Smooth, strictly positive pattern with a median close to 1.0.
pub fn vignetting(rows: usize, cols: usize) -> Array2<f32> {
    Array2::from_shape_fn((rows, cols), |(r, c)| {
        let dr = r as f32 / rows as f32 - 0.5;
        let dc = c as f32 / cols as f32 - 0.5;
        1.05 - 0.3 * (dr * dr + dc * dc)
    })
}

pub fn frames_of(data: &[Array2<f32>]) -> Vec<Frame> {
    data.iter()
        .enumerate()
        .map(|(i, d)| Frame::new(d.clone(), format!("frame_{i}.fits")))
        .collect()
}

/// Header fields of a synthetic raw exposure.
pub struct RawSpec<'a> {
    pub obs_mode: &'a str,
    pub filters: [&'a str; 4],
    pub object: &'a str,
    pub exptime: f64,
}

impl<'a> RawSpec<'a> {
    pub fn bias() -> Self {
        Self {
            obs_mode: "OsirisBias",
            filters: ["OPEN", "OPEN", "OPEN", "OPEN"],
            object: "BIAS",
            exptime: 0.0,
        }
    }

    pub fn flat(filter: &'a str) -> Self {
        Self {
            obs_mode: "OsirisSkyFlat",
            filters: ["OPEN", filter, "OPEN", "OPEN"],
            object: "SKYFLAT",
            exptime: 2.0,
        }
    }

    pub fn science(filter: &'a str, object: &'a str) -> Self {
        Self {
            obs_mode: "OsirisBroadBandImage",
            filters: ["OPEN", filter, "OPEN", "OPEN"],
            object,
            exptime: 60.0,
        }
    }
}

pub fn raw_header(spec: &RawSpec) -> FitsHeader {
    let mut header = FitsHeader::new();
    header.push(Card::new("OBSMODE", spec.obs_mode));
    for (i, f) in spec.filters.iter().enumerate() {
        header.push(Card::new(&format!("FILTER{}", i + 1), *f));
    }
    header.push(Card::new("OBJECT", spec.object));
    header.push(Card::new("EXPTIME", spec.exptime));
    header.push(Card::new("CTYPE1", "RA---TAN"));
    header.push(Card::new("CTYPE2", "DEC--TAN"));
    header.push(Card::new("CRPIX1", 22.0));
    header.push(Card::new("CRPIX2", 20.0));
    header.push(Card::new("CRVAL1", 150.0));
    header.push(Card::new("CRVAL2", 2.0));
    header.push(Card::new("CD1_1", -7.0e-5));
    header.push(Card::new("CD1_2", 0.0));
    header.push(Card::new("CD2_1", 0.0));
    header.push(Card::new("CD2_2", 7.0e-5));
    header
}

pub fn write_raw(dir: &Path, name: &str, data: &Array2<f32>, spec: &RawSpec) -> PathBuf {
    let path = dir.join(name);
    write_fits(&path, data, &raw_header(spec)).expect("write synthetic frame");
    path
}

/// Block `<program>_<block>/raw` under `root` with 3 bias, 3 flats per filter,
/// 3 science and 1 standard-star frame per filter, and one frame of an
/// unknown observation mode. The block is fully consistent:
/// `raw = bias + sky * vignetting`.
pub fn write_observation_block(root: &Path, program: &str, block: &str) -> PathBuf {
    let raw_dir = root.join(format!("{program}_{block}")).join("raw");
    std::fs::create_dir_all(&raw_dir).expect("create raw dir");
    let (rows, cols) = RAW_SHAPE;
    let bias = make_frame(rows, cols, 300.0);
    let vig = vignetting(rows, cols);

    for i in 0..3 {
        write_raw(&raw_dir, &format!("bias_{i}.fits"), &bias, &RawSpec::bias());
    }
    for filter in ["Sloan_r", "Sloan_z"] {
        for (i, level) in [9000.0f32, 10000.0, 11000.0].iter().enumerate() {
            let flat = &bias + &(&vig * *level);
            write_raw(&raw_dir, &format!("flat_{filter}_{i}.fits"), &flat, &RawSpec::flat(filter));
        }
        for (i, sky) in [500.0f32, 520.0, 540.0].iter().enumerate() {
            let sci = &bias + &(&vig * *sky);
            write_raw(
                &raw_dir,
                &format!("sci_{filter}_{i}.fits"),
                &sci,
                &RawSpec::science(filter, "NGC_2403"),
            );
        }
        let std = &bias + &(&vig * 200.0);
        write_raw(
            &raw_dir,
            &format!("std_{filter}.fits"),
            &std,
            &RawSpec::science(filter, "SA95_STD"),
        );
    }
    let dark = RawSpec {
        obs_mode: "OsirisDark",
        ..RawSpec::bias()
    };
    write_raw(&raw_dir, "dark_0.fits", &bias, &dark);
    raw_dir
}
