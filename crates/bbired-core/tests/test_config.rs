use std::path::PathBuf;

use bbired_core::frame::TrimSection;
use bbired_core::pipeline::config::{Observation, PipelineConfig};

#[test]
fn test_defaults() {
    let config = PipelineConfig::default();
    assert!(!config.reduction.scrub_cosmic_rays);
    assert!(config.reduction.use_bias && config.reduction.use_flat);
    assert!(config.reduction.save_not_sky);
    assert!(!config.reduction.save_masters);
    assert_eq!(
        config.instrument.trim,
        TrimSection {
            row_start: 230,
            row_end: 2026,
            col_start: 28,
            col_end: 2060,
        }
    );
    assert_eq!(config.instrument.fringe_filter().as_str(), "Sloan_z");
    assert_eq!(config.background.box_size, 64);
    assert!(config.directories.path_bpm.is_none());
}

#[test]
fn test_default_toml_round_trip() {
    let config = PipelineConfig::default();
    let text = toml::to_string_pretty(&config).unwrap();
    let parsed: PipelineConfig = toml::from_str(&text).unwrap();
    assert_eq!(parsed.instrument.trim, config.instrument.trim);
    assert_eq!(parsed.reduction.contrast, config.reduction.contrast);
    assert_eq!(parsed.instrument.bpm_name, "BPM_5sig");
}

#[test]
fn test_partial_toml_fills_defaults() {
    let text = r#"
        [directories]
        path_data = "/data/osiris"

        [reduction]
        scrub_cosmic_rays = true
        save_std = false

        [background]
        box_size = 32
    "#;
    let config: PipelineConfig = toml::from_str(text).unwrap();
    assert_eq!(config.directories.path_data, PathBuf::from("/data/osiris"));
    assert!(config.reduction.scrub_cosmic_rays);
    assert!(!config.reduction.save_std);
    assert!(config.reduction.save_sky);
    assert_eq!(config.background.box_size, 32);
    assert_eq!(config.background.filter_size, 3);
    assert_eq!(config.instrument.image_mode, "OsirisBroadBandImage");
}

#[test]
fn test_legacy_json_keys() {
    let text = r#"{
        "DIRECTORIES": {
            "PATH_DATA": "/home/obs/data",
            "PATH_BPM": "/home/obs/BPM_OSIRIS_PLUS.fits"
        },
        "REDUCTION": {
            "no_CRs": true,
            "contrast": 2.0,
            "cr_threshold": 6.0,
            "neighbor_threshold": 4.0,
            "use_BIAS": true,
            "use_FLAT": false,
            "use_STD": false,
            "apply_flat": false,
            "save_std": false,
            "save_sky": true,
            "save_fringing": false,
            "save_not_sky": true
        }
    }"#;
    let config: PipelineConfig = serde_json::from_str(text).unwrap();
    assert_eq!(config.directories.path_data, PathBuf::from("/home/obs/data"));
    assert_eq!(
        config.directories.mask_path(),
        Some(std::path::Path::new("/home/obs/BPM_OSIRIS_PLUS.fits"))
    );
    assert!(config.reduction.scrub_cosmic_rays);
    assert!(!config.reduction.use_flat);
    assert!(!config.reduction.use_std);
    assert!(!config.reduction.save_fringing);

    let params = config.cosmic_ray_params();
    assert_eq!(params.contrast, 2.0);
    assert_eq!(params.cr_threshold, 6.0);
    assert_eq!(params.neighbor_threshold, 4.0);
    assert_eq!(params.effective_gain, 1.9);
}

#[test]
fn test_observation_paths() {
    let mut config = PipelineConfig::default();
    config.directories.path_data = PathBuf::from("/data");
    let obs = Observation::new("GTC2022", "OB0001");
    assert_eq!(obs.dir_name(), "GTC2022_OB0001");
    assert_eq!(
        config.directories.raw_dir(&obs),
        PathBuf::from("/data/GTC2022_OB0001/raw")
    );
    assert_eq!(
        config.directories.reduced_dir(&obs),
        PathBuf::from("/data/GTC2022_OB0001/reduced")
    );
}
