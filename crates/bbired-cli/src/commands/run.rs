use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use bbired_core::pipeline::config::{Observation, PipelineConfig};
use bbired_core::pipeline::{run_reduction_reported, ProgressReporter, ReductionStage};
use chrono::Local;
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};

use super::load_config;
use crate::summary::{print_report, print_run_summary};

#[derive(Args)]
pub struct RunArgs {
    /// Program identifier
    #[arg(long)]
    pub program: String,

    /// Observation block identifier
    #[arg(long)]
    pub block: String,

    /// Pipeline config file (TOML, or JSON with a .json extension)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Root directory holding <program>_<block>/raw
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Bad-pixel mask FITS file
    #[arg(long)]
    pub mask: Option<PathBuf>,

    /// Do not write a log file into the observation directory
    #[arg(long)]
    pub no_log_file: bool,
}

/// Configuration resolved before logging starts.
pub struct PreparedRun {
    pub config: PipelineConfig,
    pub observation: Observation,
    pub log_file: Option<PathBuf>,
}

pub fn prepare(args: &RunArgs) -> Result<PreparedRun> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(ref dir) = args.data_dir {
        config.directories.path_data = dir.clone();
    }
    if let Some(ref mask) = args.mask {
        config.directories.path_bpm = Some(mask.clone());
    }

    let observation = Observation::new(&args.program, &args.block);
    let obs_dir = config.directories.observation_dir(&observation);
    let log_file = (!args.no_log_file && obs_dir.is_dir()).then(|| {
        obs_dir.join(format!("bbired_{}.log", Local::now().format("%Y%m%d_%H%M%S")))
    });

    Ok(PreparedRun {
        config,
        observation,
        log_file,
    })
}

/// Drives an indicatif bar from reduction progress events.
struct BarReporter {
    bar: ProgressBar,
}

impl ProgressReporter for BarReporter {
    fn begin_stage(&self, stage: ReductionStage, total_items: Option<usize>) {
        self.bar.set_length(total_items.unwrap_or(1) as u64);
        self.bar.set_position(0);
        self.bar.set_message(stage.to_string());
    }

    fn advance(&self, items_done: usize) {
        self.bar.set_position(items_done as u64);
    }

    fn finish_stage(&self) {
        if let Some(len) = self.bar.length() {
            self.bar.set_position(len);
        }
    }
}

pub fn run(prepared: PreparedRun) -> Result<()> {
    let PreparedRun {
        config,
        observation,
        log_file,
    } = prepared;
    print_run_summary(&config, &observation, log_file.as_deref());

    let bar = ProgressBar::new(1);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{msg:24} [{bar:40}] {pos}/{len}")?
            .progress_chars("=> "),
    );
    let reporter = Arc::new(BarReporter { bar: bar.clone() });

    let report = run_reduction_reported(&config, &observation, reporter).with_context(|| {
        format!(
            "Reduction of {} failed",
            config.directories.observation_dir(&observation).display()
        )
    })?;
    bar.finish_with_message("Done");

    print_report(&report);
    Ok(())
}
