use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::{info, warn};

use crate::background::{BackgroundEstimator, SkyBackgroundSubtractor};
use crate::calib::{FrameCleaner, MasterCalibrationBuilder, MasterCalibrations};
use crate::cosmic::CosmicRayScrubber;
use crate::error::Result;
use crate::frame::{FilterId, Frame, FrameKey, FrameKind, FrameSet};
use crate::fringe::FringeCorrector;
use crate::inventory::{ClassificationRules, FrameInventory};
use crate::mask::{load_bad_pixel_mask, BadPixelMask};
use crate::persist::{FramePersister, OutputVariant};

use super::config::{Observation, PipelineConfig};
use super::context::PipelineContext;
use super::types::{NoOpReporter, PipelineWarning, ProgressReporter, ReductionReport, ReductionStage};

/// Reduce one observation block without progress reporting.
pub fn run_reduction(config: &PipelineConfig, observation: &Observation) -> Result<ReductionReport> {
    run_reduction_reported(config, observation, Arc::new(NoOpReporter))
}

/// Reduce one observation block: classify, build masters, clean, scrub,
/// defringe, subtract sky and write the requested variants.
pub fn run_reduction_reported(
    config: &PipelineConfig,
    observation: &Observation,
    reporter: Arc<dyn ProgressReporter>,
) -> Result<ReductionReport> {
    let raw_dir = config.directories.raw_dir(observation);
    let results_dir = config.directories.reduced_dir(observation);
    info!(
        program = %observation.program,
        block = %observation.block,
        raw = %raw_dir.display(),
        "Starting reduction"
    );

    reporter.begin_stage(ReductionStage::Inventory, None);
    let ctx = classify(config, &raw_dir)?;
    reporter.finish_stage();

    let ctx = build_masters(config, ctx, &reporter)?;
    let ctx = clean_frames(config, ctx, &reporter)?;
    let ctx = scrub_frames(config, ctx, &reporter)?;
    let ctx = correct_fringing(config, ctx, &reporter)?;
    let ctx = subtract_sky(config, ctx, &reporter)?;

    let persister = FramePersister::new(
        observation.clone(),
        results_dir,
        config.instrument.trim,
        config.instrument.bpm_name.clone(),
    )
    .with_quicklook(config.reduction.quicklook);
    let ctx = persist(config, ctx, &persister, &reporter)?;

    for warning in &ctx.warnings {
        warn!(%warning, "Reduction warning");
    }
    info!(
        files = ctx.written.len(),
        warnings = ctx.warnings.len(),
        "Reduction complete"
    );

    Ok(ReductionReport {
        observation: observation.clone(),
        active_slot: ctx.inventory.active_slot,
        filters: ctx.inventory.filters(),
        frames_found: ctx.inventory.total_frames(),
        cosmic_rays_flagged: ctx.cosmic_rays_flagged,
        written: ctx.written,
        warnings: ctx.warnings,
    })
}

fn classify(config: &PipelineConfig, raw_dir: &std::path::Path) -> Result<PipelineContext> {
    let rules = ClassificationRules::from(&config.instrument);
    let inventory = FrameInventory::from_directory(raw_dir, &rules)?;

    // No science target at all leaves nothing to reduce.
    if let Some(err) = inventory.branch_error(FrameKind::Target) {
        return Err(err);
    }

    let trim = &config.instrument.trim;
    let mask = match config.directories.mask_path() {
        Some(path) => load_bad_pixel_mask(path, trim)?,
        None => {
            info!("No bad-pixel mask configured");
            BadPixelMask::all_good(trim.shape())
        }
    };

    let mut ctx = PipelineContext::new(inventory, mask);
    if config.reduction.use_std {
        if let Some(err) = ctx.inventory.branch_error(FrameKind::Std) {
            ctx.warnings.push(PipelineWarning::Classification {
                branch: FrameKind::Std,
                reason: err.to_string(),
            });
        }
    }
    if !ctx.inventory.unclassified.is_empty() {
        ctx.warnings.push(PipelineWarning::Unclassified {
            count: ctx.inventory.unclassified.len(),
        });
    }
    Ok(ctx)
}

fn build_masters(
    config: &PipelineConfig,
    ctx: PipelineContext,
    reporter: &Arc<dyn ProgressReporter>,
) -> Result<PipelineContext> {
    let trim = &config.instrument.trim;
    let builder = MasterCalibrationBuilder::new(&ctx.mask);

    reporter.begin_stage(ReductionStage::MasterBias, None);
    let bias = if config.reduction.use_bias {
        builder.master_bias(&ctx.inventory.load(&FrameKey::Bias, trim)?)?
    } else {
        info!("Bias subtraction disabled, zero bias used");
        builder.zero_bias()
    };
    reporter.finish_stage();

    let mut flats = BTreeMap::new();
    let mut failed = BTreeSet::new();
    let mut warnings = Vec::new();
    if config.reduction.use_flat {
        let filters: Vec<FilterId> = ctx
            .inventory
            .filters()
            .into_iter()
            .filter(|f| !f.is_open())
            .collect();
        reporter.begin_stage(ReductionStage::MasterFlats, Some(filters.len()));
        for (i, filter) in filters.into_iter().enumerate() {
            let key = FrameKey::Flat(filter.clone());
            if ctx.inventory.paths(&key).is_empty() {
                warn!(%filter, "No flat frames, flat-field of 1.0 used");
                warnings.push(PipelineWarning::NeutralFlat { filter });
                continue;
            }
            let flat = ctx
                .inventory
                .load(&key, trim)
                .and_then(|frames| builder.master_flat(&frames, &bias, &filter));
            match flat {
                Ok(flat) => {
                    flats.insert(filter, flat);
                }
                Err(e) => {
                    warn!(%filter, error = %e, "Master flat failed, filter dropped");
                    warnings.push(PipelineWarning::PerFilterFailure {
                        filter: filter.clone(),
                        stage: ReductionStage::MasterFlats,
                        reason: e.to_string(),
                    });
                    failed.insert(filter);
                }
            }
            reporter.advance(i + 1);
        }
        reporter.finish_stage();
    } else {
        info!("Flat-fielding disabled");
    }

    ctx.with_masters(MasterCalibrations { bias, flats }, failed, warnings)
}

/// Keys whose frames go through cleaning: every target bucket and, when
/// enabled and classified, every std bucket, minus failed filters.
fn science_keys(config: &PipelineConfig, ctx: &PipelineContext) -> Vec<FrameKey> {
    let std_ok = config.reduction.use_std && ctx.inventory.branch_error(FrameKind::Std).is_none();
    ctx.inventory
        .keys()
        .filter(|k| match k.kind() {
            FrameKind::Target => true,
            FrameKind::Std => std_ok,
            _ => false,
        })
        .filter(|k| k.filter().is_some_and(|f| ctx.is_usable(f)))
        .filter(|k| !ctx.inventory.paths(k).is_empty())
        .cloned()
        .collect()
}

fn clean_frames(
    config: &PipelineConfig,
    ctx: PipelineContext,
    reporter: &Arc<dyn ProgressReporter>,
) -> Result<PipelineContext> {
    let keys = science_keys(config, &ctx);
    reporter.begin_stage(ReductionStage::Cleaning, Some(keys.len()));
    let (cleaned, warnings) = match ctx.masters.as_ref() {
        Some(masters) => clean_buckets(config, &ctx.inventory, masters, &keys, reporter),
        None => (FrameSet::new(), Vec::new()),
    };
    reporter.finish_stage();
    ctx.with_cleaned(cleaned, warnings)
}

fn clean_buckets(
    config: &PipelineConfig,
    inventory: &FrameInventory,
    masters: &MasterCalibrations,
    keys: &[FrameKey],
    reporter: &Arc<dyn ProgressReporter>,
) -> (FrameSet, Vec<PipelineWarning>) {
    let cleaner = FrameCleaner::new(&masters.bias);
    let mut cleaned = FrameSet::new();
    let mut warnings = Vec::new();
    for (i, key) in keys.iter().enumerate() {
        let Some(filter) = key.filter() else { continue };
        let flat = if config.reduction.apply_flat {
            masters.flat_for(filter)
        } else {
            None
        };
        let result = inventory
            .load(key, &config.instrument.trim)
            .and_then(|frames| cleaner.clean_all(&frames, flat));
        match result {
            Ok(frames) => {
                info!(bucket = %key, frames = frames.len(), "Frames cleaned");
                cleaned.insert(key.clone(), frames);
            }
            Err(e) => {
                warn!(bucket = %key, error = %e, "Cleaning failed");
                warnings.push(PipelineWarning::PerFilterFailure {
                    filter: filter.clone(),
                    stage: ReductionStage::Cleaning,
                    reason: e.to_string(),
                });
            }
        }
        reporter.advance(i + 1);
    }
    (cleaned, warnings)
}

fn scrub_frames(
    config: &PipelineConfig,
    ctx: PipelineContext,
    reporter: &Arc<dyn ProgressReporter>,
) -> Result<PipelineContext> {
    let scrubber = CosmicRayScrubber::new(
        config.cosmic_ray_params(),
        config.reduction.scrub_cosmic_rays,
    );
    let total: usize = ctx.cleaned.values().map(Vec::len).sum();
    let mut scrubbed = FrameSet::new();
    let mut warnings = Vec::new();
    let mut flagged = 0;
    let mut done = 0;

    if !scrubber.is_enabled() {
        info!("Cosmic-ray removal disabled, NaN substitution only");
    }
    reporter.begin_stage(ReductionStage::CosmicRays, Some(total));
    for (key, frames) in &ctx.cleaned {
        let mut out = Vec::with_capacity(frames.len());
        for frame in frames {
            let outcome = scrubber.scrub(frame);
            flagged += outcome.flagged;
            if let Some(failure) = outcome.failure {
                warnings.push(PipelineWarning::ArtifactDetectionFailure {
                    frame: frame.source.clone(),
                    reason: failure.to_string(),
                });
            }
            out.push(outcome.frame);
            done += 1;
            reporter.advance(done);
        }
        scrubbed.insert(key.clone(), out);
    }
    reporter.finish_stage();
    ctx.with_scrubbed(scrubbed, flagged, warnings)
}

fn correct_fringing(
    config: &PipelineConfig,
    ctx: PipelineContext,
    reporter: &Arc<dyn ProgressReporter>,
) -> Result<PipelineContext> {
    let mut fringe_free = FrameSet::new();
    let mut templates = BTreeMap::new();
    let mut warnings = Vec::new();

    if !config.reduction.save_fringing {
        return ctx.with_fringe(fringe_free, templates, warnings);
    }

    let corrector = FringeCorrector::new(config.instrument.fringe_filter());
    reporter.begin_stage(ReductionStage::Fringe, None);
    let key = FrameKey::Target(corrector.filter().clone());
    if let Some(frames) = ctx.scrubbed.get(&key) {
        match corrector.correct(frames) {
            Ok(Some(correction)) => {
                templates.insert(corrector.filter().clone(), correction.template);
                fringe_free.insert(key, correction.frames);
            }
            Ok(None) => {}
            Err(e) => {
                warn!(filter = %corrector.filter(), error = %e, "Fringe correction failed");
                warnings.push(PipelineWarning::PerFilterFailure {
                    filter: corrector.filter().clone(),
                    stage: ReductionStage::Fringe,
                    reason: e.to_string(),
                });
            }
        }
    }
    reporter.finish_stage();
    ctx.with_fringe(fringe_free, templates, warnings)
}

fn subtract_sky(
    config: &PipelineConfig,
    ctx: PipelineContext,
    reporter: &Arc<dyn ProgressReporter>,
) -> Result<PipelineContext> {
    let mut sky_subtracted = FrameSet::new();
    let mut backgrounds = BTreeMap::new();
    let mut warnings = Vec::new();

    if !config.reduction.save_not_sky {
        return ctx.with_sky(sky_subtracted, backgrounds, warnings);
    }

    let subtractor = SkyBackgroundSubtractor::new(BackgroundEstimator::from(&config.background));
    let targets: Vec<&FrameKey> = ctx
        .scrubbed
        .keys()
        .filter(|k| k.kind() == FrameKind::Target)
        .collect();
    reporter.begin_stage(ReductionStage::Sky, Some(targets.len()));
    for (i, key) in targets.into_iter().enumerate() {
        let Some(filter) = key.filter() else { continue };
        let frames = ctx
            .fringe_free
            .get(key)
            .or_else(|| ctx.scrubbed.get(key))
            .map(Vec::as_slice)
            .unwrap_or_default();
        match subtractor.subtract(filter, frames) {
            Ok(Some(sky)) => {
                backgrounds.insert(filter.clone(), sky.background);
                sky_subtracted.insert(key.clone(), sky.frames);
            }
            Ok(None) => {}
            Err(e) => {
                warn!(%filter, error = %e, "Sky subtraction failed");
                warnings.push(PipelineWarning::PerFilterFailure {
                    filter: filter.clone(),
                    stage: ReductionStage::Sky,
                    reason: e.to_string(),
                });
            }
        }
        reporter.advance(i + 1);
    }
    reporter.finish_stage();
    ctx.with_sky(sky_subtracted, backgrounds, warnings)
}

fn persist(
    config: &PipelineConfig,
    ctx: PipelineContext,
    persister: &FramePersister,
    reporter: &Arc<dyn ProgressReporter>,
) -> Result<PipelineContext> {
    let reduction = &config.reduction;
    let mut jobs: Vec<(OutputVariant, &FrameKey, &[Frame])> = Vec::new();
    for (key, frames) in &ctx.scrubbed {
        match key.kind() {
            FrameKind::Std if reduction.use_std && reduction.save_std => {
                jobs.push((OutputVariant::Std, key, frames))
            }
            FrameKind::Target if reduction.save_sky => {
                jobs.push((OutputVariant::ScienceSky, key, frames))
            }
            _ => {}
        }
    }
    if reduction.save_fringing {
        for (key, frames) in &ctx.fringe_free {
            jobs.push((OutputVariant::FringeFree, key, frames));
        }
    }
    if reduction.save_not_sky {
        for (key, frames) in &ctx.sky_subtracted {
            jobs.push((OutputVariant::ScienceNoSky, key, frames));
        }
    }

    let mut written = Vec::new();
    let mut warnings = Vec::new();
    reporter.begin_stage(ReductionStage::Writing, Some(jobs.len()));
    for (i, (variant, key, frames)) in jobs.iter().enumerate() {
        let Some(filter) = key.filter() else { continue };
        match persister.write_variant(*variant, filter, frames) {
            Ok(paths) => written.extend(paths),
            Err(e) => {
                warn!(bucket = %key, %variant, error = %e, "Writing failed");
                warnings.push(PipelineWarning::PerFilterFailure {
                    filter: filter.clone(),
                    stage: ReductionStage::Writing,
                    reason: e.to_string(),
                });
            }
        }
        reporter.advance(i + 1);
    }

    if reduction.save_masters {
        if let Some(masters) = ctx.masters.as_ref() {
            let mut products = vec![("MasterBias".to_string(), &masters.bias)];
            products.extend(
                masters
                    .flats
                    .iter()
                    .map(|(f, flat)| (format!("MasterFlat_{f}"), flat)),
            );
            products.extend(
                ctx.fringe_templates
                    .iter()
                    .map(|(f, tpl)| (format!("MasterFringe_{f}"), tpl)),
            );
            for (name, data) in products {
                // A failed calibration product does not invalidate the frames.
                match persister.save_master(&name, data) {
                    Ok(paths) => written.extend(paths),
                    Err(e) => warn!(name, error = %e, "Calibration product not written"),
                }
            }
        }
    }
    reporter.finish_stage();
    ctx.with_written(written, warnings)
}
