use std::path::Path;

use bbired_core::frame::FrameKind;
use bbired_core::inventory::FrameInventory;
use bbired_core::pipeline::config::{Observation, PipelineConfig};
use bbired_core::pipeline::ReductionReport;
use console::Style;

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    enabled: Style,
    disabled: Style,
    warning: Style,
    path: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            enabled: Style::new().green(),
            disabled: Style::new().dim().yellow(),
            warning: Style::new().yellow().bold(),
            path: Style::new().underlined(),
        }
    }

    fn flag(&self, on: bool) -> console::StyledObject<&'static str> {
        if on {
            self.enabled.apply_to("on")
        } else {
            self.disabled.apply_to("off")
        }
    }
}

fn rule(s: &Styles, width: usize) {
    println!("  {}", s.title.apply_to("\u{2550}".repeat(width)));
}

pub fn print_run_summary(config: &PipelineConfig, obs: &Observation, log_file: Option<&Path>) {
    let s = Styles::new();
    let dirs = &config.directories;
    let red = &config.reduction;

    println!();
    println!("  {}", s.title.apply_to("bbired reduction"));
    rule(&s, 16);
    println!();
    println!("  {:<14}{}", s.label.apply_to("Program"), s.value.apply_to(&obs.program));
    println!("  {:<14}{}", s.label.apply_to("Block"), s.value.apply_to(&obs.block));
    println!(
        "  {:<14}{}",
        s.label.apply_to("Raw"),
        s.path.apply_to(dirs.raw_dir(obs).display())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Results"),
        s.path.apply_to(dirs.reduced_dir(obs).display())
    );
    match dirs.mask_path() {
        Some(p) => println!("  {:<14}{}", s.label.apply_to("Mask"), s.path.apply_to(p.display())),
        None => println!("  {:<14}{}", s.label.apply_to("Mask"), s.disabled.apply_to("none")),
    }
    if let Some(p) = log_file {
        println!("  {:<14}{}", s.label.apply_to("Log"), s.path.apply_to(p.display()));
    }
    println!();

    println!("  {}", s.header.apply_to("Calibration"));
    println!("    {:<16}{}", s.label.apply_to("Master bias"), s.flag(red.use_bias));
    println!("    {:<16}{}", s.label.apply_to("Master flats"), s.flag(red.use_flat));
    println!("    {:<16}{}", s.label.apply_to("Apply flat"), s.flag(red.apply_flat));
    println!();

    println!("  {}", s.header.apply_to("Cosmic rays"));
    if red.scrub_cosmic_rays {
        println!(
            "    {:<16}{}",
            s.label.apply_to("Contrast"),
            s.value.apply_to(red.contrast)
        );
        println!(
            "    {:<16}{}",
            s.label.apply_to("Threshold"),
            s.value.apply_to(red.cr_threshold)
        );
        println!(
            "    {:<16}{}",
            s.label.apply_to("Neighbour"),
            s.value.apply_to(red.neighbor_threshold)
        );
    } else {
        println!("    {}", s.disabled.apply_to("disabled"));
    }
    println!();

    println!("  {}", s.header.apply_to("Outputs"));
    println!("    {:<16}{}", s.label.apply_to("Standard stars"), s.flag(red.use_std && red.save_std));
    println!("    {:<16}{}", s.label.apply_to("With sky"), s.flag(red.save_sky));
    println!(
        "    {:<16}{} ({})",
        s.label.apply_to("Fringe-free"),
        s.flag(red.save_fringing),
        config.instrument.fringe_filter
    );
    println!("    {:<16}{}", s.label.apply_to("Sky-subtracted"), s.flag(red.save_not_sky));
    println!("    {:<16}{}", s.label.apply_to("Masters"), s.flag(red.save_masters));
    println!();
}

pub fn print_inventory(inventory: &FrameInventory) {
    let s = Styles::new();

    println!();
    println!("  {}", s.title.apply_to("Frame inventory"));
    rule(&s, 15);
    println!(
        "  {:<14}{}",
        s.label.apply_to("Filter wheel"),
        s.value.apply_to(inventory.active_slot)
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Frames"),
        s.value.apply_to(inventory.total_frames())
    );
    println!();

    println!(
        "    {:<6}{:>6}",
        s.label.apply_to("bias"),
        inventory.paths(&bbired_core::frame::FrameKey::Bias).len()
    );
    for filter in inventory.filters() {
        println!("  {}", s.header.apply_to(&filter));
        for (key, paths) in inventory
            .keys()
            .filter(|k| k.filter() == Some(&filter) && k.kind() != FrameKind::Bias)
            .map(|k| (k, inventory.paths(k)))
        {
            println!("    {:<6}{:>6}", s.label.apply_to(key.kind()), paths.len());
        }
    }
    if !inventory.unclassified.is_empty() {
        println!();
        println!(
            "  {} {}",
            s.warning.apply_to("Unclassified:"),
            inventory.unclassified.len()
        );
    }
    println!();
}

pub fn print_report(report: &ReductionReport) {
    let s = Styles::new();

    println!();
    println!("  {}", s.title.apply_to("Reduction report"));
    rule(&s, 16);
    println!(
        "  {:<14}{}",
        s.label.apply_to("Filter wheel"),
        s.value.apply_to(report.active_slot)
    );
    let filters: Vec<String> = report.filters.iter().map(ToString::to_string).collect();
    println!(
        "  {:<14}{}",
        s.label.apply_to("Filters"),
        s.value.apply_to(filters.join(", "))
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Raw frames"),
        s.value.apply_to(report.frames_found)
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Cosmic rays"),
        s.value.apply_to(report.cosmic_rays_flagged)
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Files written"),
        s.value.apply_to(report.written.len())
    );

    if !report.warnings.is_empty() {
        println!();
        println!("  {}", s.warning.apply_to("Warnings"));
        for w in &report.warnings {
            println!("    - {}", w);
        }
    }
    println!();
}
