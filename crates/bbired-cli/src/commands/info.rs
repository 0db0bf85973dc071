use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use bbired_core::frame::{FilterSlot, RawFrame};

#[derive(Args)]
pub struct InfoArgs {
    /// Input FITS file
    pub file: PathBuf,

    /// Print every carried header card
    #[arg(long)]
    pub cards: bool,
}

pub fn run(args: &InfoArgs) -> Result<()> {
    let raw = RawFrame::open(&args.file)
        .with_context(|| format!("Failed to open {}", args.file.display()))?;
    let header = raw.header();

    println!("File:        {}", args.file.display());
    let (h, w) = raw.shape();
    println!("Dimensions:  {}x{}", w, h);
    println!("BITPIX:      {}", raw.bitpix());
    println!("Obs mode:    {}", raw.obs_mode().unwrap_or("-"));
    println!("Object:      {}", raw.object().unwrap_or("-"));
    if let Some(exptime) = raw.exposure_time() {
        println!("Exposure:    {:.2} s", exptime);
    }
    for slot in FilterSlot::PRIORITY {
        if let Some(filter) = raw.filter(slot) {
            println!("{:<13}{}", format!("{}:", slot), filter);
        }
    }

    if args.cards {
        println!();
        for card in header.cards() {
            println!("{}", card);
        }
    }

    Ok(())
}
