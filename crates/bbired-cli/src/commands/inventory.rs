use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use bbired_core::frame::FrameKind;
use bbired_core::inventory::{ClassificationRules, FrameInventory};

use super::load_config;
use crate::summary::print_inventory;

#[derive(Args)]
pub struct InventoryArgs {
    /// Directory of raw FITS frames
    pub dir: PathBuf,

    /// Pipeline config file (TOML or JSON)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

pub fn run(args: &InventoryArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let rules = ClassificationRules::from(&config.instrument);
    let inventory = FrameInventory::from_directory(&args.dir, &rules)
        .with_context(|| format!("Failed to classify {}", args.dir.display()))?;

    print_inventory(&inventory);
    for kind in [FrameKind::Std, FrameKind::Target] {
        if let Some(err) = inventory.branch_error(kind) {
            println!("  {}", err);
        }
    }
    Ok(())
}
