//! `gold gui-status` — print the GUI status.

use std::path::Path;

use clap::Args;
use gold_engine::{GoldConfig, GoldEngine};

#[derive(Debug, Args)]
pub struct GuiStatusArgs {}

pub async fn execute(config_path: &Path, _args: GuiStatusArgs) -> anyhow::Result<()> {
    let config = GoldConfig::from_file(config_path)?;
    let engine = GoldEngine::connect(config).await?;
    let status = engine.compute_gui_status().await?;
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}
