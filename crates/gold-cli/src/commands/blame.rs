//! `gold blame` — print the untriaged-digest blame summary for a corpus.

use std::path::Path;

use clap::Args;
use gold_engine::{GoldConfig, GoldEngine};

#[derive(Debug, Args)]
pub struct BlameArgs {
    /// Restrict the blame summary to one corpus; omit for every corpus.
    #[arg(long)]
    corpus: Option<String>,
}

pub async fn execute(config_path: &Path, args: BlameArgs) -> anyhow::Result<()> {
    let config = GoldConfig::from_file(config_path)?;
    let engine = GoldEngine::connect(config).await?;
    let summary = engine.get_blames_for_untriaged_digests(args.corpus.as_deref()).await?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
