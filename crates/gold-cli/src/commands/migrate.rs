//! `gold migrate` — apply pending database migrations.

use std::path::Path;

use clap::Args;
use gold_engine::GoldConfig;

#[derive(Debug, Args)]
pub struct MigrateArgs {}

pub async fn execute(config_path: &Path, _args: MigrateArgs) -> anyhow::Result<()> {
    let config = GoldConfig::from_file(config_path)?;
    let pool = gold_store::db::open(&config.database_url).await?;
    gold_store::migrations::apply_migrations(&pool).await?;
    println!("migrations applied");
    Ok(())
}
