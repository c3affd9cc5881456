//! Gold CLI
//!
//! Operator entry point for the Search & Blame Engine: applies migrations,
//! runs a search, and prints blame/GUI-status summaries against a
//! configured Postgres connection. Not the HTTP layer — a debugging and
//! operations tool that drives `gold-engine`'s public API directly.

use clap::{Parser, Subcommand};

mod commands;

#[derive(Debug, Parser)]
#[command(name = "gold")]
#[command(about = "Gold Search & Blame Engine operator CLI", long_about = None)]
struct Cli {
    /// Path to the engine's TOML config file.
    #[arg(long, global = true, default_value = "gold.toml")]
    config: std::path::PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate(commands::migrate::MigrateArgs),
    /// Run a search and print the response as JSON
    Search(commands::search::SearchArgs),
    /// Print the untriaged-digest blame summary for a corpus
    Blame(commands::blame::BlameArgs),
    /// Print the GUI status (last commit with data, per-corpus untriaged counts)
    GuiStatus(commands::gui_status::GuiStatusArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    gold_logging::init(gold_logging::Profile::Development);
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Migrate(args) => commands::migrate::execute(&cli.config, args).await,
        Commands::Search(args) => commands::search::execute(&cli.config, args).await,
        Commands::Blame(args) => commands::blame::execute(&cli.config, args).await,
        Commands::GuiStatus(args) => commands::gui_status::execute(&cli.config, args).await,
    };

    if let Err(err) = &result {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
    result
}
