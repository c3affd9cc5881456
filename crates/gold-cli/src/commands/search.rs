//! `gold search` — run a search and print the response as JSON.

use std::collections::BTreeMap;
use std::path::Path;

use clap::Args;
use gold_engine::{GoldConfig, GoldEngine};
use gold_projection::query::SearchRequest;

#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Restrict the search to one corpus.
    #[arg(long)]
    corpus: Option<String>,

    /// A `key=value` trace filter; may be repeated for multiple keys or
    /// multiple values on the same key.
    #[arg(long = "key", value_parser = parse_key_val)]
    trace_key_filters: Vec<(String, String)>,

    #[arg(long)]
    include_positive: bool,

    #[arg(long)]
    include_negative: bool,

    #[arg(long, default_value_t = true)]
    include_untriaged: bool,

    #[arg(long)]
    only_at_head: bool,

    #[arg(long, default_value_t = 0)]
    offset: u32,

    #[arg(long)]
    limit: Option<u32>,

    /// Code review system identifier, for a CL-scoped search.
    #[arg(long)]
    crs: Option<String>,

    /// Qualified changelist id, for a CL-scoped search.
    #[arg(long)]
    changelist_id: Option<String>,
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (k, v) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{s}'"))?;
    Ok((k.to_string(), v.to_string()))
}

pub async fn execute(config_path: &Path, args: SearchArgs) -> anyhow::Result<()> {
    let config = GoldConfig::from_file(config_path)?;
    let engine = GoldEngine::connect(config).await?;

    let mut trace_key_filters: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (key, value) in args.trace_key_filters {
        trace_key_filters.entry(key).or_default().push(value);
    }

    let request = SearchRequest {
        corpus: args.corpus,
        trace_key_filters,
        include_positive: args.include_positive,
        include_negative: args.include_negative,
        include_untriaged: args.include_untriaged,
        only_at_head: args.only_at_head,
        offset: args.offset,
        limit: args.limit,
        crs: args.crs,
        changelist_id: args.changelist_id,
        ..Default::default()
    };

    let response = engine.search(&request).await?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
