//! `Traces` repository functions — executes a compiled
//! [`gold_core::query::plan::TraceFilterPlan`] against Postgres and loads
//! trace rows.
//!
//! [`TraceFilterPlan::to_sql`] exists in `gold-core` as the plan's pure,
//! deterministic, injection-safe *textual* shape (spec §8 property 7:
//! idempotent compilation). This module doesn't execute that literal
//! string — `sqlx` bind parameters are the safer and more idiomatic way to
//! get values into a query from Rust — but it walks the exact same plan
//! structure stage by stage, so the candidate set it computes is the one
//! the plan's SQL text describes.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use sqlx::PgPool;

use gold_core::model::{GroupingId, TraceId};
use gold_core::query::plan::TraceFilterPlan;

use crate::errors::Result;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TraceRow {
    pub trace_id: String,
    pub grouping_id: String,
    pub corpus: String,
    pub keys: serde_json::Value,
    pub options: serde_json::Value,
    pub matches_any_ignore_rule: bool,
}

impl TraceRow {
    pub fn keys_map(&self) -> BTreeMap<String, String> {
        json_object_to_string_map(&self.keys)
    }

    pub fn options_map(&self) -> BTreeMap<String, String> {
        json_object_to_string_map(&self.options)
    }

    pub fn grouping_id(&self) -> GroupingId {
        // The id is re-derived from the keys via `Grouping::id`, rather
        // than parsed from the stored `grouping_id` column, so the
        // invariant "grouping id is a pure function of the trace keys"
        // (spec §3 invariant 1) can never drift from what's on disk.
        let grouping =
            gold_core::model::Grouping::from_trace_keys(&self.keys_map(), &["corpus", "name"]);
        grouping.id()
    }

    pub fn trace_id(&self) -> Result<TraceId> {
        TraceId::from_hex(&self.trace_id)
    }
}

fn json_object_to_string_map(value: &serde_json::Value) -> BTreeMap<String, String> {
    value
        .as_object()
        .map(|obj| {
            obj.iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

/// Run the compiled plan's stage-by-stage intersection against the live
/// table (materialized-view substitution, §4.9, is handled by the caller
/// choosing which corpus's view to prefer before compiling the plan; this
/// function always reads the base `traces` table, since the view is just
/// a precomputed subset of the same rows).
pub async fn select_candidate_trace_ids(pool: &PgPool, plan: &TraceFilterPlan) -> Result<Vec<TraceId>> {
    let mut candidates: Option<HashSet<String>> = None;

    for stage in &plan.stages {
        let rows: Vec<String> = sqlx::query_scalar(
            "SELECT trace_id FROM traces WHERE keys ->> $1 = ANY($2)",
        )
        .bind(&stage.key)
        .bind(&stage.values)
        .fetch_all(pool)
        .await?;
        let stage_set: HashSet<String> = rows.into_iter().collect();
        candidates = Some(match candidates {
            None => stage_set,
            Some(acc) => acc.intersection(&stage_set).cloned().collect(),
        });
    }

    let mut ids: Vec<String> = match candidates {
        Some(set) => set.into_iter().collect(),
        None => {
            // No key-filter stages: the candidate set is every trace in
            // the (optionally corpus-restricted) table.
            sqlx::query_scalar("SELECT trace_id FROM traces")
                .fetch_all(pool)
                .await?
        }
    };

    if let Some(corpus) = &plan.corpus {
        let corpus_ids: HashSet<String> =
            sqlx::query_scalar("SELECT trace_id FROM traces WHERE corpus = $1")
                .bind(corpus)
                .fetch_all(pool)
                .await?
                .into_iter()
                .collect();
        ids.retain(|id| corpus_ids.contains(id));
    }

    if plan.exclude_ignored {
        let ignored: HashSet<String> =
            sqlx::query_scalar("SELECT trace_id FROM traces WHERE matches_any_ignore_rule")
                .fetch_all(pool)
                .await?
                .into_iter()
                .collect();
        ids.retain(|id| !ignored.contains(id));
    }

    ids.sort();
    ids.into_iter().map(|s| TraceId::from_hex(&s)).collect()
}

/// Load full trace rows for a set of trace ids.
pub async fn load_traces(pool: &PgPool, trace_ids: &[TraceId]) -> Result<Vec<TraceRow>> {
    if trace_ids.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<String> = trace_ids.iter().map(|t| t.to_hex()).collect();
    let rows = sqlx::query_as::<_, TraceRow>(
        "SELECT trace_id, grouping_id, corpus, keys, options, matches_any_ignore_rule
         FROM traces WHERE trace_id = ANY($1)",
    )
    .bind(&ids)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// The most recent non-absent (digest, commit_id) a trace produced, for
/// at-head candidate selection (spec §4.3 step 1).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ValueAtHeadRow {
    pub trace_id: String,
    pub most_recent_commit_id: String,
    pub digest: String,
    pub label: String,
}

pub async fn load_values_at_head(
    pool: &PgPool,
    trace_ids: &[TraceId],
) -> Result<Vec<ValueAtHeadRow>> {
    if trace_ids.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<String> = trace_ids.iter().map(|t| t.to_hex()).collect();
    let rows = sqlx::query_as::<_, ValueAtHeadRow>(
        "SELECT trace_id, most_recent_commit_id, digest, label
         FROM values_at_head WHERE trace_id = ANY($1)",
    )
    .bind(&ids)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Every (commit, digest) datapoint a trace produced across the window,
/// for "across history" candidate selection and the Trace Group Builder
/// and Blame Engine inputs.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TraceValueRow {
    pub trace_id: String,
    pub commit_id: String,
    pub digest: String,
}

pub async fn load_trace_values(
    pool: &PgPool,
    trace_ids: &[TraceId],
) -> Result<Vec<TraceValueRow>> {
    if trace_ids.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<String> = trace_ids.iter().map(|t| t.to_hex()).collect();
    let rows = sqlx::query_as::<_, TraceValueRow>(
        "SELECT trace_id, commit_id, digest FROM trace_values WHERE trace_id = ANY($1)",
    )
    .bind(&ids)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Union of all observed key/value pairs across a set of traces, for the
/// primary/CL ParamSet accessors (spec §4.3
/// `GetPrimaryBranchParamset`/`GetChangelistParamset`).
pub async fn load_paramset(pool: &PgPool, corpus: Option<&str>) -> Result<BTreeMap<String, BTreeSet<String>>> {
    let rows: Vec<serde_json::Value> = match corpus {
        Some(c) => {
            sqlx::query_scalar("SELECT keys FROM traces WHERE corpus = $1")
                .bind(c)
                .fetch_all(pool)
                .await?
        }
        None => {
            sqlx::query_scalar("SELECT keys FROM traces")
                .fetch_all(pool)
                .await?
        }
    };
    let mut paramset: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for keys in rows {
        for (k, v) in json_object_to_string_map(&keys) {
            paramset.entry(k).or_default().insert(v);
        }
    }
    Ok(paramset)
}

/// Every distinct corpus with at least one trace, for `ComputeGUIStatus`'s
/// per-corpus breakdown (spec §4.3).
pub async fn list_corpora(pool: &PgPool) -> Result<Vec<String>> {
    let rows: Vec<String> = sqlx::query_scalar("SELECT DISTINCT corpus FROM traces ORDER BY corpus")
        .fetch_all(pool)
        .await?;
    Ok(rows)
}
