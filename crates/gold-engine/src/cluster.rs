//! Cluster Builder orchestration — spec §4.8.

use std::collections::HashMap;
use std::time::Instant;

use gold_core::cluster::{self, ClusterInput};
use gold_core::model::{merge_paramset, CommitId, Digest, Label};
use gold_core::query::compiler::SearchQuery;
use gold_errors::{GoldError, Result};
use gold_logging::{log_op_end, log_op_error, log_op_start};
use gold_projection::cluster::ClusterDiffResultWire;

use crate::engine::GoldEngine;

impl GoldEngine {
    /// `query`'s metric/sort/paging fields are ignored here — only
    /// `corpus`, `trace_key_filters`, and the `include_*` triage-status
    /// flags shape a cluster request (spec §4.8).
    pub async fn get_cluster(&self, query: &SearchQuery) -> Result<ClusterDiffResultWire> {
        let started = Instant::now();
        log_op_start!("get_cluster");
        let result = self.get_cluster_inner(query).await;
        match &result {
            Ok(_) => log_op_end!("get_cluster", duration_ms = started.elapsed().as_millis() as u64),
            Err(err) => log_op_error!(
                "get_cluster",
                err,
                duration_ms = started.elapsed().as_millis() as u64
            ),
        }
        result
    }

    async fn get_cluster_inner(&self, query: &SearchQuery) -> Result<ClusterDiffResultWire> {
        let public_matcher = self.public_params.get().await;
        let window = self.commit_window.get().await;

        let plan = query.compile(false)?;
        let trace_ids = gold_store::repo::traces::select_candidate_trace_ids(&self.pool, &plan).await?;
        let mut traces = gold_store::repo::traces::load_traces(&self.pool, &trace_ids).await?;
        traces.retain(|t| {
            public_matcher.corpus_visible(&t.corpus) && public_matcher.trace_visible(&t.corpus, &t.keys_map())
        });
        if traces.is_empty() {
            return Ok(ClusterDiffResultWire::default());
        }

        let trace_id_vals: Vec<gold_core::model::TraceId> =
            traces.iter().map(|t| t.trace_id()).collect::<Result<_>>()?;
        let value_rows = gold_store::repo::traces::load_trace_values(&self.pool, &trace_id_vals).await?;

        // Every distinct digest any candidate trace produced anywhere in
        // the window, with the set of traces that produced it.
        let mut producers: HashMap<Digest, Vec<String>> = HashMap::new();
        for row in &value_rows {
            if window.index_of(&CommitId(row.commit_id.clone())).is_some() {
                let digest = Digest::from_hex(&row.digest)?;
                producers.entry(digest).or_default().push(row.trace_id.clone());
            }
        }

        let trace_by_id: HashMap<&str, &gold_store::repo::traces::TraceRow> =
            traces.iter().map(|t| (t.trace_id.as_str(), t)).collect();

        // Cluster Builder is defined "for a grouping G" (spec §4.8) — a
        // query spanning more than one grouping (`SearchQuery::compile`
        // doesn't enforce singularity) has no single digest space to
        // cluster, so it's rejected rather than silently classifying every
        // other grouping's digests against the first trace's expectations.
        let mut grouping_ids = traces.iter().map(|t| t.grouping_id());
        let grouping_id = grouping_ids.next().expect("traces is non-empty");
        if grouping_ids.any(|g| g != grouping_id) {
            return Err(GoldError::invalid_query(
                "cluster request must resolve to a single grouping",
            ));
        }

        let mut inputs = Vec::with_capacity(producers.len());
        for (digest, trace_ids) in &producers {
            let label = self
                .resolver
                .classify(&self.pool, grouping_id, &digest.to_hex())
                .await?;
            let included = match label {
                Label::Positive => query.include_positive,
                Label::Negative => query.include_negative,
                Label::Untriaged => query.include_untriaged,
            };
            if !included {
                continue;
            }

            let mut paramset = gold_core::model::ParamSet::new();
            for trace_id in trace_ids {
                if let Some(trace) = trace_by_id.get(trace_id.as_str()) {
                    merge_paramset(&mut paramset, &trace.keys_map());
                }
            }
            let corpus = traces[0].corpus.clone();
            paramset = public_matcher.filter_paramset(&corpus, &paramset);

            inputs.push(ClusterInput {
                digest: *digest,
                label,
                paramset,
            });
        }
        inputs.sort_by_key(|i| i.digest);

        if inputs.is_empty() {
            return Ok(ClusterDiffResultWire::default());
        }

        let digest_hexes: Vec<String> = inputs.iter().map(|i| i.digest.to_hex()).collect();
        let metric_rows = gold_store::repo::diff_metrics::load_combined_metrics_within(&self.pool, &digest_hexes).await?;
        let mut distances: HashMap<(String, String), f64> = HashMap::new();
        for (left, right, combined_metric) in metric_rows {
            distances.insert((left.clone(), right.clone()), combined_metric);
            distances.insert((right, left), combined_metric);
        }

        let result = cluster::build_cluster(&inputs, |a, b| {
            distances.get(&(a.to_hex(), b.to_hex())).copied()
        });
        Ok((&result).into())
    }
}
