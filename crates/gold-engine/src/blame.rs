//! Blame Engine orchestration — spec §4.7.
//!
//! `gold_core::blame` supplies the pure range arithmetic; this module
//! gathers the untriaged-at-head findings per grouping from the store and
//! feeds them through it. Per scenario S5, triage state is re-classified
//! live for every candidate digest on each call — nothing here is served
//! from a cache that could lag a triage action.

use std::collections::HashMap;
use std::time::Instant;

use gold_core::blame::{self, GroupingBlame};
use gold_core::model::{CommitId, Digest, GroupingId, Label};
use gold_errors::Result;
use gold_logging::{log_op_end, log_op_error, log_op_start};
use gold_projection::blame::BlameSummaryWire;

use crate::engine::GoldEngine;
use crate::grouping::grouping_of;

impl GoldEngine {
    pub async fn get_blames_for_untriaged_digests(&self, corpus: Option<&str>) -> Result<BlameSummaryWire> {
        let started = Instant::now();
        log_op_start!("get_blames_for_untriaged_digests");
        let result = self.get_blames_inner(corpus).await;
        match &result {
            Ok(_) => log_op_end!(
                "get_blames_for_untriaged_digests",
                duration_ms = started.elapsed().as_millis() as u64
            ),
            Err(err) => log_op_error!(
                "get_blames_for_untriaged_digests",
                err,
                duration_ms = started.elapsed().as_millis() as u64
            ),
        }
        result
    }

    async fn get_blames_inner(&self, corpus: Option<&str>) -> Result<BlameSummaryWire> {
        let window = self.commit_window.get().await;
        let public_matcher = self.public_params.get().await;

        let plan = gold_core::query::plan::TraceFilterPlan {
            corpus: corpus.map(str::to_string),
            stages: Vec::new(),
            exclude_ignored: true,
            may_use_materialized_view: false,
        };
        let trace_ids = gold_store::repo::traces::select_candidate_trace_ids(&self.pool, &plan).await?;
        let mut traces = gold_store::repo::traces::load_traces(&self.pool, &trace_ids).await?;
        traces.retain(|t| {
            public_matcher.corpus_visible(&t.corpus) && public_matcher.trace_visible(&t.corpus, &t.keys_map())
        });
        if traces.is_empty() {
            return Ok(BlameSummaryWire::default());
        }

        let trace_id_vals: Vec<gold_core::model::TraceId> =
            traces.iter().map(|t| t.trace_id()).collect::<Result<_>>()?;
        let value_rows = gold_store::repo::traces::load_trace_values(&self.pool, &trace_id_vals).await?;

        let mut by_trace: HashMap<String, Vec<(usize, Digest)>> = HashMap::new();
        for row in &value_rows {
            if let Some(idx) = window.index_of(&CommitId(row.commit_id.clone())) {
                by_trace
                    .entry(row.trace_id.clone())
                    .or_default()
                    .push((idx, Digest::from_hex(&row.digest)?));
            }
        }
        for entries in by_trace.values_mut() {
            entries.sort_by_key(|(idx, _)| *idx);
        }

        // Bucket traces whose head digest is currently untriaged by
        // (grouping_id, digest); everything inside a bucket shares the
        // same blamed digest.
        let mut buckets: HashMap<(GroupingId, Digest), Vec<String>> = HashMap::new();
        for trace in &traces {
            let Some(entries) = by_trace.get(&trace.trace_id) else {
                continue;
            };
            let Some(&(_, head_digest)) = entries.last() else {
                continue;
            };
            let grouping_id = trace.grouping_id();
            let label = self
                .resolver
                .classify(&self.pool, grouping_id, &head_digest.to_hex())
                .await?;
            if label == Label::Untriaged {
                buckets
                    .entry((grouping_id, head_digest))
                    .or_default()
                    .push(trace.trace_id.clone());
            }
        }

        let mut findings = Vec::new();
        for ((grouping_id, digest), mut bucket_trace_ids) in buckets {
            bucket_trace_ids.sort();
            let representative = traces
                .iter()
                .find(|t| t.trace_id == bucket_trace_ids[0])
                .expect("bucketed trace id was loaded");
            let grouping = grouping_of(&representative.keys_map());

            let mut ranges = Vec::with_capacity(bucket_trace_ids.len());
            let mut trace_digests = Vec::with_capacity(bucket_trace_ids.len());
            for trace_id_str in &bucket_trace_ids {
                let entries = by_trace
                    .get(trace_id_str)
                    .expect("bucketed trace id has window entries");
                // `entries` is sparse — one (window_index, digest) pair per
                // commit the trace actually produced a value at, sorted by
                // window_index. `compute_trace_blame_range`'s `digit_at`
                // must be addressable by *window* index, with absent
                // commits transparent, so it's looked up by window_index
                // here rather than by position in `entries`.
                let head_index = entries.last().map(|&(idx, _)| idx).unwrap_or(0);
                let by_window_index: HashMap<usize, Digest> = entries.iter().copied().collect();

                // Distinct digests this trace ever produced, classified
                // once up front so `compute_trace_blame_range`'s closures
                // can stay synchronous.
                let mut labels: HashMap<Digest, bool> = HashMap::new();
                for &(_, d) in entries {
                    if !labels.contains_key(&d) {
                        let l = self.resolver.classify(&self.pool, grouping_id, &d.to_hex()).await?;
                        labels.insert(d, l == Label::Positive);
                    }
                }

                let range = blame::compute_trace_blame_range(
                    head_index,
                    digest,
                    |i| by_window_index.get(&i).copied(),
                    |d| labels.get(&d).copied().unwrap_or(false),
                );
                ranges.push(range);
                trace_digests.push((
                    gold_core::model::TraceId::from_hex(trace_id_str)?,
                    digest,
                ));
            }

            let Some(combined_range) = blame::combine_ranges(&ranges) else {
                continue;
            };

            findings.push(GroupingBlame {
                grouping_id,
                grouping,
                digest,
                range: combined_range,
                trace_digests,
            });
        }

        let summary = blame::build_blame_summary(&window, findings);
        Ok((&summary).into())
    }

    /// Resolve a blame-group id (a rendered commit-range string, spec §4.7
    /// step 4's `commit_range`) back to a window index range, for the
    /// Search pipeline's `blame_group_id` filter.
    pub async fn resolve_blame_group_range(&self, blame_group_id: &str) -> Option<(usize, usize)> {
        let window = self.commit_window.get().await;
        match blame_group_id.split_once(':') {
            Some((lo, hi)) => {
                let lo = window.index_of(&CommitId(lo.to_string()))?;
                let hi = window.index_of(&CommitId(hi.to_string()))?;
                Some((lo.min(hi), lo.max(hi)))
            }
            None => {
                let idx = window.index_of(&CommitId(blame_group_id.to_string()))?;
                Some((idx, idx))
            }
        }
    }
}
