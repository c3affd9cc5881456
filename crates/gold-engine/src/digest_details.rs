//! `GetDigestDetails` / `GetDigestsDiff` / `GetDigestsForGrouping` — spec §4.3.

use std::collections::HashMap;
use std::time::Instant;

use gold_core::model::{Digest, Grouping, Label, ParamSet};
use gold_core::query::plan::{KeyStage, TraceFilterPlan};
use gold_core::trace_group::{self, TraceInput, TraceWindowEntry};
use gold_errors::{GoldError, Result};
use gold_logging::{log_op_end, log_op_error, log_op_start};

use gold_projection::digest_details::{DigestComparisonWire, DigestDetailsWire};
use gold_projection::reference::ReferenceDiffWire;
use gold_projection::search::TriageEntryWire;

use crate::engine::GoldEngine;

impl GoldEngine {
    /// Trace ids belonging to `grouping`, via the same staged-intersection
    /// plan the Search pipeline compiles, restricted to an exact single
    /// value per grouping key.
    async fn trace_ids_for_grouping(&self, grouping: &Grouping) -> Result<Vec<gold_core::model::TraceId>> {
        let mut stages = Vec::new();
        for (key, value) in grouping.as_map() {
            if key == "corpus" {
                continue;
            }
            stages.push(KeyStage {
                key: key.clone(),
                values: vec![value.clone()],
            });
        }
        let plan = TraceFilterPlan {
            corpus: grouping.corpus().map(str::to_string),
            stages,
            exclude_ignored: false,
            may_use_materialized_view: false,
        };
        gold_store::repo::traces::select_candidate_trace_ids(&self.pool, &plan).await
    }

    pub async fn get_digest_details(
        &self,
        grouping: &Grouping,
        digest: Digest,
        crs: Option<&str>,
        cl_id: Option<&str>,
    ) -> Result<DigestDetailsWire> {
        let started = Instant::now();
        log_op_start!("get_digest_details");
        let result = self.get_digest_details_inner(grouping, digest, crs, cl_id).await;
        match &result {
            Ok(_) => log_op_end!("get_digest_details", duration_ms = started.elapsed().as_millis() as u64),
            Err(err) => log_op_error!(
                "get_digest_details",
                err,
                duration_ms = started.elapsed().as_millis() as u64
            ),
        }
        result
    }

    async fn get_digest_details_inner(
        &self,
        grouping: &Grouping,
        digest: Digest,
        crs: Option<&str>,
        cl_id: Option<&str>,
    ) -> Result<DigestDetailsWire> {
        let grouping_id = grouping.id();
        let trace_ids = self.trace_ids_for_grouping(grouping).await?;
        let traces = gold_store::repo::traces::load_traces(&self.pool, &trace_ids).await?;
        let window = self.commit_window.get().await;
        let public_matcher = self.public_params.get().await;

        let value_rows = gold_store::repo::traces::load_trace_values(&self.pool, &trace_ids).await?;
        let mut by_trace: HashMap<String, Vec<(usize, Digest)>> = HashMap::new();
        for row in &value_rows {
            if let Some(idx) = window.index_of(&gold_core::model::CommitId(row.commit_id.clone())) {
                by_trace
                    .entry(row.trace_id.clone())
                    .or_default()
                    .push((idx, Digest::from_hex(&row.digest)?));
            }
        }
        for entries in by_trace.values_mut() {
            entries.sort_by_key(|(idx, _)| *idx);
        }

        let digest_hex = digest.to_hex();
        let mut producing_trace_ids = Vec::new();
        let mut digest_pool: HashMap<Digest, Vec<String>> = HashMap::new();
        for (trace_id, entries) in &by_trace {
            for (_, d) in entries {
                digest_pool.entry(*d).or_default().push(trace_id.clone());
                if *d == digest {
                    producing_trace_ids.push(trace_id.clone());
                }
            }
        }

        let mut paramset = ParamSet::new();
        for trace in &traces {
            if producing_trace_ids.contains(&trace.trace_id) {
                gold_core::model::merge_paramset(&mut paramset, &trace.keys_map());
            }
        }
        let corpus = grouping.corpus().unwrap_or_default();
        let paramset = public_matcher.filter_paramset(corpus, &paramset);

        let label = match (crs, cl_id) {
            (Some(crs), Some(cl_id)) => {
                self.resolver
                    .classify_for_cl(&self.pool, crs, cl_id, grouping_id, &digest_hex)
                    .await?
            }
            _ => self.resolver.classify(&self.pool, grouping_id, &digest_hex).await?,
        };
        let triage_history = match (crs, cl_id) {
            (Some(crs), Some(cl_id)) => {
                self.resolver
                    .triage_history_for_cl(&self.pool, crs, cl_id, grouping_id, &digest_hex)
                    .await
            }
            _ => self.resolver.triage_history(&self.pool, grouping_id, &digest_hex).await,
        };

        let (closest_positive, closest_negative) =
            self.closest_references(grouping_id, digest, &digest_pool, corpus, &public_matcher)
                .await?;

        let mut inputs = Vec::new();
        for trace_id in &producing_trace_ids {
            if let Some(entries) = by_trace.get(trace_id) {
                inputs.push(TraceInput {
                    trace_id: gold_core::model::TraceId::from_hex(trace_id)?,
                    entries: entries
                        .iter()
                        .map(|(idx, d)| TraceWindowEntry {
                            commit_index: *idx,
                            digest: *d,
                        })
                        .collect(),
                });
            }
        }
        let group = trace_group::build_trace_group(window.len(), digest, &inputs);

        Ok(DigestDetailsWire {
            digest: digest_hex,
            grouping: grouping.clone(),
            label,
            paramset,
            triage_history: triage_history.iter().map(TriageEntryWire::from).collect(),
            closest_positive_ref: closest_positive.map(|r| {
                ReferenceDiffWire::from_result(&r, Label::Positive, gold_core::model::MetricKind::Combined)
            }),
            closest_negative_ref: closest_negative.map(|r| {
                ReferenceDiffWire::from_result(&r, Label::Negative, gold_core::model::MetricKind::Combined)
            }),
            trace_group: (&group).into(),
        })
    }

    pub async fn get_digests_diff(
        &self,
        grouping: &Grouping,
        left: Digest,
        right: Digest,
        crs: Option<&str>,
        cl_id: Option<&str>,
    ) -> Result<DigestComparisonWire> {
        let started = Instant::now();
        log_op_start!("get_digests_diff");
        let result = self.get_digests_diff_inner(grouping, left, right, crs, cl_id).await;
        match &result {
            Ok(_) => log_op_end!("get_digests_diff", duration_ms = started.elapsed().as_millis() as u64),
            Err(err) => log_op_error!(
                "get_digests_diff",
                err,
                duration_ms = started.elapsed().as_millis() as u64
            ),
        }
        result
    }

    async fn get_digests_diff_inner(
        &self,
        grouping: &Grouping,
        left: Digest,
        right: Digest,
        crs: Option<&str>,
        cl_id: Option<&str>,
    ) -> Result<DigestComparisonWire> {
        let grouping_id = grouping.id();
        let left_hex = left.to_hex();
        let right_hex = right.to_hex();

        let rows = gold_store::repo::diff_metrics::load_diff_rows(&self.pool, &left_hex, &[right_hex.clone()]).await?;
        let row = rows.into_iter().next().ok_or_else(|| {
            GoldError::not_found(format!("no diff row between {left_hex} and {right_hex}"))
                .with_op("get_digests_diff")
        })?;

        let trace_ids = self.trace_ids_for_grouping(grouping).await?;
        let traces = gold_store::repo::traces::load_traces(&self.pool, &trace_ids).await?;
        let value_rows = gold_store::repo::traces::load_trace_values(&self.pool, &trace_ids).await?;
        let mut produced_by: HashMap<String, Vec<String>> = HashMap::new();
        for row in &value_rows {
            produced_by.entry(row.digest.clone()).or_default().push(row.trace_id.clone());
        }
        let traces_by_id: HashMap<&str, &gold_store::repo::traces::TraceRow> =
            traces.iter().map(|t| (t.trace_id.as_str(), t)).collect();
        let public_matcher = self.public_params.get().await;
        let corpus = grouping.corpus().unwrap_or_default();

        let paramset_for = |digest_hex: &str| -> ParamSet {
            let mut ps = ParamSet::new();
            if let Some(ids) = produced_by.get(digest_hex) {
                for id in ids {
                    if let Some(t) = traces_by_id.get(id.as_str()) {
                        gold_core::model::merge_paramset(&mut ps, &t.keys_map());
                    }
                }
            }
            public_matcher.filter_paramset(corpus, &ps)
        };

        let left_label = match (crs, cl_id) {
            (Some(crs), Some(cl_id)) => {
                self.resolver
                    .classify_for_cl(&self.pool, crs, cl_id, grouping_id, &left_hex)
                    .await?
            }
            _ => self.resolver.classify(&self.pool, grouping_id, &left_hex).await?,
        };
        let right_label = match (crs, cl_id) {
            (Some(crs), Some(cl_id)) => {
                self.resolver
                    .classify_for_cl(&self.pool, crs, cl_id, grouping_id, &right_hex)
                    .await?
            }
            _ => self.resolver.classify(&self.pool, grouping_id, &right_hex).await?,
        };

        Ok(DigestComparisonWire {
            left_digest: left_hex.clone(),
            right_digest: right_hex.clone(),
            left_label,
            right_label,
            left_paramset: paramset_for(&left_hex),
            right_paramset: paramset_for(&right_hex),
            num_diff_pixels: row.num_pixels_diff,
            pixel_diff_percent: row.percent_pixels_diff,
            max_rgba_diffs: row.max_rgba_diffs,
            combined_metric: row.combined_metric,
            dim_differ: row.dimensions_differ,
        })
    }

    /// `GetDigestsForGrouping`: every distinct digest any trace in
    /// `grouping` has produced across the commit window, lexicographically
    /// ordered.
    pub async fn get_digests_for_grouping(&self, grouping: &Grouping) -> Result<Vec<String>> {
        let started = Instant::now();
        log_op_start!("get_digests_for_grouping");
        let trace_ids = self.trace_ids_for_grouping(grouping).await?;
        let value_rows = gold_store::repo::traces::load_trace_values(&self.pool, &trace_ids).await?;
        let mut digests: Vec<String> = value_rows.into_iter().map(|r| r.digest).collect();
        digests.sort();
        digests.dedup();
        log_op_end!("get_digests_for_grouping", duration_ms = started.elapsed().as_millis() as u64);
        Ok(digests)
    }

    /// Reference-diff lookup shared by `GetDigestDetails` and (in spirit)
    /// `Search`: the closest positive/negative candidate for `digest`
    /// drawn from `pool`, the grouping's observed digest -> producing-trace
    /// map.
    async fn closest_references(
        &self,
        grouping_id: gold_core::model::GroupingId,
        digest: Digest,
        pool: &HashMap<Digest, Vec<String>>,
        corpus: &str,
        public_matcher: &gold_core::access_control::PublicViewMatcher,
    ) -> Result<(
        Option<gold_core::reference_diff::ReferenceDiffResult>,
        Option<gold_core::reference_diff::ReferenceDiffResult>,
    )> {
        let mut candidate_hexes = Vec::new();
        let mut candidate_label: HashMap<String, Label> = HashMap::new();
        for &candidate_digest in pool.keys() {
            if candidate_digest == digest {
                continue;
            }
            let hex = candidate_digest.to_hex();
            let label = self.resolver.classify(&self.pool, grouping_id, &hex).await?;
            if label == Label::Positive || label == Label::Negative {
                candidate_label.insert(hex.clone(), label);
                candidate_hexes.push(hex);
            }
        }
        if candidate_hexes.is_empty() {
            return Ok((None, None));
        }
        let diff_rows =
            gold_store::repo::diff_metrics::load_diff_rows(&self.pool, &digest.to_hex(), &candidate_hexes).await?;

        let mut positive_candidates = Vec::new();
        let mut negative_candidates = Vec::new();
        for row in diff_rows {
            let hex = row.right.to_hex();
            let mut paramset = ParamSet::new();
            if let Some(ids) = pool.get(&row.right) {
                let traces = gold_store::repo::traces::load_traces(
                    &self.pool,
                    &ids.iter()
                        .filter_map(|id| gold_core::model::TraceId::from_hex(id).ok())
                        .collect::<Vec<_>>(),
                )
                .await?;
                for trace in &traces {
                    gold_core::model::merge_paramset(&mut paramset, &trace.keys_map());
                }
            }
            let candidate = gold_core::reference_diff::Candidate {
                digest: row.right,
                diff: row,
                paramset: public_matcher.filter_paramset(corpus, &paramset),
            };
            match candidate_label.get(&hex) {
                Some(Label::Positive) => positive_candidates.push(candidate),
                Some(Label::Negative) => negative_candidates.push(candidate),
                _ => {}
            }
        }

        let selection = gold_core::reference_diff::select_reference_diffs(
            gold_core::model::MetricKind::Combined,
            &positive_candidates,
            &negative_candidates,
        );
        Ok((selection.positive, selection.negative))
    }
}
