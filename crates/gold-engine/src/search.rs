//! `Search`, spec §4.3 — the Result Pipeline's main entry point.

use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

use gold_core::blame;
use gold_core::model::{CommitId, Digest, GroupingId, Label, TraceId};
use gold_core::reference_diff::{self, Candidate};
use gold_core::trace_group::{self, TraceInput, TraceWindowEntry};
use gold_errors::{GoldError, Result};
use gold_projection::query::SearchRequest;
use gold_projection::search::{
    BulkTriageDeltaInfoWire, ClosestDiffLabelWire, CommitEntryWire, SearchResponseWire,
    SearchResultRowWire, TriageEntryWire,
};
use gold_store::repo::traces::TraceRow;
use gold_logging::{log_op_end, log_op_error, log_op_start};

use crate::engine::GoldEngine;
use crate::grouping::grouping_of;

/// One (grouping, digest) finding in the unpaged post-filter result set,
/// together with everything needed to materialize its wire row.
struct Finding {
    digest: Digest,
    trace_ids: Vec<String>,
    label: Label,
    disallow_triaging: bool,
}

impl GoldEngine {
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResponseWire> {
        let started = Instant::now();
        log_op_start!("search");
        let result = self.search_inner(request).await;
        match &result {
            Ok(_) => log_op_end!("search", duration_ms = started.elapsed().as_millis() as u64),
            Err(err) => {
                log_op_error!("search", err, duration_ms = started.elapsed().as_millis() as u64)
            }
        }
        result
    }

    async fn search_inner(&self, request: &SearchRequest) -> Result<SearchResponseWire> {
        let query = request.to_core_query();
        let window = self.commit_window.get().await;
        let public_matcher = self.public_params.get().await;

        let cl = match (&query.crs, &query.changelist_id) {
            (Some(crs), Some(cl_id)) => {
                let cl = gold_store::repo::changelists::get_changelist(&self.pool, crs, cl_id)
                    .await?
                    .ok_or_else(|| {
                        GoldError::not_found(format!("unknown changelist '{cl_id}'"))
                            .with_op("search")
                    })?;
                Some(cl)
            }
            _ => None,
        };

        let commits = self.commits_wire(&window, cl.as_ref()).await;

        // --- Step 1: candidate selection ---
        let use_mv = query
            .corpus
            .as_deref()
            .map(|c| self.corpus_has_materialized_view(c))
            .unwrap_or(false)
            && !query.include_ignored;
        let mut plan = query.compile(use_mv)?;
        // spec §4.3 step 3: an explicit key filter keeps its traces
        // regardless of the ignore-rule flag.
        let explicit_filter = !query.trace_key_filters.is_empty();
        plan.exclude_ignored = !query.include_ignored && !explicit_filter;

        let trace_ids = gold_store::repo::traces::select_candidate_trace_ids(&self.pool, &plan).await?;
        let mut traces = gold_store::repo::traces::load_traces(&self.pool, &trace_ids).await?;

        // spec §4.4: hidden traces are never selected.
        traces.retain(|t| {
            public_matcher.corpus_visible(&t.corpus) && public_matcher.trace_visible(&t.corpus, &t.keys_map())
        });

        if traces.is_empty() {
            return Ok(SearchResponseWire {
                offset: query.offset,
                commits,
                ..Default::default()
            });
        }

        let trace_id_vals: Vec<TraceId> = traces
            .iter()
            .map(|t| t.trace_id())
            .collect::<Result<_>>()?;
        let trace_values = gold_store::repo::traces::load_trace_values(&self.pool, &trace_id_vals).await?;

        let mut by_trace: HashMap<String, Vec<(usize, Digest)>> = HashMap::new();
        for row in &trace_values {
            if let Some(idx) = window.index_of(&CommitId(row.commit_id.clone())) {
                let digest = Digest::from_hex(&row.digest)?;
                by_trace.entry(row.trace_id.clone()).or_default().push((idx, digest));
            }
        }
        for entries in by_trace.values_mut() {
            entries.sort_by_key(|(idx, _)| *idx);
        }

        let trace_by_id: HashMap<&str, &TraceRow> =
            traces.iter().map(|t| (t.trace_id.as_str(), t)).collect();

        // Candidate (trace, digest) pairs, at-head or across history.
        let mut candidate_tuples: Vec<(String, Digest)> = Vec::new();
        for (trace_id, entries) in &by_trace {
            if request.only_at_head {
                if let Some((_, digest)) = entries.last() {
                    candidate_tuples.push((trace_id.clone(), *digest));
                }
            } else {
                for (_, digest) in entries {
                    candidate_tuples.push((trace_id.clone(), *digest));
                }
            }
        }

        // --- CL-scoped augmentation (spec §4.3 "Changelist result
        // specifics"): the CL's own tryjob datapoints are candidates in
        // their own right, not just a label lens on primary-branch
        // digests, and each matching trace gains one synthetic trace-group
        // column per tryjob datapoint on the target patchset(s).
        let mut cl_entries_by_trace: HashMap<String, Vec<(usize, Digest)>> = HashMap::new();
        let mut cl_extra_columns = 0usize;
        if let Some(cl) = cl.as_ref() {
            let target_patchsets: Vec<&str> = if query.patchsets.is_empty() {
                cl.patchsets.last().map(|p| p.id.as_str()).into_iter().collect()
            } else {
                query.patchsets.iter().map(String::as_str).collect()
            };

            let mut cl_datapoints = Vec::new();
            for patchset_id in target_patchsets.iter().copied() {
                let mut rows = gold_store::repo::changelists::datapoints_for_patchset(
                    &self.pool,
                    &cl.id.crs,
                    &cl.id.id,
                    patchset_id,
                )
                .await?;
                cl_datapoints.append(&mut rows);
            }

            // Columns are the distinct tryjobs, in execution order (not
            // collapsed) — a trace gets one entry per tryjob that produced
            // a datapoint for it.
            let mut tryjob_order: Vec<String> = Vec::new();
            let mut tryjob_column: HashMap<String, usize> = HashMap::new();
            for dp in &cl_datapoints {
                tryjob_column.entry(dp.tryjob_id.clone()).or_insert_with(|| {
                    let col = tryjob_order.len();
                    tryjob_order.push(dp.tryjob_id.clone());
                    col
                });
            }
            cl_extra_columns = tryjob_order.len();

            let mut cl_latest_by_trace: HashMap<String, Digest> = HashMap::new();
            for dp in &cl_datapoints {
                if !trace_by_id.contains_key(dp.trace_id.as_str()) {
                    continue;
                }
                let digest = Digest::from_hex(&dp.digest)?;
                let column = tryjob_column[&dp.tryjob_id];
                cl_entries_by_trace
                    .entry(dp.trace_id.clone())
                    .or_default()
                    .push((window.len() + column, digest));
                cl_latest_by_trace.insert(dp.trace_id.clone(), digest);
            }

            for (trace_id, digest) in cl_latest_by_trace {
                candidate_tuples.push((trace_id, digest));
            }
        }

        // Deterministic ordering downstream (trace-group first-appearance
        // tie-breaks among indices 1-3 depend on the order traces are fed
        // in, which must not vary with `HashMap`'s randomized iteration).
        candidate_tuples.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

        // Group by (grouping, digest): the unit of a search result row.
        let mut groups: HashMap<(GroupingId, Digest), Vec<String>> = HashMap::new();
        for (trace_id, digest) in &candidate_tuples {
            let Some(trace) = trace_by_id.get(trace_id.as_str()) else {
                continue;
            };
            groups
                .entry((trace.grouping_id(), *digest))
                .or_default()
                .push(trace_id.clone());
        }

        // Per-grouping digest pool for the Reference Diff Selector:
        // every (digest -> producing trace ids) observed across this
        // query's candidate traces, independent of head/history mode.
        let mut grouping_pool: HashMap<GroupingId, HashMap<Digest, Vec<String>>> = HashMap::new();
        for (trace_id, entries) in &by_trace {
            let Some(trace) = trace_by_id.get(trace_id.as_str()) else {
                continue;
            };
            let pool = grouping_pool.entry(trace.grouping_id()).or_default();
            for (_, digest) in entries {
                pool.entry(*digest).or_default().push(trace_id.clone());
            }
        }

        // Resolve `blame_group_id` once; scenario S5 requires the live
        // label be re-checked at emit time regardless, so this only
        // narrows the candidate set to the requested commit range.
        let blame_range = match &request.blame_group_id {
            Some(id) => self.resolve_blame_group_range(id).await,
            None => None,
        };

        let mut findings: Vec<(Finding, SearchResultRowWire)> = Vec::new();
        for ((grouping_id, digest), trace_ids) in &groups {
            let representative = trace_ids
                .first()
                .and_then(|id| trace_by_id.get(id.as_str()))
                .expect("non-empty group always has a representative trace");
            let digest_hex = digest.to_hex();

            // --- Step 2: label filter ---
            let label = match (&query.crs, &query.changelist_id) {
                (Some(crs), Some(cl_id)) => {
                    self.resolver
                        .classify_for_cl(&self.pool, crs, cl_id, *grouping_id, &digest_hex)
                        .await?
                }
                _ => {
                    self.resolver
                        .classify(&self.pool, *grouping_id, &digest_hex)
                        .await?
                }
            };
            let included = match label {
                Label::Positive => query.include_positive,
                Label::Negative => query.include_negative,
                Label::Untriaged => query.include_untriaged,
            };
            if !included {
                continue;
            }

            // --- Changelist result specifics: when not including digests
            // already produced on the primary branch, drop any digest this
            // grouping's primary-branch traces already showed somewhere in
            // the window ---
            if cl.is_some()
                && !request.include_digests_produced_on_master
                && grouping_pool
                    .get(grouping_id)
                    .map(|pool| pool.contains_key(digest))
                    .unwrap_or(false)
            {
                continue;
            }

            // --- blame_group_id scoping: only digests this trace blames
            // into the requested commit range survive ---
            if let Some((lo, hi)) = blame_range {
                let mut matches_blame = false;
                for trace_id in trace_ids {
                    let Some(entries) = by_trace.get(trace_id) else {
                        continue;
                    };
                    if entries.last().map(|(_, d)| d) != Some(digest) {
                        continue;
                    }
                    // `entries` is sparse (one entry per commit the trace
                    // actually has a value at) — `digit_at` must be looked up
                    // by window index, not position, with absent commits
                    // transparent. See the identical note in `blame.rs`.
                    let head_index = entries.last().map(|&(idx, _)| idx).unwrap_or(0);
                    let by_window_index: HashMap<usize, Digest> = entries.iter().copied().collect();
                    let mut labels: HashMap<Digest, bool> = HashMap::new();
                    for &(_, d) in entries {
                        if !labels.contains_key(&d) {
                            let l = self.resolver.classify(&self.pool, *grouping_id, &d.to_hex()).await?;
                            labels.insert(d, l == Label::Positive);
                        }
                    }
                    let range = blame::compute_trace_blame_range(
                        head_index,
                        *digest,
                        |i| by_window_index.get(&i).copied(),
                        |d| labels.get(&d).copied().unwrap_or(false),
                    );
                    if range.0 <= hi && range.1 >= lo {
                        matches_blame = true;
                        break;
                    }
                }
                if !matches_blame {
                    continue;
                }
            }

            // --- Step 4: CL override for recently-triaged digests ---
            if let (Some(crs), Some(cl_id)) = (&query.crs, &query.changelist_id) {
                if plan.may_use_materialized_view {
                    let staleness_bound = chrono::Utc::now()
                        - chrono::Duration::seconds(
                            self.config.materialized_view_refresh_interval_secs as i64,
                        );
                    let recently_triaged = gold_store::repo::expectations::triaged_on_cl_since(
                        &self.pool,
                        crs,
                        cl_id,
                        &grouping_id.to_hex(),
                        &digest_hex,
                        staleness_bound,
                    )
                    .await?;
                    if recently_triaged {
                        continue;
                    }
                }
            }

            // Merged ParamSet across contributing traces, access-masked.
            let mut paramset = gold_core::model::ParamSet::new();
            let mut disallow_triaging = false;
            for trace_id in trace_ids {
                if let Some(trace) = trace_by_id.get(trace_id.as_str()) {
                    gold_core::model::merge_paramset(&mut paramset, &trace.keys_map());
                    if trace.options_map().get("disallow_triaging").map(String::as_str) == Some("true")
                    {
                        disallow_triaging = true;
                    }
                }
            }
            paramset = public_matcher.filter_paramset(&representative.corpus, &paramset);

            let grouping = grouping_of(&representative.keys_map());
            let triage_history = match (&query.crs, &query.changelist_id) {
                (Some(crs), Some(cl_id)) => {
                    self.resolver
                        .triage_history_for_cl(&self.pool, crs, cl_id, *grouping_id, &digest_hex)
                        .await
                }
                _ => self.resolver.triage_history(&self.pool, *grouping_id, &digest_hex).await,
            };

            let pool_for_grouping = grouping_pool.get(grouping_id).cloned().unwrap_or_default();
            let (closest_positive_ref, closest_negative_ref) = self
                .select_references(
                    *grouping_id,
                    *digest,
                    &pool_for_grouping,
                    &query,
                    &public_matcher,
                    &representative.corpus,
                    &trace_by_id,
                )
                .await?;

            // --- Step 5: RGBA filter ---
            if let Some(r) = closest_positive_ref.as_ref().or(closest_negative_ref.as_ref()) {
                let max_channel = r.diff.max_channel_diff();
                if let Some(min) = request.rgba_min {
                    if max_channel < min {
                        continue;
                    }
                }
                if let Some(max) = request.rgba_max {
                    if max_channel > max {
                        continue;
                    }
                }
            }

            // --- Step 6: must-have-reference filter ---
            if request.must_have_reference
                && closest_positive_ref.is_none()
                && closest_negative_ref.is_none()
            {
                continue;
            }

            let closest_ref = reference_diff::ReferenceDiffSelection {
                positive: closest_positive_ref.clone(),
                negative: closest_negative_ref.clone(),
            }
            .closest(query.metric);

            let mut inputs = Vec::new();
            for trace_id in trace_ids {
                let mut entries: Vec<TraceWindowEntry> = Vec::new();
                if let Some(window_entries) = by_trace.get(trace_id) {
                    entries.extend(window_entries.iter().map(|(idx, d)| TraceWindowEntry {
                        commit_index: *idx,
                        digest: *d,
                    }));
                }
                if let Some(cl_entries) = cl_entries_by_trace.get(trace_id) {
                    entries.extend(cl_entries.iter().map(|(idx, d)| TraceWindowEntry {
                        commit_index: *idx,
                        digest: *d,
                    }));
                }
                if entries.is_empty() {
                    continue;
                }
                inputs.push(TraceInput {
                    trace_id: TraceId::from_hex(trace_id)?,
                    entries,
                });
            }
            let trace_group = trace_group::build_trace_group_with_extra_columns(
                window.len(),
                cl_extra_columns,
                *digest,
                &inputs,
            );

            let row = SearchResultRowWire {
                digest: digest_hex,
                grouping,
                label,
                paramset,
                triage_history: triage_history.iter().map(TriageEntryWire::from).collect(),
                closest_positive_ref: closest_positive_ref
                    .map(|r| gold_projection::reference::ReferenceDiffWire::from_result(&r, Label::Positive, query.metric)),
                closest_negative_ref: closest_negative_ref
                    .map(|r| gold_projection::reference::ReferenceDiffWire::from_result(&r, Label::Negative, query.metric)),
                closest_ref: closest_ref.into(),
                trace_group: (&trace_group).into(),
                in_current_search_results_page: false,
            };

            findings.push((
                Finding {
                    digest: *digest,
                    trace_ids: trace_ids.clone(),
                    label,
                    disallow_triaging,
                },
                row,
            ));
        }

        // --- Step 7: sort (Finding and its row travel together) ---
        findings.sort_by(|(_, a), (_, b)| {
            let score = |row: &SearchResultRowWire| -> Option<f64> {
                match row.closest_ref {
                    gold_projection::search::ClosestRefWire::Positive => {
                        row.closest_positive_ref.as_ref().map(|r| r.query_metric)
                    }
                    gold_projection::search::ClosestRefWire::Negative => {
                        row.closest_negative_ref.as_ref().map(|r| r.query_metric)
                    }
                    gold_projection::search::ClosestRefWire::None => None,
                }
            };
            let sa = score(a);
            let sb = score(b);
            let primary = match (sa, sb, query.sort) {
                (None, None, _) => std::cmp::Ordering::Equal,
                (None, Some(_), gold_core::query::SortDirection::Ascending) => std::cmp::Ordering::Greater,
                (None, Some(_), gold_core::query::SortDirection::Descending) => std::cmp::Ordering::Less,
                (Some(_), None, gold_core::query::SortDirection::Ascending) => std::cmp::Ordering::Less,
                (Some(_), None, gold_core::query::SortDirection::Descending) => std::cmp::Ordering::Greater,
                (Some(x), Some(y), gold_core::query::SortDirection::Ascending) => {
                    x.partial_cmp(&y).unwrap_or(std::cmp::Ordering::Equal)
                }
                (Some(x), Some(y), gold_core::query::SortDirection::Descending) => {
                    y.partial_cmp(&x).unwrap_or(std::cmp::Ordering::Equal)
                }
            };
            primary
                .then_with(|| a.grouping.as_map().get("name").cmp(&b.grouping.as_map().get("name")))
                .then_with(|| a.digest.cmp(&b.digest))
        });

        // --- Bulk-triage delta (unpaged, post-filter) and paging ---
        let size = findings.len();
        let offset = query.offset as usize;
        let limit = query.limit as usize;
        let page: std::ops::Range<usize> = offset.min(size)..(offset + limit).min(size);

        let bulk_triage_delta_infos: Vec<BulkTriageDeltaInfoWire> = findings
            .iter()
            .enumerate()
            .filter(|(_, (f, _))| !f.disallow_triaging)
            .map(|(i, (f, row))| BulkTriageDeltaInfoWire {
                grouping: grouping_of(
                    &trace_by_id
                        .get(f.trace_ids[0].as_str())
                        .expect("finding's representative trace was loaded")
                        .keys_map(),
                ),
                digest: f.digest.to_hex(),
                label_before: f.label,
                closest_diff_label: match row.closest_ref {
                    gold_projection::search::ClosestRefWire::Positive => ClosestDiffLabelWire::Positive,
                    gold_projection::search::ClosestRefWire::Negative => ClosestDiffLabelWire::Negative,
                    gold_projection::search::ClosestRefWire::None => ClosestDiffLabelWire::None,
                },
                in_current_search_results_page: page.contains(&i),
            })
            .collect();

        let mut results: Vec<SearchResultRowWire> = Vec::new();
        for (i, (_, mut row)) in findings.into_iter().enumerate() {
            if page.contains(&i) {
                row.in_current_search_results_page = true;
                results.push(row);
            }
        }

        Ok(SearchResponseWire {
            results,
            offset: query.offset,
            size,
            commits,
            bulk_triage_delta_infos,
            trace_comments: None,
        })
    }

    /// Build the `commits` slice: the window, plus (spec §4.3 "Changelist
    /// result specifics") one synthetic trailing entry when CL-scoped.
    async fn commits_wire(
        &self,
        window: &gold_core::model::CommitWindow,
        cl: Option<&gold_core::model::Changelist>,
    ) -> Vec<CommitEntryWire> {
        let mut commits: Vec<CommitEntryWire> = window
            .commits()
            .iter()
            .map(|c| CommitEntryWire {
                hash: c.id.0.clone(),
                author: c.author.clone(),
                subject: c.subject.clone(),
                commit_time: c.timestamp,
                changelist_url: None,
            })
            .collect();
        if let Some(cl) = cl {
            let changelist_url = self.crs_client.crs_url_template(&cl.id.crs).map(|t| {
                t.replace("{cl_id}", &cl.id.id)
            });
            commits.push(CommitEntryWire {
                hash: cl.id.id.clone(),
                author: Some(cl.author.clone()),
                subject: Some(cl.subject.clone()),
                commit_time: cl.last_updated,
                changelist_url,
            });
        }
        commits
    }

    /// Reference Diff Selector (spec §4.5), restricted to the digest pool
    /// already observed among this query's candidate traces for `grouping_id`.
    /// A candidate's producing traces satisfy `right_trace_key_filters`
    /// when at least one of them matches every filtered key, mirroring the
    /// left side's "traces intersect P or R" wording.
    #[allow(clippy::too_many_arguments)]
    async fn select_references(
        &self,
        grouping_id: GroupingId,
        digest: Digest,
        pool: &HashMap<Digest, Vec<String>>,
        query: &gold_core::query::SearchQuery,
        public_matcher: &gold_core::access_control::PublicViewMatcher,
        corpus: &str,
        trace_by_id: &HashMap<&str, &TraceRow>,
    ) -> Result<(
        Option<reference_diff::ReferenceDiffResult>,
        Option<reference_diff::ReferenceDiffResult>,
    )> {
        let mut positive_candidates = Vec::new();
        let mut negative_candidates = Vec::new();
        let mut candidate_hexes = Vec::new();
        let mut candidate_label: HashMap<String, Label> = HashMap::new();

        for &candidate_digest in pool.keys() {
            if candidate_digest == digest {
                continue;
            }
            let hex = candidate_digest.to_hex();
            let label = self.resolver.classify(&self.pool, grouping_id, &hex).await?;
            if label == Label::Positive || label == Label::Negative {
                candidate_hexes.push(hex.clone());
                candidate_label.insert(hex, label);
            }
        }

        if candidate_hexes.is_empty() {
            return Ok((None, None));
        }

        let diff_rows =
            gold_store::repo::diff_metrics::load_diff_rows(&self.pool, &digest.to_hex(), &candidate_hexes)
                .await?;

        for row in diff_rows {
            let hex = row.right.to_hex();
            let Some(trace_ids) = pool.get(&row.right) else {
                continue;
            };
            let producing_traces: Vec<&TraceRow> = trace_ids
                .iter()
                .filter_map(|id| trace_by_id.get(id.as_str()).copied())
                .collect();
            if !query.right_trace_key_filters.is_empty() {
                let matches = producing_traces.iter().any(|t| {
                    let keys = t.keys_map();
                    query
                        .right_trace_key_filters
                        .iter()
                        .all(|(k, vs)| keys.get(k).map(|v| vs.contains(v)).unwrap_or(false))
                });
                if !matches {
                    continue;
                }
            }
            let mut paramset = BTreeMap::new();
            for trace in &producing_traces {
                gold_core::model::merge_paramset(&mut paramset, &trace.keys_map());
            }
            let candidate = Candidate {
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

        let selection =
            reference_diff::select_reference_diffs(query.metric, &positive_candidates, &negative_candidates);
        Ok((selection.positive, selection.negative))
    }
}
