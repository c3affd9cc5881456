//! `NewAndUntriagedSummaryForCL` / `ChangelistLastUpdated` orchestration —
//! spec §4.3, cached per spec §4.9 ("a bounded LRU keyed by qualified CL
//! id ... the refresh loop proactively recomputes recently-requested
//! entries").

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use gold_core::model::{QualifiedChangelistId, TraceId};
use gold_errors::{GoldError, Result};
use gold_logging::{log_op_end, log_op_error, log_op_start};
use gold_projection::cl_summary::{NewAndUntriagedSummaryWire, PatchsetNewAndUntriagedSummaryWire};

use crate::engine::GoldEngine;
use crate::grouping::grouping_id_of;

impl GoldEngine {
    pub async fn new_and_untriaged_summary_for_cl(
        &self,
        crs: &str,
        cl_id: &str,
    ) -> Result<NewAndUntriagedSummaryWire> {
        let started = Instant::now();
        log_op_start!("new_and_untriaged_summary_for_cl");
        let key = QualifiedChangelistId {
            crs: crs.to_string(),
            id: cl_id.to_string(),
        };
        let result = self
            .cl_summary_cache
            .get_or_refresh(&key, || self.compute_cl_summary(crs, cl_id))
            .await;
        match &result {
            Ok(_) => log_op_end!(
                "new_and_untriaged_summary_for_cl",
                duration_ms = started.elapsed().as_millis() as u64
            ),
            Err(err) => log_op_error!(
                "new_and_untriaged_summary_for_cl",
                err,
                duration_ms = started.elapsed().as_millis() as u64
            ),
        }
        result
    }

    async fn compute_cl_summary(&self, crs: &str, cl_id: &str) -> Result<NewAndUntriagedSummaryWire> {
        let Some(cl) = gold_store::repo::changelists::get_changelist(&self.pool, crs, cl_id).await? else {
            return Err(GoldError::not_found(format!("changelist {crs}/{cl_id}")).with_op("new_and_untriaged_summary_for_cl"));
        };

        let mut patchsets = Vec::with_capacity(cl.patchsets.len());
        for patchset in &cl.patchsets {
            let datapoints = gold_store::repo::changelists::datapoints_for_patchset(
                &self.pool, crs, cl_id, &patchset.id,
            )
            .await?;

            // Most recent CL-produced digest per trace (datapoints arrive
            // in tryjob execution order).
            let mut latest_by_trace: HashMap<String, String> = HashMap::new();
            for dp in &datapoints {
                latest_by_trace.insert(dp.trace_id.clone(), dp.digest.clone());
            }
            if latest_by_trace.is_empty() {
                patchsets.push(PatchsetNewAndUntriagedSummaryWire {
                    patchset_id: patchset.id.clone(),
                    patchset_order: patchset.order,
                    new_images: 0,
                    new_untriaged_images: 0,
                    total_untriaged_images: 0,
                });
                continue;
            }

            let trace_ids: Vec<TraceId> = latest_by_trace
                .keys()
                .map(|s| TraceId::from_hex(s))
                .collect::<std::result::Result<_, _>>()?;
            let traces = gold_store::repo::traces::load_traces(&self.pool, &trace_ids).await?;
            let trace_by_id: HashMap<&str, &gold_store::repo::traces::TraceRow> =
                traces.iter().map(|t| (t.trace_id.as_str(), t)).collect();

            let head_rows = gold_store::repo::traces::load_values_at_head(&self.pool, &trace_ids).await?;
            let primary_digest_by_trace: HashMap<&str, &str> =
                head_rows.iter().map(|r| (r.trace_id.as_str(), r.digest.as_str())).collect();

            // Flaky-trace threshold (spec §9 Open Question, resolved in
            // DESIGN.md): a trace with more than N distinct digests in the
            // window is excluded from untriaged counts, evaluated per-window.
            let flaky_traces: HashSet<&str> = if let Some(threshold) = self.config.flaky_trace_threshold {
                let window_values = gold_store::repo::traces::load_trace_values(&self.pool, &trace_ids).await?;
                let mut distinct_by_trace: HashMap<&str, HashSet<&str>> = HashMap::new();
                for row in &window_values {
                    distinct_by_trace.entry(row.trace_id.as_str()).or_default().insert(row.digest.as_str());
                }
                distinct_by_trace
                    .into_iter()
                    .filter(|(_, digests)| digests.len() as u32 > threshold)
                    .map(|(trace_id, _)| trace_id)
                    .collect()
            } else {
                HashSet::new()
            };

            let mut new_images = 0u64;
            let mut new_untriaged_images = 0u64;
            let mut total_untriaged_images = 0u64;
            for (trace_id, digest) in &latest_by_trace {
                let Some(trace) = trace_by_id.get(trace_id.as_str()) else {
                    continue;
                };
                let grouping_id = grouping_id_of(&trace.keys_map());
                let label = self
                    .resolver
                    .classify_for_cl(&self.pool, crs, cl_id, grouping_id, digest)
                    .await?;
                let is_untriaged = label == gold_core::model::Label::Untriaged && !flaky_traces.contains(trace_id.as_str());
                let is_new = primary_digest_by_trace.get(trace_id.as_str()) != Some(&digest.as_str());

                if is_new {
                    new_images += 1;
                    if is_untriaged {
                        new_untriaged_images += 1;
                    }
                }
                if is_untriaged {
                    total_untriaged_images += 1;
                }
            }

            patchsets.push(PatchsetNewAndUntriagedSummaryWire {
                patchset_id: patchset.id.clone(),
                patchset_order: patchset.order,
                new_images,
                new_untriaged_images,
                total_untriaged_images,
            });
        }

        patchsets.sort_by_key(|p| p.patchset_order);
        Ok(NewAndUntriagedSummaryWire { patchsets })
    }

    pub async fn changelist_last_updated(
        &self,
        crs: &str,
        cl_id: &str,
    ) -> Result<chrono::DateTime<chrono::Utc>> {
        let started = Instant::now();
        log_op_start!("changelist_last_updated");
        let result = gold_store::repo::changelists::changelist_last_updated(&self.pool, crs, cl_id).await;
        match &result {
            Ok(_) => log_op_end!(
                "changelist_last_updated",
                duration_ms = started.elapsed().as_millis() as u64
            ),
            Err(err) => log_op_error!(
                "changelist_last_updated",
                err,
                duration_ms = started.elapsed().as_millis() as u64
            ),
        }
        result
    }
}
