//! `GetPrimaryBranchParamset` / `GetChangelistParamset` orchestration —
//! spec §4.3.

use std::time::Instant;

use gold_core::model::ParamSet;
use gold_errors::Result;
use gold_logging::{log_op_end, log_op_error, log_op_start};

use crate::engine::GoldEngine;

impl GoldEngine {
    pub async fn get_primary_branch_paramset(&self, corpus: Option<&str>) -> Result<ParamSet> {
        let started = Instant::now();
        log_op_start!("get_primary_branch_paramset");
        let result = self.paramset_inner(corpus).await;
        match &result {
            Ok(_) => log_op_end!(
                "get_primary_branch_paramset",
                duration_ms = started.elapsed().as_millis() as u64
            ),
            Err(err) => log_op_error!(
                "get_primary_branch_paramset",
                err,
                duration_ms = started.elapsed().as_millis() as u64
            ),
        }
        result
    }

    /// `cl`/`crs` only narrow which traces contributed on a patchset; the
    /// paramset itself is still drawn from the primary traces table plus
    /// whatever extra keys the CL's datapoints introduce, masked the same
    /// way as the primary-branch accessor.
    pub async fn get_changelist_paramset(&self, crs: &str, cl_id: &str) -> Result<ParamSet> {
        let started = Instant::now();
        log_op_start!("get_changelist_paramset");
        let result = self.changelist_paramset_inner(crs, cl_id).await;
        match &result {
            Ok(_) => log_op_end!(
                "get_changelist_paramset",
                duration_ms = started.elapsed().as_millis() as u64
            ),
            Err(err) => log_op_error!(
                "get_changelist_paramset",
                err,
                duration_ms = started.elapsed().as_millis() as u64
            ),
        }
        result
    }

    async fn paramset_inner(&self, corpus: Option<&str>) -> Result<ParamSet> {
        let public_matcher = self.public_params.get().await;
        let raw = gold_store::repo::traces::load_paramset(&self.pool, corpus).await?;
        Ok(match corpus {
            Some(c) => public_matcher.filter_paramset(c, &raw),
            None => raw,
        })
    }

    async fn changelist_paramset_inner(&self, crs: &str, cl_id: &str) -> Result<ParamSet> {
        let public_matcher = self.public_params.get().await;
        let Some(cl) = gold_store::repo::changelists::get_changelist(&self.pool, crs, cl_id).await? else {
            return Ok(ParamSet::new());
        };

        let mut trace_ids = Vec::new();
        for patchset in &cl.patchsets {
            trace_ids.extend(
                gold_store::repo::changelists::trace_ids_for_patchset(&self.pool, crs, cl_id, &patchset.id)
                    .await?,
            );
        }
        trace_ids.sort();
        trace_ids.dedup();
        let trace_ids: Vec<gold_core::model::TraceId> = trace_ids
            .iter()
            .map(|s| gold_core::model::TraceId::from_hex(s))
            .collect::<std::result::Result<_, _>>()?;

        let traces = gold_store::repo::traces::load_traces(&self.pool, &trace_ids).await?;
        let mut paramset = ParamSet::new();
        for trace in &traces {
            if !public_matcher.trace_visible(&trace.corpus, &trace.keys_map()) {
                continue;
            }
            gold_core::model::merge_paramset(&mut paramset, &trace.keys_map());
        }
        Ok(paramset)
    }
}
