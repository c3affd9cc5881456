//! `ComputeGUIStatus` orchestration — spec §4.3.

use std::collections::HashMap;
use std::time::Instant;

use gold_core::model::Label;
use gold_core::query::plan::TraceFilterPlan;
use gold_errors::Result;
use gold_logging::{log_op_end, log_op_error, log_op_start};
use gold_projection::gui_status::{CorpusStatusWire, GuiStatusWire};

use crate::engine::GoldEngine;

impl GoldEngine {
    pub async fn compute_gui_status(&self) -> Result<GuiStatusWire> {
        let started = Instant::now();
        log_op_start!("compute_gui_status");
        let result = self.compute_gui_status_inner().await;
        match &result {
            Ok(_) => log_op_end!("compute_gui_status", duration_ms = started.elapsed().as_millis() as u64),
            Err(err) => log_op_error!(
                "compute_gui_status",
                err,
                duration_ms = started.elapsed().as_millis() as u64
            ),
        }
        result
    }

    async fn compute_gui_status_inner(&self) -> Result<GuiStatusWire> {
        let last_commit = gold_store::repo::commits::most_recent_commit(&self.pool).await?;
        let corpora = gold_store::repo::traces::list_corpora(&self.pool).await?;
        let public_matcher = self.public_params.get().await;

        let mut corpus_status = Vec::with_capacity(corpora.len());
        for corpus in corpora {
            if !public_matcher.corpus_visible(&corpus) {
                continue;
            }

            let plan = TraceFilterPlan {
                corpus: Some(corpus.clone()),
                stages: Vec::new(),
                exclude_ignored: true,
                may_use_materialized_view: self.corpus_has_materialized_view(&corpus),
            };
            let trace_ids = gold_store::repo::traces::select_candidate_trace_ids(&self.pool, &plan).await?;
            let traces = gold_store::repo::traces::load_traces(&self.pool, &trace_ids).await?;
            let traces: Vec<_> = traces
                .into_iter()
                .filter(|t| public_matcher.trace_visible(&t.corpus, &t.keys_map()))
                .collect();
            if traces.is_empty() {
                corpus_status.push(CorpusStatusWire {
                    corpus,
                    untriaged_count: 0,
                });
                continue;
            }

            let grouping_by_trace: HashMap<String, gold_core::model::GroupingId> =
                traces.iter().map(|t| (t.trace_id.clone(), t.grouping_id())).collect();
            let trace_id_vals: Vec<gold_core::model::TraceId> =
                traces.iter().map(|t| t.trace_id()).collect::<Result<_>>()?;
            let head_rows = gold_store::repo::traces::load_values_at_head(&self.pool, &trace_id_vals).await?;

            let mut untriaged_count = 0u64;
            for row in &head_rows {
                let Some(&grouping_id) = grouping_by_trace.get(&row.trace_id) else {
                    continue;
                };
                let label = self.resolver.classify(&self.pool, grouping_id, &row.digest).await?;
                if label == Label::Untriaged {
                    untriaged_count += 1;
                }
            }
            corpus_status.push(CorpusStatusWire {
                corpus,
                untriaged_count,
            });
        }

        Ok(GuiStatusWire {
            last_commit_hash: last_commit.as_ref().and_then(|c| c.git_hash.clone()),
            last_commit_time: last_commit.map(|c| c.timestamp),
            corpus_status,
        })
    }
}
