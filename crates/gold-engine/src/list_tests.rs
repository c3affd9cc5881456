//! `CountDigestsByTest` orchestration — spec §4.3.

use std::collections::HashMap;
use std::time::Instant;

use gold_core::model::{Digest, GroupingId, Label};
use gold_core::query::compiler::SearchQuery;
use gold_errors::Result;
use gold_logging::{log_op_end, log_op_error, log_op_start};
use gold_projection::list_tests::{ListTestsResponseWire, TestDigestCountsWire};

use crate::engine::GoldEngine;
use crate::grouping::grouping_of;

impl GoldEngine {
    pub async fn count_digests_by_test(&self, query: &SearchQuery) -> Result<ListTestsResponseWire> {
        let started = Instant::now();
        log_op_start!("count_digests_by_test");
        let result = self.count_digests_by_test_inner(query).await;
        match &result {
            Ok(_) => log_op_end!(
                "count_digests_by_test",
                duration_ms = started.elapsed().as_millis() as u64
            ),
            Err(err) => log_op_error!(
                "count_digests_by_test",
                err,
                duration_ms = started.elapsed().as_millis() as u64
            ),
        }
        result
    }

    async fn count_digests_by_test_inner(&self, query: &SearchQuery) -> Result<ListTestsResponseWire> {
        // A multi-valued filter key fails outright here (spec §4.3); a
        // single-valued one still flows through the usual plan compiler.
        query.require_single_valued()?;

        let public_matcher = self.public_params.get().await;
        let plan = query.compile(false)?;
        let trace_ids = gold_store::repo::traces::select_candidate_trace_ids(&self.pool, &plan).await?;
        let mut traces = gold_store::repo::traces::load_traces(&self.pool, &trace_ids).await?;
        traces.retain(|t| {
            public_matcher.corpus_visible(&t.corpus) && public_matcher.trace_visible(&t.corpus, &t.keys_map())
        });
        if traces.is_empty() {
            return Ok(ListTestsResponseWire::default());
        }

        let mut by_grouping: HashMap<GroupingId, Vec<&gold_store::repo::traces::TraceRow>> = HashMap::new();
        for trace in &traces {
            by_grouping.entry(trace.grouping_id()).or_default().push(trace);
        }

        let mut tests = Vec::with_capacity(by_grouping.len());
        for (grouping_id, group_traces) in &by_grouping {
            let trace_id_vals: Vec<gold_core::model::TraceId> =
                group_traces.iter().map(|t| t.trace_id()).collect::<Result<_>>()?;
            let head_rows = gold_store::repo::traces::load_values_at_head(&self.pool, &trace_id_vals).await?;

            let mut distinct: HashMap<Digest, ()> = HashMap::new();
            let mut positive = 0u64;
            let mut negative = 0u64;
            let mut untriaged = 0u64;
            for row in &head_rows {
                let digest = Digest::from_hex(&row.digest)?;
                if distinct.insert(digest, ()).is_some() {
                    continue;
                }
                match self.resolver.classify(&self.pool, *grouping_id, &row.digest).await? {
                    Label::Positive => positive += 1,
                    Label::Negative => negative += 1,
                    Label::Untriaged => untriaged += 1,
                }
            }

            let grouping = grouping_of(&group_traces[0].keys_map());
            tests.push(TestDigestCountsWire {
                grouping,
                positive_digests: positive,
                negative_digests: negative,
                untriaged_digests: untriaged,
            });
        }

        tests.sort_by(|a, b| a.grouping.as_map().cmp(b.grouping.as_map()));
        Ok(ListTestsResponseWire { tests })
    }
}
