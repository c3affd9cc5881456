//! `GetBlamesForUntriagedDigests` response, spec §4.7.
//!
//! `gold_core::blame::build_blame_summary` groups per-(grouping, digest)
//! findings into entries keyed by commit range, but keeps one
//! `AffectedGrouping` per digest. The wire contract instead wants one
//! entry per grouping carrying an `untriaged_digests` count, so this
//! module re-aggregates within each range: group `AffectedGrouping`s by
//! `grouping_id`, count them, and sort by descending count with grouping
//! id as the tiebreaker (spec §4.7 step 5).

use std::collections::BTreeMap;

use gold_core::blame::{BlameEntry, BlameSummary};
use gold_core::model::{Digest, Grouping, GroupingId, TraceId};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct AffectedGroupingWire {
    pub grouping: Grouping,
    pub untriaged_digests: usize,
    pub sample_digest: String,
    pub trace_id_and_digests: Vec<(String, String)>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BlameEntryWire {
    pub commit_range: String,
    pub total_untriaged_digests: usize,
    pub affected_groupings: Vec<AffectedGroupingWire>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BlameSummaryWire {
    pub entries: Vec<BlameEntryWire>,
}

fn aggregate_entry(entry: &BlameEntry) -> BlameEntryWire {
    let mut by_grouping: BTreeMap<GroupingId, (Grouping, usize, Digest, Vec<(TraceId, Digest)>)> =
        BTreeMap::new();
    for finding in &entry.affected_groupings {
        let slot = by_grouping.entry(finding.grouping_id).or_insert_with(|| {
            (
                finding.grouping.clone(),
                0,
                finding.sample_digest,
                Vec::new(),
            )
        });
        slot.1 += 1;
        slot.3.extend(finding.trace_digests.iter().copied());
    }

    let mut rows: Vec<(GroupingId, AffectedGroupingWire)> = by_grouping
        .into_iter()
        .map(|(grouping_id, (grouping, count, sample_digest, trace_digests))| {
            (
                grouping_id,
                AffectedGroupingWire {
                    grouping,
                    untriaged_digests: count,
                    sample_digest: sample_digest.to_hex(),
                    trace_id_and_digests: trace_digests
                        .into_iter()
                        .map(|(t, d)| (t.to_hex(), d.to_hex()))
                        .collect(),
                },
            )
        })
        .collect();

    rows.sort_by(|(a_id, a), (b_id, b)| {
        b.untriaged_digests
            .cmp(&a.untriaged_digests)
            .then_with(|| a_id.cmp(b_id))
    });
    let affected_groupings = rows.into_iter().map(|(_, wire)| wire).collect();

    BlameEntryWire {
        commit_range: entry.commit_range.clone(),
        total_untriaged_digests: entry.total_untriaged_digests,
        affected_groupings,
    }
}

impl From<&BlameSummary> for BlameSummaryWire {
    fn from(summary: &BlameSummary) -> Self {
        Self {
            entries: summary.entries.iter().map(aggregate_entry).collect(),
        }
    }
}
