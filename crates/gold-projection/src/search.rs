//! `Search` response, spec §4.3.

use gold_core::model::{Grouping, Label, ParamSet, TriageEntry};
use gold_core::reference_diff::ClosestRef;
use serde::Serialize;

use crate::reference::ReferenceDiffWire;
use crate::trace_group_wire::TraceGroupWire;

#[derive(Debug, Clone, Serialize)]
pub struct TriageEntryWire {
    pub user: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub label_before: Label,
    pub label_after: Label,
}

impl From<&TriageEntry> for TriageEntryWire {
    fn from(e: &TriageEntry) -> Self {
        Self {
            user: e.user.clone(),
            timestamp: e.timestamp,
            label_before: e.label_before,
            label_after: e.label_after,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CommitEntryWire {
    pub hash: String,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub commit_time: chrono::DateTime<chrono::Utc>,
    pub changelist_url: Option<String>,
}

/// One materialized search result, spec §4.3 "Per-result materialization".
#[derive(Debug, Clone, Serialize)]
pub struct SearchResultRowWire {
    pub digest: String,
    pub grouping: Grouping,
    pub label: Label,
    pub paramset: ParamSet,
    pub triage_history: Vec<TriageEntryWire>,
    pub closest_positive_ref: Option<ReferenceDiffWire>,
    pub closest_negative_ref: Option<ReferenceDiffWire>,
    pub closest_ref: ClosestRefWire,
    pub trace_group: TraceGroupWire,
    pub in_current_search_results_page: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClosestRefWire {
    Positive,
    Negative,
    None,
}

impl From<ClosestRef> for ClosestRefWire {
    fn from(c: ClosestRef) -> Self {
        match c {
            ClosestRef::Positive => ClosestRefWire::Positive,
            ClosestRef::Negative => ClosestRefWire::Negative,
            ClosestRef::None => ClosestRefWire::None,
        }
    }
}

/// One entry in `bulk_triage_delta_infos`, spec §4.3 "Bulk-triage delta".
/// Digests whose options carry `disallow_triaging=true` are never
/// constructed as one of these (the engine filters them before this type
/// is built, not here — this type has no way to see trace options).
#[derive(Debug, Clone, Serialize)]
pub struct BulkTriageDeltaInfoWire {
    pub grouping: Grouping,
    pub digest: String,
    pub label_before: Label,
    pub closest_diff_label: ClosestDiffLabelWire,
    pub in_current_search_results_page: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClosestDiffLabelWire {
    Positive,
    Negative,
    None,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchResponseWire {
    pub results: Vec<SearchResultRowWire>,
    pub offset: u32,
    pub size: usize,
    pub commits: Vec<CommitEntryWire>,
    pub bulk_triage_delta_infos: Vec<BulkTriageDeltaInfoWire>,
    pub trace_comments: Option<Vec<String>>,
}
