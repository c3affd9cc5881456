//! `GetDigestDetails` / `GetDigestsDiff` responses, spec §4.3.

use gold_core::model::{Grouping, Label, ParamSet};
use serde::Serialize;

use crate::reference::ReferenceDiffWire;
use crate::search::TriageEntryWire;
use crate::trace_group_wire::TraceGroupWire;

#[derive(Debug, Clone, Serialize)]
pub struct DigestDetailsWire {
    pub digest: String,
    pub grouping: Grouping,
    pub label: Label,
    pub paramset: ParamSet,
    pub triage_history: Vec<TriageEntryWire>,
    pub closest_positive_ref: Option<ReferenceDiffWire>,
    pub closest_negative_ref: Option<ReferenceDiffWire>,
    pub trace_group: TraceGroupWire,
}

/// `GetDigestsDiff(grouping, left, right, cl?, crs?)`: the raw diff row
/// between two specific digests, plus each side's label and ParamSet —
/// distinct from a [`ReferenceDiffWire`], which is scoped to "the closest
/// candidate for some other digest" rather than a requested pair.
#[derive(Debug, Clone, Serialize)]
pub struct DigestComparisonWire {
    pub left_digest: String,
    pub right_digest: String,
    pub left_label: Label,
    pub right_label: Label,
    pub left_paramset: ParamSet,
    pub right_paramset: ParamSet,
    pub num_diff_pixels: u64,
    pub pixel_diff_percent: f64,
    pub max_rgba_diffs: [u8; 4],
    pub combined_metric: f64,
    pub dim_differ: bool,
}
