//! Shared reference-diff wire shape, spec §4.5: the `{digest, label,
//! combined_metric, query_metric, num_diff_pixels, pixel_diff_percent,
//! max_rgba_diffs, dim_differ, paramset}` object returned for the closest
//! positive/negative reference, or `null` when no candidate exists.

use gold_core::model::{Label, MetricKind, ParamSet};
use gold_core::reference_diff::ReferenceDiffResult;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct ReferenceDiffWire {
    pub digest: String,
    pub label: Label,
    pub combined_metric: f64,
    pub query_metric: f64,
    pub num_diff_pixels: u64,
    pub pixel_diff_percent: f64,
    pub max_rgba_diffs: [u8; 4],
    pub dim_differ: bool,
    pub paramset: ParamSet,
}

impl ReferenceDiffWire {
    pub fn from_result(result: &ReferenceDiffResult, label: Label, metric: MetricKind) -> Self {
        Self {
            digest: result.digest.to_hex(),
            label,
            combined_metric: result.diff.combined_metric,
            query_metric: result.diff.score(metric),
            num_diff_pixels: result.diff.num_pixels_diff,
            pixel_diff_percent: result.diff.percent_pixels_diff,
            max_rgba_diffs: result.diff.max_rgba_diffs,
            dim_differ: result.diff.dimensions_differ,
            paramset: result.paramset.clone(),
        }
    }
}
