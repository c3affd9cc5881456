//! Reference Diff Selector — spec §4.5.
//!
//! Given a result digest and the positively/negatively labeled digests it
//! could be compared against, pick the closest positive and closest
//! negative by the configured metric, and report which of the two (if
//! either) is closer overall.

use crate::model::{DiffMetricRow, Digest, MetricKind, ParamSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClosestRef {
    Positive,
    Negative,
    None,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceDiffResult {
    pub digest: Digest,
    pub diff: DiffMetricRow,
    pub paramset: ParamSet,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReferenceDiffSelection {
    pub positive: Option<ReferenceDiffResult>,
    pub negative: Option<ReferenceDiffResult>,
}

impl ReferenceDiffSelection {
    /// Which of `positive`/`negative` is numerically closer under the same
    /// metric; `None` if neither reference exists.
    pub fn closest(&self, metric: MetricKind) -> ClosestRef {
        match (&self.positive, &self.negative) {
            (None, None) => ClosestRef::None,
            (Some(_), None) => ClosestRef::Positive,
            (None, Some(_)) => ClosestRef::Negative,
            (Some(p), Some(n)) => {
                let ps = p.diff.score(metric);
                let ns = n.diff.score(metric);
                if ps <= ns {
                    ClosestRef::Positive
                } else {
                    ClosestRef::Negative
                }
            }
        }
    }
}

/// One candidate the result digest could be diffed against: its digest,
/// its precomputed diff row against the result digest, and the union
/// ParamSet of traces currently producing it.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub digest: Digest,
    pub diff: DiffMetricRow,
    pub paramset: ParamSet,
}

/// Pick the minimum-score candidate by `metric`, breaking ties on the
/// lexicographically smaller digest for determinism.
fn closest(candidates: &[Candidate], metric: MetricKind) -> Option<ReferenceDiffResult> {
    candidates
        .iter()
        .min_by(|a, b| {
            a.diff
                .score(metric)
                .partial_cmp(&b.diff.score(metric))
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.digest.cmp(&b.digest))
        })
        .map(|c| ReferenceDiffResult {
            digest: c.digest,
            diff: c.diff.clone(),
            paramset: c.paramset.clone(),
        })
}

/// Select the closest positive and closest negative reference for a result
/// digest, given its already-computed diffs against each candidate.
pub fn select_reference_diffs(
    metric: MetricKind,
    positive_candidates: &[Candidate],
    negative_candidates: &[Candidate],
) -> ReferenceDiffSelection {
    ReferenceDiffSelection {
        positive: closest(positive_candidates, metric),
        negative: closest(negative_candidates, metric),
    }
}
