//! Blame Engine — spec §4.7.
//!
//! For a trace whose most recent (head) digest is untriaged, finds the
//! narrowest commit range in which the regression could have been
//! introduced, then combines per-trace ranges within a grouping using the
//! disjoint-range resolution rule: overlapping ranges intersect; a range
//! entirely older than the accumulated one replaces it; a range entirely
//! newer than the accumulated one is discarded.

use std::collections::BTreeMap;

use crate::model::{Commit, CommitWindow, Digest, Grouping, GroupingId, TraceId};

/// Compute the `[lower, upper]` commit-index range in which `target`
/// could have first appeared on a single trace, given:
/// - `head_index`: the index of the trace's most recent non-absent digest
///   (which must equal `target`),
/// - `digit_at(i)`: the trace's digest at commit index `i`, or `None` if
///   absent,
/// - `is_positive(d)`: whether digest `d` currently carries a positive
///   label.
///
/// Absent commits are transparent to both bounds. The lower bound is the
/// commit right after the most recent positively-labeled digest found
/// scanning backward (or the window's left edge if none is found). The
/// upper bound is the oldest commit, no older than that boundary, at
/// which `target` itself was observed.
pub fn compute_trace_blame_range(
    head_index: usize,
    target: Digest,
    digit_at: impl Fn(usize) -> Option<Digest>,
    is_positive: impl Fn(Digest) -> bool,
) -> (usize, usize) {
    let mut upper = head_index;
    let mut tracking_upper = true;

    if head_index == 0 {
        return (0, 0);
    }

    for i in (0..head_index).rev() {
        match digit_at(i) {
            None => continue,
            Some(d) if d == target => {
                if tracking_upper {
                    upper = i;
                }
            }
            Some(d) => {
                tracking_upper = false;
                if is_positive(d) {
                    return (i + 1, upper);
                }
            }
        }
    }
    (0, upper)
}

/// Combine a grouping's per-trace blame ranges into one accumulated range,
/// per spec §4.7 step 3. Traces must be supplied in a stable order (e.g.
/// sorted by trace id) for the result to be deterministic, since an
/// "entirely older" range replaces rather than merges with everything
/// accumulated so far.
pub fn combine_ranges(ranges: &[(usize, usize)]) -> Option<(usize, usize)> {
    let mut acc: Option<(usize, usize)> = None;
    for &(lo, hi) in ranges {
        acc = Some(match acc {
            None => (lo, hi),
            Some((alo, ahi)) => {
                if hi < alo {
                    (lo, hi)
                } else if lo > ahi {
                    (alo, ahi)
                } else {
                    (lo.max(alo), hi.min(ahi))
                }
            }
        });
    }
    acc
}

/// One trace contributing to a blame entry.
#[derive(Debug, Clone)]
pub struct AffectedGrouping {
    pub grouping_id: GroupingId,
    pub grouping: Grouping,
    pub sample_digest: Digest,
    pub trace_digests: Vec<(TraceId, Digest)>,
}

/// A blame entry: a commit range and every grouping whose untriaged
/// digest traces back to that range.
#[derive(Debug, Clone)]
pub struct BlameEntry {
    pub commit_range: String,
    pub commits: Vec<Commit>,
    pub total_untriaged_digests: usize,
    pub affected_groupings: Vec<AffectedGrouping>,
}

#[derive(Debug, Clone, Default)]
pub struct BlameSummary {
    pub entries: Vec<BlameEntry>,
}

/// One (grouping, untriaged digest) finding, with its combined per-trace
/// commit range already resolved.
pub struct GroupingBlame {
    pub grouping_id: GroupingId,
    pub grouping: Grouping,
    pub digest: Digest,
    pub range: (usize, usize),
    pub trace_digests: Vec<(TraceId, Digest)>,
}

/// Merge per-grouping findings that share a commit range into
/// [`BlameEntry`] rows, sorted by range (oldest first) and, within a
/// range, by descending untriaged-digest count.
pub fn build_blame_summary(window: &CommitWindow, findings: Vec<GroupingBlame>) -> BlameSummary {
    let mut by_range: BTreeMap<(usize, usize), Vec<GroupingBlame>> = BTreeMap::new();
    for finding in findings {
        by_range.entry(finding.range).or_default().push(finding);
    }

    let mut entries: Vec<BlameEntry> = by_range
        .into_iter()
        .map(|((lo, hi), mut group_findings)| {
            group_findings.sort_by(|a, b| a.grouping_id.cmp(&b.grouping_id));
            let commits = window.commits()[lo..=hi].to_vec();
            let affected_groupings: Vec<AffectedGrouping> = group_findings
                .into_iter()
                .map(|f| AffectedGrouping {
                    grouping_id: f.grouping_id,
                    grouping: f.grouping,
                    sample_digest: f.digest,
                    trace_digests: f.trace_digests,
                })
                .collect();
            let total_untriaged_digests = affected_groupings.len();
            BlameEntry {
                commit_range: window.format_range(lo, hi),
                commits,
                total_untriaged_digests,
                affected_groupings,
            }
        })
        .collect();

    entries.sort_by(|a, b| {
        a.commits
            .first()
            .map(|c| &c.id)
            .cmp(&b.commits.first().map(|c| &c.id))
    });

    BlameSummary { entries }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CommitId;

    fn digest(b: u8) -> Digest {
        Digest::from_hex(&format!("{b:02x}{:030}", 0)).unwrap()
    }

    /// Scenario S6: trace A = "A---bbbbbb", trace B = "AAAAAA---b" over a
    /// 10-commit window (index 0 oldest, index 9 head). 'A' is a positive
    /// digest, 'b' is the untriaged digest at head, '-' is absent.
    #[test]
    fn test_scenario_s6_disjoint_blame_ranges() {
        let a_pos = digest(0xaa);
        let b_tgt = digest(0xbb);

        let trace_a = [
            Some(a_pos),
            None,
            None,
            None,
            Some(b_tgt),
            Some(b_tgt),
            Some(b_tgt),
            Some(b_tgt),
            Some(b_tgt),
            Some(b_tgt),
        ];
        let trace_b = [
            Some(a_pos),
            Some(a_pos),
            Some(a_pos),
            Some(a_pos),
            Some(a_pos),
            Some(a_pos),
            None,
            None,
            None,
            Some(b_tgt),
        ];

        let is_positive = |d: Digest| d == a_pos;

        let range_a = compute_trace_blame_range(9, b_tgt, |i| trace_a[i], is_positive);
        assert_eq!(range_a, (1, 4));

        let range_b = compute_trace_blame_range(9, b_tgt, |i| trace_b[i], is_positive);
        assert_eq!(range_b, (6, 9));

        // Combining two disjoint ranges keeps the older one (trace_a's, since
        // it is processed first and trace_b's range is entirely newer).
        let combined = combine_ranges(&[range_a, range_b]).unwrap();
        assert_eq!(combined, (1, 4));
    }

    #[test]
    fn test_combine_overlapping_ranges_intersects() {
        let combined = combine_ranges(&[(2, 6), (4, 8)]).unwrap();
        assert_eq!(combined, (4, 6));
    }

    #[test]
    fn test_combine_newer_range_is_discarded() {
        let combined = combine_ranges(&[(1, 3), (8, 9)]).unwrap();
        assert_eq!(combined, (1, 3));
    }

    #[test]
    fn test_no_positive_digest_reaches_left_edge() {
        let digits = [None, None, Some(digest(1))];
        let range = compute_trace_blame_range(2, digest(1), |i| digits[i], |_| false);
        assert_eq!(range, (0, 2));
    }

    #[test]
    fn test_contiguous_single_commit_range() {
        let positive = digest(0xaa);
        let target = digest(0xbb);
        let digits = [Some(positive), Some(target)];
        let range =
            compute_trace_blame_range(1, target, |i| digits[i], |d| d == positive);
        assert_eq!(range, (1, 1));
    }
}
