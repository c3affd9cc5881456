//! Trace Group Builder — spec §4.6.
//!
//! Compacts the (possibly large) set of distinct digests a group of traces
//! produced across the commit window down to at most 9 slots (indices
//! 0-8), so a fixed-width visualization can render any trace's history as
//! a short sequence of small integers. Index 0 is always the digest under
//! investigation; index 8 is an overflow bucket for everything that didn't
//! make the cut.

use std::collections::HashMap;

use crate::model::{Digest, TraceId};

const MAX_DISTINCT: usize = 9;
const OVERFLOW_INDEX: i32 = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceWindowEntry {
    pub commit_index: usize,
    pub digest: Digest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceInput {
    pub trace_id: TraceId,
    /// Observed (commit_index, digest) pairs; need not be sorted or dense.
    pub entries: Vec<TraceWindowEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceGroupRow {
    pub trace_id: TraceId,
    /// Length `window_len`; `-1` where the trace has no digest at that
    /// commit.
    pub digest_indices: Vec<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceGroup {
    /// `digests[i]` is the digest assigned index `i`. Always starts with
    /// the primary digest at index 0. Length at most 9; index 8 (if
    /// present) is the overflow bucket placeholder and has no single
    /// digest of its own.
    pub digests: Vec<Digest>,
    pub traces: Vec<TraceGroupRow>,
    /// The true number of distinct digests observed, which may exceed
    /// `digests.len()` when an overflow bucket was needed.
    pub total_digests: usize,
}

/// Build a trace group for `window_len` commits, centered on
/// `primary_digest`.
pub fn build_trace_group(
    window_len: usize,
    primary_digest: Digest,
    inputs: &[TraceInput],
) -> TraceGroup {
    build_trace_group_with_extra_columns(window_len, 0, primary_digest, inputs)
}

/// As [`build_trace_group`], but appends `extra_columns` synthetic columns
/// to the right of the window (spec §4.3 "Changelist result specifics":
/// one column per CL tryjob datapoint, uncollapsed). `TraceInput` entries
/// may use `commit_index` in `window_len..window_len+extra_columns` to
/// place a trace's CL datapoints into those columns; they rank ahead of
/// the window proper since the right-to-left scan starts past the head.
pub fn build_trace_group_with_extra_columns(
    window_len: usize,
    extra_columns: usize,
    primary_digest: Digest,
    inputs: &[TraceInput],
) -> TraceGroup {
    let total_len = window_len + extra_columns;

    // Step 1: rank digests by scanning right-to-left (newest first —
    // synthetic columns, then window head), recording the first three
    // *distinct* non-primary digests encountered, in the order traces are
    // given at each commit index.
    let mut index_of: HashMap<Digest, usize> = HashMap::new();
    let mut digests = vec![primary_digest];
    index_of.insert(primary_digest, 0);

    // commit_index -> trace position -> digest, built once for repeated
    // right-to-left scans.
    let mut by_commit: Vec<Vec<Digest>> = vec![Vec::new(); total_len];
    for input in inputs {
        for entry in &input.entries {
            if entry.commit_index < total_len {
                by_commit[entry.commit_index].push(entry.digest);
            }
        }
    }

    let mut first_appearance: HashMap<Digest, usize> = HashMap::new();
    let mut frequency: HashMap<Digest, usize> = HashMap::new();
    for commit_index in (0..total_len).rev() {
        for &digest in &by_commit[commit_index] {
            first_appearance.entry(digest).or_insert(commit_index);
            *frequency.entry(digest).or_insert(0) += 1;
            if digests.len() < 4 && digest != primary_digest && !index_of.contains_key(&digest) {
                index_of.insert(digest, digests.len());
                digests.push(digest);
            }
        }
    }

    // Step 2: remaining slots (indices 4-7) go to the highest-frequency
    // remaining digests, ties broken by earliest first appearance
    // (furthest back scanned), then by digest value for full determinism.
    let mut remaining: Vec<Digest> = frequency
        .keys()
        .copied()
        .filter(|d| !index_of.contains_key(d))
        .collect();
    remaining.sort_by(|a, b| {
        frequency[b]
            .cmp(&frequency[a])
            .then_with(|| first_appearance[a].cmp(&first_appearance[b]))
            .then_with(|| a.cmp(b))
    });
    for digest in remaining.into_iter().take(4) {
        index_of.insert(digest, digests.len());
        digests.push(digest);
    }

    let total_digests = frequency.len().max(1);
    let overflow_needed = total_digests > digests.len();

    // Step 3: build each trace's per-commit index row.
    let mut traces = Vec::with_capacity(inputs.len());
    for input in inputs {
        let mut row = vec![-1i32; total_len];
        for entry in &input.entries {
            if entry.commit_index >= total_len {
                continue;
            }
            let idx = match index_of.get(&entry.digest) {
                Some(&i) => i as i32,
                None => OVERFLOW_INDEX,
            };
            row[entry.commit_index] = idx;
        }
        traces.push(TraceGroupRow {
            trace_id: input.trace_id,
            digest_indices: row,
        });
    }

    if overflow_needed && digests.len() < MAX_DISTINCT {
        // Reserve slot 8 conceptually; callers render index 8 rows as the
        // overflow bucket even without a concrete digest occupying it.
    }

    TraceGroup {
        digests,
        traces,
        total_digests,
    }
}
