//! Grouping & Digest Model — spec §3.
//!
//! Semantic types shared by every other module in this crate: digests,
//! groupings, traces, the commit window, labels, changelists, and diff
//! metric rows. Pure data plus the few derivations spec §3 pins down
//! (grouping id is a function of trace keys; a digest is a 16-byte hash).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest as Sha2Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use gold_errors::GoldError;

/// Content hash of a rendered image: 16 raw bytes, 32 hex chars externally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Digest([u8; 16]);

impl Digest {
    /// Parse a 32-character lowercase hex string.
    pub fn from_hex(s: &str) -> Result<Self, GoldError> {
        if s.len() != 32 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(GoldError::invalid_query(format!(
                "'{s}' is not a 32-character hex digest"
            )));
        }
        let bytes = hex::decode(s)
            .map_err(|e| GoldError::invalid_query(format!("invalid digest hex: {e}")))?;
        let mut arr = [0u8; 16];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    /// The raw 16 bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Lowercase 32-character hex representation.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.to_hex())
    }
}

impl Serialize for Digest {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Digest::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// A union of key/value pairs observed across one or more traces.
pub type ParamSet = BTreeMap<String, BTreeSet<String>>;

/// Merge `other` into `target`, as the "merged ParamSet across contributing
/// traces" construction used throughout spec §4.3 and §4.5.
pub fn merge_paramset(target: &mut ParamSet, other: &BTreeMap<String, String>) {
    for (k, v) in other {
        target.entry(k.clone()).or_default().insert(v.clone());
    }
}

/// 16-byte id derived from a grouping's canonicalized key/value pairs
/// (spec §3 invariant 1: "the grouping id is a pure function of the trace
/// keys").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupingId([u8; 16]);

impl GroupingId {
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for GroupingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// A small set of canonical key/value pairs identifying "what test is this"
/// (typically `corpus` + `name`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Grouping(BTreeMap<String, String>);

impl Grouping {
    /// Build a grouping by projecting `trace_keys` onto `grouping_key_names`
    /// — the configured set of key names that together name a test (e.g.
    /// `["corpus", "name"]`). Keys absent from `trace_keys` are omitted.
    pub fn from_trace_keys(
        trace_keys: &BTreeMap<String, String>,
        grouping_key_names: &[&str],
    ) -> Self {
        let mut map = BTreeMap::new();
        for key in grouping_key_names {
            if let Some(v) = trace_keys.get(*key) {
                map.insert((*key).to_string(), v.clone());
            }
        }
        Self(map)
    }

    pub fn as_map(&self) -> &BTreeMap<String, String> {
        &self.0
    }

    /// The 16-byte id: the SHA-256 of the canonical (BTreeMap-sorted) JSON
    /// serialization, truncated to its first 16 bytes. Same pattern as the
    /// content-digest computation used elsewhere for deterministic hashing
    /// of canonicalized structures.
    pub fn id(&self) -> GroupingId {
        let canonical =
            serde_json::to_string(&self.0).expect("BTreeMap<String,String> serialization is infallible");
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        let full = hasher.finalize();
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&full[..16]);
        GroupingId(bytes)
    }

    pub fn corpus(&self) -> Option<&str> {
        self.0.get("corpus").map(String::as_str)
    }
}

/// 16-byte id of a trace (unique per keys + options combination).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TraceId([u8; 16]);

impl TraceId {
    pub fn from_hex(s: &str) -> Result<Self, GoldError> {
        if s.len() != 32 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(GoldError::invalid_query(format!(
                "'{s}' is not a valid trace id"
            )));
        }
        let bytes = hex::decode(s)
            .map_err(|e| GoldError::invalid_query(format!("invalid trace id hex: {e}")))?;
        let mut arr = [0u8; 16];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Derive a trace id from its keys+options, the same way a grouping id
    /// is derived from its keys: hash of the canonical serialization of
    /// `keys` and `options` together.
    pub fn derive(keys: &BTreeMap<String, String>, options: &BTreeMap<String, String>) -> Self {
        let canonical = serde_json::to_string(&(keys, options))
            .expect("BTreeMap<String,String> serialization is infallible");
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        let full = hasher.finalize();
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&full[..16]);
        Self(bytes)
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// The ordered sequence of digests produced by one unique keys+options
/// combination across the commit window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trace {
    pub id: TraceId,
    pub grouping_id: GroupingId,
    pub corpus: String,
    pub keys: BTreeMap<String, String>,
    pub options: BTreeMap<String, String>,
    /// Disjunction of the current ignore rules applied to this trace's
    /// keys+options (spec §3 invariant 2).
    pub matches_any_ignore_rule: bool,
}

/// One observed (commit_index, digest) pair for a trace within the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceDigestAt {
    pub commit_index: usize,
    pub digest: Digest,
}

/// Opaque, monotonically ordered commit identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CommitId(pub String);

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single commit in the window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub id: CommitId,
    pub git_hash: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// An ordered, at-most-`W` sequence of the most recent commits for which any
/// data was ingested (spec §3 "Commit window", §9 "ambient query context").
///
/// Index 0 is the oldest commit in the window; index `len()-1` is head.
/// Prefix-closed for the life of a query (spec §3 invariant 4): extending
/// the window never changes the indices already handed out.
#[derive(Debug, Clone, Default)]
pub struct CommitWindow {
    commits: Vec<Commit>,
    index_by_id: BTreeMap<CommitId, usize>,
}

impl CommitWindow {
    pub fn new(commits: Vec<Commit>) -> Self {
        let index_by_id = commits
            .iter()
            .enumerate()
            .map(|(i, c)| (c.id.clone(), i))
            .collect();
        Self {
            commits,
            index_by_id,
        }
    }

    pub fn len(&self) -> usize {
        self.commits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }

    pub fn commits(&self) -> &[Commit] {
        &self.commits
    }

    pub fn index_of(&self, id: &CommitId) -> Option<usize> {
        self.index_by_id.get(id).copied()
    }

    pub fn head_index(&self) -> Option<usize> {
        if self.commits.is_empty() {
            None
        } else {
            Some(self.commits.len() - 1)
        }
    }

    pub fn commit_at(&self, index: usize) -> Option<&Commit> {
        self.commits.get(index)
    }

    /// Render an inclusive `[lo, hi]` index range as the wire-format commit
    /// range string: a single commit id if `lo == hi`, else `"lo:hi"`
    /// (spec §4.7 step 4).
    pub fn format_range(&self, lo: usize, hi: usize) -> String {
        if lo == hi {
            self.commits[lo].id.0.clone()
        } else {
            format!("{}:{}", self.commits[lo].id.0, self.commits[hi].id.0)
        }
    }
}

/// Human triage verdict for a (grouping, digest) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Untriaged,
    Positive,
    Negative,
}

impl Default for Label {
    fn default() -> Self {
        Label::Untriaged
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Label::Untriaged => "untriaged",
            Label::Positive => "positive",
            Label::Negative => "negative",
        };
        write!(f, "{s}")
    }
}

/// One entry in a (grouping, digest)'s triage history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriageEntry {
    pub user: String,
    pub timestamp: DateTime<Utc>,
    pub label_before: Label,
    pub label_after: Label,
}

/// Which metric the Reference Diff Selector and search sort use to score a
/// diff row (spec §4.5, §4.3 step 7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Combined,
    Percent,
    Pixel,
}

/// (left digest, right digest) → diff row. Symmetric: both directions are
/// stored with identical numeric metrics (spec §3 invariant 5).
#[derive(Debug, Clone, PartialEq)]
pub struct DiffMetricRow {
    pub left: Digest,
    pub right: Digest,
    pub num_pixels_diff: u64,
    pub percent_pixels_diff: f64,
    pub max_rgba_diffs: [u8; 4],
    pub combined_metric: f64,
    pub dimensions_differ: bool,
    pub timestamp: DateTime<Utc>,
}

impl DiffMetricRow {
    /// The score for the configured metric.
    pub fn score(&self, metric: MetricKind) -> f64 {
        match metric {
            MetricKind::Combined => self.combined_metric,
            MetricKind::Percent => self.percent_pixels_diff,
            MetricKind::Pixel => self.num_pixels_diff as f64,
        }
    }

    /// The maximum single-channel diff across R,G,B,A.
    pub fn max_channel_diff(&self) -> u8 {
        self.max_rgba_diffs.iter().copied().max().unwrap_or(0)
    }
}

/// Qualified changelist id: a code-review-system id plus the CL id within
/// that system.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct QualifiedChangelistId {
    pub crs: String,
    pub id: String,
}

impl fmt::Display for QualifiedChangelistId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.crs, self.id)
    }
}

/// Changelist status, as reported by the code-review system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangelistStatus {
    Open,
    Landed,
    Abandoned,
}

/// A revision of a Changelist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patchset {
    pub id: String,
    pub order: u32,
}

/// A code-review changelist, with its ordered patchsets.
#[derive(Debug, Clone, PartialEq)]
pub struct Changelist {
    pub id: QualifiedChangelistId,
    pub author: String,
    pub subject: String,
    pub status: ChangelistStatus,
    pub last_updated: DateTime<Utc>,
    pub patchsets: Vec<Patchset>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_hex_round_trip() {
        let hex = "0123456789abcdef0123456789abcdef";
        // 32 chars exactly
        assert_eq!(hex.len(), 32);
        let d = Digest::from_hex(hex).unwrap();
        assert_eq!(d.to_hex(), hex);
    }

    #[test]
    fn test_digest_rejects_bad_length() {
        assert!(Digest::from_hex("abc").is_err());
    }

    #[test]
    fn test_digest_rejects_non_hex() {
        let bad = "zz23456789abcdef0123456789abcdef";
        assert!(Digest::from_hex(bad).is_err());
    }

    #[test]
    fn test_grouping_id_is_pure_function_of_keys() {
        let mut keys_a = BTreeMap::new();
        keys_a.insert("corpus".to_string(), "gm".to_string());
        keys_a.insert("name".to_string(), "circle".to_string());
        keys_a.insert("config".to_string(), "8888".to_string());

        let mut keys_b = keys_a.clone();
        keys_b.insert("config".to_string(), "gles".to_string());

        let ga = Grouping::from_trace_keys(&keys_a, &["corpus", "name"]);
        let gb = Grouping::from_trace_keys(&keys_b, &["corpus", "name"]);

        // Differs only in a key outside the grouping's key set -> same id.
        assert_eq!(ga.id(), gb.id());
    }

    #[test]
    fn test_grouping_id_changes_with_grouping_keys() {
        let mut keys_a = BTreeMap::new();
        keys_a.insert("corpus".to_string(), "gm".to_string());
        keys_a.insert("name".to_string(), "circle".to_string());

        let mut keys_b = BTreeMap::new();
        keys_b.insert("corpus".to_string(), "gm".to_string());
        keys_b.insert("name".to_string(), "square".to_string());

        let ga = Grouping::from_trace_keys(&keys_a, &["corpus", "name"]);
        let gb = Grouping::from_trace_keys(&keys_b, &["corpus", "name"]);
        assert_ne!(ga.id(), gb.id());
    }

    #[test]
    fn test_commit_window_format_range_single() {
        let w = CommitWindow::new(vec![
            Commit {
                id: CommitId("c0".into()),
                git_hash: None,
                author: None,
                subject: None,
                timestamp: DateTime::<Utc>::UNIX_EPOCH,
            },
            Commit {
                id: CommitId("c1".into()),
                git_hash: None,
                author: None,
                subject: None,
                timestamp: DateTime::<Utc>::UNIX_EPOCH,
            },
        ]);
        assert_eq!(w.format_range(1, 1), "c1");
        assert_eq!(w.format_range(0, 1), "c0:c1");
        assert_eq!(w.index_of(&CommitId("c1".into())), Some(1));
        assert_eq!(w.head_index(), Some(1));
    }

    #[test]
    fn test_label_default_is_untriaged() {
        assert_eq!(Label::default(), Label::Untriaged);
    }
}
