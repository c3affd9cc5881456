//! Query Compiler — spec §4.2.
//!
//! Validates a structured `SearchQuery` and compiles it into a
//! [`TraceFilterPlan`]. Policy is "strip, don't escape": a key is rejected
//! outright if stripping unsafe characters would change it (keys come from
//! a fixed, small, trusted vocabulary so any mutation signals a bad
//! request); a value simply has its unsafe characters removed, since
//! values are user-supplied free text that legitimately needs normalizing.

use std::collections::BTreeMap;

use gold_errors::GoldError;

use super::plan::{KeyStage, TraceFilterPlan};
use crate::model::MetricKind;

/// Characters that must never reach a SQL literal or identifier position.
const UNSAFE_CHARS: &[char] = &['\'', '"', '\n', '\r', ';', '\\', '\0', '-', '/', '*'];

/// Remove every unsafe character from `v`.
pub fn sanitize_value(v: &str) -> String {
    v.chars().filter(|c| !UNSAFE_CHARS.contains(c)).collect()
}

/// Reject `k` outright if it contains any character sanitization would
/// remove.
pub fn validate_key(k: &str) -> Result<(), GoldError> {
    let cleaned = sanitize_value(k);
    if cleaned != k {
        return Err(GoldError::invalid_query(format!(
            "key '{k}' contains characters that are not allowed in a trace key"
        )));
    }
    if k.is_empty() {
        return Err(GoldError::invalid_query("key must not be empty"));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Structured search query, spec §4.2 / §4.3.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub corpus: Option<String>,
    pub trace_key_filters: BTreeMap<String, Vec<String>>,
    pub right_trace_key_filters: BTreeMap<String, Vec<String>>,
    pub metric: MetricKind,
    pub metric_min: Option<f64>,
    pub metric_max: Option<f64>,
    pub include_positive: bool,
    pub include_negative: bool,
    pub include_untriaged: bool,
    pub include_ignored: bool,
    pub sort: SortDirection,
    pub offset: u32,
    pub limit: u32,
    pub changelist_id: Option<String>,
    pub crs: Option<String>,
    pub patchsets: Vec<String>,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            corpus: None,
            trace_key_filters: BTreeMap::new(),
            right_trace_key_filters: BTreeMap::new(),
            metric: MetricKind::Combined,
            metric_min: None,
            metric_max: None,
            include_positive: false,
            include_negative: false,
            include_untriaged: true,
            include_ignored: false,
            sort: SortDirection::Descending,
            offset: 0,
            limit: 50,
            changelist_id: None,
            crs: None,
            patchsets: Vec::new(),
        }
    }
}

impl SearchQuery {
    /// Validate the query and compile it into a deterministic
    /// [`TraceFilterPlan`]. Keys are validated strictly (reject); values are
    /// sanitized leniently (strip).
    pub fn compile(&self, use_materialized_view: bool) -> Result<TraceFilterPlan, GoldError> {
        if let Some(corpus) = &self.corpus {
            validate_key(corpus)?;
        }
        if !self.include_positive && !self.include_negative && !self.include_untriaged {
            return Err(GoldError::invalid_query(
                "at least one of positive, negative, or untriaged must be included",
            ));
        }
        if let (Some(min), Some(max)) = (self.metric_min, self.metric_max) {
            if min > max {
                return Err(GoldError::invalid_query(format!(
                    "metric_min ({min}) must not exceed metric_max ({max})"
                )));
            }
        }

        let mut stages = Vec::with_capacity(self.trace_key_filters.len());
        for (key, values) in &self.trace_key_filters {
            validate_key(key)?;
            if values.is_empty() {
                return Err(GoldError::invalid_query(format!(
                    "key '{key}' was given an empty value set"
                )));
            }
            let mut cleaned: Vec<String> = values.iter().map(|v| sanitize_value(v)).collect();
            cleaned.sort();
            cleaned.dedup();
            stages.push(KeyStage {
                key: key.clone(),
                values: cleaned,
            });
        }
        // BTreeMap iteration is already key-sorted; stages is therefore
        // already deterministic, but sort defensively so callers that
        // build `stages` by hand elsewhere get the same guarantee.
        stages.sort_by(|a, b| a.key.cmp(&b.key));

        Ok(TraceFilterPlan {
            corpus: self.corpus.as_ref().map(|c| sanitize_value(c)),
            stages,
            exclude_ignored: !self.include_ignored,
            may_use_materialized_view: use_materialized_view,
        })
    }

    /// `CountDigestsByTest` (spec §4.3) requires every trace key filter to
    /// carry exactly one value — a single concrete test. Returns the
    /// collapsed single-valued map, or a `NotImplemented` error when any
    /// filter is multi-valued, since a multi-valued filter there would
    /// require a per-combination count the op does not define.
    pub fn require_single_valued(&self) -> Result<BTreeMap<String, String>, GoldError> {
        let mut out = BTreeMap::new();
        for (key, values) in &self.trace_key_filters {
            if values.len() != 1 {
                return Err(GoldError::new(gold_errors::GoldErrorKind::NotImplemented)
                    .with_message(format!(
                        "key '{key}' must have exactly one value for this operation"
                    )));
            }
            out.insert(key.clone(), values[0].clone());
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_strips_unsafe_chars() {
        assert_eq!(sanitize_value("gl; DROP TABLE"), "gl DROP TABLE");
        assert_eq!(sanitize_value("O'Brien"), "OBrien");
    }

    #[test]
    fn test_validate_key_rejects_mutation() {
        assert!(validate_key("config;drop").is_err());
        assert!(validate_key("config").is_ok());
        assert!(validate_key("").is_err());
    }

    #[test]
    fn test_compile_rejects_empty_label_set() {
        let q = SearchQuery {
            include_positive: false,
            include_negative: false,
            include_untriaged: false,
            ..Default::default()
        };
        assert!(q.compile(false).is_err());
    }

    #[test]
    fn test_compile_rejects_inverted_metric_range() {
        let q = SearchQuery {
            metric_min: Some(0.5),
            metric_max: Some(0.1),
            ..Default::default()
        };
        assert!(q.compile(false).is_err());
    }

    #[test]
    fn test_compile_is_idempotent() {
        let mut filters = BTreeMap::new();
        filters.insert("config".to_string(), vec!["8888".to_string(), "gles".to_string()]);
        let q = SearchQuery {
            corpus: Some("gm".to_string()),
            trace_key_filters: filters,
            ..Default::default()
        };
        let plan_a = q.compile(false).unwrap();
        let plan_b = q.compile(false).unwrap();
        assert_eq!(plan_a, plan_b);
        assert_eq!(plan_a.to_sql(), plan_b.to_sql());
    }

    #[test]
    fn test_require_single_valued() {
        let mut filters = BTreeMap::new();
        filters.insert("name".to_string(), vec!["circle".to_string()]);
        let q = SearchQuery {
            trace_key_filters: filters,
            ..Default::default()
        };
        assert!(q.require_single_valued().is_ok());

        let mut multi = BTreeMap::new();
        multi.insert("name".to_string(), vec!["circle".to_string(), "square".to_string()]);
        let q2 = SearchQuery {
            trace_key_filters: multi,
            ..Default::default()
        };
        assert!(q2.require_single_valued().is_err());
    }
}
