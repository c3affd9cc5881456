//! Staged CTE trace-filter plan — spec §4.2 steps 3-4.
//!
//! `TraceFilterPlan` is the compiled, injection-safe shape a `SearchQuery`
//! is validated into. It never carries raw, unsanitized strings: every
//! value it holds has already passed through [`crate::query::compiler::sanitize_value`].
//! Rendering to SQL is a pure, deterministic function of the plan's
//! contents (spec §8 property: "compiling the same structured query twice
//! yields byte-identical SQL").

use std::fmt::Write as _;

/// One filter stage: "restrict to traces where `key` is one of `values`".
/// Traces are intersected stage-by-stage via SQL `INTERSECT`, matching the
/// teacher's "intersect-of-unions over the trace index" approach — each
/// stage is itself a union over `values`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyStage {
    pub key: String,
    pub values: Vec<String>,
}

/// The compiled, deterministic plan for selecting a candidate trace id set.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TraceFilterPlan {
    pub corpus: Option<String>,
    /// One stage per filtered key, sorted by key name for determinism.
    pub stages: Vec<KeyStage>,
    /// Whether traces matching any ignore rule should be excluded.
    pub exclude_ignored: bool,
    /// Whether a per-corpus materialized view may be substituted for the
    /// base `Traces` table (spec §4.9).
    pub may_use_materialized_view: bool,
}

impl TraceFilterPlan {
    /// Render the plan to deterministic SQL text. Every literal embedded
    /// here has already been stripped of SQL metacharacters by the
    /// compiler — this function does not re-validate, it only renders.
    pub fn to_sql(&self) -> String {
        let source = if self.may_use_materialized_view {
            self.corpus
                .as_ref()
                .map(|c| format!("mv_{c}_traces"))
                .unwrap_or_else(|| "Traces".to_string())
        } else {
            "Traces".to_string()
        };

        let mut sql = String::new();
        for (i, stage) in self.stages.iter().enumerate() {
            let values_sql = stage
                .values
                .iter()
                .map(|v| format!("'{v}'"))
                .collect::<Vec<_>>()
                .join(", ");
            let _ = write!(
                sql,
                "stage_{i} AS (SELECT trace_id FROM {source} WHERE keys->>'{key}' IN ({values_sql}))",
                i = i,
                source = source,
                key = stage.key,
                values_sql = values_sql,
            );
            sql.push_str(",\n");
        }

        sql.insert_str(0, "WITH ");
        if self.stages.is_empty() {
            sql = String::new();
            sql.push_str(&format!("SELECT trace_id FROM {source}"));
        } else {
            // Drop the trailing ",\n" left by the loop.
            sql.truncate(sql.len() - 2);
            sql.push('\n');
            let intersected = (0..self.stages.len())
                .map(|i| format!("SELECT trace_id FROM stage_{i}"))
                .collect::<Vec<_>>()
                .join("\nINTERSECT\n");
            sql.push_str(&intersected);
        }

        if let Some(corpus) = &self.corpus {
            if self.stages.is_empty() {
                let _ = write!(sql, " WHERE keys->>'corpus' = '{corpus}'");
            } else {
                sql = format!(
                    "SELECT trace_id FROM ({sql}) t WHERE t.trace_id IN (SELECT trace_id FROM {source} WHERE keys->>'corpus' = '{corpus}')"
                );
            }
        }

        if self.exclude_ignored {
            sql = format!(
                "SELECT trace_id FROM ({sql}) t WHERE t.trace_id NOT IN (SELECT trace_id FROM {source} WHERE matches_any_ignore_rule)"
            );
        }

        sql
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_plan_selects_all() {
        let plan = TraceFilterPlan::default();
        assert_eq!(plan.to_sql(), "SELECT trace_id FROM Traces");
    }

    #[test]
    fn test_plan_is_deterministic() {
        let plan = TraceFilterPlan {
            corpus: Some("gm".to_string()),
            stages: vec![
                KeyStage {
                    key: "config".to_string(),
                    values: vec!["8888".to_string(), "gles".to_string()],
                },
                KeyStage {
                    key: "arch".to_string(),
                    values: vec!["x86_64".to_string()],
                },
            ],
            exclude_ignored: true,
            may_use_materialized_view: false,
        };
        let a = plan.to_sql();
        let b = plan.to_sql();
        assert_eq!(a, b);
        assert!(a.contains("INTERSECT"));
        assert!(a.contains("NOT IN"));
    }

    #[test]
    fn test_materialized_view_substitution() {
        let plan = TraceFilterPlan {
            corpus: Some("canvaskit".to_string()),
            stages: vec![],
            exclude_ignored: false,
            may_use_materialized_view: true,
        };
        assert!(plan.to_sql().contains("mv_canvaskit_traces"));
    }
}
