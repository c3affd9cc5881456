//! Per-corpus materialized trace views (spec §4.9): `mv_<corpus>_traces`,
//! a derived table of in-window trace ids for a configured corpus,
//! refreshed on a timer by `gold-cache`. This module owns the DDL/refresh
//! SQL; `gold-cache` owns the timer loop that calls it.

use sqlx::PgPool;

use crate::errors::Result;

fn view_name(corpus: &str) -> String {
    // `corpus` values come from `GoldConfig::corpora_with_materialized_views`,
    // an operator-controlled list, not untrusted request input, so direct
    // interpolation into the identifier position is acceptable here (unlike
    // the request-facing query compiler, which never interpolates raw
    // request text into SQL).
    let sanitized: String = corpus
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    format!("mv_{sanitized}_traces")
}

/// Create the materialized view for `corpus` if it doesn't already exist.
pub async fn ensure_view(pool: &PgPool, corpus: &str) -> Result<()> {
    let view = view_name(corpus);
    // Postgres doesn't support bind parameters in materialized view DDL;
    // `corpus` is sanitized by `view_name`/the config loader (an
    // operator-controlled list), not request input, so interpolation here
    // is acceptable (see module doc comment).
    sqlx::raw_sql(&format!(
        "CREATE MATERIALIZED VIEW IF NOT EXISTS {view} AS
         SELECT trace_id, grouping_id, corpus, keys, options, matches_any_ignore_rule
         FROM traces WHERE corpus = '{corpus}'",
    ))
    .execute(pool)
    .await?;
    Ok(())
}

/// Refresh `corpus`'s materialized view. Called by `gold-cache`'s
/// per-corpus refresh loop at its configured interval.
pub async fn refresh_view(pool: &PgPool, corpus: &str) -> Result<()> {
    let view = view_name(corpus);
    sqlx::raw_sql(&format!("REFRESH MATERIALIZED VIEW {view}"))
        .execute(pool)
        .await?;
    Ok(())
}

/// Row count currently in a corpus's materialized view, for refresh-loop
/// logging.
pub async fn view_row_count(pool: &PgPool, corpus: &str) -> Result<i64> {
    let view = view_name(corpus);
    let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {view}"))
        .fetch_one(pool)
        .await?;
    Ok(count)
}
