//! `Expectations` / `ExpectationRecords` / `SecondaryBranch*` repository
//! functions — spec §3 "Expectation record", §4.1, §6.

use sqlx::PgPool;

use gold_core::model::{Label, TriageEntry};

use crate::errors::Result;

fn parse_label(s: &str) -> Label {
    match s {
        "positive" => Label::Positive,
        "negative" => Label::Negative,
        _ => Label::Untriaged,
    }
}

/// The current primary-branch label for `(grouping_id, digest)`, or
/// `Label::Untriaged` if no expectation record exists (spec §3: "default
/// for any unseen (grouping, digest) pair is `untriaged`").
pub async fn classify(pool: &PgPool, grouping_id: &str, digest: &str) -> Result<Label> {
    let label: Option<String> =
        sqlx::query_scalar("SELECT label FROM expectations WHERE grouping_id = $1 AND digest = $2")
            .bind(grouping_id)
            .bind(digest)
            .fetch_optional(pool)
            .await?;
    Ok(label.map(|l| parse_label(&l)).unwrap_or(Label::Untriaged))
}

/// The CL-scoped label: the CL's delta if one exists, else the primary
/// label (spec §4.1 resolution order, invariant 2: "never the empty
/// string").
pub async fn classify_for_cl(
    pool: &PgPool,
    crs: &str,
    cl_id: &str,
    grouping_id: &str,
    digest: &str,
) -> Result<Label> {
    let delta: Option<String> = sqlx::query_scalar(
        "SELECT label FROM secondary_branch_expectations
         WHERE crs = $1 AND cl_id = $2 AND grouping_id = $3 AND digest = $4",
    )
    .bind(crs)
    .bind(cl_id)
    .bind(grouping_id)
    .bind(digest)
    .fetch_optional(pool)
    .await?;

    match delta {
        Some(l) => Ok(parse_label(&l)),
        None => classify(pool, grouping_id, digest).await,
    }
}

#[derive(sqlx::FromRow)]
struct TriageRow {
    user_name: String,
    ts: chrono::DateTime<chrono::Utc>,
    label_before: String,
    label_after: String,
}

impl From<TriageRow> for TriageEntry {
    fn from(r: TriageRow) -> Self {
        TriageEntry {
            user: r.user_name,
            timestamp: r.ts,
            label_before: parse_label(&r.label_before),
            label_after: parse_label(&r.label_after),
        }
    }
}

/// Primary-branch triage history, most recent first. Returns an empty
/// vector (never an error) if the store round-trip fails or no history
/// exists — spec §4.1: "the resolver returns empty history but does not
/// fail the enclosing query."
pub async fn triage_history(pool: &PgPool, grouping_id: &str, digest: &str) -> Vec<TriageEntry> {
    let result = sqlx::query_as::<_, TriageRow>(
        "SELECT user_name, ts, label_before, label_after FROM expectation_records
         WHERE grouping_id = $1 AND digest = $2 ORDER BY ts DESC",
    )
    .bind(grouping_id)
    .bind(digest)
    .fetch_all(pool)
    .await;

    match result {
        Ok(rows) => rows.into_iter().map(TriageEntry::from).collect(),
        Err(e) => {
            tracing::warn!(error = %e, "triage_history store round-trip failed, degrading to empty history");
            Vec::new()
        }
    }
}

/// CL-scoped triage history: the CL's delta history (most recent first)
/// followed by the primary history (spec §4.1).
pub async fn triage_history_for_cl(
    pool: &PgPool,
    crs: &str,
    cl_id: &str,
    grouping_id: &str,
    digest: &str,
) -> Vec<TriageEntry> {
    let delta = sqlx::query_as::<_, TriageRow>(
        "SELECT user_name, ts, label_before, label_after
         FROM secondary_branch_expectation_records
         WHERE crs = $1 AND cl_id = $2 AND grouping_id = $3 AND digest = $4
         ORDER BY ts DESC",
    )
    .bind(crs)
    .bind(cl_id)
    .bind(grouping_id)
    .bind(digest)
    .fetch_all(pool)
    .await;

    let mut history: Vec<TriageEntry> = match delta {
        Ok(rows) => rows.into_iter().map(TriageEntry::from).collect(),
        Err(e) => {
            tracing::warn!(error = %e, "CL triage_history store round-trip failed, degrading to empty history");
            Vec::new()
        }
    };
    history.extend(triage_history(pool, grouping_id, digest).await);
    history
}

/// The timestamp of the most recent CL-scoped triage record strictly
/// after `since` — used by the Search pipeline's "CL override for
/// recently-triaged digests" step (spec §4.3 step 4): if a digest was
/// triaged on the CL after the last materialized-view refresh, it must be
/// filtered out immediately regardless of cache freshness.
pub async fn triaged_on_cl_since(
    pool: &PgPool,
    crs: &str,
    cl_id: &str,
    grouping_id: &str,
    digest: &str,
    since: chrono::DateTime<chrono::Utc>,
) -> Result<bool> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM secondary_branch_expectation_records
         WHERE crs = $1 AND cl_id = $2 AND grouping_id = $3 AND digest = $4 AND ts > $5",
    )
    .bind(crs)
    .bind(cl_id)
    .bind(grouping_id)
    .bind(digest)
    .bind(since)
    .fetch_one(pool)
    .await?;
    Ok(count > 0)
}
