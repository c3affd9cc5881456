//! `Changelists` / `Patchsets` / `Tryjobs` repository functions — spec §3
//! "Changelist & Patchset", §6.

use sqlx::PgPool;

use gold_core::model::{Changelist, ChangelistStatus, Patchset, QualifiedChangelistId};

use crate::errors::Result;

fn parse_status(s: &str) -> ChangelistStatus {
    match s {
        "landed" => ChangelistStatus::Landed,
        "abandoned" => ChangelistStatus::Abandoned,
        _ => ChangelistStatus::Open,
    }
}

#[derive(sqlx::FromRow)]
struct ChangelistRow {
    crs: String,
    cl_id: String,
    author: String,
    subject: String,
    status: String,
    last_updated: chrono::DateTime<chrono::Utc>,
}

#[derive(sqlx::FromRow)]
struct PatchsetRow {
    patchset_id: String,
    patchset_order: i32,
}

/// Load a Changelist with its ordered patchsets. `Ok(None)` when the CL is
/// unknown (caller maps to `GoldErrorKind::NotFound` per spec §4.3 Search
/// failure semantics and §7).
pub async fn get_changelist(pool: &PgPool, crs: &str, cl_id: &str) -> Result<Option<Changelist>> {
    let Some(row) = sqlx::query_as::<_, ChangelistRow>(
        "SELECT crs, cl_id, author, subject, status, last_updated
         FROM changelists WHERE crs = $1 AND cl_id = $2",
    )
    .bind(crs)
    .bind(cl_id)
    .fetch_optional(pool)
    .await?
    else {
        return Ok(None);
    };

    let patchset_rows = sqlx::query_as::<_, PatchsetRow>(
        "SELECT patchset_id, patchset_order FROM patchsets
         WHERE crs = $1 AND cl_id = $2 ORDER BY patchset_order ASC",
    )
    .bind(crs)
    .bind(cl_id)
    .fetch_all(pool)
    .await?;

    Ok(Some(Changelist {
        id: QualifiedChangelistId {
            crs: row.crs,
            id: row.cl_id,
        },
        author: row.author,
        subject: row.subject,
        status: parse_status(&row.status),
        last_updated: row.last_updated,
        patchsets: patchset_rows
            .into_iter()
            .map(|p| Patchset {
                id: p.patchset_id,
                order: p.patchset_order as u32,
            })
            .collect(),
    }))
}

/// `ChangelistLastUpdated` (spec §4.3): zero timestamp, not an error, for
/// an unknown CL.
pub async fn changelist_last_updated(
    pool: &PgPool,
    crs: &str,
    cl_id: &str,
) -> Result<chrono::DateTime<chrono::Utc>> {
    let ts: Option<chrono::DateTime<chrono::Utc>> = sqlx::query_scalar(
        "SELECT last_updated FROM changelists WHERE crs = $1 AND cl_id = $2",
    )
    .bind(crs)
    .bind(cl_id)
    .fetch_optional(pool)
    .await?;
    Ok(ts.unwrap_or(chrono::DateTime::<chrono::Utc>::UNIX_EPOCH))
}

/// Distinct trace ids that produced at least one datapoint on the given
/// patchset, used by `NewAndUntriagedSummaryForCL`.
pub async fn trace_ids_for_patchset(
    pool: &PgPool,
    crs: &str,
    cl_id: &str,
    patchset_id: &str,
) -> Result<Vec<String>> {
    let rows = sqlx::query_scalar(
        "SELECT DISTINCT trace_id FROM secondary_branch_values
         WHERE crs = $1 AND cl_id = $2 AND patchset_id = $3",
    )
    .bind(crs)
    .bind(cl_id)
    .bind(patchset_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// One (trace, digest) datapoint produced on a patchset, in tryjob
/// execution order (spec §4.3: "all of them are surfaced as additional
/// columns in tryjob-execution order").
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SecondaryBranchDatapoint {
    pub trace_id: String,
    pub digest: String,
    pub tryjob_id: String,
}

pub async fn datapoints_for_patchset(
    pool: &PgPool,
    crs: &str,
    cl_id: &str,
    patchset_id: &str,
) -> Result<Vec<SecondaryBranchDatapoint>> {
    let rows = sqlx::query_as::<_, SecondaryBranchDatapoint>(
        "SELECT sbv.trace_id, sbv.digest, sbv.tryjob_id
         FROM secondary_branch_values sbv
         JOIN tryjobs t ON t.crs = sbv.crs AND t.cl_id = sbv.cl_id
             AND t.patchset_id = sbv.patchset_id AND t.tryjob_id = sbv.tryjob_id
         WHERE sbv.crs = $1 AND sbv.cl_id = $2 AND sbv.patchset_id = $3
         ORDER BY t.executed_at ASC, sbv.trace_id ASC",
    )
    .bind(crs)
    .bind(cl_id)
    .bind(patchset_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
