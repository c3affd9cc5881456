//! Async migration runner: checksummed, idempotent, gap-tolerant.
//!
//! Ported from the teacher's synchronous `rusqlite` runner to `sqlx`
//! against Postgres; the checksum-and-`schema_version`-table idiom is
//! unchanged.

use sqlx::PgPool;

use crate::errors::{checksum_mismatch, migration_error, Result};
use crate::migrations::checksums::compute_checksum;
use crate::migrations::embedded::get_migrations;

/// Apply every pending embedded migration to `pool`, in order. Safe to
/// call on every process startup: already-applied migrations are skipped.
pub async fn apply_migrations(pool: &PgPool) -> Result<()> {
    create_schema_version_table(pool).await?;

    for migration in get_migrations() {
        apply_migration(pool, migration.id, migration.sql).await?;
    }

    Ok(())
}

async fn create_schema_version_table(pool: &PgPool) -> Result<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS schema_version (
            id SERIAL PRIMARY KEY,
            migration_id TEXT NOT NULL UNIQUE,
            applied_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            checksum TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn apply_migration(pool: &PgPool, migration_id: &str, sql: &str) -> Result<()> {
    let checksum = compute_checksum(sql);

    let existing: Option<String> =
        sqlx::query_scalar("SELECT checksum FROM schema_version WHERE migration_id = $1")
            .bind(migration_id)
            .fetch_optional(pool)
            .await?;

    if let Some(applied_checksum) = existing {
        if applied_checksum != checksum {
            return Err(checksum_mismatch(migration_id, &checksum, &applied_checksum));
        }
        return Ok(());
    }

    let mut tx = pool.begin().await?;
    sqlx::raw_sql(sql)
        .execute(&mut *tx)
        .await
        .map_err(|e| migration_error(migration_id, e))?;

    sqlx::query(
        "INSERT INTO schema_version (migration_id, checksum) VALUES ($1, $2)
         ON CONFLICT (migration_id) DO NOTHING",
    )
    .bind(migration_id)
    .bind(&checksum)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // `apply_migrations` needs a live Postgres instance; exercised by
    // `gold-store`'s `testcontainers`-backed integration tests under
    // `tests/`. This module only covers the checksum bookkeeping that
    // doesn't need a database.

    #[test]
    fn test_checksum_mismatch_error_mentions_migration_id() {
        let err = checksum_mismatch("001_initial_schema", "aaaa", "bbbb");
        assert!(err.to_string().contains("001_initial_schema"));
    }
}
