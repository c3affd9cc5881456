//! Postgres connection pool management.

use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::errors::Result;

/// Open a connection pool against `database_url`.
///
/// Mirrors the teacher's `db::open` shape, ported from a single
/// `rusqlite::Connection` to an async `sqlx::PgPool` since spec §6 requires
/// CTEs, JSONB operators, and materialized views that only the Postgres
/// backend offers.
pub async fn open(database_url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;
    Ok(pool)
}

/// Open a pool with an explicit connection cap, used by tests against a
/// throwaway `testcontainers` Postgres instance.
pub async fn open_with_max_connections(database_url: &str, max_connections: u32) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;
    Ok(pool)
}
