//! Shared `testcontainers` Postgres bootstrap for `gold-engine`'s
//! integration tests, in the `gold-store::tests::support` idiom. Seeding
//! happens directly against the schema rather than through any write-path
//! API (out of scope for this crate, per spec §1), mirroring how
//! `gold-store`'s own fixtures are built.

use std::sync::Arc;

use sqlx::PgPool;
use testcontainers::runners::AsyncRunner;
use testcontainers::ContainerAsync;
use testcontainers_modules::postgres::Postgres;

use gold_engine::{GoldConfig, GoldEngine};

pub struct TestDb {
    pub pool: PgPool,
    _container: ContainerAsync<Postgres>,
}

pub async fn start_db() -> TestDb {
    let container = Postgres::default()
        .start()
        .await
        .expect("failed to start postgres container");
    let host = container.get_host().await.expect("container host");
    let port = container
        .get_host_port_ipv4(5432)
        .await
        .expect("container port");
    let database_url = format!("postgres://postgres:postgres@{host}:{port}/postgres");

    let pool = gold_store::db::open_with_max_connections(&database_url, 5)
        .await
        .expect("failed to open pool");
    gold_store::migrations::apply_migrations(&pool)
        .await
        .expect("failed to apply migrations");

    TestDb {
        pool,
        _container: container,
    }
}

/// A `GoldConfig` suitable for a single test: a 20-commit window and every
/// refresh interval set to an hour, since no test waits on a background
/// tick — caches are populated directly or via event-driven eviction.
pub fn test_config(window_size: u32, flaky_trace_threshold: Option<u32>) -> GoldConfig {
    let mut toml = format!(
        r#"
        window_size = {window_size}
        commit_window_refresh_interval_secs = 3600
        materialized_view_refresh_interval_secs = 3600
        cl_summary_refresh_interval_secs = 3600
        public_params_refresh_interval_secs = 3600
        cl_summary_cache_capacity = 100
        database_url = "postgres://unused/unused"
        "#
    );
    if let Some(threshold) = flaky_trace_threshold {
        toml.push_str(&format!("\nflaky_trace_threshold = {threshold}\n"));
    }
    GoldConfig::from_toml(&toml).expect("valid test config")
}

/// Build an engine over an already-seeded pool. Commits must be seeded
/// before calling this — `GoldEngine::from_pool` loads the initial commit
/// window snapshot synchronously at construction.
pub async fn build_engine(pool: PgPool, config: GoldConfig) -> Arc<GoldEngine> {
    Arc::new(
        GoldEngine::from_pool(config, pool)
            .await
            .expect("engine construction"),
    )
}

pub async fn seed_commit(pool: &PgPool, id: &str, time: chrono::DateTime<chrono::Utc>) {
    sqlx::query(
        "INSERT INTO git_commits (commit_id, git_hash, commit_time, author_email, subject)
         VALUES ($1, $1, $2, 'author@example.com', 'subject')",
    )
    .bind(id)
    .bind(time)
    .execute(pool)
    .await
    .unwrap();
    sqlx::query("INSERT INTO commits_with_data (commit_id, tile_id) VALUES ($1, 0)")
        .bind(id)
        .execute(pool)
        .await
        .unwrap();
}

pub async fn seed_trace(pool: &PgPool, trace_id: &str, corpus: &str, keys: serde_json::Value) {
    seed_trace_with_options(pool, trace_id, corpus, keys, serde_json::json!({})).await;
}

pub async fn seed_trace_with_options(
    pool: &PgPool,
    trace_id: &str,
    corpus: &str,
    keys: serde_json::Value,
    options: serde_json::Value,
) {
    let grouping_id = format!("g-{corpus}");
    sqlx::query(
        "INSERT INTO traces (trace_id, grouping_id, corpus, keys, options_id, options, matches_any_ignore_rule)
         VALUES ($1, $2, $3, $4, 'opts-default', $5, FALSE)",
    )
    .bind(trace_id)
    .bind(&grouping_id)
    .bind(corpus)
    .bind(keys)
    .bind(options)
    .execute(pool)
    .await
    .unwrap();
}

pub async fn seed_value_at_head(pool: &PgPool, trace_id: &str, commit_id: &str, digest: &str, label: &str) {
    sqlx::query(
        "INSERT INTO values_at_head (trace_id, most_recent_commit_id, digest, options_id, label)
         VALUES ($1, $2, $3, 'opts-default', $4)
         ON CONFLICT (trace_id) DO UPDATE SET most_recent_commit_id = $2, digest = $3, label = $4",
    )
    .bind(trace_id)
    .bind(commit_id)
    .bind(digest)
    .bind(label)
    .execute(pool)
    .await
    .unwrap();
}

pub async fn seed_trace_value(pool: &PgPool, trace_id: &str, commit_id: &str, digest: &str) {
    sqlx::query(
        "INSERT INTO trace_values (trace_id, commit_id, digest, options_id)
         VALUES ($1, $2, $3, 'opts-default')",
    )
    .bind(trace_id)
    .bind(commit_id)
    .bind(digest)
    .execute(pool)
    .await
    .unwrap();
}

pub async fn seed_expectation(pool: &PgPool, grouping_id: &str, digest: &str, label: &str) {
    sqlx::query(
        "INSERT INTO expectations (grouping_id, digest, label, expectation_record_id)
         VALUES ($1, $2, $3, 'rec-1')
         ON CONFLICT (grouping_id, digest) DO UPDATE SET label = $3",
    )
    .bind(grouping_id)
    .bind(digest)
    .bind(label)
    .execute(pool)
    .await
    .unwrap();
}

pub async fn seed_changelist(pool: &PgPool, crs: &str, cl_id: &str, time: chrono::DateTime<chrono::Utc>) {
    sqlx::query(
        "INSERT INTO changelists (crs, cl_id, author, subject, status, last_updated)
         VALUES ($1, $2, 'alice', 'adds new tests', 'open', $3)",
    )
    .bind(crs)
    .bind(cl_id)
    .bind(time)
    .execute(pool)
    .await
    .unwrap();
}

pub async fn seed_patchset(pool: &PgPool, crs: &str, cl_id: &str, patchset_id: &str, order: i32) {
    sqlx::query(
        "INSERT INTO patchsets (crs, cl_id, patchset_id, patchset_order) VALUES ($1, $2, $3, $4)",
    )
    .bind(crs)
    .bind(cl_id)
    .bind(patchset_id)
    .bind(order)
    .execute(pool)
    .await
    .unwrap();
}

pub async fn seed_tryjob(
    pool: &PgPool,
    crs: &str,
    cl_id: &str,
    patchset_id: &str,
    tryjob_id: &str,
    executed_at: chrono::DateTime<chrono::Utc>,
) {
    sqlx::query(
        "INSERT INTO tryjobs (crs, cl_id, patchset_id, tryjob_id, executed_at)
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(crs)
    .bind(cl_id)
    .bind(patchset_id)
    .bind(tryjob_id)
    .bind(executed_at)
    .execute(pool)
    .await
    .unwrap();
}

pub async fn seed_secondary_branch_value(
    pool: &PgPool,
    crs: &str,
    cl_id: &str,
    patchset_id: &str,
    tryjob_id: &str,
    trace_id: &str,
    digest: &str,
) {
    sqlx::query(
        "INSERT INTO secondary_branch_values
            (crs, cl_id, patchset_id, tryjob_id, trace_id, digest, options_id)
         VALUES ($1, $2, $3, $4, $5, $6, 'opts-default')",
    )
    .bind(crs)
    .bind(cl_id)
    .bind(patchset_id)
    .bind(tryjob_id)
    .bind(trace_id)
    .bind(digest)
    .execute(pool)
    .await
    .unwrap();
}

/// A 32-char lowercase hex id built from a small integer, so fixtures can
/// refer to traces/digests/groupings by a short readable seed while still
/// satisfying `Digest`/`TraceId::from_hex`'s length check.
pub fn hex_id(seed: u32) -> String {
    format!("{seed:032x}")
}
