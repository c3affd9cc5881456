//! Shared `testcontainers` Postgres bootstrap for `gold-store`'s
//! integration tests.

use sqlx::PgPool;
use testcontainers::runners::AsyncRunner;
use testcontainers::ContainerAsync;
use testcontainers_modules::postgres::Postgres;

pub struct TestDb {
    pub pool: PgPool,
    _container: ContainerAsync<Postgres>,
}

pub async fn start() -> TestDb {
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
    let grouping_id = format!("g-{corpus}");
    sqlx::query(
        "INSERT INTO traces (trace_id, grouping_id, corpus, keys, options_id, options, matches_any_ignore_rule)
         VALUES ($1, $2, $3, $4, 'opts-default', '{}', FALSE)",
    )
    .bind(trace_id)
    .bind(&grouping_id)
    .bind(corpus)
    .bind(keys)
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

pub async fn seed_diff_metric(pool: &PgPool, left: &str, right: &str, combined_metric: f64) {
    sqlx::query(
        "INSERT INTO diff_metrics
            (left_digest, right_digest, num_pixels_diff, percent_pixels_diff,
             max_rgba_diffs, max_channel_diff, combined_metric, dimensions_differ, ts)
         VALUES ($1, $2, 44, 0.5, '{40,149,100,0}', 149, $3, FALSE, now())",
    )
    .bind(left)
    .bind(right)
    .bind(combined_metric)
    .execute(pool)
    .await
    .unwrap();
}
