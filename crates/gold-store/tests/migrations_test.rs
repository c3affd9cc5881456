mod support;

#[tokio::test]
async fn test_migrations_are_idempotent() {
    let db = support::start().await;
    // `support::start` already applied migrations once; applying again
    // must be a no-op rather than a checksum-mismatch error.
    gold_store::migrations::apply_migrations(&db.pool)
        .await
        .expect("second application must succeed");

    let tables: Vec<String> = sqlx::query_scalar(
        "SELECT table_name FROM information_schema.tables WHERE table_schema = 'public'
         AND table_name IN ('traces', 'expectations', 'diff_metrics', 'changelists')",
    )
    .fetch_all(&db.pool)
    .await
    .unwrap();
    assert_eq!(tables.len(), 4);
}

#[tokio::test]
async fn test_schema_version_recorded() {
    let db = support::start().await;
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM schema_version")
        .fetch_one(&db.pool)
        .await
        .unwrap();
    assert_eq!(count, 2);
}
