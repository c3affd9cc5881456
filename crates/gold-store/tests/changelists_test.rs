mod support;

use chrono::Utc;

#[tokio::test]
async fn test_changelist_last_updated_zero_for_unknown_cl() {
    let db = support::start().await;
    let ts = gold_store::repo::changelists::changelist_last_updated(&db.pool, "gerrit", "no-such-cl")
        .await
        .unwrap();
    assert_eq!(ts, chrono::DateTime::<Utc>::UNIX_EPOCH);
}

#[tokio::test]
async fn test_get_changelist_returns_ordered_patchsets() {
    let db = support::start().await;
    let now = Utc::now();
    sqlx::query(
        "INSERT INTO changelists (crs, cl_id, author, subject, status, last_updated)
         VALUES ('gerrit', 'cl1', 'alice', 'adds new tests', 'open', $1)",
    )
    .bind(now)
    .execute(&db.pool)
    .await
    .unwrap();
    sqlx::query("INSERT INTO patchsets (crs, cl_id, patchset_id, patchset_order) VALUES ('gerrit', 'cl1', 'ps4', 4)")
        .execute(&db.pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO patchsets (crs, cl_id, patchset_id, patchset_order) VALUES ('gerrit', 'cl1', 'ps1', 1)")
        .execute(&db.pool)
        .await
        .unwrap();

    let cl = gold_store::repo::changelists::get_changelist(&db.pool, "gerrit", "cl1")
        .await
        .unwrap()
        .expect("CL must be found");

    assert_eq!(cl.patchsets.len(), 2);
    assert_eq!(cl.patchsets[0].id, "ps1");
    assert_eq!(cl.patchsets[1].id, "ps4");
}

#[tokio::test]
async fn test_unknown_changelist_returns_none() {
    let db = support::start().await;
    let cl = gold_store::repo::changelists::get_changelist(&db.pool, "gerrit", "missing")
        .await
        .unwrap();
    assert!(cl.is_none());
}
