//! `NewAndUntriagedSummaryForCL` integration test — spec §8 scenario S3
//! (one changelist, one patchset: a new untriaged image and an unchanged,
//! already-triaged one).

mod support;

use std::collections::BTreeMap;

use chrono::Utc;
use gold_core::model::Grouping;

fn grouping_id_hex(corpus: &str, name: &str) -> String {
    let mut keys = BTreeMap::new();
    keys.insert("corpus".to_string(), corpus.to_string());
    keys.insert("name".to_string(), name.to_string());
    Grouping::from_trace_keys(&keys, &["corpus", "name"]).id().to_hex()
}

#[tokio::test]
async fn test_cl_summary_counts_new_and_untriaged_images() {
    let db = support::start_db().await;
    let now = Utc::now();
    support::seed_commit(&db.pool, "c1", now - chrono::Duration::hours(1)).await;

    let gid = grouping_id_hex("round", "circle");
    let trace_regressed = support::hex_id(1);
    let trace_unchanged = support::hex_id(2);

    support::seed_trace(
        &db.pool,
        &trace_regressed,
        "round",
        serde_json::json!({"corpus": "round", "name": "circle"}),
    )
    .await;
    support::seed_trace(
        &db.pool,
        &trace_unchanged,
        "round",
        serde_json::json!({"corpus": "round", "name": "circle"}),
    )
    .await;

    let d_primary_regressed = support::hex_id(10);
    let d_cl_regressed = support::hex_id(11);
    let d_shared = support::hex_id(20);

    // Primary-branch heads: one trace the CL will regress, one the CL
    // leaves untouched.
    support::seed_value_at_head(&db.pool, &trace_regressed, "c1", &d_primary_regressed, "positive").await;
    support::seed_value_at_head(&db.pool, &trace_unchanged, "c1", &d_shared, "positive").await;
    support::seed_expectation(&db.pool, &gid, &d_primary_regressed, "positive").await;
    support::seed_expectation(&db.pool, &gid, &d_shared, "positive").await;

    support::seed_changelist(&db.pool, "gerrit", "cl1", now).await;
    support::seed_patchset(&db.pool, "gerrit", "cl1", "ps1", 1).await;
    support::seed_tryjob(&db.pool, "gerrit", "cl1", "ps1", "tj1", now).await;

    // The CL produces a new, untriaged digest for one trace and the same
    // (already-triaged) digest for the other — not "new" at all.
    support::seed_secondary_branch_value(&db.pool, "gerrit", "cl1", "ps1", "tj1", &trace_regressed, &d_cl_regressed).await;
    support::seed_secondary_branch_value(&db.pool, "gerrit", "cl1", "ps1", "tj1", &trace_unchanged, &d_shared).await;

    let config = support::test_config(20, None);
    let engine = support::build_engine(db.pool.clone(), config).await;

    let summary = engine.new_and_untriaged_summary_for_cl("gerrit", "cl1").await.unwrap();

    assert_eq!(summary.patchsets.len(), 1);
    let ps = &summary.patchsets[0];
    assert_eq!(ps.patchset_id, "ps1");
    assert_eq!(ps.new_images, 1);
    assert_eq!(ps.new_untriaged_images, 1);
    assert_eq!(ps.total_untriaged_images, 1);
}

#[tokio::test]
async fn test_unknown_cl_summary_returns_not_found() {
    let db = support::start_db().await;
    support::seed_commit(&db.pool, "c1", Utc::now()).await;
    let config = support::test_config(20, None);
    let engine = support::build_engine(db.pool.clone(), config).await;

    let err = engine
        .new_and_untriaged_summary_for_cl("gerrit", "no-such-cl")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), gold_errors::GoldErrorKind::NotFound);
}

#[tokio::test]
async fn test_changelist_last_updated_is_unix_epoch_for_unknown_cl() {
    let db = support::start_db().await;
    support::seed_commit(&db.pool, "c1", Utc::now()).await;
    let config = support::test_config(20, None);
    let engine = support::build_engine(db.pool.clone(), config).await;

    let ts = engine.changelist_last_updated("gerrit", "no-such-cl").await.unwrap();
    assert_eq!(ts, chrono::DateTime::<chrono::Utc>::UNIX_EPOCH);
}
