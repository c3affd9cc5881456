mod support;

use gold_core::model::Label;

#[tokio::test]
async fn test_classify_defaults_to_untriaged() {
    let db = support::start().await;
    let label = gold_store::repo::expectations::classify(&db.pool, "g1", "d1")
        .await
        .unwrap();
    assert_eq!(label, Label::Untriaged);
}

#[tokio::test]
async fn test_classify_reflects_stored_label() {
    let db = support::start().await;
    support::seed_expectation(&db.pool, "g1", "d1", "positive").await;
    let label = gold_store::repo::expectations::classify(&db.pool, "g1", "d1")
        .await
        .unwrap();
    assert_eq!(label, Label::Positive);
}

#[tokio::test]
async fn test_cl_delta_shadows_primary() {
    let db = support::start().await;
    support::seed_expectation(&db.pool, "g1", "d1", "negative").await;
    sqlx::query(
        "INSERT INTO secondary_branch_expectations
            (crs, cl_id, grouping_id, digest, label, expectation_record_id)
         VALUES ('gerrit', 'cl1', 'g1', 'd1', 'positive', 'rec-cl-1')",
    )
    .execute(&db.pool)
    .await
    .unwrap();

    let cl_label = gold_store::repo::expectations::classify_for_cl(&db.pool, "gerrit", "cl1", "g1", "d1")
        .await
        .unwrap();
    assert_eq!(cl_label, Label::Positive);

    let primary_label = gold_store::repo::expectations::classify(&db.pool, "g1", "d1")
        .await
        .unwrap();
    assert_eq!(primary_label, Label::Negative, "CL delta must never leak into primary-branch queries");
}

#[tokio::test]
async fn test_triage_history_empty_on_error_path_is_never_a_query_failure() {
    let db = support::start().await;
    // No records exist; the function returns an empty vector, not an error.
    let history = gold_store::repo::expectations::triage_history(&db.pool, "g1", "d1").await;
    assert!(history.is_empty());
}
