//! `GetBlamesForUntriagedDigests` integration tests — spec §8 scenario S6
//! (disjoint per-trace ranges within one grouping) and S5 (triage during a
//! blame search takes effect immediately, no cache refresh required).

mod support;

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::Utc;
use gold_cache::ExpectationChangeEvent;
use gold_core::model::Grouping;

fn grouping_id_hex(corpus: &str, name: &str) -> String {
    let mut keys = BTreeMap::new();
    keys.insert("corpus".to_string(), corpus.to_string());
    keys.insert("name".to_string(), name.to_string());
    Grouping::from_trace_keys(&keys, &["corpus", "name"]).id().to_hex()
}

/// Scenario S6: trace A = "A---bbbbbb", trace B = "AAAAAA---b" over a
/// 10-commit window. A's range (1,4) is older and disjoint from B's range
/// (6,9); B's is discarded and the combined range is A's.
#[tokio::test]
async fn test_disjoint_blame_ranges_keep_the_older_one() {
    let db = support::start_db().await;
    let now = Utc::now();
    let commit_ids: Vec<String> = (0..10).map(|i| format!("c{i}")).collect();
    for (i, id) in commit_ids.iter().enumerate() {
        support::seed_commit(&db.pool, id, now - chrono::Duration::hours((10 - i) as i64)).await;
    }

    let a_pos = support::hex_id(0xaa);
    let b_tgt = support::hex_id(0xbb);
    let gid = grouping_id_hex("round", "circle");

    support::seed_trace(
        &db.pool,
        &support::hex_id(1),
        "round",
        serde_json::json!({"corpus": "round", "name": "circle"}),
    )
    .await;
    support::seed_trace(
        &db.pool,
        &support::hex_id(2),
        "round",
        serde_json::json!({"corpus": "round", "name": "circle"}),
    )
    .await;

    // Trace A: positive at c0, absent c1-c3, target from c4 through head (c9).
    support::seed_trace_value(&db.pool, &support::hex_id(1), "c0", &a_pos).await;
    for c in ["c4", "c5", "c6", "c7", "c8", "c9"] {
        support::seed_trace_value(&db.pool, &support::hex_id(1), c, &b_tgt).await;
    }
    support::seed_value_at_head(&db.pool, &support::hex_id(1), "c9", &b_tgt, "untriaged").await;

    // Trace B: positive c0-c5, absent c6-c8, target at head (c9).
    for c in ["c0", "c1", "c2", "c3", "c4", "c5"] {
        support::seed_trace_value(&db.pool, &support::hex_id(2), c, &a_pos).await;
    }
    support::seed_trace_value(&db.pool, &support::hex_id(2), "c9", &b_tgt).await;
    support::seed_value_at_head(&db.pool, &support::hex_id(2), "c9", &b_tgt, "untriaged").await;

    support::seed_expectation(&db.pool, &gid, &a_pos, "positive").await;

    let config = support::test_config(10, None);
    let engine = support::build_engine(db.pool.clone(), config).await;

    let summary = engine.get_blames_for_untriaged_digests(Some("round")).await.unwrap();
    assert_eq!(summary.entries.len(), 1, "disjoint ranges combine to a single entry");
    let entry = &summary.entries[0];
    assert_eq!(entry.commit_range, "c1:c4");
}

/// Scenario S5: triaging the blamed digest positive after an initial
/// blame query must be reflected on the very next query, via the
/// event-driven expectation cache rather than any timed refresh.
#[tokio::test]
async fn test_triage_during_blame_search_takes_effect_immediately() {
    let db = support::start_db().await;
    let now = Utc::now();
    support::seed_commit(&db.pool, "c0", now - chrono::Duration::hours(2)).await;
    support::seed_commit(&db.pool, "c1", now - chrono::Duration::hours(1)).await;

    let gid = grouping_id_hex("round", "circle");
    let d_untriaged = support::hex_id(0xcc);

    support::seed_trace(
        &db.pool,
        &support::hex_id(1),
        "round",
        serde_json::json!({"corpus": "round", "name": "circle"}),
    )
    .await;
    support::seed_trace_value(&db.pool, &support::hex_id(1), "c0", &d_untriaged).await;
    support::seed_trace_value(&db.pool, &support::hex_id(1), "c1", &d_untriaged).await;
    support::seed_value_at_head(&db.pool, &support::hex_id(1), "c1", &d_untriaged, "untriaged").await;

    let config = support::test_config(10, None);
    let engine = support::build_engine(db.pool.clone(), config).await;

    // The invalidation listener is the engine's normal event-driven path
    // for reacting to a triage elsewhere in the system (spec §4.9) —
    // started here the same way `spawn_background_tasks` would, without
    // the other refresh loops this test doesn't need.
    let listener = gold_cache::spawn_invalidation_listener(
        engine.event_bus.clone(),
        engine.expectation_cache.clone(),
        engine.history_cache.clone(),
    );

    let before = engine.get_blames_for_untriaged_digests(Some("round")).await.unwrap();
    assert_eq!(before.entries.len(), 1);
    assert_eq!(before.entries[0].affected_groupings[0].sample_digest.to_hex(), d_untriaged);

    // Triage happens elsewhere: the expectation record changes and the
    // change is published. No sleep-based cache refresh is involved.
    support::seed_expectation(&db.pool, &gid, &d_untriaged, "positive").await;
    engine.event_bus.publish(ExpectationChangeEvent {
        grouping_id: gold_core::model::Grouping::from_trace_keys(
            &BTreeMap::from([
                ("corpus".to_string(), "round".to_string()),
                ("name".to_string(), "circle".to_string()),
            ]),
            &["corpus", "name"],
        )
        .id(),
        digest_hex: d_untriaged.clone(),
        cl_id: None,
    });

    // Give the spawned listener a chance to process the event.
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
    tokio::time::sleep(Duration::from_millis(20)).await;

    let after = engine.get_blames_for_untriaged_digests(Some("round")).await.unwrap();
    assert!(after.entries.is_empty(), "now-positive digest must no longer be blamed");

    listener.abort();
}
