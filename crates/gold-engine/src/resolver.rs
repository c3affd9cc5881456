//! Expectations Resolver — spec §4.1.
//!
//! Cache-backed, store-backed fallback: every classification first checks
//! `gold-cache`'s invalidation-driven maps, then falls through to
//! `gold-store` and repopulates the cache on the way out. Triage-history
//! lookups never propagate a store failure — they degrade to an empty
//! history, matching `gold_store::repo::expectations::triage_history`'s
//! own contract, which this resolver simply sits in front of.

use std::sync::Arc;

use sqlx::PgPool;

use gold_cache::{ExpectationCache, TriageHistoryCache};
use gold_core::model::{GroupingId, Label, TriageEntry};
use gold_errors::Result;

pub struct ExpectationsResolver {
    cache: Arc<ExpectationCache>,
    history_cache: Arc<TriageHistoryCache>,
}

impl ExpectationsResolver {
    pub fn new(cache: Arc<ExpectationCache>, history_cache: Arc<TriageHistoryCache>) -> Self {
        Self {
            cache,
            history_cache,
        }
    }

    /// Primary-branch classification (spec §4.1 `classify`).
    pub async fn classify(
        &self,
        pool: &PgPool,
        grouping_id: GroupingId,
        digest_hex: &str,
    ) -> Result<Label> {
        if let Some(label) = self.cache.get(grouping_id, digest_hex) {
            return Ok(label);
        }
        let label = gold_store::repo::expectations::classify(
            pool,
            &grouping_id.to_hex(),
            digest_hex,
        )
        .await?;
        self.cache.put(grouping_id, digest_hex, label);
        Ok(label)
    }

    /// CL-scoped classification (spec §4.1 `classifyForCL`): CL delta
    /// first, primary on fallthrough.
    pub async fn classify_for_cl(
        &self,
        pool: &PgPool,
        crs: &str,
        cl_id: &str,
        grouping_id: GroupingId,
        digest_hex: &str,
    ) -> Result<Label> {
        if let Some(label) = self.cache.get_for_cl(crs, cl_id, grouping_id, digest_hex) {
            return Ok(label);
        }
        let label = gold_store::repo::expectations::classify_for_cl(
            pool,
            crs,
            cl_id,
            &grouping_id.to_hex(),
            digest_hex,
        )
        .await?;
        self.cache
            .put_for_cl(crs, cl_id, grouping_id, digest_hex, label);
        Ok(label)
    }

    /// Primary-branch triage history (spec §4.1 `triageHistory`). Never
    /// fails the enclosing query: a store error degrades to an empty
    /// vector inside `gold_store::repo::expectations::triage_history`.
    pub async fn triage_history(
        &self,
        pool: &PgPool,
        grouping_id: GroupingId,
        digest_hex: &str,
    ) -> Vec<TriageEntry> {
        if let Some(history) = self.history_cache.get(grouping_id, digest_hex) {
            return (*history).clone();
        }
        let history =
            gold_store::repo::expectations::triage_history(pool, &grouping_id.to_hex(), digest_hex)
                .await;
        self.history_cache
            .put(grouping_id, digest_hex, history.clone());
        history
    }

    /// CL-scoped triage history (spec §4.1 `triageHistoryForCL`): the
    /// CL's delta history (most recent first), then the primary history.
    /// Not cached separately from the primary history cache — the CL
    /// delta portion is small and re-fetched each time, keeping the cache
    /// key space to the primary (grouping, digest) pair.
    pub async fn triage_history_for_cl(
        &self,
        pool: &PgPool,
        crs: &str,
        cl_id: &str,
        grouping_id: GroupingId,
        digest_hex: &str,
    ) -> Vec<TriageEntry> {
        gold_store::repo::expectations::triage_history_for_cl(
            pool,
            crs,
            cl_id,
            &grouping_id.to_hex(),
            digest_hex,
        )
        .await
    }
}
