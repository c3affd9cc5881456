//! Invalidation-driven expectation & triage-history caches (spec §4.9).
//!
//! Both caches are plain `dashmap` maps, keyed by the same `(grouping,
//! digest[, cl])` tuples the store uses. A subscriber task drains the
//! event bus and evicts the matching entries; callers that miss fall
//! through to the store and repopulate on the way out.

use std::sync::Arc;

use dashmap::DashMap;
use gold_core::model::{GroupingId, Label, TriageEntry};

use crate::event_bus::ExpectationEventBus;

type PrimaryKey = (GroupingId, String);
type ClKey = (String, String, GroupingId, String);

/// Cache of classified labels, split by primary-branch vs. per-CL delta —
/// mirrors the shadowing rule in `gold_store::repo::expectations`: a CL
/// delta is a distinct cache entry, never a primary-branch entry.
#[derive(Default)]
pub struct ExpectationCache {
    primary: DashMap<PrimaryKey, Label>,
    by_cl: DashMap<ClKey, Label>,
}

impl ExpectationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, grouping_id: GroupingId, digest_hex: &str) -> Option<Label> {
        self.primary
            .get(&(grouping_id, digest_hex.to_string()))
            .map(|entry| *entry)
    }

    pub fn put(&self, grouping_id: GroupingId, digest_hex: &str, label: Label) {
        self.primary
            .insert((grouping_id, digest_hex.to_string()), label);
    }

    pub fn get_for_cl(
        &self,
        crs: &str,
        cl_id: &str,
        grouping_id: GroupingId,
        digest_hex: &str,
    ) -> Option<Label> {
        self.by_cl
            .get(&(crs.to_string(), cl_id.to_string(), grouping_id, digest_hex.to_string()))
            .map(|entry| *entry)
    }

    pub fn put_for_cl(
        &self,
        crs: &str,
        cl_id: &str,
        grouping_id: GroupingId,
        digest_hex: &str,
        label: Label,
    ) {
        self.by_cl.insert(
            (crs.to_string(), cl_id.to_string(), grouping_id, digest_hex.to_string()),
            label,
        );
    }

    /// Drop every entry — primary and every CL delta — for this
    /// (grouping, digest) pair.
    fn evict(&self, grouping_id: GroupingId, digest_hex: &str) {
        self.primary.remove(&(grouping_id, digest_hex.to_string()));
        self.by_cl
            .retain(|(_, _, g, d), _| !(*g == grouping_id && d == digest_hex));
    }

    pub fn len(&self) -> usize {
        self.primary.len() + self.by_cl.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Cache of per-(grouping, digest) triage history lists. Evicted alongside
/// the label cache on the same event, since a new triage event always
/// appends a new history entry too.
#[derive(Default)]
pub struct TriageHistoryCache {
    entries: DashMap<PrimaryKey, Arc<Vec<TriageEntry>>>,
}

impl TriageHistoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, grouping_id: GroupingId, digest_hex: &str) -> Option<Arc<Vec<TriageEntry>>> {
        self.entries
            .get(&(grouping_id, digest_hex.to_string()))
            .map(|entry| Arc::clone(&entry))
    }

    pub fn put(&self, grouping_id: GroupingId, digest_hex: &str, history: Vec<TriageEntry>) {
        self.entries
            .insert((grouping_id, digest_hex.to_string()), Arc::new(history));
    }

    fn evict(&self, grouping_id: GroupingId, digest_hex: &str) {
        self.entries.remove(&(grouping_id, digest_hex.to_string()));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Spawn the background task that subscribes to `bus` and evicts matching
/// entries from both caches as events arrive. The returned `JoinHandle` is
/// owned by the caller so it can be aborted on shutdown; dropping it
/// without aborting leaves the subscriber running for the process
/// lifetime, which is the desired steady-state behavior.
pub fn spawn_invalidation_listener(
    bus: Arc<dyn ExpectationEventBus>,
    expectations: Arc<ExpectationCache>,
    history: Arc<TriageHistoryCache>,
) -> tokio::task::JoinHandle<()> {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    expectations.evict(event.grouping_id, &event.digest_hex);
                    history.evict(event.grouping_id, &event.digest_hex);
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "expectation event bus lagged; clearing caches");
                    expectations.primary.clear();
                    expectations.by_cl.clear();
                    history.entries.clear();
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_bus::{ExpectationChangeEvent, InProcessEventBus};
    use gold_core::model::Grouping;
    use std::collections::BTreeMap;
    use std::time::Duration;

    fn grouping_id() -> GroupingId {
        let mut keys = BTreeMap::new();
        keys.insert("corpus".to_string(), "gm".to_string());
        keys.insert("name".to_string(), "circle".to_string());
        Grouping::from_trace_keys(&keys, &["corpus", "name"]).id()
    }

    #[test]
    fn test_put_get_roundtrip() {
        let cache = ExpectationCache::new();
        let gid = grouping_id();
        cache.put(gid, "d1", Label::Positive);
        assert_eq!(cache.get(gid, "d1"), Some(Label::Positive));
        assert_eq!(cache.get(gid, "d2"), None);
    }

    #[test]
    fn test_cl_delta_is_distinct_from_primary() {
        let cache = ExpectationCache::new();
        let gid = grouping_id();
        cache.put(gid, "d1", Label::Negative);
        cache.put_for_cl("gerrit", "cl1", gid, "d1", Label::Positive);
        assert_eq!(cache.get(gid, "d1"), Some(Label::Negative));
        assert_eq!(cache.get_for_cl("gerrit", "cl1", gid, "d1"), Some(Label::Positive));
    }

    #[tokio::test]
    async fn test_invalidation_listener_evicts_on_event() {
        let bus = Arc::new(InProcessEventBus::default());
        let expectations = Arc::new(ExpectationCache::new());
        let history = Arc::new(TriageHistoryCache::new());
        let gid = grouping_id();
        expectations.put(gid, "d1", Label::Positive);
        history.put(gid, "d1", vec![]);

        let handle = spawn_invalidation_listener(bus.clone(), expectations.clone(), history.clone());
        bus.publish(ExpectationChangeEvent {
            grouping_id: gid,
            digest_hex: "d1".into(),
            cl_id: None,
        });

        // Give the spawned task a turn to process the event.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(expectations.get(gid, "d1"), None);
        assert_eq!(history.get(gid, "d1"), None);
        handle.abort();
    }
}
