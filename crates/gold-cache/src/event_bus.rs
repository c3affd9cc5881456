//! Expectation-change notifications.
//!
//! Triage is a mutation path out of scope for this crate (spec Non-goals),
//! but the caches here must still react the instant some other component
//! records a new verdict — spec §4.9 requires the expectation cache to be
//! "invalidation-driven", never serving a stale label past the moment the
//! underlying record changed. `ExpectationEventBus` is the seam: whoever
//! owns triage publishes to it, [`ExpectationCache`](crate::ExpectationCache)
//! subscribes and evicts.

use gold_core::model::GroupingId;
use tokio::sync::broadcast;

#[cfg(test)]
fn test_grouping_id() -> GroupingId {
    use gold_core::model::Grouping;
    use std::collections::BTreeMap;
    let mut keys = BTreeMap::new();
    keys.insert("corpus".to_string(), "gm".to_string());
    keys.insert("name".to_string(), "circle".to_string());
    Grouping::from_trace_keys(&keys, &["corpus", "name"]).id()
}

/// One (grouping, digest) pair whose expectation just changed, optionally
/// scoped to a changelist (`None` means the primary branch).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectationChangeEvent {
    pub grouping_id: GroupingId,
    pub digest_hex: String,
    pub cl_id: Option<String>,
}

/// Publish/subscribe seam for expectation changes. Implemented in-process
/// by [`InProcessEventBus`] here; a production deployment backed by a
/// message broker would implement this same trait against that broker.
pub trait ExpectationEventBus: Send + Sync {
    fn publish(&self, event: ExpectationChangeEvent);
    fn subscribe(&self) -> broadcast::Receiver<ExpectationChangeEvent>;
}

/// Single-process event bus backed by a `tokio::sync::broadcast` channel.
/// Lagging subscribers drop the oldest events rather than block the
/// publisher; a dropped event is treated the same as a cache miss by
/// subscribers, which is safe because the cache always falls back to the
/// store on a miss.
pub struct InProcessEventBus {
    sender: broadcast::Sender<ExpectationChangeEvent>,
}

impl InProcessEventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }
}

impl Default for InProcessEventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl ExpectationEventBus for InProcessEventBus {
    fn publish(&self, event: ExpectationChangeEvent) {
        // No subscribers yet (e.g. during startup) is not an error.
        let _ = self.sender.send(event);
    }

    fn subscribe(&self) -> broadcast::Receiver<ExpectationChangeEvent> {
        self.sender.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_subscriber() {
        let bus = InProcessEventBus::default();
        let mut rx = bus.subscribe();
        let gid = test_grouping_id();
        bus.publish(ExpectationChangeEvent {
            grouping_id: gid,
            digest_hex: "d1".into(),
            cl_id: None,
        });
        let event = rx.recv().await.unwrap();
        assert_eq!(event.digest_hex, "d1");
    }

    #[tokio::test]
    async fn test_publish_with_no_subscribers_does_not_panic() {
        let bus = InProcessEventBus::default();
        bus.publish(ExpectationChangeEvent {
            grouping_id: test_grouping_id(),
            digest_hex: "d1".into(),
            cl_id: None,
        });
    }
}
