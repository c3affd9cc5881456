//! Bounded LRU cache for `NewAndUntriagedSummaryForCL` results (spec §4.9,
//! §4.6). Computing the summary for a single CL means scanning every
//! digest produced on its secondary branch and classifying each one —
//! cheap once, wasteful if the CL's status page is polled every few
//! seconds while review is in progress. This cache holds the most
//! recently requested summaries, keyed by qualified CL id, and exposes
//! `get_or_refresh` so `gold-engine` can supply the actual recompute
//! logic without this crate depending on it.

use std::future::Future;
use std::time::{Duration, Instant};

use gold_core::model::QualifiedChangelistId;
use lru::LruCache;
use tokio::sync::Mutex;

struct Entry<T> {
    value: T,
    computed_at: Instant,
}

/// `T` is the engine's summary DTO type; this cache never inspects it.
pub struct ClSummaryCache<T: Clone + Send + Sync + 'static> {
    inner: Mutex<LruCache<QualifiedChangelistId, Entry<T>>>,
    ttl: Duration,
}

impl<T: Clone + Send + Sync + 'static> ClSummaryCache<T> {
    pub fn new(capacity: std::num::NonZeroUsize, ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    /// Return the cached value if present and younger than `ttl`;
    /// otherwise await `fetch` to compute a fresh value, store it, and
    /// return that. `fetch` is only invoked on a genuine miss.
    pub async fn get_or_refresh<F, Fut, E>(
        &self,
        key: &QualifiedChangelistId,
        fetch: F,
    ) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        {
            let mut guard = self.inner.lock().await;
            if let Some(entry) = guard.get(key) {
                if entry.computed_at.elapsed() < self.ttl {
                    return Ok(entry.value.clone());
                }
            }
        }
        let value = fetch().await?;
        let mut guard = self.inner.lock().await;
        guard.put(
            key.clone(),
            Entry {
                value: value.clone(),
                computed_at: Instant::now(),
            },
        );
        Ok(value)
    }

    /// Evict a single CL's cached summary, e.g. on a tryjob-finished
    /// webhook (spec §4.6 notes the summary should react to new data
    /// without waiting out the full TTL).
    pub async fn invalidate(&self, key: &QualifiedChangelistId) {
        self.inner.lock().await.pop(key);
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cl(id: &str) -> QualifiedChangelistId {
        QualifiedChangelistId {
            crs: "gerrit".into(),
            id: id.into(),
        }
    }

    #[tokio::test]
    async fn test_miss_then_hit_does_not_recompute() {
        let cache: ClSummaryCache<u32> =
            ClSummaryCache::new(std::num::NonZeroUsize::new(4).unwrap(), Duration::from_secs(60));
        let mut calls = 0;
        let v1 = cache
            .get_or_refresh::<_, _, ()>(&cl("cl1"), || {
                calls += 1;
                async { Ok(7) }
            })
            .await
            .unwrap();
        assert_eq!(v1, 7);
        let v2 = cache
            .get_or_refresh::<_, _, ()>(&cl("cl1"), || {
                calls += 1;
                async { Ok(99) }
            })
            .await
            .unwrap();
        assert_eq!(v2, 7, "second call must be served from cache, not recomputed");
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_expired_entry_is_recomputed() {
        let cache: ClSummaryCache<u32> =
            ClSummaryCache::new(std::num::NonZeroUsize::new(4).unwrap(), Duration::from_millis(1));
        cache
            .get_or_refresh::<_, _, ()>(&cl("cl1"), || async { Ok(7) })
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        let v2 = cache
            .get_or_refresh::<_, _, ()>(&cl("cl1"), || async { Ok(42) })
            .await
            .unwrap();
        assert_eq!(v2, 42);
    }

    #[tokio::test]
    async fn test_invalidate_forces_recompute() {
        let cache: ClSummaryCache<u32> =
            ClSummaryCache::new(std::num::NonZeroUsize::new(4).unwrap(), Duration::from_secs(60));
        cache
            .get_or_refresh::<_, _, ()>(&cl("cl1"), || async { Ok(7) })
            .await
            .unwrap();
        cache.invalidate(&cl("cl1")).await;
        let v2 = cache
            .get_or_refresh::<_, _, ()>(&cl("cl1"), || async { Ok(42) })
            .await
            .unwrap();
        assert_eq!(v2, 42);
    }
}
