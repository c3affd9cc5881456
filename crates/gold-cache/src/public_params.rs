//! Public-params matcher refresh loop (spec §4.9, §4.4).
//!
//! The access-control rule set behind [`PublicViewMatcher`] is loaded from
//! operator configuration (a file or remote config source) rather than
//! the database, and can change without a restart. This cache holds the
//! current matcher behind an `RwLock` and refreshes it on an interval via
//! a caller-supplied loader, the same inversion-of-control shape as
//! [`crate::ClSummaryCache`] — this crate owns the timing, `gold-engine`
//! or `gold-cli` owns how the rules are actually sourced.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use gold_core::access_control::PublicViewMatcher;
use tokio::sync::RwLock;

pub struct PublicParamsCache {
    current: RwLock<Arc<PublicViewMatcher>>,
}

impl PublicParamsCache {
    pub fn new(initial: PublicViewMatcher) -> Self {
        Self {
            current: RwLock::new(Arc::new(initial)),
        }
    }

    pub async fn get(&self) -> Arc<PublicViewMatcher> {
        Arc::clone(&*self.current.read().await)
    }

    async fn set(&self, matcher: PublicViewMatcher) {
        *self.current.write().await = Arc::new(matcher);
    }

    /// Spawn the refresh loop: call `load` every `interval` and swap in
    /// its result. A `load` error leaves the previous matcher in place
    /// and logs a warning rather than tearing down the loop — a single
    /// bad reload should not make every public endpoint start rejecting
    /// requests.
    pub fn spawn_refresh_loop<F, Fut, E>(
        self: Arc<Self>,
        interval: Duration,
        mut load: F,
    ) -> tokio::task::JoinHandle<()>
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<PublicViewMatcher, E>> + Send,
        E: std::fmt::Display,
    {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match load().await {
                    Ok(matcher) => self.set(matcher).await,
                    Err(err) => tracing::warn!(error = %err, "public params reload failed, keeping previous rules"),
                }
            }
        })
    }
}
