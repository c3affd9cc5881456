//! Time-driven commit window cache (spec §4.9).
//!
//! The commit window changes only on ingestion; rebuilding it on every
//! read would mean a full `git_commits` join per request. Instead a
//! background tick refreshes a snapshot on an interval and readers take
//! an `Arc` clone of whatever snapshot is current — they never wait on
//! the refresh itself.

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use tokio::sync::RwLock;

use gold_core::model::CommitWindow;
use gold_errors::Result;
use gold_store::repo::commits::load_commit_window;

pub struct CommitWindowCache {
    window_size: u32,
    current: RwLock<Arc<CommitWindow>>,
}

impl CommitWindowCache {
    /// Load the initial snapshot synchronously so the cache is never
    /// empty once constructed.
    pub async fn load(pool: &PgPool, window_size: u32) -> Result<Self> {
        let window = load_commit_window(pool, window_size).await?;
        Ok(Self {
            window_size,
            current: RwLock::new(Arc::new(window)),
        })
    }

    /// The current snapshot. Cheap: an `Arc` clone under a short-lived
    /// read lock.
    pub async fn get(&self) -> Arc<CommitWindow> {
        Arc::clone(&*self.current.read().await)
    }

    async fn refresh(&self, pool: &PgPool) -> Result<()> {
        let window = load_commit_window(pool, self.window_size).await?;
        *self.current.write().await = Arc::new(window);
        Ok(())
    }

    /// Spawn the refresh loop: reload the window every `interval` until
    /// the returned handle is aborted.
    pub fn spawn_refresh_loop(
        self: Arc<Self>,
        pool: PgPool,
        interval: Duration,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await; // first tick fires immediately; skip it, we just loaded.
            loop {
                ticker.tick().await;
                if let Err(err) = self.refresh(&pool).await {
                    tracing::warn!(error = %err, "commit window refresh failed");
                }
            }
        })
    }
}
