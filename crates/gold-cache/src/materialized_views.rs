//! Per-corpus materialized-view refresh loop (spec §4.9).
//!
//! One background task per configured corpus, each refreshing its
//! `mv_<corpus>_traces` view on its own interval. The DDL and refresh SQL
//! live in `gold_store::repo::materialized_views`; this module is only
//! the scheduling layer.

use std::time::Duration;

use sqlx::PgPool;

use gold_store::repo::materialized_views::{ensure_view, refresh_view, view_row_count};

/// Owns the set of per-corpus refresh loops. Dropping this (or aborting
/// its handles) stops all refreshes.
pub struct MaterializedViewRegistry {
    handles: Vec<tokio::task::JoinHandle<()>>,
}

impl MaterializedViewRegistry {
    /// Create (if missing) and start refreshing a materialized view for
    /// each corpus in `corpora`, each on its own `interval`.
    pub async fn start(
        pool: PgPool,
        corpora: &[String],
        interval: Duration,
    ) -> gold_errors::Result<Self> {
        let mut handles = Vec::with_capacity(corpora.len());
        for corpus in corpora {
            ensure_view(&pool, corpus).await?;
            let pool = pool.clone();
            let corpus = corpus.clone();
            handles.push(tokio::spawn(async move {
                let mut ticker = tokio::time::interval(interval);
                ticker.tick().await;
                loop {
                    ticker.tick().await;
                    match refresh_view(&pool, &corpus).await {
                        Ok(()) => {
                            if let Ok(count) = view_row_count(&pool, &corpus).await {
                                tracing::debug!(corpus = %corpus, rows = count, "materialized view refreshed");
                            }
                        }
                        Err(err) => {
                            tracing::warn!(corpus = %corpus, error = %err, "materialized view refresh failed");
                        }
                    }
                }
            }));
        }
        Ok(Self { handles })
    }

    pub fn shutdown(self) {
        for handle in self.handles {
            handle.abort();
        }
    }
}
