//! `GoldEngine` — owns the connection pool, every cache from `gold-cache`,
//! and the collaborators (`ExpectationsResolver`, `CodeReviewSystemClient`)
//! the Result Pipeline operations are built against.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use tokio::task::JoinHandle;

use gold_cache::{
    CommitWindowCache, ExpectationCache, ExpectationEventBus, InProcessEventBus,
    MaterializedViewRegistry, PublicParamsCache, TriageHistoryCache,
};
use gold_core::access_control::PublicViewMatcher;
use gold_errors::Result;
use gold_projection::NewAndUntriagedSummaryWire;

use crate::config::GoldConfig;
use crate::crs::{CodeReviewSystemClient, ConfiguredCrsClient};
use crate::resolver::ExpectationsResolver;

/// Background tasks spawned by [`GoldEngine::spawn_background_tasks`]; the
/// caller owns the handle set and decides whether/when to abort them.
pub struct BackgroundTasks {
    pub commit_window_refresh: JoinHandle<()>,
    pub invalidation_listener: JoinHandle<()>,
    pub materialized_views: MaterializedViewRegistry,
}

impl BackgroundTasks {
    pub fn shutdown(self) {
        self.commit_window_refresh.abort();
        self.invalidation_listener.abort();
        self.materialized_views.shutdown();
    }
}

pub struct GoldEngine {
    pub pool: PgPool,
    pub config: GoldConfig,
    pub commit_window: Arc<CommitWindowCache>,
    pub expectation_cache: Arc<ExpectationCache>,
    pub history_cache: Arc<TriageHistoryCache>,
    pub event_bus: Arc<dyn ExpectationEventBus>,
    pub resolver: ExpectationsResolver,
    pub public_params: Arc<PublicParamsCache>,
    pub cl_summary_cache: Arc<gold_cache::ClSummaryCache<NewAndUntriagedSummaryWire>>,
    pub crs_client: Arc<dyn CodeReviewSystemClient>,
}

impl GoldEngine {
    /// Connect to Postgres, apply pending migrations, and load every
    /// cache's initial snapshot. Returns an engine ready to serve
    /// requests; background refresh loops are started separately via
    /// [`GoldEngine::spawn_background_tasks`] so callers (tests, `gold-cli`
    /// one-shot invocations) can opt out of them.
    pub async fn connect(config: GoldConfig) -> Result<Self> {
        let pool = gold_store::db::open(&config.database_url).await?;
        gold_store::migrations::apply_migrations(&pool).await?;
        Self::from_pool(config, pool).await
    }

    /// Build an engine over an already-open, already-migrated pool —
    /// the path used by `gold-engine`'s own integration tests against a
    /// `testcontainers` Postgres.
    pub async fn from_pool(config: GoldConfig, pool: PgPool) -> Result<Self> {
        let commit_window = Arc::new(
            CommitWindowCache::load(&pool, config.window_size).await?,
        );
        let expectation_cache = Arc::new(ExpectationCache::new());
        let history_cache = Arc::new(TriageHistoryCache::new());
        let event_bus: Arc<dyn ExpectationEventBus> = Arc::new(InProcessEventBus::default());
        let resolver = ExpectationsResolver::new(expectation_cache.clone(), history_cache.clone());
        let public_params = Arc::new(PublicParamsCache::new(PublicViewMatcher::everything_public()));
        let cl_summary_cache = Arc::new(gold_cache::ClSummaryCache::new(
            NonZeroUsize::new(config.cl_summary_cache_capacity)
                .expect("validated non-zero by GoldConfig::validate"),
            Duration::from_secs(config.cl_summary_refresh_interval_secs),
        ));
        let crs_client: Arc<dyn CodeReviewSystemClient> = Arc::new(ConfiguredCrsClient::new(
            pool.clone(),
            config.crs_url_templates.clone(),
        ));

        Ok(Self {
            pool,
            config,
            commit_window,
            expectation_cache,
            history_cache,
            event_bus,
            resolver,
            public_params,
            cl_summary_cache,
            crs_client,
        })
    }

    /// Start every refresh loop spec §4.9 describes. Call once per
    /// process; the returned handles may be aborted on shutdown.
    pub async fn spawn_background_tasks(self: &Arc<Self>) -> Result<BackgroundTasks> {
        let commit_window_refresh = self.commit_window.clone().spawn_refresh_loop(
            self.pool.clone(),
            Duration::from_secs(self.config.commit_window_refresh_interval_secs),
        );
        let invalidation_listener = gold_cache::spawn_invalidation_listener(
            self.event_bus.clone(),
            self.expectation_cache.clone(),
            self.history_cache.clone(),
        );
        let materialized_views = MaterializedViewRegistry::start(
            self.pool.clone(),
            &self.config.corpora_with_materialized_views,
            Duration::from_secs(self.config.materialized_view_refresh_interval_secs),
        )
        .await?;

        Ok(BackgroundTasks {
            commit_window_refresh,
            invalidation_listener,
            materialized_views,
        })
    }

    /// Whether `corpus` is backed by a per-corpus materialized view,
    /// spec §4.9: "Search plans may use the view when the query is
    /// corpus-scoped and `include_ignored=false`."
    pub fn corpus_has_materialized_view(&self, corpus: &str) -> bool {
        self.config
            .corpora_with_materialized_views
            .iter()
            .any(|c| c == corpus)
    }
}
