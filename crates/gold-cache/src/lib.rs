//! Gold Cache — the Cache & Materialized View Manager of spec §4.9.
//!
//! Every cache here is a mechanical storage primitive (invalidation-driven
//! map, time-driven snapshot, bounded LRU); the domain logic that decides
//! *what* to recompute on a miss or refresh tick belongs to `gold-engine`,
//! which is wired against these primitives rather than the other way
//! round — that keeps this crate free of a dependency on `gold-engine`
//! and therefore free of any cycle.
//!
//! Per spec §5: read paths never block on a refresh in progress, they
//! observe the prior snapshot atomically. Every cache here is built so a
//! reader only ever takes a short-lived read lock (or a lock-free
//! `dashmap` shard lock) while a refresh computes its replacement value
//! independently and swaps it in.

pub mod cl_summary;
pub mod commit_window;
pub mod event_bus;
pub mod expectation_cache;
pub mod materialized_views;
pub mod public_params;

pub use cl_summary::ClSummaryCache;
pub use commit_window::CommitWindowCache;
pub use event_bus::{ExpectationChangeEvent, ExpectationEventBus, InProcessEventBus};
pub use expectation_cache::{spawn_invalidation_listener, ExpectationCache, TriageHistoryCache};
pub use materialized_views::MaterializedViewRegistry;
pub use public_params::PublicParamsCache;
