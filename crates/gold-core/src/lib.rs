//! Pure domain model and algorithms for the Gold search/blame engine:
//! groupings, traces, the commit window, the query compiler, the access
//! control overlay, the reference diff selector, the trace group builder,
//! the blame engine, and the cluster builder.
//!
//! Nothing in this crate talks to a database or the network — that is
//! `gold-store`'s and `gold-engine`'s job. Everything here is a pure
//! function over plain data, which is what makes it exhaustively
//! unit-testable and independently reusable.

pub mod access_control;
pub mod blame;
pub mod cluster;
pub mod model;
pub mod query;
pub mod reference_diff;
pub mod trace_group;
