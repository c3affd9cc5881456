//! Query Compiler — spec §4.2.

pub mod compiler;
pub mod plan;

pub use compiler::{sanitize_value, validate_key, SearchQuery, SortDirection};
pub use plan::{KeyStage, TraceFilterPlan};
